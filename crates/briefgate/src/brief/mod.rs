//! Account brief model, request inputs and the brief API client.
//!
//! A brief is the JSON document the research API returns: a header plus
//! eight fixed modules, each with bullets, a confidence score and evidence
//! links. Models are not always disciplined about types, so decoding is
//! lenient. Missing or null fields default and scalars in text fields are
//! stringified. Modules that are not objects are dropped, and a bare string
//! evidence item is taken as its URL.

mod client;
mod prompt;

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

pub use client::{parse_completion, BriefProvider, PerplexityClient};
pub use prompt::{system_prompt, user_prompt};

/// Module keys in display order, with their section titles.
pub const MODULES: [(&str, &str); 8] = [
    ("account_summary", "Account Summary"),
    ("top_3_priorities", "Top 3 Priorities"),
    ("strategic_blockers", "Strategic Blockers"),
    ("news_signal", "News Signal (Why Now)"),
    ("recommended_messaging", "Recommended Messaging"),
    ("discovery_questions", "Discovery Questions"),
    ("risks_objections", "Risks / Objections"),
    ("next_step_email", "Next-Step Email Draft"),
];

/// A generated account brief.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Brief {
    /// Generation timestamp as reported by the model.
    #[serde(deserialize_with = "lenient_string")]
    pub generated_at: String,
    /// Search recency window, e.g. `month`.
    #[serde(deserialize_with = "lenient_string")]
    pub search_recency: String,
    /// Company the brief is about.
    #[serde(deserialize_with = "lenient_string")]
    pub company: String,
    /// Target persona.
    #[serde(deserialize_with = "lenient_string")]
    pub persona: String,
    /// Brief sections keyed by module key.
    #[serde(deserialize_with = "lenient_modules")]
    pub modules: BTreeMap<String, BriefModule>,
    /// Response metadata attached by the client.
    #[serde(rename = "_api_meta", skip_serializing_if = "Option::is_none")]
    pub api_meta: Option<ApiMeta>,
}

impl Brief {
    /// The module stored under `key`, if the model produced it.
    #[must_use]
    pub fn module(&self, key: &str) -> Option<&BriefModule> {
        self.modules.get(key)
    }
}

/// One section of a brief.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BriefModule {
    /// Key points.
    #[serde(deserialize_with = "lenient_strings")]
    pub bullets: Vec<String>,
    /// Model confidence between 0 and 1.
    #[serde(deserialize_with = "lenient_number")]
    pub confidence: Option<f64>,
    /// Sources backing the bullets.
    #[serde(deserialize_with = "lenient_evidence")]
    pub evidence: Vec<Evidence>,
}

/// A cited source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Evidence {
    /// Source URL.
    #[serde(deserialize_with = "lenient_string")]
    pub url: String,
    /// Source title.
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    /// Short supporting excerpt.
    #[serde(deserialize_with = "lenient_string")]
    pub snippet: String,
    /// Publication date as given.
    #[serde(deserialize_with = "lenient_string")]
    pub date: String,
}

/// Transparency data copied from the API response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiMeta {
    /// Model that answered.
    pub model: Option<String>,
    /// Unix timestamp of the completion.
    pub created: Option<i64>,
    /// Token usage.
    pub usage: Value,
    /// Raw search results.
    pub search_results: Vec<Value>,
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(value_to_text)
}

fn lenient_strings<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let items = match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        other => vec![other],
    };
    Ok(items
        .into_iter()
        .filter(|item| !item.is_null())
        .map(value_to_text)
        .collect())
}

fn lenient_evidence<'de, D>(deserializer: D) -> std::result::Result<Vec<Evidence>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(_) => serde_json::from_value(item).ok(),
            Value::String(url) if !url.trim().is_empty() => Some(Evidence {
                url,
                ..Evidence::default()
            }),
            _ => None,
        })
        .collect())
}

fn lenient_modules<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, BriefModule>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Object(entries) = Value::deserialize(deserializer)? else {
        return Ok(BTreeMap::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|(key, module)| match module {
            Value::Object(_) => serde_json::from_value(module).ok().map(|m| (key, m)),
            _ => None,
        })
        .collect())
}

fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// What the user asks the agent to research.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInputs {
    /// Company name.
    pub company: String,
    /// Company website.
    pub website: String,
    /// Target persona, e.g. CIO.
    pub persona: String,
    /// The user's value proposition.
    pub value_prop: String,
    /// Optional initiative.
    pub initiative: String,
    /// Optional region or business unit.
    pub region: String,
    /// Optional competitors.
    pub competitor: String,
}

impl AccountInputs {
    /// A copy with every field trimmed.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        Self {
            company: self.company.trim().to_string(),
            website: self.website.trim().to_string(),
            persona: self.persona.trim().to_string(),
            value_prop: self.value_prop.trim().to_string(),
            initiative: self.initiative.trim().to_string(),
            region: self.region.trim().to_string(),
            competitor: self.competitor.trim().to_string(),
        }
    }

    /// Check that every required field is filled in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] naming the first empty required field.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("company", &self.company),
            ("website", &self.website),
            ("persona", &self.persona),
            ("value_prop", &self.value_prop),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::MissingField { field });
            }
        }
        Ok(())
    }

    /// Cache fingerprint for these inputs, `model` and the ISO week.
    ///
    /// BLAKE3 over a canonical JSON object with sorted keys, so identical
    /// requests in the same week share a cache entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the key material cannot be serialized.
    pub fn fingerprint(&self, model: &str, week_id: &str) -> Result<String> {
        let t = self.trimmed();
        let material: BTreeMap<&str, &str> = BTreeMap::from([
            ("company", t.company.as_str()),
            ("competitor", t.competitor.as_str()),
            ("initiative", t.initiative.as_str()),
            ("model", model),
            ("persona", t.persona.as_str()),
            ("region", t.region.as_str()),
            ("value_prop", t.value_prop.as_str()),
            ("website", t.website.as_str()),
            ("week", week_id),
        ]);
        let canonical = serde_json::to_string(&material)?;
        Ok(blake3::hash(canonical.as_bytes()).to_hex().to_string())
    }
}
