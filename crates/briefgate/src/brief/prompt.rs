//! Prompt text for the brief request.

use super::AccountInputs;

/// System message: a proof-first account planning assistant.
#[must_use]
pub fn system_prompt() -> &'static str {
    "You are a strategic enterprise sales/account planning assistant. \
     You must be proof-first: every important claim must be supported by a citation. \
     Be concise, specific, and avoid generic fluff."
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        "N/A"
    } else {
        value
    }
}

/// User message describing the account and the JSON the model must return.
#[must_use]
pub fn user_prompt(inputs: &AccountInputs) -> String {
    format!(
        r#"Create a 1-page, proof-first strategic account intelligence brief.

Inputs:
- Company: {company}
- Website: {website}
- Target persona: {persona}
- My value proposition: {value_prop}
Optional context:
- Initiative: {initiative}
- Region/BU: {region}
- Competitor(s): {competitor}

Requirements:
1) Return STRICT JSON (no markdown, no extra text).
2) Include freshness stamps: "generated_at" (ISO) and "search_recency" (e.g., month).
3) For each module, include:
   - "bullets": 3–7 bullets
   - "confidence": number 0 to 1
   - "evidence": array of objects with {{"url","title","snippet","date"}}.
   Evidence snippets should be short and directly support the bullet.
4) Modules (exact keys):
{module_list}

Notes:
- Prefer public sources: SEC filings, company investor relations, reputable news.
- If information is uncertain, say so and lower confidence.

Return JSON with this shape:
{{
  "generated_at": "...",
  "search_recency": "month",
  "company": "...",
  "persona": "...",
  "modules": {{
    "account_summary": {{"bullets":[], "confidence":0.0, "evidence":[]}},
    ...
  }}
}}"#,
        company = inputs.company.trim(),
        website = inputs.website.trim(),
        persona = inputs.persona.trim(),
        value_prop = inputs.value_prop.trim(),
        initiative = or_na(inputs.initiative.trim()),
        region = or_na(inputs.region.trim()),
        competitor = or_na(inputs.competitor.trim()),
        module_list = super::MODULES
            .iter()
            .map(|(key, _)| format!("   - {key}"))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}
