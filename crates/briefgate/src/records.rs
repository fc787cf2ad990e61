//! Persistent record types.
//!
//! These are the JSON documents stored in the key-value table. Timestamps are
//! RFC 3339 strings carrying the business timezone's offset.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::brief::Brief;

/// Access tier attached to codes and users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Recruiters and hiring managers.
    Recruiter,
    /// Everyone else.
    #[default]
    General,
    /// High-priority contacts.
    Vip,
    /// The owner, via the admin bypass login.
    Owner,
}

impl Tier {
    /// Prefix of access codes issued for this tier.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Recruiter => "REC",
            Self::Vip => "VIP",
            Self::General | Self::Owner => "GEN",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Recruiter => write!(f, "recruiter"),
            Self::General => write!(f, "general"),
            Self::Vip => write!(f, "vip"),
            Self::Owner => write!(f, "owner"),
        }
    }
}

/// A weekly access code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRecord {
    /// The code itself, e.g. `REC-2026W02-7H3Q9A`.
    pub code: String,
    /// Email the code is bound to; empty while unbound.
    #[serde(default)]
    pub email: String,
    /// Tier granted on login.
    pub tier: Tier,
    /// ISO week the code is valid in.
    pub week_id: String,
    /// End of the validity window.
    pub expires_at: DateTime<FixedOffset>,
    /// When the code was issued.
    pub created_at: DateTime<FixedOffset>,
}

impl CodeRecord {
    /// Whether the code has been bound to an email.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        !self.email.is_empty()
    }
}

/// A user and their credit balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Normalized email.
    pub email: String,
    /// Remaining agent runs. Never negative.
    pub credits: i64,
    /// Tier the user first logged in with.
    #[serde(default)]
    pub tier: Tier,
    /// First login.
    pub created_at: DateTime<FixedOffset>,
    /// Most recent login.
    pub last_login: DateTime<FixedOffset>,
}

/// One agent run in a user's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the run finished.
    pub ran_at: DateTime<FixedOffset>,
    /// Company researched.
    pub company: String,
    /// Target persona.
    pub persona: String,
    /// Model that produced the brief.
    pub model: String,
    /// Balance after the run was charged.
    pub credits_remaining_after: i64,
    /// The brief.
    pub brief: Brief,
}

/// The logged-in CLI user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Normalized email.
    pub email: String,
    /// Effective tier for this session.
    pub tier: Tier,
    /// Whether admin tools are available.
    pub is_admin: bool,
    /// When the login happened.
    pub logged_in_at: DateTime<FixedOffset>,
    /// ISO week of the access code used. `None` for owner sessions.
    #[serde(default)]
    pub code_week: Option<String>,
    /// Expiry of the access code used. `None` for owner sessions.
    #[serde(default)]
    pub code_expires_at: Option<DateTime<FixedOffset>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_code_prefix() {
        assert_eq!(Tier::Recruiter.code_prefix(), "REC");
        assert_eq!(Tier::General.code_prefix(), "GEN");
        assert_eq!(Tier::Vip.code_prefix(), "VIP");
        assert_eq!(Tier::Owner.code_prefix(), "GEN");
    }

    #[test]
    fn test_tier_serde_is_snake_case() {
        assert_eq!(serde_json::to_string(&Tier::Vip).unwrap(), "\"vip\"");
        let tier: Tier = serde_json::from_str("\"recruiter\"").unwrap();
        assert_eq!(tier, Tier::Recruiter);
        assert_eq!(Tier::Owner.to_string(), "owner");
    }

    #[test]
    fn test_code_record_unbound_email_defaults() {
        let json = r#"{
            "code": "GEN-2026W02-2J9L4C",
            "tier": "general",
            "week_id": "2026W02",
            "expires_at": "2026-01-11T23:59:59-05:00",
            "created_at": "2026-01-05T09:00:00-05:00"
        }"#;
        let record: CodeRecord = serde_json::from_str(json).unwrap();
        assert!(!record.is_bound());
        assert_eq!(record.expires_at.offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn test_code_record_bad_expiry_fails_to_decode() {
        let json = r#"{
            "code": "GEN-2026W02-2J9L4C",
            "email": "",
            "tier": "general",
            "week_id": "2026W02",
            "expires_at": "next sunday",
            "created_at": "2026-01-05T09:00:00-05:00"
        }"#;
        assert!(serde_json::from_str::<CodeRecord>(json).is_err());
    }
}
