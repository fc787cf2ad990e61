//! Access-code issuance, binding and validation.
//!
//! Codes look like `REC-2026W02-7H3Q9A`: a tier prefix, the ISO week they
//! are valid in and a random token. A code is valid until the end of that
//! week (Sunday 23:59:59 in the business timezone) and belongs to exactly one
//! email. Codes issued by the owner are bound at creation; seeded demo codes
//! start unbound and bind to the first email that logs in with them.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::clock::{self, Clock};
use crate::error::{Error, Result};
use crate::records::{CodeRecord, Tier};
use crate::storage::{keys, Storage};

/// Demo codes the owner can seed for testing, three per tier.
pub const DEMO_CODES: [(&str, Tier); 9] = [
    ("REC-2026W02-7H3Q9A", Tier::Recruiter),
    ("REC-2026W02-N4D2KP", Tier::Recruiter),
    ("REC-2026W02-V8M1TZ", Tier::Recruiter),
    ("GEN-2026W02-2J9L4C", Tier::General),
    ("GEN-2026W02-Q6R7W3", Tier::General),
    ("GEN-2026W02-X1P8FS", Tier::General),
    ("VIP-2026W02-5K2Y9N", Tier::Vip),
    ("VIP-2026W02-H7T1RD", Tier::Vip),
    ("VIP-2026W02-M3C6UZ", Tier::Vip),
];

/// Outcome of seeding the demo codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    /// Codes written by this call.
    pub created: usize,
    /// Week the new codes are valid in.
    pub week_id: String,
    /// End of their validity window, RFC 3339.
    pub expires_at: String,
}

/// Check that `email` looks like an address and return it normalized.
///
/// # Errors
///
/// Returns [`Error::MissingField`] for an empty value and
/// [`Error::InvalidEmail`] for anything without a `user@domain.tld` shape.
pub fn validate_email(email: &str) -> Result<String> {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    let pattern = EMAIL
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid email pattern"));

    let email = keys::normalize_email(email);
    if email.is_empty() {
        return Err(Error::MissingField { field: "email" });
    }
    if !pattern.is_match(&email) {
        return Err(Error::InvalidEmail(email));
    }
    Ok(email)
}

/// Issues and checks access codes.
#[derive(Debug, Clone, Copy)]
pub struct AccessGate<'a> {
    store: &'a Storage,
    clock: &'a Clock,
}

impl<'a> AccessGate<'a> {
    /// Create a gate over `store`.
    #[must_use]
    pub fn new(store: &'a Storage, clock: &'a Clock) -> Self {
        Self { store, clock }
    }

    fn record_for_this_week(&self, code: &str, email: String, tier: Tier) -> Result<CodeRecord> {
        let now = self.clock.now();
        Ok(CodeRecord {
            code: code.to_string(),
            email,
            tier,
            week_id: clock::iso_week_id(&now),
            expires_at: clock::week_expiry(&now)?.fixed_offset(),
            created_at: now.fixed_offset(),
        })
    }

    /// Issue a new code for `email`, valid for the rest of the current week.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is invalid or the write fails.
    pub fn issue_code(&self, email: &str, tier: Tier) -> Result<CodeRecord> {
        let email = validate_email(email)?;
        let week_id = self.clock.week_id();

        let record = loop {
            let token: [u8; 3] = rand::random();
            let code = format!("{}-{week_id}-{}", tier.code_prefix(), hex::encode_upper(token));
            if self.store.contains(&keys::code(&code))? {
                debug!(code = %code, "Token collision, drawing again");
                continue;
            }
            break self.record_for_this_week(&code, email, tier)?;
        };

        self.store.put(&keys::code(&record.code), &record)?;
        info!(code = %record.code, email = %record.email, %tier, "Issued access code");
        Ok(record)
    }

    /// Store the [`DEMO_CODES`] unbound for the current week.
    ///
    /// Codes that already exist are left as they are.
    ///
    /// # Errors
    ///
    /// Returns an error if a read or write fails.
    pub fn seed_demo_codes(&self) -> Result<SeedReport> {
        let now = self.clock.now();
        let mut created = 0;
        for (code, tier) in DEMO_CODES {
            let key = keys::code(code);
            if self.store.contains(&key)? {
                continue;
            }
            self.store
                .put(&key, &self.record_for_this_week(code, String::new(), tier)?)?;
            created += 1;
        }

        let report = SeedReport {
            created,
            week_id: clock::iso_week_id(&now),
            expires_at: clock::week_expiry(&now)?.to_rfc3339(),
        };
        info!(created, week = %report.week_id, "Seeded demo codes");
        Ok(report)
    }

    /// Bind an unbound code to `email`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CodeNotFound`] or [`Error::CodeAlreadyBound`], or an
    /// error if the email is invalid or storage fails.
    pub fn bind_code(&self, code: &str, email: &str) -> Result<CodeRecord> {
        let email = validate_email(email)?;
        let key = keys::code(code);
        let record = self.store.update(&key, |current: Option<CodeRecord>| {
            let mut record = current.ok_or(Error::CodeNotFound)?;
            if record.is_bound() {
                return Err(Error::CodeAlreadyBound);
            }
            record.email = email;
            Ok(record)
        })?;
        info!(code = %record.code, email = %record.email, "Bound access code");
        Ok(record)
    }

    /// Check a login attempt and return the code record.
    ///
    /// Rules, in order: the code must exist, belong to the current ISO week,
    /// not be past its expiry, and be bound to `email`. An unbound code is
    /// bound to `email` by its first valid use.
    ///
    /// # Errors
    ///
    /// Returns the [`Error`] for the first rule that fails.
    pub fn validate_code(&self, email: &str, code: &str) -> Result<CodeRecord> {
        let email = keys::normalize_email(email);
        let key = keys::code(code);

        if !self.store.contains(&key)? {
            debug!(code = code.trim(), "Unknown access code");
            return Err(Error::InvalidCode);
        }

        let mut record: CodeRecord = match self.store.get(&key) {
            Ok(Some(record)) => record,
            Ok(None) => return Err(Error::InvalidCode),
            Err(Error::RecordDecode { key, source }) => {
                warn!(key = %key, error = %source, "Stored access code is malformed");
                return Err(Error::MalformedCode);
            }
            Err(e) => return Err(e),
        };

        let now = self.clock.now();
        if record.week_id != clock::iso_week_id(&now) {
            return Err(Error::CodeExpired {
                reason: "week changed",
            });
        }
        if record.expires_at < now {
            return Err(Error::CodeExpired {
                reason: "time window ended",
            });
        }

        if record.is_bound() {
            if record.email != email {
                return Err(Error::CodeEmailMismatch);
            }
        } else {
            record.email = email;
            self.store.put(&key, &record)?;
            info!(code = %record.code, email = %record.email, "Bound access code on first use");
        }

        Ok(record)
    }
}
