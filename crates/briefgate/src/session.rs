//! Login, logout and the persisted CLI session.
//!
//! The session is a single document in storage. Logging in replaces it;
//! every gated command reads it back.

use tracing::{debug, info};

use crate::access::{validate_email, AccessGate};
use crate::clock::Clock;
use crate::config::SecretsConfig;
use crate::error::{Error, Result};
use crate::ledger::Ledger;
use crate::records::{Session, Tier};
use crate::storage::{keys, Storage};

/// Owner credentials for the admin bypass login.
#[derive(Clone, PartialEq, Eq)]
pub struct OwnerCredentials {
    email: String,
    access_code: String,
}

impl std::fmt::Debug for OwnerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnerCredentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl OwnerCredentials {
    /// Owner credentials from explicit values.
    #[must_use]
    pub fn new(email: &str, access_code: &str) -> Self {
        Self {
            email: keys::normalize_email(email),
            access_code: access_code.trim().to_string(),
        }
    }

    /// Owner credentials from the secrets table, if both are configured.
    #[must_use]
    pub fn from_secrets(secrets: &SecretsConfig) -> Option<Self> {
        match (secrets.owner_email(), secrets.owner_access_code()) {
            (Ok(email), Ok(code)) => Some(Self::new(email, code)),
            _ => None,
        }
    }

    fn matches(&self, email: &str, code: &str) -> bool {
        self.email == email && self.access_code == code
    }
}

/// Log in with an email and access code and persist the session.
///
/// The owner's email and access code open an admin session directly.
/// Everyone else goes through [`AccessGate::validate_code`]; their user
/// record is created on first login with the code's tier.
///
/// # Errors
///
/// Returns [`Error::MissingField`] for blank input, or the validation error.
pub fn login(
    store: &Storage,
    gate: &AccessGate<'_>,
    ledger: &Ledger<'_>,
    owner: Option<&OwnerCredentials>,
    email: &str,
    code: &str,
    logged_in_at: chrono::DateTime<chrono::FixedOffset>,
) -> Result<Session> {
    let email = keys::normalize_email(email);
    let code = code.trim();
    if email.is_empty() || code.is_empty() {
        return Err(Error::MissingField {
            field: if email.is_empty() { "email" } else { "code" },
        });
    }

    let session = if owner.is_some_and(|o| o.matches(&email, code)) {
        ledger.ensure_user(&email, Tier::Owner)?;
        info!(email = %email, "Owner logged in");
        Session {
            email,
            tier: Tier::Owner,
            is_admin: true,
            logged_in_at,
            code_week: None,
            code_expires_at: None,
        }
    } else {
        let email = validate_email(&email)?;
        let record = gate.validate_code(&email, code)?;
        let user = ledger.ensure_user(&email, record.tier)?;
        info!(email = %email, tier = %user.tier, "Logged in");
        Session {
            email,
            tier: user.tier,
            is_admin: false,
            logged_in_at,
            code_week: Some(record.week_id),
            code_expires_at: Some(record.expires_at),
        }
    };

    store.put(&keys::session(), &session)?;
    Ok(session)
}

/// Forget the current session. Returns whether one existed.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn logout(store: &Storage) -> Result<bool> {
    let existed = store.delete(&keys::session())?;
    debug!(existed, "Logged out");
    Ok(existed)
}

/// The current session, if someone is logged in.
///
/// # Errors
///
/// Returns an error if the stored session is unreadable.
pub fn current(store: &Storage) -> Result<Option<Session>> {
    store.get(&keys::session())
}

/// The current session, or [`Error::NotLoggedIn`].
///
/// A code-based session ends with its code: once the week rolls over or the
/// code's expiry passes, the session is deleted and the caller must log in
/// again with a fresh code. Owner sessions do not expire.
///
/// # Errors
///
/// Returns [`Error::NotLoggedIn`] when nobody is logged in and
/// [`Error::CodeExpired`] when the session's code is no longer valid.
pub fn require(store: &Storage, clock: &Clock) -> Result<Session> {
    let session = current(store)?.ok_or(Error::NotLoggedIn)?;

    let reason = if session
        .code_week
        .as_ref()
        .is_some_and(|week| *week != clock.week_id())
    {
        Some("week changed")
    } else if session
        .code_expires_at
        .is_some_and(|expires_at| expires_at < clock.stamp())
    {
        Some("time window ended")
    } else {
        None
    };

    if let Some(reason) = reason {
        store.delete(&keys::session())?;
        info!(email = %session.email, reason, "Session ended with its access code");
        return Err(Error::CodeExpired { reason });
    }
    Ok(session)
}

/// Unlock admin tools for `session` with `password`.
///
/// # Errors
///
/// Returns [`Error::AdminRequired`] for a non-owner session,
/// [`Error::MissingSecret`] if no admin password is configured and
/// [`Error::AdminLocked`] if `password` does not match.
pub fn unlock_admin(session: &Session, secrets: &SecretsConfig, password: &str) -> Result<()> {
    if !session.is_admin {
        return Err(Error::AdminRequired);
    }
    if password != secrets.admin_password()? {
        return Err(Error::AdminLocked);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use chrono::{TimeZone, Utc};
    use chrono_tz::America::New_York;

    fn clock() -> Clock {
        Clock::fixed(New_York, Utc.with_ymd_and_hms(2026, 1, 7, 15, 0, 0).unwrap())
    }

    fn owner() -> OwnerCredentials {
        OwnerCredentials::new("Owner@Example.com", "KBUILDSAI2026")
    }

    #[test]
    fn test_owner_bypass_opens_admin_session() {
        let store = Storage::open_in_memory().unwrap();
        let clock = clock();
        let gate = AccessGate::new(&store, &clock);
        let ledger = Ledger::new(&store, &clock, 2, 25);

        let session = login(
            &store,
            &gate,
            &ledger,
            Some(&owner()),
            " owner@example.com",
            "KBUILDSAI2026",
            clock.stamp(),
        )
        .unwrap();

        assert!(session.is_admin);
        assert_eq!(session.tier, Tier::Owner);
        assert_eq!(ledger.lookup("owner@example.com").unwrap().unwrap().tier, Tier::Owner);
        assert_eq!(current(&store).unwrap(), Some(session));
    }

    #[test]
    fn test_owner_email_with_wrong_code_uses_normal_rules() {
        let store = Storage::open_in_memory().unwrap();
        let clock = clock();
        let gate = AccessGate::new(&store, &clock);
        let ledger = Ledger::new(&store, &clock, 2, 25);

        let err = login(
            &store,
            &gate,
            &ledger,
            Some(&owner()),
            "owner@example.com",
            "guess",
            clock.stamp(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidCode));
        assert!(current(&store).unwrap().is_none());
    }

    #[test]
    fn test_code_login_creates_user_with_code_tier() {
        let store = Storage::open_in_memory().unwrap();
        let clock = clock();
        let gate = AccessGate::new(&store, &clock);
        let ledger = Ledger::new(&store, &clock, 2, 25);
        let issued = gate.issue_code("ada@example.com", Tier::Recruiter).unwrap();

        let session = login(
            &store,
            &gate,
            &ledger,
            None,
            "Ada@Example.com",
            &issued.code,
            clock.stamp(),
        )
        .unwrap();

        assert!(!session.is_admin);
        assert_eq!(session.tier, Tier::Recruiter);
        assert_eq!(ledger.lookup("ada@example.com").unwrap().unwrap().credits, 2);
    }

    #[test]
    fn test_login_requires_both_fields() {
        let store = Storage::open_in_memory().unwrap();
        let clock = clock();
        let gate = AccessGate::new(&store, &clock);
        let ledger = Ledger::new(&store, &clock, 2, 25);

        let err = login(&store, &gate, &ledger, None, "", "X", clock.stamp()).unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "email" }));
        let err =
            login(&store, &gate, &ledger, None, "a@b.co", "  ", clock.stamp()).unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "code" }));
    }

    #[test]
    fn test_logout_and_require() {
        let store = Storage::open_in_memory().unwrap();
        let clock = clock();
        let gate = AccessGate::new(&store, &clock);
        let ledger = Ledger::new(&store, &clock, 2, 25);
        login(
            &store,
            &gate,
            &ledger,
            Some(&owner()),
            "owner@example.com",
            "KBUILDSAI2026",
            clock.stamp(),
        )
        .unwrap();

        assert!(require(&store, &clock).is_ok());
        assert!(logout(&store).unwrap());
        assert!(!logout(&store).unwrap());
        assert!(matches!(require(&store, &clock), Err(Error::NotLoggedIn)));
    }

    #[test]
    fn test_code_session_ends_when_week_rolls_over() {
        let store = Storage::open_in_memory().unwrap();
        let clock = clock();
        let gate = AccessGate::new(&store, &clock);
        let ledger = Ledger::new(&store, &clock, 2, 25);
        let issued = gate.issue_code("ada@example.com", Tier::General).unwrap();
        let session = login(
            &store,
            &gate,
            &ledger,
            None,
            "ada@example.com",
            &issued.code,
            clock.stamp(),
        )
        .unwrap();
        assert_eq!(session.code_week.as_deref(), Some("2026W02"));
        assert_eq!(require(&store, &clock).unwrap().email, "ada@example.com");

        let next_week = Clock::fixed(
            New_York,
            Utc.with_ymd_and_hms(2026, 1, 13, 15, 0, 0).unwrap(),
        );
        let err = require(&store, &next_week).unwrap_err();
        assert!(matches!(
            err,
            Error::CodeExpired {
                reason: "week changed"
            }
        ));
        assert!(current(&store).unwrap().is_none());
        assert!(matches!(require(&store, &next_week), Err(Error::NotLoggedIn)));
    }

    #[test]
    fn test_code_session_ends_after_expiry() {
        let store = Storage::open_in_memory().unwrap();
        let clock = clock();
        let mut session = Session {
            email: "ada@example.com".to_string(),
            tier: Tier::General,
            is_admin: false,
            logged_in_at: clock.stamp(),
            code_week: Some(clock.week_id()),
            code_expires_at: Some(clock.stamp() - chrono::Duration::minutes(1)),
        };
        store.put(&keys::session(), &session).unwrap();
        assert!(matches!(
            require(&store, &clock),
            Err(Error::CodeExpired {
                reason: "time window ended"
            })
        ));

        session.code_expires_at = Some(clock.stamp() + chrono::Duration::hours(1));
        store.put(&keys::session(), &session).unwrap();
        assert!(require(&store, &clock).is_ok());
    }

    #[test]
    fn test_owner_session_survives_week_change() {
        let store = Storage::open_in_memory().unwrap();
        let clock = clock();
        let gate = AccessGate::new(&store, &clock);
        let ledger = Ledger::new(&store, &clock, 2, 25);
        login(
            &store,
            &gate,
            &ledger,
            Some(&owner()),
            "owner@example.com",
            "KBUILDSAI2026",
            clock.stamp(),
        )
        .unwrap();

        let later = Clock::fixed(
            New_York,
            Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap(),
        );
        assert!(require(&store, &later).unwrap().is_admin);
    }

    #[test]
    fn test_owner_credentials_from_secrets() {
        let mut secrets = SecretsConfig::default();
        assert!(OwnerCredentials::from_secrets(&secrets).is_none());

        secrets.owner_email = Some("Owner@Example.com".to_string());
        secrets.owner_access_code = Some("CODE".to_string());
        let creds = OwnerCredentials::from_secrets(&secrets).unwrap();
        assert!(creds.matches("owner@example.com", "CODE"));
        assert!(!format!("{creds:?}").contains("CODE"));
    }

    #[test]
    fn test_unlock_admin() {
        let clock = clock();
        let mut session = Session {
            email: "owner@example.com".to_string(),
            tier: Tier::Owner,
            is_admin: true,
            logged_in_at: clock.stamp(),
            code_week: None,
            code_expires_at: None,
        };
        let secrets = SecretsConfig {
            admin_password: Some("open sesame".to_string()),
            ..SecretsConfig::default()
        };

        assert!(unlock_admin(&session, &secrets, "open sesame").is_ok());
        assert!(matches!(
            unlock_admin(&session, &secrets, "wrong"),
            Err(Error::AdminLocked)
        ));
        assert!(matches!(
            unlock_admin(&session, &SecretsConfig::default(), "open sesame"),
            Err(Error::MissingSecret { .. })
        ));

        session.is_admin = false;
        assert!(matches!(
            unlock_admin(&session, &secrets, "open sesame"),
            Err(Error::AdminRequired)
        ));
    }
}
