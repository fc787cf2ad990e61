//! Key builders for the storage namespaces.
//!
//! Emails are trimmed and lowercased so that `Ada@Example.com ` and
//! `ada@example.com` share one user record. Codes are trimmed but keep their
//! case.

/// Namespace for user records.
pub const USER: &str = "user";
/// Namespace for access-code records.
pub const CODE: &str = "code";
/// Namespace for per-user run history.
pub const HISTORY: &str = "history";
/// Namespace for cached briefs.
pub const CACHE: &str = "cache";
/// Namespace for the CLI session.
pub const SESSION: &str = "session";

/// Canonical form of an email address.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Key of a user record.
#[must_use]
pub fn user(email: &str) -> String {
    format!("{USER}:{}", normalize_email(email))
}

/// Key of an access-code record.
#[must_use]
pub fn code(code: &str) -> String {
    format!("{CODE}:{}", code.trim())
}

/// Key of a user's run history.
#[must_use]
pub fn history(email: &str) -> String {
    format!("{HISTORY}:{}", normalize_email(email))
}

/// Key of a cached brief.
#[must_use]
pub fn cache(hash: &str) -> String {
    format!("{CACHE}:{hash}")
}

/// Key of the current CLI session.
#[must_use]
pub fn session() -> String {
    format!("{SESSION}:current")
}

/// Prefix shared by every key in `namespace`.
#[must_use]
pub fn prefix(namespace: &str) -> String {
    format!("{namespace}:")
}

/// Namespace part of a key; the whole key if it has no `:`.
#[must_use]
pub fn namespace(key: &str) -> &str {
    key.split_once(':').map_or(key, |(ns, _)| ns)
}
