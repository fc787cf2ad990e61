//! Error types for briefgate.
//!
//! This module defines all error types used throughout the briefgate crate,
//! providing detailed context for debugging and user-facing messages for the
//! access and credit checks.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for briefgate operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A stored value could not be decoded into its record type.
    #[error("stored record under '{key}' is unreadable: {source}")]
    RecordDecode {
        /// Storage key of the record.
        key: String,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// A secret required by the requested operation is not configured.
    #[error("missing required secret: {key}. Set it in the config file or the environment")]
    MissingSecret {
        /// Name of the secret as it appears in the `[secrets]` table.
        key: &'static str,
    },

    // === Input Errors ===
    /// A required form field was empty.
    #[error("required field is empty: {field}")]
    MissingField {
        /// Name of the field.
        field: &'static str,
    },

    /// An email address did not look like one.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    // === Access Errors ===
    /// The access code does not exist.
    #[error("Invalid code.")]
    InvalidCode,

    /// The access code exists but is no longer valid.
    #[error("Code expired ({reason}). Request a new code.")]
    CodeExpired {
        /// Which expiry rule rejected the code.
        reason: &'static str,
    },

    /// The stored code record could not be interpreted.
    #[error("Code expiry is malformed. Ask the owner for a new code.")]
    MalformedCode,

    /// The access code is bound to a different email.
    #[error("Code does not match this email. Use the email you requested access with.")]
    CodeEmailMismatch,

    /// An admin tried to bind a code that does not exist.
    #[error("Code not found.")]
    CodeNotFound,

    /// An admin tried to bind a code that already has an owner.
    #[error("Code already bound to an email.")]
    CodeAlreadyBound,

    /// No one is logged in.
    #[error("not logged in. Run `briefgate login` first")]
    NotLoggedIn,

    /// The session is not an admin session.
    #[error("admin tools require an owner session")]
    AdminRequired,

    /// The admin unlock password was wrong.
    #[error("admin password does not match")]
    AdminLocked,

    // === Credit Errors ===
    /// The user has no credits left.
    #[error("You have 0 credits remaining. Contact the owner to request more credits.")]
    NoCredits,

    // === API Errors ===
    /// The brief API answered with a non-success status.
    #[error("Perplexity error {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// The brief API answered, but without usable content.
    #[error("unexpected API response: {0}")]
    ApiResponse(String),

    /// An outbound HTTP request failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    // === Output Errors ===
    /// PDF generation failed.
    #[error("PDF generation failed: {0}")]
    Pdf(String),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

/// A specialized Result type for briefgate operations.
pub type Result<T> = std::result::Result<T, Error>;
