//! Outbound form posts to owner-configured webhooks.

use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use tracing::{debug, warn};

use crate::access::validate_email;
use crate::error::{Error, Result};

/// What came back from a webhook post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookOutcome {
    /// HTTP status, or `None` if the request never got a response.
    pub status: Option<u16>,
    /// Response body, or the transport error text.
    pub body: String,
}

impl WebhookOutcome {
    /// Whether the webhook answered with a 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_some_and(|s| (200..300).contains(&s))
    }
}

/// POST `payload` as JSON to `url`.
///
/// Transport failures are reported in the outcome rather than as errors.
///
/// # Errors
///
/// Returns an error only if the HTTP client cannot be built.
pub async fn post_json<T: Serialize + ?Sized>(
    url: &str,
    payload: &T,
    timeout: Duration,
) -> Result<WebhookOutcome> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    debug!(url, "Posting webhook");

    let outcome = match client.post(url).json(payload).send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            WebhookOutcome {
                status: Some(status),
                body,
            }
        }
        Err(e) => {
            warn!(url, error = %e, "Webhook request failed");
            WebhookOutcome {
                status: None,
                body: e.to_string(),
            }
        }
    };
    Ok(outcome)
}

/// An access request from the sign-up form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignupRequest {
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Work email.
    pub email: String,
    /// Company.
    pub company: String,
    /// Job title.
    pub title: String,
    /// `LinkedIn` profile URL.
    pub linkedin: String,
    /// Why they want access.
    pub reason: String,
    /// Submission time.
    pub submitted_at: DateTime<FixedOffset>,
}

impl SignupRequest {
    /// Check that every field is filled in and the email looks valid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] for the first blank field or
    /// [`Error::InvalidEmail`].
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("email", &self.email),
            ("company", &self.company),
            ("title", &self.title),
            ("linkedin", &self.linkedin),
            ("reason", &self.reason),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(Error::MissingField { field });
            }
        }
        validate_email(&self.email)?;
        Ok(())
    }
}

/// A message to the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactMessage {
    /// Reply-to email; may be empty.
    pub email: String,
    /// Message text.
    pub message: String,
    /// Submission time.
    pub submitted_at: DateTime<FixedOffset>,
}

impl ContactMessage {
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] for an empty message.
    pub fn validate(&self) -> Result<()> {
        if self.message.trim().is_empty() {
            return Err(Error::MissingField { field: "message" });
        }
        Ok(())
    }
}
