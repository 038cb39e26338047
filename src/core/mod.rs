pub mod error;
pub mod middleware;

use self::error::{ErrorKind, FirebaseError};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct FirebaseErrorResponse {
    pub error: FirebaseErrorDetails,
}

#[derive(Debug, Deserialize)]
pub struct FirebaseErrorDetails {
    pub code: i32,
    pub message: String,
    pub status: Option<String>,
    pub errors: Option<Vec<FirebaseSubError>>,
}

#[derive(Debug, Deserialize)]
pub struct FirebaseSubError {
    pub message: String,
    pub domain: Option<String>,
    pub reason: Option<String>,
}

impl FirebaseErrorResponse {
    /// Converts the backend error body into an envelope for `domain`.
    pub fn into_error(self, domain: &str, http_status: u16) -> FirebaseError {
        let details = self.error;
        let kind = details
            .status
            .as_deref()
            .and_then(ErrorKind::from_status)
            .unwrap_or_else(|| ErrorKind::from_http_status(http_status));

        let mut error = FirebaseError::new(kind, details.message)
            .with_domain(domain)
            .with_code(details.code)
            .with_metadata("httpStatus", http_status);

        if let Some(status) = details.status {
            error = error.with_metadata("status", status);
        }
        if let Some(sub) = details.errors.and_then(|mut errors| errors.pop()) {
            if let Some(reason) = sub.reason {
                error = error.with_metadata("reason", reason);
            }
            if let Some(sub_domain) = sub.domain {
                error = error.with_metadata("errorDomain", sub_domain);
            }
        }
        error
    }
}

/// Reads a non-success response into an envelope, falling back to the HTTP status
/// when the body is not a Google API error.
pub async fn parse_error_response(response: reqwest::Response, domain: &str) -> FirebaseError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    error_from_body(status, &text, domain)
}

/// Builds the envelope for an already-read error body.
pub fn error_from_body(status: reqwest::StatusCode, text: &str, domain: &str) -> FirebaseError {
    match serde_json::from_str::<FirebaseErrorResponse>(text) {
        Ok(error_resp) => error_resp.into_error(domain, status.as_u16()),
        Err(_) => {
            let message = if text.trim().is_empty() {
                format!("Request failed: {}", status)
            } else {
                format!("Request failed {}: {}", status, text.trim())
            };
            FirebaseError::new(ErrorKind::from_http_status(status.as_u16()), message)
                .with_domain(domain)
                .with_code(i32::from(status.as_u16()))
                .with_metadata("httpStatus", status.as_u16())
        }
    }
}
