use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Closed classification of every failure that can cross the façade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request never produced a backend answer (DNS, TLS, timeout, 503).
    Network,
    /// The backend refused the caller (security rules, disabled account).
    PermissionDenied,
    /// Malformed input, rejected locally or by the backend.
    InvalidArgument,
    /// Wrong email/password pair.
    InvalidCredential,
    /// The resource already exists, e.g. an account with the same email.
    AlreadyExists,
    /// The request carried no valid credentials.
    Unauthenticated,
    /// A non-document resource is missing. Missing documents are `Ok(None)`.
    NotFound,
    /// Quota or rate limit exceeded.
    ResourceExhausted,
    /// The façade is not in a state to run the operation (e.g. not configured).
    FailedPrecondition,
    /// Backend-internal failure or an unreadable response.
    Internal,
}

impl ErrorKind {
    /// Canonical numeric code (google.rpc.Code) used when the backend supplies none.
    pub fn canonical_code(self) -> i32 {
        match self {
            ErrorKind::InvalidArgument => 3,
            ErrorKind::NotFound => 5,
            ErrorKind::AlreadyExists => 6,
            ErrorKind::PermissionDenied => 7,
            ErrorKind::ResourceExhausted => 8,
            ErrorKind::FailedPrecondition => 9,
            ErrorKind::Internal => 13,
            ErrorKind::Network => 14,
            ErrorKind::Unauthenticated | ErrorKind::InvalidCredential => 16,
        }
    }

    /// Maps a canonical status string (`"PERMISSION_DENIED"`, ...) to a kind.
    pub fn from_status(status: &str) -> Option<Self> {
        let kind = match status {
            "INVALID_ARGUMENT" | "OUT_OF_RANGE" => ErrorKind::InvalidArgument,
            "NOT_FOUND" => ErrorKind::NotFound,
            "ALREADY_EXISTS" | "ABORTED" => ErrorKind::AlreadyExists,
            "PERMISSION_DENIED" => ErrorKind::PermissionDenied,
            "UNAUTHENTICATED" => ErrorKind::Unauthenticated,
            "RESOURCE_EXHAUSTED" => ErrorKind::ResourceExhausted,
            "FAILED_PRECONDITION" => ErrorKind::FailedPrecondition,
            "UNAVAILABLE" | "DEADLINE_EXCEEDED" => ErrorKind::Network,
            "INTERNAL" | "UNKNOWN" | "DATA_LOSS" | "UNIMPLEMENTED" => ErrorKind::Internal,
            _ => return None,
        };
        Some(kind)
    }

    /// Maps an HTTP status code to a kind.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 | 413 | 422 => ErrorKind::InvalidArgument,
            401 => ErrorKind::Unauthenticated,
            403 => ErrorKind::PermissionDenied,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::AlreadyExists,
            412 => ErrorKind::FailedPrecondition,
            429 => ErrorKind::ResourceExhausted,
            502..=504 => ErrorKind::Network,
            _ => ErrorKind::Internal,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Network => "network",
            ErrorKind::PermissionDenied => "permission-denied",
            ErrorKind::InvalidArgument => "invalid-argument",
            ErrorKind::InvalidCredential => "invalid-credential",
            ErrorKind::AlreadyExists => "already-exists",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::NotFound => "not-found",
            ErrorKind::ResourceExhausted => "resource-exhausted",
            ErrorKind::FailedPrecondition => "failed-precondition",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// The error envelope returned by every fallible façade operation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct FirebaseError {
    pub kind: ErrorKind,
    pub domain: Option<String>,
    pub code: i32,
    pub metadata: BTreeMap<String, Value>,
    pub message: String,
}

pub type FirebaseResult<T> = Result<T, FirebaseError>;

impl FirebaseError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            domain: None,
            code: kind.canonical_code(),
            metadata: BTreeMap::new(),
            message: message.into(),
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn not_configured() -> Self {
        Self::new(
            ErrorKind::FailedPrecondition,
            "configure() must be called before any other operation",
        )
    }

    /// Sets the domain only if the error does not carry one yet.
    pub(crate) fn in_domain(mut self, domain: &str) -> Self {
        if self.domain.is_none() {
            self.domain = Some(domain.to_string());
        }
        self
    }
}

impl From<reqwest::Error> for FirebaseError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return FirebaseError::internal(format!("Failed to decode response: {}", e));
        }
        let mut error = FirebaseError::new(ErrorKind::Network, format!("HTTP Request failed: {}", e));
        if let Some(status) = e.status() {
            error = error.with_metadata("httpStatus", status.as_u16());
        }
        error
    }
}

impl From<reqwest_middleware::Error> for FirebaseError {
    fn from(e: reqwest_middleware::Error) -> Self {
        match e {
            reqwest_middleware::Error::Reqwest(e) => e.into(),
            reqwest_middleware::Error::Middleware(e) => FirebaseError::new(
                ErrorKind::Unauthenticated,
                format!("Middleware error: {}", e),
            ),
        }
    }
}

impl From<serde_json::Error> for FirebaseError {
    fn from(e: serde_json::Error) -> Self {
        FirebaseError::internal(format!("Serialization error: {}", e))
    }
}

impl From<url::ParseError> for FirebaseError {
    fn from(e: url::ParseError) -> Self {
        FirebaseError::invalid_argument(format!("Invalid URL: {}", e))
    }
}
