//! Options used to build a [`FirebaseApp`](crate::FirebaseApp).
//!
//! Options are plain data: they can be deserialized from a JSON file, read from the
//! environment, or assembled with the `with_*` builder methods. Every backend base URL
//! is overridable so tests can point the adapters at a local server.

use crate::core::error::{FirebaseError, FirebaseResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const IDENTITY_TOOLKIT_API: &str = "https://identitytoolkit.googleapis.com/v1";
const FIRESTORE_V1_API: &str = "https://firestore.googleapis.com/v1";
const MEASUREMENT_PROTOCOL_API: &str = "https://www.google-analytics.com";
const INSTALLATIONS_V1_API: &str = "https://firebaseinstallations.googleapis.com/v1";
const FCM_REGISTRATIONS_V1_API: &str = "https://fcmregistrations.googleapis.com/v1";
const IID_API: &str = "https://iid.googleapis.com";
const REMOTE_CONFIG_V1_API: &str = "https://firebaseremoteconfig.googleapis.com/v1";

/// Project-level options.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseOptions {
    pub api_key: String,
    pub project_id: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub measurement_id: Option<String>,
    #[serde(default)]
    pub analytics_api_secret: Option<String>,
    #[serde(default = "default_true")]
    pub analytics_collection_enabled: bool,
    #[serde(default = "default_collection")]
    pub default_collection: String,
    #[serde(default)]
    pub session_path: Option<PathBuf>,
    #[serde(default)]
    pub push_subscription: Option<PushSubscription>,
    #[serde(default)]
    pub endpoints: Endpoints,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Web push subscription registered with FCM to obtain a token.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    pub endpoint: String,
    pub auth: String,
    pub p256dh: String,
    #[serde(default)]
    pub vapid_key: Option<String>,
}

/// Backend base URLs.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Endpoints {
    pub auth: String,
    pub firestore: String,
    pub analytics: String,
    pub installations: String,
    pub fcm_registrations: String,
    pub iid: String,
    pub remote_config: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth: IDENTITY_TOOLKIT_API.to_string(),
            firestore: FIRESTORE_V1_API.to_string(),
            analytics: MEASUREMENT_PROTOCOL_API.to_string(),
            installations: INSTALLATIONS_V1_API.to_string(),
            fcm_registrations: FCM_REGISTRATIONS_V1_API.to_string(),
            iid: IID_API.to_string(),
            remote_config: REMOTE_CONFIG_V1_API.to_string(),
        }
    }
}

impl Endpoints {
    /// Routes every backend to one base URL (e.g. a mock server).
    pub fn all(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        Self {
            auth: base.clone(),
            firestore: base.clone(),
            analytics: base.clone(),
            installations: base.clone(),
            fcm_registrations: base.clone(),
            iid: base.clone(),
            remote_config: base,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_collection() -> String {
    "users".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl FirebaseOptions {
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            project_id: project_id.into(),
            app_id: String::new(),
            measurement_id: None,
            analytics_api_secret: None,
            analytics_collection_enabled: true,
            default_collection: default_collection(),
            session_path: None,
            push_subscription: None,
            endpoints: Endpoints::default(),
            request_timeout_secs: default_timeout_secs(),
        }
    }

    /// Loads options from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> FirebaseResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FirebaseError::invalid_argument(format!(
                "Failed to read options file {}: {}",
                path.display(),
                e
            ))
        })?;
        let options: Self = serde_json::from_str(&content).map_err(|e| {
            FirebaseError::invalid_argument(format!("Invalid options file {}: {}", path.display(), e))
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Reads `FIREBASE_API_KEY`, `FIREBASE_PROJECT_ID` and the optional
    /// `FIREBASE_APP_ID`, `FIREBASE_MEASUREMENT_ID`, `FIREBASE_ANALYTICS_API_SECRET`.
    pub fn from_env() -> FirebaseResult<Self> {
        let required = |name: &str| {
            std::env::var(name).map_err(|_| {
                FirebaseError::invalid_argument(format!("Environment variable {} is not set", name))
            })
        };
        let mut options = Self::new(required("FIREBASE_API_KEY")?, required("FIREBASE_PROJECT_ID")?);
        if let Ok(app_id) = std::env::var("FIREBASE_APP_ID") {
            options.app_id = app_id;
        }
        options.measurement_id = std::env::var("FIREBASE_MEASUREMENT_ID").ok();
        options.analytics_api_secret = std::env::var("FIREBASE_ANALYTICS_API_SECRET").ok();
        options.validate()?;
        Ok(options)
    }

    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self
    }

    pub fn with_measurement(
        mut self,
        measurement_id: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        self.measurement_id = Some(measurement_id.into());
        self.analytics_api_secret = Some(api_secret.into());
        self
    }

    pub fn with_analytics_collection(mut self, enabled: bool) -> Self {
        self.analytics_collection_enabled = enabled;
        self
    }

    pub fn with_default_collection(mut self, collection: impl Into<String>) -> Self {
        self.default_collection = collection.into();
        self
    }

    pub fn with_session_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_path = Some(path.into());
        self
    }

    pub fn with_push_subscription(mut self, subscription: PushSubscription) -> Self {
        self.push_subscription = Some(subscription);
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> FirebaseResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(FirebaseError::invalid_argument("apiKey must not be empty"));
        }
        if self.project_id.trim().is_empty() {
            return Err(FirebaseError::invalid_argument("projectId must not be empty"));
        }
        if self.default_collection.trim().is_empty() || self.default_collection.contains('/') {
            return Err(FirebaseError::invalid_argument(
                "defaultCollection must be a single non-empty path segment",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_options_from_json_file_applies_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "apiKey": "key", "projectId": "demo", "measurementId": "G-123" }}"#
        )
        .unwrap();

        let options = FirebaseOptions::from_json_file(file.path()).unwrap();
        assert_eq!(options.api_key, "key");
        assert_eq!(options.project_id, "demo");
        assert_eq!(options.measurement_id.as_deref(), Some("G-123"));
        assert!(options.analytics_collection_enabled);
        assert_eq!(options.default_collection, "users");
        assert_eq!(options.endpoints, Endpoints::default());
    }

    #[test]
    fn test_validate_rejects_missing_project() {
        let options = FirebaseOptions::new("key", " ");
        assert!(options.validate().is_err());

        let options = FirebaseOptions::new("key", "demo").with_default_collection("a/b");
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_endpoints_all_trims_trailing_slash() {
        let endpoints = Endpoints::all("http://127.0.0.1:9000/");
        assert_eq!(endpoints.auth, "http://127.0.0.1:9000");
        assert_eq!(endpoints.remote_config, "http://127.0.0.1:9000");
    }
}
