//! Firebase Remote Config for this client.
//!
//! Values are fetched from the backend, held until `activate()` promotes them, and
//! read through typed getters that fall back to in-app defaults.
//!
//! # Fetch throttling
//!
//! A fetch within `minimum_fetch_interval` of the last successful one returns
//! [`FetchStatus::Throttled`] without contacting the backend.

pub mod models;


use self::models::{FetchRequest, FetchResponse, FetchStatus, ValueSource};
use crate::config::FirebaseOptions;
use crate::core::error::{FirebaseError, FirebaseResult};
use crate::core::middleware::ApiKeyMiddleware;
use crate::core::parse_error_response;
use crate::installations::FirebaseInstallations;
use chrono::{DateTime, Utc};
use reqwest::{header, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub(crate) const REMOTE_CONFIG_DOMAIN: &str = "remote_config";

const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_MINIMUM_FETCH_INTERVAL: Duration = Duration::from_secs(12 * 60 * 60);
const TRUTHY_VALUES: [&str; 6] = ["1", "true", "t", "yes", "y", "on"];

#[derive(Debug, Default)]
struct RemoteConfigState {
    defaults: HashMap<String, String>,
    active: HashMap<String, String>,
    pending: Option<HashMap<String, String>>,
    last_fetch: Option<DateTime<Utc>>,
    etag: Option<String>,
}

/// Client for fetching and reading Remote Config values.
#[derive(Clone)]
pub struct FirebaseRemoteConfig {
    client: ClientWithMiddleware,
    fetch_url: String,
    app_id: String,
    language_code: String,
    installations: FirebaseInstallations,
    minimum_fetch_interval: Arc<Mutex<Duration>>,
    state: Arc<Mutex<RemoteConfigState>>,
}

impl FirebaseRemoteConfig {
    /// Creates a new `FirebaseRemoteConfig` instance.
    ///
    /// This is typically called via `FirebaseApp::remote_config()`.
    pub fn new(
        http: reqwest::Client,
        options: &FirebaseOptions,
        installations: FirebaseInstallations,
    ) -> Self {
        let client = ClientBuilder::new(http)
            .with(ApiKeyMiddleware::new(options.api_key.clone()))
            .build();
        let fetch_url = format!(
            "{}/projects/{}/namespaces/firebase:fetch",
            options.endpoints.remote_config.trim_end_matches('/'),
            options.project_id
        );
        Self::new_with_client(client, fetch_url, &options.app_id, installations)
    }

    pub(crate) fn new_with_client(
        client: ClientWithMiddleware,
        fetch_url: String,
        app_id: &str,
        installations: FirebaseInstallations,
    ) -> Self {
        Self {
            client,
            fetch_url,
            app_id: app_id.to_string(),
            language_code: "en-US".to_string(),
            installations,
            minimum_fetch_interval: Arc::new(Mutex::new(DEFAULT_MINIMUM_FETCH_INTERVAL)),
            state: Arc::new(Mutex::new(RemoteConfigState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, RemoteConfigState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_minimum_fetch_interval(&self, interval: Duration) {
        *self
            .minimum_fetch_interval
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = interval;
    }

    fn minimum_fetch_interval(&self) -> Duration {
        *self
            .minimum_fetch_interval
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets in-app defaults. Non-string values are stored in their JSON form.
    pub fn set_defaults<I, K>(&self, defaults: I)
    where
        I: IntoIterator<Item = (K, serde_json::Value)>,
        K: Into<String>,
    {
        let defaults = defaults
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key.into(), value)
            })
            .collect();
        self.state().defaults = defaults;
    }

    pub async fn fetch(&self) -> FirebaseResult<FetchStatus> {
        let (last_fetch, etag) = {
            let state = self.state();
            (state.last_fetch, state.etag.clone())
        };
        if let Some(last) = last_fetch {
            let elapsed = (Utc::now() - last).to_std().unwrap_or_default();
            if elapsed < self.minimum_fetch_interval() {
                log::debug!("Remote Config fetch throttled");
                return Ok(FetchStatus::Throttled);
            }
        }

        let installation = self.installations.installation().await?;
        let request = FetchRequest {
            app_instance_id: &installation.fid,
            app_instance_id_token: &installation.auth_token,
            app_id: &self.app_id,
            sdk_version: SDK_VERSION,
            language_code: &self.language_code,
        };

        let response = self
            .client
            .post(&self.fetch_url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::IF_NONE_MATCH, etag.as_deref().unwrap_or("*"))
            .body(serde_json::to_vec(&request)?)
            .send()
            .await
            .map_err(|e| FirebaseError::from(e).in_domain(REMOTE_CONFIG_DOMAIN))?;

        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            self.state().last_fetch = Some(Utc::now());
            return Ok(FetchStatus::NoChange);
        }
        if !status.is_success() {
            return Err(parse_error_response(response, REMOTE_CONFIG_DOMAIN).await);
        }

        let new_etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body: FetchResponse = response
            .json()
            .await
            .map_err(|e| FirebaseError::from(e).in_domain(REMOTE_CONFIG_DOMAIN))?;

        let entries = match body.state.as_deref() {
            Some("NO_CHANGE") => {
                self.state().last_fetch = Some(Utc::now());
                return Ok(FetchStatus::NoChange);
            }
            Some("NO_TEMPLATE") | Some("EMPTY_CONFIG") => HashMap::new(),
            Some("INSTANCE_STATE_UNSPECIFIED") => {
                return Err(FirebaseError::internal(
                    "Remote Config returned an unspecified instance state",
                )
                .with_domain(REMOTE_CONFIG_DOMAIN));
            }
            _ => body.entries.unwrap_or_default(),
        };

        log::debug!(
            "Fetched {} Remote Config entries (template {})",
            entries.len(),
            body.template_version.as_deref().unwrap_or("unknown")
        );

        let mut state = self.state();
        state.pending = Some(entries);
        state.last_fetch = Some(Utc::now());
        if new_etag.is_some() {
            state.etag = new_etag;
        }
        Ok(FetchStatus::Fetched)
    }

    /// Promotes fetched values. Returns `true` if the active values changed.
    pub fn activate(&self) -> bool {
        let mut state = self.state();
        match state.pending.take() {
            Some(pending) if pending != state.active => {
                state.active = pending;
                true
            }
            _ => false,
        }
    }

    pub async fn fetch_and_activate(&self) -> FirebaseResult<bool> {
        self.fetch().await?;
        Ok(self.activate())
    }

    /// Returns the value and where it came from.
    pub fn get_value(&self, key: &str) -> (String, ValueSource) {
        let state = self.state();
        if let Some(value) = state.active.get(key) {
            return (value.clone(), ValueSource::Remote);
        }
        if let Some(value) = state.defaults.get(key) {
            return (value.clone(), ValueSource::Default);
        }
        (String::new(), ValueSource::Static)
    }

    pub fn get_string(&self, key: &str) -> String {
        self.get_value(key).0
    }

    pub fn get_bool(&self, key: &str) -> bool {
        let (value, source) = self.get_value(key);
        source != ValueSource::Static && TRUTHY_VALUES.contains(&value.to_lowercase().as_str())
    }

    /// Parses the value as a number, `0.0` when it is not numeric.
    pub fn get_number(&self, key: &str) -> f64 {
        self.get_value(key).0.trim().parse().unwrap_or(0.0)
    }
}
