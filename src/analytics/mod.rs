//! Analytics event logging through the GA4 Measurement Protocol.
//!
//! Logging is fire-and-forget: invalid names and transport failures are logged and
//! dropped, never returned to the caller. The analytics user id and user properties
//! are remembered and attached to every later event.

pub mod models;


use self::models::{EventParams, MeasurementEvent, MeasurementPayload, UserPropertyValue};
use crate::config::FirebaseOptions;
use crate::core::error::{FirebaseError, FirebaseResult};
use crate::core::parse_error_response;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub(crate) const ANALYTICS_DOMAIN: &str = "analytics";

const MAX_EVENT_NAME_LENGTH: usize = 40;
const MAX_USER_PROPERTY_NAME_LENGTH: usize = 24;
const MAX_USER_PROPERTY_VALUE_LENGTH: usize = 36;
const RESERVED_PREFIXES: [&str; 3] = ["firebase_", "google_", "ga_"];

#[derive(Debug, Default)]
struct AnalyticsState {
    collection_enabled: bool,
    user_id: Option<String>,
    user_properties: BTreeMap<String, String>,
}

/// Client for logging analytics events.
#[derive(Clone)]
pub struct FirebaseAnalytics {
    client: ClientWithMiddleware,
    collect_url: String,
    measurement_id: Option<String>,
    api_secret: Option<String>,
    client_id: String,
    state: Arc<Mutex<AnalyticsState>>,
}

/// Checks an event or user property name: starts with a letter, then letters,
/// digits or underscores, no reserved prefix.
pub fn is_valid_name(name: &str, max_length: usize) -> bool {
    let mut chars = name.chars();
    let starts_with_letter = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic());
    starts_with_letter
        && name.len() <= max_length
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        && !RESERVED_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

fn generate_client_id() -> String {
    format!(
        "{}.{}",
        rand::random::<u32>(),
        chrono::Utc::now().timestamp()
    )
}

impl FirebaseAnalytics {
    /// Creates a new `FirebaseAnalytics` instance.
    ///
    /// This is typically called via `FirebaseApp::analytics()`.
    pub fn new(http: reqwest::Client, options: &FirebaseOptions) -> Self {
        let client = ClientBuilder::new(http).build();
        let collect_url = format!(
            "{}/mp/collect",
            options.endpoints.analytics.trim_end_matches('/')
        );

        Self {
            client,
            collect_url,
            measurement_id: options.measurement_id.clone(),
            api_secret: options.analytics_api_secret.clone(),
            client_id: generate_client_id(),
            state: Arc::new(Mutex::new(AnalyticsState {
                collection_enabled: options.analytics_collection_enabled,
                ..AnalyticsState::default()
            })),
        }
    }

    #[cfg(test)]
    pub(crate) fn new_with_client(
        client: ClientWithMiddleware,
        collect_url: String,
        client_id: &str,
    ) -> Self {
        Self {
            client,
            collect_url,
            measurement_id: Some("G-TEST".to_string()),
            api_secret: Some("secret".to_string()),
            client_id: client_id.to_string(),
            state: Arc::new(Mutex::new(AnalyticsState {
                collection_enabled: true,
                ..AnalyticsState::default()
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, AnalyticsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn set_collection_enabled(&self, enabled: bool) {
        self.state().collection_enabled = enabled;
    }

    pub fn is_collection_enabled(&self) -> bool {
        self.state().collection_enabled
    }

    pub fn set_user_id(&self, user_id: &str) {
        self.state().user_id = Some(user_id.to_string());
    }

    pub fn user_id(&self) -> Option<String> {
        self.state().user_id.clone()
    }

    pub fn set_user_property(&self, name: &str, value: &str) {
        if !is_valid_name(name, MAX_USER_PROPERTY_NAME_LENGTH) {
            log::warn!("Dropping user property with invalid name '{}'", name);
            return;
        }
        if value.chars().count() > MAX_USER_PROPERTY_VALUE_LENGTH {
            log::warn!("Dropping user property '{}': value is too long", name);
            return;
        }
        self.state()
            .user_properties
            .insert(name.to_string(), value.to_string());
    }

    pub fn user_properties(&self) -> BTreeMap<String, String> {
        self.state().user_properties.clone()
    }

    /// Logs an event. Failures are logged and swallowed.
    pub async fn log_event(&self, name: &str, params: Option<&EventParams>) {
        match self.send_event(name, params).await {
            Ok(true) => log::debug!("Logged analytics event '{}'", name),
            Ok(false) => {}
            Err(e) => log::warn!("Failed to log analytics event '{}': {}", name, e),
        }
    }

    /// Sends one event. Returns `Ok(false)` when the event was dropped locally.
    pub async fn send_event(&self, name: &str, params: Option<&EventParams>) -> FirebaseResult<bool> {
        let (Some(measurement_id), Some(api_secret)) = (&self.measurement_id, &self.api_secret)
        else {
            log::debug!("Analytics is not configured; dropping event '{}'", name);
            return Ok(false);
        };

        if !is_valid_name(name, MAX_EVENT_NAME_LENGTH) {
            log::warn!("Dropping analytics event with invalid name '{}'", name);
            return Ok(false);
        }

        let (user_id, user_properties) = {
            let state = self.state();
            if !state.collection_enabled {
                return Ok(false);
            }
            (state.user_id.clone(), state.user_properties.clone())
        };

        let empty = EventParams::new();
        let payload = MeasurementPayload {
            client_id: &self.client_id,
            user_id: user_id.as_deref(),
            user_properties: user_properties
                .iter()
                .map(|(k, v)| (k.as_str(), UserPropertyValue { value: v.as_str() }))
                .collect(),
            events: vec![MeasurementEvent {
                name,
                params: params.unwrap_or(&empty),
            }],
        };

        let response = self
            .client
            .post(&self.collect_url)
            .query(&[
                ("measurement_id", measurement_id.as_str()),
                ("api_secret", api_secret.as_str()),
            ])
            .json(&payload)
            .send()
            .await
            .map_err(|e| FirebaseError::from(e).in_domain(ANALYTICS_DOMAIN))?;

        if !response.status().is_success() {
            return Err(parse_error_response(response, ANALYTICS_DOMAIN).await);
        }

        Ok(true)
    }
}
