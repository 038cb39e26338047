//! Firebase Installations: registers this client and keeps its FID and auth token.
//!
//! Messaging and Remote Config both identify the client through the installation,
//! so one `FirebaseInstallations` handle is shared between them.

#[cfg(test)]
mod tests;

use crate::config::FirebaseOptions;
use crate::core::error::{FirebaseError, FirebaseResult};
use crate::core::parse_error_response;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use reqwest::header;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

pub(crate) const INSTALLATIONS_DOMAIN: &str = "installations";

const AUTH_VERSION: &str = "FIS_v2";
const SDK_VERSION: &str = concat!("r:", env!("CARGO_PKG_VERSION"));
const TOKEN_EXPIRATION_BUFFER_SECS: i64 = 60 * 60;

/// A registered installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub fid: String,
    pub refresh_token: String,
    pub auth_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Installation {
    /// True when the auth token expires within the next hour.
    pub fn needs_token_refresh(&self) -> bool {
        Utc::now() + chrono::Duration::seconds(TOKEN_EXPIRATION_BUFFER_SECS) >= self.expires_at
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateInstallationRequest<'a> {
    fid: &'a str,
    auth_version: &'a str,
    app_id: &'a str,
    sdk_version: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateInstallationResponse {
    #[serde(default)]
    fid: Option<String>,
    refresh_token: String,
    auth_token: AuthTokenResponse,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateAuthTokenRequest<'a> {
    installation: GenerateAuthTokenInstallation<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateAuthTokenInstallation<'a> {
    app_id: &'a str,
    sdk_version: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthTokenResponse {
    token: String,
    expires_in: String,
}

/// Parses durations such as `"604800s"`.
fn parse_expires_in(value: &str) -> FirebaseResult<chrono::Duration> {
    let seconds: i64 = value.trim_end_matches('s').parse().map_err(|_| {
        FirebaseError::internal(format!("Invalid expiresIn value '{}'", value))
            .in_domain(INSTALLATIONS_DOMAIN)
    })?;
    Ok(chrono::Duration::seconds(seconds))
}

/// Generates a FID: 17 random bytes, the first with its high nibble set to `0111`,
/// encoded as 22 characters of URL-safe base64.
pub fn generate_fid() -> String {
    let mut bytes = [0u8; 17];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes[0] = 0b0111_0000 | (bytes[0] & 0b0000_1111);
    let mut fid = URL_SAFE_NO_PAD.encode(bytes);
    fid.truncate(22);
    fid
}

/// Client for the Firebase Installations API.
#[derive(Clone)]
pub struct FirebaseInstallations {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
    app_id: String,
    current: Arc<Mutex<Option<Installation>>>,
}

impl FirebaseInstallations {
    pub fn new(http: reqwest::Client, options: &FirebaseOptions) -> Self {
        let base_url = format!(
            "{}/projects/{}/installations",
            options.endpoints.installations.trim_end_matches('/'),
            options.project_id
        );
        Self::new_with_client(
            ClientBuilder::new(http).build(),
            base_url,
            &options.api_key,
            &options.app_id,
        )
    }

    pub(crate) fn new_with_client(
        client: ClientWithMiddleware,
        base_url: String,
        api_key: &str,
        app_id: &str,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key: api_key.to_string(),
            app_id: app_id.to_string(),
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the registered installation, registering it on first use and
    /// refreshing its auth token when it is about to expire.
    pub async fn installation(&self) -> FirebaseResult<Installation> {
        let mut current = self.current.lock().await;
        if let Some(installation) = current.as_mut() {
            if installation.needs_token_refresh() {
                let (token, expires_at) = self.generate_auth_token(installation).await?;
                installation.auth_token = token;
                installation.expires_at = expires_at;
            }
            return Ok(installation.clone());
        }
        let installation = self.register(&generate_fid()).await?;
        *current = Some(installation.clone());
        Ok(installation)
    }

    async fn register(&self, fid: &str) -> FirebaseResult<Installation> {
        let request = CreateInstallationRequest {
            fid,
            auth_version: AUTH_VERSION,
            app_id: &self.app_id,
            sdk_version: SDK_VERSION,
        };

        let response = self
            .client
            .post(&self.base_url)
            .header("x-goog-api-key", &self.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&request)?)
            .send()
            .await
            .map_err(|e| FirebaseError::from(e).in_domain(INSTALLATIONS_DOMAIN))?;

        if !response.status().is_success() {
            return Err(parse_error_response(response, INSTALLATIONS_DOMAIN).await);
        }

        let body: CreateInstallationResponse = response
            .json()
            .await
            .map_err(|e| FirebaseError::from(e).in_domain(INSTALLATIONS_DOMAIN))?;
        let expires_in = parse_expires_in(&body.auth_token.expires_in)?;
        log::debug!("Registered installation {}", body.fid.as_deref().unwrap_or(fid));

        Ok(Installation {
            fid: body.fid.unwrap_or_else(|| fid.to_string()),
            refresh_token: body.refresh_token,
            auth_token: body.auth_token.token,
            expires_at: Utc::now() + expires_in,
        })
    }

    async fn generate_auth_token(
        &self,
        installation: &Installation,
    ) -> FirebaseResult<(String, DateTime<Utc>)> {
        let url = format!("{}/{}/authTokens:generate", self.base_url, installation.fid);
        let request = GenerateAuthTokenRequest {
            installation: GenerateAuthTokenInstallation {
                app_id: &self.app_id,
                sdk_version: SDK_VERSION,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header(
                header::AUTHORIZATION,
                format!("{} {}", AUTH_VERSION, installation.refresh_token),
            )
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&request)?)
            .send()
            .await
            .map_err(|e| FirebaseError::from(e).in_domain(INSTALLATIONS_DOMAIN))?;

        if !response.status().is_success() {
            return Err(parse_error_response(response, INSTALLATIONS_DOMAIN).await);
        }

        let body: AuthTokenResponse = response
            .json()
            .await
            .map_err(|e| FirebaseError::from(e).in_domain(INSTALLATIONS_DOMAIN))?;
        let expires_in = parse_expires_in(&body.expires_in)?;
        log::debug!("Refreshed auth token for installation {}", installation.fid);

        Ok((body.token, Utc::now() + expires_in))
    }
}
