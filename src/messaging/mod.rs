//! Cloud Messaging registration token and topic management for this client.
//!
//! A token is obtained by registering the configured web push subscription with FCM,
//! authenticated by the Firebase installation. The issued token is kept until
//! [`FirebaseMessaging::delete_token`] invalidates it.

pub mod models;

#[cfg(test)]
mod tests;

use self::models::{
    RegistrationRequest, RegistrationResponse, TopicManagementApiResponse,
    TopicManagementRequest, WebRegistration,
};
use crate::config::{FirebaseOptions, PushSubscription};
use crate::core::error::{ErrorKind, FirebaseError, FirebaseResult};
use crate::core::parse_error_response;
use crate::installations::{FirebaseInstallations, Installation};
use reqwest::header;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use std::sync::Arc;
use tokio::sync::Mutex;

pub(crate) const MESSAGING_DOMAIN: &str = "messaging";

/// Strips a leading `/topics/` and checks the name against `[a-zA-Z0-9-_.~%]+`.
pub fn normalize_topic(topic: &str) -> FirebaseResult<&str> {
    let name = topic.strip_prefix("/topics/").unwrap_or(topic);
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | '%'));
    if !valid {
        return Err(
            FirebaseError::invalid_argument(format!("Invalid topic name '{}'", topic))
                .in_domain(MESSAGING_DOMAIN),
        );
    }
    Ok(name)
}

/// Client for this device's messaging registration.
#[derive(Clone)]
pub struct FirebaseMessaging {
    client: ClientWithMiddleware,
    registrations_url: String,
    iid_url: String,
    api_key: String,
    subscription: Option<PushSubscription>,
    installations: FirebaseInstallations,
    token: Arc<Mutex<Option<String>>>,
}

impl FirebaseMessaging {
    /// Creates a new `FirebaseMessaging` instance.
    ///
    /// This is typically called via `FirebaseApp::messaging()`.
    pub fn new(
        http: reqwest::Client,
        options: &FirebaseOptions,
        installations: FirebaseInstallations,
    ) -> Self {
        let registrations_url = format!(
            "{}/projects/{}/registrations",
            options.endpoints.fcm_registrations.trim_end_matches('/'),
            options.project_id
        );
        let iid_url = format!("{}/iid/v1", options.endpoints.iid.trim_end_matches('/'));

        Self::new_with_client(
            ClientBuilder::new(http).build(),
            registrations_url,
            iid_url,
            &options.api_key,
            options.push_subscription.clone(),
            installations,
        )
    }

    pub(crate) fn new_with_client(
        client: ClientWithMiddleware,
        registrations_url: String,
        iid_url: String,
        api_key: &str,
        subscription: Option<PushSubscription>,
        installations: FirebaseInstallations,
    ) -> Self {
        Self {
            client,
            registrations_url,
            iid_url,
            api_key: api_key.to_string(),
            subscription,
            installations,
            token: Arc::new(Mutex::new(None)),
        }
    }

    fn authorized(&self, builder: RequestBuilder, installation: &Installation) -> RequestBuilder {
        builder
            .header("x-goog-api-key", &self.api_key)
            .header(
                "x-goog-firebase-installations-auth",
                format!("FIS {}", installation.auth_token),
            )
    }

    /// Returns the registration token, registering with FCM if there is none yet.
    pub async fn get_token(&self) -> FirebaseResult<String> {
        let mut token = self.token.lock().await;
        if let Some(existing) = token.as_ref() {
            return Ok(existing.clone());
        }

        let subscription = self.subscription.as_ref().ok_or_else(|| {
            FirebaseError::new(
                ErrorKind::FailedPrecondition,
                "No push subscription configured for messaging",
            )
            .with_domain(MESSAGING_DOMAIN)
        })?;
        let installation = self.installations.installation().await?;

        let request = RegistrationRequest {
            web: WebRegistration {
                endpoint: &subscription.endpoint,
                auth: &subscription.auth,
                p256dh: &subscription.p256dh,
                application_pub_key: subscription.vapid_key.as_deref(),
            },
        };

        let response = self
            .authorized(self.client.post(&self.registrations_url), &installation)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&request)?)
            .send()
            .await
            .map_err(|e| FirebaseError::from(e).in_domain(MESSAGING_DOMAIN))?;

        if !response.status().is_success() {
            return Err(parse_error_response(response, MESSAGING_DOMAIN).await);
        }

        let body: RegistrationResponse = response
            .json()
            .await
            .map_err(|e| FirebaseError::from(e).in_domain(MESSAGING_DOMAIN))?;
        log::debug!("Registered messaging token for installation {}", installation.fid);

        *token = Some(body.token.clone());
        Ok(body.token)
    }

    pub async fn subscribe_to_topic(&self, topic: &str) -> FirebaseResult<()> {
        self.manage_topic(topic, true).await
    }

    pub async fn unsubscribe_from_topic(&self, topic: &str) -> FirebaseResult<()> {
        self.manage_topic(topic, false).await
    }

    async fn manage_topic(&self, topic: &str, subscribe: bool) -> FirebaseResult<()> {
        let name = normalize_topic(topic)?;
        let token = self.get_token().await?;
        let installation = self.installations.installation().await?;

        let url = if subscribe {
            format!("{}:batchAdd", self.iid_url)
        } else {
            format!("{}:batchRemove", self.iid_url)
        };
        let request = TopicManagementRequest {
            to: format!("/topics/{}", name),
            registration_tokens: [token.as_str()],
        };

        let response = self
            .authorized(self.client.post(&url), &installation)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&request)?)
            .send()
            .await
            .map_err(|e| FirebaseError::from(e).in_domain(MESSAGING_DOMAIN))?;

        if !response.status().is_success() {
            return Err(parse_error_response(response, MESSAGING_DOMAIN).await);
        }

        let api_response: TopicManagementApiResponse = response
            .json()
            .await
            .map_err(|e| FirebaseError::from(e).in_domain(MESSAGING_DOMAIN))?;

        let rejected = api_response
            .results
            .into_iter()
            .flatten()
            .find_map(|result| result.error);
        if let Some(reason) = rejected {
            let kind = ErrorKind::from_status(&reason).unwrap_or(ErrorKind::Internal);
            return Err(FirebaseError::new(
                kind,
                format!("Topic management for '{}' failed: {}", name, reason),
            )
            .with_domain(MESSAGING_DOMAIN)
            .with_metadata("reason", reason));
        }

        log::debug!(
            "{} topic '{}'",
            if subscribe { "Subscribed to" } else { "Unsubscribed from" },
            name
        );
        Ok(())
    }

    /// Invalidates the current token. Succeeds without a request when none was issued.
    pub async fn delete_token(&self) -> FirebaseResult<()> {
        let mut token = self.token.lock().await;
        let Some(existing) = token.clone() else {
            return Ok(());
        };
        let installation = self.installations.installation().await?;
        let url = format!("{}/{}", self.registrations_url, existing);

        let response = self
            .authorized(self.client.delete(&url), &installation)
            .send()
            .await
            .map_err(|e| FirebaseError::from(e).in_domain(MESSAGING_DOMAIN))?;

        if !response.status().is_success() {
            return Err(parse_error_response(response, MESSAGING_DOMAIN).await);
        }

        *token = None;
        Ok(())
    }
}
