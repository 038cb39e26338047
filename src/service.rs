//! The service façade: one trait through which the presentation layer reaches every
//! backend, with a live implementation over the REST adapters.

use crate::analytics::models::EventParams;
use crate::analytics::FirebaseAnalytics;
use crate::auth::models::FirebaseUser;
use crate::auth::FirebaseAuth;
use crate::core::error::{FirebaseError, FirebaseResult};
use crate::firestore::{DocumentData, FirebaseFirestore};
use crate::messaging::FirebaseMessaging;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Authentication, document storage, analytics and messaging behind one interface.
///
/// `configure()` must be called once before anything else. Missing documents are
/// `Ok(None)`; analytics calls never fail.
#[async_trait]
pub trait FirebaseService: Send + Sync {
    fn configure(&self);

    fn is_signed_in(&self) -> bool;

    fn current_user(&self) -> Option<FirebaseUser>;

    async fn sign_in(&self, email: &str, password: &str) -> FirebaseResult<FirebaseUser>;

    async fn sign_up(&self, email: &str, password: &str) -> FirebaseResult<FirebaseUser>;

    /// Returns `false` when local credentials could not be cleared.
    fn sign_out(&self) -> bool;

    /// Replaces the document at `id`.
    async fn save_document(&self, id: &str, fields: &DocumentData) -> FirebaseResult<()>;

    /// Updates only the given top-level fields of the document at `id`.
    async fn merge_document(&self, id: &str, fields: &DocumentData) -> FirebaseResult<()>;

    async fn get_document(&self, id: &str) -> FirebaseResult<Option<DocumentData>>;

    async fn log_event(&self, name: &str, parameters: Option<EventParams>);

    async fn set_user_property(&self, name: &str, value: &str);

    async fn set_user_id(&self, user_id: &str);

    async fn get_messaging_token(&self) -> FirebaseResult<String>;

    async fn subscribe_to_topic(&self, topic: &str) -> FirebaseResult<()>;

    async fn unsubscribe_from_topic(&self, topic: &str) -> FirebaseResult<()>;

    async fn delete_messaging_token(&self) -> FirebaseResult<()>;
}

/// [`FirebaseService`] backed by the real Firebase backends.
#[derive(Clone)]
pub struct LiveFirebase {
    auth: FirebaseAuth,
    firestore: FirebaseFirestore,
    analytics: FirebaseAnalytics,
    messaging: FirebaseMessaging,
    analytics_collection_enabled: bool,
    configured: Arc<AtomicBool>,
}

impl LiveFirebase {
    pub(crate) fn new(
        auth: FirebaseAuth,
        firestore: FirebaseFirestore,
        analytics: FirebaseAnalytics,
        messaging: FirebaseMessaging,
        analytics_collection_enabled: bool,
    ) -> Self {
        Self {
            auth,
            firestore,
            analytics,
            messaging,
            analytics_collection_enabled,
            configured: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::Acquire)
    }

    fn ensure_configured(&self) -> FirebaseResult<()> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(FirebaseError::not_configured())
        }
    }
}

#[async_trait]
impl FirebaseService for LiveFirebase {
    fn configure(&self) {
        if self.configured.swap(true, Ordering::AcqRel) {
            log::debug!("configure() called again; ignoring");
            return;
        }
        match self.auth.restore() {
            Ok(Some(user)) => log::debug!("Restored session for {}", user.uid),
            Ok(None) => {}
            Err(e) => log::warn!("Could not restore the persisted session: {}", e),
        }
        self.analytics
            .set_collection_enabled(self.analytics_collection_enabled);
        log::debug!("Firebase configured");
    }

    fn is_signed_in(&self) -> bool {
        self.auth.is_signed_in()
    }

    fn current_user(&self) -> Option<FirebaseUser> {
        self.auth.current_user()
    }

    async fn sign_in(&self, email: &str, password: &str) -> FirebaseResult<FirebaseUser> {
        self.ensure_configured()?;
        self.auth.sign_in(email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> FirebaseResult<FirebaseUser> {
        self.ensure_configured()?;
        self.auth.sign_up(email, password).await
    }

    fn sign_out(&self) -> bool {
        self.auth.sign_out()
    }

    async fn save_document(&self, id: &str, fields: &DocumentData) -> FirebaseResult<()> {
        self.ensure_configured()?;
        self.firestore.set_document(id, fields).await
    }

    async fn merge_document(&self, id: &str, fields: &DocumentData) -> FirebaseResult<()> {
        self.ensure_configured()?;
        self.firestore.merge_document(id, fields).await
    }

    async fn get_document(&self, id: &str) -> FirebaseResult<Option<DocumentData>> {
        self.ensure_configured()?;
        self.firestore.get_document(id).await
    }

    async fn log_event(&self, name: &str, parameters: Option<EventParams>) {
        if !self.is_configured() {
            log::warn!("Dropping analytics event '{}': not configured", name);
            return;
        }
        self.analytics.log_event(name, parameters.as_ref()).await;
    }

    async fn set_user_property(&self, name: &str, value: &str) {
        if !self.is_configured() {
            log::warn!("Dropping user property '{}': not configured", name);
            return;
        }
        self.analytics.set_user_property(name, value);
    }

    async fn set_user_id(&self, user_id: &str) {
        if !self.is_configured() {
            log::warn!("Dropping analytics user id: not configured");
            return;
        }
        self.analytics.set_user_id(user_id);
    }

    async fn get_messaging_token(&self) -> FirebaseResult<String> {
        self.ensure_configured()?;
        self.messaging.get_token().await
    }

    async fn subscribe_to_topic(&self, topic: &str) -> FirebaseResult<()> {
        self.ensure_configured()?;
        self.messaging.subscribe_to_topic(topic).await
    }

    async fn unsubscribe_from_topic(&self, topic: &str) -> FirebaseResult<()> {
        self.ensure_configured()?;
        self.messaging.unsubscribe_from_topic(topic).await
    }

    async fn delete_messaging_token(&self) -> FirebaseResult<()> {
        self.ensure_configured()?;
        self.messaging.delete_token().await
    }
}
