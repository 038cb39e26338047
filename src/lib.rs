pub mod analytics;
pub mod auth;
pub mod completion;
pub mod config;
pub mod core;
pub mod firestore;
pub mod installations;
pub mod messaging;
pub mod mock;
pub mod remote_config;
pub mod service;

pub use crate::analytics::models::EventParams;
pub use crate::auth::models::FirebaseUser;
pub use crate::config::{Endpoints, FirebaseOptions, PushSubscription};
pub use crate::core::error::{ErrorKind, FirebaseError, FirebaseResult};
pub use crate::firestore::DocumentData;
pub use crate::mock::MockFirebase;
pub use crate::service::{FirebaseService, LiveFirebase};

use analytics::FirebaseAnalytics;
use auth::{FirebaseAuth, SessionHandle};
use firestore::FirebaseFirestore;
use installations::FirebaseInstallations;
use messaging::FirebaseMessaging;
use remote_config::FirebaseRemoteConfig;

/// Entry point: builds every client from one set of options.
///
/// All handles share one HTTP client, one session and one installation, so a
/// sign-in through [`FirebaseApp::auth`] authorizes later Firestore requests.
#[derive(Clone)]
pub struct FirebaseApp {
    options: FirebaseOptions,
    auth: FirebaseAuth,
    firestore: FirebaseFirestore,
    analytics: FirebaseAnalytics,
    installations: FirebaseInstallations,
    messaging: FirebaseMessaging,
    remote_config: FirebaseRemoteConfig,
    live: LiveFirebase,
}

impl FirebaseApp {
    pub fn new(options: FirebaseOptions) -> FirebaseResult<Self> {
        options.validate()?;

        let http = reqwest::Client::builder()
            .timeout(options.request_timeout())
            .build()
            .map_err(|e| FirebaseError::internal(format!("Failed to build HTTP client: {}", e)))?;

        let session = SessionHandle::new();
        let auth = FirebaseAuth::new(http.clone(), &options, session.clone());
        let firestore = FirebaseFirestore::new(http.clone(), &options, session);
        let analytics = FirebaseAnalytics::new(http.clone(), &options);
        let installations = FirebaseInstallations::new(http.clone(), &options);
        let messaging = FirebaseMessaging::new(http.clone(), &options, installations.clone());
        let remote_config = FirebaseRemoteConfig::new(http, &options, installations.clone());
        let live = LiveFirebase::new(
            auth.clone(),
            firestore.clone(),
            analytics.clone(),
            messaging.clone(),
            options.analytics_collection_enabled,
        );

        Ok(Self {
            options,
            auth,
            firestore,
            analytics,
            installations,
            messaging,
            remote_config,
            live,
        })
    }

    pub fn options(&self) -> &FirebaseOptions {
        &self.options
    }

    pub fn auth(&self) -> FirebaseAuth {
        self.auth.clone()
    }

    pub fn firestore(&self) -> FirebaseFirestore {
        self.firestore.clone()
    }

    pub fn analytics(&self) -> FirebaseAnalytics {
        self.analytics.clone()
    }

    pub fn installations(&self) -> FirebaseInstallations {
        self.installations.clone()
    }

    pub fn messaging(&self) -> FirebaseMessaging {
        self.messaging.clone()
    }

    pub fn remote_config(&self) -> FirebaseRemoteConfig {
        self.remote_config.clone()
    }

    /// The live [`FirebaseService`]. Every call returns a handle to the same state.
    pub fn service(&self) -> LiveFirebase {
        self.live.clone()
    }
}
