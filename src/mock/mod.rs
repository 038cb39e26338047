//! In-memory [`FirebaseService`] for tests and previews.
//!
//! Behaviour is scripted through setters (an injected failure, the user returned by
//! the next sign-in, whether sign-out succeeds) and every interaction is captured
//! for later assertions. Each call is logged at `info` level.


use crate::analytics::models::EventParams;
use crate::auth::models::FirebaseUser;
use crate::core::error::{FirebaseError, FirebaseResult};
use crate::firestore::DocumentData;
use crate::messaging::normalize_topic;
use crate::service::FirebaseService;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

const SIGN_IN_DISPLAY_NAME: &str = "Mock SignedIn User (Default)";
const SIGN_UP_DISPLAY_NAME: &str = "New Mock User (Default)";

/// 31-polynomial hash over UTF-16 code units, wrapping at 32 bits.
pub fn string_hash(value: &str) -> i32 {
    value
        .encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

#[derive(Debug)]
struct MockState {
    injected_failure: Option<FirebaseError>,
    signed_in_user: Option<FirebaseUser>,
    next_user_to_return_on_auth: Option<FirebaseUser>,
    documents: HashMap<String, DocumentData>,
    should_sign_out_succeed: bool,
    auto_sign_in_on_auth_success: bool,
    logged_events: Vec<(String, Option<EventParams>)>,
    user_properties: BTreeMap<String, String>,
    analytics_user_id: Option<String>,
    configure_called: bool,
    messaging_token: Option<String>,
    tokens_issued: u64,
    subscribed_topics: BTreeSet<String>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            injected_failure: None,
            signed_in_user: None,
            next_user_to_return_on_auth: None,
            documents: HashMap::new(),
            should_sign_out_succeed: true,
            auto_sign_in_on_auth_success: true,
            logged_events: Vec::new(),
            user_properties: BTreeMap::new(),
            analytics_user_id: None,
            configure_called: false,
            messaging_token: None,
            tokens_issued: 0,
            subscribed_topics: BTreeSet::new(),
        }
    }
}

impl MockState {
    fn check_failure(&self, operation: &str) -> FirebaseResult<()> {
        match &self.injected_failure {
            Some(error) => {
                log::info!("MockFirebase: simulating {} error: {}", operation, error);
                Err(error.clone())
            }
            None => Ok(()),
        }
    }

    fn issue_token(&mut self) -> String {
        if let Some(token) = &self.messaging_token {
            return token.clone();
        }
        self.tokens_issued += 1;
        let token = format!("mock-fcm-token-{}", self.tokens_issued);
        self.messaging_token = Some(token.clone());
        token
    }
}

/// Scriptable in-memory stand-in for the live façade.
#[derive(Debug, Default)]
pub struct MockFirebase {
    state: Mutex<MockState>,
}

impl MockFirebase {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Restores every default: signed out, empty store, nothing captured.
    pub fn reset(&self) {
        *self.state() = MockState::default();
        log::info!("MockFirebase: reset to default state");
    }

    /// Makes every fallible operation fail with `error` until cleared with `None`.
    pub fn simulate_error(&self, error: Option<FirebaseError>) {
        self.state().injected_failure = error;
    }

    pub fn injected_failure(&self) -> Option<FirebaseError> {
        self.state().injected_failure.clone()
    }

    pub fn set_signed_in_user(&self, user: Option<FirebaseUser>) {
        self.state().signed_in_user = user;
    }

    /// The user returned by every later successful sign-in or sign-up, until changed.
    pub fn set_next_user_to_return_on_auth(&self, user: Option<FirebaseUser>) {
        self.state().next_user_to_return_on_auth = user;
    }

    pub fn set_should_sign_out_succeed(&self, succeed: bool) {
        self.state().should_sign_out_succeed = succeed;
    }

    pub fn should_sign_out_succeed(&self) -> bool {
        self.state().should_sign_out_succeed
    }

    pub fn set_auto_sign_in_on_auth_success(&self, enabled: bool) {
        self.state().auto_sign_in_on_auth_success = enabled;
    }

    pub fn auto_sign_in_on_auth_success(&self) -> bool {
        self.state().auto_sign_in_on_auth_success
    }

    pub fn insert_document(&self, id: impl Into<String>, fields: DocumentData) {
        self.state().documents.insert(id.into(), fields);
    }

    pub fn documents(&self) -> HashMap<String, DocumentData> {
        self.state().documents.clone()
    }

    pub fn logged_events(&self) -> Vec<(String, Option<EventParams>)> {
        self.state().logged_events.clone()
    }

    pub fn user_properties(&self) -> BTreeMap<String, String> {
        self.state().user_properties.clone()
    }

    pub fn analytics_user_id(&self) -> Option<String> {
        self.state().analytics_user_id.clone()
    }

    pub fn configure_called(&self) -> bool {
        self.state().configure_called
    }

    pub fn messaging_token(&self) -> Option<String> {
        self.state().messaging_token.clone()
    }

    pub fn subscribed_topics(&self) -> BTreeSet<String> {
        self.state().subscribed_topics.clone()
    }

    fn authenticate(
        &self,
        operation: &str,
        email: &str,
        uid_prefix: &str,
        display_name: &str,
    ) -> FirebaseResult<FirebaseUser> {
        log::info!("MockFirebase: {}(email: {}) called", operation, email);
        let mut state = self.state();
        state.check_failure(operation)?;

        let user = state.next_user_to_return_on_auth.clone().unwrap_or_else(|| {
            FirebaseUser::new(format!("{}{}", uid_prefix, string_hash(email)), email)
                .with_display_name(display_name)
        });
        if state.auto_sign_in_on_auth_success {
            state.signed_in_user = Some(user.clone());
        }
        log::info!(
            "MockFirebase: {} successful, user {} (auto sign-in: {})",
            operation,
            user.uid,
            state.auto_sign_in_on_auth_success
        );
        Ok(user)
    }
}

#[async_trait]
impl FirebaseService for MockFirebase {
    fn configure(&self) {
        self.state().configure_called = true;
        log::info!("MockFirebase: configure() called");
    }

    fn is_signed_in(&self) -> bool {
        let signed_in = self.state().signed_in_user.is_some();
        log::info!("MockFirebase: is_signed_in() -> {}", signed_in);
        signed_in
    }

    fn current_user(&self) -> Option<FirebaseUser> {
        let user = self.state().signed_in_user.clone();
        log::info!(
            "MockFirebase: current_user() -> {}",
            user.as_ref().map_or("none", |u| u.uid.as_str())
        );
        user
    }

    async fn sign_in(&self, email: &str, _password: &str) -> FirebaseResult<FirebaseUser> {
        self.authenticate("sign_in", email, "mockUID_signIn_", SIGN_IN_DISPLAY_NAME)
    }

    async fn sign_up(&self, email: &str, _password: &str) -> FirebaseResult<FirebaseUser> {
        self.authenticate("sign_up", email, "mockUID_signUp_", SIGN_UP_DISPLAY_NAME)
    }

    fn sign_out(&self) -> bool {
        let mut state = self.state();
        if state.injected_failure.is_some() {
            log::info!("MockFirebase: sign_out() failing due to injected failure");
            return false;
        }
        if !state.should_sign_out_succeed {
            log::info!("MockFirebase: sign_out() configured to fail");
            return false;
        }
        state.signed_in_user = None;
        log::info!("MockFirebase: sign_out() successful");
        true
    }

    async fn save_document(&self, id: &str, fields: &DocumentData) -> FirebaseResult<()> {
        log::info!("MockFirebase: save_document({}) called", id);
        let mut state = self.state();
        state.check_failure("save_document")?;
        state.documents.insert(id.to_string(), fields.clone());
        Ok(())
    }

    async fn merge_document(&self, id: &str, fields: &DocumentData) -> FirebaseResult<()> {
        log::info!("MockFirebase: merge_document({}) called", id);
        let mut state = self.state();
        state.check_failure("merge_document")?;
        if fields.is_empty() {
            return Ok(());
        }
        let document = state.documents.entry(id.to_string()).or_default();
        for (key, value) in fields {
            document.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn get_document(&self, id: &str) -> FirebaseResult<Option<DocumentData>> {
        log::info!("MockFirebase: get_document({}) called", id);
        let state = self.state();
        state.check_failure("get_document")?;
        let document = state.documents.get(id).cloned();
        if document.is_none() {
            log::info!("MockFirebase: no document stored for {}", id);
        }
        Ok(document)
    }

    async fn log_event(&self, name: &str, parameters: Option<EventParams>) {
        log::info!("MockFirebase: log_event({}) called", name);
        self.state()
            .logged_events
            .push((name.to_string(), parameters));
    }

    async fn set_user_property(&self, name: &str, value: &str) {
        log::info!("MockFirebase: set_user_property({}, {}) called", name, value);
        self.state()
            .user_properties
            .insert(name.to_string(), value.to_string());
    }

    async fn set_user_id(&self, user_id: &str) {
        log::info!("MockFirebase: set_user_id({}) called", user_id);
        self.state().analytics_user_id = Some(user_id.to_string());
    }

    async fn get_messaging_token(&self) -> FirebaseResult<String> {
        log::info!("MockFirebase: get_messaging_token() called");
        let mut state = self.state();
        state.check_failure("get_messaging_token")?;
        Ok(state.issue_token())
    }

    async fn subscribe_to_topic(&self, topic: &str) -> FirebaseResult<()> {
        log::info!("MockFirebase: subscribe_to_topic({}) called", topic);
        let mut state = self.state();
        state.check_failure("subscribe_to_topic")?;
        let name = normalize_topic(topic)?;
        state.issue_token();
        state.subscribed_topics.insert(name.to_string());
        Ok(())
    }

    async fn unsubscribe_from_topic(&self, topic: &str) -> FirebaseResult<()> {
        log::info!("MockFirebase: unsubscribe_from_topic({}) called", topic);
        let mut state = self.state();
        state.check_failure("unsubscribe_from_topic")?;
        let name = normalize_topic(topic)?;
        state.subscribed_topics.remove(name);
        Ok(())
    }

    async fn delete_messaging_token(&self) -> FirebaseResult<()> {
        log::info!("MockFirebase: delete_messaging_token() called");
        let mut state = self.state();
        state.check_failure("delete_messaging_token")?;
        state.messaging_token = None;
        state.subscribed_topics.clear();
        Ok(())
    }
}
