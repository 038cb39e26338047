//! Email/password authentication against the Identity Toolkit REST API.
//!
//! The signed-in state lives in a [`SessionHandle`] shared with the other adapters,
//! so Firestore requests carry the user's ID token without any global state.

pub mod models;
pub mod persistence;

#[cfg(test)]
mod tests;

use self::models::{FirebaseUser, PasswordRequest, PasswordResponse, Session};
use self::persistence::SessionStore;
use crate::config::FirebaseOptions;
use crate::core::error::{ErrorKind, FirebaseError, FirebaseResult};
use crate::core::middleware::ApiKeyMiddleware;
use crate::core::parse_error_response;
use reqwest::header;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use std::sync::{Arc, PoisonError, RwLock};

pub(crate) const AUTH_DOMAIN: &str = "auth";

/// Shared, cloneable view of the current session.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Session> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn user(&self) -> Option<FirebaseUser> {
        self.current().map(|session| session.user)
    }

    pub fn id_token(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|session| session.id_token.clone())
    }

    pub fn set(&self, session: Session) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    /// Clears the session. Returns `false` if the lock was poisoned and the
    /// credentials could not be cleared safely.
    pub fn clear(&self) -> bool {
        match self.inner.write() {
            Ok(mut guard) => {
                *guard = None;
                true
            }
            Err(_) => false,
        }
    }
}

/// Maps an Identity Toolkit error identifier (`"EMAIL_EXISTS"`,
/// `"WEAK_PASSWORD : Password should be ..."`) to a kind.
pub(crate) fn auth_error_kind(message: &str) -> Option<ErrorKind> {
    let identifier = message.split([' ', ':']).next().unwrap_or_default();
    let kind = match identifier {
        "EMAIL_EXISTS" => ErrorKind::AlreadyExists,
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            ErrorKind::InvalidCredential
        }
        "WEAK_PASSWORD" | "INVALID_EMAIL" | "MISSING_PASSWORD" | "MISSING_EMAIL" => {
            ErrorKind::InvalidArgument
        }
        "USER_DISABLED" | "OPERATION_NOT_ALLOWED" | "ADMIN_ONLY_OPERATION" => {
            ErrorKind::PermissionDenied
        }
        "TOO_MANY_ATTEMPTS_TRY_LATER" | "QUOTA_EXCEEDED" => ErrorKind::ResourceExhausted,
        "INVALID_API_KEY" | "API_KEY_INVALID" | "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" => {
            ErrorKind::Unauthenticated
        }
        _ => return None,
    };
    Some(kind)
}

/// Client for the email/password flows of Firebase Authentication.
#[derive(Clone)]
pub struct FirebaseAuth {
    client: ClientWithMiddleware,
    base_url: String,
    session: SessionHandle,
    store: Option<SessionStore>,
}

impl FirebaseAuth {
    /// Creates a new `FirebaseAuth` instance.
    ///
    /// This is typically called via `FirebaseApp::auth()`.
    pub fn new(http: reqwest::Client, options: &FirebaseOptions, session: SessionHandle) -> Self {
        let client = ClientBuilder::new(http)
            .with(ApiKeyMiddleware::new(options.api_key.clone()))
            .build();

        Self {
            client,
            base_url: options.endpoints.auth.trim_end_matches('/').to_string(),
            session,
            store: options.session_path.clone().map(SessionStore::new),
        }
    }

    #[cfg(test)]
    pub(crate) fn new_with_client(
        client: ClientWithMiddleware,
        base_url: String,
        session: SessionHandle,
        store: Option<SessionStore>,
    ) -> Self {
        Self {
            client,
            base_url,
            session,
            store,
        }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Loads a persisted session, if any, into memory.
    pub fn restore(&self) -> FirebaseResult<Option<FirebaseUser>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        match store.load()? {
            Some(session) => {
                if session.is_expired() {
                    log::debug!(
                        "Restored session for {} carries an expired ID token",
                        session.user.uid
                    );
                }
                let user = session.user.clone();
                self.session.set(session);
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.current().is_some()
    }

    pub fn current_user(&self) -> Option<FirebaseUser> {
        self.session.user()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> FirebaseResult<FirebaseUser> {
        self.password_flow("accounts:signInWithPassword", email, password)
            .await
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> FirebaseResult<FirebaseUser> {
        self.password_flow("accounts:signUp", email, password).await
    }

    /// Clears local credentials. The persisted copy is removed first so a failure
    /// leaves the in-memory state untouched.
    pub fn sign_out(&self) -> bool {
        if let Some(store) = &self.store {
            if let Err(e) = store.clear() {
                log::warn!(
                    "Error signing out: failed to remove {}: {}",
                    store.path().display(),
                    e
                );
                return false;
            }
        }
        if !self.session.clear() {
            log::warn!("Error signing out: session lock poisoned");
            return false;
        }
        true
    }

    async fn password_flow(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> FirebaseResult<FirebaseUser> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let request = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };

        log::debug!("{} for {}", endpoint, email);

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&request)?)
            .send()
            .await
            .map_err(|e| FirebaseError::from(e).in_domain(AUTH_DOMAIN))?;

        if !response.status().is_success() {
            let mut error = parse_error_response(response, AUTH_DOMAIN).await;
            if let Some(kind) = auth_error_kind(&error.message) {
                error.kind = kind;
            }
            return Err(error);
        }

        let body: PasswordResponse = response
            .json()
            .await
            .map_err(|e| FirebaseError::from(e).in_domain(AUTH_DOMAIN))?;
        let session = body.into_session();
        let user = session.user.clone();

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&session) {
                log::warn!("Signed in as {} but the session was not persisted: {}", user.uid, e);
            }
        }
        self.session.set(session);

        Ok(user)
    }
}
