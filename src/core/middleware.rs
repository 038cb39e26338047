use crate::auth::SessionHandle;
use http::Extensions;
use reqwest::{header, Request, Response};
use reqwest_middleware::{Middleware, Next};

/// Appends the project's web API key as the `key` query parameter.
#[derive(Clone)]
pub struct ApiKeyMiddleware {
    api_key: String,
}

impl ApiKeyMiddleware {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

#[async_trait::async_trait]
impl Middleware for ApiKeyMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let has_key = req.url().query_pairs().any(|(name, _)| name == "key");
        if !has_key {
            req.url_mut()
                .query_pairs_mut()
                .append_pair("key", &self.api_key);
        }

        next.run(req, extensions).await
    }
}

/// Attaches the signed-in user's ID token as a bearer token.
///
/// Requests pass through unauthenticated when nobody is signed in; the backend's
/// security rules decide what that caller may do.
#[derive(Clone)]
pub struct IdTokenMiddleware {
    session: SessionHandle,
}

impl IdTokenMiddleware {
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }
}

#[async_trait::async_trait]
impl Middleware for IdTokenMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        if let Some(token) = self.session.id_token() {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                reqwest_middleware::Error::Middleware(anyhow::anyhow!(
                    "Failed to build authorization header: {}",
                    e
                ))
            })?;
            req.headers_mut().insert(header::AUTHORIZATION, value);
        }

        next.run(req, extensions).await
    }
}
