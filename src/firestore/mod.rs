//! Cloud Firestore document reads and writes over the v1 REST API.
//!
//! Documents are addressed by an identifier. An identifier without `/` lives in the
//! configured default collection (`users` unless overridden); an identifier with `/`
//! is a full document path such as `"teams/red/members/alice"`.
//!
//! A missing document is a successful read returning `None`, never an error.

pub mod models;
pub mod value;


use self::models::{Document, DocumentWrite};
use self::value::{data_to_fields, fields_to_data, quote_field_path};
use crate::auth::SessionHandle;
use crate::config::FirebaseOptions;
use crate::core::error::{FirebaseError, FirebaseResult};
use crate::core::middleware::{ApiKeyMiddleware, IdTokenMiddleware};
use crate::core::{error_from_body, parse_error_response};
use reqwest::{header, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use url::Url;

pub(crate) const FIRESTORE_DOMAIN: &str = "firestore";

/// The fields of a document.
pub type DocumentData = serde_json::Map<String, serde_json::Value>;

/// Firestore reports a missing document as `Document "projects/.../documents/{path}" not found.`
fn names_missing_document(message: &str, relative_path: &str) -> bool {
    message.starts_with("Document ")
        && message.contains(&format!("/documents/{}\"", relative_path))
}

/// Client for interacting with Cloud Firestore.
#[derive(Clone)]
pub struct FirebaseFirestore {
    client: ClientWithMiddleware,
    base_url: String,
    default_collection: String,
}

impl FirebaseFirestore {
    /// Creates a new `FirebaseFirestore` instance.
    ///
    /// This is typically called via `FirebaseApp::firestore()`.
    pub fn new(http: reqwest::Client, options: &FirebaseOptions, session: SessionHandle) -> Self {
        let client = ClientBuilder::new(http)
            .with(ApiKeyMiddleware::new(options.api_key.clone()))
            .with(IdTokenMiddleware::new(session))
            .build();

        let base_url = format!(
            "{}/projects/{}/databases/(default)/documents",
            options.endpoints.firestore.trim_end_matches('/'),
            options.project_id
        );

        Self {
            client,
            base_url,
            default_collection: options.default_collection.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn new_with_client(
        client: ClientWithMiddleware,
        base_url: String,
        default_collection: &str,
    ) -> Self {
        Self {
            client,
            base_url,
            default_collection: default_collection.to_string(),
        }
    }

    fn document_segments<'a>(&'a self, id: &'a str) -> FirebaseResult<Vec<&'a str>> {
        let segments: Vec<&str> = if id.contains('/') {
            id.trim_matches('/').split('/').collect()
        } else {
            vec![self.default_collection.as_str(), id]
        };

        if segments.iter().any(|s| s.is_empty()) {
            return Err(
                FirebaseError::invalid_argument(format!("Invalid document id '{}'", id))
                    .in_domain(FIRESTORE_DOMAIN),
            );
        }
        if segments.len() % 2 != 0 {
            return Err(FirebaseError::invalid_argument(format!(
                "Document path '{}' must have an even number of segments",
                id
            ))
            .in_domain(FIRESTORE_DOMAIN));
        }
        Ok(segments)
    }

    /// Resolves an identifier into the document URL.
    pub fn document_url(&self, id: &str) -> FirebaseResult<Url> {
        let segments = self.document_segments(id)?;
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| FirebaseError::internal("Firestore endpoint cannot be a base URL"))?
            .extend(segments);
        Ok(url)
    }

    /// Writes `data` as the full content of the document, replacing any previous fields.
    pub async fn set_document(&self, id: &str, data: &DocumentData) -> FirebaseResult<()> {
        let url = self.document_url(id)?;
        self.write(url, data).await
    }

    /// Overwrites only the top-level fields present in `data`, creating the document
    /// if needed.
    pub async fn merge_document(&self, id: &str, data: &DocumentData) -> FirebaseResult<()> {
        let mut url = self.document_url(id)?;
        // Without a mask the PATCH would replace the whole document.
        if data.is_empty() {
            log::debug!("Firestore merge of {} has no fields; skipping", url.path());
            return Ok(());
        }
        {
            let mut query = url.query_pairs_mut();
            for field in data.keys() {
                query.append_pair("updateMask.fieldPaths", &quote_field_path(field));
            }
        }
        self.write(url, data).await
    }

    /// Reads a document; `Ok(None)` when it does not exist.
    ///
    /// A 404 that names another resource (a missing database or project) is an error.
    pub async fn get_document(&self, id: &str) -> FirebaseResult<Option<DocumentData>> {
        let relative_path = self.document_segments(id)?.join("/");
        let url = self.document_url(id)?;
        log::debug!("Firestore get {}", url.path());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FirebaseError::from(e).in_domain(FIRESTORE_DOMAIN))?;

        if response.status() == StatusCode::NOT_FOUND {
            let text = response.text().await.unwrap_or_default();
            let error = error_from_body(StatusCode::NOT_FOUND, &text, FIRESTORE_DOMAIN);
            if names_missing_document(&error.message, &relative_path) {
                return Ok(None);
            }
            return Err(error);
        }

        if !response.status().is_success() {
            return Err(parse_error_response(response, FIRESTORE_DOMAIN).await);
        }

        let doc: Document = response
            .json()
            .await
            .map_err(|e| FirebaseError::from(e).in_domain(FIRESTORE_DOMAIN))?;
        Ok(Some(fields_to_data(doc.fields)?))
    }

    async fn write(&self, url: Url, data: &DocumentData) -> FirebaseResult<()> {
        let fields = data_to_fields(data)?;
        let body = serde_json::to_vec(&DocumentWrite { fields: &fields })?;
        log::debug!("Firestore write {}", url.path());

        let response = self
            .client
            .patch(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| FirebaseError::from(e).in_domain(FIRESTORE_DOMAIN))?;

        if !response.status().is_success() {
            return Err(parse_error_response(response, FIRESTORE_DOMAIN).await);
        }

        Ok(())
    }
}
