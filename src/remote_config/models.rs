use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Serialize)]
pub(crate) struct FetchRequest<'a> {
    pub app_instance_id: &'a str,
    pub app_instance_id_token: &'a str,
    pub app_id: &'a str,
    pub sdk_version: &'a str,
    pub language_code: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FetchResponse {
    #[serde(default)]
    pub entries: Option<HashMap<String, String>>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub template_version: Option<String>,
}

/// Outcome of [`FirebaseRemoteConfig::fetch`](super::FirebaseRemoteConfig::fetch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// New values were downloaded and wait for `activate()`.
    Fetched,
    /// The backend reported no change since the last fetch.
    NoChange,
    /// The minimum fetch interval has not elapsed; no request was made.
    Throttled,
}

/// Where a value returned by a getter came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Remote,
    Default,
    Static,
}
