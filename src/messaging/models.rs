use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct RegistrationRequest<'a> {
    pub web: WebRegistration<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WebRegistration<'a> {
    pub endpoint: &'a str,
    pub auth: &'a str,
    pub p256dh: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_pub_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegistrationResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TopicManagementRequest<'a> {
    pub to: String,
    pub registration_tokens: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
pub(crate) struct TopicManagementApiResponse {
    pub results: Option<Vec<TopicManagementApiResult>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TopicManagementApiResult {
    pub error: Option<String>,
}
