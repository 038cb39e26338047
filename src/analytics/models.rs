use serde::Serialize;
use std::collections::BTreeMap;

/// Parameters attached to an analytics event.
pub type EventParams = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Serialize)]
pub(crate) struct MeasurementPayload<'a> {
    pub client_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<&'a str>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub user_properties: BTreeMap<&'a str, UserPropertyValue<'a>>,
    pub events: Vec<MeasurementEvent<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MeasurementEvent<'a> {
    pub name: &'a str,
    pub params: &'a EventParams,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserPropertyValue<'a> {
    pub value: &'a str,
}
