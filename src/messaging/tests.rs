use super::*;
use httpmock::prelude::*;
use reqwest::Client;
use serde_json::json;

fn subscription() -> PushSubscription {
    PushSubscription {
        endpoint: "https://push.example.com/send/abc".to_string(),
        auth: "auth-secret".to_string(),
        p256dh: "p256dh-key".to_string(),
        vapid_key: None,
    }
}

fn messaging_for(server: &MockServer, subscription: Option<PushSubscription>) -> FirebaseMessaging {
    let client = ClientBuilder::new(Client::new()).build();
    let installations = FirebaseInstallations::new_with_client(
        client.clone(),
        server.url("/v1/projects/p/installations"),
        "api-key",
        "1:123:web:abc",
    );
    FirebaseMessaging::new_with_client(
        client,
        server.url("/v1/projects/p/registrations"),
        server.url("/iid/v1"),
        "api-key",
        subscription,
        installations,
    )
}

async fn mock_installation(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/projects/p/installations");
            then.status(200).json_body(json!({
                "fid": "fid-1",
                "refreshToken": "refresh",
                "authToken": { "token": "fis-token", "expiresIn": "604800s" }
            }));
        })
        .await;
}

#[tokio::test]
async fn test_get_token_registers_once() {
    let server = MockServer::start_async().await;
    mock_installation(&server).await;
    let messaging = messaging_for(&server, Some(subscription()));

    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/projects/p/registrations")
                .header("x-goog-api-key", "api-key")
                .header("x-goog-firebase-installations-auth", "FIS fis-token")
                .json_body(json!({
                    "web": {
                        "endpoint": "https://push.example.com/send/abc",
                        "auth": "auth-secret",
                        "p256dh": "p256dh-key"
                    }
                }));
            then.status(200).json_body(json!({
                "name": "projects/p/registrations/fcm-token",
                "token": "fcm-token"
            }));
        })
        .await;

    assert_eq!(messaging.get_token().await.unwrap(), "fcm-token");
    assert_eq!(messaging.get_token().await.unwrap(), "fcm-token");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_token_without_subscription_fails() {
    let server = MockServer::start_async().await;
    let messaging = messaging_for(&server, None);

    let error = messaging.get_token().await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::FailedPrecondition);
    assert_eq!(error.domain.as_deref(), Some("messaging"));
}

#[tokio::test]
async fn test_subscribe_and_unsubscribe_topic() {
    let server = MockServer::start_async().await;
    mock_installation(&server).await;
    let messaging = messaging_for(&server, Some(subscription()));

    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/projects/p/registrations");
            then.status(200).json_body(json!({ "token": "fcm-token" }));
        })
        .await;

    let add = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/iid/v1:batchAdd")
                .json_body(json!({
                    "to": "/topics/news",
                    "registration_tokens": ["fcm-token"]
                }));
            then.status(200).json_body(json!({ "results": [{}] }));
        })
        .await;

    let remove = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/iid/v1:batchRemove")
                .json_body(json!({
                    "to": "/topics/news",
                    "registration_tokens": ["fcm-token"]
                }));
            then.status(200)
                .json_body(json!({ "results": [{ "error": "NOT_FOUND" }] }));
        })
        .await;

    messaging.subscribe_to_topic("/topics/news").await.unwrap();
    let error = messaging.unsubscribe_from_topic("news").await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::NotFound);
    assert_eq!(error.metadata["reason"], json!("NOT_FOUND"));

    add.assert_async().await;
    remove.assert_async().await;
}

#[tokio::test]
async fn test_invalid_topic_is_rejected_locally() {
    let server = MockServer::start_async().await;
    let messaging = messaging_for(&server, Some(subscription()));

    let error = messaging.subscribe_to_topic("bad topic!").await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn test_delete_token_forgets_registration() {
    let server = MockServer::start_async().await;
    mock_installation(&server).await;
    let messaging = messaging_for(&server, Some(subscription()));

    // Nothing issued yet: no request needed.
    messaging.delete_token().await.unwrap();

    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/projects/p/registrations");
            then.status(200).json_body(json!({ "token": "fcm-token" }));
        })
        .await;
    let delete = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/v1/projects/p/registrations/fcm-token")
                .header("x-goog-firebase-installations-auth", "FIS fis-token");
            then.status(200).json_body(json!({}));
        })
        .await;

    messaging.get_token().await.unwrap();
    messaging.delete_token().await.unwrap();
    messaging.delete_token().await.unwrap();

    delete.assert_async().await;
}

#[test]
fn test_normalize_topic() {
    assert_eq!(normalize_topic("/topics/weather").unwrap(), "weather");
    assert_eq!(normalize_topic("a-b_c.d~e%20").unwrap(), "a-b_c.d~e%20");
    assert!(normalize_topic("").is_err());
    assert!(normalize_topic("/topics/").is_err());
}
