use firebase_facade::{
    Endpoints, ErrorKind, FirebaseApp, FirebaseOptions, FirebaseService,
};
use httpmock::prelude::*;
use serde_json::json;

const DOCUMENTS: &str = "/projects/demo/databases/(default)/documents";

fn app_for(server: &MockServer) -> FirebaseApp {
    let options = FirebaseOptions::new("api-key", "demo")
        .with_app_id("1:123:web:abc")
        .with_measurement("G-TEST", "secret")
        .with_endpoints(Endpoints::all(&server.base_url()));
    FirebaseApp::new(options).unwrap()
}

#[tokio::test]
async fn test_operations_before_configure_fail() {
    let server = MockServer::start_async().await;
    let service = app_for(&server).service();

    let error = service.get_document("alice").await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::FailedPrecondition);

    let error = service.sign_in("a@b.com", "pw").await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::FailedPrecondition);
}

#[tokio::test]
async fn test_analytics_before_configure_is_dropped() {
    let server = MockServer::start_async().await;
    let service = app_for(&server).service();

    let collect = server
        .mock_async(|when, then| {
            when.method(POST).path("/mp/collect");
            then.status(204);
        })
        .await;

    service.log_event("app_open", None).await;
    collect.assert_calls_async(0).await;

    service.configure();
    service.log_event("app_open", None).await;
    collect.assert_calls_async(1).await;
}

#[tokio::test]
async fn test_sign_in_authorizes_document_writes() {
    let server = MockServer::start_async().await;
    let app = app_for(&server);
    let service = app.service();
    service.configure();
    service.configure();

    let sign_in = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/accounts:signInWithPassword")
                .query_param("key", "api-key");
            then.status(200).json_body(json!({
                "localId": "uid-1",
                "email": "ada@example.com",
                "idToken": "id-token",
                "refreshToken": "refresh-token",
                "expiresIn": "3600"
            }));
        })
        .await;

    let write = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path(format!("{}/users/uid-1", DOCUMENTS))
                .header("authorization", "Bearer id-token")
                .json_body(json!({ "fields": { "name": { "stringValue": "Ada" } } }));
            then.status(200).json_body(json!({
                "name": "projects/demo/databases/(default)/documents/users/uid-1",
                "fields": { "name": { "stringValue": "Ada" } }
            }));
        })
        .await;

    let missing = server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}/users/nobody", DOCUMENTS));
            then.status(404).json_body(json!({
                "error": {
                    "code": 404,
                    "message": "Document \"projects/demo/databases/(default)/documents/users/nobody\" not found.",
                    "status": "NOT_FOUND"
                }
            }));
        })
        .await;

    let user = service.sign_in("ada@example.com", "pw").await.unwrap();
    assert_eq!(user.uid, "uid-1");
    assert!(service.is_signed_in());
    assert!(app.auth().is_signed_in());

    let fields = json!({ "name": "Ada" }).as_object().cloned().unwrap();
    service.save_document(&user.uid, &fields).await.unwrap();
    assert_eq!(service.get_document("nobody").await.unwrap(), None);

    assert!(service.sign_out());
    assert!(service.current_user().is_none());

    sign_in.assert_async().await;
    write.assert_async().await;
    missing.assert_async().await;
}

#[tokio::test]
async fn test_sign_up_rejection_is_mapped() {
    let server = MockServer::start_async().await;
    let service = app_for(&server).service();
    service.configure();

    server
        .mock_async(|when, then| {
            when.method(POST).path("/accounts:signUp");
            then.status(400).json_body(json!({
                "error": {
                    "code": 400,
                    "message": "EMAIL_EXISTS",
                    "errors": [{ "message": "EMAIL_EXISTS", "domain": "global", "reason": "invalid" }]
                }
            }));
        })
        .await;

    let error = service.sign_up("taken@example.com", "pw").await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::AlreadyExists);
    assert_eq!(error.code, 400);
    assert_eq!(error.domain.as_deref(), Some("auth"));
    assert!(!service.is_signed_in());
}
