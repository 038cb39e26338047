use super::*;
use crate::core::middleware::ApiKeyMiddleware;
use httpmock::prelude::*;
use reqwest::Client;
use reqwest_middleware::ClientBuilder;
use serde_json::json;

fn auth_for(server: &MockServer, store: Option<SessionStore>) -> FirebaseAuth {
    let client = ClientBuilder::new(Client::new())
        .with(ApiKeyMiddleware::new("test-key"))
        .build();
    FirebaseAuth::new_with_client(client, server.url("/v1"), SessionHandle::new(), store)
}

fn sign_in_body() -> serde_json::Value {
    json!({
        "kind": "identitytoolkit#VerifyPasswordResponse",
        "localId": "uid-123",
        "email": "alice@example.com",
        "displayName": "Alice",
        "idToken": "id-token",
        "registered": true,
        "refreshToken": "refresh-token",
        "expiresIn": "3600"
    })
}

#[tokio::test]
async fn test_sign_in_stores_session() {
    let server = MockServer::start_async().await;
    let auth = auth_for(&server, None);

    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/accounts:signInWithPassword")
                .query_param("key", "test-key")
                .header("content-type", "application/json")
                .json_body(json!({
                    "email": "alice@example.com",
                    "password": "secret",
                    "returnSecureToken": true
                }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(sign_in_body());
        })
        .await;

    assert!(!auth.is_signed_in());
    let user = auth.sign_in("alice@example.com", "secret").await.unwrap();

    assert_eq!(user.uid, "uid-123");
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(user.display_name.as_deref(), Some("Alice"));
    assert!(auth.is_signed_in());
    assert_eq!(auth.current_user(), Some(user));
    assert_eq!(auth.session().id_token().as_deref(), Some("id-token"));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_sign_up_email_exists_maps_to_already_exists() {
    let server = MockServer::start_async().await;
    let auth = auth_for(&server, None);

    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/accounts:signUp");
            then.status(400)
                .header("content-type", "application/json")
                .json_body(json!({
                    "error": {
                        "code": 400,
                        "message": "EMAIL_EXISTS",
                        "errors": [{ "message": "EMAIL_EXISTS", "domain": "global", "reason": "invalid" }]
                    }
                }));
        })
        .await;

    let error = auth.sign_up("alice@example.com", "secret").await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::AlreadyExists);
    assert_eq!(error.code, 400);
    assert_eq!(error.message, "EMAIL_EXISTS");
    assert_eq!(error.domain.as_deref(), Some("auth"));
    assert!(!auth.is_signed_in());

    mock.assert_async().await;
}

#[tokio::test]
async fn test_weak_password_is_invalid_argument() {
    let server = MockServer::start_async().await;
    let auth = auth_for(&server, None);

    let _mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/accounts:signUp");
            then.status(400).json_body(json!({
                "error": {
                    "code": 400,
                    "message": "WEAK_PASSWORD : Password should be at least 6 characters"
                }
            }));
        })
        .await;

    let error = auth.sign_up("bob@example.com", "pw").await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::InvalidArgument);
    assert!(error.message.starts_with("WEAK_PASSWORD"));
}

#[tokio::test]
async fn test_sign_out_removes_persisted_session() {
    let server = MockServer::start_async().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let auth = auth_for(&server, Some(SessionStore::new(&path)));

    let _mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/accounts:signInWithPassword");
            then.status(200).json_body(sign_in_body());
        })
        .await;

    auth.sign_in("alice@example.com", "secret").await.unwrap();
    assert!(path.exists());

    let restored = auth_for(&server, Some(SessionStore::new(&path)));
    let user = restored.restore().unwrap().unwrap();
    assert_eq!(user.uid, "uid-123");
    assert!(restored.is_signed_in());

    assert!(auth.sign_out());
    assert!(!auth.is_signed_in());
    assert!(!path.exists());
}

#[tokio::test]
async fn test_sign_out_fails_when_session_cannot_be_removed() {
    let server = MockServer::start_async().await;
    let dir = tempfile::tempdir().unwrap();
    // A non-empty directory at the session path cannot be removed with remove_file.
    let path = dir.path().join("session.json");
    std::fs::create_dir(&path).unwrap();
    std::fs::write(path.join("keep"), b"x").unwrap();

    let auth = auth_for(&server, Some(SessionStore::new(&path)));
    let session = PasswordResponse {
        local_id: "uid-1".to_string(),
        email: Some("a@b.com".to_string()),
        display_name: None,
        profile_picture: None,
        id_token: "t".to_string(),
        refresh_token: "r".to_string(),
        expires_in: None,
    }
    .into_session();
    auth.session().set(session);

    assert!(!auth.sign_out());
    assert!(auth.is_signed_in());
}

#[test]
fn test_auth_error_kind_identifiers() {
    assert_eq!(auth_error_kind("INVALID_LOGIN_CREDENTIALS"), Some(ErrorKind::InvalidCredential));
    assert_eq!(auth_error_kind("USER_DISABLED"), Some(ErrorKind::PermissionDenied));
    assert_eq!(
        auth_error_kind("TOO_MANY_ATTEMPTS_TRY_LATER : Access disabled"),
        Some(ErrorKind::ResourceExhausted)
    );
    assert_eq!(auth_error_kind("SOMETHING_ELSE"), None);
}
