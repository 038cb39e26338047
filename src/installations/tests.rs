use super::*;
use httpmock::prelude::*;
use reqwest::Client;
use serde_json::json;

#[test]
fn test_generate_fid_shape() {
    for _ in 0..32 {
        let fid = generate_fid();
        assert_eq!(fid.len(), 22);
        // High nibble 0111 always encodes to c, d, e or f as the first character.
        assert!(matches!(fid.chars().next(), Some('c' | 'd' | 'e' | 'f')));
        assert!(fid.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}

#[test]
fn test_parse_expires_in() {
    assert_eq!(parse_expires_in("604800s").unwrap(), chrono::Duration::seconds(604800));
    assert!(parse_expires_in("soon").is_err());
}

#[tokio::test]
async fn test_installation_is_registered_once() {
    let server = MockServer::start_async().await;
    let installations = FirebaseInstallations::new_with_client(
        ClientBuilder::new(Client::new()).build(),
        server.url("/v1/projects/p/installations"),
        "api-key",
        "1:123:web:abc",
    );

    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/projects/p/installations")
                .header("x-goog-api-key", "api-key");
            then.status(200).json_body(json!({
                "name": "projects/p/installations/fid-from-server",
                "fid": "fid-from-server",
                "refreshToken": "refresh",
                "authToken": { "token": "fis-token", "expiresIn": "604800s" }
            }));
        })
        .await;

    let first = installations.installation().await.unwrap();
    let second = installations.installation().await.unwrap();

    assert_eq!(first.fid, "fid-from-server");
    assert_eq!(first.auth_token, "fis-token");
    assert_eq!(first, second);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_expiring_auth_token_is_refreshed() {
    let server = MockServer::start_async().await;
    let installations = FirebaseInstallations::new_with_client(
        ClientBuilder::new(Client::new()).build(),
        server.url("/v1/projects/p/installations"),
        "api-key",
        "1:123:web:abc",
    );

    let register = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/projects/p/installations");
            then.status(200).json_body(json!({
                "fid": "fid-1",
                "refreshToken": "refresh",
                "authToken": { "token": "short-lived", "expiresIn": "60s" }
            }));
        })
        .await;

    let refresh = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/projects/p/installations/fid-1/authTokens:generate")
                .header("x-goog-api-key", "api-key")
                .header("authorization", "FIS_v2 refresh")
                .json_body(json!({
                    "installation": {
                        "appId": "1:123:web:abc",
                        "sdkVersion": concat!("r:", env!("CARGO_PKG_VERSION"))
                    }
                }));
            then.status(200).json_body(json!({ "token": "fresh", "expiresIn": "604800s" }));
        })
        .await;

    let first = installations.installation().await.unwrap();
    assert_eq!(first.auth_token, "short-lived");
    assert!(first.needs_token_refresh());

    let second = installations.installation().await.unwrap();
    assert_eq!(second.fid, "fid-1");
    assert_eq!(second.auth_token, "fresh");
    assert!(!second.needs_token_refresh());

    // The refreshed token is cached.
    installations.installation().await.unwrap();

    register.assert_async().await;
    refresh.assert_async().await;
}
