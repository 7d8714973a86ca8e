//! Google token endpoints and JWKS loading against a mock server.

use letterbox_auth::{GoogleOAuthClient, jwks::fetch_jwks};
use letterbox_types::{LetterboxError, OAuthProvider, now_millis};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REDIRECT: &str = "http://localhost:5000/auth/google-callback";

// Public exponent 65537 and an RFC 7517 example modulus.
const N: &str = "sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1WlUzewbgBHod5pcM9H95GQRV3JDXboIRROSBigeC5yjU1hGzHHyXss8UDprecbAYxknTcQkhslANGRUZmdTOQ5qTRsLAt6BTYuyvVRdhS8exSZEy_c4gs_7svlJJQ4H9_NxsiIoLwAEk7-Q3UXERGYw_75IDrGA84-lA_-Ct4eTlXHBIY2EaV7t7LjJaynVJCpkv4LKjTTAumiGUIuQhrNhZLuF_RJLqHpM2kgWFLU7-VTdL1VbC2tejvcI2BlMkEpk1BzBZI0KQB0GaDWFLN-aEAw3vRw";

fn client_for(server: &MockServer) -> GoogleOAuthClient {
    GoogleOAuthClient::new(
        rquest::Client::new(),
        Some("cid".into()),
        Some("secret".into()),
    )
    .with_endpoints(
        format!("{}/token", server.uri()),
        format!("{}/revoke", server.uri()),
    )
}

#[tokio::test]
async fn test_exchange_code_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=4%2Fabc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.new",
            "refresh_token": "1//refresh",
            "expires_in": 3599,
            "token_type": "Bearer",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = client_for(&server)
        .exchange_code("4/abc", REDIRECT)
        .await
        .expect("exchange failed");
    assert_eq!(tokens.access_token.as_deref(), Some("ya29.new"));
    assert_eq!(tokens.refresh_token.as_deref(), Some("1//refresh"));
    assert!(tokens.expiry_epoch_millis.unwrap() > now_millis());
}

#[tokio::test]
async fn test_exchange_code_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .exchange_code("used", REDIRECT)
        .await
        .unwrap_err();
    assert!(matches!(err, LetterboxError::CodeExchangeFailed(_)), "got {err:?}");
}

#[tokio::test]
async fn test_exchange_code_unparsable_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .exchange_code("c", REDIRECT)
        .await
        .unwrap_err();
    assert!(matches!(err, LetterboxError::CodeExchangeFailed(_)), "got {err:?}");
}

#[tokio::test]
async fn test_exchange_code_transport_failure() {
    // Nothing listens on a port that was just released.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .unwrap()
        .port();
    let client = GoogleOAuthClient::new(
        rquest::Client::new(),
        Some("cid".into()),
        Some("secret".into()),
    )
    .with_endpoints(
        format!("http://127.0.0.1:{port}/token"),
        format!("http://127.0.0.1:{port}/revoke"),
    );

    let err = client.exchange_code("c", REDIRECT).await.unwrap_err();
    assert!(matches!(err, LetterboxError::CodeExchangeFailed(_)), "got {err:?}");
}

#[tokio::test]
async fn test_refresh_success_without_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "ya29.fresh"})))
        .mount(&server)
        .await;

    let tokens = client_for(&server).refresh("r1").await.expect("refresh failed");
    assert_eq!(tokens.access_token.as_deref(), Some("ya29.fresh"));
    assert!(tokens.refresh_token.is_none());
}

#[tokio::test]
async fn test_refresh_rejected_is_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .mount(&server)
        .await;

    let err = client_for(&server).refresh("revoked").await.unwrap_err();
    match err {
        LetterboxError::Upstream { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("invalid_grant"));
        }
        other => panic!("expected Upstream, got {other:?}"),
    }
}

#[tokio::test]
async fn test_revoke() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/revoke"))
        .and(body_string_contains("token=good"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/revoke"))
        .and(body_string_contains("token=bad"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.revoke("good").await.expect("revoke failed");
    assert!(matches!(
        client.revoke("bad").await.unwrap_err(),
        LetterboxError::Upstream { status: 400, .. }
    ));
}

#[tokio::test]
async fn test_fetch_jwks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "keys": [{"kid": "k1", "kty": "RSA", "alg": "RS256", "use": "sig", "n": N, "e": "AQAB"}]
        })))
        .mount(&server)
        .await;

    let keys = fetch_jwks(&rquest::Client::new(), &format!("{}/jwks", server.uri()))
        .await
        .expect("fetch failed");
    assert_eq!(keys.len(), 1);
}

#[tokio::test]
async fn test_fetch_jwks_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = fetch_jwks(&rquest::Client::new(), &format!("{}/jwks", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, LetterboxError::Upstream { status: 500, .. }));
}
