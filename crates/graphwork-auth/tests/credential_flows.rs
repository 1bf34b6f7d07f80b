//! Credential flows against a mock identity provider.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use graphwork_auth::{
    AuthError, AuthorizationCode, AuthorizationRequest, Audience, BearerToken, ClientSecret,
    Credential, InteractivePrompt, PromptError, Scope, TokenEndpoint,
};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_PATH: &str = "/tenant-1/oauth2/v2.0/token";

fn token_body(token: &str) -> serde_json::Value {
    json!({
        "token_type": "Bearer",
        "expires_in": 3599,
        "access_token": token,
    })
}

fn endpoint(server: &MockServer) -> TokenEndpoint {
    TokenEndpoint::new(&server.uri()).unwrap()
}

/// Prompt that "signs in" by echoing the request state, optionally tampered.
#[derive(Debug, Default)]
struct ScriptedPrompt {
    outcome: Option<PromptOutcome>,
    seen: Mutex<Vec<AuthorizationRequest>>,
}

#[derive(Debug, Clone)]
enum PromptOutcome {
    Cancel,
    WrongState,
}

#[async_trait]
impl InteractivePrompt for ScriptedPrompt {
    async fn authorize(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationCode, PromptError> {
        self.seen.lock().unwrap().push(request.clone());
        match self.outcome {
            None => Ok(AuthorizationCode {
                code: "auth-code-1".to_string(),
                state: request.state.clone(),
            }),
            Some(PromptOutcome::Cancel) => Err(PromptError::Cancelled),
            Some(PromptOutcome::WrongState) => Ok(AuthorizationCode {
                code: "auth-code-1".to_string(),
                state: "forged".to_string(),
            }),
        }
    }
}

fn application(audience: &str) -> Credential {
    Credential::Application {
        tenant_id: "tenant-1".to_string(),
        client_id: "client-1".to_string(),
        client_secret: ClientSecret::new("secret-1"),
        audience: Audience::new(audience),
    }
}

fn delegated(prompt: Arc<ScriptedPrompt>, scopes: &str) -> Credential {
    Credential::Delegated {
        tenant_id: "tenant-1".to_string(),
        client_id: "spa-1".to_string(),
        redirect_uri: "http://localhost".to_string(),
        scopes: Scope::parse_list(scopes).unwrap(),
        prompt,
    }
}

fn exchange(upstream: BearerToken, scopes: &str) -> Credential {
    Credential::DelegatedExchange {
        tenant_id: "tenant-1".to_string(),
        client_id: "api-1".to_string(),
        client_secret: ClientSecret::new("api-secret"),
        upstream,
        scopes: Scope::parse_list(scopes).unwrap(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Application
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_application_flow_requests_default_scope_of_audience() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_secret=secret-1"))
        .and(body_string_contains("scope=api%3A%2F%2Fclient-1%2F.default"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("app-token")))
        .expect(1)
        .mount(&server)
        .await;

    let token = application("api://client-1")
        .acquire(&endpoint(&server))
        .await
        .unwrap();

    assert_eq!(token.secret(), "app-token");
    assert_eq!(token.audience(), &Audience::new("api://client-1"));
    assert!(!token.is_expired());
}

#[tokio::test]
async fn test_application_flow_rejected_client() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "AADSTS7000215: Invalid client secret provided."
        })))
        .mount(&server)
        .await;

    let err = application("https://graph.microsoft.com")
        .acquire(&endpoint(&server))
        .await
        .unwrap_err();

    match err {
        AuthError::InvalidClient(msg) => assert!(msg.contains("AADSTS7000215")),
        other => panic!("expected InvalidClient, got {:?}", other),
    }
}

#[tokio::test]
async fn test_network_failure_is_not_retried() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let endpoint = TokenEndpoint::new(&format!("http://{}", addr)).unwrap();
    let err = application("https://graph.microsoft.com")
        .acquire(&endpoint)
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::NetworkFailure(_)));
}

#[tokio::test]
async fn test_unrepresentable_lifetime_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": i64::MAX,
            "access_token": "t",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = application("https://graph.microsoft.com")
        .acquire(&endpoint(&server))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::MalformedResponse(_)), "{:?}", err);
}

#[tokio::test]
async fn test_negative_lifetime_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": -1,
            "access_token": "t",
        })))
        .mount(&server)
        .await;

    let err = application("https://graph.microsoft.com")
        .acquire(&endpoint(&server))
        .await
        .unwrap_err();

    match err {
        AuthError::MalformedResponse(msg) => assert!(msg.contains("-1")),
        other => panic!("expected MalformedResponse, got {:?}", other),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Delegated
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_delegated_flow_redeems_code_with_verifier() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code-1"))
        .and(body_string_contains("code_verifier="))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("user-token")))
        .expect(1)
        .mount(&server)
        .await;

    let prompt = Arc::new(ScriptedPrompt::default());
    let token = delegated(prompt.clone(), "")
        .acquire(&endpoint(&server))
        .await
        .unwrap();

    assert_eq!(token.secret(), "user-token");
    assert_eq!(token.audience(), &Audience::graph());

    let seen = prompt.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].url.contains("/tenant-1/oauth2/v2.0/authorize?"));
    assert!(seen[0].url.contains("code_challenge_method=S256"));
}

#[tokio::test]
async fn test_delegated_flow_for_own_api_scope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("scope=api%3A%2F%2Fapi-1%2Fdefault"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("api-token")))
        .expect(1)
        .mount(&server)
        .await;

    let token = delegated(Arc::new(ScriptedPrompt::default()), "api://api-1/default")
        .acquire(&endpoint(&server))
        .await
        .unwrap();

    assert_eq!(token.audience(), &Audience::new("api://api-1"));
}

#[tokio::test]
async fn test_delegated_flow_cancelled_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("never")))
        .expect(0)
        .mount(&server)
        .await;

    let prompt = Arc::new(ScriptedPrompt {
        outcome: Some(PromptOutcome::Cancel),
        ..Default::default()
    });
    let err = delegated(prompt, "").acquire(&endpoint(&server)).await.unwrap_err();

    assert!(matches!(err, AuthError::UserCancelled));
}

#[tokio::test]
async fn test_delegated_flow_rejects_forged_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("never")))
        .expect(0)
        .mount(&server)
        .await;

    let prompt = Arc::new(ScriptedPrompt {
        outcome: Some(PromptOutcome::WrongState),
        ..Default::default()
    });
    let err = delegated(prompt, "").acquire(&endpoint(&server)).await.unwrap_err();

    assert!(matches!(err, AuthError::StateMismatch));
}

#[tokio::test]
async fn test_delegated_flow_interaction_required() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "interaction_required",
            "error_description": "AADSTS50076: MFA required"
        })))
        .mount(&server)
        .await;

    let err = delegated(Arc::new(ScriptedPrompt::default()), "")
        .acquire(&endpoint(&server))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::InteractionRequired(_)));
}

// ─────────────────────────────────────────────────────────────────────────────
// Delegated exchange (on-behalf-of)
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_exchange_sends_upstream_assertion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains(
            "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
        ))
        .and(body_string_contains("assertion=upstream-token"))
        .and(body_string_contains("requested_token_use=on_behalf_of"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("graph-token")))
        .expect(1)
        .mount(&server)
        .await;

    let upstream = BearerToken::expiring_in("upstream-token", 600, Audience::new("api://api-1"));
    let token = exchange(upstream, "https://graph.microsoft.com/User.Read")
        .acquire(&endpoint(&server))
        .await
        .unwrap();

    assert_eq!(token.secret(), "graph-token");
    assert_eq!(token.audience(), &Audience::graph());
}

#[tokio::test]
async fn test_exchange_with_bare_default_targets_graph() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("scope=.default"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("graph-token")))
        .expect(1)
        .mount(&server)
        .await;

    let upstream = BearerToken::expiring_in("upstream-token", 600, Audience::new("api://api-1"));
    let token = exchange(upstream, ".default")
        .acquire(&endpoint(&server))
        .await
        .unwrap();

    // Not api://api-1: the bare scope resolves to the default resource provider.
    assert_ne!(token.audience(), &Audience::new("api://api-1"));
    assert_eq!(token.audience(), &Audience::graph());
}

#[tokio::test]
async fn test_exchange_refuses_expired_upstream_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("never")))
        .expect(0)
        .mount(&server)
        .await;

    let upstream = BearerToken::expiring_in("stale", -5, Audience::new("api://api-1"));
    let err = exchange(upstream, "https://graph.microsoft.com/.default")
        .acquire(&endpoint(&server))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::UpstreamTokenInvalid(_)));
}

#[tokio::test]
async fn test_exchange_invalid_grant_is_upstream_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "AADSTS50013: Assertion failed signature validation."
        })))
        .mount(&server)
        .await;

    let upstream = BearerToken::expiring_in("bogus", 600, Audience::new("api://api-1"));
    let err = exchange(upstream, "https://graph.microsoft.com/.default")
        .acquire(&endpoint(&server))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::UpstreamTokenInvalid(_)));
}
