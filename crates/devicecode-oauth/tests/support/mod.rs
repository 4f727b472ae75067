//! Shared mock identity provider for the integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use devicecode_oauth::{Authority, OAuthClient, PublicClient};
use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const DEVICE_PATH: &str = "/tenant/oauth2/v2.0/devicecode";
pub const TOKEN_PATH: &str = "/tenant/oauth2/v2.0/token";
pub const DEVICE_CODE: &str = "dev-123";

/// Authority whose endpoints live on `server`.
pub fn authority(server: &MockServer) -> Authority {
    Authority::from_authority_url(&format!("{}/tenant", server.uri())).unwrap()
}

pub fn public_client(server: &MockServer) -> PublicClient {
    PublicClient::new(OAuthClient::new("client-abc", authority(server)))
}

/// Unsigned JWT carrying `claims`; the client never checks signatures.
pub fn id_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.")
}

pub fn adele_id_token() -> String {
    id_token(&json!({
        "oid": "oid-1",
        "tid": "tid-1",
        "sub": "sub-1",
        "preferred_username": "adele@contoso.com",
        "name": "Adele Vance"
    }))
}

pub fn device_authorization(expires_in: u64, interval: u64) -> Value {
    json!({
        "device_code": DEVICE_CODE,
        "user_code": "ABCD-EFGH",
        "verification_uri": "https://microsoft.com/devicelogin",
        "expires_in": expires_in,
        "interval": interval,
        "message": "To sign in, use a web browser to open the page https://microsoft.com/devicelogin and enter the code ABCD-EFGH to authenticate."
    })
}

pub fn token_body(access_token: &str) -> Value {
    json!({
        "token_type": "Bearer",
        "scope": "User.Read profile openid email",
        "expires_in": 3600,
        "access_token": access_token,
        "refresh_token": format!("{access_token}-refresh"),
        "id_token": adele_id_token()
    })
}

pub fn oauth_error(code: &str) -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({
        "error": code,
        "error_description": format!("AADSTS00000: {code}"),
        "error_codes": [70016]
    }))
}

pub async fn mount_device_authorization(
    server: &MockServer,
    expires_in: u64,
    interval: u64,
    expected: u64,
) {
    Mock::given(method("POST"))
        .and(path(DEVICE_PATH))
        .and(body_string_contains("client_id=client-abc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(device_authorization(expires_in, interval)),
        )
        .expect(expected)
        .mount(server)
        .await;
}

/// Token endpoint mock for the device code grant only.
pub fn device_code_poll() -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains(format!("device_code={DEVICE_CODE}")))
}

pub fn refresh_grant() -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
}

pub async fn requests_to(server: &MockServer, endpoint: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == endpoint)
        .collect()
}

/// Responds with a fixed template and records when each request arrived.
#[derive(Clone)]
pub struct ArrivalRecorder {
    template: ResponseTemplate,
    arrivals: Arc<Mutex<Vec<DateTime<Utc>>>>,
}

impl ArrivalRecorder {
    pub fn new(template: ResponseTemplate) -> Self {
        Self {
            template,
            arrivals: Arc::default(),
        }
    }

    pub fn arrivals(&self) -> Vec<DateTime<Utc>> {
        self.arrivals.lock().unwrap().clone()
    }
}

impl Respond for ArrivalRecorder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.arrivals.lock().unwrap().push(Utc::now());
        self.template.clone()
    }
}
