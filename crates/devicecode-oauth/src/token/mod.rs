//! Token types and provider response bodies.

mod account;

#[cfg(test)]
pub(crate) use account::tests::id_token as test_id_token;
pub use account::Account;

use crate::error::{Error, Result};
use crate::scopes::Scopes;
use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use tracing::warn;

/// Seconds before `expires_at` at which a token is already treated as expired.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// Absolute expiry for a relative lifetime, clamped to `u32::MAX` seconds.
pub(crate) fn expiry_after(now: DateTime<Utc>, secs: u64) -> DateTime<Utc> {
    let secs = u32::try_from(secs).unwrap_or(u32::MAX);
    now + Duration::seconds(i64::from(secs))
}

/// Access token obtained from the identity provider.
#[derive(Clone)]
pub struct Token {
    /// Access token string.
    pub access_token: String,
    /// Token type (usually "Bearer").
    pub token_type: String,
    /// Expiration time.
    pub expires_at: Option<DateTime<Utc>>,
    /// Refresh token for silent renewal.
    pub refresh_token: Option<String>,
    /// Scopes granted by the provider.
    pub scopes: Vec<String>,
    /// Signed-in account, when the provider returned an ID token.
    pub account: Option<Account>,
}

impl Token {
    /// Creates a bare bearer token.
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: "Bearer".to_string(),
            expires_at: None,
            refresh_token: None,
            scopes: Vec::new(),
            account: None,
        }
    }

    /// Builds a token from a successful token endpoint response.
    ///
    /// `requested` fills in the granted scopes when the provider omits `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResponse`] if the response carries no access token.
    pub fn from_response(response: TokenResponse, requested: &Scopes) -> Result<Self> {
        if response.access_token.trim().is_empty() {
            return Err(Error::InvalidResponse("empty access_token".into()));
        }

        let expires_at = response.expires_in.map(|secs| expiry_after(Utc::now(), secs));

        let scopes = response.scope.as_deref().map_or_else(
            || requested.as_slice().to_vec(),
            |s| s.split_whitespace().map(ToString::to_string).collect(),
        );

        let account = response
            .id_token
            .as_deref()
            .and_then(|raw| match Account::from_id_token(raw) {
                Ok(account) => Some(account),
                Err(e) => {
                    warn!("Ignoring unreadable id_token: {e}");
                    None
                }
            });

        Ok(Self {
            access_token: response.access_token,
            token_type: response.token_type,
            expires_at,
            refresh_token: response.refresh_token,
            scopes,
            account,
        })
    }

    /// Checks if the token is expired (with 60 second buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Checks expiry against a given instant.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|exp| now + Duration::seconds(EXPIRY_BUFFER_SECS) >= exp)
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Sets the expiration time.
    #[must_use]
    pub const fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Sets the granted scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: &[&str]) -> Self {
        self.scopes = scopes.iter().map(ToString::to_string).collect();
        self
    }

    /// Sets the account.
    #[must_use]
    pub fn with_account(mut self, account: Account) -> Self {
        self.account = Some(account);
        self
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("scopes", &self.scopes)
            .field("account", &self.account)
            .finish()
    }
}

/// Successful token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Token type.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Granted scopes, space-separated.
    #[serde(default)]
    pub scope: Option<String>,
    /// OIDC ID token.
    #[serde(default)]
    pub id_token: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// `OAuth2` error body (RFC 6749 §5.2).
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub error: String,
    /// Error description.
    #[serde(default)]
    pub error_description: String,
    /// Azure AD numeric error codes.
    #[serde(default)]
    pub error_codes: Vec<u32>,
}

impl ErrorResponse {
    /// Parses an error body, falling back to an `http_<status>` code when
    /// the body is not an `OAuth2` error document.
    #[must_use]
    pub fn parse(status: StatusCode, body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_else(|_| Self {
            error: format!("http_{}", status.as_u16()),
            error_description: body.chars().take(512).collect(),
            error_codes: Vec::new(),
        })
    }

    /// Converts to an Error.
    #[must_use]
    pub fn into_error(self) -> Error {
        Error::Provider {
            code: self.error,
            description: self.error_description,
            error_codes: self.error_codes,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn response(json: &serde_json::Value) -> TokenResponse {
        serde_json::from_value(json.clone()).unwrap()
    }

    #[test]
    fn test_token_creation() {
        let token = Token::new("access123");
        assert_eq!(token.access_token, "access123");
        assert_eq!(token.token_type, "Bearer");
        assert!(token.expires_at.is_none());
        assert!(!token.is_expired());
    }

    #[test]
    fn test_token_expiration() {
        let expired = Token::new("a").with_expires_at(Utc::now() - Duration::seconds(120));
        assert!(expired.is_expired());

        let in_buffer = Token::new("a").with_expires_at(Utc::now() + Duration::seconds(30));
        assert!(in_buffer.is_expired());

        let valid = Token::new("a").with_expires_at(Utc::now() + Duration::seconds(3600));
        assert!(!valid.is_expired());
    }

    #[test]
    fn test_from_response_full() {
        let id = test_id_token(&serde_json::json!({
            "oid": "o", "tid": "t", "preferred_username": "u@contoso.com"
        }));
        let token = Token::from_response(
            response(&serde_json::json!({
                "access_token": "T1",
                "token_type": "Bearer",
                "expires_in": 3599,
                "refresh_token": "R1",
                "scope": "User.Read openid profile",
                "id_token": id
            })),
            &Scopes::new(["user.read"]),
        )
        .unwrap();

        assert_eq!(token.access_token, "T1");
        assert_eq!(token.refresh_token.as_deref(), Some("R1"));
        assert_eq!(token.scopes, ["User.Read", "openid", "profile"]);
        assert_eq!(token.account.as_ref().unwrap().username, "u@contoso.com");
        assert!(!token.is_expired());
    }

    #[test]
    fn test_from_response_defaults() {
        let token = Token::from_response(
            response(&serde_json::json!({ "access_token": "T1" })),
            &Scopes::new(["read.profile"]),
        )
        .unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.scopes, ["read.profile"]);
        assert!(token.account.is_none());
        assert!(token.expires_at.is_none());
    }

    #[test]
    fn test_from_response_bad_id_token_is_ignored() {
        let token = Token::from_response(
            response(&serde_json::json!({ "access_token": "T1", "id_token": "garbage" })),
            &Scopes::new(["a"]),
        )
        .unwrap();
        assert!(token.account.is_none());
    }

    #[test]
    fn test_from_response_empty_access_token() {
        let result = Token::from_response(
            response(&serde_json::json!({ "access_token": "" })),
            &Scopes::new(["a"]),
        );
        assert!(matches!(result, Err(Error::InvalidResponse(_))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let token = Token::new("secret-access").with_refresh_token("secret-refresh");
        let debug = format!("{token:?}");
        assert!(!debug.contains("secret-access"));
        assert!(!debug.contains("secret-refresh"));
    }

    #[test]
    fn test_error_response_json() {
        let body = r#"{"error":"invalid_tenant","error_description":"bad","error_codes":[90002]}"#;
        let err = ErrorResponse::parse(StatusCode::BAD_REQUEST, body).into_error();
        match err {
            Error::Provider {
                code, error_codes, ..
            } => {
                assert_eq!(code, "invalid_tenant");
                assert_eq!(error_codes, [90002]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_error_response_not_json() {
        let parsed = ErrorResponse::parse(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert_eq!(parsed.error, "http_502");
        assert_eq!(parsed.error_description, "<html>oops</html>");
    }
}
