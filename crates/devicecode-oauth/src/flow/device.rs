//! Device Authorization Flow implementation (RFC 8628).

use super::OAuthClient;
use super::poller::{DevicePoller, TokenOutcome};
use crate::error::{Error, Result};
use crate::scopes::Scopes;
use crate::token::{ErrorResponse, Token, expiry_after};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Grant type for device code redemption (RFC 8628 §3.4).
const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Device authorization response.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceAuthorization {
    /// Device code for polling.
    pub device_code: String,
    /// User code to display to the user.
    pub user_code: String,
    /// Verification URI where user should go.
    #[serde(alias = "verification_url")]
    pub verification_uri: String,
    /// Verification URI with the user code embedded (optional).
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
    /// Expiration time in seconds.
    pub expires_in: u64,
    /// Polling interval in seconds.
    #[serde(default = "default_interval")]
    pub interval: u64,
    /// Ready-made instructions for the user (Azure AD).
    #[serde(default)]
    pub message: Option<String>,
}

const fn default_interval() -> u64 {
    5
}

/// An active device code sign-in.
///
/// Created once per flow and never modified; the poller only reads it.
#[derive(Debug, Clone)]
pub struct DeviceCodeSession {
    user_code: String,
    verification_uri: String,
    verification_uri_complete: Option<String>,
    device_code: String,
    interval: Duration,
    expires_at: DateTime<Utc>,
    message: String,
    scopes: Scopes,
}

impl DeviceCodeSession {
    /// Builds a session from the provider's authorization response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResponse`] if the device or user code is empty.
    pub fn from_authorization(
        auth: DeviceAuthorization,
        scopes: Scopes,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if auth.device_code.is_empty() || auth.user_code.is_empty() {
            return Err(Error::InvalidResponse(
                "device authorization response without device_code or user_code".into(),
            ));
        }

        let message = auth.message.filter(|m| !m.trim().is_empty()).unwrap_or_else(|| {
            format!(
                "To sign in, use a web browser to open the page {} and enter the code {} to authenticate.",
                auth.verification_uri, auth.user_code
            )
        });

        Ok(Self {
            user_code: auth.user_code,
            verification_uri: auth.verification_uri,
            verification_uri_complete: auth.verification_uri_complete,
            device_code: auth.device_code,
            interval: Duration::from_secs(auth.interval),
            expires_at: expiry_after(now, auth.expires_in),
            message,
            scopes,
        })
    }

    /// Code the user types at the verification page.
    #[must_use]
    pub fn user_code(&self) -> &str {
        &self.user_code
    }

    /// Page where the user enters the code.
    #[must_use]
    pub fn verification_uri(&self) -> &str {
        &self.verification_uri
    }

    /// Verification page with the code pre-filled, if offered.
    #[must_use]
    pub fn verification_uri_complete(&self) -> Option<&str> {
        self.verification_uri_complete.as_deref()
    }

    /// Opaque polling handle.
    #[must_use]
    pub fn device_code(&self) -> &str {
        &self.device_code
    }

    /// Provider-directed polling interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Instant after which the code can no longer be redeemed.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Instructions shown to the user.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Scopes the session was started for.
    #[must_use]
    pub const fn scopes(&self) -> &Scopes {
        &self.scopes
    }
}

/// Result of a single token endpoint poll.
#[derive(Debug)]
pub enum PollResponse {
    /// The user finished signing in.
    Token(Token),
    /// `authorization_pending`: keep polling.
    Pending,
    /// `slow_down`: keep polling at a longer interval.
    SlowDown,
    /// The device code expired on the provider side.
    Expired,
    /// The user declined the request on the sign-in page.
    Declined,
}

/// Device Authorization Flow for `OAuth2`.
///
/// This flow is suitable for devices with limited input capabilities
/// or no browser (e.g., CLI applications, `IoT` devices).
#[derive(Debug)]
pub struct DeviceFlow {
    client: OAuthClient,
}

impl DeviceFlow {
    /// Creates a new device flow.
    #[must_use]
    pub const fn new(client: OAuthClient) -> Self {
        Self { client }
    }

    /// Returns the underlying client.
    #[must_use]
    pub const fn client(&self) -> &OAuthClient {
        &self.client
    }

    /// Starts a device code session for `scopes`.
    ///
    /// `notify` receives the user instructions exactly once, before this
    /// returns. It should return promptly since polling starts right after.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the authority has no device endpoint and
    /// [`Error::Provider`] if the provider rejects the request.
    pub async fn start_session<F>(&self, scopes: &Scopes, notify: F) -> Result<DeviceCodeSession>
    where
        F: FnOnce(&str),
    {
        let device_auth_url = self.client.authority.device_authorization_url()?.clone();
        let scope = scopes.to_request_string();

        let mut params = HashMap::new();
        params.insert("client_id", self.client.client_id.as_str());
        params.insert("scope", scope.as_str());

        let (status, body) = self.client.post_form(device_auth_url, &params).await?;
        if !status.is_success() {
            let error = ErrorResponse::parse(status, &body).into_error();
            debug!("Device authorization rejected: {error}");
            return Err(error);
        }

        let auth: DeviceAuthorization = serde_json::from_str(&body)?;
        let session = DeviceCodeSession::from_authorization(auth, scopes.clone(), Utc::now())?;

        info!(
            user_code = session.user_code(),
            expires_at = %session.expires_at(),
            interval_secs = session.interval().as_secs(),
            "Device code session started"
        );

        notify(session.message());
        Ok(session)
    }

    /// Issues one token request for `session`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Provider`] for definitive rejections (e.g.
    /// `access_denied`, `invalid_grant`) and transport errors.
    pub async fn poll_once(&self, session: &DeviceCodeSession) -> Result<PollResponse> {
        let mut params = HashMap::new();
        params.insert("grant_type", DEVICE_CODE_GRANT);
        params.insert("device_code", session.device_code());
        params.insert("client_id", self.client.client_id.as_str());

        match self.client.post_token_request(&params).await? {
            Ok(token_response) => Ok(PollResponse::Token(Token::from_response(
                token_response,
                session.scopes(),
            )?)),
            Err(error) => match error.error.as_str() {
                "authorization_pending" => Ok(PollResponse::Pending),
                "slow_down" => Ok(PollResponse::SlowDown),
                "expired_token" | "code_expired" => Ok(PollResponse::Expired),
                "authorization_declined" => Ok(PollResponse::Declined),
                _ => Err(error.into_error()),
            },
        }
    }

    /// Creates a poller for `session`.
    #[must_use]
    pub fn poller(
        &self,
        session: DeviceCodeSession,
        cancel: CancellationToken,
    ) -> DevicePoller<'_> {
        DevicePoller::new(self, session, cancel)
    }

    /// Complete device authorization flow: start a session, then poll it
    /// until it succeeds, expires, or is cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be started or the provider
    /// rejects the grant while polling.
    pub async fn authorize<F>(
        &self,
        scopes: &Scopes,
        notify: F,
        cancel: CancellationToken,
    ) -> Result<TokenOutcome>
    where
        F: FnOnce(&str),
    {
        let session = self.start_session(scopes, notify).await?;
        self.poller(session, cancel).run().await
    }
}
