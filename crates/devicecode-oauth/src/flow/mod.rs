//! Device authorization grant: session initiation and token polling.

mod device;
mod poller;

pub use device::{DeviceAuthorization, DeviceCodeSession, DeviceFlow, PollResponse};
pub use poller::{DevicePoller, PollState, TokenOutcome};

use crate::authority::Authority;
use crate::error::Result;
use crate::scopes::Scopes;
use crate::token::{ErrorResponse, Token, TokenResponse};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use tracing::debug;
use url::Url;

/// Public (secretless) client registered with an identity provider.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    /// Client (application) ID from the app registration.
    pub client_id: String,
    /// Provider endpoints.
    pub authority: Authority,
    /// HTTP client.
    http_client: Client,
}

impl OAuthClient {
    /// Creates a new client.
    #[must_use]
    pub fn new(client_id: impl Into<String>, authority: Authority) -> Self {
        Self {
            client_id: client_id.into(),
            authority,
            http_client: Client::new(),
        }
    }

    /// Uses a preconfigured HTTP client (timeouts, proxies).
    #[must_use]
    pub fn with_http_client(mut self, http_client: Client) -> Self {
        self.http_client = http_client;
        self
    }

    /// Redeems a refresh token for a new access token.
    ///
    /// The old refresh token is kept if the provider does not rotate it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Provider`](crate::Error::Provider) if the provider
    /// rejects the grant, or a transport error.
    pub async fn refresh_token(&self, refresh_token: &str, scopes: &Scopes) -> Result<Token> {
        let scope = scopes.to_request_string();
        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);
        params.insert("client_id", self.client_id.as_str());
        params.insert("scope", scope.as_str());

        let token_response = self
            .post_token_request(&params)
            .await?
            .map_err(ErrorResponse::into_error)?;
        let mut new_token = Token::from_response(token_response, scopes)?;

        if new_token.refresh_token.is_none() {
            new_token.refresh_token = Some(refresh_token.to_string());
        }

        Ok(new_token)
    }

    /// Posts a form to the token endpoint.
    ///
    /// The outer `Result` carries transport and decoding failures; the inner
    /// one separates a token body from an `OAuth2` error body.
    pub(crate) async fn post_token_request(
        &self,
        params: &HashMap<&str, &str>,
    ) -> Result<std::result::Result<TokenResponse, ErrorResponse>> {
        let url = self.authority.token_url.clone();
        let (status, body) = self.post_form(url, params).await?;

        if status.is_success() {
            // Some providers answer 200 with an error document.
            match serde_json::from_str::<TokenResponse>(&body) {
                Ok(token) => Ok(Ok(token)),
                Err(e) => serde_json::from_str::<ErrorResponse>(&body)
                    .map(Err)
                    .map_err(|_| e.into()),
            }
        } else {
            Ok(Err(ErrorResponse::parse(status, &body)))
        }
    }

    pub(crate) async fn post_form(
        &self,
        url: Url,
        params: &HashMap<&str, &str>,
    ) -> Result<(StatusCode, String)> {
        debug!("POST {url}");
        let response = self.http_client.post(url).form(params).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }
}
