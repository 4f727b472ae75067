//! Public client application: cached tokens first, device code flow second.

use crate::cache::TokenCache;
use crate::error::{Error, Result};
use crate::flow::{DeviceFlow, OAuthClient, TokenOutcome};
use crate::scopes::Scopes;
use crate::token::{Account, Token};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Result of a silent (non-interactive) token request.
#[derive(Debug)]
pub enum SilentOutcome {
    /// A cached or refreshed token.
    Token(Token),
    /// No usable token; the user has to sign in interactively.
    UiRequired,
}

/// Device code client that owns a token cache.
///
/// Successful sign-ins and refreshes are written to the cache, so later
/// calls to [`acquire_token`](Self::acquire_token) can skip the device code
/// flow.
#[derive(Debug)]
pub struct PublicClient {
    flow: DeviceFlow,
    cache: TokenCache,
}

impl PublicClient {
    /// Creates a client with an empty cache.
    #[must_use]
    pub fn new(client: OAuthClient) -> Self {
        Self {
            flow: DeviceFlow::new(client),
            cache: TokenCache::new(),
        }
    }

    /// Shares `cache` with other clients.
    #[must_use]
    pub fn with_cache(mut self, cache: TokenCache) -> Self {
        self.cache = cache;
        self
    }

    /// Returns the token cache.
    #[must_use]
    pub const fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Returns the device flow.
    #[must_use]
    pub const fn flow(&self) -> &DeviceFlow {
        &self.flow
    }

    /// Accounts with cached tokens, most recent first.
    pub async fn accounts(&self) -> Vec<Account> {
        self.cache.accounts().await
    }

    /// Signs `account` out of the local cache.
    pub async fn remove_account(&self, account: &Account) -> bool {
        self.cache.remove(account).await
    }

    /// Returns a token for `account` without user interaction.
    ///
    /// Uses the cached token if it is still valid and covers `scopes`,
    /// otherwise redeems the cached refresh token. Any provider rejection of
    /// the refresh yields [`SilentOutcome::UiRequired`].
    ///
    /// # Errors
    ///
    /// Returns transport and response decoding errors.
    pub async fn acquire_token_silent(
        &self,
        scopes: &Scopes,
        account: &Account,
    ) -> Result<SilentOutcome> {
        let Some(cached) = self.cache.lookup(account).await else {
            debug!(account = %account.username, "No cached token");
            return Ok(SilentOutcome::UiRequired);
        };

        if !cached.is_expired() && scopes.is_covered_by(&cached.scopes) {
            debug!(account = %account.username, "Using cached access token");
            return Ok(SilentOutcome::Token(cached));
        }

        let Some(refresh_token) = cached.refresh_token.as_deref() else {
            debug!(account = %account.username, "Cached token unusable and no refresh token");
            return Ok(SilentOutcome::UiRequired);
        };

        match self.flow.client().refresh_token(refresh_token, scopes).await {
            Ok(mut token) => {
                if token.account.is_none() {
                    token.account = Some(account.clone());
                }
                self.cache.store(&token).await;
                info!(account = %account.username, "Refreshed access token");
                Ok(SilentOutcome::Token(token))
            }
            Err(Error::Provider { code, .. }) => {
                debug!(%code, "Refresh token rejected");
                Ok(SilentOutcome::UiRequired)
            }
            Err(e) => Err(e),
        }
    }

    /// Runs one device code flow and caches the resulting token.
    ///
    /// # Errors
    ///
    /// See [`DeviceFlow::authorize`].
    pub async fn acquire_token_with_device_code<F>(
        &self,
        scopes: &Scopes,
        notify: F,
        cancel: CancellationToken,
    ) -> Result<TokenOutcome>
    where
        F: FnOnce(&str),
    {
        let outcome = self.flow.authorize(scopes, notify, cancel).await?;
        if let Some(token) = outcome.token() {
            self.cache.store(token).await;
        }
        Ok(outcome)
    }

    /// Returns a token from the cache if possible, otherwise signs the user
    /// in with the device code flow.
    ///
    /// `notify` is only called when the device code flow runs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty scope set,
    /// [`Error::Provider`] if the provider rejects the sign-in, and transport
    /// errors. Expiry and cancellation are [`TokenOutcome`] variants.
    pub async fn acquire_token<F>(
        &self,
        scopes: &Scopes,
        notify: F,
        cancel: CancellationToken,
    ) -> Result<TokenOutcome>
    where
        F: FnOnce(&str),
    {
        if scopes.is_empty() {
            return Err(Error::Config("no scopes requested".into()));
        }

        if let Some(account) = self.cache.accounts().await.into_iter().next() {
            if let SilentOutcome::Token(token) = self.acquire_token_silent(scopes, &account).await? {
                return Ok(TokenOutcome::Succeeded(token));
            }
            debug!(account = %account.username, "Silent acquisition failed, falling back to device code");
        }

        self.acquire_token_with_device_code(scopes, notify, cancel)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::authority::Authority;
    use chrono::{Duration, Utc};

    fn account() -> Account {
        Account {
            home_account_id: "o.t".into(),
            username: "adele@contoso.com".into(),
            tenant_id: Some("t".into()),
            name: None,
        }
    }

    fn client() -> PublicClient {
        // Unroutable endpoints: these tests must never reach the network.
        let authority = Authority::from_authority_url("http://localhost:9/tenant").unwrap();
        PublicClient::new(OAuthClient::new("client", authority))
    }

    #[tokio::test]
    async fn test_silent_uses_valid_cached_token() {
        let client = client();
        let token = Token::new("cached")
            .with_expires_at(Utc::now() + Duration::hours(1))
            .with_scopes(&["User.Read"])
            .with_account(account());
        client.cache().store(&token).await;

        let outcome = client
            .acquire_token_silent(&Scopes::new(["user.read"]), &account())
            .await
            .unwrap();
        assert!(matches!(outcome, SilentOutcome::Token(t) if t.access_token == "cached"));
    }

    #[tokio::test]
    async fn test_silent_miss_without_cache_entry() {
        let outcome = client()
            .acquire_token_silent(&Scopes::new(["user.read"]), &account())
            .await
            .unwrap();
        assert!(matches!(outcome, SilentOutcome::UiRequired));
    }

    #[tokio::test]
    async fn test_silent_expired_without_refresh_token() {
        let client = client();
        let token = Token::new("old")
            .with_expires_at(Utc::now() - Duration::hours(1))
            .with_scopes(&["User.Read"])
            .with_account(account());
        client.cache().store(&token).await;

        let outcome = client
            .acquire_token_silent(&Scopes::new(["user.read"]), &account())
            .await
            .unwrap();
        assert!(matches!(outcome, SilentOutcome::UiRequired));
    }

    #[tokio::test]
    async fn test_acquire_token_rejects_empty_scopes() {
        let result = client()
            .acquire_token(&Scopes::new(Vec::<String>::new()), |_| {}, CancellationToken::new())
            .await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_acquire_token_cache_hit_skips_flow() {
        let client = client();
        let token = Token::new("cached")
            .with_expires_at(Utc::now() + Duration::hours(1))
            .with_scopes(&["User.Read"])
            .with_account(account());
        client.cache().store(&token).await;

        let mut notified = false;
        let outcome = client
            .acquire_token(
                &Scopes::new(["user.read"]),
                |_| notified = true,
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.token().unwrap().access_token, "cached");
        assert!(!notified);
    }

    #[tokio::test]
    async fn test_remove_account() {
        let client = client();
        client
            .cache()
            .store(&Token::new("x").with_account(account()))
            .await;
        assert_eq!(client.accounts().await.len(), 1);
        assert!(client.remove_account(&account()).await);
        assert!(client.accounts().await.is_empty());
    }
}
