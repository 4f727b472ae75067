//! In-memory token cache shared by concurrent sign-ins.

use crate::token::{Account, Token};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Tokens keyed by account.
///
/// Cloning is cheap and clones share the same storage. Lookups take a read
/// lock and run concurrently; writes are exclusive, so a reader never sees a
/// half-written entry.
#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    account: Account,
    token: Token,
    order: u64,
}

impl TokenCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts with a cached token, most recently stored first.
    pub async fn accounts(&self) -> Vec<Account> {
        let entries = self.entries.read().await;
        let mut cached: Vec<&CacheEntry> = entries.values().collect();
        cached.sort_by(|a, b| b.order.cmp(&a.order));
        cached.into_iter().map(|e| e.account.clone()).collect()
    }

    /// Returns the cached token for `account`.
    pub async fn lookup(&self, account: &Account) -> Option<Token> {
        self.entries
            .read()
            .await
            .get(&account.home_account_id)
            .map(|e| e.token.clone())
    }

    /// Stores `token` under its account.
    ///
    /// Returns false (and stores nothing) when the token has no account.
    pub async fn store(&self, token: &Token) -> bool {
        let Some(account) = token.account.clone() else {
            debug!("Not caching token without an account");
            return false;
        };

        let mut entries = self.entries.write().await;
        let order = entries.values().map(|e| e.order).max().map_or(0, |o| o + 1);
        debug!(account = %account.username, "Caching token");
        entries.insert(
            account.home_account_id.clone(),
            CacheEntry {
                account,
                token: token.clone(),
                order,
            },
        );
        true
    }

    /// Removes the account and its tokens. Returns true if it was cached.
    pub async fn remove(&self, account: &Account) -> bool {
        self.entries
            .write()
            .await
            .remove(&account.home_account_id)
            .is_some()
    }
}
