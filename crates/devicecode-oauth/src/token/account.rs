//! Signed-in account identity taken from the ID token.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

/// A previously authenticated principal.
///
/// Only used as a lookup key into the token cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Account {
    /// Stable identifier: `{oid}.{tid}` for Azure AD, otherwise the subject.
    pub home_account_id: String,
    /// Sign-in name (e.g., `user@contoso.com`).
    pub username: String,
    /// Tenant the account signed in to.
    pub tenant_id: Option<String>,
    /// Display name.
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: Option<String>,
    oid: Option<String>,
    tid: Option<String>,
    preferred_username: Option<String>,
    upn: Option<String>,
    email: Option<String>,
    name: Option<String>,
}

impl Account {
    /// Reads the account from an ID token's claims.
    ///
    /// The signature is not verified: the token came straight from the token
    /// endpoint over TLS and is only used to key the local cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResponse`] if the token is not a JWT or has no
    /// subject or object ID.
    pub fn from_id_token(id_token: &str) -> Result<Self> {
        let payload = id_token
            .split('.')
            .nth(1)
            .ok_or_else(|| Error::InvalidResponse("id_token is not a JWT".into()))?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| Error::InvalidResponse(format!("id_token payload: {e}")))?;
        let claims: IdTokenClaims = serde_json::from_slice(&bytes)?;

        let home_account_id = match (&claims.oid, &claims.tid) {
            (Some(oid), Some(tid)) => format!("{oid}.{tid}"),
            _ => claims
                .oid
                .clone()
                .or_else(|| claims.sub.clone())
                .ok_or_else(|| Error::InvalidResponse("id_token has no subject".into()))?,
        };

        Ok(Self {
            home_account_id,
            username: claims
                .preferred_username
                .or(claims.upn)
                .or(claims.email)
                .unwrap_or_default(),
            tenant_id: claims.tid,
            name: claims.name,
        })
    }
}
