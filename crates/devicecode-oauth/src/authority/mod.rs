//! Identity provider endpoints.

use crate::error::{Error, Result};
use url::Url;

/// Azure AD cloud instance used when none is configured.
pub const MICROSOFT_INSTANCE: &str = "https://login.microsoftonline.com";

/// Identity provider endpoints for the device authorization grant.
#[derive(Debug, Clone)]
pub struct Authority {
    /// Display name (e.g., "Microsoft").
    pub name: String,
    /// Device authorization endpoint (RFC 8628 §3.1).
    pub device_authorization_url: Option<Url>,
    /// Token endpoint.
    pub token_url: Url,
}

impl Authority {
    /// Creates an authority from explicit endpoint URLs.
    ///
    /// # Errors
    ///
    /// Returns an error if either URL is invalid.
    pub fn new(
        name: impl Into<String>,
        device_authorization_url: impl AsRef<str>,
        token_url: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            device_authorization_url: Some(Url::parse(device_authorization_url.as_ref())?),
            token_url: Url::parse(token_url.as_ref())?,
        })
    }

    /// Azure AD authority for a tenant on the public cloud.
    ///
    /// `tenant` is a tenant ID, a verified domain, or one of
    /// `organizations`/`common`/`consumers`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant is empty or produces an invalid URL.
    pub fn microsoft(tenant: &str) -> Result<Self> {
        let tenant = tenant.trim().trim_matches('/');
        if tenant.is_empty() {
            return Err(Error::Config("tenant is empty".into()));
        }
        Self::from_authority_url(&format!("{MICROSOFT_INSTANCE}/{tenant}"))
    }

    /// Derives the v2.0 endpoints from an authority URL such as
    /// `https://login.microsoftonline.com/contoso.onmicrosoft.com`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL has no tenant path segment, is not
    /// `https` (plain `http` is accepted for loopback hosts only), or fails to parse.
    pub fn from_authority_url(authority: &str) -> Result<Self> {
        let base = Url::parse(authority.trim())
            .map_err(|e| Error::Config(format!("authority '{authority}' is not a URL: {e}")))?;

        match base.scheme() {
            "https" => {}
            "http" if is_loopback(&base) => {}
            other => {
                return Err(Error::Config(format!(
                    "authority must use https, got '{other}'"
                )));
            }
        }

        let tenant_path = base.path().trim_matches('/');
        if tenant_path.is_empty() {
            return Err(Error::Config(format!(
                "authority '{authority}' has no tenant segment"
            )));
        }

        let mut root = base.clone();
        root.set_path(&format!("/{tenant_path}"));
        root.set_query(None);
        root.set_fragment(None);
        let root = root.as_str().trim_end_matches('/').to_string();

        let name = if base.host_str() == Some("login.microsoftonline.com") {
            "Microsoft".to_string()
        } else {
            base.host_str().unwrap_or("custom").to_string()
        };

        Self::new(
            name,
            format!("{root}/oauth2/v2.0/devicecode"),
            format!("{root}/oauth2/v2.0/token"),
        )
    }

    /// Returns the device authorization endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if this authority has no device endpoint.
    pub fn device_authorization_url(&self) -> Result<&Url> {
        self.device_authorization_url.as_ref().ok_or_else(|| {
            Error::Config(format!(
                "Provider {} does not support device flow",
                self.name
            ))
        })
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(domain)) => domain == "localhost",
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_microsoft_authority() {
        let authority = Authority::microsoft("contoso.onmicrosoft.com").unwrap();
        assert_eq!(authority.name, "Microsoft");
        assert_eq!(
            authority.device_authorization_url().unwrap().as_str(),
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/devicecode"
        );
        assert_eq!(
            authority.token_url.as_str(),
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_empty_tenant_rejected() {
        assert!(matches!(
            Authority::microsoft("  "),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_authority_url_trailing_slash() {
        let authority =
            Authority::from_authority_url("https://login.microsoftonline.com/organizations/")
                .unwrap();
        assert_eq!(
            authority.token_url.as_str(),
            "https://login.microsoftonline.com/organizations/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_authority_url_keeps_port() {
        let authority = Authority::from_authority_url("http://localhost:8443/tenant").unwrap();
        assert_eq!(
            authority.token_url.as_str(),
            "http://localhost:8443/tenant/oauth2/v2.0/token"
        );
        assert_eq!(authority.name, "localhost");
    }

    #[test]
    fn test_authority_loopback_ip() {
        let authority = Authority::from_authority_url("http://127.0.0.1:5000/tenant").unwrap();
        assert_eq!(authority.name, "127.0.0.1");
    }

    #[test]
    fn test_authority_rejects_plain_http() {
        let err = Authority::from_authority_url("http://login.example.com/tenant").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_authority_without_tenant() {
        let err = Authority::from_authority_url("https://login.microsoftonline.com").unwrap_err();
        assert!(err.to_string().contains("no tenant segment"));
    }

    #[test]
    fn test_custom_authority() {
        let authority = Authority::new(
            "Custom",
            "https://auth.example.com/device",
            "https://auth.example.com/token",
        )
        .unwrap();
        assert_eq!(authority.name, "Custom");
        assert!(authority.device_authorization_url().is_ok());
    }

    #[test]
    fn test_missing_device_endpoint() {
        let mut authority = Authority::microsoft("contoso").unwrap();
        authority.device_authorization_url = None;
        assert!(matches!(
            authority.device_authorization_url(),
            Err(Error::Config(_))
        ));
    }
}
