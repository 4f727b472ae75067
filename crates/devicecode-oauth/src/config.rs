//! Application configuration (`appsettings.json`).

use crate::authority::{Authority, MICROSOFT_INSTANCE};
use crate::client::PublicClient;
use crate::error::{Error, Result};
use crate::flow::OAuthClient;
use crate::scopes::Scopes;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Configuration file name looked up by [`AppConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "appsettings.json";

/// Environment variable overriding `ClientId`.
pub const CLIENT_ID_ENV: &str = "DEVICECODE_CLIENT_ID";

/// Environment variable overriding `Tenant`.
pub const TENANT_ENV: &str = "DEVICECODE_TENANT";

/// Client registration and target resource settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AppConfig {
    /// Cloud instance; `{0}` is replaced with the tenant.
    #[serde(default = "default_instance")]
    pub instance: String,
    /// Tenant ID or domain.
    #[serde(default = "default_tenant")]
    pub tenant: String,
    /// Application (client) ID.
    #[serde(default)]
    pub client_id: String,
    /// Protected resource to call with the token.
    #[serde(default = "default_resource_url")]
    pub resource_url: String,
    /// Scopes to request.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

fn default_instance() -> String {
    format!("{MICROSOFT_INSTANCE}/{{0}}")
}

fn default_tenant() -> String {
    "organizations".to_string()
}

fn default_resource_url() -> String {
    "https://graph.microsoft.com/v1.0/me".to_string()
}

fn default_scopes() -> Vec<String> {
    vec!["user.read".to_string()]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            instance: default_instance(),
            tenant: default_tenant(),
            client_id: String::new(),
            resource_url: default_resource_url(),
            scopes: default_scopes(),
        }
    }
}

impl AppConfig {
    /// Parses configuration JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the JSON is malformed.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("invalid configuration: {e}")))
    }

    /// Reads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&json)
            .map_err(|e| Error::Config(format!("invalid configuration in {}: {e}", path.display())))
    }

    /// Files tried by [`discover`](Self::discover), in order.
    #[must_use]
    pub fn candidate_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
        if let Some(path) = explicit {
            return vec![path.to_path_buf()];
        }
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("devicecode").join(CONFIG_FILE_NAME));
        }
        paths
    }

    /// Loads the first existing configuration file, then applies environment
    /// overrides.
    ///
    /// An explicit path must exist. Without one, a missing file falls back to
    /// defaults so that the environment alone can configure the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a file exists but cannot be parsed, or if
    /// the explicit path cannot be read.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let config = if let Some(path) = explicit {
            Self::from_json_file(path)?
        } else if let Some(path) = Self::candidate_paths(None).into_iter().find(|p| p.is_file()) {
            debug!("Loading configuration from {}", path.display());
            Self::from_json_file(&path)?
        } else {
            debug!("No {CONFIG_FILE_NAME} found, using defaults");
            Self::default()
        };

        Ok(config.with_overrides(
            std::env::var(CLIENT_ID_ENV).ok(),
            std::env::var(TENANT_ENV).ok(),
        ))
    }

    /// Replaces the client ID and tenant when values are given.
    #[must_use]
    pub fn with_overrides(mut self, client_id: Option<String>, tenant: Option<String>) -> Self {
        if let Some(client_id) = client_id.filter(|v| !v.trim().is_empty()) {
            self.client_id = client_id;
        }
        if let Some(tenant) = tenant.filter(|v| !v.trim().is_empty()) {
            self.tenant = tenant;
        }
        self
    }

    /// Authority URL: the instance with the tenant substituted.
    #[must_use]
    pub fn authority_url(&self) -> String {
        let instance = self.instance.trim();
        let tenant = self.tenant.trim();
        if instance.contains("{0}") {
            instance.replace("{0}", tenant)
        } else {
            format!("{}/{tenant}", instance.trim_end_matches('/'))
        }
    }

    /// Checks that every required setting is present and well-formed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::Config(format!(
                "ClientId is not set; add it to {CONFIG_FILE_NAME} or set {CLIENT_ID_ENV}"
            )));
        }
        if self.tenant.trim().is_empty() {
            return Err(Error::Config("Tenant is empty".into()));
        }
        if self.scopes().is_empty() {
            return Err(Error::Config("Scopes is empty".into()));
        }
        self.authority()?;
        self.resource_url()?;
        Ok(())
    }

    /// Identity provider endpoints derived from the authority URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the authority is not a valid https URL.
    pub fn authority(&self) -> Result<Authority> {
        Authority::from_authority_url(&self.authority_url())
    }

    /// Requested scopes.
    #[must_use]
    pub fn scopes(&self) -> Scopes {
        Scopes::new(self.scopes.iter().cloned())
    }

    /// Parsed resource URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `ResourceUrl` is not a URL.
    pub fn resource_url(&self) -> Result<Url> {
        Url::parse(&self.resource_url)
            .map_err(|e| Error::Config(format!("ResourceUrl '{}': {e}", self.resource_url)))
    }

    /// Validates the configuration and builds a client with an empty cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if validation fails.
    pub fn public_client(&self) -> Result<PublicClient> {
        self.validate()?;
        let client = OAuthClient::new(self.client_id.trim(), self.authority()?);
        Ok(PublicClient::new(client))
    }
}
