//! Command line arguments.

use std::path::PathBuf;

use clap::Parser;
use devicecode_oauth::AppConfig;

/// Sign in with a device code and show who you are.
#[derive(Parser, Debug)]
#[command(name = "devicecode", version, about)]
pub struct Cli {
    /// Configuration file (defaults to ./appsettings.json, then the user config directory)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Scope to request instead of the configured ones (repeatable)
    #[arg(short, long = "scope", value_name = "SCOPE")]
    pub scopes: Vec<String>,

    /// Protected resource to call with the access token
    #[arg(long, value_name = "URL")]
    pub resource_url: Option<String>,
}

impl Cli {
    /// Applies command line overrides on top of the loaded configuration.
    pub fn apply(&self, mut config: AppConfig) -> AppConfig {
        if !self.scopes.is_empty() {
            config.scopes.clone_from(&self.scopes);
        }
        if let Some(url) = &self.resource_url {
            config.resource_url.clone_from(url);
        }
        config
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_leave_config_alone() {
        let cli = Cli::try_parse_from(["devicecode"]).unwrap();
        assert!(cli.config.is_none());

        let config = cli.apply(AppConfig::default());
        assert_eq!(config.scopes, ["user.read"]);
        assert_eq!(config.resource_url, "https://graph.microsoft.com/v1.0/me");
    }

    #[test]
    fn test_repeated_scopes_and_resource() {
        let cli = Cli::try_parse_from([
            "devicecode",
            "--config",
            "/tmp/appsettings.json",
            "--scope",
            "user.read",
            "-s",
            "mail.read",
            "--resource-url",
            "https://graph.microsoft.com/v1.0/me/messages",
        ])
        .unwrap();

        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/appsettings.json")));
        let config = cli.apply(AppConfig::default());
        assert_eq!(config.scopes, ["user.read", "mail.read"]);
        assert_eq!(config.resource_url, "https://graph.microsoft.com/v1.0/me/messages");
    }
}
