/// Configuration for the resolution core
use crate::error::{AuthsError, AuthsResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Resolver configuration
///
/// Controls which forge API endpoints the adapters talk to and how long
/// resolution results stay cached. Every field has a working default, so
/// `ResolverConfig::default()` is usable without any environment setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// GitHub REST API base URL (override for self-hosted / test mocks)
    pub github_api_base: String,
    /// Self-hosted Gitea instance hostname (e.g. "git.example.org")
    pub gitea_host: String,
    /// Gitea REST API base URL
    pub gitea_api_base: String,
    /// User-Agent header for all outbound requests
    pub user_agent: String,
    /// Per-request HTTP timeout in seconds
    pub http_timeout_secs: u64,
    /// Cache TTL for resolution results in seconds
    pub cache_ttl_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            github_api_base: "https://api.github.com".to_string(),
            gitea_host: "gitea.example.org".to_string(),
            gitea_api_base: "https://gitea.example.org/api/v1".to_string(),
            user_agent: "auths-resolve/0.1".to_string(),
            http_timeout_secs: 10,
            cache_ttl_secs: 60,
        }
    }
}

impl ResolverConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AuthsResult<Self> {
        dotenv::dotenv().ok();

        let defaults = Self::default();

        let gitea_host =
            env::var("AUTHS_GITEA_HOST").unwrap_or_else(|_| defaults.gitea_host.clone());
        let gitea_api_base = env::var("AUTHS_GITEA_API_BASE")
            .unwrap_or_else(|_| format!("https://{}/api/v1", gitea_host));

        let config = Self {
            github_api_base: env::var("AUTHS_GITHUB_API_BASE")
                .unwrap_or_else(|_| defaults.github_api_base.clone()),
            gitea_host,
            gitea_api_base,
            user_agent: env::var("AUTHS_USER_AGENT")
                .unwrap_or_else(|_| defaults.user_agent.clone()),
            http_timeout_secs: env::var("AUTHS_HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| defaults.http_timeout_secs.to_string())
                .parse()
                .unwrap_or(defaults.http_timeout_secs),
            cache_ttl_secs: env::var("AUTHS_CACHE_TTL_SECS")
                .unwrap_or_else(|_| defaults.cache_ttl_secs.to_string())
                .parse()
                .unwrap_or(defaults.cache_ttl_secs),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> AuthsResult<()> {
        if self.github_api_base.is_empty() {
            return Err(AuthsError::Config(
                "GitHub API base URL cannot be empty".to_string(),
            ));
        }
        if self.http_timeout_secs == 0 {
            return Err(AuthsError::Config(
                "HTTP timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// HTTP timeout as a Duration
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Cache TTL as a Duration
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
