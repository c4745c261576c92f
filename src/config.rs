use std::env;

use anyhow::{bail, Result};

/// Deployment settings, read once from the environment at startup
#[derive(Debug, Clone)]
pub struct Settings {
    /// Platform API host, with or without a scheme
    pub api_host: String,
    /// Bearer token; the platform rejects writes without one, reads of
    /// public data may work with an empty token
    pub api_token: String,
    /// Companion web service notified after uploads; sync is skipped when
    /// unset
    pub sync_url: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Settings> {
        let Ok(api_host) = env::var("SEQFERRY_API_HOST") else {
            bail!("SEQFERRY_API_HOST must be set");
        };
        if api_host.is_empty() {
            bail!("SEQFERRY_API_HOST must not be empty");
        }
        let api_token = env::var("SEQFERRY_API_TOKEN").unwrap_or_default();
        let sync_url = env::var("SEQFERRY_SYNC_URL").ok().filter(|s| !s.is_empty());
        Ok(Settings {
            api_host,
            api_token,
            sync_url,
        })
    }

    /// Base URL for API requests; bare hostnames get https
    pub fn api_base(&self) -> String {
        if self.api_host.contains("://") {
            self.api_host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", self.api_host)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_gets_https_scheme() {
        let settings = Settings {
            api_host: "sequences.example.org".to_string(),
            api_token: String::new(),
            sync_url: None,
        };
        assert_eq!(settings.api_base(), "https://sequences.example.org");
    }

    #[test]
    fn explicit_scheme_is_kept() {
        let settings = Settings {
            api_host: "http://127.0.0.1:9000/".to_string(),
            api_token: String::new(),
            sync_url: None,
        };
        assert_eq!(settings.api_base(), "http://127.0.0.1:9000");
    }
}
