// Runtime configuration, read once from the environment at startup.

use crate::error::{Result, ShellError};
use std::fmt;

pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Clone)]
pub struct Config {
    /// Bearer credential sent with every API call.
    pub auth_token: String,
    /// Base URL of the WorkDocs API, without a trailing slash.
    pub endpoint: String,
    /// Draw progress bars while transferring file bytes.
    pub show_progress: bool,
}

impl Config {
    /// Reads `AUTH_TOKEN` (required), `WORKDOCS_REGION`, `WORKDOCS_ENDPOINT`
    /// and `WORKDOCS_PROGRESS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let auth_token = lookup("AUTH_TOKEN")
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ShellError::Config("AUTH_TOKEN is not set".into()))?;

        let endpoint = match lookup("WORKDOCS_ENDPOINT") {
            Some(url) if !url.trim().is_empty() => url.trim().trim_end_matches('/').to_string(),
            _ => {
                let region = lookup("WORKDOCS_REGION").unwrap_or_else(|| DEFAULT_REGION.into());
                format!("https://workdocs.{}.amazonaws.com", region.trim())
            }
        };

        let show_progress = lookup("WORKDOCS_PROGRESS")
            .unwrap_or_else(|| "true".into())
            .trim()
            .parse::<bool>()
            .map_err(|err| ShellError::Config(format!("invalid WORKDOCS_PROGRESS: {err}")))?;

        Ok(Config {
            auth_token,
            endpoint,
            show_progress,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("auth_token", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("show_progress", &self.show_progress)
            .finish()
    }
}
