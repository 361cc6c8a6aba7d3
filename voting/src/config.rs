//! Session configuration with TOML file support.

use award_utils::{BackoffPolicy, LogFormat};
use serde::{Deserialize, Serialize};

use crate::VotingError;

/// Configuration for one participant or admin client process.
///
/// Can be loaded from a TOML file via [`SessionConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter, e.g. "info" or "debug,award_sync=trace".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Retry policy for individual store calls.
    #[serde(default)]
    pub retry: BackoffPolicy,

    /// Resubscription policy for the live view.
    #[serde(default)]
    pub reconnect: BackoffPolicy,
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl SessionConfig {
    pub fn from_toml_file(path: &str) -> Result<Self, VotingError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| VotingError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, VotingError> {
        toml::from_str(s).map_err(|e| VotingError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, VotingError> {
        toml::to_string_pretty(self).map_err(|e| VotingError::Config(e.to_string()))
    }

    pub fn log_format(&self) -> Result<LogFormat, VotingError> {
        self.log_format
            .parse()
            .map_err(|e| VotingError::Config(format!("{e}")))
    }

    /// Install the global tracing subscriber described by this config.
    pub fn init_logging(&self) -> Result<(), VotingError> {
        award_utils::init_logging(self.log_format()?, &self.log_level);
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            log_level: default_log_level(),
            retry: BackoffPolicy::default(),
            reconnect: BackoffPolicy::default(),
        }
    }
}
