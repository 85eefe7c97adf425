// ABOUTME: Configuration types and parsing for strata.yml.
// ABOUTME: Handles YAML parsing, env var interpolation, and environment overrides.

mod env_value;
mod init;

pub use env_value::EnvValue;
pub use init::init_config;

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::gateway::ConnectionConfig;
use crate::notify::QueueConfig;
use crate::watch::PollConfig;

pub const CONFIG_FILENAME: &str = "strata.yml";
pub const CONFIG_FILENAME_ALT: &str = "strata.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".strata/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub project: String,

    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,

    pub api: ApiSettings,

    #[serde(default)]
    pub queue: Option<QueueSettings>,

    #[serde(default)]
    pub poll: PollSettings,

    #[serde(default)]
    pub monitor: MonitorStrategy,

    #[serde(default)]
    pub comment: Option<String>,

    #[serde(default)]
    pub environments: HashMap<String, EnvironmentOverrides>,
}

/// How operation completion is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStrategy {
    /// Poll the gateway for status.
    #[default]
    Polling,
    /// Consume the asynchronous notification queue.
    Notifications,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    pub endpoint: String,

    #[serde(default)]
    pub token: Option<EnvValue>,

    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl ApiSettings {
    /// Resolve into the gateway connection config, interpolating the token.
    pub fn connection(&self) -> Result<ConnectionConfig> {
        let token = self.token.as_ref().map(|t| t.resolve()).transpose()?;
        Ok(ConnectionConfig {
            endpoint: self.endpoint.clone(),
            token,
            request_timeout: self.request_timeout,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueSettings {
    pub endpoint: String,

    #[serde(default = "default_queue_name")]
    pub queue_name: String,

    #[serde(default = "default_queue_wait", with = "humantime_serde")]
    pub wait: Duration,

    #[serde(default)]
    pub token: Option<EnvValue>,
}

impl QueueSettings {
    pub fn connection(&self) -> Result<QueueConfig> {
        let token = self.token.as_ref().map(|t| t.resolve()).transpose()?;
        Ok(QueueConfig {
            endpoint: self.endpoint.clone(),
            queue_name: self.queue_name.clone(),
            wait: self.wait,
            token,
        })
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PollSettings {
    #[serde(default = "default_poll_initial", with = "humantime_serde")]
    pub initial: Duration,

    #[serde(default = "default_poll_step", with = "humantime_serde")]
    pub step: Duration,

    #[serde(default = "default_poll_cap", with = "humantime_serde")]
    pub cap: Duration,

    #[serde(default = "default_max_checks")]
    pub max_checks: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            initial: default_poll_initial(),
            step: default_poll_step(),
            cap: default_poll_cap(),
            max_checks: default_max_checks(),
        }
    }
}

impl From<PollSettings> for PollConfig {
    fn from(settings: PollSettings) -> Self {
        PollConfig {
            initial: settings.initial,
            step: settings.step,
            cap: settings.cap,
            max_checks: settings.max_checks,
        }
    }
}

/// Per-environment overrides merged over the base config.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EnvironmentOverrides {
    #[serde(default)]
    pub comment: Option<String>,

    #[serde(default)]
    pub api_endpoint: Option<String>,

    #[serde(default)]
    pub queue: Option<QueueSettings>,

    #[serde(default)]
    pub monitor: Option<MonitorStrategy>,
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_queue_name() -> String {
    "strata-events".to_string()
}

fn default_queue_wait() -> Duration {
    Duration::from_secs(20)
}

fn default_poll_initial() -> Duration {
    Duration::from_secs(2)
}

fn default_poll_step() -> Duration {
    Duration::from_secs(2)
}

fn default_poll_cap() -> Duration {
    Duration::from_secs(30)
}

fn default_max_checks() -> u32 {
    400
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Apply per-environment overrides. Environments without an overrides
    /// section just use the base config; the name is still a valid scope.
    pub fn for_environment(&self, name: &str) -> Config {
        let mut merged = self.clone();

        if let Some(overrides) = self.environments.get(name) {
            if let Some(ref comment) = overrides.comment {
                merged.comment = Some(comment.clone());
            }
            if let Some(ref endpoint) = overrides.api_endpoint {
                merged.api.endpoint = endpoint.clone();
            }
            if let Some(ref queue) = overrides.queue {
                merged.queue = Some(queue.clone());
            }
            if let Some(monitor) = overrides.monitor {
                merged.monitor = monitor;
            }
        }

        merged
    }

    pub fn template() -> Self {
        Config {
            project: "my-project".to_string(),
            template_dir: default_template_dir(),
            api: ApiSettings {
                endpoint: "provisioning.example.com:8700".to_string(),
                token: None,
                request_timeout: default_request_timeout(),
            },
            queue: None,
            poll: PollSettings::default(),
            monitor: MonitorStrategy::default(),
            comment: None,
            environments: HashMap::new(),
        }
    }
}
