//! Process configuration from environment variables

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use mgmt_api::{MgmtConfig, PollOptions};
use queue_listener::{ListenerConfig, MAX_WAIT_SECS};
use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value {value:?} for {name}: expected {expected}")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Everything the process needs, loaded once at startup
#[derive(Clone)]
pub struct Config {
    pub server: String,
    pub cloud_mgmt_id: Option<String>,
    pub api_key: String,
    pub queue_url: String,
    /// Parsed but not applied to the kick targets
    pub notified_gateways: Vec<String>,
    pub insecure_tls: bool,
    pub poll_interval: Duration,
    pub task_timeout: Duration,
    pub queue_wait: Duration,
    pub queue_error_backoff: Duration,
    pub startup_report: bool,
    pub wait_for_kick: bool,
}

impl Config {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to resolve variable names
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &'static str| optional(name).ok_or(ConfigError::Missing(name));

        let queue_wait_secs: u64 = parse_number(&lookup, "CPFEEDMAN_QUEUE_WAIT_SECS", 20)?;
        if queue_wait_secs > MAX_WAIT_SECS {
            return Err(ConfigError::Invalid {
                name: "CPFEEDMAN_QUEUE_WAIT_SECS",
                value: queue_wait_secs.to_string(),
                expected: "a number of seconds between 0 and 20",
            });
        }

        Ok(Self {
            server: required("CHECKPOINT_SERVER")?,
            cloud_mgmt_id: optional("CHECKPOINT_CLOUD_MGMT_ID"),
            api_key: required("CHECKPOINT_API_KEY")?,
            queue_url: required("CPFEEDMAN_SQS_ENDPOINT")?,
            notified_gateways: optional("CPFEEDMAN_NOTIFIED_GATEWAYS")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            insecure_tls: env_flag(&lookup, "CHECKPOINT_INSECURE_TLS", false),
            poll_interval: Duration::from_millis(parse_number(
                &lookup,
                "CPFEEDMAN_POLL_INTERVAL_MS",
                1000,
            )?),
            task_timeout: Duration::from_secs(parse_number(
                &lookup,
                "CPFEEDMAN_TASK_TIMEOUT_SECS",
                120,
            )?),
            queue_wait: Duration::from_secs(queue_wait_secs),
            queue_error_backoff: Duration::from_secs(parse_number(
                &lookup,
                "CPFEEDMAN_QUEUE_ERROR_BACKOFF_SECS",
                5,
            )?),
            startup_report: env_flag(&lookup, "CPFEEDMAN_STARTUP_REPORT", true),
            wait_for_kick: env_flag(&lookup, "CPFEEDMAN_WAIT_FOR_KICK", false),
        })
    }

    pub fn mgmt(&self) -> MgmtConfig {
        MgmtConfig::new(&self.server, self.cloud_mgmt_id.as_deref(), self.api_key.clone())
            .insecure_tls(self.insecure_tls)
    }

    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            interval: self.poll_interval,
            timeout: self.task_timeout,
        }
    }

    pub fn listener(&self) -> ListenerConfig {
        ListenerConfig {
            error_backoff: self.queue_error_backoff,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server", &self.server)
            .field("cloud_mgmt_id", &self.cloud_mgmt_id)
            .field("api_key", &"<redacted>")
            .field("queue_url", &self.queue_url)
            .field("notified_gateways", &self.notified_gateways)
            .field("insecure_tls", &self.insecure_tls)
            .field("poll_interval", &self.poll_interval)
            .field("task_timeout", &self.task_timeout)
            .field("queue_wait", &self.queue_wait)
            .field("queue_error_backoff", &self.queue_error_backoff)
            .field("startup_report", &self.startup_report)
            .field("wait_for_kick", &self.wait_for_kick)
            .finish()
    }
}

fn env_flag<F>(lookup: &F, name: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        None => default,
    }
}

fn parse_number<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name).map(|v| v.trim().to_string()) {
        Some(raw) if !raw.is_empty() => raw.parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
            expected: "a non-negative integer",
        }),
        _ => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
