//! Process configuration read from the environment.
//!
//! All variables are prefixed `GITHUB_STARS_` except `GITHUB_TOKEN`, which
//! follows the usual GitHub convention. Parsing is done by
//! [`Config::from_lookup`] over an arbitrary lookup function, so tests never
//! touch the process environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::notify::DEFAULT_MAXIMUM_USERS;
use crate::scanner::MonitorConfig;

pub const ENV_USER: &str = "GITHUB_STARS_USER";
pub const ENV_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_DIRECTORY: &str = "GITHUB_STARS_DIRECTORY";
pub const ENV_INCLUDE_ARCHIVED: &str = "GITHUB_STARS_INCLUDE_ARCHIVED";
pub const ENV_WEBHOOK_ADDR: &str = "GITHUB_STARS_WEBHOOK_ADDR";
pub const ENV_WEBHOOK_SECRET: &str = "GITHUB_STARS_WEBHOOK_SECRET";
pub const ENV_SLACK_WEBHOOK: &str = "GITHUB_STARS_SLACK_WEBHOOK";
pub const ENV_SLACK_MAX_USERS: &str = "GITHUB_STARS_SLACK_MAX_USERS";
pub const ENV_REPO_INTERVAL_MINS: &str = "GITHUB_STARS_REPO_INTERVAL_MINS";
pub const ENV_STAR_INTERVAL_MINS: &str = "GITHUB_STARS_STAR_INTERVAL_MINS";

/// Default listen address for webhook deliveries.
pub const DEFAULT_WEBHOOK_ADDR: &str = "0.0.0.0:8080";

/// Default interval between repository listings, in minutes.
pub const DEFAULT_REPO_INTERVAL_MINS: u64 = 60;

/// Errors produced while reading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything the binary needs to start.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// User whose repositories are scanned.
    pub user: String,
    pub token: Option<String>,
    /// Directory holding `stargazers.json`.
    pub directory: PathBuf,
    pub include_archived: bool,
    pub webhook_addr: SocketAddr,
    pub webhook_secret: String,
    pub slack_webhook: Option<String>,
    pub slack_max_users: usize,
    pub repo_interval: Duration,
    /// Zero disables the monitor.
    pub star_interval: Duration,
}

// Hand-written so secrets never reach the logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("user", &self.user)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("directory", &self.directory)
            .field("include_archived", &self.include_archived)
            .field("webhook_addr", &self.webhook_addr)
            .field("webhook_secret", &"<redacted>")
            .field("slack_webhook", &self.slack_webhook.as_ref().map(|_| "<redacted>"))
            .field("slack_max_users", &self.slack_max_users)
            .field("repo_interval", &self.repo_interval)
            .field("star_interval", &self.star_interval)
            .finish()
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of a
    /// variable if set. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let repo_interval = minutes(parse_or(
            &get,
            ENV_REPO_INTERVAL_MINS,
            DEFAULT_REPO_INTERVAL_MINS,
        )?);
        if repo_interval.is_zero() {
            return Err(ConfigError::Invalid {
                name: ENV_REPO_INTERVAL_MINS,
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Config {
            user: require(ENV_USER)?,
            token: get(ENV_TOKEN),
            directory: get(ENV_DIRECTORY).map_or_else(|| PathBuf::from("."), PathBuf::from),
            include_archived: parse_bool(&get, ENV_INCLUDE_ARCHIVED)?,
            webhook_addr: match get(ENV_WEBHOOK_ADDR) {
                Some(value) => parse(ENV_WEBHOOK_ADDR, value)?,
                None => parse(ENV_WEBHOOK_ADDR, DEFAULT_WEBHOOK_ADDR.to_string())?,
            },
            webhook_secret: require(ENV_WEBHOOK_SECRET)?,
            slack_webhook: get(ENV_SLACK_WEBHOOK),
            slack_max_users: parse_or(&get, ENV_SLACK_MAX_USERS, DEFAULT_MAXIMUM_USERS)?,
            repo_interval,
            star_interval: minutes(parse_or(&get, ENV_STAR_INTERVAL_MINS, 0)?),
        })
    }

    /// Monitor settings, or `None` when the monitor is disabled.
    pub fn monitor_config(&self) -> Option<MonitorConfig> {
        if self.star_interval.is_zero() {
            return None;
        }
        Some(MonitorConfig {
            repo_interval: self.repo_interval,
            star_interval: self.star_interval,
            include_archived: self.include_archived,
        })
    }
}

fn minutes(mins: u64) -> Duration {
    Duration::from_secs(mins.saturating_mul(60))
}

fn parse<T>(name: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        reason: e.to_string(),
        value,
    })
}

fn parse_or<T>(
    get: impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(name).map_or(Ok(default), |value| parse(name, value))
}

fn parse_bool(
    get: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<bool, ConfigError> {
    let Some(value) = get(name) else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value,
            reason: "expected true or false".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [(ENV_USER, "octocat"), (ENV_WEBHOOK_SECRET, "s3cret")];

    fn with_required(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        REQUIRED.iter().chain(extra).copied().collect()
    }

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(config.user, "octocat");
        assert_eq!(config.webhook_secret, "s3cret");
        assert_eq!(config.token, None);
        assert_eq!(config.directory, PathBuf::from("."));
        assert!(!config.include_archived);
        assert_eq!(config.webhook_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.slack_webhook, None);
        assert_eq!(config.slack_max_users, DEFAULT_MAXIMUM_USERS);
        assert_eq!(config.repo_interval, Duration::from_secs(3600));
        assert_eq!(config.star_interval, Duration::ZERO);
        assert_eq!(config.monitor_config(), None);
    }

    #[test]
    fn every_variable_is_read() {
        let vars = with_required(&[
            (ENV_TOKEN, "ghp_abc"),
            (ENV_DIRECTORY, "/var/lib/stars"),
            (ENV_INCLUDE_ARCHIVED, "true"),
            (ENV_WEBHOOK_ADDR, "127.0.0.1:9000"),
            (ENV_SLACK_WEBHOOK, "https://hooks.slack.com/services/T/B/X"),
            (ENV_SLACK_MAX_USERS, "10"),
            (ENV_REPO_INTERVAL_MINS, "30"),
            (ENV_STAR_INTERVAL_MINS, "5"),
        ]);

        let config = Config::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.token.as_deref(), Some("ghp_abc"));
        assert_eq!(config.directory, PathBuf::from("/var/lib/stars"));
        assert!(config.include_archived);
        assert_eq!(config.webhook_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(
            config.slack_webhook.as_deref(),
            Some("https://hooks.slack.com/services/T/B/X")
        );
        assert_eq!(config.slack_max_users, 10);
        assert_eq!(
            config.monitor_config(),
            Some(MonitorConfig {
                repo_interval: Duration::from_secs(30 * 60),
                star_interval: Duration::from_secs(5 * 60),
                include_archived: true,
            })
        );
    }

    #[test]
    fn missing_user_is_an_error() {
        let err = Config::from_lookup(lookup(&[(ENV_WEBHOOK_SECRET, "s")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing(ENV_USER));
    }

    #[test]
    fn empty_secret_counts_as_missing() {
        let err = Config::from_lookup(lookup(&[(ENV_USER, "u"), (ENV_WEBHOOK_SECRET, "")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::Missing(ENV_WEBHOOK_SECRET));
    }

    #[test]
    fn malformed_values_are_rejected() {
        for (name, value) in [
            (ENV_WEBHOOK_ADDR, "not-an-addr"),
            (ENV_SLACK_MAX_USERS, "-1"),
            (ENV_STAR_INTERVAL_MINS, "soon"),
            (ENV_INCLUDE_ARCHIVED, "maybe"),
        ] {
            let err = Config::from_lookup(lookup(&with_required(&[(name, value)]))).unwrap_err();
            assert!(
                matches!(&err, ConfigError::Invalid { name: n, .. } if *n == name),
                "{name}: {err:?}"
            );
        }
    }

    #[test]
    fn zero_repo_interval_is_rejected() {
        let err = Config::from_lookup(lookup(&with_required(&[(ENV_REPO_INTERVAL_MINS, "0")])))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: ENV_REPO_INTERVAL_MINS, .. }));
    }

    #[test]
    fn debug_redacts_secrets() {
        let vars = with_required(&[(ENV_TOKEN, "ghp_abc")]);
        let config = Config::from_lookup(lookup(&vars)).unwrap();

        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("ghp_abc"));
        assert!(rendered.contains("octocat"));
    }
}
