// src/config.rs

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::Error;
use crate::services::keywords::KeywordRule;

pub const DEFAULT_PUSHOVER_ENDPOINT: &str = "https://api.pushover.net/1/messages.json";

/// Destination credentials for the outbound notification call.
#[derive(Debug, Clone)]
pub struct PushoverConfig {
    pub app_key: String,
    pub user_key: String,
    /// Target device name; empty means "all devices".
    pub device: String,
    pub endpoint: String,
}

/// Process-wide configuration. Read once at startup, immutable afterwards;
/// the tracked set and rule list are shared read-only across tasks.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub stream_url: String,
    pub token: String,
    /// Tracked author ids. Account names are resolved to ids before the
    /// watcher starts; we only ever see the ids.
    pub follow: Arc<HashSet<String>>,
    /// Raw keyword patterns, in configured order.
    pub keywords: Vec<String>,
    /// Compiled rules, same order as `keywords`.
    pub rules: Arc<Vec<KeywordRule>>,
    /// Base URL a matched post is linked from, e.g. `https://host/posts`.
    pub post_link_base: String,
    /// No frame within this window counts as a dead connection.
    pub idle_timeout: Duration,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    /// Consecutive transient failures tolerated before giving up.
    pub max_consecutive_failures: u32,
    pub pushover: PushoverConfig,
}

impl WatcherConfig {
    /// Reads and validates configuration from the process environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::build(|name| std::env::var(name).ok())
    }

    fn build(get: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let stream_url = require(&get, "BIRDWATCH_STREAM_URL")?;
        let token = require(&get, "BIRDWATCH_TOKEN")?;

        let follow: HashSet<String> = split_csv(&require(&get, "BIRDWATCH_FOLLOW")?)
            .into_iter()
            .collect();
        if follow.is_empty() {
            return Err(Error::Config(
                "BIRDWATCH_FOLLOW must list at least one account id".into(),
            ));
        }

        let keywords = split_csv(&require(&get, "BIRDWATCH_KEYWORDS")?);
        if keywords.is_empty() {
            return Err(Error::Config(
                "BIRDWATCH_KEYWORDS must list at least one pattern".into(),
            ));
        }
        let rules = KeywordRule::compile_all(&keywords)?;

        let post_link_base = require(&get, "BIRDWATCH_POST_LINK_BASE")?;

        let idle_timeout = secs_or(&get, "BIRDWATCH_IDLE_TIMEOUT_SECS", 90)?;
        let max_consecutive_failures = u32_or(&get, "BIRDWATCH_MAX_FAILURES", 10)?;

        let pushover = PushoverConfig {
            app_key: require(&get, "PUSHOVER_APP_KEY")?,
            user_key: require(&get, "PUSHOVER_USER_KEY")?,
            device: get("PUSHOVER_DEVICE").unwrap_or_default(),
            endpoint: get("PUSHOVER_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_PUSHOVER_ENDPOINT.to_string()),
        };

        Ok(Self {
            stream_url,
            token,
            follow: Arc::new(follow),
            keywords,
            rules: Arc::new(rules),
            post_link_base,
            idle_timeout,
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(300),
            max_consecutive_failures,
            pushover,
        })
    }
}

fn require(get: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String, Error> {
    match get(name) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::Config(format!("{name} is not set"))),
    }
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn secs_or(
    get: &impl Fn(&str) -> Option<String>,
    name: &str,
    default_secs: u64,
) -> Result<Duration, Error> {
    match get(name) {
        Some(v) => v
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| Error::Config(format!("{name} must be a number of seconds, got '{v}'"))),
        None => Ok(Duration::from_secs(default_secs)),
    }
}

fn u32_or(get: &impl Fn(&str) -> Option<String>, name: &str, default: u32) -> Result<u32, Error> {
    match get(name) {
        Some(v) => v
            .trim()
            .parse::<u32>()
            .map_err(|_| Error::Config(format!("{name} must be a number, got '{v}'"))),
        None => Ok(default),
    }
}
