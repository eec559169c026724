//! Worker configuration
//!
//! Defines the connection settings, polling intervals and execution limits
//! of a pilot worker. Everything is read from `PILOT_*` environment
//! variables.

use std::time::Duration;

/// Worker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Coordinator base URL (e.g., "http://node-0:8080")
    pub coordinator_url: String,

    /// Worker kind, used to route tagged tasks
    pub kind: String,

    /// Explicit worker name; derived from the batch environment when unset
    pub name: Option<String>,

    /// First delay after an empty poll
    pub poll_interval: Duration,

    /// Upper bound of the empty-poll backoff
    pub max_poll_interval: Duration,

    /// Period of lease renewals; `None` disables the heartbeat task
    pub heartbeat_interval: Option<Duration>,

    /// Maximum time a single task may run
    pub task_timeout: Option<Duration>,

    /// Exit after this many tasks
    pub max_tasks: Option<u64>,

    /// Timeout of each HTTP request to the coordinator
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            coordinator_url: "http://localhost:8080".to_string(),
            kind: "default".to_string(),
            name: None,
            poll_interval: Duration::from_millis(500),
            max_poll_interval: Duration::from_secs(10),
            heartbeat_interval: Some(Duration::from_secs(30)),
            task_timeout: None,
            max_tasks: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - PILOT_COORDINATOR_URL (default: http://localhost:8080)
    /// - PILOT_WORKER_KIND (default: default)
    /// - PILOT_WORKER_NAME (default: derived from the batch job)
    /// - PILOT_POLL_INTERVAL_MS (default: 500)
    /// - PILOT_MAX_POLL_INTERVAL_MS (default: 10000)
    /// - PILOT_HEARTBEAT_SECS (default: 30, 0 disables)
    /// - PILOT_TASK_TIMEOUT_SECS (default: unbounded)
    /// - PILOT_MAX_TASKS (default: unlimited)
    /// - PILOT_REQUEST_TIMEOUT_SECS (default: 30)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let number = |key: &str| -> anyhow::Result<Option<u64>> {
            lookup(key)
                .map(|s| {
                    s.trim()
                        .parse::<u64>()
                        .map_err(|e| anyhow::anyhow!("{} must be a non-negative integer: {}", key, e))
                })
                .transpose()
        };

        let heartbeat_interval = match number("PILOT_HEARTBEAT_SECS")? {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.heartbeat_interval,
        };

        Ok(Self {
            coordinator_url: lookup("PILOT_COORDINATOR_URL").unwrap_or(defaults.coordinator_url),
            kind: lookup("PILOT_WORKER_KIND").unwrap_or(defaults.kind),
            name: lookup("PILOT_WORKER_NAME").filter(|name| !name.trim().is_empty()),
            poll_interval: number("PILOT_POLL_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            max_poll_interval: number("PILOT_MAX_POLL_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_poll_interval),
            heartbeat_interval,
            task_timeout: number("PILOT_TASK_TIMEOUT_SECS")?.map(Duration::from_secs),
            max_tasks: number("PILOT_MAX_TASKS")?,
            request_timeout: number("PILOT_REQUEST_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.kind.trim().is_empty() {
            anyhow::bail!("worker kind cannot be empty");
        }

        if !self.coordinator_url.starts_with("http://")
            && !self.coordinator_url.starts_with("https://")
        {
            anyhow::bail!("coordinator_url must start with http:// or https://");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.max_poll_interval < self.poll_interval {
            anyhow::bail!("max_poll_interval must not be smaller than poll_interval");
        }

        if self.task_timeout.is_some_and(|timeout| timeout.is_zero()) {
            anyhow::bail!("task_timeout must be greater than 0");
        }

        if self.max_tasks == Some(0) {
            anyhow::bail!("max_tasks must be greater than 0");
        }

        if self.request_timeout.is_zero() {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        Ok(())
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
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.coordinator_url, "http://localhost:8080");
        assert_eq!(config.kind, "default");
        assert_eq!(config.name, None);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.heartbeat_interval, Some(Duration::from_secs(30)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_vars() {
        let config = Config::from_lookup(lookup(&[
            ("PILOT_COORDINATOR_URL", "http://node-0:9000"),
            ("PILOT_WORKER_KIND", "gpu"),
            ("PILOT_WORKER_NAME", "gpu.7"),
            ("PILOT_HEARTBEAT_SECS", "0"),
            ("PILOT_TASK_TIMEOUT_SECS", "60"),
            ("PILOT_MAX_TASKS", "3"),
        ]))
        .unwrap();

        assert_eq!(config.kind, "gpu");
        assert_eq!(config.name.as_deref(), Some("gpu.7"));
        assert_eq!(config.heartbeat_interval, None);
        assert_eq!(config.task_timeout, Some(Duration::from_secs(60)));
        assert_eq!(config.max_tasks, Some(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.coordinator_url = "node-0:8080".to_string();
        assert!(config.validate().is_err());
        config.coordinator_url = "http://node-0:8080".to_string();

        config.max_poll_interval = Duration::from_millis(100);
        assert!(config.validate().is_err());
        config.max_poll_interval = Duration::from_secs(10);

        config.max_tasks = Some(0);
        assert!(config.validate().is_err());

        assert!(Config::from_lookup(lookup(&[("PILOT_MAX_TASKS", "many")])).is_err());
    }
}
