//! Coordinator configuration
//!
//! Read from `PILOT_*` environment variables, with defaults suitable for a
//! single batch allocation.

use std::time::Duration;

use crate::state::KindRouting;

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server listens on
    pub bind_addr: String,

    /// Whether task kinds restrict assignment
    pub kind_routing: KindRouting,

    /// Workers silent for longer than this are evicted; `None` disables leases
    pub worker_lease: Option<Duration>,

    /// How often the lease sweeper runs
    pub sweep_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            kind_routing: KindRouting::Strict,
            worker_lease: None,
            sweep_interval: Duration::from_secs(15),
        }
    }
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - PILOT_BIND_ADDR (optional, default: 0.0.0.0:8080)
    /// - PILOT_KIND_ROUTING (optional, `strict` or `off`, default: strict)
    /// - PILOT_WORKER_LEASE_SECS (optional, seconds, unset disables leases)
    /// - PILOT_SWEEP_INTERVAL_SECS (optional, seconds, default: 15)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let bind_addr = lookup("PILOT_BIND_ADDR").unwrap_or(defaults.bind_addr);

        let kind_routing = match lookup("PILOT_KIND_ROUTING") {
            Some(value) => value.parse::<KindRouting>().map_err(anyhow::Error::msg)?,
            None => defaults.kind_routing,
        };

        let worker_lease = parse_secs(&lookup, "PILOT_WORKER_LEASE_SECS")?;
        let sweep_interval =
            parse_secs(&lookup, "PILOT_SWEEP_INTERVAL_SECS")?.unwrap_or(defaults.sweep_interval);

        Ok(Self {
            bind_addr,
            kind_routing,
            worker_lease,
            sweep_interval,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.trim().is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.worker_lease.is_some_and(|lease| lease.is_zero()) {
            anyhow::bail!("worker lease must be greater than 0 (unset it to disable leases)");
        }

        if self.sweep_interval.is_zero() {
            anyhow::bail!("sweep_interval must be greater than 0");
        }

        Ok(())
    }
}

fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> anyhow::Result<Option<Duration>> {
    lookup(key)
        .map(|s| {
            s.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| anyhow::anyhow!("{} must be a number of seconds: {}", key, e))
        })
        .transpose()
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
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.kind_routing, KindRouting::Strict);
        assert_eq!(config.worker_lease, None);
        assert_eq!(config.sweep_interval, Duration::from_secs(15));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_vars() {
        let config = Config::from_lookup(lookup(&[
            ("PILOT_BIND_ADDR", "127.0.0.1:9000"),
            ("PILOT_KIND_ROUTING", "off"),
            ("PILOT_WORKER_LEASE_SECS", "120"),
            ("PILOT_SWEEP_INTERVAL_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.kind_routing, KindRouting::Off);
        assert_eq!(config.worker_lease, Some(Duration::from_secs(120)));
        assert_eq!(config.sweep_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_values() {
        assert!(Config::from_lookup(lookup(&[("PILOT_KIND_ROUTING", "random")])).is_err());
        assert!(Config::from_lookup(lookup(&[("PILOT_WORKER_LEASE_SECS", "soon")])).is_err());

        let err = Config::from_lookup(lookup(&[("PILOT_SWEEP_INTERVAL_SECS", "15s")])).unwrap_err();
        assert!(err.to_string().contains("PILOT_SWEEP_INTERVAL_SECS"));

        let config = Config::from_lookup(lookup(&[("PILOT_WORKER_LEASE_SECS", "0")])).unwrap();
        assert!(config.validate().is_err());
    }
}
