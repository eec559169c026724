//! Worker identity
//!
//! Builds the [`WorkerProcessId`] this process registers under. Inside a
//! Slurm allocation the batch job id and task rank come from the
//! environment, so every pilot of a job gets a distinct, predictable name.

use pilot_core::domain::worker::WorkerProcessId;

use crate::config::Config;

/// Discovers the identity of this worker process from the environment
pub fn discover(config: &Config) -> WorkerProcessId {
    let hostname = hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    from_lookup(config, |key| std::env::var(key).ok(), hostname, std::process::id())
}

fn from_lookup(
    config: &Config,
    lookup: impl Fn(&str) -> Option<String>,
    hostname: String,
    pid: u32,
) -> WorkerProcessId {
    let batch_job_id = lookup("SLURM_JOB_ID")
        .and_then(|id| id.trim().parse::<u64>().ok())
        .unwrap_or(0);

    // Outside a batch step the pid keeps local workers apart
    let rank = lookup("SLURM_PROCID")
        .and_then(|rank| rank.trim().parse::<u64>().ok())
        .unwrap_or(u64::from(pid));

    let name = config
        .name
        .clone()
        .unwrap_or_else(|| format!("{}.{}.{}", config.kind, batch_job_id, rank));

    WorkerProcessId {
        kind: config.kind.clone(),
        name,
        batch_job_id,
        hostname,
        pid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_from_slurm_environment() {
        let config = Config {
            kind: "cpu".to_string(),
            ..Config::default()
        };
        let lookup = |key: &str| match key {
            "SLURM_JOB_ID" => Some("81234".to_string()),
            "SLURM_PROCID" => Some("3".to_string()),
            _ => None,
        };

        let id = from_lookup(&config, lookup, "nid0042".to_string(), 777);
        assert_eq!(id.name, "cpu.81234.3");
        assert_eq!(id.batch_job_id, 81234);
        assert_eq!(id.hostname, "nid0042");
        assert_eq!(id.pid, 777);
    }

    #[test]
    fn test_name_outside_batch_job() {
        let id = from_lookup(&Config::default(), |_| None, "laptop".to_string(), 4242);
        assert_eq!(id.name, "default.0.4242");
        assert_eq!(id.batch_job_id, 0);
    }

    #[test]
    fn test_explicit_name_wins() {
        let config = Config {
            name: Some("head".to_string()),
            ..Config::default()
        };
        let id = from_lookup(&config, |_| Some("12".to_string()), "n1".to_string(), 1);
        assert_eq!(id.name, "head");
        assert_eq!(id.batch_job_id, 12);
    }
}
