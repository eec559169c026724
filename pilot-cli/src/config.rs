//! Configuration module
//!
//! Handles CLI configuration: where the coordinator lives.

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the coordinator service
    pub coordinator_url: String,
}
