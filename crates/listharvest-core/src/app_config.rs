use std::path::PathBuf;

/// How the harvester spaces out retries of a failed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Uniformly random delay between `backoff_min_secs` and `backoff_max_secs`.
    Uniform,
    /// `backoff_base_secs * 2^(attempt-1)` with jitter, capped at `backoff_cap_secs`.
    Exponential,
}

impl std::fmt::Display for BackoffStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackoffStrategy::Uniform => write!(f, "uniform"),
            BackoffStrategy::Exponential => write!(f, "exponential"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub coordinates_path: PathBuf,
    pub output_dir: PathBuf,
    pub profile: String,
    /// Replaces the profile's base URL, e.g. to target a mirror.
    pub base_url: Option<String>,
    pub request_timeout_secs: u64,
    pub throttle_min_secs: u64,
    pub throttle_max_secs: u64,
    pub backoff_strategy: BackoffStrategy,
    pub backoff_min_secs: u64,
    pub backoff_max_secs: u64,
    pub backoff_base_secs: u64,
    pub backoff_cap_secs: u64,
    /// Per-page retry ceiling. `None` retries a failing page forever.
    pub max_retries: Option<u32>,
    pub rotate_user_agent: bool,
    pub resume: bool,
}
