pub mod app_config;
pub mod config;
pub mod coordinates;

use thiserror::Error;

pub use app_config::{AppConfig, BackoffStrategy};
pub use config::{load_app_config, load_app_config_from_env};
pub use coordinates::{load_coordinates, parse_coordinates, Coordinate};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read coordinates file {path}: {source}")]
    CoordinatesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
