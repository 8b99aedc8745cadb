use crate::app_config::{AppConfig, BackoffStrategy};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        parse_flag(&raw).ok_or_else(|| invalid(var, format!("expected true or false, got '{raw}'")))
    };

    let log_level = or_default("LISTHARVEST_LOG_LEVEL", "info");
    let coordinates_path = PathBuf::from(or_default(
        "LISTHARVEST_COORDINATES_PATH",
        "./coordinates.txt",
    ));
    let output_dir = PathBuf::from(or_default("LISTHARVEST_OUTPUT_DIR", "./outputs"));
    let profile = or_default("LISTHARVEST_PROFILE", "snappfood");
    let base_url = lookup("LISTHARVEST_BASE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty());

    let request_timeout_secs = parse_u64("LISTHARVEST_REQUEST_TIMEOUT_SECS", "30")?;
    if request_timeout_secs == 0 {
        return Err(invalid(
            "LISTHARVEST_REQUEST_TIMEOUT_SECS",
            "timeout must be greater than zero".to_string(),
        ));
    }

    let throttle_min_secs = parse_u64("LISTHARVEST_THROTTLE_MIN_SECS", "60")?;
    let throttle_max_secs = parse_u64("LISTHARVEST_THROTTLE_MAX_SECS", "120")?;
    if throttle_min_secs > throttle_max_secs {
        return Err(invalid(
            "LISTHARVEST_THROTTLE_MIN_SECS",
            format!("minimum {throttle_min_secs}s exceeds maximum {throttle_max_secs}s"),
        ));
    }

    let backoff_strategy = parse_backoff_strategy(&or_default(
        "LISTHARVEST_BACKOFF_STRATEGY",
        "uniform",
    ))?;
    let backoff_min_secs = parse_u64("LISTHARVEST_BACKOFF_MIN_SECS", "60")?;
    let backoff_max_secs = parse_u64("LISTHARVEST_BACKOFF_MAX_SECS", "120")?;
    if backoff_min_secs > backoff_max_secs {
        return Err(invalid(
            "LISTHARVEST_BACKOFF_MIN_SECS",
            format!("minimum {backoff_min_secs}s exceeds maximum {backoff_max_secs}s"),
        ));
    }
    let backoff_base_secs = parse_u64("LISTHARVEST_BACKOFF_BASE_SECS", "5")?;
    let backoff_cap_secs = parse_u64("LISTHARVEST_BACKOFF_CAP_SECS", "600")?;

    let max_retries = parse_max_retries(&or_default("LISTHARVEST_MAX_RETRIES", "10"))?;
    let rotate_user_agent = parse_bool("LISTHARVEST_ROTATE_USER_AGENT", "false")?;
    let resume = parse_bool("LISTHARVEST_RESUME", "true")?;

    Ok(AppConfig {
        log_level,
        coordinates_path,
        output_dir,
        profile,
        base_url,
        request_timeout_secs,
        throttle_min_secs,
        throttle_max_secs,
        backoff_strategy,
        backoff_min_secs,
        backoff_max_secs,
        backoff_base_secs,
        backoff_cap_secs,
        max_retries,
        rotate_user_agent,
        resume,
    })
}

/// Parse a string into a `BackoffStrategy` variant.
///
/// Returns `ConfigError::InvalidEnvVar` for unrecognized values.
fn parse_backoff_strategy(s: &str) -> Result<BackoffStrategy, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "uniform" => Ok(BackoffStrategy::Uniform),
        "exponential" => Ok(BackoffStrategy::Exponential),
        other => Err(ConfigError::InvalidEnvVar {
            var: "LISTHARVEST_BACKOFF_STRATEGY".to_string(),
            reason: format!("unknown strategy '{other}'; expected uniform or exponential"),
        }),
    }
}

/// `unbounded` (or `none`) lifts the ceiling; anything else must be a `u32`.
fn parse_max_retries(s: &str) -> Result<Option<u32>, ConfigError> {
    let trimmed = s.trim();
    if trimmed.eq_ignore_ascii_case("unbounded") || trimmed.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    trimmed
        .parse::<u32>()
        .map(Some)
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: "LISTHARVEST_MAX_RETRIES".to_string(),
            reason: e.to_string(),
        })
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
