use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn parse_backoff_strategy_uniform() {
    assert_eq!(
        parse_backoff_strategy("uniform").unwrap(),
        BackoffStrategy::Uniform
    );
}

#[test]
fn parse_backoff_strategy_is_case_insensitive() {
    assert_eq!(
        parse_backoff_strategy("Exponential").unwrap(),
        BackoffStrategy::Exponential
    );
}

#[test]
fn parse_backoff_strategy_unknown_fails() {
    let err = parse_backoff_strategy("linear").unwrap_err();
    assert!(
        matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "LISTHARVEST_BACKOFF_STRATEGY")
    );
}

#[test]
fn parse_max_retries_accepts_unbounded() {
    assert_eq!(parse_max_retries("unbounded").unwrap(), None);
    assert_eq!(parse_max_retries("NONE").unwrap(), None);
}

#[test]
fn parse_max_retries_accepts_number() {
    assert_eq!(parse_max_retries(" 7 ").unwrap(), Some(7));
}

#[test]
fn build_app_config_defaults_with_empty_env() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(lookup_from_map(&map));
    assert!(result.is_ok(), "expected Ok, got: {result:?}");
    let cfg = result.unwrap();
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.coordinates_path.to_str(), Some("./coordinates.txt"));
    assert_eq!(cfg.output_dir.to_str(), Some("./outputs"));
    assert_eq!(cfg.profile, "snappfood");
    assert!(cfg.base_url.is_none());
    assert_eq!(cfg.request_timeout_secs, 30);
    assert_eq!(cfg.throttle_min_secs, 60);
    assert_eq!(cfg.throttle_max_secs, 120);
    assert_eq!(cfg.backoff_strategy, BackoffStrategy::Uniform);
    assert_eq!(cfg.backoff_min_secs, 60);
    assert_eq!(cfg.backoff_max_secs, 120);
    assert_eq!(cfg.backoff_base_secs, 5);
    assert_eq!(cfg.backoff_cap_secs, 600);
    assert_eq!(cfg.max_retries, Some(10));
    assert!(!cfg.rotate_user_agent);
    assert!(cfg.resume);
}

#[test]
fn build_app_config_reads_overrides() {
    let mut map = HashMap::new();
    map.insert("LISTHARVEST_PROFILE", "snapp-express");
    map.insert("LISTHARVEST_OUTPUT_DIR", "/tmp/harvest");
    map.insert("LISTHARVEST_BASE_URL", "http://127.0.0.1:8080/vendors-list");
    map.insert("LISTHARVEST_THROTTLE_MIN_SECS", "1");
    map.insert("LISTHARVEST_THROTTLE_MAX_SECS", "2");
    map.insert("LISTHARVEST_BACKOFF_STRATEGY", "exponential");
    map.insert("LISTHARVEST_MAX_RETRIES", "unbounded");
    map.insert("LISTHARVEST_ROTATE_USER_AGENT", "yes");
    map.insert("LISTHARVEST_RESUME", "0");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.profile, "snapp-express");
    assert_eq!(cfg.output_dir.to_str(), Some("/tmp/harvest"));
    assert_eq!(
        cfg.base_url.as_deref(),
        Some("http://127.0.0.1:8080/vendors-list")
    );
    assert_eq!(cfg.throttle_min_secs, 1);
    assert_eq!(cfg.throttle_max_secs, 2);
    assert_eq!(cfg.backoff_strategy, BackoffStrategy::Exponential);
    assert_eq!(cfg.max_retries, None);
    assert!(cfg.rotate_user_agent);
    assert!(!cfg.resume);
}

#[test]
fn build_app_config_fails_with_invalid_timeout() {
    let mut map = HashMap::new();
    map.insert("LISTHARVEST_REQUEST_TIMEOUT_SECS", "not-a-number");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "LISTHARVEST_REQUEST_TIMEOUT_SECS"),
        "expected InvalidEnvVar(LISTHARVEST_REQUEST_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn build_app_config_fails_with_zero_timeout() {
    let mut map = HashMap::new();
    map.insert("LISTHARVEST_REQUEST_TIMEOUT_SECS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "LISTHARVEST_REQUEST_TIMEOUT_SECS"),
        "expected InvalidEnvVar(LISTHARVEST_REQUEST_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn build_app_config_fails_with_inverted_throttle_range() {
    let mut map = HashMap::new();
    map.insert("LISTHARVEST_THROTTLE_MIN_SECS", "90");
    map.insert("LISTHARVEST_THROTTLE_MAX_SECS", "30");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "LISTHARVEST_THROTTLE_MIN_SECS"),
        "expected InvalidEnvVar(LISTHARVEST_THROTTLE_MIN_SECS), got: {result:?}"
    );
}

#[test]
fn build_app_config_fails_with_inverted_backoff_range() {
    let mut map = HashMap::new();
    map.insert("LISTHARVEST_BACKOFF_MIN_SECS", "200");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "LISTHARVEST_BACKOFF_MIN_SECS"),
        "expected InvalidEnvVar(LISTHARVEST_BACKOFF_MIN_SECS), got: {result:?}"
    );
}

#[test]
fn build_app_config_fails_with_invalid_max_retries() {
    let mut map = HashMap::new();
    map.insert("LISTHARVEST_MAX_RETRIES", "-1");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "LISTHARVEST_MAX_RETRIES"),
        "expected InvalidEnvVar(LISTHARVEST_MAX_RETRIES), got: {result:?}"
    );
}

#[test]
fn build_app_config_fails_with_invalid_flag() {
    let mut map = HashMap::new();
    map.insert("LISTHARVEST_RESUME", "maybe");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "LISTHARVEST_RESUME"),
        "expected InvalidEnvVar(LISTHARVEST_RESUME), got: {result:?}"
    );
}

#[test]
fn load_app_config_matches_process_env_after_dotenv() {
    let loaded = load_app_config().expect("process env should hold a valid config");
    let direct = load_app_config_from_env().unwrap();
    assert_eq!(loaded.profile, direct.profile);
    assert_eq!(loaded.output_dir, direct.output_dir);
    assert_eq!(loaded.max_retries, direct.max_retries);
}
