use super::*;

// =============================================================================
// env_parse — unique env var names per test
// =============================================================================

#[test]
fn env_parse_reads_value() {
    let key = "__TEST_WC_PARSE_OK_4411__";
    unsafe { std::env::set_var(key, "42") };
    assert_eq!(env_parse::<usize>(key, 7), 42);
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_parse_trims_whitespace() {
    let key = "__TEST_WC_PARSE_WS_4412__";
    unsafe { std::env::set_var(key, "  9000 ") };
    assert_eq!(env_parse::<u64>(key, 1), 9000);
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_parse_invalid_falls_back_to_default() {
    let key = "__TEST_WC_PARSE_BAD_4413__";
    unsafe { std::env::set_var(key, "six") };
    assert_eq!(env_parse::<usize>(key, 6), 6);
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_parse_unset_falls_back_to_default() {
    assert_eq!(env_parse::<u16>("__TEST_WC_SURELY_UNSET_4414__", 3000), 3000);
}

// =============================================================================
// MatchConfig
// =============================================================================

#[test]
fn match_config_defaults() {
    let config = MatchConfig::default();
    assert_eq!(config.max_group_size, 6);
    assert_eq!(config.min_group_size, 3);
    assert_eq!(config.max_wait_for_full_group, Duration::from_secs(180));
    assert_eq!(config.inactivity_timeout, Duration::from_secs(11));
    assert_eq!(config.chat_base_url, "https://talky.io");
    assert!(config.validate().is_ok());
}

#[test]
fn validate_rejects_zero_minimum() {
    let config = MatchConfig { min_group_size: 0, ..MatchConfig::default() };
    assert_eq!(config.validate(), Err(ConfigError::InvalidGroupSizes { min: 0, max: 6 }));
}

#[test]
fn validate_rejects_minimum_above_maximum() {
    let config = MatchConfig { min_group_size: 4, max_group_size: 3, ..MatchConfig::default() };
    assert!(matches!(config.validate(), Err(ConfigError::InvalidGroupSizes { min: 4, max: 3 })));
}

#[test]
fn validate_accepts_equal_sizes() {
    let config = MatchConfig { min_group_size: 2, max_group_size: 2, ..MatchConfig::default() };
    assert!(config.validate().is_ok());
}

// =============================================================================
// NotificationConfig
// =============================================================================

#[test]
fn notifications_disabled_without_private_key() {
    let config = NotificationConfig::default();
    assert!(!config.enabled());
    assert_eq!(config.cooldown, Duration::from_secs(300));
}

#[test]
fn notifications_enabled_with_private_key() {
    let config = NotificationConfig { private_key: Some("secret".into()), ..NotificationConfig::default() };
    assert!(config.enabled());
}
