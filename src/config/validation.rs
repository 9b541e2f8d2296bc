//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("irc.host is required")]
    MissingHost,
    #[error("irc.nickname is required")]
    MissingNickname,
    #[error("irc.nickname must not contain spaces, got '{0}'")]
    InvalidNickname(String),
    #[error("irc.channel must start with '#' or '&', got '{0}'")]
    InvalidChannel(String),
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
    #[error("irc.bus_capacity must be greater than zero")]
    ZeroBusCapacity,
    #[error("search.trigger is required")]
    MissingTrigger,
    #[error("dcc.bind_address is not an IP address: {0}")]
    InvalidBindAddress(String),
    #[error("dcc.announce_address is not an IPv4 address: {0}")]
    InvalidAnnounceAddress(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Required fields
    if config.irc.host.trim().is_empty() {
        errors.push(ValidationError::MissingHost);
    }
    let nick = &config.irc.nickname;
    if nick.is_empty() {
        errors.push(ValidationError::MissingNickname);
    } else if nick.contains(char::is_whitespace) {
        errors.push(ValidationError::InvalidNickname(nick.clone()));
    }
    if !config.irc.channel.starts_with(['#', '&']) {
        errors.push(ValidationError::InvalidChannel(config.irc.channel.clone()));
    }
    if config.search.trigger.trim().is_empty() {
        errors.push(ValidationError::MissingTrigger);
    }

    // Timeouts
    for (name, secs) in [
        ("irc.connect_timeout_secs", config.irc.connect_timeout_secs),
        (
            "irc.registration_timeout_secs",
            config.irc.registration_timeout_secs,
        ),
        (
            "search.response_timeout_secs",
            config.search.response_timeout_secs,
        ),
        ("dcc.transfer_timeout_secs", config.dcc.transfer_timeout_secs),
        ("tokens.ttl_secs", config.tokens.ttl_secs),
    ] {
        if secs == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }
    if config.irc.bus_capacity == 0 {
        errors.push(ValidationError::ZeroBusCapacity);
    }

    // Addresses
    if config.dcc.bind_address.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.dcc.bind_address.clone(),
        ));
    }
    let announce = &config.dcc.announce_address;
    if !announce.is_empty() && announce.parse::<Ipv4Addr>().is_err() {
        errors.push(ValidationError::InvalidAnnounceAddress(announce.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_host_fails() {
        let toml = r#"
[irc]
host = ""
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingHost)));
    }

    #[test]
    fn test_nickname_with_space_fails() {
        let toml = r#"
[irc]
nickname = "book worm"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidNickname(_))));
    }

    #[test]
    fn test_all_problems_reported() {
        let toml = r#"
[irc]
channel = "ebooks"
bus_capacity = 0

[search]
response_timeout_secs = 0

[dcc]
announce_address = "::1"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidChannel(_))));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::ZeroTimeout("search.response_timeout_secs"))));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::ZeroBusCapacity)));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidAnnounceAddress(_))));
    }
}
