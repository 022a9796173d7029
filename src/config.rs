//! Navigation layer configuration.
//!
//! Every section has a `Default` that carries the production defaults, so a
//! bare `NavigationConfig::default()` is a working configuration. Overrides
//! come from YAML (`from_yaml_str` / `from_yaml_file`) and then from
//! `CHECKOUT_NAV_*` environment variables.

use checkout_types::{screens, ValidationStep};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Top-level configuration for the navigation layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub host: HostConfig,
    pub session: SessionConfig,
    pub validation: ValidationConfig,
    pub history: HistoryConfig,
    pub breaker: BreakerConfig,
    pub events: EventConfig,
}

impl NavigationConfig {
    /// Parse a YAML document. Missing keys keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    /// Apply `CHECKOUT_NAV_*` environment overrides on top of this config.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (env in production, a map in tests).
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, "CHECKOUT_NAV_HOST_WAIT_MS")? {
            self.host.wait_timeout_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "CHECKOUT_NAV_SESSION_TTL_SECS")? {
            self.session.ttl_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "CHECKOUT_NAV_SESSION_CAPACITY")? {
            self.session.capacity = v;
        }
        if let Some(v) = parse_var(&lookup, "CHECKOUT_NAV_SESSION_FRESHNESS_SECS")? {
            self.session.freshness_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "CHECKOUT_NAV_SWEEP_INTERVAL_SECS")? {
            self.session.sweep_interval_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "CHECKOUT_NAV_HISTORY_CAPACITY")? {
            self.history.capacity = v;
        }
        if let Some(v) = parse_var(&lookup, "CHECKOUT_NAV_BREAKER_THRESHOLD")? {
            self.breaker.failure_threshold = v;
        }
        if let Some(v) = parse_var(&lookup, "CHECKOUT_NAV_EVENTS_ENABLED")? {
            self.events.enabled = v;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject values that would make a component unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history.capacity == 0 {
            return Err(invalid("history.capacity", "must be at least 1"));
        }
        if self.breaker.failure_threshold == 0 {
            return Err(invalid("breaker.failure_threshold", "must be at least 1"));
        }
        if self.validation.max_states_per_order == 0 {
            return Err(invalid(
                "validation.max_states_per_order",
                "must be at least 1",
            ));
        }
        if self.events.enabled && self.events.buffer_size == 0 {
            return Err(invalid("events.buffer_size", "must be at least 1"));
        }
        if self.events.enabled && self.events.flush_interval_ms == 0 {
            return Err(invalid("events.flush_interval_ms", "must be at least 1"));
        }
        if self.session.sweep_interval_secs == 0 {
            return Err(invalid("session.sweep_interval_secs", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
    }
}

/// Screen host access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// How long the primary strategy waits for the host to be registered.
    pub wait_timeout_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            wait_timeout_ms: 2_500,
        }
    }
}

impl HostConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}

/// Session preservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle time after which a session is unreadable
    pub ttl_secs: u64,
    /// Maximum resident sessions before the oldest quartile is evicted
    pub capacity: usize,
    /// Payload age after which `get` reloads from the order service
    pub freshness_secs: u64,
    /// Interval of the background expiry sweep (sessions and validation states)
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 30 * 60,
            capacity: 100,
            freshness_secs: 5 * 60,
            sweep_interval_secs: 60 * 60,
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// A screen pair watched for skipped validation.
///
/// When the user moves `from` → `to` and `required_step` has no passed
/// validation for the order, the tracker records a bypass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredTransition {
    pub from: String,
    pub to: String,
    pub required_step: ValidationStep,
}

impl MonitoredTransition {
    pub fn new(from: &str, to: &str, required_step: ValidationStep) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            required_step,
        }
    }
}

/// Validation tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Lifetime of a recorded validation state
    pub state_ttl_secs: u64,
    /// States retained per order; oldest evicted first
    pub max_states_per_order: usize,
    /// Screen pairs watched for bypassed validation
    pub monitored_transitions: Vec<MonitoredTransition>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            state_ttl_secs: 2 * 60 * 60,
            max_states_per_order: 10,
            monitored_transitions: vec![
                MonitoredTransition::new(
                    screens::DELIVERY_INFO,
                    screens::ORDER_SUMMARY,
                    ValidationStep::DeliveryInfo,
                ),
                MonitoredTransition::new(
                    screens::ORDER_SUMMARY,
                    screens::PAYMENT_METHOD,
                    ValidationStep::OrderSummary,
                ),
            ],
        }
    }
}

impl ValidationConfig {
    pub fn state_ttl(&self) -> Duration {
        Duration::from_secs(self.state_ttl_secs)
    }
}

/// Back-navigation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: 10 }
    }
}

/// Consecutive-failure circuit breaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
        }
    }
}

/// Structured navigation events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Whether events are emitted at all
    pub enabled: bool,
    /// Channel capacity; events beyond it are dropped, never blocked on
    pub buffer_size: usize,
    /// Maximum events handed to the sink per drain cycle
    pub batch_size: usize,
    /// Interval between drain cycles (milliseconds)
    pub flush_interval_ms: u64,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            buffer_size: 1024,
            batch_size: 100,
            flush_interval_ms: 1000,
        }
    }
}

impl EventConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = NavigationConfig::default();
        assert_eq!(config.host.wait_timeout(), Duration::from_millis(2_500));
        assert_eq!(config.session.ttl(), Duration::from_secs(1800));
        assert_eq!(config.session.capacity, 100);
        assert_eq!(config.session.freshness(), Duration::from_secs(300));
        assert_eq!(config.validation.state_ttl(), Duration::from_secs(7200));
        assert_eq!(config.validation.max_states_per_order, 10);
        assert_eq!(config.history.capacity, 10);
        assert_eq!(config.breaker.failure_threshold, 3);
        assert_eq!(config.validation.monitored_transitions.len(), 2);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
session:
  ttl_secs: 60
breaker:
  failure_threshold: 5
"#;
        let config = NavigationConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.session.ttl_secs, 60);
        assert_eq!(config.session.capacity, 100);
        assert_eq!(config.breaker.failure_threshold, 5);
        assert_eq!(config.history.capacity, 10);
    }

    #[test]
    fn test_monitored_transitions_from_yaml() {
        let yaml = r#"
validation:
  monitored_transitions:
    - from: payment_method
      to: payment_processing
      required_step: payment_method_selection
"#;
        let config = NavigationConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(
            config.validation.monitored_transitions,
            vec![MonitoredTransition::new(
                screens::PAYMENT_METHOD,
                screens::PAYMENT_PROCESSING,
                ValidationStep::PaymentMethodSelection,
            )]
        );
    }

    #[test]
    fn test_zero_history_capacity_rejected() {
        let err = NavigationConfig::from_yaml_str("history:\n  capacity: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "history.capacity"));
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let mut config = NavigationConfig::default();
        config.session.sweep_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = NavigationConfig::default();
        config.events.flush_interval_ms = 0;
        assert!(config.validate().is_err());
        config.events.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_file_loading() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host:\n  wait_timeout_ms: 100").unwrap();
        let config = NavigationConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.host.wait_timeout(), Duration::from_millis(100));
    }

    #[test]
    fn test_overrides_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("CHECKOUT_NAV_HOST_WAIT_MS", "0"),
            ("CHECKOUT_NAV_HISTORY_CAPACITY", "4"),
            ("CHECKOUT_NAV_EVENTS_ENABLED", "false"),
        ]
        .into_iter()
        .collect();
        let config = NavigationConfig::default()
            .with_overrides_from(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.host.wait_timeout_ms, 0);
        assert_eq!(config.history.capacity, 4);
        assert!(!config.events.enabled);
    }

    #[test]
    fn test_unparseable_override_is_an_error() {
        let err = NavigationConfig::default()
            .with_overrides_from(|k| (k == "CHECKOUT_NAV_SESSION_CAPACITY").then(|| "lots".into()))
            .unwrap_err();
        assert!(err.to_string().contains("CHECKOUT_NAV_SESSION_CAPACITY"));
    }
}
