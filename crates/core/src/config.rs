use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::Thresholds;

/// Environment variable prefix for every setting.
pub const ENV_PREFIX: &str = "SMART_CHARGING_";

/// Startup configuration problems. Fatal: no session starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing setting: {0}")]
    Missing(&'static str),
    #[error("invalid setting: {0}")]
    Invalid(String),
    #[error("missing sheets credentials (set SMART_CHARGING_SHEETS_TOKEN)")]
    MissingCredentials,
}

/// Where battery events come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSource {
    /// Newline-delimited JSON events on stdin.
    Stdin,
    /// Polling a Linux `power_supply` directory.
    Sysfs,
}

impl std::str::FromStr for EventSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdin" => Ok(Self::Stdin),
            "sysfs" => Ok(Self::Sysfs),
            other => Err(ConfigError::Invalid(format!("unknown event source {other:?}"))),
        }
    }
}

/// All smart-charging parameters. Loaded from `SMART_CHARGING_*` env vars;
/// anything unset keeps its default, anything unparsable is an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeCfg {
    // hysteresis band (%)
    pub upper_limit: u8,
    pub lower_limit: u8,

    // trigger sheets
    pub power_on_sheet_id: String,
    pub power_off_sheet_id: String,
    pub sheet_range: String,

    // channels
    pub event_buffer: usize,
    pub presence_buffer: usize,

    // input
    pub source: EventSource,
    pub battery_path: String,
    pub poll_interval_ms: u64,
}

impl Default for ChargeCfg {
    fn default() -> Self {
        Self {
            upper_limit: 95,
            lower_limit: 90,
            power_on_sheet_id: String::new(),
            power_off_sheet_id: String::new(),
            sheet_range: charge_sheets::http::DEFAULT_RANGE.to_owned(),
            event_buffer: 64,
            presence_buffer: 16,
            source: EventSource::Stdin,
            battery_path: "/sys/class/power_supply/BAT0".to_owned(),
            poll_interval_ms: 5000,
        }
    }
}

impl ChargeCfg {
    /// Load from the process environment, then validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        let map: HashMap<String, String> = std::env::vars()
            .filter_map(|(k, v)| {
                k.strip_prefix(ENV_PREFIX).map(|key| (key.to_ascii_lowercase(), v))
            })
            .collect();
        let cfg = Self::from_map(&map)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build from lower-case keys without the prefix (`upper_limit`, ...).
    /// A key that is present but does not parse is `ConfigError::Invalid`.
    pub fn from_map(m: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let d = Self::default();
        Ok(Self {
            upper_limit: get_or(m, "upper_limit", d.upper_limit)?,
            lower_limit: get_or(m, "lower_limit", d.lower_limit)?,
            power_on_sheet_id: get_or(m, "power_on_sheet_id", d.power_on_sheet_id)?,
            power_off_sheet_id: get_or(m, "power_off_sheet_id", d.power_off_sheet_id)?,
            sheet_range: get_or(m, "sheet_range", d.sheet_range)?,
            event_buffer: get_or(m, "event_buffer", d.event_buffer)?,
            presence_buffer: get_or(m, "presence_buffer", d.presence_buffer)?,
            source: get_or(m, "source", d.source)?,
            battery_path: get_or(m, "battery_path", d.battery_path)?,
            poll_interval_ms: get_or(m, "poll_interval_ms", d.poll_interval_ms)?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.power_on_sheet_id.trim().is_empty() {
            return Err(ConfigError::Missing("POWER_ON_SHEET_ID"));
        }
        if self.power_off_sheet_id.trim().is_empty() {
            return Err(ConfigError::Missing("POWER_OFF_SHEET_ID"));
        }
        self.thresholds()?;
        if self.event_buffer == 0 || self.presence_buffer == 0 {
            return Err(ConfigError::Invalid("channel buffers must be non-zero".into()));
        }
        if self.source == EventSource::Sysfs && self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be non-zero".into()));
        }
        Ok(())
    }

    pub fn thresholds(&self) -> Result<Thresholds, ConfigError> {
        Thresholds::new(self.upper_limit, self.lower_limit)
    }

    pub fn sheet_targets(&self) -> SheetTargets {
        SheetTargets {
            power_on: self.power_on_sheet_id.clone(),
            power_off: self.power_off_sheet_id.clone(),
        }
    }
}

/// The two trigger sheets, one per plug direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTargets {
    pub power_on: String,
    pub power_off: String,
}

fn get_or<T: std::str::FromStr>(
    map: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match map.get(key) {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| {
            ConfigError::Invalid(format!("{ENV_PREFIX}{}={v:?}", key.to_ascii_uppercase()))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn with_sheets() -> HashMap<String, String> {
        map(&[("power_on_sheet_id", "on-id"), ("power_off_sheet_id", "off-id")])
    }

    #[test]
    fn defaults_use_95_90_band() {
        let cfg = ChargeCfg::default();
        assert_eq!(cfg.upper_limit, 95);
        assert_eq!(cfg.lower_limit, 90);
        assert_eq!(cfg.sheet_range, "sheet!A1");
        assert_eq!(cfg.source, EventSource::Stdin);
    }

    #[test]
    fn missing_sheet_ids_fail_validation() {
        let cfg = ChargeCfg::default();
        assert_eq!(cfg.validate(), Err(ConfigError::Missing("POWER_ON_SHEET_ID")));

        let cfg = ChargeCfg::from_map(&map(&[("power_on_sheet_id", "on-id")])).unwrap();
        assert_eq!(cfg.validate(), Err(ConfigError::Missing("POWER_OFF_SHEET_ID")));
    }

    #[test]
    fn from_map_overrides_and_keeps_defaults() {
        let mut m = with_sheets();
        m.insert("upper_limit".into(), "80".into());
        m.insert("source".into(), "SYSFS".into());
        let cfg = ChargeCfg::from_map(&m).unwrap();
        assert_eq!(cfg.upper_limit, 80);
        assert_eq!(cfg.lower_limit, 90);
        assert_eq!(cfg.source, EventSource::Sysfs);
        assert_eq!(cfg.sheet_targets().power_on, "on-id");
    }

    #[test]
    fn unknown_source_is_rejected() {
        let mut m = with_sheets();
        m.insert("source".into(), "sysfss".into());
        let err = ChargeCfg::from_map(&m).unwrap_err();
        assert_eq!(err, ConfigError::Invalid("SMART_CHARGING_SOURCE=\"sysfss\"".into()));
    }

    #[test]
    fn unparsable_limits_are_rejected() {
        for (key, value) in [("upper_limit", "300"), ("lower_limit", "not-a-number")] {
            let mut m = with_sheets();
            m.insert(key.into(), value.into());
            let Err(ConfigError::Invalid(msg)) = ChargeCfg::from_map(&m) else {
                panic!("{key}={value} should be rejected");
            };
            assert!(msg.contains(&key.to_ascii_uppercase()), "{msg}");
        }
    }

    #[test]
    fn upper_above_100_fails_validation() {
        let mut m = with_sheets();
        m.insert("upper_limit".into(), "150".into());
        let cfg = ChargeCfg::from_map(&m).unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn inverted_band_is_invalid() {
        let mut m = with_sheets();
        m.insert("upper_limit".into(), "85".into());
        let cfg = ChargeCfg::from_map(&m).unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_buffer_is_invalid() {
        let mut m = with_sheets();
        m.insert("event_buffer".into(), "0".into());
        assert!(ChargeCfg::from_map(&m).unwrap().validate().is_err());
    }

    #[test]
    fn valid_config_passes() {
        let cfg = ChargeCfg::from_map(&with_sheets()).unwrap();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.thresholds().unwrap(), Thresholds::default());
    }
}
