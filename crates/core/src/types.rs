use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Battery charge status as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChargeStatus {
    #[default]
    Unknown,
    Charging,
    Discharging,
    NotCharging,
    Full,
}

impl ChargeStatus {
    /// Map a platform battery-status code. Anything unrecognised is `Unknown`.
    pub fn from_code(code: i32) -> Self {
        match code {
            2 => Self::Charging,
            3 => Self::Discharging,
            4 => Self::NotCharging,
            5 => Self::Full,
            _ => Self::Unknown,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Unknown => 1,
            Self::Charging => 2,
            Self::Discharging => 3,
            Self::NotCharging => 4,
            Self::Full => 5,
        }
    }

    /// Charging and full both count as "on power".
    pub fn is_charging(self) -> bool {
        matches!(self, Self::Charging | Self::Full)
    }
}

/// Battery-change event as delivered by the platform layer.
///
/// `level`/`scale` of -1 mean "not reported".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBatteryEvent {
    pub status: i32,
    #[serde(default = "unreported")]
    pub level: i32,
    #[serde(default = "unreported")]
    pub scale: i32,
}

fn unreported() -> i32 {
    -1
}

impl RawBatteryEvent {
    pub fn new(status: ChargeStatus, level: i32, scale: i32) -> Self {
        Self { status: status.code(), level, scale }
    }
}

/// Normalized battery reading. `percent` is always within 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryReading {
    pub status: ChargeStatus,
    pub level: i32,
    pub scale: i32,
    pub percent: u8,
}

impl BatteryReading {
    pub fn is_charging(&self) -> bool {
        self.status.is_charging()
    }
}

/// Hysteresis band in percent. Invariant: `lower < upper <= 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    upper: u8,
    lower: u8,
}

impl Thresholds {
    pub fn new(upper: u8, lower: u8) -> Result<Self, ConfigError> {
        if upper > 100 {
            return Err(ConfigError::Invalid(format!("upper limit {upper} exceeds 100")));
        }
        if lower >= upper {
            return Err(ConfigError::Invalid(format!(
                "lower limit {lower} must be below upper limit {upper}"
            )));
        }
        Ok(Self { upper, lower })
    }

    pub fn upper(&self) -> u8 {
        self.upper
    }

    pub fn lower(&self) -> u8 {
        self.lower
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { upper: 95, lower: 90 }
    }
}

/// What the state machine wants done to the plug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlugAction {
    None,
    PowerOn,
    PowerOff,
    /// Cut power and end the monitoring session.
    PowerOffAndStopSession,
}

impl PlugAction {
    /// Direction to dispatch, if any.
    pub fn direction(self) -> Option<PowerDirection> {
        match self {
            Self::None => None,
            Self::PowerOn => Some(PowerDirection::On),
            Self::PowerOff | Self::PowerOffAndStopSession => Some(PowerDirection::Off),
        }
    }
}

/// Plug transition direction. Each direction logs to its own sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerDirection {
    On,
    Off,
}

impl PowerDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

/// Which foreground message a session should be showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceKind {
    Charging,
    Starting,
}

/// Per-session mutable state. Discarded (reset) when the session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorState {
    pub previous_status: ChargeStatus,
    /// Whether the presence indication has been raised this session.
    pub active: bool,
}

impl MonitorState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Timestamp layout of the trigger sheets. Must stay byte-compatible with
/// rows already in the sheet.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y年%m月%d日 %H時%M分%S秒";

/// A row appended to a trigger sheet on every plug transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub sheet_id: String,
    pub timestamp: String,
}

impl LogEntry {
    pub fn at<Tz>(sheet_id: impl Into<String>, when: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        Self {
            sheet_id: sheet_id.into(),
            timestamp: when.format(LOG_TIMESTAMP_FORMAT).to_string(),
        }
    }

    /// Entry stamped with the current local time.
    pub fn now(sheet_id: impl Into<String>) -> Self {
        Self::at(sheet_id, &Local::now())
    }

    pub fn row(&self) -> Vec<String> {
        vec![self.timestamp.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn status_codes_match_platform() {
        assert_eq!(ChargeStatus::from_code(1), ChargeStatus::Unknown);
        assert_eq!(ChargeStatus::from_code(2), ChargeStatus::Charging);
        assert_eq!(ChargeStatus::from_code(3), ChargeStatus::Discharging);
        assert_eq!(ChargeStatus::from_code(4), ChargeStatus::NotCharging);
        assert_eq!(ChargeStatus::from_code(5), ChargeStatus::Full);
        assert_eq!(ChargeStatus::from_code(-1), ChargeStatus::Unknown);
        assert_eq!(ChargeStatus::from_code(42), ChargeStatus::Unknown);
        assert_eq!(ChargeStatus::Full.code(), 5);
    }

    #[test]
    fn only_charging_and_full_count_as_charging() {
        assert!(ChargeStatus::Charging.is_charging());
        assert!(ChargeStatus::Full.is_charging());
        assert!(!ChargeStatus::Discharging.is_charging());
        assert!(!ChargeStatus::NotCharging.is_charging());
        assert!(!ChargeStatus::Unknown.is_charging());
    }

    #[test]
    fn thresholds_reject_inverted_band() {
        assert!(Thresholds::new(90, 95).is_err());
        assert!(Thresholds::new(90, 90).is_err());
        assert!(Thresholds::new(101, 90).is_err());
        let t = Thresholds::new(80, 40).unwrap();
        assert_eq!((t.upper(), t.lower()), (80, 40));
        assert_eq!(Thresholds::default(), Thresholds::new(95, 90).unwrap());
    }

    #[test]
    fn stop_action_dispatches_off() {
        assert_eq!(PlugAction::PowerOffAndStopSession.direction(), Some(PowerDirection::Off));
        assert_eq!(PlugAction::PowerOn.direction(), Some(PowerDirection::On));
        assert_eq!(PlugAction::None.direction(), None);
    }

    #[test]
    fn log_entry_timestamp_format() {
        let tz = FixedOffset::east_opt(9 * 3600).unwrap();
        let when = tz.with_ymd_and_hms(2019, 3, 7, 8, 5, 9).unwrap();
        let entry = LogEntry::at("sheet-on", &when);
        assert_eq!(entry.timestamp, "2019年03月07日 08時05分09秒");
        assert_eq!(entry.row(), vec!["2019年03月07日 08時05分09秒".to_owned()]);
    }

    #[test]
    fn raw_event_defaults_missing_level_and_scale() {
        let ev: RawBatteryEvent = serde_json::from_str(r#"{"status":2}"#).unwrap();
        assert_eq!(ev.level, -1);
        assert_eq!(ev.scale, -1);
    }

    #[test]
    fn monitor_state_reset() {
        let mut s = MonitorState { previous_status: ChargeStatus::Full, active: true };
        s.reset();
        assert_eq!(s, MonitorState::default());
        assert_eq!(s.previous_status, ChargeStatus::Unknown);
    }
}
