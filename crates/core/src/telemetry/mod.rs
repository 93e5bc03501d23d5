//! Raw battery-change events → normalized readings.

use crate::types::{BatteryReading, ChargeStatus, RawBatteryEvent};

/// Percent assumed when level or scale is missing. Reading as full biases
/// toward cutting power rather than overcharging.
pub const UNREPORTED_PERCENT: u8 = 100;

/// Normalize a raw event. Never fails.
///
/// A negative level, or a scale that is negative or zero, resolves to
/// [`UNREPORTED_PERCENT`]. Otherwise percent is `round(level / scale * 100)`,
/// clamped to 0..=100.
pub fn normalize(raw_status: i32, raw_level: i32, raw_scale: i32) -> BatteryReading {
    BatteryReading {
        status: ChargeStatus::from_code(raw_status),
        level: raw_level,
        scale: raw_scale,
        percent: percent(raw_level, raw_scale),
    }
}

pub fn normalize_event(event: &RawBatteryEvent) -> BatteryReading {
    normalize(event.status, event.level, event.scale)
}

fn percent(level: i32, scale: i32) -> u8 {
    if level < 0 || scale <= 0 {
        return UNREPORTED_PERCENT;
    }
    // half-up rounding in integers: (200l + s) / 2s
    let (level, scale) = (i64::from(level), i64::from(scale));
    let pct = (level * 200 + scale) / (scale * 2);
    pct.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_percentage() {
        let r = normalize(2, 50, 100);
        assert_eq!(r.status, ChargeStatus::Charging);
        assert_eq!(r.percent, 50);
        assert!(r.is_charging());
    }

    #[test]
    fn non_hundred_scale_rounds() {
        // 2/3 = 66.67%
        assert_eq!(normalize(3, 2, 3).percent, 67);
        // 1/3 = 33.33%
        assert_eq!(normalize(3, 1, 3).percent, 33);
        assert_eq!(normalize(3, 189, 200).percent, 95);
    }

    #[test]
    fn unreported_values_default_to_full() {
        assert_eq!(normalize(2, -1, -1).percent, 100);
        assert_eq!(normalize(2, -1, 100).percent, 100);
        assert_eq!(normalize(2, 50, -1).percent, 100);
        assert_eq!(normalize(2, 50, 0).percent, 100);
        assert_eq!(normalize(2, 0, 0).percent, 100);
    }

    #[test]
    fn empty_battery_is_zero() {
        assert_eq!(normalize(3, 0, 100).percent, 0);
    }

    #[test]
    fn level_above_scale_clamps() {
        assert_eq!(normalize(5, 120, 100).percent, 100);
    }

    #[test]
    fn unknown_status_code_is_not_charging() {
        let r = normalize(-1, 40, 100);
        assert_eq!(r.status, ChargeStatus::Unknown);
        assert!(!r.is_charging());
    }

    #[test]
    fn event_wrapper_matches() {
        let ev = RawBatteryEvent::new(ChargeStatus::Full, 99, 100);
        assert_eq!(normalize_event(&ev), normalize(5, 99, 100));
    }
}
