//! Charge state machine.
//!
//! Pure decision table over (previous status, reading, thresholds). No I/O.
//! Rules are checked in order; the first match wins:
//!
//! | on power | percent          | previous on power | action             | presence          | session  |
//! |----------|------------------|-------------------|--------------------|-------------------|----------|
//! | yes      | `>= upper`       | any               | `PowerOff`         | -                 | continue |
//! | yes      | `< upper`        | any               | `None`             | charging (refresh if prev off power) | continue |
//! | no       | `< lower`        | yes               | `PowerOffAndStopSession` | -           | stop     |
//! | no       | `< lower`        | no                | `PowerOn`          | starting          | continue |
//! | no       | `>= lower`       | any               | `None`             | -                 | stop     |

use crate::types::{BatteryReading, ChargeStatus, MonitorState, PlugAction, PresenceKind, Thresholds};

/// Presence side effect requested by a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceDirective {
    /// Leave presence as it is.
    Unchanged,
    /// Presence must exist. When `refresh` is set and presence is already up,
    /// its message is replaced with `kind`.
    Require { kind: PresenceKind, refresh: bool },
}

impl PresenceDirective {
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Require { .. })
    }
}

/// Output of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub action: PlugAction,
    pub presence: PresenceDirective,
    /// The session has nothing left to supervise and should end.
    pub stop_session: bool,
    /// Value to store as the previous status. Always the reading's status.
    pub next_status: ChargeStatus,
}

impl Decision {
    pub fn presence_required(&self) -> bool {
        self.presence.is_required()
    }
}

/// Evaluate one reading against the previous status.
pub fn decide(prev: ChargeStatus, reading: &BatteryReading, thresholds: &Thresholds) -> Decision {
    let (action, presence, stop_session) = if reading.is_charging() {
        if reading.percent >= thresholds.upper() {
            (PlugAction::PowerOff, PresenceDirective::Unchanged, false)
        } else {
            let presence = PresenceDirective::Require {
                kind: PresenceKind::Charging,
                refresh: !prev.is_charging(),
            };
            (PlugAction::None, presence, false)
        }
    } else if reading.percent < thresholds.lower() {
        if prev.is_charging() {
            // Power was pulled before reaching the target. Cut the plug and
            // stand down instead of fighting whoever unplugged.
            (PlugAction::PowerOffAndStopSession, PresenceDirective::Unchanged, true)
        } else {
            let presence = PresenceDirective::Require {
                kind: PresenceKind::Starting,
                refresh: false,
            };
            (PlugAction::PowerOn, presence, false)
        }
    } else {
        (PlugAction::None, PresenceDirective::Unchanged, true)
    };

    Decision { action, presence, stop_session, next_status: reading.status }
}

/// Evaluate against the session state and record the reading's status as
/// the new previous status.
pub fn observe(state: &mut MonitorState, reading: &BatteryReading, thresholds: &Thresholds) -> Decision {
    let decision = decide(state.previous_status, reading, thresholds);
    state.previous_status = decision.next_status;
    decision
}
