//! Foreground presence indication for a monitoring session.
//!
//! Raised at most once per session, updated in place afterwards, removed when
//! the session ends.

use serde::{Deserialize, Serialize};

use crate::engine::PresenceDirective;
use crate::types::PresenceKind;

/// Secondary line shown under every presence title.
pub const DETAIL_LINE: &str = "タップしてバッテリーの詳細を確認";
/// Tap target: the battery details view.
pub const DETAIL_TARGET: &str = "battery-detail";

pub const CHARGING_TITLE: &str = "充電中です";
pub const STARTING_TITLE: &str = "充電を開始中です";

/// Content of the presence indication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceMessage {
    pub title: String,
    pub detail: String,
    pub target: String,
}

impl PresenceMessage {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            detail: DETAIL_LINE.to_owned(),
            target: DETAIL_TARGET.to_owned(),
        }
    }

    pub fn for_kind(kind: PresenceKind) -> Self {
        match kind {
            PresenceKind::Charging => Self::new(CHARGING_TITLE),
            PresenceKind::Starting => Self::new(STARTING_TITLE),
        }
    }
}

/// Platform side of the presence indication.
pub trait PresenceSurface: Send {
    /// Show the indication, or replace its content if already shown.
    fn create_or_update(&mut self, message: &PresenceMessage);

    fn remove(&mut self);
}

/// Tracks what is currently shown so raise/update/remove stay idempotent.
pub struct PresenceTracker<S: PresenceSurface> {
    surface: S,
    shown: Option<PresenceMessage>,
}

impl<S: PresenceSurface> PresenceTracker<S> {
    pub fn new(surface: S) -> Self {
        Self { surface, shown: None }
    }

    /// Raise the indication unless the session already has it.
    /// Returns the new `active` flag, which is always true.
    pub fn ensure(&mut self, active: bool, message: PresenceMessage) -> bool {
        if !active {
            tracing::info!(title = %message.title, "presence raised");
            self.surface.create_or_update(&message);
            self.shown = Some(message);
        }
        true
    }

    /// Replace the shown message in place. No-op when nothing is shown or
    /// the message is unchanged.
    pub fn update(&mut self, message: PresenceMessage) {
        match &self.shown {
            None => {}
            Some(current) if *current == message => {}
            Some(_) => {
                tracing::info!(title = %message.title, "presence updated");
                self.surface.create_or_update(&message);
                self.shown = Some(message);
            }
        }
    }

    /// Apply a state-machine directive. Returns the new `active` flag.
    pub fn apply(&mut self, active: bool, directive: PresenceDirective) -> bool {
        match directive {
            PresenceDirective::Unchanged => active,
            PresenceDirective::Require { kind, refresh } => {
                let message = PresenceMessage::for_kind(kind);
                if !active {
                    self.ensure(active, message)
                } else {
                    if refresh {
                        self.update(message);
                    }
                    true
                }
            }
        }
    }

    /// Remove the indication if shown.
    pub fn teardown(&mut self) {
        if self.shown.take().is_some() {
            tracing::info!("presence removed");
            self.surface.remove();
        }
    }

    pub fn shown(&self) -> Option<&PresenceMessage> {
        self.shown.as_ref()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Recording {
        calls: Vec<String>,
    }

    impl PresenceSurface for Recording {
        fn create_or_update(&mut self, message: &PresenceMessage) {
            self.calls.push(format!("show:{}", message.title));
        }

        fn remove(&mut self) {
            self.calls.push("remove".into());
        }
    }

    fn tracker() -> PresenceTracker<Recording> {
        PresenceTracker::new(Recording::default())
    }

    #[test]
    fn ensure_raises_once() {
        let mut t = tracker();
        let active = t.ensure(false, PresenceMessage::new(CHARGING_TITLE));
        assert!(active);
        let active = t.ensure(active, PresenceMessage::new(CHARGING_TITLE));
        assert!(active);
        assert_eq!(t.surface().calls, vec!["show:充電中です"]);
    }

    #[test]
    fn ensure_while_active_does_not_replace_message() {
        let mut t = tracker();
        let active = t.ensure(false, PresenceMessage::new(STARTING_TITLE));
        t.ensure(active, PresenceMessage::new(CHARGING_TITLE));
        assert_eq!(t.shown().unwrap().title, STARTING_TITLE);
        assert_eq!(t.surface().calls.len(), 1);
    }

    #[test]
    fn update_replaces_in_place_only_when_different() {
        let mut t = tracker();
        t.ensure(false, PresenceMessage::new(STARTING_TITLE));
        t.update(PresenceMessage::new(CHARGING_TITLE));
        t.update(PresenceMessage::new(CHARGING_TITLE));
        assert_eq!(t.surface().calls, vec!["show:充電を開始中です", "show:充電中です"]);
    }

    #[test]
    fn update_without_presence_is_noop() {
        let mut t = tracker();
        t.update(PresenceMessage::new(CHARGING_TITLE));
        assert!(t.surface().calls.is_empty());
        assert!(t.shown().is_none());
    }

    #[test]
    fn apply_refreshes_only_when_asked() {
        let mut t = tracker();
        let active = t.apply(
            false,
            PresenceDirective::Require { kind: PresenceKind::Starting, refresh: false },
        );
        assert!(active);
        t.apply(active, PresenceDirective::Require { kind: PresenceKind::Charging, refresh: false });
        assert_eq!(t.shown().unwrap().title, STARTING_TITLE);
        t.apply(active, PresenceDirective::Require { kind: PresenceKind::Charging, refresh: true });
        assert_eq!(t.shown().unwrap().title, CHARGING_TITLE);
        assert!(!t.apply(false, PresenceDirective::Unchanged));
    }

    #[test]
    fn teardown_is_idempotent() {
        let mut t = tracker();
        t.teardown();
        assert!(t.surface().calls.is_empty());
        t.ensure(false, PresenceMessage::new(CHARGING_TITLE));
        t.teardown();
        t.teardown();
        assert_eq!(t.surface().calls, vec!["show:充電中です", "remove"]);
    }

    #[test]
    fn message_carries_fixed_detail_and_target() {
        let m = PresenceMessage::for_kind(PresenceKind::Charging);
        assert_eq!(m.detail, DETAIL_LINE);
        assert_eq!(m.target, DETAIL_TARGET);
    }
}
