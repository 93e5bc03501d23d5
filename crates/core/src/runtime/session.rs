use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::dispatch::{DispatchOutcome, PlugDispatcher};
use crate::engine::{self, Decision};
use crate::io::input::InputReceiver;
use crate::presence::{PresenceSurface, PresenceTracker};
use crate::telemetry;
use crate::types::{MonitorState, RawBatteryEvent, Thresholds};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The state machine found nothing left to supervise.
    SelfTerminated,
    /// Stopped from outside via [`SessionHandle::stop`] or a signal.
    Stopped,
    /// The event source closed its end of the input channel.
    InputClosed,
}

/// Result of processing one event.
#[derive(Debug)]
pub struct Processed {
    pub decision: Decision,
    /// Present when the decision asked for a plug transition.
    pub dispatch: Option<DispatchOutcome>,
}

/// Stops a running session from another task.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    token: CancellationToken,
}

impl SessionHandle {
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// One monitoring session. Consumes battery events serially and drives the
/// plug and the presence indication. One-shot: once it has ended, start a
/// new session instead of running this one again.
pub struct MonitorSession<S: PresenceSurface> {
    id: Uuid,
    thresholds: Thresholds,
    state: MonitorState,
    presence: PresenceTracker<S>,
    dispatcher: PlugDispatcher,
    token: CancellationToken,
    processed: u64,
}

impl<S: PresenceSurface> MonitorSession<S> {
    pub fn new(thresholds: Thresholds, dispatcher: PlugDispatcher, surface: S) -> Self {
        Self::with_token(thresholds, dispatcher, surface, CancellationToken::new())
    }

    /// Build a session whose lifetime is tied to `token` (e.g. a child of the
    /// process shutdown token).
    pub fn with_token(
        thresholds: Thresholds,
        dispatcher: PlugDispatcher,
        surface: S,
        token: CancellationToken,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            thresholds,
            state: MonitorState::default(),
            presence: PresenceTracker::new(surface),
            dispatcher,
            token,
            processed: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle { token: self.token.clone() }
    }

    /// Token cancelled when the session ends for any reason. Event sources
    /// watch it to release their subscription.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn presence(&self) -> &PresenceTracker<S> {
        &self.presence
    }

    pub fn dispatcher(&self) -> &PlugDispatcher {
        &self.dispatcher
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Process one event synchronously: normalize, decide, then apply the
    /// presence and plug side effects. Dispatch is spawned, not awaited.
    pub fn process(&mut self, event: RawBatteryEvent) -> Processed {
        let reading = telemetry::normalize_event(&event);
        let prev = self.state.previous_status;
        let decision = engine::observe(&mut self.state, &reading, &self.thresholds);
        self.processed += 1;

        tracing::debug!(
            session = %self.id,
            ?prev,
            status = ?reading.status,
            percent = reading.percent,
            action = ?decision.action,
            stop = decision.stop_session,
            "reading evaluated"
        );

        self.state.active = self.presence.apply(self.state.active, decision.presence);

        let dispatch = decision
            .action
            .direction()
            .map(|direction| self.dispatcher.dispatch(direction, Uuid::new_v4()));

        Processed { decision, dispatch }
    }

    /// Consume events in arrival order until the session ends. On every exit
    /// path presence is removed, the state is reset and the token cancelled.
    /// In-flight dispatches are left to finish on their own.
    pub async fn run(&mut self, mut rx: InputReceiver) -> SessionEnd {
        tracing::info!(
            session = %self.id,
            upper = self.thresholds.upper(),
            lower = self.thresholds.lower(),
            "monitor session started"
        );

        let end = loop {
            let event = tokio::select! {
                biased;
                _ = self.token.cancelled() => break SessionEnd::Stopped,
                event = rx.recv() => event,
            };
            let Some(event) = event else {
                break SessionEnd::InputClosed;
            };
            if self.process(event).decision.stop_session {
                break SessionEnd::SelfTerminated;
            }
        };

        rx.close();
        self.finish(end)
    }

    fn finish(&mut self, end: SessionEnd) -> SessionEnd {
        self.presence.teardown();
        self.state.reset();
        self.token.cancel();
        tracing::info!(session = %self.id, ?end, processed = self.processed, "monitor session ended");
        end
    }
}
