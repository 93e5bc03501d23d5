//! Plug action dispatcher.
//!
//! Each plug transition appends one timestamped row to the trigger sheet for
//! its direction. Appends run as detached tasks so the event loop never
//! waits on the network. At most one append per direction is in flight; a
//! second request for a busy direction is dropped, not queued. Failures are
//! logged and counted, never retried.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use charge_sheets::sink::{RowAppender, TransportError};
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::config::SheetTargets;
use crate::types::{LogEntry, PowerDirection};

/// Result of asking for a dispatch.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// An append task was spawned.
    Started(JoinHandle<Result<(), TransportError>>),
    /// The direction already had an append in flight; nothing was started.
    Coalesced,
}

/// Clears the direction's in-flight flag when the append task finishes,
/// whether it succeeded, failed or panicked.
struct InFlightSlot(Arc<AtomicBool>);

impl InFlightSlot {
    fn claim(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag.clone()))
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct PlugDispatcher {
    appender: Arc<dyn RowAppender>,
    targets: SheetTargets,
    on_in_flight: Arc<AtomicBool>,
    off_in_flight: Arc<AtomicBool>,
    failures: Arc<AtomicU64>,
    tasks: TaskTracker,
}

impl PlugDispatcher {
    pub fn new(appender: Arc<dyn RowAppender>, targets: SheetTargets) -> Self {
        Self {
            appender,
            targets,
            on_in_flight: Arc::new(AtomicBool::new(false)),
            off_in_flight: Arc::new(AtomicBool::new(false)),
            failures: Arc::new(AtomicU64::new(0)),
            tasks: TaskTracker::new(),
        }
    }

    pub fn sheet_for(&self, direction: PowerDirection) -> &str {
        match direction {
            PowerDirection::On => &self.targets.power_on,
            PowerDirection::Off => &self.targets.power_off,
        }
    }

    fn flag(&self, direction: PowerDirection) -> &Arc<AtomicBool> {
        match direction {
            PowerDirection::On => &self.on_in_flight,
            PowerDirection::Off => &self.off_in_flight,
        }
    }

    pub fn is_in_flight(&self, direction: PowerDirection) -> bool {
        self.flag(direction).load(Ordering::Acquire)
    }

    /// Appends that failed since this dispatcher was created.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Wait until neither direction has an append in flight, or `timeout`
    /// passes. Returns true when idle.
    pub async fn settle(&self, timeout: Duration) -> bool {
        // wait() only resolves on a closed tracker; reopen so later
        // dispatches are still tracked.
        self.tasks.close();
        let idle = tokio::time::timeout(timeout, self.tasks.wait()).await.is_ok();
        self.tasks.reopen();
        idle
    }

    /// Append one row for `direction` and wait for the result.
    /// Ignores the in-flight slot; [`dispatch`](Self::dispatch) is the
    /// fire-and-forget entry point.
    pub async fn append(
        &self,
        direction: PowerDirection,
        correlation_id: Uuid,
    ) -> Result<(), TransportError> {
        let entry = LogEntry::now(self.sheet_for(direction));
        append_entry(
            self.appender.as_ref(),
            &entry,
            direction,
            correlation_id,
            &self.failures,
        )
        .await
    }

    /// Spawn an append for `direction` unless one is already running.
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, direction: PowerDirection, correlation_id: Uuid) -> DispatchOutcome {
        let Some(slot) = InFlightSlot::claim(self.flag(direction)) else {
            tracing::warn!(
                direction = direction.as_str(),
                %correlation_id,
                "dispatch already in flight, dropping request"
            );
            return DispatchOutcome::Coalesced;
        };

        let appender = self.appender.clone();
        let failures = self.failures.clone();
        let entry = LogEntry::now(self.sheet_for(direction));
        tracing::info!(
            direction = direction.as_str(),
            %correlation_id,
            sheet_id = %entry.sheet_id,
            "dispatching plug transition"
        );

        let handle = self.tasks.spawn(async move {
            let _slot = slot;
            append_entry(appender.as_ref(), &entry, direction, correlation_id, &failures).await
        });
        DispatchOutcome::Started(handle)
    }
}

async fn append_entry(
    appender: &dyn RowAppender,
    entry: &LogEntry,
    direction: PowerDirection,
    correlation_id: Uuid,
    failures: &AtomicU64,
) -> Result<(), TransportError> {
    match appender.append_row(&entry.sheet_id, entry.row()).await {
        Ok(()) => {
            tracing::info!(
                direction = direction.as_str(),
                %correlation_id,
                appender = appender.name(),
                timestamp = %entry.timestamp,
                "plug transition logged"
            );
            Ok(())
        }
        Err(e) => {
            failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                direction = direction.as_str(),
                %correlation_id,
                appender = appender.name(),
                error = %e,
                "plug transition append failed"
            );
            Err(e)
        }
    }
}
