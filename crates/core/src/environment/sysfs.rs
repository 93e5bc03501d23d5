use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::io::input::InputSender;
use crate::types::{ChargeStatus, RawBatteryEvent};

/// Map a `power_supply/<bat>/status` string to a platform status code.
pub fn status_code(raw: &str) -> i32 {
    let status = match raw.trim() {
        "Charging" => ChargeStatus::Charging,
        "Discharging" => ChargeStatus::Discharging,
        "Not charging" => ChargeStatus::NotCharging,
        "Full" => ChargeStatus::Full,
        _ => ChargeStatus::Unknown,
    };
    status.code()
}

/// Read one event from a battery directory. `capacity` is already a percent,
/// so scale is 100; an unreadable capacity is reported as level -1.
pub async fn read_event(dir: &Path) -> std::io::Result<RawBatteryEvent> {
    let status = tokio::fs::read_to_string(dir.join("status")).await?;
    let level = tokio::fs::read_to_string(dir.join("capacity"))
        .await
        .ok()
        .and_then(|s| s.trim().parse::<i32>().ok())
        .unwrap_or(-1);
    Ok(RawBatteryEvent { status: status_code(&status), level, scale: 100 })
}

/// Polls a Linux battery directory and emits an event whenever the
/// status or level changes.
#[derive(Debug)]
pub struct SysfsPoller {
    dir: PathBuf,
    interval: Duration,
    last: Option<RawBatteryEvent>,
}

impl SysfsPoller {
    pub fn new(dir: impl Into<PathBuf>, interval: Duration) -> Self {
        Self { dir: dir.into(), interval, last: None }
    }

    /// Read once; `Some` only when the reading differs from the last one.
    pub async fn poll_once(&mut self) -> std::io::Result<Option<RawBatteryEvent>> {
        let event = read_event(&self.dir).await?;
        if self.last == Some(event) {
            return Ok(None);
        }
        self.last = Some(event);
        Ok(Some(event))
    }

    /// Poll until cancelled or the receiver goes away.
    pub async fn run(mut self, tx: InputSender, token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tracing::info!(dir = %self.dir.display(), interval_ms = self.interval.as_millis() as u64, "sysfs poller started");

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            match self.poll_once().await {
                Ok(Some(event)) => {
                    tracing::debug!(status = event.status, level = event.level, "battery changed");
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(dir = %self.dir.display(), error = %e, "battery read failed");
                }
            }
        }
    }
}
