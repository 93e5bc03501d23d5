use tokio::sync::mpsc;

use crate::presence::{PresenceMessage, PresenceSurface};

/// An outbound presence change for the platform layer to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceUpdate {
    Show(PresenceMessage),
    Remove,
}

/// Output channel sender. The session pushes presence changes here.
pub type OutputSender = mpsc::Sender<PresenceUpdate>;
/// Output channel receiver. The platform layer consumes from here.
pub type OutputReceiver = mpsc::Receiver<PresenceUpdate>;

/// Create an output channel with the given buffer size.
pub fn channel(buffer: usize) -> (OutputSender, OutputReceiver) {
    mpsc::channel(buffer)
}

/// Presence surface backed by the output channel. Never blocks the session:
/// an update that does not fit is dropped with a warning.
#[derive(Debug, Clone)]
pub struct ChannelPresence {
    tx: OutputSender,
}

impl ChannelPresence {
    pub fn new(tx: OutputSender) -> Self {
        Self { tx }
    }

    fn push(&self, update: PresenceUpdate) {
        if let Err(e) = self.tx.try_send(update) {
            tracing::warn!(error = %e, "presence update dropped");
        }
    }
}

impl PresenceSurface for ChannelPresence {
    fn create_or_update(&mut self, message: &PresenceMessage) {
        self.push(PresenceUpdate::Show(message.clone()));
    }

    fn remove(&mut self) {
        self.push(PresenceUpdate::Remove);
    }
}
