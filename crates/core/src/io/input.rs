use tokio::sync::mpsc;

use crate::types::RawBatteryEvent;

/// Input channel sender. Event sources push battery events here.
pub type InputSender = mpsc::Sender<RawBatteryEvent>;
/// Input channel receiver. The session consumes from here, in order.
pub type InputReceiver = mpsc::Receiver<RawBatteryEvent>;

/// Create an input channel with the given buffer size.
pub fn channel(buffer: usize) -> (InputSender, InputReceiver) {
    mpsc::channel(buffer)
}
