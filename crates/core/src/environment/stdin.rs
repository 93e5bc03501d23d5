use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

use crate::io::input::InputSender;
use crate::types::RawBatteryEvent;

/// Forward newline-delimited JSON events (`{"status":2,"level":50,"scale":100}`)
/// from `reader` into the input channel.
///
/// Blank lines are skipped, malformed lines logged and skipped. Returns the
/// number of events forwarded once the reader hits EOF, the receiver goes
/// away, or `token` is cancelled.
pub async fn forward_lines<R>(reader: R, tx: InputSender, token: CancellationToken) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;

    loop {
        let line = tokio::select! {
            _ = token.cancelled() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "event input read failed");
                break;
            }
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let event: RawBatteryEvent = match serde_json::from_str(text) {
            Ok(ev) => ev,
            Err(e) => {
                tracing::warn!(error = %e, line = text, "malformed battery event skipped");
                continue;
            }
        };
        if tx.send(event).await.is_err() {
            break;
        }
        forwarded += 1;
    }

    tracing::debug!(forwarded, "event input finished");
    forwarded
}
