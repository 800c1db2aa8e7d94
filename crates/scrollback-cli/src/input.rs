use scrollback_core::error::ReporterError;
use scrollback_core::events::LogEvent;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::UnboundedSender;

/// Item carried from the reader to the render task.
pub type EventResult = Result<LogEvent, ReporterError>;

/// Forward NDJSON events from `reader` until EOF.
///
/// Blank and undecodable lines are skipped. A read failure is forwarded as
/// an upstream error and ends the intake. Returns the number of events sent.
pub async fn forward_events<R>(reader: R, tx: UnboundedSender<EventResult>) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut sent = 0usize;
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match LogEvent::from_json(line) {
                    Ok(event) => {
                        if tx.send(Ok(event)).is_err() {
                            // Renderer is gone; nothing left to feed.
                            break;
                        }
                        sent += 1;
                    }
                    Err(e) => tracing::debug!(error = %e, "skipping malformed event"),
                }
            }
            Ok(None) => break,
            Err(e) => {
                let _ = tx.send(Err(ReporterError::Upstream(format!(
                    "Failed to read events: {e}"
                ))));
                break;
            }
        }
    }
    sent
}
