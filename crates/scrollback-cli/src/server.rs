use std::io::{self, Write};

use anyhow::Result;
use colored::Colorize;
use scrollback_core::events::{Level, LogEvent, Progress, ScriptOutput};
use scrollback_core::format::{format_error, format_warn, install_check_line};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::input::EventResult;
use crate::render::RenderOutcome;

/// One output line for a raw event, or `None` when the event is not shown.
///
/// Server mode skips the merged view: fetch progress gets a short status
/// line, messages are printed by level and debug output is dropped.
pub fn format_event(event: &LogEvent) -> Option<String> {
    match event {
        LogEvent::Progress(
            progress @ (Progress::Fetched { .. } | Progress::FetchingStarted { .. }),
        ) => Some(format!(
            "{} {}",
            progress.status().cyan(),
            progress.pkg_id()?
        )),
        LogEvent::Progress(_) => None,
        LogEvent::Registry(msg) | LogEvent::Link(msg) | LogEvent::Other(msg) => {
            by_level(msg.level, &msg.message)
        }
        LogEvent::Lifecycle(log) => {
            let text = match &log.output {
                ScriptOutput::Line(line) => format!("{} {}: {}", log.pkg_id, log.script, line),
                ScriptOutput::Exit(code) => {
                    format!("{} {}: exited with {}", log.pkg_id, log.script, code)
                }
            };
            by_level(log.level, &text)
        }
        LogEvent::Deprecation(dep) => Some(format_warn(&format!(
            "deprecated {}@{}: {}",
            dep.pkg_name, dep.pkg_version, dep.deprecated
        ))),
        LogEvent::InstallCheck(check) => install_check_line(check),
        LogEvent::Stage(_)
        | LogEvent::Summary
        | LogEvent::Stats(_)
        | LogEvent::Root(_)
        | LogEvent::ManifestSnapshot(_)
        | LogEvent::Unknown => None,
    }
}

fn by_level(level: Level, message: &str) -> Option<String> {
    match level {
        Level::Debug => None,
        Level::Info => Some(message.to_string()),
        Level::Warn => Some(format_warn(message)),
        Level::Error => Some(format_error(message)),
    }
}

/// Spawn the server-mode printer. Same contract as
/// [`crate::render::spawn_renderer`].
pub fn spawn_server() -> (
    mpsc::UnboundedSender<EventResult>,
    JoinHandle<Result<RenderOutcome>>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(async move { print_loop(rx, io::stdout()).await });
    (tx, handle)
}

pub async fn print_loop<W: Write>(
    mut rx: mpsc::UnboundedReceiver<EventResult>,
    mut out: W,
) -> Result<RenderOutcome> {
    while let Some(item) = rx.recv().await {
        match item {
            Ok(event) => {
                if let Some(line) = format_event(&event) {
                    writeln!(out, "{line}")?;
                }
            }
            Err(e) => {
                writeln!(out, "{}", format_error(&e.to_string()))?;
                out.flush()?;
                return Ok(RenderOutcome::Failed);
            }
        }
    }
    out.flush()?;
    Ok(RenderOutcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrollback_core::error::ReporterError;
    use scrollback_core::events::Message;

    fn decode(json: &str) -> LogEvent {
        LogEvent::from_json(json).expect("valid event")
    }

    #[test]
    fn test_fetch_progress_lines() {
        colored::control::set_override(false);
        assert_eq!(
            format_event(&decode(
                r#"{"name":"progress","status":"fetched","pkgId":"registry/foo/1.0.0"}"#
            ))
            .as_deref(),
            Some("fetched registry/foo/1.0.0")
        );
        assert_eq!(
            format_event(&decode(
                r#"{"name":"progress","status":"fetching_started","pkgId":"bar","size":10}"#
            ))
            .as_deref(),
            Some("fetching_started bar")
        );
        assert_eq!(
            format_event(&decode(
                r#"{"name":"progress","status":"resolving_content","pkgId":"bar"}"#
            )),
            None
        );
    }

    #[test]
    fn test_messages_follow_level() {
        colored::control::set_override(false);
        let msg = |level, text: &str| {
            LogEvent::Other(Message {
                level,
                message: text.to_string(),
            })
        };
        assert_eq!(format_event(&msg(Level::Debug, "x")), None);
        assert_eq!(format_event(&msg(Level::Info, "hi")).as_deref(), Some("hi"));
        assert_eq!(
            format_event(&msg(Level::Warn, "careful")).as_deref(),
            Some("WARN careful")
        );
        assert_eq!(
            format_event(&msg(Level::Error, "boom")).as_deref(),
            Some("ERROR boom")
        );
    }

    #[test]
    fn test_internal_events_are_hidden() {
        assert_eq!(format_event(&LogEvent::Summary), None);
        assert_eq!(format_event(&decode(r#"{"name":"stats","added":3}"#)), None);
        assert_eq!(format_event(&LogEvent::Unknown), None);
    }

    #[tokio::test]
    async fn test_print_loop_stops_on_upstream_error() {
        colored::control::set_override(false);
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Ok(decode(r#"{"name":"other","message":"first"}"#)))
            .expect("send");
        tx.send(Err(ReporterError::Upstream("pipe closed".to_string())))
            .expect("send");
        tx.send(Ok(decode(r#"{"name":"other","message":"never"}"#)))
            .expect("send");

        let mut out = Vec::new();
        let outcome = print_loop(rx, &mut out).await.expect("print loop");
        assert_eq!(outcome, RenderOutcome::Failed);
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "first\nERROR pipe closed\n"
        );
    }
}
