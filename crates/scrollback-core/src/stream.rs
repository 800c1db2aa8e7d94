use std::collections::VecDeque;
use std::fmt::Display;

use futures::stream::{self, Stream, StreamExt, TryStreamExt};

use crate::config::ReporterConfig;
use crate::error::ReporterError;
use crate::events::LogEvent;
use crate::merge::Frame;
use crate::reporter::Reporter;

struct State<S> {
    events: S,
    reporter: Reporter,
    pending: VecDeque<Frame>,
    done: bool,
}

/// Drive a [`Reporter`] from an event stream, yielding one frame per slot
/// update.
///
/// The output ends when the input ends. An input error is yielded as
/// [`ReporterError::Upstream`] and terminates the output; frames queued
/// behind it are discarded. Dropping the returned stream drops the input.
pub fn frame_stream<S, E>(
    events: S,
    config: ReporterConfig,
) -> impl Stream<Item = Result<Frame, ReporterError>>
where
    S: Stream<Item = Result<LogEvent, E>>,
    E: Display,
{
    let state = State {
        events: Box::pin(events),
        reporter: Reporter::new(config),
        pending: VecDeque::new(),
        done: false,
    };
    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.pending.pop_front() {
                return Some((Ok(frame), state));
            }
            if state.done {
                return None;
            }
            match state.events.next().await {
                Some(Ok(event)) => state.pending.extend(state.reporter.handle(event)),
                Some(Err(e)) => {
                    state.done = true;
                    state.pending.clear();
                    state.reporter.finish();
                    tracing::debug!(error = %e, "event source failed");
                    return Some((Err(ReporterError::Upstream(e.to_string())), state));
                }
                None => {
                    state.done = true;
                    state.pending.extend(state.reporter.finish());
                }
            }
        }
    })
}

/// Like [`frame_stream`], rendering every frame to its full text.
pub fn frames<S, E>(
    events: S,
    config: ReporterConfig,
) -> impl Stream<Item = Result<String, ReporterError>>
where
    S: Stream<Item = Result<LogEvent, E>>,
    E: Display,
{
    frame_stream(events, config).map_ok(|frame| frame.to_string())
}
