use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Send the reporter's own diagnostics to `dir/scrollback.YYYY-MM-DD`.
///
/// Stdout carries the rendered install log, so diagnostics only ever go to
/// files, and only when `--log-dir` is given. `SCROLLBACK_LOG` (then
/// `RUST_LOG`) selects what is recorded; without either only warnings are.
///
/// Keep the returned guard alive until exit; dropping it flushes pending
/// records.
pub fn init(dir: &Path) -> WorkerGuard {
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "scrollback"));

    let filter = EnvFilter::try_from_env("SCROLLBACK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .init();

    guard
}
