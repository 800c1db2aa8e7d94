use std::io::{self, IsTerminal, Write};
use std::pin::pin;
use std::time::{Duration, Instant};

use anyhow::Result;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use scrollback_core::config::ReporterConfig;
use scrollback_core::format::format_error;
use scrollback_core::merge::Frame;
use scrollback_core::stream::frame_stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::input::EventResult;

/// How a render loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The event source completed and the output was flushed.
    Completed,
    /// The event source failed; the error was rendered as the last line.
    Failed,
}

/// Where frames end up: a scrolling transcript plus one redrawable region.
pub trait Surface {
    /// Print text permanently, above the live region.
    fn commit(&mut self, text: &str) -> io::Result<()>;
    /// Replace the contents of the live region.
    fn redraw(&mut self, live: &str) -> io::Result<()>;
    /// Remove the live region.
    fn clear(&mut self) -> io::Result<()>;
}

/// Interactive terminal: the live region is an indicatif bar drawn in place.
pub struct LiveSurface {
    bar: ProgressBar,
}

impl LiveSurface {
    pub fn stdout() -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout());
        bar.set_style(
            ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Self { bar }
    }
}

impl Surface for LiveSurface {
    fn commit(&mut self, text: &str) -> io::Result<()> {
        self.bar.println(text);
        Ok(())
    }

    fn redraw(&mut self, live: &str) -> io::Result<()> {
        self.bar.set_message(live.to_string());
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        self.bar.finish_and_clear();
        Ok(())
    }
}

/// Pipes and files: only committed text is written, nothing is redrawn.
pub struct PlainSurface<W> {
    out: W,
}

impl<W: Write> PlainSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Surface for PlainSurface<W> {
    fn commit(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")
    }

    fn redraw(&mut self, _live: &str) -> io::Result<()> {
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Leading-edge rate limiter: the first call passes, calls within
/// `interval` of the last pass are dropped.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    /// Record a pass that happened outside of [`Throttle::ready`].
    pub fn mark(&mut self, now: Instant) {
        self.last = Some(now);
    }
}

/// Paints frames onto a [`Surface`].
///
/// Settled transcript blocks are committed to scrollback exactly once, as
/// soon as every block before them is settled too. Everything else (open
/// transcript blocks and status lines) is the live region.
pub struct TerminalRenderer<S> {
    surface: S,
    throttle: Throttle,
    committed: usize,
    last: Option<Frame>,
}

impl<S: Surface> TerminalRenderer<S> {
    pub fn new(surface: S, interval: Duration) -> Self {
        Self {
            surface,
            throttle: Throttle::new(interval),
            committed: 0,
            last: None,
        }
    }

    /// Commit newly settled blocks and redraw the live region.
    pub fn render(&mut self, frame: &Frame) -> io::Result<()> {
        self.commit_settled(frame)?;
        self.surface.redraw(&frame.live_text(self.committed))?;
        self.last = Some(frame.clone());
        Ok(())
    }

    /// Like [`TerminalRenderer::render`], but skips redraws that come too
    /// soon after the previous one. Commits are never skipped, and a commit
    /// always redraws so committed text is not shown twice.
    pub fn throttled_render(&mut self, frame: &Frame, now: Instant) -> io::Result<()> {
        let committed_any = self.commit_settled(frame)?;
        if committed_any {
            self.throttle.mark(now);
            self.surface.redraw(&frame.live_text(self.committed))?;
        } else if self.throttle.ready(now) {
            self.surface.redraw(&frame.live_text(self.committed))?;
        }
        self.last = Some(frame.clone());
        Ok(())
    }

    /// Write the last live region permanently and drop it.
    pub fn finalize(&mut self) -> io::Result<()> {
        self.commit_live()?;
        self.surface.clear()
    }

    /// Render a fatal error as the final line, after whatever the live
    /// region still held.
    pub fn fail(&mut self, message: &str) -> io::Result<()> {
        self.commit_live()?;
        self.surface.commit(&format_error(message))?;
        self.surface.clear()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    fn commit_live(&mut self) -> io::Result<()> {
        if let Some(frame) = self.last.take() {
            let live = frame.live_text(self.committed);
            if !live.is_empty() {
                self.surface.commit(&live)?;
            }
            self.committed = frame.transcript.len();
        }
        Ok(())
    }

    fn commit_settled(&mut self, frame: &Frame) -> io::Result<bool> {
        let settled = frame.settled_len();
        if settled <= self.committed {
            return Ok(false);
        }
        for block in &frame.transcript[self.committed..settled] {
            self.surface.commit(&block.text)?;
        }
        self.committed = settled;
        Ok(true)
    }
}

/// Spawn the render task.
///
/// Returns an event sender and a join handle. Drop the sender when input
/// ends to let the loop flush the terminal, then await the handle.
pub fn spawn_renderer(
    config: ReporterConfig,
) -> (
    mpsc::UnboundedSender<EventResult>,
    JoinHandle<Result<RenderOutcome>>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let interval = config.throttle();
    let handle = if io::stdout().is_terminal() {
        let mut renderer = TerminalRenderer::new(LiveSurface::stdout(), interval);
        tokio::spawn(async move { render_loop(rx, config, &mut renderer).await })
    } else {
        let mut renderer = TerminalRenderer::new(PlainSurface::new(io::stdout()), interval);
        tokio::spawn(async move { render_loop(rx, config, &mut renderer).await })
    };
    (tx, handle)
}

/// Feed received events through the reporter pipeline and paint every frame.
pub async fn render_loop<S: Surface>(
    rx: mpsc::UnboundedReceiver<EventResult>,
    config: ReporterConfig,
    renderer: &mut TerminalRenderer<S>,
) -> Result<RenderOutcome> {
    let events = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    });
    let mut frames = pin!(frame_stream(events, config));

    while let Some(item) = frames.next().await {
        match item {
            Ok(frame) => renderer.throttled_render(&frame, Instant::now())?,
            Err(e) => {
                tracing::error!(error = %e, "event source failed");
                renderer.fail(&e.to_string())?;
                return Ok(RenderOutcome::Failed);
            }
        }
    }

    renderer.finalize()?;
    Ok(RenderOutcome::Completed)
}
