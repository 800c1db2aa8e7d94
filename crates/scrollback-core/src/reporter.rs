use std::collections::HashMap;

use colored::Colorize;

use crate::classifier::Classifier;
use crate::config::ReporterConfig;
use crate::diff::{DiffBuilder, render_summary};
use crate::events::{Level, LogEvent, Message, Progress, Stage};
use crate::format::{format_error, format_warn, install_check_line};
use crate::merge::{Frame, Line, MergeEngine, SlotId, SlotKind};
use crate::signals::{
    DownloadState, LifecyclePanel, ProgressCounters, StatsAggregator, StatsSummary,
};

/// Slots that only exist for single-project runs.
#[derive(Debug)]
struct ProjectSlots {
    summary: SlotId,
    deprecation: SlotId,
    stats: SlotId,
    install_check: SlotId,
    registry: SlotId,
}

#[derive(Debug)]
struct Download {
    slot: SlotId,
    state: DownloadState,
}

/// The reporter pipeline for one installation run.
///
/// Feed events with [`Reporter::handle`]; every slot update yields one
/// [`Frame`]. All accumulated state (counters, lifecycle rows, diffs) is
/// owned here and touched only through `&mut self`.
#[derive(Debug)]
pub struct Reporter {
    config: ReporterConfig,
    classifier: Classifier,
    engine: MergeEngine,
    up_to_date: Option<SlotId>,
    status: SlotId,
    project: Option<ProjectSlots>,
    lifecycle_slot: SlotId,
    misc: SlotId,
    counters: ProgressCounters,
    downloads: HashMap<String, Download>,
    lifecycle: LifecyclePanel,
    diff: DiffBuilder,
    stats: StatsAggregator,
    finished: bool,
}

impl Reporter {
    pub fn new(config: ReporterConfig) -> Self {
        let batch = config.is_batch();
        let mut engine = MergeEngine::new();

        let up_to_date = (!batch).then(|| engine.open(SlotKind::Permanent));
        let status = engine.open(SlotKind::Ephemeral);
        let project = (!batch).then(|| ProjectSlots {
            summary: engine.open(SlotKind::Permanent),
            deprecation: engine.open(SlotKind::Permanent),
            stats: engine.open(SlotKind::Permanent),
            install_check: engine.open(SlotKind::Permanent),
            registry: engine.open(SlotKind::Permanent),
        });
        let lifecycle_slot = engine.open(SlotKind::Ephemeral);
        let misc = engine.open(SlotKind::Permanent);

        Self {
            counters: ProgressCounters::new(batch),
            stats: StatsAggregator::new(config.stats_events),
            config,
            classifier: Classifier::new(),
            engine,
            up_to_date,
            status,
            project,
            lifecycle_slot,
            misc,
            downloads: HashMap::new(),
            lifecycle: LifecyclePanel::new(),
            diff: DiffBuilder::new(),
            finished: false,
        }
    }

    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    /// Process one event and return the frames it produced, in order.
    pub fn handle(&mut self, event: LogEvent) -> Vec<Frame> {
        let mut frames = Vec::new();
        if self.finished || self.classifier.route(&event).is_none() {
            return frames;
        }

        match event {
            LogEvent::Progress(progress) => self.on_progress(progress, &mut frames),
            LogEvent::Stage(Stage::ResolutionDone) => self.on_resolution_done(&mut frames),
            LogEvent::Stage(Stage::Other) => {}
            LogEvent::Deprecation(log) => {
                self.diff.on_deprecation(&log);
                if let Some(slot) = self.project_slot(|p| p.deprecation)
                    && log.depth == 0
                {
                    let msg = format_warn(&format!(
                        "{} {}@{}: {}",
                        "deprecated".red(),
                        log.pkg_name,
                        log.pkg_version,
                        log.deprecated
                    ));
                    self.emit(slot, Line::settled(msg), &mut frames);
                }
            }
            LogEvent::Summary => {
                if let Some(slot) = self.project_slot(|p| p.summary)
                    && !self.engine.is_closed(slot)
                {
                    if let Some(msg) = render_summary(&self.diff.diff()) {
                        self.emit(slot, Line::settled(msg), &mut frames);
                    }
                    self.engine.close(slot);
                }
            }
            LogEvent::Lifecycle(log) => {
                // Rows change until the run ends; the table lives in the status region.
                let table = self.lifecycle.update(&log);
                self.emit(self.lifecycle_slot, Line::fixed(table), &mut frames);
            }
            LogEvent::Stats(stats) => {
                if self.project.is_some()
                    && let Some(summary) = self.stats.push(stats)
                {
                    self.emit_stats(summary, &mut frames);
                }
            }
            LogEvent::InstallCheck(check) => {
                if let Some(slot) = self.project_slot(|p| p.install_check)
                    && let Some(msg) = install_check_line(&check)
                {
                    self.emit(slot, Line::settled(msg), &mut frames);
                }
            }
            LogEvent::Registry(log) => {
                if let Some(slot) = self.project_slot(|p| p.registry)
                    && log.level == Level::Warn
                {
                    self.emit(slot, Line::settled(format_warn(&log.message)), &mut frames);
                }
            }
            LogEvent::Root(change) => self.diff.on_root(&change),
            LogEvent::ManifestSnapshot(snapshot) => self.diff.on_manifest(&snapshot),
            LogEvent::Link(log) => {
                if self.project.is_some() {
                    self.on_message(&log, &mut frames);
                }
            }
            LogEvent::Other(log) => self.on_message(&log, &mut frames),
            LogEvent::Unknown => {}
        }
        frames
    }

    /// End of input: flush pending aggregates and complete every slot.
    pub fn finish(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        if self.finished {
            return frames;
        }
        if self.project.is_some()
            && let Some(summary) = self.stats.flush()
        {
            self.emit_stats(summary, &mut frames);
        }
        self.engine.close_all();
        self.downloads.clear();
        self.finished = true;
        tracing::debug!(
            dropped = self.classifier.dropped(),
            "reporter finished"
        );
        frames
    }

    pub fn is_complete(&self) -> bool {
        self.engine.is_complete()
    }

    /// The latest recombination of every slot.
    pub fn frame(&self) -> Frame {
        self.engine.frame()
    }

    /// Number of big downloads still being tracked.
    pub fn active_downloads(&self) -> usize {
        self.downloads.len()
    }

    fn project_slot(&self, pick: impl Fn(&ProjectSlots) -> SlotId) -> Option<SlotId> {
        self.project.as_ref().map(pick)
    }

    fn emit(&mut self, slot: SlotId, line: Line, frames: &mut Vec<Frame>) {
        if let Some(frame) = self.engine.push(slot, line) {
            frames.push(frame);
        }
    }

    fn emit_status(&mut self, frames: &mut Vec<Frame>) {
        let Some(line) = self.counters.status_line() else {
            return;
        };
        let settled = !line.fixed;
        self.emit(self.status, line, frames);
        if settled {
            self.engine.close(self.status);
        }
    }

    fn emit_stats(&mut self, summary: StatsSummary, frames: &mut Vec<Frame>) {
        let Some(slot) = self.project_slot(|p| p.stats) else {
            return;
        };
        if let Some(msg) = summary.render(self.config.width()) {
            self.emit(slot, Line::settled(msg), frames);
        }
        self.engine.close(slot);
    }

    fn on_progress(&mut self, progress: Progress, frames: &mut Vec<Frame>) {
        match progress {
            Progress::FetchingStarted { pkg_id, size } => {
                let Some(size) = size.filter(|s| *s >= self.config.big_tarball_size) else {
                    return;
                };
                if let Some(previous) = self.downloads.remove(&pkg_id) {
                    tracing::debug!(%pkg_id, "download restarted");
                    self.engine.close(previous.slot);
                }
                let state = DownloadState::new(size);
                let slot = self.engine.open(SlotKind::Ephemeral);
                self.emit(slot, state.line(&pkg_id), frames);
                self.downloads.insert(pkg_id, Download { slot, state });
            }
            Progress::FetchingProgress { pkg_id, downloaded } => {
                let Some(download) = self.downloads.get_mut(&pkg_id) else {
                    return;
                };
                if !download.state.advance(downloaded) {
                    return;
                }
                let (slot, line, done) = (
                    download.slot,
                    download.state.line(&pkg_id),
                    download.state.is_done(),
                );
                self.emit(slot, line, frames);
                if done {
                    self.engine.close(slot);
                    self.downloads.remove(&pkg_id);
                }
            }
            other => {
                if self.counters.observe(&other) && !self.engine.is_closed(self.status) {
                    self.emit_status(frames);
                }
            }
        }
    }

    fn on_resolution_done(&mut self, frames: &mut Vec<Frame>) {
        if !self.counters.finish_resolution() {
            return;
        }
        if let Some(slot) = self.up_to_date {
            if self.counters.is_up_to_date() {
                self.emit(slot, Line::settled("Already up-to-date"), frames);
            }
            self.engine.close(slot);
        }
        self.emit_status(frames);
    }

    fn on_message(&mut self, log: &Message, frames: &mut Vec<Frame>) {
        let msg = match log.level {
            Level::Debug => return,
            Level::Warn => format_warn(&log.message),
            Level::Error => format_error(&log.message),
            Level::Info => log.message.clone(),
        };
        self.emit(self.misc, Line::settled(msg), frames);
    }
}
