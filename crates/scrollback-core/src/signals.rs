//! Per-channel signals derived from the raw event stream.

use std::collections::HashMap;

use colored::Colorize;

use crate::events::{Level, Lifecycle, Progress, ScriptOutput, Stats};
use crate::format::{bytes, hl_pkg_id, hl_value};
use crate::merge::Line;

/// Resolution, fetch and store-hit counters behind the status line.
#[derive(Debug)]
pub struct ProgressCounters {
    resolving: u64,
    fetched: u64,
    found_in_store: u64,
    resolution_done: bool,
    batch: bool,
}

impl ProgressCounters {
    pub fn new(batch: bool) -> Self {
        Self {
            resolving: 0,
            fetched: 0,
            found_in_store: 0,
            resolution_done: false,
            batch,
        }
    }

    /// Count a progress event. Returns whether any counter changed.
    pub fn observe(&mut self, progress: &Progress) -> bool {
        match progress {
            Progress::ResolvingContent { .. } => {
                if self.is_frozen() {
                    return false;
                }
                self.resolving += 1;
            }
            Progress::Fetched { .. } => self.fetched += 1,
            Progress::FoundInStore { .. } => self.found_in_store += 1,
            _ => return false,
        }
        true
    }

    /// Record the resolution boundary. Batch runs have no boundary.
    ///
    /// Returns `true` the first time the boundary fires.
    pub fn finish_resolution(&mut self) -> bool {
        if self.batch || self.resolution_done {
            return false;
        }
        self.resolution_done = true;
        true
    }

    fn is_frozen(&self) -> bool {
        !self.batch && self.resolution_done
    }

    pub fn resolving(&self) -> u64 {
        self.resolving
    }

    pub fn fetched(&self) -> u64 {
        self.fetched
    }

    pub fn found_in_store(&self) -> u64 {
        self.found_in_store
    }

    /// Nothing was resolved before the boundary.
    pub fn is_up_to_date(&self) -> bool {
        self.resolution_done && self.resolving == 0
    }

    /// The status line, or `None` while no package has been resolved.
    ///
    /// The line settles with a `done` suffix once every resolved package was
    /// either reused or downloaded after the resolution boundary.
    pub fn status_line(&self) -> Option<Line> {
        if self.resolving == 0 {
            return None;
        }
        let msg = format!(
            "Resolving: total {}, reused {}, downloaded {}",
            hl_value(self.resolving),
            hl_value(self.found_in_store),
            hl_value(self.fetched),
        );
        if self.resolution_done && self.resolving == self.found_in_store + self.fetched {
            Some(Line::settled(format!("{msg}, done")))
        } else {
            Some(Line::fixed(msg))
        }
    }
}

/// Bytes received for one large tarball.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadState {
    pub total: u64,
    pub downloaded: u64,
}

impl DownloadState {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            downloaded: 0,
        }
    }

    /// Apply a progress report. Reports that go backwards are ignored so the
    /// rendered count never decreases.
    pub fn advance(&mut self, downloaded: u64) -> bool {
        if downloaded < self.downloaded {
            return false;
        }
        self.downloaded = downloaded;
        true
    }

    pub fn is_done(&self) -> bool {
        self.downloaded >= self.total
    }

    pub fn line(&self, pkg_id: &str) -> Line {
        let msg = format!(
            "Downloading {}: {}/{}",
            hl_pkg_id(pkg_id),
            hl_value(bytes(self.downloaded)),
            hl_value(bytes(self.total)),
        );
        if self.is_done() {
            Line::settled(format!("{msg}, done"))
        } else {
            Line::fixed(msg)
        }
    }
}

/// Live table of lifecycle script output, one row per (script, package).
///
/// Rows keep their first-seen position; an update only rewrites its own row.
#[derive(Debug, Default)]
pub struct LifecyclePanel {
    rows: Vec<String>,
    index: HashMap<(String, String), usize>,
}

impl LifecyclePanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the row for this event and return the whole table.
    pub fn update(&mut self, log: &Lifecycle) -> String {
        let line = format_lifecycle(log);
        let key = (log.script.clone(), log.pkg_id.clone());
        match self.index.get(&key) {
            Some(&row) => self.rows[row] = line,
            None => {
                self.index.insert(key, self.rows.len());
                self.rows.push(line);
            }
        }
        self.rows.join("\n")
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn format_lifecycle(log: &Lifecycle) -> String {
    let prefix = format!(
        "Running {} for {}",
        hl_value(&log.script),
        hl_pkg_id(&log.pkg_id)
    );
    match &log.output {
        ScriptOutput::Exit(0) => format!("{prefix}, done"),
        ScriptOutput::Exit(code) => {
            format!("{prefix}: {}", format!("Exited with {code}").red())
        }
        ScriptOutput::Line(line) if log.level == Level::Error => {
            format!("{prefix}! {}", line.red())
        }
        ScriptOutput::Line(line) => format!("{prefix}: {}", line.dimmed()),
    }
}

/// Collects the stats events of a run into one summary.
#[derive(Debug)]
pub struct StatsAggregator {
    expected: usize,
    seen: usize,
    added: u32,
    removed: u32,
    finished: bool,
}

impl StatsAggregator {
    pub fn new(expected: usize) -> Self {
        Self {
            expected: expected.max(1),
            seen: 0,
            added: 0,
            removed: 0,
            finished: false,
        }
    }

    /// Fold one event; yields the summary once the expected count is reached.
    pub fn push(&mut self, stats: Stats) -> Option<StatsSummary> {
        if self.finished {
            return None;
        }
        match stats {
            Stats::Added(n) => self.added = n,
            Stats::Removed(n) => self.removed = n,
        }
        self.seen += 1;
        if self.seen < self.expected {
            return None;
        }
        self.finished = true;
        Some(self.summary())
    }

    /// Summarize what arrived when the stream ends early.
    pub fn flush(&mut self) -> Option<StatsSummary> {
        if self.finished || self.seen == 0 {
            return None;
        }
        self.finished = true;
        Some(self.summary())
    }

    fn summary(&self) -> StatsSummary {
        StatsSummary {
            added: self.added,
            removed: self.removed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSummary {
    pub added: u32,
    pub removed: u32,
}

impl StatsSummary {
    /// Number of `-` and `+` signs in the bar. When the changes do not fit in
    /// `width`, both counts are scaled down and floored.
    pub fn bar_signs(&self, width: usize) -> (usize, usize) {
        let mut remove_signs = self.removed as usize;
        let mut add_signs = self.added as usize;
        let changes = add_signs + remove_signs;
        if changes > width {
            add_signs = add_signs * width / changes;
            remove_signs = remove_signs * width / changes;
        }
        (remove_signs, add_signs)
    }

    /// `Packages: -R +A` followed by the sign bar, or `None` when nothing
    /// changed.
    pub fn render(&self, width: usize) -> Option<String> {
        if self.added == 0 && self.removed == 0 {
            return None;
        }
        let mut msg = String::from("Packages:");
        if self.removed > 0 {
            msg.push_str(&format!(" {}", format!("-{}", self.removed).red()));
        }
        if self.added > 0 {
            msg.push_str(&format!(" {}", format!("+{}", self.added).green()));
        }
        let (remove_signs, add_signs) = self.bar_signs(width);
        msg.push('\n');
        msg.push_str(&"-".red().to_string().repeat(remove_signs));
        msg.push_str(&"+".green().to_string().repeat(add_signs));
        Some(msg)
    }
}
