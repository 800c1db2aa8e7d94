use std::time::Duration;

use serde::Deserialize;

/// Fetches at or above this size get their own download line (5 MiB).
pub const BIG_TARBALL_SIZE: u64 = 5 * 1024 * 1024;

/// Minimum delay between two repaints of the live region.
pub const DEFAULT_THROTTLE_MS: u64 = 200;

/// Width the stats bar is scaled to when no terminal width is known.
pub const DEFAULT_WIDTH: usize = 100;

/// Whether the reporter follows one project or a batch of independent installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Single,
    /// Multi-project runs: no diff, summary, stats or warning panels, and
    /// the resolution counter never freezes.
    Batch,
}

/// Knobs for one reporter run.
///
/// Loadable from JSON (`{"mode": "batch", "throttleMs": 100}`); any missing
/// field falls back to [`ReporterConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReporterConfig {
    pub mode: Mode,
    /// Number of stats events the engine sends for this command.
    pub stats_events: usize,
    /// Threshold in bytes for tracking a download on its own line.
    pub big_tarball_size: u64,
    pub throttle_ms: u64,
    /// Terminal width, used only to scale the stats bar. Unset means
    /// [`DEFAULT_WIDTH`].
    pub width: Option<usize>,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Single,
            stats_events: 1,
            big_tarball_size: BIG_TARBALL_SIZE,
            throttle_ms: DEFAULT_THROTTLE_MS,
            width: None,
        }
    }
}

impl ReporterConfig {
    /// Derive the configuration for an engine subcommand.
    ///
    /// `recursive` switches to batch mode; `install` and `update` report
    /// stats in two events (net additions, then removals).
    pub fn for_command(cmd: &str) -> Self {
        let mut config = Self::default();
        config.apply_command(cmd);
        config
    }

    pub fn apply_command(&mut self, cmd: &str) {
        match cmd {
            "recursive" => self.mode = Mode::Batch,
            "install" | "update" => self.stats_events = 2,
            _ => {}
        }
    }

    pub fn is_batch(&self) -> bool {
        self.mode == Mode::Batch
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn width(&self) -> usize {
        self.width.unwrap_or(DEFAULT_WIDTH)
    }
}
