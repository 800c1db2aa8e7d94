use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use scrollback_core::config::ReporterConfig;

/// scrollback: live terminal reporter for package-installation logs
///
/// Reads newline-delimited JSON log events on stdin and renders them as a
/// status region below a growing transcript.
#[derive(Parser, Debug)]
#[command(name = "scrollback", version, about, long_about = None)]
pub struct Cli {
    /// Engine subcommand being reported (`install`, `update`, `recursive`, ...)
    #[arg(long, default_value = "install")]
    pub cmd: String,

    /// Print one line per raw event instead of the live view
    #[arg(long)]
    pub server: bool,

    /// JSON file with reporter settings; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Width used to scale the stats bar (defaults to the config file value,
    /// then the terminal width)
    #[arg(long)]
    pub width: Option<usize>,

    /// Minimum delay between repaints of the status region, in milliseconds
    #[arg(long = "throttle-ms")]
    pub throttle_ms: Option<u64>,

    /// Size in bytes from which a download gets its own progress line
    #[arg(long = "big-tarball-size")]
    pub big_tarball_size: Option<u64>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Write debug logs to daily-rotated files in this directory
    #[arg(long = "log-dir")]
    pub log_dir: Option<PathBuf>,
}

impl Cli {
    /// Build the reporter configuration: file values first, then the
    /// subcommand, then explicit flags.
    pub fn reporter_config(&self) -> Result<ReporterConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to parse config {}", path.display()))?
            }
            None => ReporterConfig::default(),
        };
        config.apply_command(&self.cmd);

        if self.width.is_some() {
            config.width = self.width;
        } else if config.width.is_none() {
            config.width = terminal_width();
        }
        if let Some(throttle_ms) = self.throttle_ms {
            config.throttle_ms = throttle_ms;
        }
        if let Some(size) = self.big_tarball_size {
            config.big_tarball_size = size;
        }
        Ok(config)
    }
}

fn terminal_width() -> Option<usize> {
    terminal_size::terminal_size().map(|(terminal_size::Width(w), _)| w as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrollback_core::config::Mode;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "scrollback",
            "--cmd",
            "recursive",
            "--width",
            "40",
            "--throttle-ms",
            "50",
        ]);
        let config = cli.reporter_config().expect("valid config");
        assert_eq!(config.mode, Mode::Batch);
        assert_eq!(config.width(), 40);
        assert_eq!(config.throttle_ms, 50);
    }

    #[test]
    fn test_install_expects_two_stats_events() {
        let cli = Cli::parse_from(["scrollback", "--width", "80"]);
        let config = cli.reporter_config().expect("valid config");
        assert_eq!(config.stats_events, 2);
        assert_eq!(config.mode, Mode::Single);
    }

    #[test]
    fn test_config_file_is_loaded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("scrollback.json");
        std::fs::write(&path, r#"{"bigTarballSize": 1024, "throttleMs": 10}"#).expect("write");
        let cli = Cli::parse_from([
            "scrollback".to_string(),
            "--config".to_string(),
            path.display().to_string(),
            "--throttle-ms".to_string(),
            "20".to_string(),
        ]);
        let config = cli.reporter_config().expect("valid config");
        assert_eq!(config.big_tarball_size, 1024);
        assert_eq!(config.throttle_ms, 20);
    }

    #[test]
    fn test_config_file_width_beats_terminal_width() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("scrollback.json");
        std::fs::write(&path, r#"{"width": 33}"#).expect("write");
        let cli = Cli::parse_from([
            "scrollback".to_string(),
            "--config".to_string(),
            path.display().to_string(),
        ]);
        let config = cli.reporter_config().expect("valid config");
        assert_eq!(config.width, Some(33));

        let cli = Cli::parse_from([
            "scrollback".to_string(),
            "--config".to_string(),
            path.display().to_string(),
            "--width".to_string(),
            "50".to_string(),
        ]);
        let config = cli.reporter_config().expect("valid config");
        assert_eq!(config.width, Some(50));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let cli = Cli::parse_from(["scrollback", "--config", "/nonexistent/scrollback.json"]);
        assert!(cli.reporter_config().is_err());
    }
}
