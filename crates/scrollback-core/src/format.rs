use colored::{ColoredString, Colorize};
use indicatif::DecimalBytes;

use crate::events::{InstallCheck, InstallCheckCode};

/// Prefix a non-fatal message with the WARN marker.
pub fn format_warn(message: &str) -> String {
    format!("{} {}", "WARN".black().on_yellow(), message)
}

/// Prefix a failure message with the ERROR marker.
pub fn format_error(message: &str) -> String {
    format!("{} {}", "ERROR".red().bold(), message)
}

pub fn hl_value(value: impl ToString) -> ColoredString {
    value.to_string().blue()
}

pub fn hl_pkg_id(pkg_id: &str) -> ColoredString {
    pkg_id.bright_white()
}

/// Human readable size in decimal units (`0 B`, `10.49 MB`).
pub fn bytes(n: u64) -> String {
    DecimalBytes(n).to_string()
}

pub fn install_check_line(check: &InstallCheck) -> Option<String> {
    match check.code {
        InstallCheckCode::BadPlatform => Some(format_warn(&format!(
            "Unsupported system. Skipping dependency {}",
            check.pkg_id
        ))),
        InstallCheckCode::NotSupported => Some(format_warn(&format!(
            "Unsupported engine. Skipping dependency {}",
            check.pkg_id
        ))),
        InstallCheckCode::Other => None,
    }
}
