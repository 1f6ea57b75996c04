//! Logging utilities with colored module prefixes.
//!
//! This module provides the `log!` macro for formatted terminal output.
//! Messages go to stderr so that reports streamed to stdout (`--to ndjson`)
//! stay machine readable.
//!
//! # Example
//!
//! ```ignore
//! log!("write"; "{} -> {}", input.display(), output.display());
//! log!("warn"; "transform `{name}` returned empty content");
//! ```

use colored::{ColoredString, Colorize};
use crossterm::terminal::size;
use std::{
    io::{Write, stderr},
    sync::OnceLock,
};

/// Cached terminal width (fetched once on first use)
static TERMINAL_WIDTH: OnceLock<u16> = OnceLock::new();

/// Length of brackets around module name: "[]"
const BRACKET_LEN: usize = 2;
/// Space after prefix: "[module] " <- this space
const SPACE_AFTER_PREFIX: usize = 1;

/// Calculate total prefix length for a module name.
///
/// Returns: `module.len() + 3` (for "[", "]", and trailing space)
#[inline]
const fn calc_prefix_len(module_len: usize) -> usize {
    module_len + BRACKET_LEN + SPACE_AFTER_PREFIX
}

/// Get terminal width, cached after first call.
/// Falls back to 120 columns if detection fails.
fn get_terminal_width() -> u16 {
    *TERMINAL_WIDTH.get_or_init(|| size().map(|(w, _)| w).unwrap_or(120))
}

/// Log a message with a colored module prefix.
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::utils::log::log($module, &format!($($arg)*))
    }};
}

/// Log a message with a colored module prefix.
///
/// Long messages are truncated to the terminal width.
#[inline]
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);
    let width = get_terminal_width() as usize;

    let prefix_len = calc_prefix_len(module.len());
    let max_msg_len = width.saturating_sub(prefix_len);
    let message = truncate_str(message, max_msg_len);

    let mut stderr = stderr().lock();
    writeln!(stderr, "{prefix} {message}").ok();
    stderr.flush().ok();
}

/// Apply color to a module prefix based on module type.
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module_lower {
        "write" => prefix.bright_green().bold(),
        "warn" | "lint" => prefix.yellow().bold(),
        "error" => prefix.bright_red().bold(),
        "computed" | "permalink" => prefix.bright_blue().bold(),
        _ => prefix.bright_yellow().bold(),
    }
}

/// Truncate a string to fit within max_len bytes.
///
/// Ensures the result is valid UTF-8 by finding the nearest character boundary.
#[inline]
fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
