//! User-facing messages.
//!
//! Every command receives a [`Reporter`] instead of printing directly, so
//! `--quiet` is honoured everywhere and tests can capture what was said.

use std::cell::RefCell;

const BOLD: &str = "\x1b[1m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Severity of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Progress information.
    Info,
    /// Something went wrong but alidock carries on.
    Warning,
    /// Something the user must act upon.
    Error,
}

/// Formats one message line with its coloured marker.
#[must_use]
pub fn format_line(level: Level, msg: &str) -> String {
    match level {
        Level::Info => format!("{GREEN}{BOLD}>{RESET} {msg}"),
        Level::Warning => format!("{YELLOW}{BOLD}!{RESET} {YELLOW}{msg}{RESET}"),
        Level::Error => format!("{RED}{BOLD}x{RESET} {RED}{msg}{RESET}"),
    }
}

/// Message sink writing to stderr, or into memory for tests.
#[derive(Debug, Default)]
pub struct Reporter {
    quiet: bool,
    captured: Option<RefCell<Vec<(Level, String)>>>,
}

impl Reporter {
    /// Reporter printing to stderr unless `quiet`.
    #[must_use]
    pub const fn new(quiet: bool) -> Self {
        Self {
            quiet,
            captured: None,
        }
    }

    /// Reporter keeping every message in memory.
    #[cfg(test)]
    pub fn capturing() -> Self {
        Self {
            quiet: false,
            captured: Some(RefCell::new(Vec::new())),
        }
    }

    /// Messages kept by a capturing reporter.
    #[cfg(test)]
    pub fn messages(&self) -> Vec<(Level, String)> {
        self.captured
            .as_ref()
            .map(|c| c.borrow().clone())
            .unwrap_or_default()
    }

    /// Reports progress.
    pub fn info(&self, msg: impl AsRef<str>) {
        self.emit(Level::Info, msg.as_ref());
    }

    /// Reports a non-fatal problem.
    pub fn warning(&self, msg: impl AsRef<str>) {
        self.emit(Level::Warning, msg.as_ref());
    }

    /// Reports a problem the user must act upon.
    pub fn error(&self, msg: impl AsRef<str>) {
        self.emit(Level::Error, msg.as_ref());
    }

    fn emit(&self, level: Level, msg: &str) {
        if let Some(captured) = &self.captured {
            captured.borrow_mut().push((level, msg.to_owned()));
            return;
        }
        if self.quiet {
            return;
        }
        #[allow(clippy::print_stderr)]
        {
            eprintln!("{}", format_line(level, msg));
        }
    }
}
