//! Handing the terminal over to another program.
//!
//! Interactive actions end alidock: the ssh session or the root shell
//! replaces the current process and nothing runs afterwards.

use std::path::PathBuf;
use std::process::Command;

use alidock_common::error::{AlidockError, Result};

/// A program that takes over the current process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandOff {
    /// Program name, looked up in `PATH`.
    pub program: String,
    /// Arguments, without the program name.
    pub args: Vec<String>,
}

impl HandOff {
    /// Splits a full argv into program and arguments.
    #[must_use]
    pub fn from_argv(argv: Vec<String>) -> Option<Self> {
        let mut argv = argv.into_iter();
        let program = argv.next()?;
        Some(Self {
            program,
            args: argv.collect(),
        })
    }

    /// Full argv, program first.
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Locates the program in `PATH`.
    ///
    /// # Errors
    ///
    /// Returns a domain error naming the missing program.
    pub fn resolve(&self) -> Result<PathBuf> {
        which::which(&self.program).map_err(|e| {
            AlidockError::domain(format!("cannot find {} in PATH: {e}", self.program))
        })
    }

    /// Replaces the current process with the program.
    ///
    /// Only returns on failure.
    #[cfg(unix)]
    pub fn exec(self) -> AlidockError {
        use std::os::unix::process::CommandExt;

        let path = match self.resolve() {
            Ok(path) => path,
            Err(e) => return e,
        };
        tracing::debug!(program = %path.display(), args = ?self.args, "handing off process");
        let err = Command::new(&path).arg0(&self.program).args(&self.args).exec();
        AlidockError::Io { path, source: err }
    }

    /// Runs the program with inherited stdio and exits with its status.
    ///
    /// Only returns on failure.
    #[cfg(not(unix))]
    pub fn exec(self) -> AlidockError {
        let path = match self.resolve() {
            Ok(path) => path,
            Err(e) => return e,
        };
        match Command::new(&path).args(&self.args).status() {
            Ok(status) => std::process::exit(status.code().unwrap_or(1)),
            Err(e) => AlidockError::Io { path, source: e },
        }
    }
}
