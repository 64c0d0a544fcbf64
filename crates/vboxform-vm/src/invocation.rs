//! A single VBoxManage command line, minus the executable.

use std::ffi::OsString;
use std::fmt;
use std::path::Path;

/// Arguments for one control-surface call, e.g. `["controlvm", "web", "poweroff"]`.
///
/// The executable itself is supplied by the executor, so the same plan
/// runs against any configured `VBoxManage` path. Arguments are kept as
/// `OsString` so host paths reach the process unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    args: Vec<OsString>,
}

impl Invocation {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// The VBoxManage subcommand (`createvm`, `modifyvm`, ...).
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().and_then(|arg| arg.to_str())
    }

    /// Full command line as run by `program`, for logs and diagnostics.
    pub fn command_line(&self, program: &Path) -> String {
        format!("{} {}", program.display(), self)
    }
}

/// Renders the arguments only, quoting any that are empty or contain spaces.
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, "{:?}", arg)?;
            } else {
                f.write_str(&arg)?;
            }
        }
        Ok(())
    }
}
