//! How serious a diagnostic is.

use serde::Serialize;
use std::fmt;

/// Severity of a diagnostic.
///
/// Errors fail the command. Warnings describe a design that elaborates but
/// likely does not do what was meant.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Reported, does not change the exit code.
    Warning,
    /// Elaboration or file-list resolution failed.
    Error,
}

impl Severity {
    /// Letter in front of the code number, `E` or `W`.
    pub fn prefix(self) -> char {
        match self {
            Severity::Warning => 'W',
            Severity::Error => 'E',
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}
