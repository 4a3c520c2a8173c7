//! A single reported problem, located in the design hierarchy.

use crate::code::DiagnosticCode;
use crate::severity::Severity;
use serde::Serialize;
use strata_ir::HierPath;

/// A reported problem.
///
/// `path` is the instance the problem was found at (`uart/u_core`); it is
/// absent for problems with the declarations themselves, such as a duplicate
/// module or a cycle among libraries.
#[derive(Clone, Debug, Serialize)]
pub struct Diagnostic {
    /// Code, which also fixes the severity.
    pub code: DiagnosticCode,
    /// Main message.
    pub message: String,
    /// Instance the problem was found at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<HierPath>,
    /// Explanatory footnotes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    /// Suggested fixes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub help: Vec<String>,
}

impl Diagnostic {
    /// Creates a diagnostic with no location.
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    /// Severity given by the code.
    pub fn severity(&self) -> Severity {
        self.code.severity
    }

    /// Locates the diagnostic at `path`; the empty path leaves it unlocated.
    pub fn at(mut self, path: &HierPath) -> Self {
        self.path = (!path.is_empty()).then(|| path.clone());
        self
    }

    /// Adds a note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Adds a suggested fix.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }
}
