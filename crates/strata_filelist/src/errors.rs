//! File-list errors and their diagnostic codes.

use std::path::PathBuf;

use strata_diagnostics::{Diagnostic, DiagnosticCode};
use strata_ir::HierPath;

/// Unknown or malformed placeholder in a path.
pub const E300: DiagnosticCode = DiagnosticCode::error(300);

/// Template neither next to its declaration nor on the search path.
pub const E301: DiagnosticCode = DiagnosticCode::error(301);

/// Relative path without a declaration directory or project root.
pub const E302: DiagnosticCode = DiagnosticCode::error(302);

/// Report could not be serialized.
pub const E303: DiagnosticCode = DiagnosticCode::error(303);

/// Errors raised while resolving the file lists of one instance.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileListError {
    /// A `{...}` placeholder or `$VAR` reference could not be substituted.
    #[error("cannot substitute '{text}': {reason}")]
    Placeholder {
        /// Path as written in the rule.
        text: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A template could not be located.
    #[error("template '{}' not found", .template.display())]
    TemplateNotFound {
        /// Template path after placeholder substitution.
        template: PathBuf,
        /// Directories searched, in order.
        searched: Vec<PathBuf>,
    },

    /// A relative path has nothing to resolve against.
    #[error("cannot anchor relative path '{}'", .path.display())]
    UnanchoredPath {
        /// The relative path.
        path: PathBuf,
    },

    /// Report serialization failed.
    #[error("cannot serialize report: {0}")]
    Serialize(String),
}

impl FileListError {
    /// Diagnostic code of this error.
    pub fn code(&self) -> DiagnosticCode {
        match self {
            FileListError::Placeholder { .. } => E300,
            FileListError::TemplateNotFound { .. } => E301,
            FileListError::UnanchoredPath { .. } => E302,
            FileListError::Serialize(_) => E303,
        }
    }

    /// Renders the error as a diagnostic located at the instance `path`.
    pub fn to_diagnostic(&self, path: &HierPath) -> Diagnostic {
        let diag = Diagnostic::new(self.code(), self.to_string()).at(path);
        match self {
            FileListError::TemplateNotFound { searched, .. } if !searched.is_empty() => {
                let dirs: Vec<String> = searched.iter().map(|d| d.display().to_string()).collect();
                diag.with_note(format!("searched: {}", dirs.join(", ")))
            }
            FileListError::Placeholder { .. } => diag.with_help(
                "available placeholders: {mod.modname}, {mod.libname}, {mod.inst}, {mod.path}, \
                 {mod.topmodname}, {cls.modname}, {cls.libname}",
            ),
            FileListError::UnanchoredPath { .. } => {
                diag.with_help("set a project root or a declaration directory")
            }
            _ => diag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_messages() {
        let err = FileListError::TemplateNotFound {
            template: PathBuf::from("uart.sv.mako"),
            searched: vec![PathBuf::from("/lib/uart_lib"), PathBuf::from("/templates")],
        };
        assert_eq!(err.code(), E301);
        assert_eq!(err.to_string(), "template 'uart.sv.mako' not found");
        let path = HierPath::root("uart").child("u_core");
        let diag = err.to_diagnostic(&path);
        assert_eq!(diag.path, Some(path));
        assert_eq!(diag.notes, vec!["searched: /lib/uart_lib, /templates".to_string()]);
    }

    #[test]
    fn placeholder_help() {
        let err = FileListError::Placeholder {
            text: "{mod.bogus}.sv".to_string(),
            reason: "unknown placeholder 'mod.bogus'".to_string(),
        };
        assert_eq!(err.code().to_string(), "E300");
        assert_eq!(err.to_diagnostic(&HierPath::root("top")).help.len(), 1);
    }
}
