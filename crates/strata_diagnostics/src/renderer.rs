//! Terminal rendering of diagnostics.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;
use crate::sink::Tally;
use indexmap::IndexMap;
use strata_ir::HierPath;

/// Formats diagnostics for output.
pub trait DiagnosticRenderer {
    /// Renders one diagnostic.
    fn render(&self, diag: &Diagnostic) -> String;
}

/// rustc-style rendering with the instance path as location:
///
/// ```text
/// error[E213]: 'data_s' already assigned to 'u_a/data_o', cannot assign 'u_b/data_o'
///   --> uart/u_core
///    = note: instance failed after stage 'ParametersBound'
/// ```
pub struct TerminalRenderer {
    /// Wrap the severity in ANSI colors.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn severity_label(&self, severity: Severity) -> String {
        if !self.color {
            return severity.to_string();
        }
        let ansi = match severity {
            Severity::Error => "31",
            Severity::Warning => "33",
        };
        format!("\x1b[1;{ansi}m{severity}\x1b[0m")
    }

    /// One line per instance with diagnostics, e.g. `uart/u_core: 1 error, 2 warnings`.
    pub fn render_summary(&self, tallies: &IndexMap<HierPath, Tally>) -> String {
        let mut out = String::new();
        for (path, tally) in tallies {
            let location = if path.is_empty() {
                "<declarations>".to_string()
            } else {
                path.to_string()
            };
            let mut counts = Vec::new();
            if tally.errors > 0 {
                counts.push(plural(tally.errors, "error"));
            }
            if tally.warnings > 0 {
                counts.push(plural(tally.warnings, "warning"));
            }
            out.push_str(&format!("  {location}: {}\n", counts.join(", ")));
        }
        out
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = format!(
            "{}[{}]: {}\n",
            self.severity_label(diag.severity()),
            diag.code,
            diag.message
        );
        if let Some(path) = &diag.path {
            out.push_str(&format!("  --> {path}\n"));
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }
        out
    }
}
