//! Diagnostics for elaboration and file-list problems.
//!
//! A [`Diagnostic`] carries a stable [`DiagnosticCode`] (`E2xx`/`W2xx` for
//! elaboration, `E3xx` for file lists) and the [`HierPath`](strata_ir::HierPath)
//! of the instance it concerns. The thread-safe [`DiagnosticSink`] collects
//! them during a run and tallies them per instance, and [`TerminalRenderer`]
//! formats them for the terminal.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Area, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::{DiagnosticSink, Tally};
