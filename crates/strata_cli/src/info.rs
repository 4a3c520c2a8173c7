//! `strata info`: prints the module-info report of a design.

use std::error::Error;

use strata_diagnostics::DiagnosticSink;
use strata_elaborate::design_info;

use crate::pipeline::{elaborate, load_project, render_diagnostics};
use crate::{GlobalArgs, TopArgs};

/// Runs the `strata info` command.
pub fn run(args: &TopArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let project = load_project(global)?;
    let sink = DiagnosticSink::new();
    match elaborate(&project, args, &sink)? {
        Some(design) => {
            render_diagnostics(&sink, global.color);
            print!("{}", design_info(&design));
            Ok(0)
        }
        None => {
            render_diagnostics(&sink, global.color);
            Ok(1)
        }
    }
}
