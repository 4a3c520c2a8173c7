//! `strata check`: elaborates a design and reports errors.

use std::error::Error;

use strata_diagnostics::DiagnosticSink;

use crate::pipeline::{elaborate, load_project, render_diagnostics};
use crate::{GlobalArgs, TopArgs};

/// Runs the `strata check` command.
///
/// Every loaded declaration is checked for instantiation cycles first,
/// including those the design does not reach. Warnings are printed but do
/// not fail the check. Returns exit code 0 if the design elaborates, 1
/// otherwise.
pub fn run(args: &TopArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let project = load_project(global)?;
    let sink = DiagnosticSink::new();
    if let Err(err) = project.registry.check_acyclic() {
        sink.emit(err.to_diagnostic());
        render_diagnostics(&sink, global.color);
        return Ok(1);
    }
    if !global.quiet {
        eprintln!(
            "   Checking {} ({} libraries, {} modules)",
            project.config.project.name,
            project.libraries.len(),
            project.registry.len()
        );
    }

    let Some(design) = elaborate(&project, args, &sink)? else {
        render_diagnostics(&sink, global.color);
        return Ok(1);
    };

    render_diagnostics(&sink, global.color);
    if !global.quiet {
        let stats = design.stats();
        eprintln!(
            "   Result: {} module(s), {} instance(s), depth {}",
            stats.modules, stats.instances, stats.depth
        );
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{global, project, top_args};

    #[test]
    fn check_passes() {
        let tmp = project("demo_lib.top");
        assert_eq!(run(&top_args(None), &global(tmp.path())).unwrap(), 0);
    }

    #[test]
    fn warnings_do_not_fail_the_check() {
        let tmp = project("demo_lib.top");
        std::fs::write(
            tmp.path().join("libs").join("open_lib.toml"),
            "[library]\nname = \"open_lib\"\n\n[[modules]]\nname = \"open\"\ninsts = [{ name = \"u_leaf\", module = \"demo_lib.leaf\" }]\n",
        )
        .unwrap();
        assert_eq!(run(&top_args(Some("open_lib.open")), &global(tmp.path())).unwrap(), 0);
    }

    #[test]
    fn check_fails_on_unknown_top() {
        let tmp = project("demo_lib.top");
        let code = run(&top_args(Some("demo_lib.nope")), &global(tmp.path())).unwrap();
        assert_eq!(code, 1);
    }

    #[test]
    fn check_fails_on_unreached_cycle() {
        let tmp = project("demo_lib.top");
        std::fs::write(
            tmp.path().join("libs").join("loop_lib.toml"),
            "[library]\nname = \"loop_lib\"\n\n[[modules]]\nname = \"a\"\ninsts = [{ name = \"u_a\", module = \"loop_lib.a\" }]\n",
        )
        .unwrap();
        assert_eq!(run(&top_args(None), &global(tmp.path())).unwrap(), 1);
    }

    #[test]
    fn malformed_top_is_an_error() {
        let tmp = project("demo_lib.top");
        assert!(run(&top_args(Some("no_dot")), &global(tmp.path())).is_err());
    }
}
