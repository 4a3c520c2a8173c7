//! `strata fileinfo`: prints the resolved file lists of a design.
//!
//! Instances whose file list cannot be resolved are reported as
//! diagnostics; the remaining records are still printed.

use std::error::Error;

use strata_diagnostics::DiagnosticSink;
use strata_filelist::{records, render_json, render_text, FileListOptions, FileListResolver, RootMapper};

use crate::pipeline::{elaborate, load_project, render_diagnostics, Project};
use crate::{FileInfoArgs, GlobalArgs, ReportFormat};

/// File-list options from the configuration, overridden by the arguments.
pub fn options(project: &Project, args: &FileInfoArgs) -> FileListOptions {
    let defaults = &project.config.filelist;
    let mut options =
        FileListOptions::new(args.name.clone().unwrap_or_else(|| defaults.name.clone()));
    options.target = args.target.clone().or_else(|| defaults.target.clone());
    options.root = Some(project.dir.clone());
    options.template_paths = project.paths.templates.clone();
    options.replace_envvars = args.envvars;
    options
}

/// Runs the `strata fileinfo` command.
///
/// Returns exit code 1 if elaboration failed or any file list could not be
/// resolved.
pub fn run(args: &FileInfoArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let project = load_project(global)?;
    let sink = DiagnosticSink::new();
    let Some(design) = elaborate(&project, &args.top, &sink)? else {
        render_diagnostics(&sink, global.color);
        return Ok(1);
    };

    let resolver = FileListResolver::new(&project.registry, options(&project, args));
    let report = resolver.collect(&design);
    let mapper = RootMapper::new(
        Some(project.paths.root.clone()),
        project.config.filelist.root_placeholder.as_str(),
    );
    let records = records(&report, &mapper);
    match args.format {
        ReportFormat::Text => print!("{}", render_text(&records)),
        ReportFormat::Json => println!("{}", render_json(&records)?),
    }

    for diag in report.diagnostics() {
        sink.emit(diag);
    }
    render_diagnostics(&sink, global.color);
    Ok(if sink.has_errors() { 1 } else { 0 })
}
