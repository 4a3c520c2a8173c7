//! Shared project loading for the CLI commands.
//!
//! Every command runs the same front half:
//!
//! 1. Find the project directory (walk up looking for `strata.toml`)
//! 2. Load the configuration via `strata_config`
//! 3. Resolve the library and template search paths
//! 4. Load the declaration libraries via `strata_library`

use std::error::Error;
use std::path::{Path, PathBuf};

use strata_config::{ProjectConfig, ResolvedPaths, CONFIG_FILE_NAME};
use strata_diagnostics::{DiagnosticRenderer, DiagnosticSink, TerminalRenderer};
use strata_elaborate::{lint_design, Elaborator, ModuleRegistry, TopModRef};
use strata_ir::Design;
use strata_library::LibraryInfo;
use tracing::debug;

use crate::{GlobalArgs, TopArgs};

/// A loaded project.
pub struct Project {
    /// Directory holding `strata.toml`.
    pub dir: PathBuf,
    /// The parsed configuration.
    pub config: ProjectConfig,
    /// Absolute search paths.
    pub paths: ResolvedPaths,
    /// All declarations on the library path.
    pub registry: ModuleRegistry,
    /// The loaded libraries in load order.
    pub libraries: Vec<LibraryInfo>,
}

/// Walks up from `start` to find the directory containing `strata.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE_NAME).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE_NAME} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the configuration file from global CLI args.
///
/// `--config` may name the file itself or the directory holding
/// `strata.toml`. Otherwise walks up from the current directory.
pub fn resolve_config_file(global: &GlobalArgs) -> Result<PathBuf, Box<dyn Error>> {
    match &global.config {
        Some(config_path) => {
            let path = PathBuf::from(config_path);
            if path.is_dir() {
                Ok(path.join(CONFIG_FILE_NAME))
            } else {
                Ok(path)
            }
        }
        None => Ok(find_project_root(&std::env::current_dir()?)?.join(CONFIG_FILE_NAME)),
    }
}

/// Loads the configuration and all libraries of the project.
pub fn load_project(global: &GlobalArgs) -> Result<Project, Box<dyn Error>> {
    let config_file = resolve_config_file(global)?;
    let dir = config_file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let content = std::fs::read_to_string(&config_file)
        .map_err(|e| format!("failed to read {}: {e}", config_file.display()))?;
    let config = strata_config::load_config_from_str(&content)?;
    let paths = strata_config::resolve_paths(&config, &dir);
    debug!(libraries = ?paths.libraries, "library search path");

    let (registry, libraries) = strata_library::load_registry(&paths.libraries)?;
    Ok(Project {
        dir,
        config,
        paths,
        registry,
        libraries,
    })
}

/// The top reference from the command line, else from the configuration.
pub fn top_ref(args: &TopArgs, config: &ProjectConfig) -> Result<TopModRef, Box<dyn Error>> {
    let text = args.top.as_deref().unwrap_or(&config.project.top);
    Ok(text.parse::<TopModRef>()?)
}

/// Elaborates the selected design, emitting a failure or the lint warnings
/// of the finished design into `sink`.
///
/// Returns `None` when elaboration failed.
pub fn elaborate(
    project: &Project,
    args: &TopArgs,
    sink: &DiagnosticSink,
) -> Result<Option<Design>, Box<dyn Error>> {
    let top = top_ref(args, &project.config)?;
    let parallel = args.parallel || project.config.elaborate.parallel;
    match Elaborator::new(&project.registry)
        .parallel(parallel)
        .elaborate(&top)
    {
        Ok(design) => {
            lint_design(&design, sink);
            Ok(Some(design))
        }
        Err(err) => {
            sink.emit(err.to_diagnostic());
            Ok(None)
        }
    }
}

/// Renders all diagnostics from a sink to stderr using the terminal renderer.
///
/// Returns the number of diagnostics rendered.
pub fn render_diagnostics(sink: &DiagnosticSink, color: bool) -> usize {
    let diagnostics = sink.diagnostics();
    let renderer = TerminalRenderer::new(color);
    for diag in &diagnostics {
        eprint!("{}", renderer.render(diag));
    }
    if !diagnostics.is_empty() {
        eprint!("{}", renderer.render_summary(&sink.by_instance()));
    }
    diagnostics.len()
}
