//! Conformance test helpers for strata.
//!
//! Loads the fixture projects under `fixtures/` through the same front half
//! as the CLI (configuration, search paths, libraries) and provides helpers
//! to pick apart the rendered reports in integration tests.

#![warn(missing_docs)]

use std::error::Error;
use std::path::{Path, PathBuf};

use strata_config::{ProjectConfig, ResolvedPaths};
use strata_elaborate::{Elaborator, ModuleRegistry, TopModRef};
use strata_filelist::{FileListOptions, RootMapper};
use strata_ir::Design;
use strata_library::LibraryInfo;

/// A loaded fixture project.
pub struct Fixture {
    /// Fixture directory, holding `strata.toml`.
    pub dir: PathBuf,
    /// The parsed configuration.
    pub config: ProjectConfig,
    /// Absolute search paths.
    pub paths: ResolvedPaths,
    /// All declarations of the fixture.
    pub registry: ModuleRegistry,
    /// The loaded libraries.
    pub libraries: Vec<LibraryInfo>,
}

/// Directory of the fixture `name`.
pub fn fixture_dir(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}

/// Loads the fixture `name`.
pub fn load_fixture(name: &str) -> Result<Fixture, Box<dyn Error>> {
    let dir = fixture_dir(name);
    let config = strata_config::load_config(&dir)?;
    let paths = strata_config::resolve_paths(&config, &dir);
    let (registry, libraries) = strata_library::load_registry(&paths.libraries)?;
    Ok(Fixture {
        dir,
        config,
        paths,
        registry,
        libraries,
    })
}

impl Fixture {
    /// Elaborates `top`, or the configured top when `None`.
    pub fn elaborate(&self, top: Option<&str>) -> Result<Design, Box<dyn Error>> {
        let top: TopModRef = top.unwrap_or(&self.config.project.top).parse()?;
        Ok(Elaborator::new(&self.registry).elaborate(&top)?)
    }

    /// File-list options of the configuration.
    pub fn filelist_options(&self) -> FileListOptions {
        let mut options = FileListOptions::new(self.config.filelist.name.as_str());
        options.target = self.config.filelist.target.clone();
        options.root = Some(self.paths.root.clone());
        options.template_paths = self.paths.templates.clone();
        options
    }

    /// Mapper replacing the fixture directory by the root placeholder.
    pub fn mapper(&self) -> RootMapper {
        RootMapper::new(
            Some(self.paths.root.clone()),
            self.config.filelist.root_placeholder.as_str(),
        )
    }
}

/// Rows of the markdown table below `### {section}` in a module-info
/// report, header and rule row excluded, cells trimmed.
///
/// Leading spaces of the first cell are kept, they carry the nesting level.
pub fn table_rows(report: &str, section: &str) -> Vec<Vec<String>> {
    let heading = format!("### {section}");
    report
        .lines()
        .skip_while(|line| *line != heading)
        .skip(1)
        .skip_while(|line| line.is_empty())
        .take_while(|line| line.starts_with('|'))
        .skip(2)
        .map(|line| {
            let inner = line.trim_start_matches("| ").trim_end_matches(" |");
            inner
                .split(" | ")
                .map(|cell| cell.trim_end().to_string())
                .collect()
        })
        .collect()
}
