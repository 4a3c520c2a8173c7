//! `strata ls`: lists the libraries and modules on the library path.

use std::error::Error;

use glob::Pattern;
use strata_elaborate::ModuleRegistry;
use strata_library::LibraryInfo;

use crate::pipeline::load_project;
use crate::{GlobalArgs, LsArgs};

/// Renders the listing, keeping modules whose `lib.module` name matches
/// `pattern`. Libraries without a matching module are omitted.
pub fn listing(
    libraries: &[LibraryInfo],
    registry: &ModuleRegistry,
    pattern: Option<&Pattern>,
) -> String {
    let mut out = String::new();
    for library in libraries {
        let modules: Vec<_> = library
            .modules
            .iter()
            .filter(|modref| pattern.map_or(true, |p| p.matches(&modref.to_string())))
            .collect();
        if modules.is_empty() {
            continue;
        }
        out.push_str(&library.name);
        if !library.description.is_empty() {
            out.push_str(&format!(" - {}", library.description));
        }
        out.push('\n');

        let width = modules
            .iter()
            .map(|m| m.to_string().len())
            .max()
            .unwrap_or(0);
        for modref in modules {
            let title = registry
                .get(modref)
                .and_then(|decl| decl.title.clone())
                .unwrap_or_default();
            let line = format!("  {:<width$}  {title}", modref.to_string());
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }
    out
}

/// Runs the `strata ls` command.
pub fn run(args: &LsArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let pattern = args.pattern.as_deref().map(Pattern::new).transpose()?;
    let project = load_project(global)?;
    print!(
        "{}",
        listing(&project.libraries, &project.registry, pattern.as_ref())
    );
    Ok(0)
}
