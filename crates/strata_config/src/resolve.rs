//! Search path resolution relative to the project directory.

use crate::types::ProjectConfig;
use std::path::{Path, PathBuf};

/// Environment variable holding extra library search paths (platform path list).
pub const PATHS_ENV_VAR: &str = "STRATA_PATHS";

/// Absolute search paths derived from a [`ProjectConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// The project root, used as the file-list report placeholder target.
    pub root: PathBuf,
    /// Library directories: configured entries first, then `STRATA_PATHS`.
    pub libraries: Vec<PathBuf>,
    /// Template search directories.
    pub templates: Vec<PathBuf>,
}

/// Resolves configured search paths against `project_dir`.
///
/// Relative entries are joined to the project directory; absolute entries are
/// kept. Entries from [`PATHS_ENV_VAR`] are appended to the library paths. When
/// no library path is configured at all, the project directory itself is used.
pub fn resolve_paths(config: &ProjectConfig, project_dir: &Path) -> ResolvedPaths {
    let env_paths = std::env::var_os(PATHS_ENV_VAR)
        .map(|value| std::env::split_paths(&value).collect::<Vec<_>>())
        .unwrap_or_default();
    resolve_with_extra(config, project_dir, env_paths)
}

fn resolve_with_extra(
    config: &ProjectConfig,
    project_dir: &Path,
    extra_libraries: Vec<PathBuf>,
) -> ResolvedPaths {
    let join = |entry: &String| {
        let path = Path::new(entry);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            project_dir.join(path)
        }
    };

    let mut libraries: Vec<PathBuf> = config.paths.libraries.iter().map(join).collect();
    libraries.extend(extra_libraries);
    if libraries.is_empty() {
        libraries.push(project_dir.to_path_buf());
    }

    ResolvedPaths {
        root: project_dir.to_path_buf(),
        libraries,
        templates: config.paths.templates.iter().map(join).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    fn config(paths: &str) -> ProjectConfig {
        let toml = format!("[project]\nname = \"p\"\ntop = \"a.b\"\n{paths}");
        load_config_from_str(&toml).unwrap()
    }

    #[test]
    fn relative_paths_join_project_dir() {
        let cfg = config("[paths]\nlibraries = [\"libs\"]\ntemplates = [\"tpl\"]\n");
        let resolved = resolve_with_extra(&cfg, Path::new("/prj"), Vec::new());
        assert_eq!(resolved.libraries, vec![PathBuf::from("/prj/libs")]);
        assert_eq!(resolved.templates, vec![PathBuf::from("/prj/tpl")]);
        assert_eq!(resolved.root, PathBuf::from("/prj"));
    }

    #[test]
    fn absolute_paths_kept() {
        let cfg = config("[paths]\nlibraries = [\"/opt/hdl\"]\n");
        let resolved = resolve_with_extra(&cfg, Path::new("/prj"), Vec::new());
        assert_eq!(resolved.libraries, vec![PathBuf::from("/opt/hdl")]);
    }

    #[test]
    fn extra_paths_appended() {
        let cfg = config("[paths]\nlibraries = \"libs\"\n");
        let resolved =
            resolve_with_extra(&cfg, Path::new("/prj"), vec![PathBuf::from("/site/libs")]);
        assert_eq!(
            resolved.libraries,
            vec![PathBuf::from("/prj/libs"), PathBuf::from("/site/libs")]
        );
    }

    #[test]
    fn defaults_to_project_dir() {
        let cfg = config("");
        let resolved = resolve_with_extra(&cfg, Path::new("/prj"), Vec::new());
        assert_eq!(resolved.libraries, vec![PathBuf::from("/prj")]);
        assert!(resolved.templates.is_empty());
    }
}
