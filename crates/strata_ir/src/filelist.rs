//! File-list rules attached to module declarations.

use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the files of a module are produced.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenMode {
    /// Hand-maintained files, never generated.
    #[default]
    No,
    /// Fully regenerated.
    Full,
    /// Regenerated in place, keeping manually edited regions.
    Inplace,
}

impl fmt::Display for GenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenMode::No => write!(f, "no"),
            GenMode::Full => write!(f, "full"),
            GenMode::Inplace => write!(f, "inplace"),
        }
    }
}

/// A named policy listing the files of a module.
///
/// Path entries are kept as written, placeholders included, and resolved
/// per instance by the file-list engine.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileListRule {
    /// Rule set name, e.g. `hdl`.
    pub name: String,
    /// Generation mode.
    pub gen: GenMode,
    /// Target filter; whitespace or comma separated globs, `!` negates.
    pub target: Option<String>,
    /// Include directories.
    pub inc_dirs: Vec<String>,
    /// Include files.
    pub inc_filepaths: Vec<String>,
    /// Source files.
    pub filepaths: Vec<String>,
    /// Include directories of dependencies.
    pub dep_inc_dirs: Vec<String>,
    /// Dependency files.
    pub dep_filepaths: Vec<String>,
    /// Templates rendering the source files.
    pub template_filepaths: Vec<String>,
    /// Templates rendering the include files.
    pub inc_template_filepaths: Vec<String>,
    /// Do not collect file lists of sub-instances.
    pub is_leaf: bool,
    /// Also apply the next matching rule of the same name.
    pub merge: bool,
}

impl FileListRule {
    /// An empty rule named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns `true` if the rule applies to `target`.
    ///
    /// A rule without a filter and a request without a target always match.
    pub fn matches_target(&self, target: Option<&str>) -> bool {
        match (&self.target, target) {
            (Some(filter), Some(target)) => target_filter(filter, target),
            _ => true,
        }
    }
}

fn target_filter(filter: &str, target: &str) -> bool {
    let mut included = None;
    for item in filter.split(|c: char| c == ',' || c.is_whitespace()) {
        if item.is_empty() {
            continue;
        }
        if let Some(negated) = item.strip_prefix('!') {
            if glob_match(negated, target) {
                return false;
            }
        } else {
            let hit = glob_match(item, target);
            included = Some(included.unwrap_or(false) || hit);
        }
    }
    included.unwrap_or(true)
}

fn glob_match(pattern: &str, text: &str) -> bool {
    Pattern::new(pattern).map_or(pattern == text, |p| p.matches(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(target: Option<&str>) -> FileListRule {
        FileListRule {
            target: target.map(str::to_string),
            ..FileListRule::new("hdl")
        }
    }

    #[test]
    fn no_filter_always_matches() {
        assert!(rule(None).matches_target(Some("asic")));
        assert!(rule(Some("fpga")).matches_target(None));
    }

    #[test]
    fn glob_and_negation() {
        assert!(rule(Some("fpga*")).matches_target(Some("fpga_xilinx")));
        assert!(!rule(Some("fpga*")).matches_target(Some("asic")));
        assert!(rule(Some("!asic")).matches_target(Some("fpga")));
        assert!(!rule(Some("!asic")).matches_target(Some("asic")));
        assert!(rule(Some("fpga, sim")).matches_target(Some("sim")));
        assert!(!rule(Some("* !sim")).matches_target(Some("sim")));
    }

    #[test]
    fn gen_mode_rendering() {
        assert_eq!(GenMode::Inplace.to_string(), "inplace");
        assert_eq!(GenMode::default(), GenMode::No);
        let parsed: GenMode = serde_json::from_str("\"full\"").unwrap();
        assert_eq!(parsed, GenMode::Full);
    }
}
