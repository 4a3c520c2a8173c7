//! File-info report in text and JSON form.
//!
//! Paths below the project root are written relative to a placeholder
//! token such as `$PRJROOT`, so reports are stable across checkouts.

use std::path::{Path, PathBuf};

use serde::Serialize;
use strata_ir::GenMode;

use crate::collect::FileListReport;
use crate::errors::FileListError;

/// One instance of the file-info report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileInfoRecord {
    /// Instance path.
    pub path: String,
    /// Generated module name.
    pub modname: String,
    /// Declaration reference.
    pub module: String,
    /// Generation mode.
    pub gen: GenMode,
    /// Include directories.
    pub inc_dirs: Vec<String>,
    /// Source files, include files first.
    pub filepaths: Vec<String>,
    /// Dependency files.
    pub dep_filepaths: Vec<String>,
    /// Template files, include templates first.
    pub template_filepaths: Vec<String>,
    /// Sub-instances contribute nothing.
    pub is_leaf: bool,
}

/// Rewrites paths below `root` with the `placeholder` token.
#[derive(Clone, Debug)]
pub struct RootMapper {
    root: Option<PathBuf>,
    placeholder: String,
}

impl RootMapper {
    /// Mapper replacing `root` by `placeholder`.
    pub fn new(root: Option<PathBuf>, placeholder: impl Into<String>) -> Self {
        Self {
            root,
            placeholder: placeholder.into(),
        }
    }

    /// `path` with the root replaced.
    pub fn map(&self, path: &Path) -> String {
        let relative = self.root.as_deref().and_then(|root| path.strip_prefix(root).ok());
        match relative {
            Some(rest) if rest.as_os_str().is_empty() => self.placeholder.clone(),
            Some(rest) => format!("{}/{}", self.placeholder, rest.display()),
            None => path.display().to_string(),
        }
    }

    fn map_all<'a>(&self, paths: impl IntoIterator<Item = &'a PathBuf>) -> Vec<String> {
        paths.into_iter().map(|p| self.map(p)).collect()
    }
}

/// Builds the records of `report`.
pub fn records(report: &FileListReport, mapper: &RootMapper) -> Vec<FileInfoRecord> {
    report
        .entries
        .iter()
        .map(|entry| {
            let info = &entry.info;
            FileInfoRecord {
                path: entry.path.to_string(),
                modname: entry.modname.clone(),
                module: entry.modref.to_string(),
                gen: info.gen,
                inc_dirs: mapper.map_all(&info.inc_dirs),
                filepaths: mapper.map_all(info.inc_filepaths.iter().chain(&info.filepaths)),
                dep_filepaths: mapper.map_all(&info.dep_filepaths),
                template_filepaths: mapper.map_all(
                    info.inc_template_filepaths
                        .iter()
                        .chain(&info.template_filepaths),
                ),
                is_leaf: info.is_leaf,
            }
        })
        .collect()
}

fn list(out: &mut String, name: &str, items: &[String]) {
    if items.is_empty() {
        out.push_str(&format!("{name}: []\n"));
        return;
    }
    out.push_str(&format!("{name}:\n"));
    for item in items {
        out.push_str(&format!("  - {item}\n"));
    }
}

/// Renders `records` as text, one block per instance.
pub fn render_text(records: &[FileInfoRecord]) -> String {
    let blocks: Vec<String> = records
        .iter()
        .map(|record| {
            let mut out = format!("## {} ({})\n", record.path, record.modname);
            out.push_str(&format!("gen: {}\n", record.gen));
            list(&mut out, "inc_dirs", &record.inc_dirs);
            list(&mut out, "filepaths", &record.filepaths);
            list(&mut out, "dep_filepaths", &record.dep_filepaths);
            list(&mut out, "template_filepaths", &record.template_filepaths);
            out.push_str(&format!("is_leaf: {}\n", record.is_leaf));
            out
        })
        .collect();
    blocks.join("\n")
}

/// Renders `records` as a pretty-printed JSON array.
pub fn render_json(records: &[FileInfoRecord]) -> Result<String, FileListError> {
    serde_json::to_string_pretty(records).map_err(|err| FileListError::Serialize(err.to_string()))
}
