//! Template lookup next to declarations and on a search path.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::errors::FileListError;

/// Finds template files.
///
/// A relative template is looked up in the contributing declaration's
/// directory first and then in every search path, in order.
pub trait TemplateLocator: Send + Sync {
    /// Directories searched after the declaration directory.
    fn search_paths(&self) -> &[PathBuf];

    /// Returns `true` if `path` is an existing file.
    fn exists(&self, path: &Path) -> bool;

    /// Locates `template`.
    fn locate(&self, template: &Path, basedir: Option<&Path>) -> Result<PathBuf, FileListError> {
        if template.is_absolute() {
            if self.exists(template) {
                return Ok(template.to_path_buf());
            }
            return Err(FileListError::TemplateNotFound {
                template: template.to_path_buf(),
                searched: Vec::new(),
            });
        }
        let dirs: Vec<PathBuf> = basedir
            .map(Path::to_path_buf)
            .into_iter()
            .chain(self.search_paths().iter().cloned())
            .collect();
        dirs.iter()
            .map(|dir| crate::resolve::normalize(&dir.join(template)))
            .find(|candidate| self.exists(candidate))
            .ok_or_else(|| FileListError::TemplateNotFound {
                template: template.to_path_buf(),
                searched: dirs.clone(),
            })
    }
}

/// Looks templates up on the filesystem.
#[derive(Clone, Debug, Default)]
pub struct FsLocator {
    search_paths: Vec<PathBuf>,
}

impl FsLocator {
    /// Locator with the given search paths.
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }
}

impl TemplateLocator for FsLocator {
    fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Looks templates up in a fixed set of paths.
#[derive(Clone, Debug, Default)]
pub struct MemoryLocator {
    search_paths: Vec<PathBuf>,
    files: BTreeSet<PathBuf>,
}

impl MemoryLocator {
    /// Empty locator with the given search paths.
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            files: BTreeSet::new(),
        }
    }

    /// Registers an existing template file.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.insert(path.into());
        self
    }
}

impl TemplateLocator for MemoryLocator {
    fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains(path)
    }
}
