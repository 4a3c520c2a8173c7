//! Per-instance file-list resolution.
//!
//! The rules of an instance come from the first declaration in its base
//! chain (most derived first) with a rule of the requested name. Templates
//! are gathered from every declaration in the chain, derived first, and
//! resolved relative to the declaration that lists them.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use strata_elaborate::ModuleRegistry;
use strata_ir::{FileListRule, GenMode, ModuleDecl, ModuleInstance};

use crate::errors::FileListError;
use crate::locator::{FsLocator, TemplateLocator};
use crate::placeholder::{cls_placeholder, expand_env, mod_placeholder, substitute};

/// What to resolve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileListOptions {
    /// Rule name, e.g. `hdl`.
    pub name: String,
    /// Implementation target matched against rule targets.
    pub target: Option<String>,
    /// Project root; relative declaration directories and libraries
    /// without a directory resolve below it.
    pub root: Option<PathBuf>,
    /// Template search path.
    pub template_paths: Vec<PathBuf>,
    /// Expand `$VAR` references from the environment.
    pub replace_envvars: bool,
}

impl FileListOptions {
    /// Options for the rule set `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: None,
            root: None,
            template_paths: Vec::new(),
            replace_envvars: false,
        }
    }
}

impl Default for FileListOptions {
    fn default() -> Self {
        Self::new("hdl")
    }
}

/// Resolved file list of one instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    /// Rule name.
    pub name: String,
    /// Generation mode.
    pub gen: GenMode,
    /// Target filter of the applied rule.
    pub target: Option<String>,
    /// Include directories.
    pub inc_dirs: Vec<PathBuf>,
    /// Include files.
    pub inc_filepaths: Vec<PathBuf>,
    /// Source files.
    pub filepaths: Vec<PathBuf>,
    /// Include directories of dependencies.
    pub dep_inc_dirs: Vec<PathBuf>,
    /// Dependency files.
    pub dep_filepaths: Vec<PathBuf>,
    /// Located templates for the source files.
    pub template_filepaths: Vec<PathBuf>,
    /// Located templates for the include files.
    pub inc_template_filepaths: Vec<PathBuf>,
    /// Sub-instances contribute nothing.
    pub is_leaf: bool,
}

impl FileInfo {
    fn new(rule: &FileListRule, is_leaf: bool) -> Self {
        Self {
            name: rule.name.clone(),
            gen: rule.gen,
            target: rule.target.clone(),
            inc_dirs: Vec::new(),
            inc_filepaths: Vec::new(),
            filepaths: Vec::new(),
            dep_inc_dirs: Vec::new(),
            dep_filepaths: Vec::new(),
            template_filepaths: Vec::new(),
            inc_template_filepaths: Vec::new(),
            is_leaf,
        }
    }

    /// Files a generator writes: source and include files unless the mode
    /// is [`GenMode::No`].
    pub fn generated_filepaths(&self) -> Vec<&Path> {
        if self.gen == GenMode::No {
            return Vec::new();
        }
        self.inc_filepaths
            .iter()
            .chain(&self.filepaths)
            .map(PathBuf::as_path)
            .collect()
    }
}

/// Rules named `name` that apply to `target`, in order.
///
/// Collection continues past a matching rule only while it has `merge` set.
pub fn search_rules<'a>(
    rules: &'a [FileListRule],
    name: &str,
    target: Option<&str>,
) -> Vec<&'a FileListRule> {
    let mut found = Vec::new();
    for rule in rules {
        if rule.name != name || !rule.matches_target(target) {
            continue;
        }
        found.push(rule);
        if !rule.merge {
            break;
        }
    }
    found
}

/// Removes `.` and resolvable `..` components without touching the
/// filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn push_unique(paths: &mut Vec<PathBuf>, path: PathBuf) {
    if !paths.contains(&path) {
        paths.push(path);
    }
}

/// Resolves file lists against a registry.
pub struct FileListResolver<'r> {
    registry: &'r ModuleRegistry,
    options: FileListOptions,
    locator: Box<dyn TemplateLocator + 'r>,
}

impl<'r> FileListResolver<'r> {
    /// Resolver locating templates on the filesystem.
    pub fn new(registry: &'r ModuleRegistry, options: FileListOptions) -> Self {
        let locator = FsLocator::new(options.template_paths.clone());
        Self {
            registry,
            options,
            locator: Box::new(locator),
        }
    }

    /// Replaces the template locator.
    pub fn with_locator(mut self, locator: impl TemplateLocator + 'r) -> Self {
        self.locator = Box::new(locator);
        self
    }

    /// The options in use.
    pub fn options(&self) -> &FileListOptions {
        &self.options
    }

    fn target(&self) -> Option<&str> {
        self.options.target.as_deref()
    }

    fn mod_rules<'a>(&self, chain: &'a [Arc<ModuleDecl>]) -> Vec<&'a FileListRule> {
        chain
            .iter()
            .map(|decl| search_rules(&decl.filelists, &self.options.name, self.target()))
            .find(|rules| !rules.is_empty())
            .unwrap_or_default()
    }

    /// Returns `true` if a matching rule of `inst` is a leaf rule.
    pub fn is_leaf(&self, inst: &ModuleInstance) -> bool {
        let chain = self.registry.base_chain(&inst.decl);
        self.mod_rules(&chain).iter().any(|rule| rule.is_leaf)
    }

    /// Directory relative paths of `decl` resolve against.
    fn anchor(&self, decl: &ModuleDecl) -> Option<PathBuf> {
        let root = self.options.root.as_deref();
        match (&decl.basedir, root) {
            (Some(dir), Some(root)) if dir.is_relative() => Some(root.join(dir)),
            (Some(dir), _) => Some(dir.clone()),
            (None, Some(root)) => Some(root.join(decl.libname().as_str())),
            (None, None) => None,
        }
    }

    fn expand(
        &self,
        text: &str,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<String, FileListError> {
        let text = substitute(text, lookup)?;
        if self.options.replace_envvars {
            expand_env(&text, &|name: &str| std::env::var(name).ok())
        } else {
            Ok(text)
        }
    }

    fn path(
        &self,
        text: &str,
        lookup: &dyn Fn(&str) -> Option<String>,
        anchor: Option<&Path>,
    ) -> Result<PathBuf, FileListError> {
        let expanded = self.expand(text, lookup)?;
        let path = PathBuf::from(&expanded);
        if path.is_absolute() || expanded.starts_with('$') {
            return Ok(normalize(&path));
        }
        let anchor = anchor.ok_or_else(|| FileListError::UnanchoredPath { path: path.clone() })?;
        Ok(normalize(&anchor.join(path)))
    }

    fn paths(
        &self,
        out: &mut Vec<PathBuf>,
        texts: &[String],
        lookup: &dyn Fn(&str) -> Option<String>,
        anchor: Option<&Path>,
    ) -> Result<(), FileListError> {
        for text in texts {
            push_unique(out, self.path(text, lookup, anchor)?);
        }
        Ok(())
    }

    fn templates(
        &self,
        out: &mut Vec<PathBuf>,
        texts: &[String],
        decl: &ModuleDecl,
    ) -> Result<(), FileListError> {
        let lookup = cls_placeholder(decl);
        let anchor = self.anchor(decl);
        for text in texts {
            let template = PathBuf::from(self.expand(text, &lookup)?);
            push_unique(out, self.locator.locate(&template, anchor.as_deref())?);
        }
        Ok(())
    }

    /// Resolves the file list of `inst`; `None` if no rule applies.
    pub fn resolve(&self, inst: &ModuleInstance) -> Result<Option<FileInfo>, FileListError> {
        let chain = self.registry.base_chain(&inst.decl);
        let rules = self.mod_rules(&chain);
        let Some(last) = rules.last() else {
            return Ok(None);
        };
        let mut info = FileInfo::new(last, rules.iter().any(|rule| rule.is_leaf));

        let lookup = mod_placeholder(inst);
        let anchor = self.anchor(&inst.decl);
        let anchor = anchor.as_deref();
        for rule in &rules {
            self.paths(&mut info.inc_dirs, &rule.inc_dirs, &lookup, anchor)?;
            self.paths(&mut info.filepaths, &rule.filepaths, &lookup, anchor)?;
            self.paths(&mut info.inc_filepaths, &rule.inc_filepaths, &lookup, anchor)?;
            self.paths(&mut info.dep_inc_dirs, &rule.dep_inc_dirs, &lookup, anchor)?;
            self.paths(&mut info.dep_filepaths, &rule.dep_filepaths, &lookup, anchor)?;
        }

        for decl in &chain {
            for rule in search_rules(&decl.filelists, &self.options.name, self.target()) {
                self.templates(&mut info.template_filepaths, &rule.template_filepaths, decl)?;
                self.templates(
                    &mut info.inc_template_filepaths,
                    &rule.inc_template_filepaths,
                    decl,
                )?;
            }
        }
        Ok(Some(info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::MemoryLocator;
    use strata_elaborate::Elaborator;
    use strata_ir::{Design, InstDecl, ModRef, ModuleBuilder};

    fn rule(gen: GenMode) -> FileListRule {
        FileListRule {
            gen,
            ..FileListRule::new("hdl")
        }
    }

    fn registry() -> ModuleRegistry {
        let mut base = ModuleBuilder::new(ModRef::new("glbl_lib", "fifo"));
        base.filelist(FileListRule {
            filepaths: vec!["rtl/{mod.modname}.sv".to_string()],
            template_filepaths: vec!["fifo.sv.mako".to_string()],
            ..rule(GenMode::Full)
        });

        let mut tailored = ModuleBuilder::new(ModRef::new("uart_lib", "uart_fifo"));
        tailored.base(ModRef::new("glbl_lib", "fifo")).filelist(FileListRule {
            template_filepaths: vec![
                "{cls.modname}.sv.mako".to_string(),
                "fifo.sv.mako".to_string(),
            ],
            ..rule(GenMode::Inplace)
        });

        let mut top = ModuleBuilder::new(ModRef::new("uart_lib", "uart"));
        top.basedir("/design/uart_lib/uart")
            .filelist(FileListRule {
                target: Some("asic".to_string()),
                filepaths: vec!["asic/{mod.modname}.sv".to_string()],
                ..rule(GenMode::No)
            })
            .filelist(FileListRule {
                inc_dirs: vec!["inc".to_string()],
                filepaths: vec!["./rtl/../rtl/{mod.modname}.sv".to_string()],
                dep_filepaths: vec!["/opt/cells/cells.v".to_string()],
                merge: true,
                ..rule(GenMode::No)
            })
            .filelist(FileListRule {
                filepaths: vec!["rtl/{mod.modname}_pkg.sv".to_string()],
                ..rule(GenMode::No)
            })
            .inst(InstDecl::new("u_fifo", ModRef::new("uart_lib", "uart_fifo")))
            .unwrap();

        let mut registry = ModuleRegistry::new();
        for b in [base, tailored, top] {
            registry.add(b.build()).unwrap();
        }
        registry
    }

    fn options() -> FileListOptions {
        FileListOptions {
            root: Some(PathBuf::from("/design")),
            template_paths: vec![PathBuf::from("/templates")],
            ..FileListOptions::default()
        }
    }

    fn locator() -> MemoryLocator {
        MemoryLocator::new(vec![PathBuf::from("/templates")])
            .with_file("/design/uart_lib/uart_fifo.sv.mako")
            .with_file("/design/glbl_lib/fifo.sv.mako")
            .with_file("/templates/fifo.sv.mako")
    }

    fn design(registry: &ModuleRegistry) -> Design {
        Elaborator::new(registry)
            .elaborate_module(ModRef::new("uart_lib", "uart"))
            .unwrap()
    }

    #[test]
    fn merged_rules_accumulate_paths() {
        let registry = registry();
        let design = design(&registry);
        let options = FileListOptions {
            target: Some("sim".to_string()),
            ..options()
        };
        let resolver = FileListResolver::new(&registry, options).with_locator(locator());
        let info = resolver.resolve(&design.top).unwrap().unwrap();
        assert_eq!(info.gen, GenMode::No);
        assert_eq!(info.inc_dirs, vec![PathBuf::from("/design/uart_lib/uart/inc")]);
        assert_eq!(
            info.filepaths,
            vec![
                PathBuf::from("/design/uart_lib/uart/rtl/uart.sv"),
                PathBuf::from("/design/uart_lib/uart/rtl/uart_pkg.sv"),
            ]
        );
        assert_eq!(info.dep_filepaths, vec![PathBuf::from("/opt/cells/cells.v")]);
        assert!(info.generated_filepaths().is_empty());
    }

    #[test]
    fn target_selects_rule() {
        let registry = registry();
        let design = design(&registry);
        let options = FileListOptions {
            target: Some("asic".to_string()),
            ..options()
        };
        let resolver = FileListResolver::new(&registry, options).with_locator(locator());
        let info = resolver.resolve(&design.top).unwrap().unwrap();
        assert_eq!(info.target.as_deref(), Some("asic"));
        assert_eq!(
            info.filepaths,
            vec![PathBuf::from("/design/uart_lib/uart/asic/uart.sv")]
        );
    }

    #[test]
    fn tailored_rule_overrides_base() {
        let registry = registry();
        let design = design(&registry);
        let resolver = FileListResolver::new(&registry, options()).with_locator(locator());
        let u_fifo = design.find("uart/u_fifo").unwrap();
        let info = resolver.resolve(u_fifo).unwrap().unwrap();
        assert_eq!(info.gen, GenMode::Inplace);
        assert!(info.filepaths.is_empty());
        assert_eq!(
            info.template_filepaths,
            vec![
                PathBuf::from("/design/uart_lib/uart_fifo.sv.mako"),
                PathBuf::from("/templates/fifo.sv.mako"),
                PathBuf::from("/design/glbl_lib/fifo.sv.mako"),
            ]
        );
    }

    #[test]
    fn missing_template_fails() {
        let registry = registry();
        let design = design(&registry);
        let resolver = FileListResolver::new(&registry, options())
            .with_locator(MemoryLocator::new(vec![PathBuf::from("/templates")]));
        let err = resolver
            .resolve(design.find("uart/u_fifo").unwrap())
            .unwrap_err();
        assert!(matches!(err, FileListError::TemplateNotFound { .. }));
    }

    #[test]
    fn relative_paths_need_an_anchor() {
        let options = FileListOptions {
            template_paths: vec![PathBuf::from("/templates")],
            ..FileListOptions::default()
        };
        let mut b = ModuleBuilder::new(ModRef::new("lib", "bare"));
        b.filelist(FileListRule {
            filepaths: vec!["bare.sv".to_string()],
            ..rule(GenMode::No)
        });
        let mut registry = ModuleRegistry::new();
        registry.add(b.build()).unwrap();
        let design = Elaborator::new(&registry)
            .elaborate_module(ModRef::new("lib", "bare"))
            .unwrap();
        let err = FileListResolver::new(&registry, options)
            .resolve(&design.top)
            .unwrap_err();
        assert_eq!(
            err,
            FileListError::UnanchoredPath {
                path: PathBuf::from("bare.sv")
            }
        );
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(normalize(Path::new("/..")), PathBuf::from("/"));
    }
}
