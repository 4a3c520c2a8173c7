//! Hierarchy walk collecting file lists with partial results.

use strata_diagnostics::Diagnostic;
use strata_elaborate::ModuleRegistry;
use strata_ir::{Design, HierPath, ModRef, ModuleInstance};
use tracing::{debug, warn};

use crate::errors::FileListError;
use crate::resolve::{FileInfo, FileListOptions, FileListResolver};

/// Resolved file list of one instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileListEntry {
    /// Instance path.
    pub path: HierPath,
    /// Generated module name.
    pub modname: String,
    /// Declaration reference.
    pub modref: ModRef,
    /// The resolved file list.
    pub info: FileInfo,
}

/// An instance whose file list could not be resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileListFailure {
    /// Instance path.
    pub path: HierPath,
    /// Generated module name.
    pub modname: String,
    /// What went wrong.
    pub error: FileListError,
}

/// Result of a hierarchy walk: every resolved entry and every failure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileListReport {
    /// Entries in post-order.
    pub entries: Vec<FileListEntry>,
    /// Failed instances in post-order.
    pub failures: Vec<FileListFailure>,
}

impl FileListReport {
    /// Returns `true` if no instance failed.
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    /// Entry of the instance at `path`.
    pub fn get(&self, path: &str) -> Option<&FileListEntry> {
        self.entries.iter().find(|e| e.path.to_string() == path)
    }

    /// One diagnostic per failure.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.failures
            .iter()
            .map(|f| f.error.to_diagnostic(&f.path))
            .collect()
    }
}

impl FileListResolver<'_> {
    /// Collects the file lists of `design`, children before parents.
    ///
    /// Each module name is visited once, and instances below a leaf rule
    /// are skipped. A failing instance is recorded and the walk continues.
    pub fn collect(&self, design: &Design) -> FileListReport {
        let stop = |inst: &ModuleInstance| self.is_leaf(inst);
        let mut report = FileListReport::default();
        for inst in design.top.post_order_with(&stop, true) {
            match self.resolve(inst) {
                Ok(Some(info)) => {
                    debug!(path = %inst.path, gen = %info.gen, "file list resolved");
                    report.entries.push(FileListEntry {
                        path: inst.path.clone(),
                        modname: inst.modname.clone(),
                        modref: inst.modref(),
                        info,
                    });
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(path = %inst.path, code = %error.code(), "{error}");
                    report.failures.push(FileListFailure {
                        path: inst.path.clone(),
                        modname: inst.modname.clone(),
                        error,
                    });
                }
            }
        }
        report
    }
}

/// Collects the file lists of `design` with templates located on the
/// filesystem.
pub fn collect_filelists(
    design: &Design,
    registry: &ModuleRegistry,
    options: FileListOptions,
) -> FileListReport {
    FileListResolver::new(registry, options).collect(design)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::MemoryLocator;
    use std::path::PathBuf;
    use strata_elaborate::Elaborator;
    use strata_ir::{FileListRule, GenMode, InstDecl, ModuleBuilder};

    fn registry() -> ModuleRegistry {
        let mut leaf = ModuleBuilder::new(ModRef::new("lib", "leaf"));
        leaf.filelist(FileListRule {
            filepaths: vec!["{mod.modname}.sv".to_string()],
            ..FileListRule::new("hdl")
        });
        let mut ip = ModuleBuilder::new(ModRef::new("lib", "ip"));
        ip.filelist(FileListRule {
            filepaths: vec!["ip.sv".to_string()],
            is_leaf: true,
            ..FileListRule::new("hdl")
        })
        .inst(InstDecl::new("u_hidden", ModRef::new("lib", "leaf")))
        .unwrap();
        let mut gen = ModuleBuilder::new(ModRef::new("lib", "gen"));
        gen.filelist(FileListRule {
            gen: GenMode::Full,
            filepaths: vec!["gen.sv".to_string()],
            template_filepaths: vec!["missing.mako".to_string()],
            ..FileListRule::new("hdl")
        });
        let mut top = ModuleBuilder::new(ModRef::new("lib", "top"));
        top.filelist(FileListRule {
            filepaths: vec!["top.sv".to_string()],
            ..FileListRule::new("hdl")
        })
        .inst(InstDecl::new("u_a", ModRef::new("lib", "leaf")))
        .unwrap()
        .inst(InstDecl::new("u_b", ModRef::new("lib", "leaf")))
        .unwrap()
        .inst(InstDecl::new("u_ip", ModRef::new("lib", "ip")))
        .unwrap()
        .inst(InstDecl::new("u_gen", ModRef::new("lib", "gen")))
        .unwrap();
        let mut registry = ModuleRegistry::new();
        for b in [leaf, ip, gen, top] {
            registry.add(b.build()).unwrap();
        }
        registry
    }

    #[test]
    fn post_order_unique_with_partial_failures() {
        let registry = registry();
        let design = Elaborator::new(&registry)
            .elaborate_module(ModRef::new("lib", "top"))
            .unwrap();
        let options = FileListOptions {
            root: Some(PathBuf::from("/prj")),
            ..FileListOptions::default()
        };
        let report = FileListResolver::new(&registry, options)
            .with_locator(MemoryLocator::default())
            .collect(&design);
        let paths: Vec<String> = report.entries.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["top/u_a", "top/u_ip", "top"]);
        assert_eq!(
            report.get("top/u_a").unwrap().info.filepaths,
            vec![PathBuf::from("/prj/lib/leaf.sv")]
        );
        assert!(!report.is_ok());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path.to_string(), "top/u_gen");
        let diags = report.diagnostics();
        assert_eq!(diags[0].code.to_string(), "E301");
        assert_eq!(diags[0].path, Some(HierPath::root("top").child("u_gen")));
    }

    #[test]
    fn unknown_rule_name_yields_nothing() {
        let registry = registry();
        let design = Elaborator::new(&registry)
            .elaborate_module(ModRef::new("lib", "top"))
            .unwrap();
        let report = collect_filelists(&design, &registry, FileListOptions::new("docs"));
        assert!(report.entries.is_empty());
        assert!(report.is_ok());
    }
}
