//! Recursive elaboration of a top-module reference into a [`Design`].
//!
//! Every instance walks `Declared -> Instantiated -> ParametersBound ->
//! Elaborated`. A failure at any stage aborts the whole request; no partial
//! design is returned.

use std::sync::Arc;

use indexmap::IndexMap;
use rayon::prelude::*;
use strata_common::Ident;
use strata_ir::{
    Design, HierPath, InstDecl, ModConfig, ModRef, ModuleDecl, ModuleInstance, Value,
};
use tracing::{debug, warn};

use crate::connect::ConnectScope;
use crate::context::ElabContext;
use crate::errors::{ElabError, ElabErrorKind, Stage};
use crate::params::{bind_params, resolve_namespace, BoundParams};
use crate::registry::ModuleRegistry;
use crate::topref::TopModRef;

/// Builds instance trees from the declarations of a registry.
#[derive(Clone, Copy, Debug)]
pub struct Elaborator<'r> {
    registry: &'r ModuleRegistry,
    parallel: bool,
}

/// Names inherited by core modules from their parent.
#[derive(Clone, Copy)]
struct Naming<'a> {
    modname: &'a str,
    topmodname: &'a str,
}

/// Where and how one declaration is placed in the hierarchy.
struct Slot<'a> {
    path: HierPath,
    name: Ident,
    overrides: IndexMap<Ident, Value>,
    config: Option<ModConfig>,
    parent: Option<Naming<'a>>,
    dut: Option<ModuleInstance>,
}

fn fail(path: &HierPath, stage: Stage, kind: impl Into<ElabErrorKind>) -> ElabError {
    let err = ElabError::new(path.clone(), stage, kind);
    warn!(path = %path, code = %err.code(), "{}", err.kind);
    err
}

fn join_names(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (_, true) => a.to_string(),
        _ => format!("{a}_{b}"),
    }
}

/// Moves `inst` and its subtree to `path`.
fn rebase(mut inst: ModuleInstance, path: HierPath) -> ModuleInstance {
    inst.children = inst
        .children
        .into_iter()
        .map(|child| {
            let child_path = path.child(child.name);
            rebase(child, child_path)
        })
        .collect();
    inst.path = path;
    inst
}

impl<'r> Elaborator<'r> {
    /// Elaborator over `registry`, sequential by default.
    pub fn new(registry: &'r ModuleRegistry) -> Self {
        Self {
            registry,
            parallel: false,
        }
    }

    /// Elaborates sibling subtrees on the rayon thread pool.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Elaborates a plain top module.
    pub fn elaborate_module(&self, top: ModRef) -> Result<Design, ElabError> {
        self.elaborate(&TopModRef::new(top))
    }

    /// Elaborates `topref`.
    ///
    /// With a sub-module pattern the matching instance becomes the root of
    /// the design. With a testbench the selected module is placed as the
    /// first child of the testbench instance, named `dut`.
    pub fn elaborate(&self, topref: &TopModRef) -> Result<Design, ElabError> {
        let unplaced = HierPath::default();
        let decl = self
            .registry
            .lookup(&topref.top)
            .map_err(|kind| fail(&unplaced, Stage::Declared, kind))?;
        let mut top = self.instantiate(
            &ElabContext::new(),
            decl.clone(),
            Slot {
                path: HierPath::root(decl.name()),
                name: decl.name(),
                overrides: IndexMap::new(),
                config: decl.config.clone(),
                parent: None,
                dut: None,
            },
        )?;

        if let Some(pattern) = &topref.sub {
            let design = Design::new(top);
            let found = design.get_mod(pattern).map_err(|err| {
                fail(
                    &design.top.path,
                    Stage::Elaborated,
                    ElabErrorKind::SubmoduleNotFound {
                        pattern: pattern.clone(),
                        reason: err.to_string(),
                    },
                )
            })?;
            let root = HierPath::root(found.name);
            top = rebase(found.clone(), root);
        }

        if let Some(tb) = topref.tb {
            let tb_decl = self
                .registry
                .lookup(&tb)
                .map_err(|kind| fail(&unplaced, Stage::Declared, kind))?;
            let tb_path = HierPath::root(tb_decl.name());
            if !tb_decl.flags.is_tb {
                return Err(fail(
                    &tb_path,
                    Stage::Declared,
                    ElabErrorKind::NotATestbench { modref: tb },
                ));
            }
            let dut_name = Ident::new("dut");
            let mut dut = rebase(top, tb_path.child(dut_name));
            dut.name = dut_name;
            top = self.instantiate(
                &ElabContext::new(),
                tb_decl.clone(),
                Slot {
                    path: tb_path,
                    name: tb_decl.name(),
                    overrides: IndexMap::new(),
                    config: tb_decl.config.clone(),
                    parent: None,
                    dut: Some(dut),
                },
            )?;
        }

        Ok(Design::new(top))
    }

    fn instantiate(
        &self,
        ctx: &ElabContext,
        decl: Arc<ModuleDecl>,
        slot: Slot<'_>,
    ) -> Result<ModuleInstance, ElabError> {
        let path = slot.path;
        let ctx = ctx
            .enter(decl.modref)
            .map_err(|kind| fail(&path, Stage::Declared, kind))?;
        debug!(path = %path, module = %decl.modref, "instantiated");

        let bound = bind_params(&decl, &slot.overrides, slot.config.as_ref())
            .map_err(|kind| fail(&path, Stage::Instantiated, kind))?;
        debug!(path = %path, params = bound.values.len(), "parameters bound");

        let namespace = resolve_namespace(&decl, &bound)
            .map_err(|err| fail(&path, Stage::ParametersBound, err))?;

        let name = decl.name();
        let (modname, topmodname) = match (&slot.dut, slot.parent) {
            (Some(dut), _) => (join_names(name.as_str(), &dut.modname), name.to_string()),
            (None, Some(parent)) if decl.flags.is_core => {
                let inst = slot.name.as_str();
                let basename = inst.strip_prefix("u_").unwrap_or(inst);
                (
                    join_names(parent.modname, basename),
                    parent.topmodname.to_string(),
                )
            }
            (None, _) => {
                let modname = match &slot.config {
                    Some(config) => config.modname(name.as_str()),
                    None => name.to_string(),
                };
                (modname, name.to_string())
            }
        };

        let naming = Naming {
            modname: &modname,
            topmodname: &topmodname,
        };
        let elaborated: Vec<Result<ModuleInstance, ElabError>> = if self.parallel {
            decl.insts
                .par_iter()
                .map(|inst| self.instantiate_child(&ctx, &path, &bound, naming, inst))
                .collect()
        } else {
            decl.insts
                .iter()
                .map(|inst| self.instantiate_child(&ctx, &path, &bound, naming, inst))
                .collect()
        };
        let mut children = Vec::with_capacity(elaborated.len() + 1);
        children.extend(slot.dut);
        for child in elaborated {
            children.push(child?);
        }

        let scope = ConnectScope {
            namespace: &namespace,
            bindings: &bound.bindings,
            children: &children,
        };
        let connections = scope
            .validate(&decl.assigns, &decl.muxes)
            .map_err(|kind| fail(&path, Stage::ParametersBound, kind))?;
        debug!(path = %path, modname = %modname, "elaborated");

        Ok(ModuleInstance {
            decl,
            name: slot.name,
            path,
            modname,
            topmodname,
            config: slot.config,
            params: bound.values,
            namespace,
            children,
            connections,
        })
    }

    fn instantiate_child(
        &self,
        ctx: &ElabContext,
        parent_path: &HierPath,
        parent_params: &BoundParams,
        naming: Naming<'_>,
        inst: &InstDecl,
    ) -> Result<ModuleInstance, ElabError> {
        let path = parent_path.child(inst.name);
        let decl = self
            .registry
            .lookup(&inst.module)
            .map_err(|kind| fail(&path, Stage::Declared, kind))?;
        let mut overrides = IndexMap::new();
        for (name, expr) in &inst.overrides {
            let value = expr
                .evaluate_with(&parent_params.bindings)
                .map_err(|err| fail(&path, Stage::Declared, err))?;
            overrides.insert(*name, value);
        }
        let config = inst.config.clone().or_else(|| decl.config.clone());
        self.instantiate(
            ctx,
            decl,
            Slot {
                path,
                name: inst.name,
                overrides,
                config,
                parent: Some(naming),
                dut: None,
            },
        )
    }
}
