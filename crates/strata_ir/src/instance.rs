//! Elaborated module instances and the design tree.

use crate::error::IrError;
use crate::expr::{Bindings, Expr};
use crate::module::{ModConfig, ModRef, ModuleDecl};
use crate::namespace::Namespace;
use crate::slice::Slice;
use crate::value::Value;
use glob::Pattern;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use strata_common::Ident;

/// Instance names from the top instance down, joined by `/` for display.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct HierPath(Vec<Ident>);

impl HierPath {
    /// Path of a top instance.
    pub fn root(name: impl Into<Ident>) -> Self {
        Self(vec![name.into()])
    }

    /// Path of the child `name` below this one.
    pub fn child(&self, name: impl Into<Ident>) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.into());
        Self(segments)
    }

    /// Path segments, top first.
    pub fn segments(&self) -> &[Ident] {
        &self.0
    }

    /// Nesting depth; 1 for the top instance.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the empty path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if `self` is `ancestor` or lies below it.
    pub fn starts_with(&self, ancestor: &HierPath) -> bool {
        self.0.starts_with(&ancestor.0)
    }
}

impl fmt::Display for HierPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl Serialize for HierPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One side of a validated leaf-level connection.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum LeafEndpoint {
    /// Flattened leaf of the instance itself.
    Local(Ident),
    /// Flattened port leaf of a child instance.
    Inst {
        /// Child instance name.
        inst: Ident,
        /// Flattened port name.
        port: Ident,
    },
    /// Constant value.
    Const(Value),
    /// Bit range of a local leaf or of a child port leaf.
    Sliced {
        /// Child instance name, `None` for a local leaf.
        inst: Option<Ident>,
        /// Flattened leaf name.
        name: Ident,
        /// Selected bits.
        slice: Slice,
    },
}

impl LeafEndpoint {
    /// Restricts the endpoint to `slice`; constants cannot be sliced.
    pub fn sliced(self, slice: Slice) -> Option<Self> {
        match self {
            LeafEndpoint::Local(name) => Some(LeafEndpoint::Sliced { inst: None, name, slice }),
            LeafEndpoint::Inst { inst, port } => Some(LeafEndpoint::Sliced {
                inst: Some(inst),
                name: port,
                slice,
            }),
            LeafEndpoint::Const(_) | LeafEndpoint::Sliced { .. } => None,
        }
    }

    /// The endpoint without its slice.
    pub fn whole(self) -> Self {
        match self {
            LeafEndpoint::Sliced { inst: None, name, .. } => LeafEndpoint::Local(name),
            LeafEndpoint::Sliced { inst: Some(inst), name, .. } => {
                LeafEndpoint::Inst { inst, port: name }
            }
            other => other,
        }
    }

    /// Selected bits, if sliced.
    pub fn slice(self) -> Option<Slice> {
        match self {
            LeafEndpoint::Sliced { slice, .. } => Some(slice),
            _ => None,
        }
    }
}

impl fmt::Display for LeafEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeafEndpoint::Local(name) => write!(f, "{name}"),
            LeafEndpoint::Inst { inst, port } => write!(f, "{inst}/{port}"),
            LeafEndpoint::Const(value) => write!(f, "{value}"),
            LeafEndpoint::Sliced { inst: None, name, slice } => write!(f, "{name}{slice}"),
            LeafEndpoint::Sliced { inst: Some(inst), name, slice } => {
                write!(f, "{inst}/{name}{slice}")
            }
        }
    }
}

/// Which multiplexer branch a connection belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MuxGuard {
    /// Multiplexer name.
    pub mux: Ident,
    /// Select leaf and the value that enables the branch; `None` for the
    /// default branch.
    pub select: Option<(LeafEndpoint, Value)>,
}

impl fmt::Display for MuxGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.select {
            Some((sel, value)) => write!(f, "{}: {sel} == {value}", self.mux),
            None => write!(f, "{}: default", self.mux),
        }
    }
}

/// A leaf-level `target <= source` pair.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Connection {
    /// Driven leaf.
    pub target: LeafEndpoint,
    /// Driving leaf or constant.
    pub source: LeafEndpoint,
    /// Set for assignments made by a multiplexer.
    pub guard: Option<MuxGuard>,
}

impl Connection {
    /// Unconditional connection.
    pub fn new(target: LeafEndpoint, source: LeafEndpoint) -> Self {
        Self { target, source, guard: None }
    }

    /// Connection made by a multiplexer branch.
    pub fn guarded(mut self, guard: MuxGuard) -> Self {
        self.guard = Some(guard);
        self
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <= {}", self.target, self.source)?;
        if let Some(guard) = &self.guard {
            write!(f, " [{guard}]")?;
        }
        Ok(())
    }
}

/// A declaration bound to one position in the hierarchy.
#[derive(Clone, Debug)]
pub struct ModuleInstance {
    /// The instantiated declaration.
    pub decl: Arc<ModuleDecl>,
    /// Instance name; the module name for a top instance.
    pub name: Ident,
    /// Hierarchical path.
    pub path: HierPath,
    /// Generated module name.
    pub modname: String,
    /// Module name of the enclosing top or testbench module.
    pub topmodname: String,
    /// Effective configuration.
    pub config: Option<ModConfig>,
    /// Bound parameter values in declaration order.
    pub params: IndexMap<Ident, Value>,
    /// Namespace with every type resolved.
    pub namespace: Namespace,
    /// Child instances in declaration order.
    pub children: Vec<ModuleInstance>,
    /// Validated connections.
    pub connections: Vec<Connection>,
}

impl ModuleInstance {
    /// Reference of the instantiated declaration.
    pub fn modref(&self) -> ModRef {
        self.decl.modref
    }

    /// Library name.
    pub fn libname(&self) -> Ident {
        self.decl.modref.lib
    }

    /// `library.modname`, the form module patterns with a `.` match against.
    pub fn qualname(&self) -> String {
        format!("{}.{}", self.libname(), self.modname)
    }

    /// Bound value of parameter `name`.
    pub fn param(&self, name: impl Into<Ident>) -> Option<Value> {
        self.params.get(&name.into()).copied()
    }

    /// Parameter values as bindings.
    pub fn bindings(&self) -> Bindings {
        self.params
            .iter()
            .map(|(name, value)| (*name, Expr::constant(*value)))
            .collect()
    }

    /// Child instance by name.
    pub fn child(&self, name: impl Into<Ident>) -> Option<&ModuleInstance> {
        let name = name.into();
        self.children.iter().find(|c| c.name == name)
    }

    /// Returns `true` if the instance has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// This instance and every descendant, parents first.
    pub fn pre_order(&self) -> Vec<&ModuleInstance> {
        let mut out = Vec::new();
        self.collect_pre(&mut out);
        out
    }

    fn collect_pre<'a>(&'a self, out: &mut Vec<&'a ModuleInstance>) {
        out.push(self);
        for child in &self.children {
            child.collect_pre(out);
        }
    }

    /// Every descendant and then this instance, children first.
    ///
    /// Children of instances for which `stop` returns `true` are skipped;
    /// the instance itself is still visited. With `unique`, only the first
    /// instance of each module name is kept.
    pub fn post_order_with(
        &self,
        stop: &dyn Fn(&ModuleInstance) -> bool,
        unique: bool,
    ) -> Vec<&ModuleInstance> {
        let mut out = Vec::new();
        let mut seen = IndexSet::new();
        self.collect_post(stop, unique, &mut seen, &mut out);
        out
    }

    fn collect_post<'a>(
        &'a self,
        stop: &dyn Fn(&ModuleInstance) -> bool,
        unique: bool,
        seen: &mut IndexSet<String>,
        out: &mut Vec<&'a ModuleInstance>,
    ) {
        if !stop(self) {
            for child in &self.children {
                child.collect_post(stop, unique, seen, out);
            }
        }
        if !unique || seen.insert(self.modname.clone()) {
            out.push(self);
        }
    }

    /// Descendant by path relative to this instance, e.g. `u_core/u_fifo`.
    pub fn find(&self, path: &str) -> Option<&ModuleInstance> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(self, |inst, name| inst.child(name))
    }
}

/// Summary counts of a design.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
pub struct DesignStats {
    /// Distinct module names.
    pub modules: usize,
    /// Instances including the top.
    pub instances: usize,
    /// Longest hierarchical path.
    pub depth: usize,
}

/// A fully elaborated instance tree.
#[derive(Clone, Debug)]
pub struct Design {
    /// Root instance.
    pub top: ModuleInstance,
}

impl Design {
    /// Wraps an elaborated top instance.
    pub fn new(top: ModuleInstance) -> Self {
        Self { top }
    }

    /// Every instance, parents first.
    pub fn pre_order(&self) -> Vec<&ModuleInstance> {
        self.top.pre_order()
    }

    /// Every instance, children first.
    pub fn post_order(&self) -> Vec<&ModuleInstance> {
        self.top.post_order_with(&|_| false, false)
    }

    /// First instance of every module name, parents first.
    pub fn unique(&self) -> Vec<&ModuleInstance> {
        let mut seen = IndexSet::new();
        self.pre_order()
            .into_iter()
            .filter(|inst| seen.insert(inst.modname.clone()))
            .collect()
    }

    /// Unique instances whose module or declaration name matches the glob
    /// `pattern`.
    ///
    /// Patterns containing a `.` match `library.modname` and the declaration
    /// reference instead.
    pub fn get_mods(&self, pattern: &str) -> Result<Vec<&ModuleInstance>, IrError> {
        let glob = Pattern::new(pattern).map_err(|err| IrError::InvalidReference {
            text: pattern.to_string(),
            reason: err.msg.to_string(),
        })?;
        let qualified = pattern.contains('.');
        Ok(self
            .unique()
            .into_iter()
            .filter(|inst| {
                if qualified {
                    glob.matches(&inst.qualname()) || glob.matches(&inst.modref().to_string())
                } else {
                    glob.matches(&inst.modname) || glob.matches(inst.modref().name.as_str())
                }
            })
            .collect())
    }

    /// The single unique instance matching `pattern`.
    pub fn get_mod(&self, pattern: &str) -> Result<&ModuleInstance, IrError> {
        let mut found = self.get_mods(pattern)?;
        match found.len() {
            0 => Err(IrError::UnknownIdentifier {
                name: pattern.to_string(),
            }),
            1 => Ok(found.remove(0)),
            _ => Err(IrError::InvalidReference {
                text: pattern.to_string(),
                reason: format!(
                    "matches {} modules: {}",
                    found.len(),
                    found
                        .iter()
                        .map(|inst| inst.modname.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            }),
        }
    }

    /// Instance by hierarchical path, e.g. `uart/u_core`.
    pub fn find(&self, path: &str) -> Option<&ModuleInstance> {
        let (first, rest) = path.split_once('/').unwrap_or((path, ""));
        (self.top.name.as_str() == first)
            .then(|| self.top.find(rest))
            .flatten()
    }

    /// Module, instance and depth counts.
    pub fn stats(&self) -> DesignStats {
        let all = self.pre_order();
        DesignStats {
            modules: self.unique().len(),
            instances: all.len(),
            depth: all.iter().map(|inst| inst.path.len()).max().unwrap_or(0),
        }
    }
}
