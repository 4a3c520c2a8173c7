//! Module declarations and their builder.

use crate::define::Define;
use crate::error::IrError;
use crate::expr::{Bindings, Expr, ExprNode};
use crate::filelist::FileListRule;
use crate::ident::{Direction, IdentKind, Identifier};
use crate::mux::Mux;
use crate::namespace::Namespace;
use crate::parse::parse_expr;
use crate::slice::Slice;
use crate::types::Type;
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use strata_common::{ContentHash, Ident};

/// Reference to a declaration as `library.module`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ModRef {
    /// Library name.
    pub lib: Ident,
    /// Module name within the library.
    pub name: Ident,
}

impl ModRef {
    /// Creates a reference from its parts.
    pub fn new(lib: impl Into<Ident>, name: impl Into<Ident>) -> Self {
        Self {
            lib: lib.into(),
            name: name.into(),
        }
    }
}

fn is_name(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FromStr for ModRef {
    type Err = IrError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| IrError::InvalidReference {
            text: text.to_string(),
            reason: reason.to_string(),
        };
        let (lib, name) = text
            .split_once('.')
            .ok_or_else(|| invalid("expected 'library.module'"))?;
        if !is_name(lib) || !is_name(name) {
            return Err(invalid("library and module must be identifiers"));
        }
        Ok(ModRef::new(lib, name))
    }
}

impl fmt::Display for ModRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.lib, self.name)
    }
}

impl Serialize for ModRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ModRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Capability flags of a declaration.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleFlags {
    /// Testbench: instantiates a device under test supplied at elaboration.
    pub is_tb: bool,
    /// Core module, instantiated inside a wrapper of the same library.
    pub is_core: bool,
}

/// A named set of configuration values.
///
/// Values are visible to the instance's parameters and types, and the name
/// becomes part of the generated module name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModConfig {
    /// Configuration name.
    pub name: Ident,
    /// Values in declaration order.
    #[serde(default)]
    pub values: IndexMap<Ident, Value>,
}

impl ModConfig {
    /// An empty configuration.
    pub fn new(name: impl Into<Ident>) -> Self {
        Self {
            name: name.into(),
            values: IndexMap::new(),
        }
    }

    /// Adds a value.
    pub fn with(mut self, name: impl Into<Ident>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Values as parameter bindings.
    pub fn bindings(&self) -> Bindings {
        self.values
            .iter()
            .map(|(name, value)| (*name, Expr::constant(*value)))
            .collect()
    }

    /// Generated module name for a declaration named `base`.
    pub fn modname(&self, base: &str) -> String {
        format!("{base}_{}", self.name)
    }

    /// Fingerprint of the values, independent of their order.
    pub fn hash(&self) -> String {
        let mut entries: Vec<String> = self
            .values
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        entries.sort();
        ContentHash::from_bytes(entries.join(";").as_bytes()).short()
    }
}

/// One side of an assignment.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Endpoint {
    /// A port or signal of the declaring module.
    Local(Ident),
    /// A port of a sub-instance.
    Inst {
        /// Instance name.
        inst: Ident,
        /// Port name on the instance.
        port: Ident,
    },
    /// A constant, only valid as a source.
    Const(Expr),
    /// A bit range of a vector port or signal, `name[hi:lo]` or
    /// `inst/port[hi:lo]`.
    Sliced {
        /// Instance name for a sub-instance port.
        inst: Option<Ident>,
        /// Port or signal name.
        name: Ident,
        /// The bit range.
        slice: Slice,
    },
}

impl Endpoint {
    /// Parses `name`, `inst/port`, either with a `[hi:lo]` suffix, or a
    /// constant expression.
    pub fn parse(text: &str) -> Result<Endpoint, IrError> {
        let (base, slice) = Slice::split_suffix(text.trim())?;
        let endpoint = Self::parse_whole(base)?;
        match slice {
            Some(slice) => endpoint.sliced(slice),
            None => Ok(endpoint),
        }
    }

    fn parse_whole(text: &str) -> Result<Endpoint, IrError> {
        if let Some((inst, port)) = text.split_once('/') {
            if !is_name(inst) || !is_name(port) {
                return Err(IrError::InvalidReference {
                    text: text.to_string(),
                    reason: "expected 'instance/port'".to_string(),
                });
            }
            return Ok(Endpoint::Inst {
                inst: Ident::new(inst),
                port: Ident::new(port),
            });
        }
        let expr = parse_expr(text).map_err(|err| IrError::InvalidReference {
            text: text.to_string(),
            reason: err.message,
        })?;
        Ok(match expr.node() {
            ExprNode::Param(name) => Endpoint::Local(*name),
            _ => Endpoint::Const(expr),
        })
    }

    /// The bit range `slice` of this port or signal.
    pub fn sliced(self, slice: Slice) -> Result<Endpoint, IrError> {
        match self {
            Endpoint::Local(name) => Ok(Endpoint::Sliced {
                inst: None,
                name,
                slice,
            }),
            Endpoint::Inst { inst, port } => Ok(Endpoint::Sliced {
                inst: Some(inst),
                name: port,
                slice,
            }),
            Endpoint::Const(_) | Endpoint::Sliced { .. } => Err(IrError::InvalidReference {
                text: format!("{self}{slice}"),
                reason: "only ports and signals can be sliced".to_string(),
            }),
        }
    }

    /// The endpoint without its bit range.
    pub fn whole(self) -> Endpoint {
        match self {
            Endpoint::Sliced {
                inst: None, name, ..
            } => Endpoint::Local(name),
            Endpoint::Sliced {
                inst: Some(inst),
                name,
                ..
            } => Endpoint::Inst { inst, port: name },
            other => other,
        }
    }

    /// The bit range, if sliced.
    pub fn slice(self) -> Option<Slice> {
        match self {
            Endpoint::Sliced { slice, .. } => Some(slice),
            _ => None,
        }
    }

    /// Returns `true` for constants.
    pub fn is_const(self) -> bool {
        matches!(self, Endpoint::Const(_))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Local(name) => write!(f, "{name}"),
            Endpoint::Inst { inst, port } => write!(f, "{inst}/{port}"),
            Endpoint::Const(expr) => write!(f, "{expr}"),
            Endpoint::Sliced { inst, name, slice } => match inst {
                Some(inst) => write!(f, "{inst}/{name}{slice}"),
                None => write!(f, "{name}{slice}"),
            },
        }
    }
}

/// A connection `target <= source` declared in a module.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Assign {
    /// Driven endpoint.
    pub target: Endpoint,
    /// Driving endpoint.
    pub source: Endpoint,
}

/// A sub-module instantiation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstDecl {
    /// Instance name, e.g. `u_core`.
    pub name: Ident,
    /// Instantiated declaration.
    pub module: ModRef,
    /// Parameter overrides, evaluated in the parent's bindings.
    pub overrides: IndexMap<Ident, Expr>,
    /// Configuration replacing the child's default configuration.
    pub config: Option<ModConfig>,
}

impl InstDecl {
    /// Instantiates `module` as `name`.
    pub fn new(name: impl Into<Ident>, module: ModRef) -> Self {
        Self {
            name: name.into(),
            module,
            overrides: IndexMap::new(),
            config: None,
        }
    }

    /// Overrides parameter `name`.
    pub fn param(mut self, name: impl Into<Ident>, value: impl Into<Expr>) -> Self {
        self.overrides.insert(name.into(), value.into());
        self
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: ModConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// An immutable module declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleDecl {
    /// `library.module`.
    pub modref: ModRef,
    /// Short description.
    pub title: Option<String>,
    /// Capability flags.
    pub flags: ModuleFlags,
    /// Declaration this one tailors.
    pub base: Option<ModRef>,
    /// Directory relative file-list paths resolve against.
    pub basedir: Option<PathBuf>,
    /// Parameters, ports and signals.
    pub namespace: Namespace,
    /// Sub-instances in declaration order.
    pub insts: Vec<InstDecl>,
    /// Assignments in declaration order.
    pub assigns: Vec<Assign>,
    /// Multiplexers in declaration order.
    pub muxes: Vec<Mux>,
    /// Preprocessor constants visible to parameter and type expressions.
    pub defines: IndexMap<Ident, Define>,
    /// File-list rules in priority order.
    pub filelists: Vec<FileListRule>,
    /// Default configuration.
    pub config: Option<ModConfig>,
}

impl ModuleDecl {
    /// Library name.
    pub fn libname(&self) -> Ident {
        self.modref.lib
    }

    /// Module name.
    pub fn name(&self) -> Ident {
        self.modref.name
    }

    /// Returns `true` if the declaration tailors a base declaration.
    pub fn is_tailored(&self) -> bool {
        self.base.is_some()
    }

    /// Sub-instance declaration by name.
    pub fn inst(&self, name: Ident) -> Option<&InstDecl> {
        self.insts.iter().find(|i| i.name == name)
    }

    /// Multiplexer by name.
    pub fn get_mux(&self, name: impl Into<Ident>) -> Result<&Mux, IrError> {
        let name = name.into();
        self.muxes
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| IrError::UnknownMember {
                what: "mux",
                name,
                known: self.muxes.iter().map(|m| m.name).collect(),
            })
    }

    /// Define values as parameter bindings.
    pub fn define_bindings(&self) -> Bindings {
        self.defines
            .values()
            .map(|define| (define.name, define.expr()))
            .collect()
    }
}

/// Builds a [`ModuleDecl`], enforcing declaration-time invariants.
#[derive(Debug)]
pub struct ModuleBuilder {
    decl: ModuleDecl,
}

impl ModuleBuilder {
    /// Starts the declaration of `modref`.
    pub fn new(modref: ModRef) -> Self {
        Self {
            decl: ModuleDecl {
                modref,
                title: None,
                flags: ModuleFlags::default(),
                base: None,
                basedir: None,
                namespace: Namespace::new(),
                insts: Vec::new(),
                assigns: Vec::new(),
                muxes: Vec::new(),
                defines: IndexMap::new(),
                filelists: Vec::new(),
                config: None,
            },
        }
    }

    /// Sets the title.
    pub fn title(&mut self, title: impl Into<String>) -> &mut Self {
        self.decl.title = Some(title.into());
        self
    }

    /// Sets the flags.
    pub fn flags(&mut self, flags: ModuleFlags) -> &mut Self {
        self.decl.flags = flags;
        self
    }

    /// Marks the declaration as tailoring `base`.
    pub fn base(&mut self, base: ModRef) -> &mut Self {
        self.decl.base = Some(base);
        self
    }

    /// Sets the base directory for file lists.
    pub fn basedir(&mut self, basedir: impl Into<PathBuf>) -> &mut Self {
        self.decl.basedir = Some(basedir.into());
        self
    }

    /// Sets the default configuration.
    pub fn config(&mut self, config: ModConfig) -> &mut Self {
        self.decl.config = Some(config);
        self
    }

    /// Declares a parameter of type `ty`; its value is the type's default.
    ///
    /// Any parameter referenced by the type must already be declared or be
    /// a value of the default configuration.
    pub fn param(&mut self, name: impl Into<Ident>, ty: Type) -> Result<&mut Self, IrError> {
        self.ident(Identifier::param(name, ty))
    }

    fn check_param_order(&self, param: &Identifier) -> Result<(), IrError> {
        for reference in param.ty.free_params() {
            let declared = self
                .decl
                .namespace
                .get(reference)
                .is_some_and(|i| i.kind == IdentKind::Param);
            let configured = self
                .decl
                .config
                .as_ref()
                .is_some_and(|c| c.values.contains_key(&reference));
            let defined = self.decl.defines.contains_key(&reference);
            if !declared && !configured && !defined {
                return Err(IrError::ParameterOrder {
                    param: param.name,
                    reference,
                });
            }
        }
        Ok(())
    }

    /// Declares a port.
    pub fn port(
        &mut self,
        name: impl Into<Ident>,
        ty: Type,
        direction: Direction,
    ) -> Result<&mut Self, IrError> {
        self.ident(Identifier::port(name, ty, direction))
    }

    /// Declares a signal.
    pub fn signal(&mut self, name: impl Into<Ident>, ty: Type) -> Result<&mut Self, IrError> {
        self.ident(Identifier::signal(name, ty))
    }

    /// Declares a prepared identifier.
    pub fn ident(&mut self, ident: Identifier) -> Result<&mut Self, IrError> {
        if ident.kind == IdentKind::Param {
            self.check_param_order(&ident)?;
        }
        if self.decl.defines.contains_key(&ident.name) {
            return Err(IrError::DuplicateIdentifier { name: ident.name });
        }
        self.decl.namespace.add(ident)?;
        Ok(self)
    }

    /// Declares a preprocessor constant; its name must not clash with an
    /// identifier or another define.
    pub fn define(&mut self, define: Define) -> Result<&mut Self, IrError> {
        if self.decl.defines.contains_key(&define.name) || self.decl.namespace.contains(define.name) {
            return Err(IrError::DuplicateIdentifier { name: define.name });
        }
        self.decl.defines.insert(define.name, define);
        Ok(self)
    }

    /// Adds an empty multiplexer and returns it for filling in.
    pub fn mux(&mut self, name: impl Into<Ident>) -> Result<&mut Mux, IrError> {
        let name = name.into();
        if self.decl.muxes.iter().any(|m| m.name == name) {
            return Err(IrError::DuplicateIdentifier { name });
        }
        self.decl.muxes.push(Mux::new(name));
        let last = self.decl.muxes.len() - 1;
        Ok(&mut self.decl.muxes[last])
    }

    /// Adds a sub-instance; instance names are unique.
    pub fn inst(&mut self, inst: InstDecl) -> Result<&mut Self, IrError> {
        if self.decl.insts.iter().any(|i| i.name == inst.name) {
            return Err(IrError::DuplicateIdentifier { name: inst.name });
        }
        self.decl.insts.push(inst);
        Ok(self)
    }

    /// Adds an assignment.
    pub fn assign(&mut self, target: Endpoint, source: Endpoint) -> &mut Self {
        self.decl.assigns.push(Assign { target, source });
        self
    }

    /// Adds a file-list rule after the existing ones.
    pub fn filelist(&mut self, rule: FileListRule) -> &mut Self {
        self.decl.filelists.push(rule);
        self
    }

    /// Finishes the declaration.
    pub fn build(self) -> ModuleDecl {
        self.decl
    }
}
