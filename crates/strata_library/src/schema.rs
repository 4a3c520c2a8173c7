//! Serde schema of library files.

use indexmap::IndexMap;
use serde::Deserialize;
use strata_ir::{
    parse_expr, Direction, Endpoint, Expr, FileListRule, ModConfig, ModRef, ModuleFlags,
    Orientation, Value,
};

use crate::error::LibraryError;

/// A parsed library file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibraryFile {
    /// Library metadata.
    pub library: LibraryMeta,
    /// Named struct and enum types.
    #[serde(default)]
    pub types: IndexMap<String, TypeDef>,
    /// Module declarations.
    #[serde(default)]
    pub modules: Vec<ModuleSpec>,
}

/// The `[library]` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibraryMeta {
    /// Library name; the `lib` part of module references.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// An expression given as integer, boolean or expression text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ExprSpec {
    /// Integer literal.
    Int(i64),
    /// Boolean literal.
    Bool(bool),
    /// Expression text, e.g. `log2ceil(param_p + 1)`.
    Text(String),
}

impl ExprSpec {
    /// Parses the expression.
    pub fn to_expr(&self) -> Result<Expr, LibraryError> {
        match self {
            ExprSpec::Int(value) => Ok(Expr::int(*value)),
            ExprSpec::Bool(value) => Ok(Expr::bool(*value)),
            ExprSpec::Text(text) => parse_expr(text).map_err(|err| LibraryError::Expr {
                text: text.clone(),
                message: err.message,
            }),
        }
    }

    /// Parses an assignment source: a local name, `inst/port` or a constant.
    pub fn to_endpoint(&self) -> Result<Endpoint, LibraryError> {
        match self {
            ExprSpec::Text(text) => parse_endpoint(text),
            other => Ok(Endpoint::Const(other.to_expr()?)),
        }
    }
}

/// Parses an assignment endpoint.
pub fn parse_endpoint(text: &str) -> Result<Endpoint, LibraryError> {
    Endpoint::parse(text).map_err(|err| LibraryError::Expr {
        text: text.to_string(),
        message: err.to_string(),
    })
}

/// An inline type specification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeSpec {
    /// `BitType`.
    Bit {
        /// Default value.
        #[serde(default)]
        default: Option<ExprSpec>,
    },
    /// `BoolType`.
    Bool {
        /// Default value.
        #[serde(default)]
        default: Option<ExprSpec>,
    },
    /// `IntegerType`.
    Integer {
        /// Default value.
        #[serde(default)]
        default: Option<ExprSpec>,
    },
    /// `UintType(width)`.
    Uint {
        /// Width in bits.
        width: ExprSpec,
        /// Default value.
        #[serde(default)]
        default: Option<ExprSpec>,
    },
    /// `SintType(width)`.
    Sint {
        /// Width in bits.
        width: ExprSpec,
        /// Default value.
        #[serde(default)]
        default: Option<ExprSpec>,
    },
    /// `ArrayType(element, depth)`.
    Array {
        /// Element type.
        element: Box<TypeSpec>,
        /// Number of elements.
        depth: ExprSpec,
    },
    /// Clock.
    Clk,
    /// Active-low reset.
    RstAn,
    /// Active-high reset.
    Rst,
    /// The built-in clock and active-low reset pair.
    ClkRstAn,
    /// A named type of this or another library (`lib.Name`).
    Ref {
        /// Type name.
        name: String,
        /// Default value overriding the named type's default.
        #[serde(default)]
        default: Option<ExprSpec>,
    },
}

/// A named type definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDef {
    /// A struct.
    Struct {
        /// Members in order.
        members: Vec<MemberSpec>,
    },
    /// An enumeration.
    Enum {
        /// Type of the keys.
        keytype: TypeSpec,
        /// Items in order.
        items: Vec<ItemSpec>,
        /// Default key.
        #[serde(default)]
        default: Option<ExprSpec>,
    },
}

/// A struct member.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberSpec {
    /// Member name.
    pub name: String,
    /// Member type.
    #[serde(rename = "type")]
    pub ty: TypeSpec,
    /// Polarity relative to the struct.
    #[serde(default)]
    pub orientation: Orientation,
}

/// An enum item; without a value the next free key is used.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemSpec {
    /// Key.
    #[serde(default)]
    pub value: Option<i64>,
    /// Label.
    pub label: String,
}

/// Define names guarding a declaration, one or a list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IfdefSpec {
    /// `ifdef = "FEATURE"`.
    One(String),
    /// `ifdefs = ["A", "B"]`.
    Many(Vec<String>),
}

impl IfdefSpec {
    /// The guarding names in order.
    pub fn names(&self) -> &[String] {
        match self {
            IfdefSpec::One(name) => std::slice::from_ref(name),
            IfdefSpec::Many(names) => names,
        }
    }
}

/// A parameter or signal.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentSpec {
    /// Name.
    pub name: String,
    /// Type.
    #[serde(rename = "type")]
    pub ty: TypeSpec,
    /// Documentation.
    #[serde(default)]
    pub doc: Option<String>,
    /// Guarding defines.
    #[serde(default, alias = "ifdefs")]
    pub ifdef: Option<IfdefSpec>,
}

/// A port.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortSpec {
    /// Name including the direction suffix.
    pub name: String,
    /// Type.
    #[serde(rename = "type")]
    pub ty: TypeSpec,
    /// Direction.
    pub direction: Direction,
    /// Documentation.
    #[serde(default)]
    pub doc: Option<String>,
    /// Guarding defines.
    #[serde(default, alias = "ifdefs")]
    pub ifdef: Option<IfdefSpec>,
}

/// A preprocessor constant.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefineSpec {
    /// Name.
    pub name: String,
    /// Scalar type.
    #[serde(rename = "type")]
    pub ty: TypeSpec,
    /// Value; the type default when absent.
    #[serde(default)]
    pub value: Option<ValueSpec>,
}

/// A configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ValueSpec {
    /// Integer.
    Int(i64),
    /// Boolean.
    Bool(bool),
}

impl From<ValueSpec> for Value {
    fn from(value: ValueSpec) -> Self {
        match value {
            ValueSpec::Int(v) => Value::Int(v),
            ValueSpec::Bool(v) => Value::Bool(v),
        }
    }
}

/// A named configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSpec {
    /// Name appended to the module name.
    pub name: String,
    /// Values visible to parameters and types.
    #[serde(default)]
    pub values: IndexMap<String, ValueSpec>,
}

impl ConfigSpec {
    /// Builds the configuration.
    pub fn build(&self) -> ModConfig {
        self.values
            .iter()
            .fold(ModConfig::new(self.name.as_str()), |config, (name, value)| {
                config.with(name.as_str(), Value::from(*value))
            })
    }
}

/// A sub-module instantiation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstSpec {
    /// Instance name.
    pub name: String,
    /// Instantiated module, `lib.name`.
    pub module: ModRef,
    /// Parameter overrides evaluated in the parent.
    #[serde(default)]
    pub params: IndexMap<String, ExprSpec>,
    /// Configuration replacing the module's default.
    #[serde(default)]
    pub config: Option<ConfigSpec>,
}

/// An assignment `target <= source`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssignSpec {
    /// Driven endpoint.
    pub target: String,
    /// Driving endpoint or constant.
    pub source: ExprSpec,
}

/// One assignment of a mux case.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MuxCaseSpec {
    /// Select port or signal.
    pub sel: String,
    /// Select value enabling the assignment.
    pub cond: ExprSpec,
    /// Driven endpoint.
    pub target: String,
    /// Driving endpoint or constant.
    pub source: ExprSpec,
}

/// A multiplexer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MuxSpec {
    /// Name.
    pub name: String,
    /// Short description.
    #[serde(default)]
    pub title: Option<String>,
    /// Assignments applied when no case matches.
    #[serde(default)]
    pub defaults: Vec<AssignSpec>,
    /// Conditional assignments.
    #[serde(default)]
    pub cases: Vec<MuxCaseSpec>,
}

/// A module declaration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleSpec {
    /// Module name.
    pub name: String,
    /// Short description.
    #[serde(default)]
    pub title: Option<String>,
    /// Capability flags.
    #[serde(default)]
    pub flags: ModuleFlags,
    /// Tailored base declaration.
    #[serde(default)]
    pub base: Option<ModRef>,
    /// Directory for relative file-list paths, relative to the library file.
    #[serde(default)]
    pub basedir: Option<String>,
    /// Default configuration.
    #[serde(default)]
    pub config: Option<ConfigSpec>,
    /// Preprocessor constants.
    #[serde(default)]
    pub defines: Vec<DefineSpec>,
    /// Parameters in order.
    #[serde(default)]
    pub params: Vec<IdentSpec>,
    /// Ports in order.
    #[serde(default)]
    pub ports: Vec<PortSpec>,
    /// Signals in order.
    #[serde(default)]
    pub signals: Vec<IdentSpec>,
    /// Sub-instances in order.
    #[serde(default)]
    pub insts: Vec<InstSpec>,
    /// Assignments in order.
    #[serde(default)]
    pub assigns: Vec<AssignSpec>,
    /// Multiplexers in order.
    #[serde(default)]
    pub muxes: Vec<MuxSpec>,
    /// File-list rules in priority order.
    #[serde(default)]
    pub filelists: Vec<FileListRule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_specs() {
        let spec: TypeSpec = toml::from_str(r#"kind = "uint"
width = "width_p"
default = 3"#)
        .unwrap();
        assert_eq!(
            spec,
            TypeSpec::Uint {
                width: ExprSpec::Text("width_p".to_string()),
                default: Some(ExprSpec::Int(3)),
            }
        );
        let spec: TypeSpec = toml::from_str(r#"kind = "clk_rst_an""#).unwrap();
        assert_eq!(spec, TypeSpec::ClkRstAn);
    }

    #[test]
    fn expression_specs() {
        assert_eq!(ExprSpec::Int(4).to_expr().unwrap(), Expr::int(4));
        assert_eq!(
            ExprSpec::Text("log2ceil(param_p + 1)".to_string())
                .to_expr()
                .unwrap(),
            Expr::log2ceil(Expr::param("param_p") + 1)
        );
        assert!(ExprSpec::Text("1 +".to_string()).to_expr().is_err());
        assert_eq!(
            ExprSpec::Text("u_core/bus_i".to_string()).to_endpoint().unwrap(),
            Endpoint::Inst {
                inst: "u_core".into(),
                port: "bus_i".into(),
            }
        );
        assert!(matches!(
            ExprSpec::Int(0).to_endpoint().unwrap(),
            Endpoint::Const(_)
        ));
    }

    #[test]
    fn ifdef_one_or_many() {
        let port: PortSpec = toml::from_str(
            r#"name = "dbg_i"
type = { kind = "bit" }
direction = "in"
ifdef = "DEBUG""#,
        )
        .unwrap();
        assert_eq!(port.ifdef.unwrap().names(), ["DEBUG".to_string()]);
        let signal: IdentSpec = toml::from_str(
            r#"name = "trace_s"
type = { kind = "bit" }
ifdefs = ["DEBUG", "TRACE"]"#,
        )
        .unwrap();
        assert_eq!(signal.ifdef.unwrap().names().len(), 2);
    }

    #[test]
    fn mux_spec() {
        let spec: MuxSpec = toml::from_str(
            r#"name = "main"
defaults = [{ target = "q_o", source = 0 }]
cases = [{ sel = "sel_s", cond = 1, target = "q_o", source = "a_i[3:0]" }]"#,
        )
        .unwrap();
        assert_eq!(spec.cases[0].cond, ExprSpec::Int(1));
        assert!(spec.title.is_none());
        let source = spec.cases[0].source.to_endpoint().unwrap();
        assert_eq!(source.to_string(), "a_i[3:0]");
    }

    #[test]
    fn configuration_values() {
        let spec: ConfigSpec = toml::from_str(
            r#"name = "fast"
values = { depth = 4, fifo = true }"#,
        )
        .unwrap();
        let config = spec.build();
        assert_eq!(config.modname("uart"), "uart_fast");
        assert_eq!(config.values.len(), 2);
    }
}
