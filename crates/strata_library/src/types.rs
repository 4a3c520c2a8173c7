//! Resolution of type specifications to object-model types.
//!
//! Named types are built lazily on first use and cached, so libraries can
//! reference each other's types in any order.

use std::collections::HashMap;

use strata_ir::{EnumBuilder, StructBuilder, Type};

use crate::error::LibraryError;
use crate::schema::{TypeDef, TypeSpec};

/// Named type definitions of all loaded libraries.
#[derive(Debug, Default)]
pub struct TypeTable {
    defs: HashMap<String, TypeDef>,
    cache: HashMap<String, Type>,
    active: Vec<String>,
}

fn qualify(library: &str, name: &str) -> String {
    if name.contains('.') {
        name.to_string()
    } else {
        format!("{library}.{name}")
    }
}

fn local_name(qualified: &str) -> &str {
    qualified
        .split_once('.')
        .map_or(qualified, |(_, name)| name)
}

impl TypeTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the named types of `library`.
    pub fn define(&mut self, library: &str, name: &str, def: TypeDef) {
        self.defs.insert(qualify(library, name), def);
    }

    /// Named types defined so far.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Whether no named type is defined.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Builds `spec` as seen from `library`.
    pub fn resolve(&mut self, library: &str, spec: &TypeSpec) -> Result<Type, LibraryError> {
        let context = format!("{library} type");
        let definition = LibraryError::definition(&context);
        let (ty, default) = match spec {
            TypeSpec::Bit { default } => (Type::bit(), default),
            TypeSpec::Bool { default } => (Type::bool(), default),
            TypeSpec::Integer { default } => (Type::integer(), default),
            TypeSpec::Uint { width, default } => (Type::uint(width.to_expr()?), default),
            TypeSpec::Sint { width, default } => (Type::sint(width.to_expr()?), default),
            TypeSpec::Array { element, depth } => {
                let element = self.resolve(library, element)?;
                return Ok(Type::array(element, depth.to_expr()?));
            }
            TypeSpec::Clk => return Ok(Type::clock()),
            TypeSpec::RstAn => return Ok(Type::reset(true)),
            TypeSpec::Rst => return Ok(Type::reset(false)),
            TypeSpec::ClkRstAn => return Ok(Type::clk_rst_an()),
            TypeSpec::Ref { name, default } => (self.named(library, name)?, default),
        };
        match default {
            Some(default) => ty.with_default(default.to_expr()?).map_err(definition),
            None => Ok(ty),
        }
    }

    /// Builds the named type `name`, local to `library` unless qualified.
    pub fn named(&mut self, library: &str, name: &str) -> Result<Type, LibraryError> {
        let qualified = qualify(library, name);
        if let Some(ty) = self.cache.get(&qualified) {
            return Ok(*ty);
        }
        if let Some(pos) = self.active.iter().position(|n| *n == qualified) {
            let mut chain = self.active[pos..].to_vec();
            chain.push(qualified);
            return Err(LibraryError::RecursiveType { chain });
        }
        let def = self
            .defs
            .get(&qualified)
            .cloned()
            .ok_or_else(|| LibraryError::UnknownType {
                library: library.to_string(),
                name: name.to_string(),
            })?;
        let home = qualified
            .split_once('.')
            .map_or(library, |(lib, _)| lib)
            .to_string();

        self.active.push(qualified.clone());
        let built = self.build(&home, local_name(&qualified), &def);
        self.active.pop();

        let ty = built?;
        self.cache.insert(qualified, ty);
        Ok(ty)
    }

    fn build(&mut self, library: &str, name: &str, def: &TypeDef) -> Result<Type, LibraryError> {
        let context = format!("{library}.{name}");
        let definition = LibraryError::definition(&context);
        match def {
            TypeDef::Struct { members } => {
                let mut builder = StructBuilder::new(name);
                for member in members {
                    let ty = self.resolve(library, &member.ty)?;
                    builder = builder
                        .member_with(member.name.as_str(), ty, member.orientation)
                        .map_err(&definition)?;
                }
                Ok(builder.build())
            }
            TypeDef::Enum {
                keytype,
                items,
                default,
            } => {
                let keytype = self.resolve(library, keytype)?;
                let mut builder = EnumBuilder::new(name, keytype);
                for item in items {
                    builder = match item.value {
                        Some(value) => builder.item(value, item.label.as_str()),
                        None => builder.auto(item.label.as_str()),
                    }
                    .map_err(&definition)?;
                }
                if let Some(default) = default {
                    builder = builder.default_value(default.to_expr()?);
                }
                Ok(builder.build())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ExprSpec, ItemSpec, MemberSpec};
    use strata_ir::Orientation;

    fn bus() -> TypeDef {
        TypeDef::Struct {
            members: vec![
                MemberSpec {
                    name: "addr".to_string(),
                    ty: TypeSpec::Uint {
                        width: ExprSpec::Int(32),
                        default: None,
                    },
                    orientation: Orientation::Fwd,
                },
                MemberSpec {
                    name: "ready".to_string(),
                    ty: TypeSpec::Bit {
                        default: Some(ExprSpec::Int(1)),
                    },
                    orientation: Orientation::Bwd,
                },
            ],
        }
    }

    #[test]
    fn named_struct_is_cached() {
        let mut table = TypeTable::new();
        table.define("glbl_lib", "BusType", bus());
        let local = table.named("glbl_lib", "BusType").unwrap();
        let remote = table.named("uart_lib", "glbl_lib.BusType").unwrap();
        assert_eq!(local, remote);
        assert_eq!(local.to_string(), "BusType()");
        assert_eq!(local.members().len(), 2);
        assert_eq!(local.members()[1].orientation, Orientation::Bwd);
    }

    #[test]
    fn enum_with_auto_keys() {
        let mut table = TypeTable::new();
        table.define(
            "lib",
            "ModeType",
            TypeDef::Enum {
                keytype: TypeSpec::Uint {
                    width: ExprSpec::Int(2),
                    default: None,
                },
                items: vec![
                    ItemSpec {
                        value: Some(1),
                        label: "rx".to_string(),
                    },
                    ItemSpec {
                        value: None,
                        label: "tx".to_string(),
                    },
                ],
                default: Some(ExprSpec::Int(2)),
            },
        );
        let ty = table.named("lib", "ModeType").unwrap();
        let values: Vec<i64> = ty.enum_items().iter().map(|i| i.value).collect();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn unknown_type() {
        let mut table = TypeTable::new();
        let err = table
            .resolve(
                "lib",
                &TypeSpec::Ref {
                    name: "Missing".to_string(),
                    default: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, LibraryError::UnknownType { .. }));
    }

    #[test]
    fn recursive_types() {
        let mut table = TypeTable::new();
        let member = |name: &str, target: &str| MemberSpec {
            name: name.to_string(),
            ty: TypeSpec::Ref {
                name: target.to_string(),
                default: None,
            },
            orientation: Orientation::Fwd,
        };
        table.define("lib", "A", TypeDef::Struct { members: vec![member("b", "B")] });
        table.define("lib", "B", TypeDef::Struct { members: vec![member("a", "A")] });
        let err = table.named("lib", "A").unwrap_err();
        assert_eq!(
            err.to_string(),
            "recursive type definition: lib.A -> lib.B -> lib.A"
        );
    }

    #[test]
    fn defaults_on_references() {
        let mut table = TypeTable::new();
        let ty = table
            .resolve(
                "lib",
                &TypeSpec::Uint {
                    width: ExprSpec::Text("width_p".to_string()),
                    default: Some(ExprSpec::Int(3)),
                },
            )
            .unwrap();
        assert_eq!(ty.default(), Some(strata_ir::Expr::int(3)));
        assert!(!ty.is_resolved());
    }
}
