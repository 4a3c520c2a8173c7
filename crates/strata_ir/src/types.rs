//! Interned hardware data types.
//!
//! Every [`Type`] is a handle into the process-wide type pool, so two types
//! built from equal attributes are the same object and compare in O(1).
//! Widths, defaults and array depths are [`Expr`]s and may stay symbolic
//! until the owning instance binds its parameters.

use crate::error::IrError;
use crate::expr::{Bindings, Expr};
use crate::value::Value;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use strata_common::{Ident, Intern, InternPool, Interned};

/// Largest depth an array type may resolve to.
pub const MAX_ARRAY_DEPTH: usize = 1 << 20;

/// Polarity of a struct member relative to the struct.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Same direction as the containing struct.
    #[default]
    Fwd,
    /// Opposite direction to the containing struct.
    Bwd,
    /// Bidirectional, regardless of the containing struct.
    Bidir,
}

impl Orientation {
    /// Combines an outer orientation with a member's own orientation.
    pub fn then(self, inner: Orientation) -> Orientation {
        match (self, inner) {
            (Orientation::Bidir, _) | (_, Orientation::Bidir) => Orientation::Bidir,
            (Orientation::Fwd, other) => other,
            (Orientation::Bwd, Orientation::Fwd) => Orientation::Bwd,
            (Orientation::Bwd, Orientation::Bwd) => Orientation::Fwd,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Fwd => write!(f, "FWD"),
            Orientation::Bwd => write!(f, "BWD"),
            Orientation::Bidir => write!(f, "BIDIR"),
        }
    }
}

/// One `(value, label)` pair of an enumeration.
#[derive(PartialEq, Eq, Hash, Debug)]
pub struct EnumItem {
    /// Encoded value.
    pub value: i64,
    /// Symbolic label.
    pub label: Ident,
}

/// One member of a struct type.
#[derive(PartialEq, Eq, Hash, Debug)]
pub struct StructMember {
    /// Member name, joined to the parent name when flattening.
    pub name: Ident,
    /// Member type.
    pub ty: Type,
    /// Polarity relative to the struct.
    pub orientation: Orientation,
}

/// The closed set of type kinds.
#[derive(PartialEq, Eq, Hash, Debug)]
pub enum TypeKind {
    /// A single bit.
    Bit {
        /// Default value, 0 or 1.
        default: Expr,
    },
    /// A boolean.
    Bool {
        /// Default value.
        default: Expr,
    },
    /// A 32-bit signed integer.
    Integer {
        /// Default value.
        default: Expr,
    },
    /// An unsigned vector.
    Uint {
        /// Number of bits.
        width: Expr,
        /// Default value.
        default: Expr,
    },
    /// A signed vector.
    Sint {
        /// Number of bits.
        width: Expr,
        /// Default value.
        default: Expr,
    },
    /// A fixed-depth array.
    Array {
        /// Element type.
        element: Type,
        /// Number of elements.
        depth: Expr,
    },
    /// A named enumeration encoded with `keytype`.
    Enum {
        /// Type name.
        name: Ident,
        /// Encoding type.
        keytype: Type,
        /// Items in declaration order.
        items: Vec<EnumItem>,
        /// Default value.
        default: Expr,
    },
    /// A named struct.
    Struct {
        /// Type name.
        name: Ident,
        /// Members in declaration order.
        members: Vec<StructMember>,
    },
    /// A clock.
    Clock,
    /// A reset.
    Reset {
        /// Active-low polarity.
        active_low: bool,
    },
}

static TYPES: InternPool<TypeKind> = InternPool::new();

impl Intern for TypeKind {
    fn pool() -> &'static InternPool<Self> {
        &TYPES
    }
}

/// Handle to an interned hardware type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Type(Interned<TypeKind>);

/// A structured constant shaped like a type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Aggregate {
    /// Value of a scalar or enum.
    Leaf(Value),
    /// Values of an array, index 0 first.
    Array(Vec<Aggregate>),
    /// Values of struct members in declaration order.
    Struct(Vec<(Ident, Aggregate)>),
}

impl Aggregate {
    /// Value of the struct member `name`.
    pub fn field(&self, name: Ident) -> Option<&Aggregate> {
        match self {
            Aggregate::Struct(fields) => fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Element `index` of an array value.
    pub fn index(&self, index: usize) -> Option<&Aggregate> {
        match self {
            Aggregate::Array(items) => items.get(index),
            _ => None,
        }
    }
}

/// A node visited by [`Type::walk`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeNode {
    /// Depth below the walked type, starting at 1.
    pub level: usize,
    /// Member names from the walked type down to this node.
    pub path: Vec<Ident>,
    /// The node type with array dimensions stripped.
    pub ty: Type,
    /// Orientation accumulated along the path.
    pub orientation: Orientation,
    /// Array depths accumulated along the path, outermost first.
    pub dims: Vec<Expr>,
    /// `true` if the node has no struct members below it.
    pub is_leaf: bool,
}

impl Type {
    fn from_kind(kind: TypeKind) -> Self {
        Type(kind.intern())
    }

    /// The kind this handle points at.
    pub fn kind(self) -> &'static TypeKind {
        self.0.get()
    }

    /// `BitType()`.
    pub fn bit() -> Self {
        Self::from_kind(TypeKind::Bit {
            default: Expr::int(0),
        })
    }

    /// `BoolType()`.
    pub fn bool() -> Self {
        Self::from_kind(TypeKind::Bool {
            default: Expr::bool(false),
        })
    }

    /// `IntegerType()`.
    pub fn integer() -> Self {
        Self::from_kind(TypeKind::Integer {
            default: Expr::int(0),
        })
    }

    /// `UintType(width)`.
    pub fn uint(width: impl Into<Expr>) -> Self {
        Self::from_kind(TypeKind::Uint {
            width: width.into(),
            default: Expr::int(0),
        })
    }

    /// `SintType(width)`.
    pub fn sint(width: impl Into<Expr>) -> Self {
        Self::from_kind(TypeKind::Sint {
            width: width.into(),
            default: Expr::int(0),
        })
    }

    /// `ArrayType(element, depth)`.
    pub fn array(element: Type, depth: impl Into<Expr>) -> Self {
        Self::from_kind(TypeKind::Array {
            element,
            depth: depth.into(),
        })
    }

    /// `ClkType()`.
    pub fn clock() -> Self {
        Self::from_kind(TypeKind::Clock)
    }

    /// `RstAnType()` for active-low, `RstType()` otherwise.
    pub fn reset(active_low: bool) -> Self {
        Self::from_kind(TypeKind::Reset { active_low })
    }

    /// The clock and active-low reset pair: `clk` and `rst_an`.
    pub fn clk_rst_an() -> Self {
        Self::from_kind(TypeKind::Struct {
            name: Ident::new("ClkRstAnType"),
            members: vec![
                StructMember {
                    name: Ident::new("clk"),
                    ty: Type::clock(),
                    orientation: Orientation::Fwd,
                },
                StructMember {
                    name: Ident::new("rst_an"),
                    ty: Type::reset(true),
                    orientation: Orientation::Fwd,
                },
            ],
        })
    }

    /// Returns the same type with another default value.
    ///
    /// Arrays, structs, clocks and resets carry no default of their own.
    pub fn with_default(self, default: impl Into<Expr>) -> Result<Type, IrError> {
        let default = default.into();
        let kind = match self.kind() {
            TypeKind::Bit { .. } => TypeKind::Bit { default },
            TypeKind::Bool { .. } => TypeKind::Bool { default },
            TypeKind::Integer { .. } => TypeKind::Integer { default },
            TypeKind::Uint { width, .. } => TypeKind::Uint {
                width: *width,
                default,
            },
            TypeKind::Sint { width, .. } => TypeKind::Sint {
                width: *width,
                default,
            },
            TypeKind::Enum {
                name,
                keytype,
                items,
                ..
            } => TypeKind::Enum {
                name: *name,
                keytype: *keytype,
                items: clone_items(items),
                default,
            },
            _ => {
                return Err(IrError::TypeDefinition {
                    name: self.to_string(),
                    reason: "type has no default value".to_string(),
                })
            }
        };
        Ok(Self::from_kind(kind))
    }

    /// Name of the type class, e.g. `UintType` or a user struct name.
    pub fn type_name(self) -> String {
        match self.kind() {
            TypeKind::Bit { .. } => "BitType".to_string(),
            TypeKind::Bool { .. } => "BoolType".to_string(),
            TypeKind::Integer { .. } => "IntegerType".to_string(),
            TypeKind::Uint { .. } => "UintType".to_string(),
            TypeKind::Sint { .. } => "SintType".to_string(),
            TypeKind::Array { .. } => "ArrayType".to_string(),
            TypeKind::Enum { name, .. } | TypeKind::Struct { name, .. } => name.to_string(),
            TypeKind::Clock => "ClkType".to_string(),
            TypeKind::Reset { active_low: true } => "RstAnType".to_string(),
            TypeKind::Reset { active_low: false } => "RstType".to_string(),
        }
    }

    /// Bit width; symbolic while any contributing attribute is.
    pub fn width(self) -> Expr {
        let raw = match self.kind() {
            TypeKind::Bit { .. }
            | TypeKind::Bool { .. }
            | TypeKind::Clock
            | TypeKind::Reset { .. } => Expr::int(1),
            TypeKind::Integer { .. } => Expr::int(32),
            TypeKind::Uint { width, .. } | TypeKind::Sint { width, .. } => *width,
            TypeKind::Array { element, depth } => element.width() * *depth,
            TypeKind::Enum { keytype, .. } => keytype.width(),
            TypeKind::Struct { members, .. } => members
                .iter()
                .map(|m| m.ty.width())
                .reduce(|acc, w| acc + w)
                .unwrap_or_else(|| Expr::int(0)),
        };
        raw.resolve(&Bindings::new()).unwrap_or(raw)
    }

    /// Default value of scalar and enum types.
    pub fn default(self) -> Option<Expr> {
        match self.kind() {
            TypeKind::Bit { default }
            | TypeKind::Bool { default }
            | TypeKind::Integer { default }
            | TypeKind::Uint { default, .. }
            | TypeKind::Sint { default, .. }
            | TypeKind::Enum { default, .. } => Some(*default),
            TypeKind::Clock | TypeKind::Reset { .. } => Some(Expr::int(0)),
            TypeKind::Array { .. } | TypeKind::Struct { .. } => None,
        }
    }

    /// Struct members; empty for every other kind.
    pub fn members(self) -> &'static [StructMember] {
        match self.kind() {
            TypeKind::Struct { members, .. } => members,
            _ => &[],
        }
    }

    /// Enum items; empty for every other kind.
    pub fn enum_items(self) -> &'static [EnumItem] {
        match self.kind() {
            TypeKind::Enum { items, .. } => items,
            _ => &[],
        }
    }

    /// Returns `true` for struct types.
    pub fn is_struct(self) -> bool {
        matches!(self.kind(), TypeKind::Struct { .. })
    }

    /// Splits nested arrays into the innermost element type and the depths,
    /// outermost first.
    pub fn strip_arrays(self) -> (Type, Vec<Expr>) {
        let mut dims = Vec::new();
        let mut ty = self;
        while let TypeKind::Array { element, depth } = ty.kind() {
            dims.push(*depth);
            ty = *element;
        }
        (ty, dims)
    }

    /// Wraps the type in arrays, `dims` outermost first.
    pub fn wrap_dims(self, dims: &[Expr]) -> Type {
        dims.iter()
            .rev()
            .fold(self, |ty, depth| Type::array(ty, *depth))
    }

    /// Pre-order walk over struct members below this type.
    ///
    /// Arrays of structs are descended into; their depths accumulate in
    /// [`TypeNode::dims`]. Scalar types yield nothing.
    pub fn walk(self) -> Vec<TypeNode> {
        let mut out = Vec::new();
        let (base, dims) = self.strip_arrays();
        walk_members(base, &[], Orientation::Fwd, &dims, 1, &mut out);
        out
    }

    /// Leaf members below a struct type as `(path, type, orientation)`.
    ///
    /// Leaf types are wrapped in the array depths found along the path.
    pub fn leaves(self) -> Vec<(Vec<Ident>, Type, Orientation)> {
        self.walk()
            .into_iter()
            .filter(|n| n.is_leaf)
            .map(|n| (n.path, n.ty.wrap_dims(&n.dims), n.orientation))
            .collect()
    }

    /// Number of elements of an array type, 0 for any other type.
    ///
    /// The depth must be a constant between 0 and [`MAX_ARRAY_DEPTH`].
    pub fn array_len(self) -> Result<usize, IrError> {
        let TypeKind::Array { depth, .. } = self.kind() else {
            return Ok(0);
        };
        let invalid = |reason: String| IrError::TypeDefinition {
            name: self.to_string(),
            reason,
        };
        let count = depth
            .evaluate()?
            .as_int()
            .and_then(|d| usize::try_from(d).ok())
            .ok_or_else(|| invalid(format!("depth {depth} is not a non-negative integer")))?;
        if count > MAX_ARRAY_DEPTH {
            return Err(invalid(format!(
                "depth {count} exceeds the limit of {MAX_ARRAY_DEPTH}"
            )));
        }
        Ok(count)
    }

    /// The default value of every leaf, shaped like the type.
    pub fn default_aggregate(self) -> Result<Aggregate, IrError> {
        match self.kind() {
            TypeKind::Array { element, .. } => {
                let depth = self.array_len()?;
                let item = element.default_aggregate()?;
                Ok(Aggregate::Array(vec![item; depth]))
            }
            TypeKind::Struct { members, .. } => members
                .iter()
                .map(|m| Ok((m.name, m.ty.default_aggregate()?)))
                .collect::<Result<Vec<_>, IrError>>()
                .map(Aggregate::Struct),
            _ => {
                let default = self.default().unwrap_or_else(|| Expr::int(0));
                Ok(Aggregate::Leaf(default.evaluate()?))
            }
        }
    }

    /// Parameters referenced anywhere in the type.
    pub fn free_params(self) -> IndexSet<Ident> {
        let mut out = IndexSet::new();
        self.visit_exprs(&mut |e| out.extend(e.free_params()));
        out
    }

    /// Returns `true` if no attribute references a parameter.
    pub fn is_resolved(self) -> bool {
        let mut resolved = true;
        self.visit_exprs(&mut |e| resolved &= e.is_resolved());
        resolved
    }

    fn visit_exprs(self, visit: &mut dyn FnMut(Expr)) {
        match self.kind() {
            TypeKind::Bit { default }
            | TypeKind::Bool { default }
            | TypeKind::Integer { default } => visit(*default),
            TypeKind::Uint { width, default } | TypeKind::Sint { width, default } => {
                visit(*width);
                visit(*default);
            }
            TypeKind::Array { element, depth } => {
                element.visit_exprs(visit);
                visit(*depth);
            }
            TypeKind::Enum {
                keytype, default, ..
            } => {
                keytype.visit_exprs(visit);
                visit(*default);
            }
            TypeKind::Struct { members, .. } => {
                for member in members {
                    member.ty.visit_exprs(visit);
                }
            }
            TypeKind::Clock | TypeKind::Reset { .. } => {}
        }
    }

    /// Resolves every attribute under `bindings`; the result may stay symbolic.
    pub fn substitute(self, bindings: &Bindings) -> Result<Type, IrError> {
        if self.is_resolved() && bindings.is_empty() {
            return Ok(self);
        }
        let kind = match self.kind() {
            TypeKind::Bit { default } => TypeKind::Bit {
                default: default.resolve(bindings)?,
            },
            TypeKind::Bool { default } => TypeKind::Bool {
                default: default.resolve(bindings)?,
            },
            TypeKind::Integer { default } => TypeKind::Integer {
                default: default.resolve(bindings)?,
            },
            TypeKind::Uint { width, default } => TypeKind::Uint {
                width: width.resolve(bindings)?,
                default: default.resolve(bindings)?,
            },
            TypeKind::Sint { width, default } => TypeKind::Sint {
                width: width.resolve(bindings)?,
                default: default.resolve(bindings)?,
            },
            TypeKind::Array { element, depth } => TypeKind::Array {
                element: element.substitute(bindings)?,
                depth: depth.resolve(bindings)?,
            },
            TypeKind::Enum {
                name,
                keytype,
                items,
                default,
            } => TypeKind::Enum {
                name: *name,
                keytype: keytype.substitute(bindings)?,
                items: clone_items(items),
                default: default.resolve(bindings)?,
            },
            TypeKind::Struct { name, members } => TypeKind::Struct {
                name: *name,
                members: members
                    .iter()
                    .map(|m| {
                        Ok(StructMember {
                            name: m.name,
                            ty: m.ty.substitute(bindings)?,
                            orientation: m.orientation,
                        })
                    })
                    .collect::<Result<Vec<_>, IrError>>()?,
            },
            TypeKind::Clock | TypeKind::Reset { .. } => return Ok(self),
        };
        Ok(Self::from_kind(kind))
    }

    /// Resolves every attribute to a constant and validates the ranges.
    ///
    /// Fails with [`IrError::UnresolvedParameter`] if any attribute still
    /// references a parameter absent from `bindings`.
    pub fn resolve(self, bindings: &Bindings) -> Result<Type, IrError> {
        let resolved = self.substitute(bindings)?;
        let free = resolved.free_params();
        if !free.is_empty() {
            return Err(IrError::UnresolvedParameter {
                context: self.to_string(),
                params: free.into_iter().collect(),
            });
        }
        resolved.validate()?;
        Ok(resolved)
    }

    fn validate(self) -> Result<(), IrError> {
        let invalid = |reason: String| IrError::TypeDefinition {
            name: self.to_string(),
            reason,
        };
        let width_of = |width: Expr| -> Result<i64, IrError> {
            match width.as_const() {
                Some(Value::Int(w)) if w >= 0 => Ok(w),
                _ => Err(invalid(format!("width {width} is not a non-negative integer"))),
            }
        };
        match self.kind() {
            TypeKind::Bit { default } => check_default(*default, |v| v.fits_unsigned(1), &invalid),
            TypeKind::Bool { default } => match default.as_const() {
                Some(Value::Bool(_)) => Ok(()),
                _ => Err(invalid(format!("default {default} is not a boolean"))),
            },
            TypeKind::Integer { default } => {
                check_default(*default, |v| matches!(v, Value::Int(_)) && v.fits_signed(32), &invalid)
            }
            TypeKind::Uint { width, default } => {
                let w = width_of(*width)?;
                check_default(*default, |v| v.fits_unsigned(w), &invalid)
            }
            TypeKind::Sint { width, default } => {
                let w = width_of(*width)?;
                check_default(*default, |v| matches!(v, Value::Int(_)) && v.fits_signed(w), &invalid)
            }
            TypeKind::Array { element, .. } => {
                self.array_len()?;
                element.validate()
            }
            TypeKind::Enum {
                keytype,
                items,
                default,
                ..
            } => {
                keytype.validate()?;
                let fits = |v: Value| match keytype.kind() {
                    TypeKind::Sint { width, .. } => width.as_int().is_some_and(|w| v.fits_signed(w)),
                    _ => keytype.width().as_int().is_some_and(|w| v.fits_unsigned(w)),
                };
                if let Some(item) = items.iter().find(|i| !fits(Value::Int(i.value))) {
                    return Err(invalid(format!(
                        "value {} of '{}' does not fit {keytype}",
                        item.value, item.label
                    )));
                }
                check_default(*default, fits, &invalid)
            }
            TypeKind::Struct { members, .. } => {
                members.iter().try_for_each(|m| m.ty.validate())
            }
            TypeKind::Clock | TypeKind::Reset { .. } => Ok(()),
        }
    }

    /// The type with scalar defaults cleared, used for connection checks.
    pub fn shape(self) -> Type {
        match self.kind() {
            TypeKind::Bit { .. } => Type::bit(),
            TypeKind::Bool { .. } => Type::bool(),
            TypeKind::Integer { .. } => Type::integer(),
            TypeKind::Uint { width, .. } => Type::uint(*width),
            TypeKind::Sint { width, .. } => Type::sint(*width),
            TypeKind::Array { element, depth } => Type::array(element.shape(), *depth),
            TypeKind::Enum {
                name,
                keytype,
                items,
                ..
            } => Self::from_kind(TypeKind::Enum {
                name: *name,
                keytype: keytype.shape(),
                items: clone_items(items),
                default: Expr::int(0),
            }),
            TypeKind::Struct { .. } | TypeKind::Clock | TypeKind::Reset { .. } => self,
        }
    }

    /// Returns `true` if both types are equal apart from their defaults.
    pub fn compatible_with(self, other: Type) -> bool {
        self == other || self.shape() == other.shape()
    }
}

fn check_default(
    default: Expr,
    fits: impl Fn(Value) -> bool,
    invalid: &dyn Fn(String) -> IrError,
) -> Result<(), IrError> {
    match default.as_const() {
        Some(v) if fits(v) => Ok(()),
        _ => Err(invalid(format!("default {default} is out of range"))),
    }
}

fn clone_items(items: &[EnumItem]) -> Vec<EnumItem> {
    items
        .iter()
        .map(|i| EnumItem {
            value: i.value,
            label: i.label,
        })
        .collect()
}

fn walk_members(
    base: Type,
    path: &[Ident],
    orientation: Orientation,
    dims: &[Expr],
    level: usize,
    out: &mut Vec<TypeNode>,
) {
    for member in base.members() {
        let (member_base, member_dims) = member.ty.strip_arrays();
        let mut member_path = path.to_vec();
        member_path.push(member.name);
        let mut all_dims = dims.to_vec();
        all_dims.extend(member_dims);
        let member_orientation = orientation.then(member.orientation);
        let is_leaf = !member_base.is_struct();
        out.push(TypeNode {
            level,
            path: member_path.clone(),
            ty: member_base,
            orientation: member_orientation,
            dims: all_dims.clone(),
            is_leaf,
        });
        if !is_leaf {
            walk_members(member_base, &member_path, member_orientation, &all_dims, level + 1, out);
        }
    }
}

fn is_zero(e: Expr) -> bool {
    e.as_const().is_some_and(Value::is_zero)
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.type_name();
        match self.kind() {
            TypeKind::Bit { default }
            | TypeKind::Bool { default }
            | TypeKind::Integer { default }
            | TypeKind::Enum { default, .. } => {
                if is_zero(*default) {
                    write!(f, "{name}()")
                } else {
                    write!(f, "{name}(default={default})")
                }
            }
            TypeKind::Uint { width, default } | TypeKind::Sint { width, default } => {
                if is_zero(*default) {
                    write!(f, "{name}({width})")
                } else {
                    write!(f, "{name}({width}, default={default})")
                }
            }
            TypeKind::Array { element, depth } => write!(f, "{name}({element}, {depth})"),
            TypeKind::Struct { .. } | TypeKind::Clock | TypeKind::Reset { .. } => {
                write!(f, "{name}()")
            }
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl Serialize for Type {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Builds an enumeration type item by item.
pub struct EnumBuilder {
    name: Ident,
    keytype: Type,
    items: Vec<EnumItem>,
    default: Option<Expr>,
}

impl EnumBuilder {
    /// Starts an enumeration encoded with `keytype`.
    pub fn new(name: impl Into<Ident>, keytype: Type) -> Self {
        Self {
            name: name.into(),
            keytype,
            items: Vec::new(),
            default: None,
        }
    }

    fn error(&self, reason: String) -> IrError {
        IrError::TypeDefinition {
            name: format!("{}()", self.name),
            reason,
        }
    }

    /// Adds an item; values and labels must be unique.
    pub fn item(mut self, value: i64, label: impl Into<Ident>) -> Result<Self, IrError> {
        let label = label.into();
        if self.items.iter().any(|i| i.value == value) {
            return Err(self.error(format!("key {value} already exists")));
        }
        if self.items.iter().any(|i| i.label == label) {
            return Err(self.error(format!("label '{label}' already exists")));
        }
        self.items.push(EnumItem { value, label });
        Ok(self)
    }

    /// Adds an item with the value following the largest one so far.
    pub fn auto(self, label: impl Into<Ident>) -> Result<Self, IrError> {
        let value = match self.items.iter().map(|i| i.value).max() {
            None => 0,
            Some(last) => last
                .checked_add(1)
                .ok_or_else(|| self.error(format!("no value follows {last}")))?,
        };
        self.item(value, label)
    }

    /// Overrides the default, which otherwise is the key type's default.
    pub fn default_value(mut self, value: impl Into<Expr>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Finishes the type.
    pub fn build(self) -> Type {
        let default = self
            .default
            .or_else(|| self.keytype.default())
            .unwrap_or_else(|| Expr::int(0));
        Type::from_kind(TypeKind::Enum {
            name: self.name,
            keytype: self.keytype,
            items: self.items,
            default,
        })
    }
}

/// Builds a struct type member by member.
pub struct StructBuilder {
    name: Ident,
    members: Vec<StructMember>,
}

impl StructBuilder {
    /// Starts a struct type.
    pub fn new(name: impl Into<Ident>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Adds a forward member.
    pub fn member(self, name: impl Into<Ident>, ty: Type) -> Result<Self, IrError> {
        self.member_with(name, ty, Orientation::Fwd)
    }

    /// Adds a member with an explicit orientation; names must be unique.
    pub fn member_with(
        mut self,
        name: impl Into<Ident>,
        ty: Type,
        orientation: Orientation,
    ) -> Result<Self, IrError> {
        let name = name.into();
        if self.members.iter().any(|m| m.name == name) {
            return Err(IrError::TypeDefinition {
                name: format!("{}()", self.name),
                reason: format!("member '{name}' already exists"),
            });
        }
        self.members.push(StructMember {
            name,
            ty,
            orientation,
        });
        Ok(self)
    }

    /// Finishes the type.
    pub fn build(self) -> Type {
        Type::from_kind(TypeKind::Struct {
            name: self.name,
            members: self.members,
        })
    }
}
