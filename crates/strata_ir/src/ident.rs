//! Named, typed identifiers and their flattened member trees.

use crate::error::IrError;
use crate::expr::{Bindings, Expr};
use crate::types::{Aggregate, Orientation, Type, TypeKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use strata_common::Ident;

/// Port direction, seen from inside the owning module.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Input.
    In,
    /// Output.
    Out,
    /// Bidirectional.
    Inout,
}

impl Direction {
    /// Name suffix for ports of this direction.
    pub fn suffix(self) -> &'static str {
        match self {
            Direction::In => "_i",
            Direction::Out => "_o",
            Direction::Inout => "_io",
        }
    }

    /// Direction of a member with `orientation` inside a port of this direction.
    pub fn apply(self, orientation: Orientation) -> Direction {
        match (orientation, self) {
            (Orientation::Fwd, dir) => dir,
            (Orientation::Bidir, _) | (Orientation::Bwd, Direction::Inout) => Direction::Inout,
            (Orientation::Bwd, Direction::In) => Direction::Out,
            (Orientation::Bwd, Direction::Out) => Direction::In,
        }
    }

    /// The opposite direction; `Inout` stays `Inout`.
    pub fn flip(self) -> Direction {
        self.apply(Orientation::Bwd)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::In => write!(f, "IN"),
            Direction::Out => write!(f, "OUT"),
            Direction::Inout => write!(f, "INOUT"),
        }
    }
}

/// What an identifier declares.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentKind {
    /// A module port.
    Port(Direction),
    /// An internal signal.
    Signal,
    /// A parameter; its value is the type's default.
    Param,
}

impl fmt::Display for IdentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentKind::Port(_) => write!(f, "port"),
            IdentKind::Signal => write!(f, "signal"),
            IdentKind::Param => write!(f, "param"),
        }
    }
}

/// A declared port, signal or parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Identifier {
    /// Declared name; may be empty for anonymous struct ports.
    pub name: Ident,
    /// Declared type.
    pub ty: Type,
    /// Port, signal or parameter.
    pub kind: IdentKind,
    /// Free-form documentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    /// Preprocessor defines guarding the declaration in generated code.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ifdefs: Vec<Ident>,
}

/// One node of an identifier's flattened member tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlatIdent {
    /// Flattened name, e.g. `bus_addr_i`.
    pub name: Ident,
    /// Node type with array depths from enclosing structs stripped.
    pub ty: Type,
    /// 0 for the root, member depth otherwise.
    pub level: usize,
    /// Member path below the root.
    pub path: Vec<Ident>,
    /// Orientation accumulated along the path.
    pub orientation: Orientation,
    /// Kind with the port direction recomputed for this node.
    pub kind: IdentKind,
    /// Array depths of enclosing array-of-struct members, outermost first.
    pub dims: Vec<Expr>,
    /// `true` if nothing is flattened below this node.
    pub is_leaf: bool,
}

impl FlatIdent {
    /// Node type wrapped in the enclosing array depths.
    pub fn full_type(&self) -> Type {
        self.ty.wrap_dims(&self.dims)
    }

    /// Direction for port nodes.
    pub fn direction(&self) -> Option<Direction> {
        match self.kind {
            IdentKind::Port(dir) => Some(dir),
            _ => None,
        }
    }
}

const SUFFIXES: [&str; 6] = ["_io", "_i", "_o", "_s", "_r", "_p"];

/// Splits `name` into basename and a known suffix.
pub fn split_suffix(name: &str) -> (&str, &str) {
    SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix).map(|base| (base, *suffix)))
        .unwrap_or((name, ""))
}

impl Identifier {
    /// A port.
    pub fn port(name: impl Into<Ident>, ty: Type, direction: Direction) -> Self {
        Self::new(name, ty, IdentKind::Port(direction))
    }

    /// A signal.
    pub fn signal(name: impl Into<Ident>, ty: Type) -> Self {
        Self::new(name, ty, IdentKind::Signal)
    }

    /// A parameter whose value is the type's default.
    pub fn param(name: impl Into<Ident>, ty: Type) -> Self {
        Self::new(name, ty, IdentKind::Param)
    }

    fn new(name: impl Into<Ident>, ty: Type, kind: IdentKind) -> Self {
        Self {
            name: name.into(),
            ty,
            kind,
            doc: None,
            ifdefs: Vec::new(),
        }
    }

    /// Attaches documentation.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Guards the declaration by the preprocessor defines `names`.
    ///
    /// Empty names are dropped, and each remaining one must be an identifier.
    pub fn with_ifdefs<I, S>(mut self, names: I) -> Result<Self, IrError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            let name = name.as_ref();
            if name.is_empty() {
                continue;
            }
            if !is_define_name(name) {
                return Err(IrError::InvalidReference {
                    text: name.to_string(),
                    reason: "ifdef must be an identifier".to_string(),
                });
            }
            self.ifdefs.push(Ident::new(name));
        }
        Ok(self)
    }

    /// Port direction, if this is a port.
    pub fn direction(&self) -> Option<Direction> {
        match self.kind {
            IdentKind::Port(dir) => Some(dir),
            _ => None,
        }
    }

    /// Value of a parameter (the type default).
    pub fn value(&self) -> Option<Expr> {
        match self.kind {
            IdentKind::Param => self.ty.default(),
            _ => None,
        }
    }

    /// Pre-order tree of the identifier and its struct members.
    pub fn iter_tree(&self) -> Vec<FlatIdent> {
        let (base, suffix) = split_suffix(self.name.as_str());
        let root = FlatIdent {
            name: self.name,
            ty: self.ty,
            level: 0,
            path: Vec::new(),
            orientation: Orientation::Fwd,
            kind: self.kind,
            dims: Vec::new(),
            is_leaf: !self.ty.strip_arrays().0.is_struct(),
        };
        let mut out = vec![root];
        for node in self.ty.walk() {
            let kind = match self.kind {
                IdentKind::Port(dir) => IdentKind::Port(dir.apply(node.orientation)),
                other => other,
            };
            let node_suffix = match kind {
                IdentKind::Port(dir) if !suffix.is_empty() || base.is_empty() => dir.suffix(),
                _ => suffix,
            };
            let members: Vec<&str> = node.path.iter().map(|p| p.as_str()).collect();
            let joined = members.join("_");
            let name = if base.is_empty() {
                format!("{joined}{node_suffix}")
            } else {
                format!("{base}_{joined}{node_suffix}")
            };
            out.push(FlatIdent {
                name: Ident::new(&name),
                ty: node.ty,
                level: node.level,
                path: node.path,
                orientation: node.orientation,
                kind,
                dims: node.dims,
                is_leaf: node.is_leaf,
            });
        }
        out
    }

    /// Leaf nodes of [`Identifier::iter_tree`].
    pub fn flatten(&self) -> Vec<FlatIdent> {
        self.iter_tree().into_iter().filter(|n| n.is_leaf).collect()
    }

    /// Resolves the type under `bindings`.
    pub fn resolve(&self, bindings: &Bindings) -> Result<Identifier, IrError> {
        let ty = self.ty.resolve(bindings).map_err(|err| match err {
            IrError::UnresolvedParameter { params, .. } => IrError::UnresolvedParameter {
                context: self.name.to_string(),
                params,
            },
            other => other,
        })?;
        Ok(Identifier { ty, ..self.clone() })
    }

    /// Splits a structured value into one value per flattened leaf.
    ///
    /// Leaves below arrays of structs receive array values, index 0 first.
    pub fn split(&self, value: &Aggregate) -> Result<Vec<(Ident, Aggregate)>, IrError> {
        self.flatten()
            .into_iter()
            .map(|leaf| Ok((leaf.name, extract(self.ty, value, &leaf.path, leaf.name)?)))
            .collect()
    }

    /// Rebuilds a structured value from per-leaf values produced by
    /// [`Identifier::split`].
    pub fn aggregate(&self, leaves: &[(Ident, Aggregate)]) -> Result<Aggregate, IrError> {
        let by_name: HashMap<Ident, &Aggregate> = leaves.iter().map(|(n, v)| (*n, v)).collect();
        let by_path = self
            .flatten()
            .into_iter()
            .map(|leaf| {
                by_name
                    .get(&leaf.name)
                    .map(|v| (leaf.path, *v))
                    .ok_or(IrError::UnknownIdentifier {
                        name: leaf.name.to_string(),
                    })
            })
            .collect::<Result<HashMap<_, _>, IrError>>()?;
        build(self.ty, &mut Vec::new(), &mut Vec::new(), &by_path)
    }
}

fn shape_error(name: Ident) -> IrError {
    IrError::TypeDefinition {
        name: name.to_string(),
        reason: "value does not match the type structure".to_string(),
    }
}

fn extract(ty: Type, value: &Aggregate, path: &[Ident], leaf: Ident) -> Result<Aggregate, IrError> {
    let Some((first, rest)) = path.split_first() else {
        return Ok(value.clone());
    };
    match value {
        Aggregate::Array(items) => items
            .iter()
            .map(|item| extract(peel(ty), item, path, leaf))
            .collect::<Result<Vec<_>, _>>()
            .map(Aggregate::Array),
        Aggregate::Struct(_) => {
            let member = ty
                .members()
                .iter()
                .find(|m| m.name == *first)
                .ok_or_else(|| shape_error(leaf))?;
            let field = value.field(*first).ok_or_else(|| shape_error(leaf))?;
            extract(member.ty, field, rest, leaf)
        }
        Aggregate::Leaf(_) => Err(shape_error(leaf)),
    }
}

fn peel(ty: Type) -> Type {
    match ty.kind() {
        TypeKind::Array { element, .. } => *element,
        _ => ty,
    }
}

fn build(
    ty: Type,
    path: &mut Vec<Ident>,
    index: &mut Vec<usize>,
    leaves: &HashMap<Vec<Ident>, &Aggregate>,
) -> Result<Aggregate, IrError> {
    if !ty.strip_arrays().0.is_struct() {
        let dotted = Ident::new(&path.iter().map(|p| p.as_str()).collect::<Vec<_>>().join("."));
        let leaf = leaves.get(path.as_slice()).ok_or(IrError::UnknownIdentifier {
            name: dotted.to_string(),
        })?;
        return index
            .iter()
            .try_fold(*leaf, |agg, i| agg.index(*i))
            .cloned()
            .ok_or_else(|| shape_error(dotted));
    }
    if ty.is_struct() {
        let mut fields = Vec::new();
        for member in ty.members() {
            path.push(member.name);
            let value = build(member.ty, path, index, leaves);
            path.pop();
            fields.push((member.name, value?));
        }
        return Ok(Aggregate::Struct(fields));
    }
    let depth = ty.array_len()?;
    let mut items = Vec::with_capacity(depth);
    for i in 0..depth {
        index.push(i);
        let value = build(peel(ty), path, index, leaves);
        index.pop();
        items.push(value?);
    }
    Ok(Aggregate::Array(items))
}

pub(crate) fn is_define_name(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, '{}'", self.kind, self.ty, self.name)?;
        match self.ifdefs.as_slice() {
            [] => {}
            [one] => write!(f, ", ifdef='{one}'")?,
            many => {
                let names: Vec<String> = many.iter().map(|n| format!("'{n}'")).collect();
                write!(f, ", ifdefs=({})", names.join(", "))?;
            }
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StructBuilder;
    use crate::value::Value;

    fn a_type() -> Type {
        StructBuilder::new("AType")
            .member("req", Type::bit())
            .unwrap()
            .member("data", Type::array(Type::uint(16), 5))
            .unwrap()
            .member_with("ack", Type::bit(), Orientation::Bwd)
            .unwrap()
            .member_with("error", Type::bit(), Orientation::Bidir)
            .unwrap()
            .build()
    }

    fn names(nodes: &[FlatIdent]) -> Vec<String> {
        nodes.iter().map(|n| n.name.to_string()).collect()
    }

    #[test]
    fn suffix_split() {
        assert_eq!(split_suffix("bus_i"), ("bus", "_i"));
        assert_eq!(split_suffix("pad_io"), ("pad", "_io"));
        assert_eq!(split_suffix("count_r"), ("count", "_r"));
        assert_eq!(split_suffix("plain"), ("plain", ""));
        assert_eq!(split_suffix("_i"), ("", "_i"));
    }

    #[test]
    fn direction_under_orientation() {
        assert_eq!(Direction::In.apply(Orientation::Bwd), Direction::Out);
        assert_eq!(Direction::Out.apply(Orientation::Bwd), Direction::In);
        assert_eq!(Direction::In.apply(Orientation::Bidir), Direction::Inout);
        assert_eq!(Direction::Out.apply(Orientation::Fwd), Direction::Out);
        assert_eq!(Direction::In.flip(), Direction::Out);
        assert_eq!(Direction::Inout.flip(), Direction::Inout);
    }

    #[test]
    fn port_leaf_suffix_follows_direction() {
        let port = Identifier::port("a_i", a_type(), Direction::In);
        assert_eq!(
            names(&port.iter_tree()),
            vec!["a_i", "a_req_i", "a_data_i", "a_ack_o", "a_error_io"]
        );
        let leaves = port.flatten();
        assert_eq!(leaves.len(), 4);
        assert_eq!(leaves[1].ty, Type::array(Type::uint(16), 5));
        assert_eq!(leaves[2].direction(), Some(Direction::Out));
    }

    #[test]
    fn signal_keeps_suffix() {
        let sig = Identifier::signal("a_s", a_type());
        assert_eq!(
            names(&sig.flatten()),
            vec!["a_req_s", "a_data_s", "a_ack_s", "a_error_s"]
        );
    }

    #[test]
    fn anonymous_clock_reset_port() {
        let port = Identifier::port("", Type::clk_rst_an(), Direction::In);
        assert_eq!(names(&port.flatten()), vec!["clk_i", "rst_an_i"]);
        let named = Identifier::port("sys_i", Type::clk_rst_an(), Direction::In);
        assert_eq!(names(&named.flatten()), vec!["sys_clk_i", "sys_rst_an_i"]);
    }

    #[test]
    fn nested_levels_and_array_dims() {
        let b_type = StructBuilder::new("BType")
            .member("foo", a_type())
            .unwrap()
            .member("bar", Type::array(a_type(), 3))
            .unwrap()
            .build();
        let port = Identifier::port("b_o", b_type, Direction::Out);
        let tree = port.iter_tree();
        let levels: Vec<usize> = tree.iter().map(|n| n.level).collect();
        assert_eq!(levels, vec![0, 1, 2, 2, 2, 2, 1, 2, 2, 2, 2]);
        let bar_req = tree.iter().find(|n| n.name.as_str() == "b_bar_req_o").unwrap();
        assert_eq!(bar_req.dims, vec![Expr::int(3)]);
        assert_eq!(bar_req.full_type(), Type::array(Type::bit(), 3));
        let bar_ack = tree.iter().find(|n| n.name.as_str() == "b_bar_ack_i").unwrap();
        assert_eq!(bar_ack.direction(), Some(Direction::In));
    }

    #[test]
    fn split_aggregate_round_trip() {
        let b_type = StructBuilder::new("BType")
            .member("foo", a_type())
            .unwrap()
            .member("bar", Type::array(a_type(), 3))
            .unwrap()
            .build();
        let sig = Identifier::signal("b_s", b_type);
        let mut value = b_type.default_aggregate().unwrap();
        if let Aggregate::Struct(fields) = &mut value {
            if let Aggregate::Array(items) = &mut fields[1].1 {
                if let Aggregate::Struct(members) = &mut items[2] {
                    members[0].1 = Aggregate::Leaf(Value::Int(1));
                }
            }
        }
        let leaves = sig.split(&value).unwrap();
        assert_eq!(leaves.len(), 8);
        let bar_req = leaves
            .iter()
            .find(|(n, _)| n.as_str() == "b_bar_req_s")
            .map(|(_, v)| v.clone())
            .unwrap();
        assert_eq!(
            bar_req,
            Aggregate::Array(vec![
                Aggregate::Leaf(Value::Int(0)),
                Aggregate::Leaf(Value::Int(0)),
                Aggregate::Leaf(Value::Int(1)),
            ])
        );
        assert_eq!(sig.aggregate(&leaves).unwrap(), value);
    }

    #[test]
    fn aggregate_rejects_oversized_array() {
        let c_type = StructBuilder::new("CType").member("x", Type::bit()).unwrap().build();
        let sig = Identifier::signal("c_s", Type::array(c_type, 1i64 << 40));
        let leaves = vec![(Ident::new("c_x_s"), Aggregate::Array(Vec::new()))];
        let err = sig.aggregate(&leaves).unwrap_err();
        assert!(err.to_string().contains("exceeds the limit"));
    }

    #[test]
    fn ifdef_guards() {
        let port = Identifier::port("dbg_o", Type::bit(), Direction::Out)
            .with_ifdefs(["ASIC"])
            .unwrap();
        assert_eq!(port.to_string(), "port(BitType(), 'dbg_o', ifdef='ASIC')");
        let param = Identifier::param("cnt_p", Type::uint(6))
            .with_ifdefs(["ASIC", "", "BEHAV"])
            .unwrap();
        assert_eq!(param.ifdefs, vec![Ident::new("ASIC"), Ident::new("BEHAV")]);
        assert!(param.to_string().ends_with("ifdefs=('ASIC', 'BEHAV'))"));
        let none = Identifier::signal("x_s", Type::bit()).with_ifdefs([""]).unwrap();
        assert!(none.ifdefs.is_empty());
        assert!(Identifier::signal("x_s", Type::bit()).with_ifdefs(["NOT VALID"]).is_err());
    }

    #[test]
    fn resolve_reports_identifier() {
        let sig = Identifier::signal("data_s", Type::uint(Expr::param("width_p")));
        let err = sig.resolve(&Bindings::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unresolved parameter(s) 'width_p' in data_s"
        );
        let ok = sig.resolve(&Bindings::new().with("width_p", 8)).unwrap();
        assert_eq!(ok.ty, Type::uint(8));
    }
}
