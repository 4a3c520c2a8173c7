//! Ordered identifier collections with flattened-name uniqueness.

use crate::error::IrError;
use crate::expr::Bindings;
use crate::ident::{FlatIdent, IdentKind, Identifier};
use indexmap::{IndexMap, IndexSet};
use strata_common::Ident;

/// Identifiers in declaration order.
///
/// Every root name and every flattened member name is unique within a
/// namespace, so `bus_i` with member `addr` blocks a separate `bus_addr_i`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Namespace {
    idents: IndexMap<Ident, Identifier>,
    // flattened name -> root name
    flat: IndexMap<Ident, Ident>,
}

impl Namespace {
    /// Creates an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `ident`, rejecting any name clash.
    pub fn add(&mut self, ident: Identifier) -> Result<(), IrError> {
        if self.idents.contains_key(&ident.name) {
            return Err(IrError::DuplicateIdentifier { name: ident.name });
        }
        let names: Vec<Ident> = ident
            .iter_tree()
            .into_iter()
            .map(|node| node.name)
            .filter(|name| !name.is_empty())
            .collect();
        let mut seen = IndexSet::with_capacity(names.len());
        if let Some(clash) = names
            .iter()
            .find(|name| self.flat.contains_key(*name) || !seen.insert(**name))
        {
            return Err(IrError::DuplicateIdentifier { name: *clash });
        }
        for name in names {
            self.flat.insert(name, ident.name);
        }
        self.idents.insert(ident.name, ident);
        Ok(())
    }

    /// Root identifier by declared name.
    pub fn get(&self, name: impl Into<Ident>) -> Option<&Identifier> {
        self.idents.get(&name.into())
    }

    /// Returns `true` if `name` is a root or flattened name.
    pub fn contains(&self, name: impl Into<Ident>) -> bool {
        self.flat.contains_key(&name.into())
    }

    /// Tree node by root or flattened name.
    pub fn find(&self, name: impl Into<Ident>) -> Option<FlatIdent> {
        let name = name.into();
        let root = self.flat.get(&name)?;
        self.idents
            .get(root)?
            .iter_tree()
            .into_iter()
            .find(|node| node.name == name)
    }

    /// Leaves at or below the node `name`, in tree order.
    pub fn leaves_of(&self, name: impl Into<Ident>) -> Option<Vec<FlatIdent>> {
        let name = name.into();
        let root = self.flat.get(&name)?;
        let tree = self.idents.get(root)?.iter_tree();
        let pos = tree.iter().position(|node| node.name == name)?;
        let level = tree[pos].level;
        let subtree = std::iter::once(&tree[pos])
            .chain(tree[pos + 1..].iter().take_while(|node| node.level > level));
        Some(subtree.filter(|node| node.is_leaf).cloned().collect())
    }

    /// Like [`Namespace::find`], failing with [`IrError::UnknownIdentifier`].
    pub fn lookup(&self, name: impl Into<Ident>) -> Result<FlatIdent, IrError> {
        let name = name.into();
        self.find(name).ok_or(IrError::UnknownIdentifier {
            name: name.to_string(),
        })
    }

    /// All identifiers in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Identifier> {
        self.idents.values()
    }

    /// Ports in declaration order.
    pub fn ports(&self) -> impl Iterator<Item = &Identifier> {
        self.iter()
            .filter(|i| matches!(i.kind, IdentKind::Port(_)))
    }

    /// Signals in declaration order.
    pub fn signals(&self) -> impl Iterator<Item = &Identifier> {
        self.iter().filter(|i| i.kind == IdentKind::Signal)
    }

    /// Parameters in declaration order.
    pub fn params(&self) -> impl Iterator<Item = &Identifier> {
        self.iter().filter(|i| i.kind == IdentKind::Param)
    }

    /// Flattened leaves of every identifier.
    pub fn leaves(&self) -> Vec<FlatIdent> {
        self.iter().flat_map(Identifier::flatten).collect()
    }

    /// Number of root identifiers.
    pub fn len(&self) -> usize {
        self.idents.len()
    }

    /// Returns `true` if the namespace holds no identifier.
    pub fn is_empty(&self) -> bool {
        self.idents.is_empty()
    }

    /// A copy with every identifier's type resolved under `bindings`.
    pub fn resolve_types(&self, bindings: &Bindings) -> Result<Namespace, IrError> {
        let idents = self
            .idents
            .iter()
            .map(|(name, ident)| Ok((*name, ident.resolve(bindings)?)))
            .collect::<Result<IndexMap<_, _>, IrError>>()?;
        Ok(Namespace {
            idents,
            flat: self.flat.clone(),
        })
    }
}

impl<'a> IntoIterator for &'a Namespace {
    type Item = &'a Identifier;
    type IntoIter = indexmap::map::Values<'a, Ident, Identifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.idents.values()
    }
}
