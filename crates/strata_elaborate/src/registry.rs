//! Declaration registry keyed by `library.module`.
//!
//! The [`ModuleRegistry`] is owned by the caller and passed to the
//! elaborator, so independent elaborations never share mutable state.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use strata_common::Ident;
use strata_ir::{HierPath, ModRef, ModuleDecl};

use crate::errors::{ElabError, ElabErrorKind, Stage};

/// Declarations in registration order.
#[derive(Clone, Debug, Default)]
pub struct ModuleRegistry {
    modules: IndexMap<ModRef, Arc<ModuleDecl>>,
}

/// Declaration dependency graph: an edge `a -> b` means `a` instantiates `b`.
pub struct HierarchyGraph {
    /// The graph itself.
    pub graph: DiGraph<ModRef, ()>,
    /// Node of every registered declaration.
    pub nodes: IndexMap<ModRef, NodeIndex>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a declaration; references are unique.
    pub fn add(&mut self, decl: ModuleDecl) -> Result<(), ElabError> {
        let modref = decl.modref;
        if self.modules.contains_key(&modref) {
            return Err(ElabError::new(
                HierPath::default(),
                Stage::Declared,
                ElabErrorKind::DuplicateModule { modref },
            ));
        }
        self.modules.insert(modref, Arc::new(decl));
        Ok(())
    }

    /// Declaration registered under `modref`.
    pub fn get(&self, modref: &ModRef) -> Option<&Arc<ModuleDecl>> {
        self.modules.get(modref)
    }

    /// Like [`ModuleRegistry::get`], failing with `UnknownModule`.
    pub fn lookup(&self, modref: &ModRef) -> Result<Arc<ModuleDecl>, ElabErrorKind> {
        self.modules
            .get(modref)
            .cloned()
            .ok_or(ElabErrorKind::UnknownModule { modref: *modref })
    }

    /// All declarations in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ModuleDecl>> {
        self.modules.values()
    }

    /// Number of declarations.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Library names in first-registration order.
    pub fn libraries(&self) -> IndexSet<Ident> {
        self.modules.keys().map(|r| r.lib).collect()
    }

    /// The declaration followed by its bases, most derived first.
    ///
    /// Stops at a base that is not registered or was already visited.
    pub fn base_chain(&self, decl: &Arc<ModuleDecl>) -> Vec<Arc<ModuleDecl>> {
        let mut chain = vec![Arc::clone(decl)];
        let mut seen = HashSet::from([decl.modref]);
        let mut next = decl.base;
        while let Some(base) = next {
            let Some(found) = self.modules.get(&base) else {
                break;
            };
            if !seen.insert(base) {
                break;
            }
            chain.push(Arc::clone(found));
            next = found.base;
        }
        chain
    }

    /// Builds the instantiation graph over registered declarations.
    pub fn hierarchy_graph(&self) -> HierarchyGraph {
        let mut graph = DiGraph::new();
        let nodes: IndexMap<ModRef, NodeIndex> = self
            .modules
            .keys()
            .map(|modref| (*modref, graph.add_node(*modref)))
            .collect();
        for (modref, decl) in &self.modules {
            for inst in &decl.insts {
                if let Some(&to) = nodes.get(&inst.module) {
                    graph.add_edge(nodes[modref], to, ());
                }
            }
        }
        HierarchyGraph { graph, nodes }
    }

    /// Rejects any instantiation cycle among registered declarations.
    ///
    /// The elaborator detects cycles on the active path as well; this check
    /// covers declarations no elaboration request has reached yet.
    pub fn check_acyclic(&self) -> Result<(), ElabError> {
        let HierarchyGraph { graph, .. } = self.hierarchy_graph();
        let Err(cycle) = toposort(&graph, None) else {
            return Ok(());
        };
        let chain = cycle_through(&graph, cycle.node_id())
            .into_iter()
            .map(|node| graph[node])
            .collect();
        Err(ElabError::new(
            HierPath::default(),
            Stage::Declared,
            ElabErrorKind::CyclicHierarchy { chain },
        ))
    }
}

/// Shortest instantiation cycle from `start` back to itself, in edge order
/// and closed by `start`.
fn cycle_through(graph: &DiGraph<ModRef, ()>, start: NodeIndex) -> Vec<NodeIndex> {
    let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
        for next in graph.neighbors(node) {
            if next == start {
                let mut back = Vec::new();
                let mut current = node;
                while current != start {
                    back.push(current);
                    match parent.get(&current) {
                        Some(prev) => current = *prev,
                        None => break,
                    }
                }
                let mut chain = vec![start];
                chain.extend(back.into_iter().rev());
                chain.push(start);
                return chain;
            }
            if !parent.contains_key(&next) {
                parent.insert(next, node);
                queue.push_back(next);
            }
        }
    }
    vec![start, start]
}
