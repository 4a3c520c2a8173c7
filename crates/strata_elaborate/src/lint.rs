//! Checks on an elaborated design that warn without failing it.

use std::collections::HashSet;

use strata_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use strata_ir::{Design, Direction, IdentKind, LeafEndpoint, ModuleInstance};

/// Input of a sub-instance that no connection drives.
pub const W200: DiagnosticCode = DiagnosticCode::warning(200);

/// Runs every check over `design`.
pub fn lint_design(design: &Design, sink: &DiagnosticSink) {
    for inst in design.pre_order() {
        undriven_inputs(inst, sink);
    }
}

/// W200: input leaves of `inst`'s children without a driver.
///
/// A leaf counts as driven when any connection, sliced or guarded by a mux,
/// targets it. Undriven inputs keep the default of their type.
pub fn undriven_inputs(inst: &ModuleInstance, sink: &DiagnosticSink) {
    let driven: HashSet<LeafEndpoint> = inst.connections.iter().map(|c| c.target.whole()).collect();
    for child in &inst.children {
        for leaf in child.namespace.leaves() {
            if leaf.kind != IdentKind::Port(Direction::In) {
                continue;
            }
            let endpoint = LeafEndpoint::Inst {
                inst: child.name,
                port: leaf.name,
            };
            if !driven.contains(&endpoint) {
                sink.emit(
                    Diagnostic::new(W200, format!("input '{endpoint}' is not driven"))
                        .at(&inst.path)
                        .with_note(format!("tied to the default of {}", leaf.ty)),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use std::sync::Arc;
    use strata_common::Ident;
    use strata_diagnostics::Severity;
    use strata_ir::{
        Connection, HierPath, Identifier, ModRef, ModuleBuilder, Namespace, Slice, Type, Value,
    };

    fn inst(
        name: &str,
        path: HierPath,
        namespace: Namespace,
        children: Vec<ModuleInstance>,
        connections: Vec<Connection>,
    ) -> ModuleInstance {
        ModuleInstance {
            decl: Arc::new(ModuleBuilder::new(ModRef::new("lib", name)).build()),
            name: *path.segments().last().unwrap(),
            path,
            modname: name.to_string(),
            topmodname: "top".to_string(),
            config: None,
            params: IndexMap::new(),
            namespace,
            children,
            connections,
        }
    }

    fn leaf_ports() -> Namespace {
        let mut ns = Namespace::new();
        ns.add(Identifier::port("en_i", Type::bit(), Direction::In)).unwrap();
        ns.add(Identifier::port("data_i", Type::uint(8), Direction::In)).unwrap();
        ns.add(Identifier::port("data_o", Type::uint(8), Direction::Out)).unwrap();
        ns
    }

    fn design(connections: Vec<Connection>) -> Design {
        let top = HierPath::root("top");
        let children = vec![
            inst("leaf", top.child("u_a"), leaf_ports(), vec![], vec![]),
            inst("leaf", top.child("u_b"), leaf_ports(), vec![], vec![]),
        ];
        Design::new(inst("top", top, Namespace::new(), children, connections))
    }

    fn port(inst: &str, port: &str) -> LeafEndpoint {
        LeafEndpoint::Inst {
            inst: Ident::new(inst),
            port: Ident::new(port),
        }
    }

    #[test]
    fn reports_each_undriven_input() {
        let one = LeafEndpoint::Const(Value::Int(1));
        let sliced = port("u_b", "data_i").sliced(Slice::new(3, 0).unwrap()).unwrap();
        let d = design(vec![
            Connection::new(port("u_a", "en_i"), one),
            Connection::new(port("u_a", "data_i"), port("u_b", "data_o")),
            Connection::new(sliced, port("u_a", "data_o")),
        ]);
        let sink = DiagnosticSink::new();
        lint_design(&d, &sink);
        let diags = sink.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, W200);
        assert_eq!(diags[0].severity(), Severity::Warning);
        assert_eq!(diags[0].message, "input 'u_b/en_i' is not driven");
        assert_eq!(diags[0].path, Some(HierPath::root("top")));
        assert_eq!(diags[0].notes, vec!["tied to the default of BitType()".to_string()]);
        assert!(!sink.has_errors());
    }

    #[test]
    fn fully_connected_design_is_clean() {
        let one = LeafEndpoint::Const(Value::Int(1));
        let zero = LeafEndpoint::Const(Value::Int(0));
        let d = design(vec![
            Connection::new(port("u_a", "en_i"), one),
            Connection::new(port("u_b", "en_i"), zero),
            Connection::new(port("u_a", "data_i"), port("u_b", "data_o")),
            Connection::new(port("u_b", "data_i"), port("u_a", "data_o")),
        ]);
        let sink = DiagnosticSink::new();
        lint_design(&d, &sink);
        assert!(sink.diagnostics().is_empty());
    }
}
