//! Validation of declared assignments at leaf level.
//!
//! Both endpoints of an assignment are flattened and paired member by
//! member. Backward members swap driver and sink, bidirectional members are
//! connected without direction checks. Sliced endpoints connect single
//! vector leaves of equal width, and every sink bit has at most one driver.
//! A multiplexer counts as one driver for each of its targets.

use std::collections::{HashMap, HashSet};

use strata_common::Ident;
use strata_ir::{
    Assign, Bindings, Connection, Direction, Endpoint, FlatIdent, IdentKind, IrError,
    LeafEndpoint, ModuleInstance, Mux, MuxCase, MuxGuard, Namespace, Orientation, Slice, Type,
    TypeKind, Value,
};

use crate::errors::ElabErrorKind;

/// What an assignment may refer to from inside one instance.
pub struct ConnectScope<'a> {
    /// The instance's own resolved namespace.
    pub namespace: &'a Namespace,
    /// The instance's parameter bindings, for constant sources.
    pub bindings: &'a Bindings,
    /// Elaborated children.
    pub children: &'a [ModuleInstance],
}

#[derive(Clone, Copy)]
struct Leaf {
    endpoint: LeafEndpoint,
    kind: IdentKind,
    relative: Orientation,
    local: bool,
}

impl Leaf {
    fn label(&self) -> String {
        self.endpoint.to_string()
    }
}

enum Side {
    Node {
        label: String,
        ty: Type,
        leaves: Vec<Leaf>,
        sliced: bool,
    },
    Const(Value),
}

/// One leaf pair of an assignment, after direction checks.
struct Link {
    sink: Leaf,
    source: LeafEndpoint,
    driver: String,
    directed: bool,
}

struct Driver {
    slice: Option<Slice>,
    label: String,
    owner: Option<Ident>,
}

/// Drivers per whole sink leaf.
#[derive(Default)]
struct Drivers(HashMap<LeafEndpoint, Vec<Driver>>);

impl Drivers {
    /// Records `label` as driver of `sink`. Drivers sharing an `owner` may
    /// drive the same bits.
    fn record(
        &mut self,
        sink: &Leaf,
        label: String,
        owner: Option<Ident>,
    ) -> Result<(), ElabErrorKind> {
        let slice = sink.endpoint.slice();
        let entries = self.0.entry(sink.endpoint.whole()).or_default();
        let clash = entries.iter().find(|d| {
            let overlap = match (d.slice, slice) {
                (Some(a), Some(b)) => a.overlaps(b),
                _ => true,
            };
            overlap && (owner.is_none() || d.owner != owner)
        });
        if let Some(first) = clash {
            return Err(ElabErrorKind::MultipleDriver {
                sink: sink.label(),
                first: first.label.clone(),
                second: label,
            });
        }
        entries.push(Driver { slice, label, owner });
        Ok(())
    }
}

fn relative(node: Orientation, leaf: Orientation) -> Orientation {
    match node {
        Orientation::Fwd => leaf,
        Orientation::Bwd => Orientation::Bwd.then(leaf),
        Orientation::Bidir => Orientation::Bidir,
    }
}

fn node_leaves(
    namespace: &Namespace,
    node: &FlatIdent,
    to_endpoint: impl Fn(Ident) -> LeafEndpoint,
    local: bool,
) -> Vec<Leaf> {
    namespace
        .leaves_of(node.name)
        .unwrap_or_default()
        .into_iter()
        .map(|leaf| Leaf {
            endpoint: to_endpoint(leaf.name),
            kind: leaf.kind,
            relative: relative(node.orientation, leaf.orientation),
            local,
        })
        .collect()
}

fn fits(ty: Type, value: Value) -> bool {
    ty.with_default(value)
        .and_then(|t| t.resolve(&Bindings::new()))
        .is_ok()
}

fn is_vector(ty: Type) -> bool {
    matches!(
        ty.kind(),
        TypeKind::Bit { .. } | TypeKind::Uint { .. } | TypeKind::Sint { .. }
    )
}

impl ConnectScope<'_> {
    fn side(&self, endpoint: &Endpoint) -> Result<Side, ElabErrorKind> {
        match endpoint {
            Endpoint::Local(name) => {
                let node = self.namespace.lookup(*name)?;
                Ok(Side::Node {
                    label: name.to_string(),
                    ty: node.full_type(),
                    leaves: node_leaves(self.namespace, &node, LeafEndpoint::Local, true),
                    sliced: false,
                })
            }
            Endpoint::Inst { inst, port } => {
                let child = self
                    .children
                    .iter()
                    .find(|c| c.name == *inst)
                    .ok_or(ElabErrorKind::UnknownInstance { name: *inst })?;
                let label = format!("{inst}/{port}");
                let node = child
                    .namespace
                    .find(*port)
                    .filter(|n| matches!(n.kind, IdentKind::Port(_)))
                    .ok_or_else(|| IrError::UnknownIdentifier {
                        name: label.clone(),
                    })?;
                let inst = *inst;
                Ok(Side::Node {
                    label,
                    ty: node.full_type(),
                    leaves: node_leaves(
                        &child.namespace,
                        &node,
                        |port| LeafEndpoint::Inst { inst, port },
                        false,
                    ),
                    sliced: false,
                })
            }
            Endpoint::Sliced { slice, .. } => self.sliced_side(endpoint.whole(), *slice),
            Endpoint::Const(expr) => Ok(Side::Const(expr.evaluate_with(self.bindings)?)),
        }
    }

    fn sliced_side(&self, whole: Endpoint, slice: Slice) -> Result<Side, ElabErrorKind> {
        let invalid = |reason: String| ElabErrorKind::InvalidSlice {
            endpoint: format!("{whole}{slice}"),
            reason,
        };
        let Side::Node { label, ty, leaves, .. } = self.side(&whole)? else {
            return Err(invalid("only ports and signals can be sliced".to_string()));
        };
        let [leaf] = leaves.as_slice() else {
            return Err(invalid(format!("{ty} is not a vector")));
        };
        if !is_vector(ty) {
            return Err(invalid(format!("{ty} is not a vector")));
        }
        let width = ty.width().as_int().unwrap_or(0);
        if !slice.fits(width) {
            return Err(invalid(format!("exceeds the {width} bits of {ty}")));
        }
        let endpoint = leaf
            .endpoint
            .sliced(slice)
            .ok_or_else(|| invalid("only ports and signals can be sliced".to_string()))?;
        Ok(Side::Node {
            label: format!("{label}{slice}"),
            ty: Type::uint(i64::from(slice.width())),
            leaves: vec![Leaf { endpoint, ..*leaf }],
            sliced: true,
        })
    }

    /// Pairs the leaves of one assignment and checks types and directions.
    fn link(&self, assign: &Assign) -> Result<Vec<Link>, ElabErrorKind> {
        let target = self.side(&assign.target)?;
        let source = self.side(&assign.source)?;
        match (target, source) {
            (Side::Const(value), _) => Err(ElabErrorKind::Direction {
                action: "drive",
                endpoint: value.to_string(),
                reason: "a constant cannot be driven".to_string(),
            }),
            (Side::Node { label, ty, leaves, .. }, Side::Const(value)) => {
                let [leaf] = leaves.as_slice() else {
                    return Err(mismatch(label, ty, value.to_string(), "constant".to_string()));
                };
                if !fits(ty, value) {
                    return Err(mismatch(label, ty, value.to_string(), "constant".to_string()));
                }
                check_sink(leaf)?;
                Ok(vec![Link {
                    sink: *leaf,
                    source: LeafEndpoint::Const(value),
                    driver: value.to_string(),
                    directed: true,
                }])
            }
            (
                Side::Node {
                    label: target_label,
                    ty: target_ty,
                    leaves: target_leaves,
                    sliced: target_sliced,
                },
                Side::Node {
                    label: source_label,
                    ty: source_ty,
                    leaves: source_leaves,
                    sliced: source_sliced,
                },
            ) => {
                let compatible = if target_sliced || source_sliced {
                    let width = target_ty.width().as_int();
                    target_leaves.len() == 1
                        && source_leaves.len() == 1
                        && width.is_some()
                        && width == source_ty.width().as_int()
                } else {
                    target_ty.compatible_with(source_ty)
                        && target_leaves.len() == source_leaves.len()
                };
                if !compatible {
                    return Err(mismatch(
                        target_label,
                        target_ty,
                        source_label,
                        source_ty.to_string(),
                    ));
                }
                let mut links = Vec::with_capacity(target_leaves.len());
                for (t, s) in target_leaves.iter().zip(&source_leaves) {
                    let bidir =
                        t.relative == Orientation::Bidir || is_inout(t.kind) || is_inout(s.kind);
                    let (sink, driver) = match t.relative {
                        Orientation::Bwd => (s, t),
                        _ => (t, s),
                    };
                    if !bidir {
                        check_sink(sink)?;
                        check_driver(driver)?;
                    }
                    links.push(Link {
                        sink: *sink,
                        source: driver.endpoint,
                        driver: driver.label(),
                        directed: !bidir,
                    });
                }
                Ok(links)
            }
        }
    }

    /// Validates every assignment and multiplexer and returns the leaf
    /// connections, plain assignments first.
    pub fn validate(
        &self,
        assigns: &[Assign],
        muxes: &[Mux],
    ) -> Result<Vec<Connection>, ElabErrorKind> {
        let mut drivers = Drivers::default();
        let mut connections = Vec::new();
        for assign in assigns {
            for link in self.link(assign)? {
                if link.directed {
                    drivers.record(&link.sink, link.driver, None)?;
                }
                connections.push(Connection::new(link.sink.endpoint, link.source));
            }
        }
        for mux in muxes {
            connections.extend(self.validate_mux(mux, &mut drivers)?);
        }
        Ok(connections)
    }

    fn validate_mux(
        &self,
        mux: &Mux,
        drivers: &mut Drivers,
    ) -> Result<Vec<Connection>, ElabErrorKind> {
        let owner = format!("mux {}", mux.name);
        let mut branches = vec![(
            MuxGuard {
                mux: mux.name,
                select: None,
            },
            mux.defaults.as_slice(),
        )];
        let mut conditions = HashSet::new();
        for case in &mux.cases {
            let (sel, value) = self.select(mux, case)?;
            if !conditions.insert((sel, value)) {
                return Err(ElabErrorKind::InvalidMux {
                    mux: mux.name,
                    reason: format!("condition '{sel} == {value}' is used twice"),
                });
            }
            let guard = MuxGuard {
                mux: mux.name,
                select: Some((sel, value)),
            };
            branches.push((guard, case.assigns.as_slice()));
        }

        let mut connections = Vec::new();
        for (guard, assigns) in branches {
            let mut branch = Drivers::default();
            for assign in assigns {
                for link in self.link(assign)? {
                    if !link.directed {
                        return Err(ElabErrorKind::InvalidMux {
                            mux: mux.name,
                            reason: format!("cannot switch bidirectional '{}'", link.sink.label()),
                        });
                    }
                    branch.record(&link.sink, link.driver, None)?;
                    drivers.record(&link.sink, owner.clone(), Some(mux.name))?;
                    connections.push(
                        Connection::new(link.sink.endpoint, link.source).guarded(guard),
                    );
                }
            }
        }
        Ok(connections)
    }

    /// Resolves the select leaf and condition value of a case.
    fn select(&self, mux: &Mux, case: &MuxCase) -> Result<(LeafEndpoint, Value), ElabErrorKind> {
        let invalid = |reason: String| ElabErrorKind::InvalidMux {
            mux: mux.name,
            reason,
        };
        let Side::Node { label, ty, leaves, .. } = self.side(&case.sel)? else {
            return Err(invalid(format!("select '{}' is not a port or signal", case.sel)));
        };
        let [leaf] = leaves.as_slice() else {
            return Err(invalid(format!("select '{label}' of {ty} has more than one member")));
        };
        check_driver(leaf)?;
        let value = case.cond.evaluate_with(self.bindings)?;
        if !fits(ty, value) {
            return Err(invalid(format!("condition {value} does not fit select '{label}' of {ty}")));
        }
        Ok((leaf.endpoint, value))
    }
}

fn mismatch(target: String, target_ty: Type, driver: String, driver_type: String) -> ElabErrorKind {
    ElabErrorKind::TypeMismatch {
        target,
        target_type: target_ty.to_string(),
        driver,
        driver_type,
    }
}

fn is_inout(kind: IdentKind) -> bool {
    kind == IdentKind::Port(Direction::Inout)
}

fn check_sink(leaf: &Leaf) -> Result<(), ElabErrorKind> {
    let reason = match (leaf.local, leaf.kind) {
        (true, IdentKind::Port(Direction::In)) => "input of the module",
        (false, IdentKind::Port(Direction::Out)) => "output of a sub-instance",
        (_, IdentKind::Param) => "parameter",
        _ => return Ok(()),
    };
    Err(ElabErrorKind::Direction {
        action: "drive",
        endpoint: leaf.label(),
        reason: reason.to_string(),
    })
}

fn check_driver(leaf: &Leaf) -> Result<(), ElabErrorKind> {
    match (leaf.local, leaf.kind) {
        (false, IdentKind::Port(Direction::In)) => Err(ElabErrorKind::Direction {
            action: "read from",
            endpoint: leaf.label(),
            reason: "input of a sub-instance".to_string(),
        }),
        _ => Ok(()),
    }
}
