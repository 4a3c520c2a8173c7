//! Multiplexers: assignments selected by the value of a select signal.

use crate::error::IrError;
use crate::expr::Expr;
use crate::module::{Assign, Endpoint};
use indexmap::IndexSet;
use std::fmt;
use strata_common::Ident;

/// Assignments active while `sel == cond`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MuxCase {
    /// Select port or signal.
    pub sel: Endpoint,
    /// Select value, evaluated in the instance's bindings.
    pub cond: Expr,
    /// Assignments in declaration order.
    pub assigns: Vec<Assign>,
}

/// A named multiplexer of a module.
///
/// Each target is driven by the mux as a whole, so the same target may be
/// assigned under several conditions, and its default applies when no
/// condition matches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mux {
    /// Name, unique within the module.
    pub name: Ident,
    /// Short description.
    pub title: Option<String>,
    /// Cases in order of their first assignment.
    pub cases: Vec<MuxCase>,
    /// Assignments applied when no case matches.
    pub defaults: Vec<Assign>,
}

fn check_target(target: Endpoint) -> Result<(), IrError> {
    if target.is_const() {
        return Err(IrError::InvalidReference {
            text: target.to_string(),
            reason: "a constant cannot be driven".to_string(),
        });
    }
    Ok(())
}

impl Mux {
    /// An empty mux.
    pub fn new(name: impl Into<Ident>) -> Self {
        Self {
            name: name.into(),
            title: None,
            cases: Vec::new(),
            defaults: Vec::new(),
        }
    }

    /// Sets the title.
    pub fn set_title(&mut self, title: impl Into<String>) -> &mut Self {
        self.title = Some(title.into());
        self
    }

    /// Assigns `target <= source` while `sel == cond`.
    pub fn set(
        &mut self,
        sel: Endpoint,
        cond: impl Into<Expr>,
        target: Endpoint,
        source: Endpoint,
    ) -> Result<&mut Self, IrError> {
        if sel.is_const() {
            return Err(IrError::InvalidReference {
                text: sel.to_string(),
                reason: "a mux select must be a port or signal".to_string(),
            });
        }
        check_target(target)?;
        let cond = cond.into();
        let assign = Assign { target, source };
        match self.cases.iter_mut().find(|c| c.sel == sel && c.cond == cond) {
            Some(case) => case.assigns.push(assign),
            None => self.cases.push(MuxCase {
                sel,
                cond,
                assigns: vec![assign],
            }),
        }
        Ok(self)
    }

    /// Assigns `target <= source` when no case matches.
    pub fn set_default(&mut self, target: Endpoint, source: Endpoint) -> Result<&mut Self, IrError> {
        check_target(target)?;
        self.defaults.push(Assign { target, source });
        Ok(self)
    }

    /// Select endpoints in order of first use.
    pub fn sels(&self) -> Vec<Endpoint> {
        self.cases
            .iter()
            .map(|c| c.sel)
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    /// Every driven target: defaults first, then case targets.
    pub fn targets(&self) -> Vec<Endpoint> {
        self.defaults
            .iter()
            .chain(self.cases.iter().flat_map(|c| &c.assigns))
            .map(|a| a.target)
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    /// Returns `true` if the mux assigns nothing.
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty() && self.defaults.is_empty()
    }
}

impl fmt::Display for Mux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "mux {}", self.name)?;
        for default in &self.defaults {
            writeln!(f, "  default: {} <= {}", default.target, default.source)?;
        }
        for case in &self.cases {
            writeln!(f, "  {} == {}:", case.sel, case.cond)?;
            for assign in &case.assigns {
                writeln!(f, "    {} <= {}", assign.target, assign.source)?;
            }
        }
        Ok(())
    }
}
