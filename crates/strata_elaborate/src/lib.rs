//! Elaboration of module declarations into instance trees.
//!
//! A [`ModuleRegistry`] holds the declarations; an [`Elaborator`] turns a
//! [`TopModRef`] into a fully resolved [`strata_ir::Design`]:
//!
//! 1. The top declaration is instantiated at the root path.
//! 2. Parameters are bound in declaration order (overrides, then defaults).
//! 3. Port, signal and parameter types are resolved against the bindings.
//! 4. Sub-instances are elaborated depth-first, optionally in parallel.
//! 5. Assignments and multiplexers are validated at leaf level.
//!
//! [`lint::lint_design`] then reports warnings on the finished design.
//!
//! Elaboration is all-or-nothing: the first [`ElabError`] aborts the request.
//!
//! # Usage
//!
//! ```ignore
//! let design = Elaborator::new(&registry).elaborate(&"uart_lib.uart".parse()?)?;
//! print!("{}", report::design_info(&design));
//! ```

#![warn(missing_docs)]

pub mod connect;
pub mod context;
pub mod elaborator;
pub mod errors;
pub mod lint;
pub mod params;
pub mod registry;
pub mod report;
pub mod topref;

pub use elaborator::Elaborator;
pub use errors::{ElabError, ElabErrorKind, Stage};
pub use lint::lint_design;
pub use registry::{HierarchyGraph, ModuleRegistry};
pub use report::{design_info, module_info};
pub use topref::TopModRef;
