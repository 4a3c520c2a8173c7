//! Elaboration errors and their diagnostic codes.
//!
//! Codes `E200`--`E217` cover every way an elaboration request can fail.
//! Each [`ElabErrorKind`] maps to exactly one code, and [`ElabError`] renders
//! into a [`Diagnostic`] located at the failing instance path.

use std::fmt;

use strata_common::Ident;
use strata_diagnostics::{Diagnostic, DiagnosticCode};
use strata_ir::{HierPath, IrError, ModRef};

/// Unknown module referenced by an instantiation or top reference.
pub const E200: DiagnosticCode = DiagnosticCode::error(200);

/// Parameter override for a parameter the module does not declare.
pub const E201: DiagnosticCode = DiagnosticCode::error(201);

/// Duplicate module reference in the registry.
pub const E202: DiagnosticCode = DiagnosticCode::error(202);

/// Duplicate identifier within a namespace.
pub const E203: DiagnosticCode = DiagnosticCode::error(203);

/// Reference to an unknown identifier.
pub const E204: DiagnosticCode = DiagnosticCode::error(204);

/// Type mismatch in a connection.
pub const E205: DiagnosticCode = DiagnosticCode::error(205);

/// Reference to an unknown sub-instance.
pub const E206: DiagnosticCode = DiagnosticCode::error(206);

/// Circular instantiation.
pub const E207: DiagnosticCode = DiagnosticCode::error(207);

/// Connection against a port direction.
pub const E208: DiagnosticCode = DiagnosticCode::error(208);

/// Expression evaluation failure.
pub const E209: DiagnosticCode = DiagnosticCode::error(209);

/// Parameter left unresolved.
pub const E210: DiagnosticCode = DiagnosticCode::error(210);

/// Parameter referencing a later or undeclared parameter.
pub const E211: DiagnosticCode = DiagnosticCode::error(211);

/// Invalid type definition or out-of-range type attribute.
pub const E212: DiagnosticCode = DiagnosticCode::error(212);

/// Two drivers for one sink.
pub const E213: DiagnosticCode = DiagnosticCode::error(213);

/// Sub-module selection matched nothing or more than one module.
pub const E214: DiagnosticCode = DiagnosticCode::error(214);

/// Testbench reference to a module that is no testbench.
pub const E215: DiagnosticCode = DiagnosticCode::error(215);

/// Bit range outside its vector, or slice of a non-vector.
pub const E216: DiagnosticCode = DiagnosticCode::error(216);

/// Inconsistent multiplexer select or condition.
pub const E217: DiagnosticCode = DiagnosticCode::error(217);

/// Lifecycle stage of an instance.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Stage {
    /// Only the declaration exists.
    Declared,
    /// Placed at a hierarchical path with its overrides.
    Instantiated,
    /// Every parameter has a value.
    ParametersBound,
    /// Types resolved, children elaborated and connections validated.
    Elaborated,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Declared => write!(f, "declared"),
            Stage::Instantiated => write!(f, "instantiated"),
            Stage::ParametersBound => write!(f, "parameters bound"),
            Stage::Elaborated => write!(f, "elaborated"),
        }
    }
}

/// What went wrong during elaboration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ElabErrorKind {
    /// An error raised by the object model.
    #[error(transparent)]
    Ir(#[from] IrError),

    /// A declaration instantiates itself through its own subtree.
    #[error("cyclic hierarchy: {}", chain_text(.chain))]
    CyclicHierarchy {
        /// Declarations on the active path, ending with the repeated one.
        chain: Vec<ModRef>,
    },

    /// A sink already has a driver.
    #[error("'{sink}' already assigned to '{first}', cannot assign '{second}'")]
    MultipleDriver {
        /// The driven leaf.
        sink: String,
        /// Its existing driver.
        first: String,
        /// The rejected second driver.
        second: String,
    },

    /// Connected endpoints have incompatible types.
    #[error("cannot assign '{driver}' of {driver_type} to '{target}' of {target_type}")]
    TypeMismatch {
        /// Driven endpoint.
        target: String,
        /// Rendered target type.
        target_type: String,
        /// Driving endpoint.
        driver: String,
        /// Rendered driver type or constant.
        driver_type: String,
    },

    /// An endpoint is used against its direction.
    #[error("cannot {action} '{endpoint}': {reason}")]
    Direction {
        /// `drive` or `read from`.
        action: &'static str,
        /// The offending endpoint.
        endpoint: String,
        /// Why the direction forbids it.
        reason: String,
    },

    /// No declaration is registered under a reference.
    #[error("unknown module '{modref}'")]
    UnknownModule {
        /// The missing reference.
        modref: ModRef,
    },

    /// Two declarations share a reference.
    #[error("duplicate module '{modref}'")]
    DuplicateModule {
        /// The clashing reference.
        modref: ModRef,
    },

    /// An override names a parameter the module does not declare.
    #[error("module '{modref}' has no parameter '{param}'")]
    UnknownParameter {
        /// The instantiated module.
        modref: ModRef,
        /// The unknown parameter.
        param: Ident,
    },

    /// An assignment names a sub-instance that does not exist.
    #[error("unknown instance '{name}'")]
    UnknownInstance {
        /// The missing instance name.
        name: Ident,
    },

    /// A sub-module selection did not match exactly one module.
    #[error("sub-module '{pattern}' not found: {reason}")]
    SubmoduleNotFound {
        /// The selection pattern.
        pattern: String,
        /// What the pattern matched instead.
        reason: String,
    },

    /// A testbench reference names a module without the testbench flag.
    #[error("'{modref}' is not a testbench")]
    NotATestbench {
        /// The referenced module.
        modref: ModRef,
    },

    /// A slice does not select bits of a vector endpoint.
    #[error("invalid slice '{endpoint}': {reason}")]
    InvalidSlice {
        /// The sliced endpoint as written.
        endpoint: String,
        /// Why the range is rejected.
        reason: String,
    },

    /// A multiplexer select or condition is unusable.
    #[error("invalid mux '{mux}': {reason}")]
    InvalidMux {
        /// Multiplexer name.
        mux: Ident,
        /// What is wrong.
        reason: String,
    },
}

fn chain_text(chain: &[ModRef]) -> String {
    chain
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl ElabErrorKind {
    /// Diagnostic code of this kind.
    pub fn code(&self) -> DiagnosticCode {
        match self {
            ElabErrorKind::Ir(err) => match err {
                IrError::TypeDefinition { .. } => E212,
                IrError::DuplicateIdentifier { .. } => E203,
                IrError::ParameterOrder { .. } => E211,
                IrError::UnresolvedParameter { .. } => E210,
                IrError::ExpressionEvaluation { .. } | IrError::CyclicBinding { .. } => E209,
                IrError::UnknownIdentifier { .. } | IrError::UnknownMember { .. } => E204,
                IrError::InvalidReference { .. } => E200,
            },
            ElabErrorKind::CyclicHierarchy { .. } => E207,
            ElabErrorKind::MultipleDriver { .. } => E213,
            ElabErrorKind::TypeMismatch { .. } => E205,
            ElabErrorKind::Direction { .. } => E208,
            ElabErrorKind::UnknownModule { .. } => E200,
            ElabErrorKind::DuplicateModule { .. } => E202,
            ElabErrorKind::UnknownParameter { .. } => E201,
            ElabErrorKind::UnknownInstance { .. } => E206,
            ElabErrorKind::SubmoduleNotFound { .. } => E214,
            ElabErrorKind::NotATestbench { .. } => E215,
            ElabErrorKind::InvalidSlice { .. } => E216,
            ElabErrorKind::InvalidMux { .. } => E217,
        }
    }
}

/// An elaboration failure with the instance path and stage it occurred at.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}{kind}", location(.path))]
pub struct ElabError {
    /// Hierarchical path of the failing instance; empty before instantiation.
    pub path: HierPath,
    /// Lifecycle stage the instance was leaving.
    pub stage: Stage,
    /// What went wrong.
    pub kind: ElabErrorKind,
}

fn location(path: &HierPath) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!("{path}: ")
    }
}

impl ElabError {
    /// Creates an error.
    pub fn new(path: HierPath, stage: Stage, kind: impl Into<ElabErrorKind>) -> Self {
        Self {
            path,
            stage,
            kind: kind.into(),
        }
    }

    /// Diagnostic code of the kind.
    pub fn code(&self) -> DiagnosticCode {
        self.kind.code()
    }

    /// Renders the error as a diagnostic located at [`ElabError::path`].
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::new(self.code(), self.kind.to_string())
            .at(&self.path)
            .with_note(format!("instance failed after stage '{}'", self.stage));
        match &self.kind {
            ElabErrorKind::CyclicHierarchy { .. } => {
                diag.with_note("the module directly or indirectly instantiates itself")
            }
            ElabErrorKind::UnknownModule { .. } => {
                diag.with_help("check that the library defining the module is on the search path")
            }
            ElabErrorKind::Ir(IrError::ParameterOrder { .. }) => {
                diag.with_help("declare referenced parameters before the parameters using them")
            }
            _ => diag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_formats() {
        assert_eq!(format!("{E200}"), "E200");
        assert_eq!(format!("{E207}"), "E207");
        assert_eq!(format!("{E215}"), "E215");
    }

    #[test]
    fn ir_errors_map_to_codes() {
        let kind = ElabErrorKind::from(IrError::DuplicateIdentifier {
            name: Ident::new("x_s"),
        });
        assert_eq!(kind.code(), E203);
        assert_eq!(kind.to_string(), "'x_s' already exists");
    }

    #[test]
    fn cyclic_diagnostic() {
        let a = ModRef::new("lib", "a");
        let b = ModRef::new("lib", "b");
        let err = ElabError::new(
            HierPath::root("a").child("u_b"),
            Stage::Instantiated,
            ElabErrorKind::CyclicHierarchy {
                chain: vec![a, b, a],
            },
        );
        assert_eq!(err.to_string(), "a/u_b: cyclic hierarchy: lib.a -> lib.b -> lib.a");
        let diag = err.to_diagnostic();
        assert_eq!(diag.code, E207);
        assert_eq!(diag.path, Some(HierPath::root("a").child("u_b")));
        assert_eq!(diag.notes.len(), 2);
    }

    #[test]
    fn mismatch_message() {
        let kind = ElabErrorKind::TypeMismatch {
            target: "vec_c_o".to_string(),
            target_type: "UintType(4)".to_string(),
            driver: "vec_b_i".to_string(),
            driver_type: "UintType(14)".to_string(),
        };
        assert_eq!(
            kind.to_string(),
            "cannot assign 'vec_b_i' of UintType(14) to 'vec_c_o' of UintType(4)"
        );
    }

    #[test]
    fn unlocated_error_has_no_prefix() {
        let err = ElabError::new(
            HierPath::default(),
            Stage::Declared,
            ElabErrorKind::DuplicateModule {
                modref: ModRef::new("lib", "a"),
            },
        );
        assert_eq!(err.to_string(), "duplicate module 'lib.a'");
        assert!(err.to_diagnostic().path.is_none());
    }
}
