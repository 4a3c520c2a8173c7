//! Errors raised while constructing or resolving model objects.

use strata_common::Ident;

/// Errors produced by the object model.
///
/// Definition errors (`TypeDefinition`, `DuplicateIdentifier`,
/// `ParameterOrder`) are raised while declarations are built; resolution
/// errors (`UnresolvedParameter`, `ExpressionEvaluation`, `CyclicBinding`)
/// while parameters are bound and types resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IrError {
    /// A struct or enum definition is inconsistent, or a resolved type
    /// attribute is out of range.
    #[error("invalid type '{name}': {reason}")]
    TypeDefinition {
        /// The type name or rendering.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A name is already used in its namespace.
    #[error("'{name}' already exists")]
    DuplicateIdentifier {
        /// The clashing name.
        name: Ident,
    },

    /// A parameter refers to a parameter that is not declared before it.
    #[error("parameter '{param}' references '{reference}' which is not declared before it")]
    ParameterOrder {
        /// The parameter being declared or bound.
        param: Ident,
        /// The offending reference.
        reference: Ident,
    },

    /// An expression still has free parameters where a concrete value is required.
    #[error("unresolved parameter(s) {} in {context}", join(.params))]
    UnresolvedParameter {
        /// What was being resolved (identifier name or expression text).
        context: String,
        /// The parameters left unbound.
        params: Vec<Ident>,
    },

    /// Folding an operator or builtin on constant operands failed.
    #[error("cannot evaluate '{expr}': {reason}")]
    ExpressionEvaluation {
        /// Source-like rendering of the failing expression.
        expr: String,
        /// Why evaluation failed.
        reason: String,
    },

    /// A binding refers back to itself through parameter references.
    #[error("cyclic binding of parameter '{name}'")]
    CyclicBinding {
        /// A parameter on the cycle.
        name: Ident,
    },

    /// A name was looked up but does not exist.
    #[error("'{name}' is not known")]
    UnknownIdentifier {
        /// The missing name.
        name: String,
    },

    /// A named member of a module, such as a mux, does not exist.
    #[error("unknown {what} '{name}'. {}", known_list(.known))]
    UnknownMember {
        /// What was looked up.
        what: &'static str,
        /// The missing name.
        name: Ident,
        /// Names that do exist, in declaration order.
        known: Vec<Ident>,
    },

    /// A module reference or pattern could not be parsed.
    #[error("invalid reference '{text}': {reason}")]
    InvalidReference {
        /// The text that failed to parse.
        text: String,
        /// Why it is invalid.
        reason: String,
    },
}

fn known_list(known: &[Ident]) -> String {
    let quoted: Vec<String> = known.iter().map(|k| format!("'{k}'")).collect();
    match quoted.as_slice() {
        [] => "None are known.".to_string(),
        [one] => format!("Known is {one}."),
        [init @ .., last] => format!("Known are {} and {last}.", init.join(", ")),
    }
}

fn join(params: &[Ident]) -> String {
    params
        .iter()
        .map(|p| format!("'{p}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unresolved_lists_params() {
        let err = IrError::UnresolvedParameter {
            context: "width_s".to_string(),
            params: vec![Ident::new("width_p"), Ident::new("depth_p")],
        };
        assert_eq!(
            err.to_string(),
            "unresolved parameter(s) 'width_p', 'depth_p' in width_s"
        );
    }

    #[test]
    fn display_parameter_order() {
        let err = IrError::ParameterOrder {
            param: Ident::new("a_p"),
            reference: Ident::new("b_p"),
        };
        assert_eq!(
            err.to_string(),
            "parameter 'a_p' references 'b_p' which is not declared before it"
        );
    }

    #[test]
    fn display_duplicate() {
        let err = IrError::DuplicateIdentifier {
            name: Ident::new("vec_b_o"),
        };
        assert_eq!(err.to_string(), "'vec_b_o' already exists");
    }
}
