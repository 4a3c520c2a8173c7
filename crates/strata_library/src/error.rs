//! Error types for declaration library loading.

use std::path::PathBuf;

use strata_elaborate::ElabError;
use strata_ir::IrError;

/// Errors that can occur while loading declaration libraries.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    /// A library file could not be read.
    #[error("failed to read '{}': {source}", .path.display())]
    Io {
        /// The file or directory.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A library file is not valid TOML or does not match the schema.
    #[error("failed to parse '{}': {message}", .path.display())]
    Parse {
        /// The file, or `<string>` for in-memory sources.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// An expression string could not be parsed.
    #[error("invalid expression '{text}': {message}")]
    Expr {
        /// The expression text.
        text: String,
        /// Parser message.
        message: String,
    },

    /// A type reference names no known type.
    #[error("unknown type '{name}' referenced from library '{library}'")]
    UnknownType {
        /// Library the reference appears in.
        library: String,
        /// Referenced name.
        name: String,
    },

    /// A type definition refers back to itself.
    #[error("recursive type definition: {}", .chain.join(" -> "))]
    RecursiveType {
        /// Qualified type names along the cycle.
        chain: Vec<String>,
    },

    /// A declaration or type is invalid.
    #[error("{context}: {source}")]
    Definition {
        /// Qualified name of the module or type being built.
        context: String,
        /// The underlying error.
        #[source]
        source: IrError,
    },

    /// Two libraries declare the same module.
    #[error(transparent)]
    Registry(#[from] ElabError),
}

impl LibraryError {
    pub(crate) fn definition(context: &str) -> impl Fn(IrError) -> LibraryError + '_ {
        move |source| LibraryError::Definition {
            context: context.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unknown_type() {
        let err = LibraryError::UnknownType {
            library: "uart_lib".to_string(),
            name: "BusType".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unknown type 'BusType' referenced from library 'uart_lib'"
        );
    }

    #[test]
    fn display_recursive_type() {
        let err = LibraryError::RecursiveType {
            chain: vec!["lib.A".to_string(), "lib.B".to_string(), "lib.A".to_string()],
        };
        assert_eq!(err.to_string(), "recursive type definition: lib.A -> lib.B -> lib.A");
    }
}
