//! Typed object model for hardware module descriptions.
//!
//! This crate defines the value objects shared by every later stage: interned
//! [`Expr`] trees with deferred parameter resolution, interned hardware
//! [`Type`]s, [`Identifier`]s with struct flattening, ordered [`Namespace`]s,
//! immutable [`ModuleDecl`] declarations with their [`Mux`]es and [`Define`]s, and the elaborated
//! [`ModuleInstance`] tree wrapped in a [`Design`].

#![warn(missing_docs)]

pub mod define;
pub mod error;
pub mod expr;
pub mod filelist;
pub mod ident;
pub mod instance;
pub mod module;
pub mod mux;
pub mod namespace;
pub mod parse;
pub mod slice;
pub mod types;
pub mod value;

pub use define::Define;
pub use error::IrError;
pub use expr::{Bindings, BinaryOp, Builtin, Expr, ExprNode, UnaryOp};
pub use filelist::{FileListRule, GenMode};
pub use ident::{Direction, FlatIdent, IdentKind, Identifier};
pub use instance::{
    Connection, Design, DesignStats, HierPath, LeafEndpoint, ModuleInstance, MuxGuard,
};
pub use module::{
    Assign, Endpoint, InstDecl, ModConfig, ModRef, ModuleBuilder, ModuleDecl, ModuleFlags,
};
pub use mux::{Mux, MuxCase};
pub use namespace::Namespace;
pub use parse::{parse_expr, ParseError};
pub use slice::Slice;
pub use types::{
    Aggregate, EnumBuilder, EnumItem, Orientation, StructBuilder, StructMember, Type, TypeKind,
    TypeNode, MAX_ARRAY_DEPTH,
};
pub use value::Value;
