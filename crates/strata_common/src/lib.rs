//! Shared foundational types used across the Strata hardware modeling toolkit.
//!
//! This crate provides interned identifiers, the process-wide identity cache
//! that backs types and expressions, and content hashing for configuration
//! fingerprints.

#![warn(missing_docs)]

pub mod hash;
pub mod ident;
pub mod intern;

pub use hash::ContentHash;
pub use ident::{Ident, Interner};
pub use intern::{Intern, InternPool, Interned};
