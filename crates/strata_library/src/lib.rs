//! Declaration libraries for strata.
//!
//! A library is a TOML file naming the library and listing its named types
//! and module declarations:
//!
//! ```toml
//! [library]
//! name = "glbl_lib"
//!
//! [types.BusType]
//! kind = "struct"
//! members = [{ name = "addr", type = { kind = "uint", width = 32 } }]
//!
//! [[modules]]
//! name = "clk_gate"
//! ports = [{ name = "clk_i", type = { kind = "clk" }, direction = "in" }]
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let (registry, libraries) = strata_library::load_registry(&paths)?;
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod schema;
pub mod types;

pub use error::LibraryError;
pub use loader::{
    load_library_file, load_library_str, load_registry, LibraryInfo, LibraryLoader,
};
pub use types::TypeTable;
