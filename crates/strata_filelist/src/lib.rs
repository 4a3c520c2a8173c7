//! File-list computation over elaborated designs.
//!
//! For every instance a [`FileListResolver`] selects the file-list rules of
//! the requested name and target, substitutes placeholders such as
//! `{mod.modname}`, anchors relative paths at the declaration directory and
//! locates templates through a [`TemplateLocator`].
//!
//! Unlike elaboration, collection keeps going after a failing instance:
//! [`FileListReport`] carries both the resolved entries and the failures.

#![warn(missing_docs)]

pub mod collect;
pub mod errors;
pub mod locator;
pub mod placeholder;
pub mod report;
pub mod resolve;

pub use collect::{collect_filelists, FileListEntry, FileListFailure, FileListReport};
pub use errors::FileListError;
pub use locator::{FsLocator, MemoryLocator, TemplateLocator};
pub use report::{records, render_json, render_text, FileInfoRecord, RootMapper};
pub use resolve::{search_rules, FileInfo, FileListOptions, FileListResolver};
