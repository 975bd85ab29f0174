// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # isoload
//!
//! Isolating namespaces that let several versions of the same named code unit
//! live side by side in one process, while a curated exported surface stays
//! shared between them.
//!
//! ## Architecture
//!
//! - **Code sources** (`source`): namespace-local lookup of definitions and resources
//! - **Isolation policy** (`isolation`): fixed table of (level, presence) → behavior
//! - **Delegation** (`delegation`): a namespace's link to one provider, with
//!   preferred / blocked / allowed pattern overrides
//! - **Loader** (`loader`): the namespace itself; resolution, caching, linking
//! - **Config** (`config`): TOML namespace graphs, validated and assembled
//!
//! ## Library usage
//!
//! ```no_run
//! use isoload::definition::RawDefinition;
//! use isoload::delegation::DelegationRelationship;
//! use isoload::isolation::IsolationLevel;
//! use isoload::loader::Loader;
//! use isoload::source::MemorySource;
//!
//! let host = Loader::root(
//!     "host",
//!     MemorySource::new().with_definition("api.Service", RawDefinition::new("v1").exported()),
//! );
//! let plugin = Loader::new(
//!     "plugin",
//!     MemorySource::new().with_definition("lib.Json", RawDefinition::new("v2")),
//!     DelegationRelationship::new(host, IsolationLevel::Full),
//!     Vec::new(),
//! );
//! let api = plugin.resolve("api.Service", false).unwrap();
//! assert_eq!(api.namespace(), "host");
//! ```

pub mod config;
pub mod definition;
pub mod delegation;
pub mod error;
pub mod isolation;
pub mod loader;
pub mod pattern;
pub mod source;
