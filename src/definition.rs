//! Definitions and resource handles.
//!
//! A [`CodeSource`](crate::source::CodeSource) yields a [`RawDefinition`]; the
//! loader that owns the source wraps it into a shared [`Definition`] stamped
//! with its origin namespace. Definitions are compared by identity: a
//! namespace hands out the same `Arc<Definition>` for a name for its whole
//! lifetime.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock, Weak};

use serde::{Deserialize, Serialize};

use crate::loader::Loader;

/// A definition as stored by a code source, before any namespace owns it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDefinition {
    /// Export marker: the definition belongs to the always-shared surface.
    #[serde(default)]
    pub exported: bool,
    /// Names that must resolve for this definition to link.
    #[serde(default)]
    pub requires: Vec<String>,
    /// Opaque payload.
    #[serde(default)]
    pub body: String,
}

impl RawDefinition {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }

    /// Mark this definition as part of the exported surface.
    pub fn exported(mut self) -> Self {
        self.exported = true;
        self
    }

    /// Declare a requirement checked during eager linking.
    pub fn requiring(mut self, name: impl Into<String>) -> Self {
        self.requires.push(name.into());
        self
    }
}

/// A resolved unit of code owned by exactly one namespace.
pub struct Definition {
    name: String,
    namespace: String,
    raw: RawDefinition,
    origin: Weak<Loader>,
    linked: OnceLock<()>,
}

impl Definition {
    pub(crate) fn new(
        name: &str,
        namespace: &str,
        origin: Weak<Loader>,
        raw: RawDefinition,
    ) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            raw,
            origin,
            linked: OnceLock::new(),
        }
    }

    /// Fully-qualified symbol name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the namespace whose code source produced this definition.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Whether the origin source set the export marker.
    pub fn is_exported(&self) -> bool {
        self.raw.exported
    }

    pub fn requires(&self) -> &[String] {
        &self.raw.requires
    }

    pub fn body(&self) -> &str {
        &self.raw.body
    }

    /// Whether an eager link pass has completed for this definition.
    pub fn is_linked(&self) -> bool {
        self.linked.get().is_some()
    }

    /// The namespace that owns this definition, if it is still alive.
    pub fn origin(&self) -> Option<Arc<Loader>> {
        self.origin.upgrade()
    }

    pub(crate) fn mark_linked(&self) {
        let _ = self.linked.set(());
    }
}

impl std::fmt::Debug for Definition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Definition")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("exported", &self.raw.exported)
            .field("linked", &self.is_linked())
            .finish()
    }
}

/// `hasExportMarker` as a free predicate.
pub fn has_export_marker(definition: &Definition) -> bool {
    definition.is_exported()
}

/// Where a resource's bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceLocation {
    Memory(Arc<[u8]>),
    File(PathBuf),
}

/// A non-code asset served by one namespace's own code source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHandle {
    pub name: String,
    pub location: ResourceLocation,
}

impl ResourceHandle {
    /// Read the resource contents.
    pub fn read(&self) -> std::io::Result<Vec<u8>> {
        match &self.location {
            ResourceLocation::Memory(bytes) => Ok(bytes.to_vec()),
            ResourceLocation::File(path) => std::fs::read(path),
        }
    }
}
