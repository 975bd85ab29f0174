//! Code sources: where a namespace finds its own definitions and resources.
//!
//! A source is strictly local to one namespace. It never consults any other
//! namespace; delegation is the loader's job.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::DashMap;

use crate::definition::{RawDefinition, ResourceHandle, ResourceLocation};
use crate::error::{SourceError, SourceResult};

/// A namespace-local lookup of definitions and resources.
pub trait CodeSource: Send + Sync {
    /// Look up a definition. `Ok(None)` means the source does not have it.
    fn find(&self, name: &str) -> SourceResult<Option<RawDefinition>>;

    /// Look up a non-code resource.
    fn find_resource(&self, name: &str) -> Option<ResourceHandle>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

impl<T: CodeSource + ?Sized> CodeSource for Arc<T> {
    fn find(&self, name: &str) -> SourceResult<Option<RawDefinition>> {
        (**self).find(name)
    }

    fn find_resource(&self, name: &str) -> Option<ResourceHandle> {
        (**self).find_resource(name)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Definition(RawDefinition),
    Malformed(String),
}

/// In-memory code source.
#[derive(Debug, Default)]
pub struct MemorySource {
    entries: DashMap<String, Entry>,
    resources: DashMap<String, Arc<[u8]>>,
    lookups: DashMap<String, usize>,
    total_lookups: AtomicUsize,
    latency: Option<Duration>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definition(self, name: impl Into<String>, raw: RawDefinition) -> Self {
        self.insert(name, raw);
        self
    }

    /// Register a name whose definition exists but cannot be parsed.
    pub fn with_malformed(self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.entries
            .insert(name.into(), Entry::Malformed(message.into()));
        self
    }

    pub fn with_resource(self, name: impl Into<String>, bytes: impl AsRef<[u8]>) -> Self {
        self.resources
            .insert(name.into(), Arc::from(bytes.as_ref()));
        self
    }

    /// Sleep for `latency` on every definition lookup.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn insert(&self, name: impl Into<String>, raw: RawDefinition) {
        self.entries.insert(name.into(), Entry::Definition(raw));
    }

    /// Number of definition lookups served so far.
    pub fn lookups(&self) -> usize {
        self.total_lookups.load(Ordering::SeqCst)
    }

    /// Number of definition lookups served for `name`.
    pub fn lookups_of(&self, name: &str) -> usize {
        self.lookups.get(name).map(|n| *n).unwrap_or(0)
    }
}

impl CodeSource for MemorySource {
    fn find(&self, name: &str) -> SourceResult<Option<RawDefinition>> {
        self.total_lookups.fetch_add(1, Ordering::SeqCst);
        *self.lookups.entry(name.to_string()).or_insert(0) += 1;
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }

        match self.entries.get(name).map(|e| e.value().clone()) {
            None => Ok(None),
            Some(Entry::Definition(raw)) => Ok(Some(raw)),
            Some(Entry::Malformed(message)) => Err(SourceError::Malformed {
                name: name.to_string(),
                message,
            }),
        }
    }

    fn find_resource(&self, name: &str) -> Option<ResourceHandle> {
        self.resources.get(name).map(|bytes| ResourceHandle {
            name: name.to_string(),
            location: ResourceLocation::Memory(Arc::clone(bytes.value())),
        })
    }

    fn describe(&self) -> String {
        format!("memory({} definitions)", self.entries.len())
    }
}

/// Directory-backed code source.
///
/// Symbol `a.b.C` is read from `<root>/a/b/C.toml`; resource `a/b/x.txt` from
/// `<root>/a/b/x.txt`.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

/// File extension of definition files.
pub const DEFINITION_EXT: &str = "toml";

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a symbol's definition file would live at.
    pub fn definition_path(&self, name: &str) -> Option<PathBuf> {
        let relative: PathBuf = name.split('.').collect();
        if !is_contained(&relative) {
            return None;
        }
        Some(self.root.join(relative).with_extension(DEFINITION_EXT))
    }
}

/// Reject empty names and anything that could climb out of the root.
fn is_contained(relative: &Path) -> bool {
    let mut components = relative.components().peekable();
    components.peek().is_some() && components.all(|c| matches!(c, Component::Normal(_)))
}

impl CodeSource for DirSource {
    fn find(&self, name: &str) -> SourceResult<Option<RawDefinition>> {
        let Some(path) = self.definition_path(name) else {
            return Ok(None);
        };

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SourceError::Unavailable {
                    name: name.to_string(),
                    source: e,
                });
            }
        };

        toml::from_str(&content)
            .map(Some)
            .map_err(|e| SourceError::Malformed {
                name: name.to_string(),
                message: e.to_string(),
            })
    }

    fn find_resource(&self, name: &str) -> Option<ResourceHandle> {
        let relative = Path::new(name);
        if !is_contained(relative) {
            return None;
        }
        let path = self.root.join(relative);
        path.is_file().then(|| ResourceHandle {
            name: name.to_string(),
            location: ResourceLocation::File(path),
        })
    }

    fn describe(&self) -> String {
        format!("dir({})", self.root.display())
    }
}
