//! Namespace graph configuration.
//!
//! A graph is described in TOML as a list of `[[namespace]]` tables. Assembly
//! validates the description (unique ids, known providers, compilable
//! patterns, no delegation cycles) and builds every namespace providers-first,
//! so each [`Loader`] is constructed with its final, immutable relationships.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};

use crate::delegation::DelegationRelationship;
use crate::error::{ConfigError, ConfigResult};
use crate::isolation::IsolationLevel;
use crate::loader::Loader;
use crate::pattern::PatternSet;
use crate::source::DirSource;

/// A whole namespace graph, as written in the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default, rename = "namespace")]
    pub namespaces: Vec<NamespaceConfig>,
    /// Directory that relative `source` paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// One namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceConfig {
    pub id: String,
    /// Directory holding the namespace's definitions and resources.
    pub source: PathBuf,
    /// Absent for a root namespace.
    #[serde(default)]
    pub primary: Option<RelationshipConfig>,
    #[serde(default, rename = "fallback")]
    pub fallbacks: Vec<RelationshipConfig>,
}

/// One delegation relationship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipConfig {
    pub provider: String,
    pub isolation: IsolationLevel,
    #[serde(default)]
    pub preferred: Vec<String>,
    #[serde(default)]
    pub blocked: Vec<String>,
    #[serde(default)]
    pub allowed: Vec<String>,
}

impl RelationshipConfig {
    fn build(&self, provider: Arc<Loader>) -> ConfigResult<DelegationRelationship> {
        Ok(DelegationRelationship::new(provider, self.isolation)
            .with_preferred(PatternSet::compile(&self.preferred)?)
            .with_blocked(PatternSet::compile(&self.blocked)?)
            .with_allowed(PatternSet::compile(&self.allowed)?))
    }
}

impl NamespaceConfig {
    fn relationships(&self) -> impl Iterator<Item = &RelationshipConfig> {
        self.primary.iter().chain(self.fallbacks.iter())
    }
}

impl GraphConfig {
    /// Read and parse a config file. Relative sources resolve against the
    /// file's directory.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::parse(&content, &path.display().to_string(), base_dir)
    }

    /// Parse config text. `origin` names the text in error messages.
    pub fn parse(content: &str, origin: &str, base_dir: PathBuf) -> ConfigResult<Self> {
        let mut config: GraphConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse {
                path: origin.to_string(),
                message: e.to_string(),
            })?;
        config.base_dir = base_dir;
        Ok(config)
    }

    /// Validate the description and build every namespace.
    pub fn assemble(&self) -> ConfigResult<NamespaceGraph> {
        let mut index_of: HashMap<&str, usize> = HashMap::new();
        for (i, ns) in self.namespaces.iter().enumerate() {
            if index_of.insert(ns.id.as_str(), i).is_some() {
                return Err(ConfigError::DuplicateNamespace { id: ns.id.clone() });
            }
            if ns.primary.is_none() && !ns.fallbacks.is_empty() {
                return Err(ConfigError::MissingPrimary {
                    namespace: ns.id.clone(),
                });
            }
        }

        // Edges run provider -> dependent, so a topological order builds
        // providers first.
        let mut graph = DiGraph::<usize, ()>::new();
        let nodes: Vec<_> = (0..self.namespaces.len()).map(|i| graph.add_node(i)).collect();
        for (i, ns) in self.namespaces.iter().enumerate() {
            for rel in ns.relationships() {
                let provider = *index_of.get(rel.provider.as_str()).ok_or_else(|| {
                    ConfigError::UnknownProvider {
                        namespace: ns.id.clone(),
                        provider: rel.provider.clone(),
                    }
                })?;
                graph.add_edge(nodes[provider], nodes[i], ());
            }
        }

        let order = toposort(&graph, None).map_err(|cycle| ConfigError::Cycle {
            namespace: self.namespaces[graph[cycle.node_id()]].id.clone(),
        })?;

        let mut built: Vec<Option<Arc<Loader>>> = vec![None; self.namespaces.len()];
        let mut loaders = Vec::with_capacity(order.len());
        for node in order {
            let i = graph[node];
            let ns = &self.namespaces[i];
            let relationship = |rel: &RelationshipConfig| -> ConfigResult<DelegationRelationship> {
                // Providers precede dependents in topological order.
                let provider = built[index_of[rel.provider.as_str()]].clone().ok_or_else(|| {
                    ConfigError::Cycle {
                        namespace: ns.id.clone(),
                    }
                })?;
                rel.build(provider)
            };

            let primary = ns.primary.as_ref().map(&relationship).transpose()?;
            let fallbacks = ns
                .fallbacks
                .iter()
                .map(&relationship)
                .collect::<ConfigResult<Vec<_>>>()?;

            let source = DirSource::new(self.base_dir.join(&ns.source));
            let loader = Loader::build(ns.id.clone(), Box::new(source), primary, fallbacks);
            built[i] = Some(Arc::clone(&loader));
            loaders.push(loader);
        }

        tracing::info!(namespaces = loaders.len(), "namespace graph assembled");
        Ok(NamespaceGraph::new(loaders))
    }
}

/// Assembled namespaces, in provider-first order.
#[derive(Debug)]
pub struct NamespaceGraph {
    loaders: Vec<Arc<Loader>>,
    by_id: HashMap<String, usize>,
}

impl NamespaceGraph {
    fn new(loaders: Vec<Arc<Loader>>) -> Self {
        let by_id = loaders
            .iter()
            .enumerate()
            .map(|(i, l)| (l.id().to_string(), i))
            .collect();
        Self { loaders, by_id }
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Loader>> {
        self.by_id.get(id).map(|&i| &self.loaders[i])
    }

    /// Namespaces in provider-first order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Loader>> {
        self.loaders.iter()
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}
