//! isoload CLI: inspect and exercise an isolating namespace graph.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};

use isoload::config::{GraphConfig, NamespaceGraph};
use isoload::loader::{Loader, ResolvedVia};

#[derive(Parser)]
#[command(name = "isoload", version, about = "Isolating namespace loader")]
struct Cli {
    /// Namespace graph description (TOML).
    #[arg(long, global = true, default_value = "isoload.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a symbol in a namespace.
    Resolve {
        /// Namespace id.
        namespace: String,
        /// Fully-qualified symbol name.
        name: String,
        /// Resolve the definition's requirements too.
        #[arg(long)]
        link: bool,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Look up a resource in a namespace's own source.
    Resource {
        /// Namespace id.
        namespace: String,
        /// Resource path.
        name: String,
    },

    /// List namespaces and their relationships, providers first.
    Graph,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let graph = GraphConfig::load(&cli.config)?.assemble()?;

    match cli.command {
        Commands::Resolve {
            namespace,
            name,
            link,
            json,
        } => {
            let loader = namespace_of(&graph, &namespace)?;
            let resolution = loader.resolve_traced(&name)?;
            if link {
                // The traced lookup already cached it; this only links.
                loader.resolve(&name, true)?;
            }
            let definition = &resolution.definition;

            if json {
                let out = serde_json::json!({
                    "namespace": namespace,
                    "name": definition.name(),
                    "origin": definition.namespace(),
                    "exported": definition.is_exported(),
                    "linked": definition.is_linked(),
                    "requires": definition.requires(),
                    "resolution": resolution.via,
                });
                println!("{}", serde_json::to_string_pretty(&out).into_diagnostic()?);
            } else {
                println!("{} in {namespace}", definition.name());
                println!("  origin:   {}", definition.namespace());
                println!("  exported: {}", definition.is_exported());
                if link {
                    println!("  linked:   {}", definition.is_linked());
                }
                println!("  via:      {}", describe_via(&resolution.via));
            }
        }

        Commands::Resource { namespace, name } => {
            let loader = namespace_of(&graph, &namespace)?;
            let handle = loader
                .resolve_resource(&name)
                .ok_or_else(|| miette!("resource \"{name}\" not found in namespace \"{namespace}\""))?;
            match &handle.location {
                isoload::definition::ResourceLocation::File(path) => println!("{}", path.display()),
                isoload::definition::ResourceLocation::Memory(bytes) => {
                    println!("<in-memory, {} bytes>", bytes.len())
                }
            }
        }

        Commands::Graph => {
            for loader in graph.iter() {
                if loader.is_root() {
                    println!("{} (root)", loader.id());
                    continue;
                }
                println!("{}", loader.id());
                for (index, rel) in loader.relationships().enumerate() {
                    let role = if index == 0 { "primary" } else { "fallback" };
                    println!(
                        "  {role:<8} -> {} [{}] preferred={} blocked={} allowed={}",
                        rel.provider().id(),
                        rel.isolation(),
                        join_patterns(rel.preferred()),
                        join_patterns(rel.blocked()),
                        join_patterns(rel.allowed()),
                    );
                }
            }
        }
    }

    Ok(())
}

fn namespace_of<'a>(graph: &'a NamespaceGraph, id: &str) -> Result<&'a std::sync::Arc<Loader>> {
    graph
        .get(id)
        .ok_or_else(|| miette!("namespace \"{id}\" is not declared in the config"))
}

fn join_patterns(set: &isoload::pattern::PatternSet) -> String {
    let patterns: Vec<&str> = set.iter().map(|m| m.as_str()).collect();
    format!("[{}]", patterns.join(", "))
}

fn describe_via(via: &ResolvedVia) -> String {
    match via {
        ResolvedVia::Cached => "cache".into(),
        ResolvedVia::Root => "own source (root namespace)".into(),
        ResolvedVia::Relationship {
            index,
            provider,
            verdict,
        } => format!("relationship #{index} (provider {provider}): {verdict}"),
    }
}
