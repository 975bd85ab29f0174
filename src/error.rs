//! Rich diagnostic error types for isoload.
//!
//! Each concern defines its own error type with miette `#[diagnostic]` derives,
//! so callers get an error code and help text alongside the message.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type.
#[derive(Debug, Error, Diagnostic)]
pub enum IsoError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Resolution errors
// ---------------------------------------------------------------------------

/// The only failure a symbol lookup can end in.
#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    #[error("symbol not found in namespace \"{namespace}\": {name}")]
    #[diagnostic(
        code(isoload::resolve::not_found),
        help(
            "Neither the namespace's own code source nor any of its providers \
             yielded a visible definition. Check the isolation level of the \
             delegation relationships, or add the name to an allowed or \
             preferred pattern if the provider copy should be visible."
        )
    )]
    NotFound { namespace: String, name: String },
}

// ---------------------------------------------------------------------------
// Code source errors
// ---------------------------------------------------------------------------

/// Errors a [`CodeSource`](crate::source::CodeSource) may report.
///
/// The loader treats both variants as "absent" and keeps resolving.
#[derive(Debug, Error, Diagnostic)]
pub enum SourceError {
    #[error("malformed definition for {name}: {message}")]
    #[diagnostic(
        code(isoload::source::malformed),
        help("The definition exists but could not be parsed. Fix the definition file.")
    )]
    Malformed { name: String, message: String },

    #[error("code source unavailable while looking up {name}: {source}")]
    #[diagnostic(
        code(isoload::source::unavailable),
        help(
            "The code source failed unexpectedly. Check that its directory exists \
             and is readable."
        )
    )]
    Unavailable {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read namespace config: {path}")]
    #[diagnostic(
        code(isoload::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse namespace config: {path}: {message}")]
    #[diagnostic(
        code(isoload::config::parse),
        help("Check the TOML syntax. Every namespace needs an `id` and a `source`.")
    )]
    Parse { path: String, message: String },

    #[error("namespace \"{id}\" is declared more than once")]
    #[diagnostic(
        code(isoload::config::duplicate_namespace),
        help("Namespace ids must be unique within one graph.")
    )]
    DuplicateNamespace { id: String },

    #[error("namespace \"{namespace}\" delegates to unknown provider \"{provider}\"")]
    #[diagnostic(
        code(isoload::config::unknown_provider),
        help("Declare the provider namespace, or fix the `provider` field.")
    )]
    UnknownProvider { namespace: String, provider: String },

    #[error("namespace \"{namespace}\" declares fallbacks but no primary relationship")]
    #[diagnostic(
        code(isoload::config::missing_primary),
        help("Add a `[namespace.primary]` table, or drop the fallbacks to make it a root namespace.")
    )]
    MissingPrimary { namespace: String },

    #[error("delegation cycle through namespace \"{namespace}\"")]
    #[diagnostic(
        code(isoload::config::cycle),
        help(
            "A provider must never delegate back, directly or transitively, to a \
             namespace it provides for. Remove one of the relationships in the cycle."
        )
    )]
    Cycle { namespace: String },

    #[error("invalid pattern \"{pattern}\": {message}")]
    #[diagnostic(
        code(isoload::config::invalid_pattern),
        help("Patterns support `*` and `?` wildcards, e.g. `com.example.*`.")
    )]
    InvalidPattern { pattern: String, message: String },
}

/// Convenience alias.
pub type IsoResult<T> = std::result::Result<T, IsoError>;

pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

pub type SourceResult<T> = std::result::Result<T, SourceError>;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
