use std::path::PathBuf;

/// Errors that abort definition synthesis.
///
/// There is no partial-definition recovery: any of these means no template is
/// produced.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("workflow template is missing field `{path}`")]
    MissingTemplateField { path: String },

    #[error("workflow template is not valid JSON: {0}")]
    InvalidTemplate(#[from] serde_json::Error),

    #[error("resource `{from}` references unknown resource `{target}`")]
    UnknownReference { from: String, target: String },

    #[error("logical id `{0}` is declared more than once")]
    DuplicateLogicalId(String),

    #[error("logical id `{0}` must be non-empty ASCII alphanumeric")]
    InvalidLogicalId(String),

    #[error("dependency cycle detected at resource `{0}`")]
    DependencyCycle(String),

    #[error("policy statement for `{0}` has no actions or no resources")]
    EmptyPolicy(String),

    #[error("static site directory `{0}` contains no files")]
    EmptySite(PathBuf),

    #[error("invalid stack configuration: {0}")]
    Config(String),

    #[error("failed to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DefinitionError>;
