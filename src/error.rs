use thiserror::Error;

#[derive(Error, Debug)]
pub enum ActionError {
    /// Bad or missing input: empty version specifier, unknown or
    /// non-public platform name.
    #[error("{0}")]
    Validation(String),

    /// The build target endpoint returned a non-success status or the
    /// request itself failed.
    #[error("Error fetching build targets: {0}")]
    Network(String),

    /// The build target endpoint returned a body that did not parse.
    #[error("Error parsing build targets: {0}")]
    Parse(String),

    /// Version resolution found nothing satisfying the constraints.
    /// Always carries the computed latest version as a remediation hint.
    #[error("{0}")]
    NoCandidate(String),

    /// No git repository found walking up from the starting path.
    #[error("No Git repository found in the parent directories")]
    NoRepository,

    /// The clone is shallow, so log/blame based reasoning is unreliable.
    #[error("The repository has a shallow history. Auto-versioning requires the full git history; fetch with depth 0 (e.g. actions/checkout with fetch-depth: 0)")]
    ShallowHistory,

    /// No file under the sources folder contains the version macro.
    #[error("Could not find a file containing the {0} macro.")]
    MacroNotFound(String),

    /// The decision protocol could not locate the macro file.
    #[error("Could not find a file containing the version macro.")]
    MacroFileNotFound,

    /// The macro line exists but blame could not attribute it.
    #[error("Could not find the {0} line in the blame information.")]
    NoBumpHistory(String),

    /// A git query failed or returned something unusable.
    #[error("{0}")]
    Git(String),

    /// Local containerized compilation failed.
    #[error("{0}")]
    Docker(String),

    /// Cloud compilation or binary download failed.
    #[error("{0}")]
    Cloud(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ActionError>;
