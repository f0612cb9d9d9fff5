use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O errors from terminal or local file access.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Invalid configuration value or unusable config location.
    #[error("Config error: {0}")]
    Config(String),

    /// Transport-level failure talking to the workspace API.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The workspace API answered with a non-success status.
    #[error("API error: {url} returned {status}")]
    Api { status: u16, url: String },

    /// A response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Which mutation a [`SyncError::Mutation`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOp {
    Create,
    Rename,
    Delete,
}

impl std::fmt::Display for MutationOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            MutationOp::Create => "create",
            MutationOp::Rename => "rename",
            MutationOp::Delete => "delete",
        })
    }
}

/// Failures observed by the tree engine.
///
/// These never abort the caller; they are published on the engine's report
/// channel so the UI can surface them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The root listing could not be fetched; the tree was cleared.
    #[error("failed to load workspace: {cause}")]
    RootFetch { cause: String },

    /// One directory's content could not be fetched; it is shown empty.
    #[error("failed to load directory {name}: {cause}")]
    DirectoryFetch { name: String, cause: String },

    /// A create/rename/delete call failed; the tree is unchanged.
    #[error("failed to {op} {target}: {cause}")]
    Mutation {
        op: MutationOp,
        target: String,
        cause: String,
    },
}
