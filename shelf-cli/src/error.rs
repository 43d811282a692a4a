use thiserror::Error;

/// Errors that can occur during CLI command execution.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Settings file could not be read or written
    #[error("Config error: {0}")]
    Config(#[from] shelf_lib::SettingsError),

    /// Reconciliation could not start
    #[error("Reconcile error: {0}")]
    Pipeline(#[from] shelf_reconcile::PipelineError),

    /// Pipeline discovery failed
    #[error("{0}")]
    Discover(#[from] shelf_lib::DiscoverError),

    /// Runtime creation or async error
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// A required input could not be determined
    #[error("{0}")]
    Usage(String),

    /// JSON output failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    pub(crate) fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    pub(crate) fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }
}
