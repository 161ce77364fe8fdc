use reqwest::StatusCode;

/// Errors produced by the caching worker engine.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    UrlError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Precache of {url} failed: {reason}")]
    InstallError { url: String, reason: String },

    #[error("Invalid lifecycle transition: {0}")]
    LifecycleError(String),

    #[error("Generic worker error: {0}")]
    Generic(String),
}

impl WorkerError {
    /// Build an install error from a rejected precache status.
    pub(crate) fn install_status(url: impl Into<String>, status: StatusCode) -> Self {
        WorkerError::InstallError {
            url: url.into(),
            reason: format!("server returned status {status}"),
        }
    }
}
