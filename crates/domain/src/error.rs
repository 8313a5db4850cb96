/// Shared error type used across all StreamRelay crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    /// The backend answered with a non-success status before streaming began.
    #[error("backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    /// The backend reported an `error` event mid-stream.
    #[error("backend error: {0}")]
    BackendEvent(String),

    #[error("session store: {0}")]
    Store(String),

    #[error("surface: {0}")]
    Surface(String),

    #[error("service: {0}")]
    Service(String),

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for failures reported by the backend itself (as opposed to the
    /// transport or local collaborators).
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend { .. } | Self::BackendEvent(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
