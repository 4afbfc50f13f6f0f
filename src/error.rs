use crate::models::LibraryType;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LibraryError>;

#[derive(Error, Debug)]
pub enum LibraryError {
    /// The operation expected an existing remote resource.
    #[error("{op}: {target} not found")]
    NotFound { op: &'static str, target: String },

    #[error("{op}: {target} already exists")]
    AlreadyExists { op: &'static str, target: String },

    #[error("timed out after {attempts} attempts: expected {expected} items, server reports {last_count}")]
    PollTimeout {
        attempts: u32,
        expected: usize,
        last_count: usize,
    },

    /// Local and remote inventories disagree after convergence.
    #[error("{description}: {items:?}")]
    IllegalState {
        description: String,
        items: Vec<String>,
    },

    #[error("{op}: unsupported library type {library_type}")]
    UnsupportedLibraryType {
        op: &'static str,
        library_type: LibraryType,
    },

    #[error("unexpected naming pattern: {0}")]
    NamingPattern(String),

    #[error("{op} {target}: server answered {status}: {message}")]
    Status {
        op: &'static str,
        target: String,
        status: u16,
        message: String,
    },

    #[error("{op} {target}: {source}")]
    Transport {
        op: &'static str,
        target: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl LibraryError {
    /// Annotates a `ureq` failure with the operation and target that produced it.
    pub fn remote(op: &'static str, target: impl Into<String>, err: ureq::Error) -> Self {
        let target = target.into();
        match err {
            ureq::Error::Status(status, response) => {
                let message = response
                    .into_string()
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                LibraryError::Status {
                    op,
                    target,
                    status,
                    message,
                }
            }
            transport => LibraryError::Transport {
                op,
                target,
                source: Box::new(transport),
            },
        }
    }

    /// The server refused this one request (bad key, bad value) as opposed to
    /// an auth or transport failure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            LibraryError::Status { status, .. }
                if (400..500).contains(status) && *status != 401 && *status != 403
        )
    }
}
