use std::path::PathBuf;

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can stop a publish run. No variant is retried locally.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("identity storage failed at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("identity record could not be decoded: {0}")]
    Decode(String),

    #[error("key generation failed: {0}")]
    SignatureScheme(String),

    #[error("signing failed: {0}")]
    Signature(String),

    #[error("relay connection failed: {0}")]
    Connection(String),

    #[error("relay protocol error: {0}")]
    Protocol(String),

    #[error("relay rejected event: {message}")]
    Rejected {
        prefix: Option<String>,
        message: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Storage {
            path: path.into(),
            source,
        }
    }
}
