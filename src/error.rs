use thiserror::Error;

/// Error taxonomy for the case, geometry, and variable readers.
///
/// Every public entry point returns `Result<_, Report<EncasError>>`; on any
/// of these the partially built object is dropped and nothing is cached.
#[derive(Debug, Error)]
pub enum EncasError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{what} not found: {path}")]
    NotFound { what: &'static str, path: String },

    #[error("format error: {0}")]
    Format(String),

    #[error("unsupported feature: {0}")]
    Unsupported(String),

    #[error("consistency error: {0}")]
    Consistency(String),

    #[error("index {index} out of bounds (len {len}): {what}")]
    Bounds {
        what: &'static str,
        index: i64,
        len: usize,
    },
}

impl EncasError {
    pub fn format(msg: impl Into<String>) -> Self {
        EncasError::Format(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        EncasError::Unsupported(msg.into())
    }

    pub fn consistency(msg: impl Into<String>) -> Self {
        EncasError::Consistency(msg.into())
    }
}

pub type EResult<T> = Result<T, rootcause::Report<EncasError>>;
