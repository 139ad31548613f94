use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoWeaveError {
    #[error("Not in a memoweave workspace. Run 'memoweave init' first.")]
    NotInitialized,

    #[error("Already initialized. Remove .memoweave/ to reinitialize.")]
    AlreadyInitialized,

    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("Ambiguous id prefix '{0}' matches {1} notes")]
    AmbiguousId(String, usize),

    #[error("Invalid {field}: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Batch rejected at op {index}: {reason}")]
    BatchRejected { index: usize, reason: String },

    #[error("Flow '{flow}' failed: {message}")]
    FlowFailed { flow: &'static str, message: String },

    #[error("Flow '{flow}' returned an unusable response. Please try again.")]
    FlowOutputRejected { flow: &'static str },

    #[error("Backend returned {status}: {detail}")]
    Backend { status: u16, detail: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Loro error: {0}")]
    Loro(#[from] loro::LoroError),

    #[error("Loro encode error: {0}")]
    LoroEncode(#[from] loro::LoroEncodeError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid data URI: {0}")]
    DataUri(String),
}

impl MemoWeaveError {
    pub fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        MemoWeaveError::InvalidField {
            field,
            value: value.into(),
        }
    }

    pub fn flow(flow: &'static str, message: impl Into<String>) -> Self {
        MemoWeaveError::FlowFailed {
            flow,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MemoWeaveError>;
