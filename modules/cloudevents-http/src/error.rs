use thiserror::Error;

pub type Result<T> = std::result::Result<T, CodecError>;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Missing required attribute: {0}")]
    MissingAttribute(&'static str),

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid header {name}: {message}")]
    InvalidHeader { name: String, message: String },

    #[error("Invalid event time: {0}")]
    InvalidTime(String),
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::InvalidJson(err.to_string())
    }
}

impl From<chrono::ParseError> for CodecError {
    fn from(err: chrono::ParseError) -> Self {
        CodecError::InvalidTime(err.to_string())
    }
}
