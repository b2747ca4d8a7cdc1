use thiserror::Error;

/// The value handed to the canonicalizer is not a JSON tree.
#[derive(Error, Debug)]
#[error("Value is not JSON-compatible: {0}")]
pub struct SerializationError(#[from] pub serde_json::Error);

#[derive(Error, Debug)]
pub enum SigningError {
    #[error(transparent)]
    Serialization(#[from] SerializationError),
    #[error("Unable to key HMAC: {0}")]
    InvalidKey(String),
}

/// A submission payload could not be turned back into a package.
///
/// Callers must treat this exactly like a failed signature check.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Payload is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("Payload is not a signed package: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("Submission file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Encode(#[from] SerializationError),
}
