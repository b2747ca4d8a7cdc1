use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::error::{DecodeError, SerializationError};
use crate::types::SignedPackage;

/// Compact JSON of the whole package, base64 encoded on a single line.
pub fn encode(package: &SignedPackage) -> Result<String, SerializationError> {
    let json = serde_json::to_string(package)?;
    Ok(STANDARD.encode(json.as_bytes()))
}

pub fn decode(text: &str) -> Result<SignedPackage, DecodeError> {
    let bytes = STANDARD.decode(text.trim())?;
    let json = String::from_utf8(bytes)?;
    Ok(serde_json::from_str(&json)?)
}
