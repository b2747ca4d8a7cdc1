use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Package format version stamped into every sealed package.
pub const FORMAT_VERSION: &str = "1.0.0";

/// The only MAC construction packages are signed with.
pub const SIGNATURE_ALGORITHM: &str = "HMAC-SHA256";

/// The signed part of a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageData {
    pub version: String,
    pub timestamp: String,
    pub hardware_fingerprint: String,
    /// Opaque benchmark output (FPS/AI/CPU scores, system info).
    pub results: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedPackage {
    pub data: PackageData,
    pub signature: String, // lowercase hex HMAC-SHA256 over canonical(data)
    #[serde(default = "default_algorithm")]
    pub signature_algorithm: String,
}

fn default_algorithm() -> String {
    SIGNATURE_ALGORITHM.to_string()
}
