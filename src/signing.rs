use chrono::Local;
use hmac::{Hmac, Mac};
use serde::Serialize;
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::info;

use crate::canonical::to_canonical_bytes;
use crate::config::SecretKey;
use crate::error::SigningError;
use crate::types::{FORMAT_VERSION, PackageData, SIGNATURE_ALGORITHM, SignedPackage};

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 over the canonical form of `data`, as lowercase hex.
pub fn sign<T: Serialize + ?Sized>(data: &T, key: &[u8]) -> Result<String, SigningError> {
    let canonical = to_canonical_bytes(data)?;
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| SigningError::InvalidKey(e.to_string()))?;
    mac.update(&canonical);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Recompute the MAC and compare in constant time. Any failure is `false`.
pub fn verify<T: Serialize + ?Sized>(data: &T, signature_hex: &str, key: &[u8]) -> bool {
    if signature_hex.is_empty() {
        return false;
    }
    match sign(data, key) {
        Ok(expected) => expected.as_bytes().ct_eq(signature_hex.as_bytes()).into(),
        Err(_) => false,
    }
}

/// Seals results into signed packages under one shared key.
#[derive(Debug, Clone)]
pub struct Signer {
    key: SecretKey,
}

impl Signer {
    pub fn new(key: SecretKey) -> Self {
        Self { key }
    }

    pub fn sign(&self, data: &PackageData) -> Result<String, SigningError> {
        sign(data, self.key.as_bytes())
    }

    pub fn verify(&self, data: &PackageData, signature_hex: &str) -> bool {
        verify(data, signature_hex, self.key.as_bytes())
    }

    pub fn verify_package(&self, package: &SignedPackage) -> bool {
        self.verify(&package.data, &package.signature)
    }

    /// Stamp version and local timestamp onto `results`, then sign.
    pub fn seal(&self, results: Value, hardware_fingerprint: String) -> Result<SignedPackage, SigningError> {
        let data = PackageData {
            version: FORMAT_VERSION.to_string(),
            timestamp: Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            hardware_fingerprint,
            results,
        };
        let signature = self.sign(&data)?;
        info!("Results signed successfully");
        Ok(SignedPackage {
            data,
            signature,
            signature_algorithm: SIGNATURE_ALGORITHM.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scenario() -> Value {
        json!({
            "version": "1.0.0",
            "timestamp": "2025-01-01T00:00:00",
            "hardware_fingerprint": "abc123",
            "results": { "fps": { "average_fps": 85.5 } }
        })
    }

    #[test]
    fn known_answer_matches_reference_client() {
        // hmac.new(b"test-secret", json.dumps(data, sort_keys=True).encode(), sha256)
        let sig = sign(&scenario(), b"test-secret").unwrap();
        assert_eq!(sig, "3c239346be66d8c8bed3d1e17dde7b2705af77c44760280e7eae186fbe139071");
    }

    #[test]
    fn signature_is_64_lowercase_hex() {
        let sig = sign(&scenario(), b"test-secret").unwrap();
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn round_trip_and_wrong_key() {
        let data = scenario();
        let sig = sign(&data, b"test-secret").unwrap();
        assert!(verify(&data, &sig, b"test-secret"));
        assert!(!verify(&data, &sig, b"wrong-secret"));
    }

    #[test]
    fn nested_tamper_is_detected() {
        let data = scenario();
        let sig = sign(&data, b"test-secret").unwrap();
        let mut tampered = data.clone();
        tampered["results"]["fps"]["average_fps"] = json!(85.6);
        assert!(!verify(&tampered, &sig, b"test-secret"));
    }

    #[test]
    fn every_top_level_field_is_covered() {
        let data = scenario();
        let sig = sign(&data, b"k").unwrap();
        for field in ["version", "timestamp", "hardware_fingerprint"] {
            let mut tampered = data.clone();
            tampered[field] = json!("changed");
            assert!(!verify(&tampered, &sig, b"k"), "{} not covered", field);
        }
    }

    #[test]
    fn malformed_signatures_are_false() {
        let data = scenario();
        let sig = sign(&data, b"k").unwrap();
        assert!(!verify(&data, "", b"k"));
        assert!(!verify(&data, &sig[..63], b"k"));
        assert!(!verify(&data, &sig.to_uppercase(), b"k"));
        assert!(!verify(&data, "zz", b"k"));
    }

    #[test]
    fn signer_seal_produces_verifiable_package() {
        let signer = Signer::new(SecretKey::from("test-secret"));
        let pkg = signer.seal(json!({ "cpu": { "score": 1234 } }), "f".repeat(64)).unwrap();
        assert_eq!(pkg.data.version, FORMAT_VERSION);
        assert_eq!(pkg.signature_algorithm, SIGNATURE_ALGORITHM);
        assert!(signer.verify_package(&pkg));

        let other = Signer::new(SecretKey::from("other"));
        assert!(!other.verify_package(&pkg));
    }

    #[test]
    fn struct_and_tree_sign_identically() {
        let data: PackageData = serde_json::from_value(scenario()).unwrap();
        let signer = Signer::new(SecretKey::from("test-secret"));
        assert_eq!(signer.sign(&data).unwrap(), sign(&scenario(), b"test-secret").unwrap());
    }
}
