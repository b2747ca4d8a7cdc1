use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::codec::decode;
use crate::config::SecretKey;
use crate::metrics::{RejectReason, SubmissionMetrics};
use crate::signing::Signer;
use crate::submission::extract_payload;
use crate::types::PackageData;

/// Where a submission comes from: a file on disk or uploaded text.
#[derive(Debug, Clone, Copy)]
pub enum SubmissionInput<'a> {
    Path(&'a Path),
    Content(&'a str),
}

/// Outcome shown to submitters. Corrupt and tampered files are both `Invalid`.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accepted(PackageData),
    Invalid,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted(_))
    }

    pub fn into_data(self) -> Option<PackageData> {
        match self {
            Verdict::Accepted(data) => Some(data),
            Verdict::Invalid => None,
        }
    }
}

pub struct Validator {
    signer: Signer,
    metrics: Option<Arc<SubmissionMetrics>>,
}

impl Validator {
    pub fn new(key: SecretKey) -> Self {
        Self::from_signer(Signer::new(key))
    }

    pub fn from_signer(signer: Signer) -> Self {
        Self { signer, metrics: None }
    }

    pub fn with_metrics(mut self, metrics: Arc<SubmissionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn validate_file(&self, path: &Path) -> Verdict {
        self.read_and_validate(SubmissionInput::Path(path))
    }

    pub fn validate_content(&self, content: &str) -> Verdict {
        self.read_and_validate(SubmissionInput::Content(content))
    }

    /// Extract the payload line, decode it and check its signature.
    pub fn read_and_validate(&self, input: SubmissionInput<'_>) -> Verdict {
        let result = match input {
            SubmissionInput::Path(path) => match fs::read_to_string(path) {
                Ok(content) => self.check(&content),
                Err(e) => {
                    warn!("Failed to read submission file {}: {}", path.display(), e);
                    Err(RejectReason::Unreadable)
                }
            },
            SubmissionInput::Content(content) => self.check(content),
        };

        match result {
            Ok(data) => {
                info!(
                    "Submission is VALID (version {}, hardware {}...)",
                    data.version,
                    data.hardware_fingerprint.chars().take(16).collect::<String>()
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_accepted();
                }
                Verdict::Accepted(data)
            }
            Err(reason) => {
                warn!("Submission is INVALID or TAMPERED ({})", reason);
                if let Some(metrics) = &self.metrics {
                    metrics.record_rejected(reason);
                }
                Verdict::Invalid
            }
        }
    }

    fn check(&self, content: &str) -> Result<PackageData, RejectReason> {
        let encoded = extract_payload(content).ok_or(RejectReason::MissingPayload)?;
        let package = decode(encoded).map_err(|e| {
            warn!("Failed to decode submission: {}", e);
            RejectReason::Malformed
        })?;
        if !self.signer.verify_package(&package) {
            return Err(RejectReason::BadSignature);
        }
        Ok(package.data)
    }
}
