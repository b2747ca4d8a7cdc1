pub mod types;
pub mod error;
pub mod config;
pub mod canonical;
pub mod signing;
pub mod fingerprint;
pub mod codec;
pub mod submission;
pub mod metrics;
pub mod validator;

pub use config::{Config, SecretKey};
pub use signing::{Signer, sign, verify};
pub use types::{PackageData, SignedPackage};
pub use validator::{SubmissionInput, Validator, Verdict};
