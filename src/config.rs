use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_UPLOAD_URL: &str = "https://piggybankpc.com/submit";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Shared HMAC secret. Never printed, logged or serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self(key.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

impl From<&str> for SecretKey {
    fn from(key: &str) -> Self {
        Self::new(key.as_bytes())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Signing
    pub security_key: Option<SecretKey>,

    // Submission files
    pub upload_url: String,
    pub results_dir: PathBuf,

    // Logging
    pub log_level: String,

    // Host probe
    pub dmidecode_timeout_ms: u64,
    pub nvidia_smi_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            security_key: None,

            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            results_dir: PathBuf::from("results"),

            log_level: "info".to_string(),

            dmidecode_timeout_ms: 10_000,
            nvidia_smi_timeout_ms: 5_000,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from any variable source; `from_env` uses the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(val) = lookup("BENCHMARK_SECURITY_KEY") {
            config.security_key = Some(SecretKey::new(val));
        }

        if let Some(val) = lookup("PBR_UPLOAD_URL") {
            config.upload_url = val;
        }

        if let Some(val) = lookup("PBR_RESULTS_DIR") {
            config.results_dir = PathBuf::from(val);
        }

        if let Some(val) = lookup("LOG_LEVEL") {
            config.log_level = val;
        }

        if let Some(val) = lookup("DMIDECODE_TIMEOUT_MS") {
            config.dmidecode_timeout_ms = val.parse()
                .map_err(|_| ConfigError::InvalidEnvVar("DMIDECODE_TIMEOUT_MS".to_string(), val))?;
        }

        if let Some(val) = lookup("NVIDIA_SMI_TIMEOUT_MS") {
            config.nvidia_smi_timeout_ms = val.parse()
                .map_err(|_| ConfigError::InvalidEnvVar("NVIDIA_SMI_TIMEOUT_MS".to_string(), val))?;
        }

        Ok(config)
    }

    pub fn with_security_key(mut self, key: impl Into<SecretKey>) -> Self {
        self.security_key = Some(key.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(key) = &self.security_key {
            if key.is_empty() {
                return Err(ConfigError::ValidationError("BENCHMARK_SECURITY_KEY must not be empty".to_string()));
            }
        }

        if !self.upload_url.starts_with("http") {
            return Err(ConfigError::ValidationError("PBR_UPLOAD_URL must be a valid HTTP URL".to_string()));
        }

        if self.dmidecode_timeout_ms == 0 || self.nvidia_smi_timeout_ms == 0 {
            return Err(ConfigError::ValidationError("Probe timeouts must be greater than 0".to_string()));
        }

        Ok(())
    }

    /// The signing key; there is deliberately no fallback value.
    pub fn signing_key(&self) -> Result<&SecretKey, ConfigError> {
        match &self.security_key {
            Some(key) if !key.is_empty() => Ok(key),
            Some(_) => Err(ConfigError::ValidationError("BENCHMARK_SECURITY_KEY must not be empty".to_string())),
            None => Err(ConfigError::MissingEnvVar("BENCHMARK_SECURITY_KEY".to_string())),
        }
    }

    pub fn get_dmidecode_timeout(&self) -> Duration {
        Duration::from_millis(self.dmidecode_timeout_ms)
    }

    pub fn get_nvidia_smi_timeout(&self) -> Duration {
        Duration::from_millis(self.nvidia_smi_timeout_ms)
    }
}
