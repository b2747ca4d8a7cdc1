//! Best-effort machine fingerprint.
//!
//! This is a weak anti-spoofing heuristic, not a security boundary: any
//! signal may be missing and a machine without signals gets a random id.

use std::path::PathBuf;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::process::Command;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;

const SEPARATOR: &str = "|";

/// Raw identifying strings, each source optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FingerprintSignals {
    pub cpu: Vec<String>,
    pub board: Vec<String>,
    pub machine_id: Option<String>,
    pub gpu_uuid: Option<String>,
}

impl FingerprintSignals {
    /// Non-empty signals in hashing order: cpu, board, machine id, gpu.
    pub fn ordered(&self) -> Vec<&str> {
        self.cpu
            .iter()
            .chain(self.board.iter())
            .chain(self.machine_id.iter())
            .chain(self.gpu_uuid.iter())
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered().is_empty()
    }
}

/// SHA-256 of the `|`-joined signals, or a random id when there are none.
pub fn fingerprint(signals: &FingerprintSignals) -> String {
    let parts = signals.ordered();
    if parts.is_empty() {
        return random_fingerprint();
    }
    hex::encode(Sha256::digest(parts.join(SEPARATOR).as_bytes()))
}

fn random_fingerprint() -> String {
    hex::encode(Sha256::digest(Uuid::new_v4().as_bytes()))
}

pub fn cpu_lines(cpuinfo: &str) -> Vec<String> {
    cpuinfo
        .lines()
        .filter(|line| line.contains("model name") || line.contains("vendor_id"))
        .map(|line| line.trim().to_string())
        .collect()
}

pub fn board_lines(dmidecode: &str) -> Vec<String> {
    dmidecode
        .lines()
        .filter(|line| line.contains("Serial Number") || line.contains("UUID"))
        .map(|line| line.trim().to_string())
        .collect()
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Reads fingerprint signals from the local host.
#[derive(Debug, Clone)]
pub struct HostProbe {
    cpuinfo_path: PathBuf,
    machine_id_path: PathBuf,
    dmidecode_timeout: Duration,
    nvidia_smi_timeout: Duration,
}

impl Default for HostProbe {
    fn default() -> Self {
        Self {
            cpuinfo_path: PathBuf::from("/proc/cpuinfo"),
            machine_id_path: PathBuf::from("/etc/machine-id"),
            dmidecode_timeout: Duration::from_secs(10),
            nvidia_smi_timeout: Duration::from_secs(5),
        }
    }
}

impl HostProbe {
    pub fn from_config(config: &Config) -> Self {
        Self {
            dmidecode_timeout: config.get_dmidecode_timeout(),
            nvidia_smi_timeout: config.get_nvidia_smi_timeout(),
            ..Self::default()
        }
    }

    pub fn with_paths(mut self, cpuinfo: impl Into<PathBuf>, machine_id: impl Into<PathBuf>) -> Self {
        self.cpuinfo_path = cpuinfo.into();
        self.machine_id_path = machine_id.into();
        self
    }

    pub async fn collect(&self) -> FingerprintSignals {
        let cpu = match tokio::fs::read_to_string(&self.cpuinfo_path).await {
            Ok(text) => cpu_lines(&text),
            Err(e) => {
                debug!("cpuinfo unavailable: {}", e);
                Vec::new()
            }
        };

        let board = run_with_timeout("dmidecode", &["-t", "baseboard"], self.dmidecode_timeout)
            .await
            .map(|out| board_lines(&out))
            .unwrap_or_default();

        let machine_id = match tokio::fs::read_to_string(&self.machine_id_path).await {
            Ok(text) => non_empty(&text),
            Err(e) => {
                debug!("machine id unavailable: {}", e);
                None
            }
        };

        let gpu_uuid = run_with_timeout(
            "nvidia-smi",
            &["--query-gpu=uuid", "--format=csv,noheader"],
            self.nvidia_smi_timeout,
        )
        .await
        .and_then(|out| non_empty(&out));

        FingerprintSignals { cpu, board, machine_id, gpu_uuid }
    }

    pub async fn fingerprint(&self) -> String {
        let signals = self.collect().await;
        if signals.is_empty() {
            info!("No hardware signals available, using random fingerprint");
        }
        let fp = fingerprint(&signals);
        info!("Generated hardware fingerprint: {}...", &fp[..16]);
        fp
    }
}

/// Stdout of a successful command, or `None` on any failure.
async fn run_with_timeout(program: &str, args: &[&str], limit: Duration) -> Option<String> {
    let mut cmd = Command::new(program);
    cmd.args(args).kill_on_drop(true);
    match tokio::time::timeout(limit, cmd.output()).await {
        Ok(Ok(output)) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(Ok(output)) => {
            debug!("{} exited with {}", program, output.status);
            None
        }
        Ok(Err(e)) => {
            debug!("{} could not be started: {}", program, e);
            None
        }
        Err(_) => {
            debug!("{} timed out after {:?}", program, limit);
            None
        }
    }
}
