use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_submissions: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub acceptance_rate: f64,

    // Rejections by cause; never shown to submitters
    pub unreadable: u64,
    pub missing_payload: u64,
    pub malformed: u64,
    pub bad_signature: u64,

    pub uptime_seconds: u64,
}

/// Thread-safe validation counters.
#[derive(Debug)]
pub struct SubmissionMetrics {
    accepted: AtomicU64,
    unreadable: AtomicU64,
    missing_payload: AtomicU64,
    malformed: AtomicU64,
    bad_signature: AtomicU64,
    start_time: Instant,
}

impl Default for SubmissionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionMetrics {
    pub fn new() -> Self {
        Self {
            accepted: AtomicU64::new(0),
            unreadable: AtomicU64::new(0),
            missing_payload: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            bad_signature: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self, reason: RejectReason) {
        match reason {
            RejectReason::Unreadable => self.unreadable.fetch_add(1, Ordering::Relaxed),
            RejectReason::MissingPayload => self.missing_payload.fetch_add(1, Ordering::Relaxed),
            RejectReason::Malformed => self.malformed.fetch_add(1, Ordering::Relaxed),
            RejectReason::BadSignature => self.bad_signature.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        let accepted = self.accepted.load(Ordering::Relaxed);
        let unreadable = self.unreadable.load(Ordering::Relaxed);
        let missing_payload = self.missing_payload.load(Ordering::Relaxed);
        let malformed = self.malformed.load(Ordering::Relaxed);
        let bad_signature = self.bad_signature.load(Ordering::Relaxed);

        let rejected = unreadable + missing_payload + malformed + bad_signature;
        let total_submissions = accepted + rejected;

        let acceptance_rate = if total_submissions > 0 {
            accepted as f64 / total_submissions as f64
        } else {
            0.0
        };

        MetricsSnapshot {
            total_submissions,
            accepted,
            rejected,
            acceptance_rate,
            unreadable,
            missing_payload,
            malformed,
            bad_signature,
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

/// Why a submission was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Unreadable,
    MissingPayload,
    Malformed,
    BadSignature,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Unreadable => write!(f, "unreadable"),
            RejectReason::MissingPayload => write!(f, "missing payload"),
            RejectReason::Malformed => write!(f, "malformed payload"),
            RejectReason::BadSignature => write!(f, "signature mismatch"),
        }
    }
}
