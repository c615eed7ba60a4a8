//! Deterministic engine for tests.
//!
//! Kept in the library (not behind `cfg(test)`) so the integration tests in
//! `tests/` can drive the full router without a model file.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::engine::{GenerationConfig, InferenceEngine};
use crate::error::ServiceError;

/// Marker substring that makes [`MockEngine`] fail a generation.
pub const FAIL_MARKER: &str = "__fail__";

pub struct MockEngine {
    latency: Duration,
    calls: Arc<Mutex<Vec<String>>>,
    in_flight: AtomicBool,
    overlaps: Arc<AtomicUsize>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    /// An engine whose generations take at least `latency`, for exercising
    /// queueing behavior.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            calls: Arc::new(Mutex::new(Vec::new())),
            in_flight: AtomicBool::new(false),
            overlaps: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared view of every prompt the engine has been asked to generate,
    /// in invocation order.
    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        self.calls.clone()
    }

    /// Shared count of generate calls that entered while another was still
    /// running. Stays zero while the serialization contract holds.
    pub fn overlaps(&self) -> Arc<AtomicUsize> {
        self.overlaps.clone()
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceEngine for MockEngine {
    fn generate(&mut self, prompt: &str, cfg: &GenerationConfig) -> Result<String, ServiceError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }

        self.calls.lock().push(prompt.to_string());
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }

        let result = if prompt.contains(FAIL_MARKER) {
            Err(ServiceError::Generation("mock engine fault".into()))
        } else {
            Ok(format!("completion[{}tok]:{prompt}", cfg.max_tokens))
        };

        self.in_flight.store(false, Ordering::SeqCst);
        result
    }
}
