//! # Application State Management
//!
//! This module manages shared state that needs to be accessed by multiple HTTP request handlers
//! simultaneously.
//!
//! ## Key Rust Concepts:
//!
//! ### Arc (Atomically Reference Counted)
//! - **Purpose**: Allows multiple parts of the program to safely share ownership of data
//! - **Why needed**: Multiple HTTP requests run simultaneously and all need access to the same state
//!
//! ### RwLock (Reader-Writer Lock)
//! - **Purpose**: Allows multiple readers OR one writer at a time (but not both)
//! - **Why needed**: Every request reads config, while the metrics middleware writes counters
//!
//! ### Arc<RwLock<T>> Pattern
//! Thread-safe shared mutable state: many handlers hold a reference, the type
//! system rules out data races at compile time.
//!
//! The transcription engine also lives here. It is shared, loaded once at
//! startup, and internally synchronized, so handlers just call into it.

use crate::config::AppConfig;
use crate::transcription::TranscriptionEngine;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// The main application state that's shared across all HTTP request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration, fixed after startup but read from many threads
    pub config: Arc<RwLock<AppConfig>>,

    /// Performance metrics, constantly updated by the middleware and handlers
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// The transcription engine wrapping the once-loaded Whisper model
    pub engine: Arc<TranscriptionEngine>,

    /// When the server started (Instant is Copy, safe to share directly)
    pub start_time: Instant,
}

/// Counters collected across all HTTP requests.
///
/// ## Why these metrics matter:
/// - **request_count / error_count**: Load and reliability monitoring
/// - **analyses_completed**: How many uploads made it through the full pipeline
/// - **transcription_failures**: How often the model/decoder rejected an upload
/// - **endpoint_metrics**: Per-endpoint latency and error statistics
#[derive(Debug, Default)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start
    pub request_count: u64,

    /// Total number of errors encountered since server start
    pub error_count: u64,

    /// Uploads that were transcribed and analyzed successfully
    pub analyses_completed: u64,

    /// Uploads the transcription pipeline rejected
    pub transcription_failures: u64,

    /// Detailed metrics for each API endpoint, keyed like "POST /analyze"
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Detailed performance metrics for a specific API endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    /// Number of requests to this specific endpoint
    pub request_count: u64,

    /// Total time spent processing all requests to this endpoint (milliseconds)
    pub total_duration_ms: u64,

    /// Number of errors that occurred for this endpoint
    pub error_count: u64,
}

impl AppState {
    /// Create a new AppState from the loaded configuration and the engine
    /// main() constructed during startup.
    pub fn new(config: AppConfig, engine: Arc<TranscriptionEngine>) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            engine,
            start_time: Instant::now(),
        }
    }

    /// Get a copy of the current configuration.
    ///
    /// ## Why clone:
    /// Cloning releases the read lock immediately, so other threads aren't
    /// blocked while the caller builds a response. AppConfig is cheap to clone.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    /// Increment the total request counter (called by middleware for every request).
    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    /// Increment the total error counter (called when any request fails).
    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    /// Record detailed metrics for a specific endpoint.
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();

        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;

        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Record one upload that made it through transcribe-then-analyze.
    pub fn record_analysis_completed(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.analyses_completed += 1;
    }

    /// Record one upload the transcription pipeline rejected.
    pub fn record_transcription_failure(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.transcription_failures += 1;
    }

    /// Get a snapshot of current metrics (used for the /metrics endpoint).
    ///
    /// ## Why a snapshot:
    /// Clones the data under a read lock so nothing changes mid-serialization
    /// and no lock is held while the HTTP response is generated.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            analyses_completed: metrics.analyses_completed,
            transcription_failures: metrics.transcription_failures,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    /// Get server uptime in seconds.
    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    /// Average response time for this endpoint in milliseconds.
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Error rate for this endpoint (0.0 to 1.0).
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn test_state() -> AppState {
        let engine = Arc::new(TranscriptionEngine::new(Some("en".to_string()), Device::Cpu));
        AppState::new(AppConfig::default(), engine)
    }

    #[test]
    fn test_request_counters() {
        let state = test_state();
        state.increment_request_count();
        state.increment_request_count();
        state.increment_error_count();

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.request_count, 2);
        assert_eq!(snapshot.error_count, 1);
    }

    #[test]
    fn test_analysis_counters() {
        let state = test_state();
        state.record_analysis_completed();
        state.record_transcription_failure();
        state.record_transcription_failure();

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.analyses_completed, 1);
        assert_eq!(snapshot.transcription_failures, 2);
    }

    #[test]
    fn test_endpoint_metrics() {
        let state = test_state();
        state.record_endpoint_request("POST /analyze", 120, false);
        state.record_endpoint_request("POST /analyze", 80, true);

        let snapshot = state.get_metrics_snapshot();
        let metric = snapshot.endpoint_metrics.get("POST /analyze").unwrap();
        assert_eq!(metric.request_count, 2);
        assert_eq!(metric.error_count, 1);
        assert_eq!(metric.average_duration_ms(), 100.0);
        assert_eq!(metric.error_rate(), 0.5);
    }
}
