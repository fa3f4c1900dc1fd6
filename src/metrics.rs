//! Send and persistence metrics
//!
//! Counters and histograms are recorded through the `metrics` facade; with no
//! recorder installed they are no-ops.
//!
//! # Metrics
//!
//! - `chat_sends_total`: Counter of sends issued, by model
//! - `chat_send_failures_total`: Counter of failed sends, by model
//! - `chat_send_duration_seconds`: Histogram of round-trip duration, by outcome
//! - `chat_saves_failed_total`: Counter of failed background saves
//!
//! # Examples
//!
//! ```
//! use parlor::metrics::SendMetrics;
//!
//! let metrics = SendMetrics::new("gpt-4o");
//! metrics.record_outcome("completed");
//! ```

use metrics::{histogram, increment_counter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Metrics for a single send round trip
///
/// Records `chat_sends_total` on creation and the duration once, on the
/// first call to [`SendMetrics::record_outcome`] or on drop.
#[derive(Debug)]
pub struct SendMetrics {
    model: String,
    start: Instant,
    recorded: AtomicBool,
}

impl SendMetrics {
    /// Start tracking a send for `model`
    pub fn new(model: &str) -> Self {
        increment_counter!("chat_sends_total", "model" => model.to_string());

        Self {
            model: model.to_string(),
            start: Instant::now(),
            recorded: AtomicBool::new(false),
        }
    }

    /// Record how the send ended
    ///
    /// # Arguments
    ///
    /// * `outcome` - One of `completed`, `no_response`, `failed`, `cancelled`
    ///   or `dropped`
    pub fn record_outcome(&self, outcome: &str) {
        if self.recorded.swap(true, Ordering::SeqCst) {
            return;
        }

        histogram!(
            "chat_send_duration_seconds",
            self.start.elapsed().as_secs_f64(),
            "model" => self.model.clone(),
            "outcome" => outcome.to_string()
        );

        if outcome == "failed" {
            increment_counter!("chat_send_failures_total", "model" => self.model.clone());
        }
    }

    /// Time since the send started
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Drop for SendMetrics {
    fn drop(&mut self) {
        // A send task aborted mid-flight still gets a duration sample
        self.record_outcome("aborted");
    }
}

/// Count a background save that the backend rejected
pub fn record_save_failure() {
    increment_counter!("chat_saves_failed_total");
}
