//! Structured logging for try-on requests.

use std::time::Instant;

use tracing::{error, info, warn};

use super::stage::{PipelineError, PipelineErrorKind, PipelineStage};
use crate::metrics;

/// Logs stage transitions of one request with consistent fields.
#[derive(Debug)]
pub struct PipelineLogger {
    request_id: String,
    operation: &'static str,
    started: Instant,
}

impl PipelineLogger {
    pub fn new(request_id: impl Into<String>, operation: &'static str) -> Self {
        Self {
            request_id: request_id.into(),
            operation,
            started: Instant::now(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn log_start(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = self.operation,
            "Try-on started: {}", message
        );
    }

    /// Record a finished stage and its duration.
    pub fn log_stage(&self, stage: PipelineStage, stage_started: Instant) {
        let elapsed = stage_started.elapsed();
        metrics::record_stage_duration(self.operation, stage.as_str(), elapsed.as_secs_f64());
        info!(
            request_id = %self.request_id,
            operation = self.operation,
            stage = %stage,
            duration_ms = elapsed.as_millis() as u64,
            "Stage complete"
        );
    }

    /// Log a failure at the level its class deserves.
    pub fn log_failure(&self, err: &PipelineError) {
        match err.kind {
            PipelineErrorKind::Internal => error!(
                request_id = %self.request_id,
                operation = self.operation,
                stage = %err.stage,
                error = %err.message,
                "Try-on failed"
            ),
            PipelineErrorKind::Upstream => warn!(
                request_id = %self.request_id,
                operation = self.operation,
                stage = %err.stage,
                error = %err.message,
                "Garment source unavailable"
            ),
            _ => info!(
                request_id = %self.request_id,
                operation = self.operation,
                stage = %err.stage,
                error = %err.message,
                "Try-on rejected"
            ),
        }
    }

    /// Log completion and return total elapsed milliseconds.
    pub fn log_completion(&self, result: &str) -> u64 {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        info!(
            request_id = %self.request_id,
            operation = self.operation,
            result = %result,
            duration_ms = elapsed_ms,
            "Try-on completed"
        );
        elapsed_ms
    }
}
