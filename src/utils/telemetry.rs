// file: src/utils/telemetry.rs
// description: operation timing, throughput metrics, and capability health reporting
// reference: tracing spans and probe results for remote capabilities

use crate::capability::CapabilityError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Ordered from best to worst so a report can take the maximum.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    fn marker(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "ok  ",
            HealthStatus::Degraded => "warn",
            HealthStatus::Unhealthy => "fail",
        }
    }
}

/// Outcome of probing one capability.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    pub component: String,
    pub status: HealthStatus,
    pub detail: Option<String>,
    pub latency_ms: u64,
}

impl HealthCheck {
    /// Classifies a live probe. Throttling and timeouts leave the capability
    /// usable, anything else does not.
    pub fn from_probe(
        component: &str,
        outcome: Result<(), CapabilityError>,
        latency: Duration,
    ) -> Self {
        let (status, detail) = match outcome {
            Ok(()) => (HealthStatus::Healthy, None),
            Err(e @ (CapabilityError::RateLimited { .. } | CapabilityError::Timeout(_))) => {
                (HealthStatus::Degraded, Some(e.to_string()))
            }
            Err(e) => (HealthStatus::Unhealthy, Some(e.to_string())),
        };
        Self {
            component: component.to_string(),
            status,
            detail,
            latency_ms: latency.as_millis() as u64,
        }
    }

    /// A capability that was never contacted because it is not configured.
    pub fn skipped(component: &str, reason: impl Into<String>, required: bool) -> Self {
        Self {
            component: component.to_string(),
            status: if required {
                HealthStatus::Unhealthy
            } else {
                HealthStatus::Degraded
            },
            detail: Some(reason.into()),
            latency_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub overall_status: HealthStatus,
    pub checks: Vec<HealthCheck>,
    pub checked_at: DateTime<Utc>,
    pub version: String,
}

impl HealthReport {
    pub fn new(checks: Vec<HealthCheck>, version: impl Into<String>) -> Self {
        let overall_status = checks
            .iter()
            .map(|check| check.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);

        Self {
            overall_status,
            checks,
            checked_at: Utc::now(),
            version: version.into(),
        }
    }

    /// Degraded capabilities still allow a review to run.
    pub fn is_usable(&self) -> bool {
        self.overall_status < HealthStatus::Unhealthy
    }

    pub fn format(&self) -> String {
        let mut out = format!(
            "[{}] lit_review {} ({})\n",
            self.overall_status.marker(),
            self.version,
            self.checked_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        for check in &self.checks {
            let _ = write!(
                out,
                "  [{}] {:<14} {:>6}ms",
                check.status.marker(),
                check.component,
                check.latency_ms
            );
            if let Some(detail) = &check.detail {
                let _ = write!(out, "  {}", detail);
            }
            out.push('\n');
        }

        out
    }
}

/// Times a pipeline operation and logs it when finished.
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        debug!(operation, "operation started");
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        info!(
            operation = %self.operation,
            elapsed_ms = elapsed.as_millis() as u64,
            "operation finished"
        );
        elapsed
    }

    /// Like [`finish`](Self::finish) but also reports per-item throughput.
    pub fn finish_with_count(self, count: usize) -> Duration {
        let elapsed = self.elapsed();
        let metrics = PerformanceMetrics::new(&self.operation, count, elapsed);
        info!("{}", metrics.format());
        elapsed
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceMetrics {
    pub operation: String,
    pub count: usize,
    pub elapsed: Duration,
}

impl PerformanceMetrics {
    pub fn new(operation: &str, count: usize, elapsed: Duration) -> Self {
        Self {
            operation: operation.to_string(),
            count,
            elapsed,
        }
    }

    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.count as f64 / secs
        } else {
            0.0
        }
    }

    pub fn per_item_ms(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.elapsed.as_secs_f64() * 1000.0 / self.count as f64
    }

    pub fn format(&self) -> String {
        format!(
            "{}: {} in {:.2}s ({:.2}/s, {:.1}ms each)",
            self.operation,
            self.count,
            self.elapsed.as_secs_f64(),
            self.throughput(),
            self.per_item_ms()
        )
    }
}
