/*!
 * Structured Tracing
 * Request spans for VFS calls and lifecycle operations using the tracing crate
 *
 * Features:
 * - Trace ID per request for correlation
 * - JSON-formatted logs for structured parsing
 * - Slow request warnings
 */

use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

use crate::core::limits::SLOW_VFS_REQUEST;
use crate::core::types::Origin;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - WEBTOP_TRACE_JSON: Enable JSON output (default: false)
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("WEBTOP_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    // try_init: tests and embedders may already have installed a subscriber
    let result = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    if result.is_ok() {
        info!(json = use_json, "Structured tracing initialized");
    }
}

/// Generate a unique trace ID for request correlation
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span covering one VFS request
pub struct VfsSpan {
    span: tracing::Span,
    start: Instant,
    method: &'static str,
    trace_id: String,
}

impl VfsSpan {
    pub fn new(method: &'static str, path: &str, origin: &Origin) -> Self {
        let trace_id = generate_trace_id();

        let span = span!(
            Level::DEBUG,
            "vfs_request",
            trace_id = %trace_id,
            method,
            path,
            origin = %origin,
            mount = tracing::field::Empty,
            result = tracing::field::Empty,
            error = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            method,
            trace_id,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// The underlying span, for instrumenting futures
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    pub fn record_mount(&self, mount: &str) {
        self.span.record("mount", mount);
    }

    pub fn record_result(&self, success: bool) {
        self.span.record("result", if success { "success" } else { "error" });
    }

    pub fn record_error(&self, error: &str) {
        self.span.record("error", error);
        self.span.record("result", "error");
    }
}

impl Drop for VfsSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        self.span.record("duration_ms", duration.as_millis() as u64);
        let _entered = self.span.enter();

        if duration > SLOW_VFS_REQUEST {
            warn!(
                trace_id = %self.trace_id,
                method = self.method,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow VFS request"
            );
        } else {
            debug!(
                trace_id = %self.trace_id,
                method = self.method,
                duration_us = duration.as_micros() as u64,
                "VFS request completed"
            );
        }
    }
}

/// Span for other kernel operations (launch, kill, login)
pub struct OperationSpan {
    span: tracing::Span,
    start: Instant,
    trace_id: String,
    slow_after: Duration,
}

impl OperationSpan {
    pub fn new(operation: &str) -> Self {
        let trace_id = generate_trace_id();

        let span = span!(
            Level::DEBUG,
            "operation",
            trace_id = %trace_id,
            operation,
            result = tracing::field::Empty,
            error = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            trace_id,
            slow_after: SLOW_VFS_REQUEST,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn record_result(&self, success: bool) {
        self.span.record("result", if success { "success" } else { "error" });
    }

    pub fn record_error(&self, error: &str) {
        self.span.record("error", error);
        self.span.record("result", "error");
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for OperationSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();

        if duration > self.slow_after {
            warn!(
                trace_id = %self.trace_id,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow operation detected"
            );
        } else {
            debug!(
                trace_id = %self.trace_id,
                duration_us = duration.as_micros() as u64,
                "operation completed"
            );
        }
    }
}

#[inline]
pub fn span_vfs(method: &'static str, path: &str, origin: &Origin) -> VfsSpan {
    VfsSpan::new(method, path, origin)
}

#[inline]
pub fn span_operation(name: &str) -> OperationSpan {
    OperationSpan::new(name)
}
