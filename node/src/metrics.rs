//! # Prometheus Metrics
//!
//! Flow-level metrics for the node. Every flow the node initiates goes
//! through [`FlowMetrics::observe`], which counts it as started, times it,
//! and counts it again as finalized or aborted (labelled by error class).
//!
//! All metrics live in a dedicated [`prometheus::Registry`] under the
//! `accord` namespace so they do not collide with any default global
//! registry consumers.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::future::Future;
use std::time::Instant;

use accord_protocol::flows::FlowError;
use accord_protocol::transaction::FinalizedTransaction;

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (prometheus handles are `Arc`s internally) so it can be
/// shared across flows and background tasks.
#[derive(Clone)]
pub struct FlowMetrics {
    registry: Registry,
    /// Flows initiated, by flow name.
    pub flows_started_total: IntCounterVec,
    /// Flows that ended with a notarised transaction, by flow name.
    pub flows_finalized_total: IntCounterVec,
    /// Flows that failed, by flow name and error class.
    pub flows_aborted_total: IntCounterVec,
    /// Wall-clock time from start to outcome, by flow name.
    pub flow_latency_seconds: HistogramVec,
}

impl FlowMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("accord".into()), None)?;

        let flows_started_total = IntCounterVec::new(
            Opts::new("flows_started_total", "Flows initiated by this node"),
            &["flow"],
        )?;
        registry.register(Box::new(flows_started_total.clone()))?;

        let flows_finalized_total = IntCounterVec::new(
            Opts::new(
                "flows_finalized_total",
                "Flows that ended with a notarised transaction",
            ),
            &["flow"],
        )?;
        registry.register(Box::new(flows_finalized_total.clone()))?;

        let flows_aborted_total = IntCounterVec::new(
            Opts::new("flows_aborted_total", "Flows that failed, by error class"),
            &["flow", "class"],
        )?;
        registry.register(Box::new(flows_aborted_total.clone()))?;

        let flow_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "flow_latency_seconds",
                "Flow latency from start to outcome in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ]),
            &["flow"],
        )?;
        registry.register(Box::new(flow_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            flows_started_total,
            flows_finalized_total,
            flows_aborted_total,
            flow_latency_seconds,
        })
    }

    /// Run one flow and record its outcome under `flow`.
    pub async fn observe<F>(&self, flow: &str, run: F) -> Result<FinalizedTransaction, FlowError>
    where
        F: Future<Output = Result<FinalizedTransaction, FlowError>>,
    {
        self.flows_started_total.with_label_values(&[flow]).inc();
        let started = Instant::now();
        let outcome = run.await;
        self.flow_latency_seconds
            .with_label_values(&[flow])
            .observe(started.elapsed().as_secs_f64());

        match &outcome {
            Ok(_) => self.flows_finalized_total.with_label_values(&[flow]).inc(),
            Err(e) => self
                .flows_aborted_total
                .with_label_values(&[flow, e.class().as_str()])
                .inc(),
        }
        outcome
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
