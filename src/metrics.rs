//! Prometheus metrics for the CAT relayer
//!
//! Exposes metrics on /metrics endpoint for Prometheus scraping.

#![allow(dead_code)]

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, CounterVec, Gauge, GaugeVec,
};

lazy_static! {
    // Tracker metrics
    pub static ref SCANNED_BLOCK: GaugeVec = register_gauge_vec!(
        "relayer_scanned_block",
        "Watermark block per chain and scan purpose",
        &["chain", "scan"]
    ).unwrap();

    pub static ref DEPLOYMENTS_INITIATED: CounterVec = register_counter_vec!(
        "relayer_deployments_initiated_total",
        "Deployment initiation events tracked",
        &["kind", "chain"]
    ).unwrap();

    pub static ref BRIDGES_INITIATED: CounterVec = register_counter_vec!(
        "relayer_bridges_initiated_total",
        "Bridge initiation events tracked",
        &["kind", "chain"]
    ).unwrap();

    // Executor metrics
    pub static ref DEPLOYMENTS_EXECUTED: CounterVec = register_counter_vec!(
        "relayer_deployments_executed_total",
        "Deployment attempts by outcome",
        &["kind", "status"]
    ).unwrap();

    pub static ref BRIDGES_EXECUTED: CounterVec = register_counter_vec!(
        "relayer_bridges_executed_total",
        "Bridge completion attempts by outcome",
        &["kind", "status"]
    ).unwrap();

    // Error metrics
    pub static ref ERRORS: CounterVec = register_counter_vec!(
        "relayer_errors_total",
        "Total number of errors",
        &["component", "class"]
    ).unwrap();

    // Health metrics
    pub static ref UP: Gauge = register_gauge!(
        "relayer_up",
        "Whether the relayer is up and running"
    ).unwrap();
}

/// Record a committed scan window
pub fn record_scanned_block(chain: &str, scan: &str, block: u64) {
    SCANNED_BLOCK
        .with_label_values(&[chain, scan])
        .set(block as f64);
}

/// Record a tracked deployment initiation
pub fn record_deployment_initiated(kind: &str, chain: &str) {
    DEPLOYMENTS_INITIATED.with_label_values(&[kind, chain]).inc();
}

/// Record a tracked bridge initiation
pub fn record_bridge_initiated(kind: &str, chain: &str) {
    BRIDGES_INITIATED.with_label_values(&[kind, chain]).inc();
}

/// Record a deployment attempt
pub fn record_deployment(kind: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    DEPLOYMENTS_EXECUTED.with_label_values(&[kind, status]).inc();
}

/// Record a bridge completion attempt
pub fn record_bridge(kind: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    BRIDGES_EXECUTED.with_label_values(&[kind, status]).inc();
}

/// Record an error
pub fn record_error(component: &str, class: &str) {
    ERRORS.with_label_values(&[component, class]).inc();
}
