//! Prometheus metrics & middleware helper.

use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use once_cell::sync::Lazy;
use prometheus::{IntCounterVec, Opts};

/// Engine operations applied, labelled by kind.
pub static ENGINE_OPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("engine_ops_total", "Applied game engine operations"),
        &["kind"],
    )
    .expect("engine_ops metric")
});

/// Global Prometheus handle; also exports [`ENGINE_OPS`].
pub static METRICS: Lazy<PrometheusMetrics> = Lazy::new(|| {
    let metrics = PrometheusMetricsBuilder::new("api")
        .endpoint("/metrics") // exposed URL
        .build()
        .expect("metrics builder");
    metrics
        .registry
        .register(Box::new(ENGINE_OPS.clone()))
        .expect("register engine_ops");
    metrics
});

pub fn record_op(kind: &str) {
    ENGINE_OPS.with_label_values(&[kind]).inc();
}
