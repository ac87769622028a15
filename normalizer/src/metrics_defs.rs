//! Metrics definitions for the normalizer.

use shared::metrics_defs::{MetricDef, MetricType};

pub const REDIRECTS: MetricDef = MetricDef {
    name: "normalizer.redirects",
    metric_type: MetricType::Counter,
    description: "Permanent redirects issued. Tagged with rule.",
};

pub const PASS_THROUGH: MetricDef = MetricDef {
    name: "normalizer.pass_through",
    metric_type: MetricType::Counter,
    description: "Requests forwarded to the content application unchanged",
};

pub const UPSTREAM_ERRORS: MetricDef = MetricDef {
    name: "normalizer.upstream.errors",
    metric_type: MetricType::Counter,
    description: "Forwarded requests that failed or timed out",
};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "normalizer.request.duration",
    metric_type: MetricType::Histogram,
    description: "Time to answer a request in seconds, forwarding included",
};

pub const ALL_METRICS: &[MetricDef] = &[REDIRECTS, PASS_THROUGH, UPSTREAM_ERRORS, REQUEST_DURATION];
