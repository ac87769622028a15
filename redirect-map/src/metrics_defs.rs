//! Metrics definitions for the map generator.

use shared::metrics_defs::{MetricDef, MetricType};

pub const GENERATE_DURATION: MetricDef = MetricDef {
    name: "generator.duration",
    metric_type: MetricType::Histogram,
    description: "Time to fetch content and write the redirect map, in seconds",
};

pub const RECORDS_SKIPPED: MetricDef = MetricDef {
    name: "generator.records.skipped",
    metric_type: MetricType::Counter,
    description: "Records dropped because they had no slug",
};

pub const ALIAS_ENTRIES: MetricDef = MetricDef {
    name: "generator.aliases",
    metric_type: MetricType::Gauge,
    description: "Entries in the last generated redirect map. Tagged with kind.",
};

pub const ALL_METRICS: &[MetricDef] = &[GENERATE_DURATION, RECORDS_SKIPPED, ALIAS_ENTRIES];
