//! Metrics definitions for the provisioner.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Histogram,
}

#[derive(Debug, Clone, Copy)]
pub struct MetricDef {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub description: &'static str,
}

pub const REQUESTS: MetricDef = MetricDef {
    name: "provision.requests",
    metric_type: MetricType::Counter,
    description: "Inbound requests, tagged by outcome",
};

pub const FAILURES: MetricDef = MetricDef {
    name: "provision.failures",
    metric_type: MetricType::Counter,
    description: "Orchestration failures, tagged by the stage that failed",
};

pub const DURATION: MetricDef = MetricDef {
    name: "provision.duration",
    metric_type: MetricType::Histogram,
    description: "Time from token exchange to finished range update in seconds",
};

pub const POLL_ATTEMPTS: MetricDef = MetricDef {
    name: "provision.poll_attempts",
    metric_type: MetricType::Histogram,
    description: "Number of searches issued before the copy became visible",
};

pub const ALL_METRICS: &[MetricDef] = &[REQUESTS, FAILURES, DURATION, POLL_ATTEMPTS];

/// Registers descriptions with the installed recorder.
pub fn describe_all() {
    for def in ALL_METRICS {
        match def.metric_type {
            MetricType::Counter => metrics::describe_counter!(def.name, def.description),
            MetricType::Histogram => metrics::describe_histogram!(def.name, def.description),
        }
    }
}
