//! Reload outcome counters, tagged by resource and status. With no metrics
//! recorder installed these are no-ops; behavior never depends on them.

pub(crate) const STATUS_SUCCESS: &str = "success";
pub(crate) const STATUS_REDIS_ERROR: &str = "redis_error";
pub(crate) const STATUS_LOAD_ERROR: &str = "load_error";

pub(crate) fn inc(metric: &str, resource: &str, status: &'static str) {
    metrics::counter!(
        metric.to_string(),
        "resource" => resource.to_string(),
        "status" => status,
    )
    .increment(1);
}
