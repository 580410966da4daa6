use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts};

lazy_static::lazy_static! {
    pub static ref RECONCILE_TOTAL: IntCounterVec = prometheus::register_int_counter_vec!(
        Opts::new(
            "argocd_operator_reconcile_total",
            "Total number of reconciliations"
        ),
        &["result"]
    )
    .unwrap();

    pub static ref RECONCILE_DURATION: HistogramVec = prometheus::register_histogram_vec!(
        HistogramOpts::new(
            "argocd_operator_reconcile_duration_seconds",
            "Duration of reconciliations in seconds"
        ),
        &[]
    )
    .unwrap();

    pub static ref RESOURCE_OPERATIONS_TOTAL: IntCounterVec = prometheus::register_int_counter_vec!(
        Opts::new(
            "argocd_operator_resource_operations_total",
            "Total number of create, update and delete calls on managed resources"
        ),
        &["kind", "operation"]
    )
    .unwrap();

    pub static ref MANAGED_INSTANCES: IntGaugeVec = prometheus::register_int_gauge_vec!(
        Opts::new(
            "argocd_operator_managed_instances",
            "Number of managed ArgoCD instances per namespace"
        ),
        &["namespace"]
    )
    .unwrap();
}

pub fn increment_reconcile_total(result: &str) {
    RECONCILE_TOTAL.with_label_values(&[result]).inc();
}

pub fn observe_reconcile_duration(duration_secs: f64) {
    RECONCILE_DURATION
        .with_label_values(&[] as &[&str])
        .observe(duration_secs);
}

pub fn increment_resource_operations(kind: &str, operation: &str) {
    RESOURCE_OPERATIONS_TOTAL
        .with_label_values(&[kind, operation])
        .inc();
}

pub fn set_managed_instances(namespace: &str, count: i64) {
    MANAGED_INSTANCES.with_label_values(&[namespace]).set(count);
}
