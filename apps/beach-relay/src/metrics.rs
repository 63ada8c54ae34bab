use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

pub static BOOT_COUNTER: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::with_opts(Opts::new("relay_boot_total", "relay process boots")).unwrap();
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static OPERATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    let c = IntCounterVec::new(
        Opts::new(
            "relay_operations_total",
            "signaling operations by operation and outcome",
        ),
        &["operation", "outcome"],
    )
    .unwrap();
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static STORE_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    let c = IntCounterVec::new(
        Opts::new(
            "relay_store_errors_total",
            "store failures surfaced as server errors, by operation",
        ),
        &["operation"],
    )
    .unwrap();
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static ROOMS_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::with_opts(Opts::new("relay_rooms_created_total", "rooms created"))
        .unwrap();
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub fn record_operation(operation: &str, outcome: &str) {
    OPERATIONS.with_label_values(&[operation, outcome]).inc();
}

pub fn gather() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %err, "metrics encode error");
    }
    buffer
}
