use std::sync::Arc;

use prometheus::{Counter, Encoder, Registry, TextEncoder};

/// Request-level counters exported on `/metrics`.
#[derive(Clone)]
pub struct ServiceMetrics {
    registry: Arc<Registry>,
    queries_created: Counter,
    queries_read: Counter,
    request_errors: Counter,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let queries_created = Counter::with_opts(prometheus::Opts::new(
            "history_queries_created_total",
            "Query records fetched from a coordinator and stored",
        ))
        .unwrap();

        let queries_read = Counter::with_opts(prometheus::Opts::new(
            "history_queries_read_total",
            "Query records served from storage",
        ))
        .unwrap();

        let request_errors = Counter::with_opts(prometheus::Opts::new(
            "history_request_errors_total",
            "Requests that ended in an error response",
        ))
        .unwrap();

        registry.register(Box::new(queries_created.clone())).unwrap();
        registry.register(Box::new(queries_read.clone())).unwrap();
        registry.register(Box::new(request_errors.clone())).unwrap();

        Self {
            registry: Arc::new(registry),
            queries_created,
            queries_read,
            request_errors,
        }
    }

    pub fn record_created(&self) {
        self.queries_created.inc();
    }

    pub fn record_read(&self) {
        self.queries_read.inc();
    }

    pub fn record_error(&self) {
        self.request_errors.inc();
    }

    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}
