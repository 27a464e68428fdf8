//! Prometheus metrics for the service module.
//!
//! Metrics are fed from committed events only, so a rejected command never
//! moves a gauge. They are node-local and never part of replicated state.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::error::ServiceError;
use crate::events::ServiceEvent;

/// Metrics registry and definitions for the service keeper.
pub struct ServiceMetrics {
    /// The Prometheus registry containing all metrics.
    pub registry: Registry,

    /// Requests currently awaiting a response.
    pub active_requests: IntGauge,

    /// Requests that timed out without a response.
    pub expired_requests_total: IntCounter,

    /// Responses accepted, by result class (`ok` / `error`).
    pub responses_total: IntCounterVec,

    /// Events emitted, by kind.
    pub events_total: IntCounterVec,

    /// Rejected commands, by error label.
    pub rejected_commands_total: IntCounterVec,
}

impl ServiceMetrics {
    /// Create a new metrics set with every metric registered.
    pub fn new() -> Self {
        let registry = Registry::new();

        let active_requests = IntGauge::with_opts(Opts::new(
            "conduit_service_active_requests",
            "Requests awaiting a response",
        ))
        .expect("metric creation should not fail");

        let expired_requests_total = IntCounter::with_opts(Opts::new(
            "conduit_service_expired_requests_total",
            "Requests that timed out",
        ))
        .expect("metric creation should not fail");

        let responses_total = IntCounterVec::new(
            Opts::new("conduit_service_responses_total", "Responses accepted"),
            &["result"],
        )
        .expect("metric creation should not fail");

        let events_total = IntCounterVec::new(
            Opts::new("conduit_service_events_total", "Service events emitted"),
            &["kind"],
        )
        .expect("metric creation should not fail");

        let rejected_commands_total = IntCounterVec::new(
            Opts::new(
                "conduit_service_rejected_commands_total",
                "Commands rejected by the keeper",
            ),
            &["error"],
        )
        .expect("metric creation should not fail");

        registry
            .register(Box::new(active_requests.clone()))
            .expect("registration should not fail");
        registry
            .register(Box::new(expired_requests_total.clone()))
            .expect("registration should not fail");
        registry
            .register(Box::new(responses_total.clone()))
            .expect("registration should not fail");
        registry
            .register(Box::new(events_total.clone()))
            .expect("registration should not fail");
        registry
            .register(Box::new(rejected_commands_total.clone()))
            .expect("registration should not fail");

        Self {
            registry,
            active_requests,
            expired_requests_total,
            responses_total,
            events_total,
            rejected_commands_total,
        }
    }

    /// Update metrics from committed events.
    pub fn observe(&self, events: &[ServiceEvent]) {
        for event in events {
            self.events_total.with_label_values(&[event.kind()]).inc();
            match event {
                ServiceEvent::NewRequest { .. } => self.active_requests.inc(),
                ServiceEvent::RequestExpired { .. } => {
                    self.active_requests.dec();
                    self.expired_requests_total.inc();
                }
                ServiceEvent::RequestAbandoned { .. } => self.active_requests.dec(),
                ServiceEvent::ResponseReceived { code, .. } => {
                    self.active_requests.dec();
                    let class = if *code == conduit_types::constants::RESULT_CODE_OK {
                        "ok"
                    } else {
                        "error"
                    };
                    self.responses_total.with_label_values(&[class]).inc();
                }
                _ => {}
            }
        }
    }

    /// Count a rejected command.
    pub fn record_rejection(&self, error: &ServiceError) {
        self.rejected_commands_total
            .with_label_values(&[error.metric_label()])
            .inc();
    }

    /// Encode all metrics in Prometheus text format.
    pub fn encode(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .expect("encoding should not fail");
        String::from_utf8(buffer).expect("metrics are valid utf8")
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_crypto::{module_address, tagged_hash, DOMAIN_REQUEST_CONTEXT};
    use conduit_types::{Coins, RequestId};

    fn request_id() -> RequestId {
        RequestId {
            context_id: tagged_hash(DOMAIN_REQUEST_CONTEXT, &[b"m"]),
            batch_counter: 1,
            request_height: 1,
            index: 0,
        }
    }

    #[test]
    fn test_active_request_gauge() {
        let metrics = ServiceMetrics::new();
        let id = request_id();
        let provider = module_address("p");
        metrics.observe(&[
            ServiceEvent::NewRequest {
                request_id: id,
                context_id: id.context_id,
                provider,
                service_fee: Coins::new(),
                expiration_height: 5,
            },
            ServiceEvent::NewRequest {
                request_id: id,
                context_id: id.context_id,
                provider,
                service_fee: Coins::new(),
                expiration_height: 5,
            },
        ]);
        assert_eq!(metrics.active_requests.get(), 2);

        metrics.observe(&[
            ServiceEvent::RequestExpired {
                request_id: id,
                provider,
            },
            ServiceEvent::ResponseReceived {
                request_id: id,
                provider,
                code: 200,
            },
        ]);
        assert_eq!(metrics.active_requests.get(), 0);
        assert_eq!(metrics.expired_requests_total.get(), 1);
        assert_eq!(metrics.responses_total.with_label_values(&["ok"]).get(), 1);
    }

    #[test]
    fn test_encode_contains_metric_names() {
        let metrics = ServiceMetrics::new();
        metrics.record_rejection(&ServiceError::NoDeposit);
        let text = metrics.encode();
        assert!(text.contains("conduit_service_active_requests"));
        assert!(text.contains("no_deposit"));
    }
}
