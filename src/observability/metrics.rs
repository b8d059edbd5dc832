use prometheus::{Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub alerts_emitted_total: IntCounter,
    pub evaluation_cycles_total: IntCounterVec,
    pub evaluation_latency_seconds: HistogramVec,
    pub open_requests: IntGauge,
    pub active_subscriptions: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let alerts_emitted_total = IntCounter::new(
            "alerts_emitted_total",
            "Total proximity alerts delivered to the notification sink",
        )
        .expect("valid alerts_emitted_total metric");

        let evaluation_cycles_total = IntCounterVec::new(
            Opts::new(
                "evaluation_cycles_total",
                "Evaluation cycles by outcome (success, skipped)",
            ),
            &["outcome"],
        )
        .expect("valid evaluation_cycles_total metric");

        let evaluation_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "evaluation_latency_seconds",
                "Latency of one evaluation cycle in seconds",
            ),
            &["outcome"],
        )
        .expect("valid evaluation_latency_seconds metric");

        let open_requests = IntGauge::new("open_requests", "Current number of open hitchhike requests")
            .expect("valid open_requests metric");

        let active_subscriptions =
            IntGauge::new("active_subscriptions", "Currently running proximity subscriptions")
                .expect("valid active_subscriptions metric");

        registry
            .register(Box::new(alerts_emitted_total.clone()))
            .expect("register alerts_emitted_total");
        registry
            .register(Box::new(evaluation_cycles_total.clone()))
            .expect("register evaluation_cycles_total");
        registry
            .register(Box::new(evaluation_latency_seconds.clone()))
            .expect("register evaluation_latency_seconds");
        registry
            .register(Box::new(open_requests.clone()))
            .expect("register open_requests");
        registry
            .register(Box::new(active_subscriptions.clone()))
            .expect("register active_subscriptions");

        Self {
            registry,
            alerts_emitted_total,
            evaluation_cycles_total,
            evaluation_latency_seconds,
            open_requests,
            active_subscriptions,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
