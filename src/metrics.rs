//! Ambient observability: counters and gauges for the events this core's
//! components produce, in the style of `cascade::metrics`.

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

/// The counters and gauges this crate exposes. Construct one, register
/// it into a [`Registry`] with [`Metrics::register`], and update the
/// fields directly from the call sites in [`crate::pipeline`],
/// [`crate::transfer`], and [`crate::timers`].
#[derive(Clone, Default)]
pub struct Metrics {
    /// Total changesets appended to any zone's journal.
    pub journal_appends: Counter,
    /// Total times a journal append was rejected with `Busy`.
    pub journal_busy: Counter,
    /// Total changesets successfully applied by the pipeline.
    pub pipeline_applied: Counter,
    /// Total changesets rejected by the pipeline.
    pub pipeline_rejected: Counter,
    /// Total transfer attempts that retrieved new data.
    pub transfers_updated: Counter,
    /// Total transfer attempts that found no new data.
    pub transfers_up_to_date: Counter,
    /// Total transfer attempts that failed.
    pub transfers_failed: Counter,
    /// Total times a zone's contents were taken offline after EXPIRE.
    pub zones_expired: Counter,
    /// Number of zones currently served.
    pub zones_served: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every metric under `namespace` into `registry`.
    pub fn register(&self, registry: &mut Registry) {
        let mut sub = registry.sub_registry_with_prefix("zonecore");
        sub.register(
            "journal_appends",
            "Changesets appended to a zone journal",
            self.journal_appends.clone(),
        );
        sub.register(
            "journal_busy",
            "Journal appends rejected because the journal was full",
            self.journal_busy.clone(),
        );
        sub.register(
            "pipeline_applied",
            "Changesets successfully applied",
            self.pipeline_applied.clone(),
        );
        sub.register(
            "pipeline_rejected",
            "Changesets rejected by the update pipeline",
            self.pipeline_rejected.clone(),
        );
        sub.register(
            "transfers_updated",
            "Transfer attempts that retrieved new data",
            self.transfers_updated.clone(),
        );
        sub.register(
            "transfers_up_to_date",
            "Transfer attempts that found no new data",
            self.transfers_up_to_date.clone(),
        );
        sub.register(
            "transfers_failed",
            "Transfer attempts that failed",
            self.transfers_failed.clone(),
        );
        sub.register(
            "zones_expired",
            "Zones taken offline after their SOA EXPIRE elapsed",
            self.zones_expired.clone(),
        );
        sub.register("zones_served", "Zones currently served", self.zones_served.clone());
    }

    /// Render every registered metric in Prometheus text exposition
    /// format, for a `/metrics` endpoint served by the caller.
    pub fn encode_text(registry: &Registry) -> Result<String, std::fmt::Error> {
        let mut buf = String::new();
        encode(&mut buf, registry)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_register_without_panicking() {
        let metrics = Metrics::new();
        let mut registry = Registry::default();
        metrics.register(&mut registry);
        metrics.pipeline_applied.inc();
        let text = Metrics::encode_text(&registry).unwrap();
        assert!(text.contains("zonecore_pipeline_applied"));
    }
}
