use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};

/// Tellere per økt. Eget `Registry` per kontroller, så ingen global tilstand
/// deles mellom økter.
#[derive(Clone)]
pub struct Telemetry {
    registry: Registry,
    pub samples_accepted: IntCounter,
    pub samples_rejected: IntCounter,
    pub samples_ignored: IntCounter,
    pub samples_invalid: IntCounter,
    pub ticks_applied: IntCounter,
    pub runs_finalized: IntCounter,
}

fn counter(registry: &Registry, name: &str, help: &str) -> prometheus::Result<IntCounter> {
    let c = IntCounter::with_opts(Opts::new(name, help).namespace("runtrack"))?;
    registry.register(Box::new(c.clone()))?;
    Ok(c)
}

impl Telemetry {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        Ok(Self {
            samples_accepted: counter(
                &registry,
                "samples_accepted_total",
                "Samples that moved the metrics",
            )?,
            samples_rejected: counter(
                &registry,
                "samples_rejected_total",
                "Samples rejected as GPS noise",
            )?,
            samples_ignored: counter(
                &registry,
                "samples_ignored_total",
                "Samples delivered while not running",
            )?,
            samples_invalid: counter(
                &registry,
                "samples_invalid_total",
                "Samples with unusable coordinates",
            )?,
            ticks_applied: counter(
                &registry,
                "ticks_applied_total",
                "Ticks applied to elapsed time",
            )?,
            runs_finalized: counter(&registry, "runs_finalized_total", "Runs handed to history")?,
            registry,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Prometheus tekstformat.
    pub fn gather_text(&self) -> String {
        let mut buf = Vec::new();
        let families = self.registry.gather();
        if let Err(e) = TextEncoder::new().encode(&families, &mut buf) {
            log::warn!("telemetry encode failed: {e}");
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("samples_accepted", &self.samples_accepted.get())
            .field("samples_rejected", &self.samples_rejected.get())
            .field("ticks_applied", &self.ticks_applied.get())
            .field("runs_finalized", &self.runs_finalized.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_text_output() {
        let t = Telemetry::new().unwrap();
        t.ticks_applied.inc();
        t.ticks_applied.inc();
        let text = t.gather_text();
        assert!(text.contains("runtrack_ticks_applied_total 2"), "{text}");
    }

    #[test]
    fn instances_do_not_share_counts() {
        let a = Telemetry::new().unwrap();
        let b = Telemetry::new().unwrap();
        a.samples_accepted.inc();
        assert_eq!(a.samples_accepted.get(), 1);
        assert_eq!(b.samples_accepted.get(), 0);
    }
}
