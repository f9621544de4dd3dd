use crate::filter::SampleFilter;
use crate::geo::{distance_meters, pace_seconds_per_km};
use crate::models::{Coordinate, MetricsSnapshot};

/// What happened to a candidate passed to `on_sample`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleOutcome {
    /// First accepted sample of the session; no distance contributed.
    Seeded,
    Accepted { delta_m: f64 },
    Rejected,
}

impl SampleOutcome {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, SampleOutcome::Rejected)
    }
}

/// Kumulativ distanse, tid og pace for én økt.
///
/// Pace-ankeret er i akkumulerte sekunder (ticks), ikke veggklokke, slik at
/// ujevn tick-levering ikke gir hopp i pace.
#[derive(Debug, Clone, Default)]
pub struct MetricsAccumulator {
    filter: SampleFilter,
    total_distance_m: f64,
    elapsed_s: f64,
    last_accepted: Option<Coordinate>,
    pace_anchor_s: Option<f64>,
    // distanse siden ankeret som ennå ikke er brukt i en pace-beregning
    distance_since_anchor_m: f64,
    current_pace_s_per_km: Option<f64>,
    average_pace_s_per_km: Option<f64>,
}

impl MetricsAccumulator {
    pub fn new(filter: SampleFilter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    pub fn on_sample(&mut self, candidate: Coordinate) -> SampleOutcome {
        if !self.filter.accept(self.last_accepted, candidate) {
            return SampleOutcome::Rejected;
        }

        let Some(prev) = self.last_accepted else {
            self.last_accepted = Some(candidate);
            self.pace_anchor_s = Some(self.elapsed_s);
            return SampleOutcome::Seeded;
        };

        let delta_m = distance_meters(prev, candidate);
        self.total_distance_m += delta_m;
        self.distance_since_anchor_m += delta_m;
        self.last_accepted = Some(candidate);

        let anchor = self.pace_anchor_s.unwrap_or(self.elapsed_s);
        let dt = self.elapsed_s - anchor;
        // Samme sekund som forrige anker: ta med distansen til neste beregning
        if dt > 0.0 {
            self.current_pace_s_per_km = pace_seconds_per_km(self.distance_since_anchor_m, dt);
            self.pace_anchor_s = Some(self.elapsed_s);
            self.distance_since_anchor_m = 0.0;
        }

        SampleOutcome::Accepted { delta_m }
    }

    pub fn on_tick(&mut self) {
        self.elapsed_s += 1.0;
        self.average_pace_s_per_km = pace_seconds_per_km(self.total_distance_m, self.elapsed_s);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_distance_m: self.total_distance_m,
            elapsed_s: self.elapsed_s,
            current_pace_s_per_km: self.current_pace_s_per_km,
            average_pace_s_per_km: self.average_pace_s_per_km,
        }
    }

    /// Nullstill alt unntatt filteret. Kalles ved start fra Idle, ikke ved resume.
    pub fn reset(&mut self) {
        *self = Self::new(self.filter);
    }

    pub fn last_accepted(&self) -> Option<Coordinate> {
        self.last_accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const M_PER_DEG: f64 = 111_194.926_644_558_73;

    fn north_of_equator(m: f64) -> Coordinate {
        Coordinate::new(m / M_PER_DEG, 0.0)
    }

    #[test]
    fn first_sample_seeds_without_distance() {
        let mut acc = MetricsAccumulator::default();
        assert_eq!(acc.on_sample(north_of_equator(0.0)), SampleOutcome::Seeded);
        let s = acc.snapshot();
        assert_eq!(s.total_distance_m, 0.0);
        assert_eq!(s.current_pace_s_per_km, None);
    }

    #[test]
    fn current_pace_uses_delta_since_last_anchor() {
        let mut acc = MetricsAccumulator::default();
        acc.on_sample(north_of_equator(0.0));
        for _ in 0..10 {
            acc.on_tick();
        }
        acc.on_sample(north_of_equator(100.0));
        // 10 s / 0.1 km
        let p = acc.snapshot().current_pace_s_per_km.unwrap();
        assert!((p - 100.0).abs() < 1e-6, "p={p}");

        for _ in 0..20 {
            acc.on_tick();
        }
        acc.on_sample(north_of_equator(200.0));
        // 20 s / 0.1 km, ikke snitt siden start
        let p = acc.snapshot().current_pace_s_per_km.unwrap();
        assert!((p - 200.0).abs() < 1e-6, "p={p}");
    }

    #[test]
    fn same_second_samples_carry_distance_forward() {
        let mut acc = MetricsAccumulator::default();
        acc.on_sample(north_of_equator(0.0));
        acc.on_tick();
        acc.on_sample(north_of_equator(5.0));
        acc.on_sample(north_of_equator(10.0)); // dt = 0
        assert!((acc.snapshot().current_pace_s_per_km.unwrap() - 200.0).abs() < 1e-6);
        acc.on_tick();
        acc.on_sample(north_of_equator(20.0));
        // 5 m overført + 10 m, på 1 s
        let p = acc.snapshot().current_pace_s_per_km.unwrap();
        assert!((p - 1000.0 / 15.0).abs() < 1e-6, "p={p}");
    }

    #[test]
    fn zero_dt_before_first_tick_keeps_pace_undefined() {
        let mut acc = MetricsAccumulator::default();
        acc.on_sample(north_of_equator(0.0));
        acc.on_sample(north_of_equator(50.0));
        let s = acc.snapshot();
        assert!((s.total_distance_m - 50.0).abs() < 1e-6);
        assert_eq!(s.current_pace_s_per_km, None);
    }

    #[test]
    fn tick_updates_average_pace() {
        let mut acc = MetricsAccumulator::default();
        acc.on_tick();
        assert_eq!(acc.snapshot().average_pace_s_per_km, None);
        acc.on_sample(north_of_equator(0.0));
        acc.on_sample(north_of_equator(500.0));
        acc.on_tick();
        let avg = acc.snapshot().average_pace_s_per_km.unwrap();
        assert!((avg - 4.0).abs() < 1e-6, "avg={avg}");
    }

    #[test]
    fn reset_keeps_filter_threshold() {
        let mut acc = MetricsAccumulator::new(SampleFilter::new(10.0));
        acc.on_sample(north_of_equator(0.0));
        acc.on_tick();
        acc.reset();
        assert_eq!(acc.snapshot(), MetricsSnapshot::default());
        assert_eq!(acc.last_accepted(), None);
        acc.on_sample(north_of_equator(0.0));
        assert_eq!(acc.on_sample(north_of_equator(5.0)), SampleOutcome::Rejected);
    }
}
