use crate::geo::distance_meters;
use crate::models::Coordinate;

/// Stasjonær GPS-drift holder seg typisk under denne grensen (meter).
pub const NOISE_THRESHOLD_M: f64 = 1.0;

/// Signal-vs-støy for innkommende posisjoner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleFilter {
    threshold_m: f64,
}

impl Default for SampleFilter {
    fn default() -> Self {
        Self { threshold_m: NOISE_THRESHOLD_M }
    }
}

impl SampleFilter {
    pub fn new(threshold_m: f64) -> Self {
        Self { threshold_m }
    }

    pub fn threshold_m(&self) -> f64 {
        self.threshold_m
    }

    /// First sample always passes; later ones must move strictly more than
    /// the threshold away from `last`. The caller updates `last` on `true`.
    pub fn accept(&self, last: Option<Coordinate>, candidate: Coordinate) -> bool {
        match last {
            None => true,
            Some(prev) => distance_meters(prev, candidate) > self.threshold_m,
        }
    }
}
