use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_path_to_error as spte;

use crate::error::{TrackError, TrackResult};
use crate::filter::{SampleFilter, NOISE_THRESHOLD_M};

/// Ett døgn.
pub const DEFAULT_MAX_TICK_GAP_S: u64 = 86_400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// Minsteavstand (m) mellom aksepterte posisjoner.
    #[serde(alias = "noise_threshold", alias = "noiseThresholdM")]
    pub noise_threshold_m: f64,
    /// Periode for tick-kilden. Hver tick teller som nøyaktig ett sekund uansett.
    #[serde(alias = "tickIntervalMs")]
    pub tick_interval_ms: u64,
    /// Største hull (hele sekunder) mellom to punkter som avspilling godtar.
    #[serde(alias = "maxTickGapS")]
    pub max_tick_gap_s: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            noise_threshold_m: NOISE_THRESHOLD_M,
            tick_interval_ms: 1000,
            max_tick_gap_s: DEFAULT_MAX_TICK_GAP_S,
        }
    }
}

impl TrackerConfig {
    /// Parse JSON; errors carry the failing field path.
    pub fn from_json(json_str: &str) -> TrackResult<Self> {
        let de = &mut serde_json::Deserializer::from_str(json_str);
        let cfg: TrackerConfig = spte::deserialize(de).map_err(|e| {
            let path = e.path().to_string();
            TrackError::Config(format!("parse error at {}: {}", path, e.inner()))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> TrackResult<()> {
        if !self.noise_threshold_m.is_finite() || self.noise_threshold_m < 0.0 {
            return Err(TrackError::Config(format!(
                "noise_threshold_m must be a finite value >= 0, got {}",
                self.noise_threshold_m
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(TrackError::Config("tick_interval_ms must be > 0".into()));
        }
        if self.max_tick_gap_s == 0 {
            return Err(TrackError::Config("max_tick_gap_s must be > 0".into()));
        }
        Ok(())
    }

    pub fn filter(&self) -> SampleFilter {
        SampleFilter::new(self.noise_threshold_m)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Leser konfig fra disk (JSON). Mangler filen, brukes default.
pub fn load_config<P: AsRef<Path>>(path: P) -> TrackResult<TrackerConfig> {
    let path = path.as_ref();
    if path.exists() {
        let contents = std::fs::read_to_string(path)?;
        let cfg = TrackerConfig::from_json(&contents)?;
        log::info!(
            "config loaded from {} (noise_threshold_m={}, tick_interval_ms={})",
            path.display(),
            cfg.noise_threshold_m,
            cfg.tick_interval_ms
        );
        Ok(cfg)
    } else {
        log::warn!("no config at {}, using defaults", path.display());
        Ok(TrackerConfig::default())
    }
}
