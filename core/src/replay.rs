use serde::Deserialize;
use serde_path_to_error as spte;

use crate::config::TrackerConfig;
use crate::error::{TrackError, TrackResult};
use crate::history::{DiscardHistory, RunHistory};
use crate::models::{PositionSample, Run};
use crate::session::SessionController;

/// Innputt for avspilling: enten en ren liste med samples eller et objekt
/// med valgfri konfig.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TrackIn {
    Object {
        samples: Vec<PositionSample>,
        #[serde(default)]
        config: Option<TrackerConfig>,
    },
    Bare(Vec<PositionSample>),
}

/// Parse a recorded track. Returns the samples and, when the document
/// carried one, its config.
pub fn parse_track_json(
    json_str: &str,
) -> TrackResult<(Vec<PositionSample>, Option<TrackerConfig>)> {
    let de = &mut serde_json::Deserializer::from_str(json_str);
    let parsed: TrackIn = spte::deserialize(de).map_err(|e| {
        let path = e.path().to_string();
        TrackError::Config(format!("parse error (track) at {}: {}", path, e.inner()))
    })?;
    Ok(match parsed {
        TrackIn::Object { samples, config } => (samples, config),
        TrackIn::Bare(samples) => (samples, None),
    })
}

/// Drive a fresh controller through a recorded track and stop it.
///
/// Ticks are synthesized from the timestamps: before each sample, one tick per
/// whole second elapsed since the first sample is applied, so a sample at
/// t = 5.4 s sees `elapsed_s == 5`. Timestamps must be non-decreasing, and
/// no gap between consecutive samples may exceed `config.max_tick_gap_s`.
pub fn replay_track(
    samples: &[PositionSample],
    config: &TrackerConfig,
    history: Box<dyn RunHistory>,
) -> TrackResult<Run> {
    let first = samples.first().ok_or(TrackError::EmptyTrack)?;
    let t0 = first.timestamp;

    let mut controller = SessionController::new(config, history)?;
    controller.start_at(t0)?;

    let mut ticks: i64 = 0;
    let mut prev = t0;
    for (index, sample) in samples.iter().enumerate() {
        if sample.timestamp < prev {
            return Err(TrackError::NonMonotonicTimestamp { index });
        }
        prev = sample.timestamp;

        let whole_secs = (sample.timestamp - t0).num_seconds();
        let gap_s = whole_secs - ticks;
        if gap_s > 0 && gap_s as u64 > config.max_tick_gap_s {
            return Err(TrackError::TrackGap {
                index,
                gap_s,
                max_s: config.max_tick_gap_s,
            });
        }
        while ticks < whole_secs {
            controller.on_tick();
            ticks += 1;
        }
        controller.on_sample(*sample);
    }

    log::debug!("replayed {} samples over {}s", samples.len(), ticks);
    // stop fra Running gir alltid en Run
    controller.stop().ok_or(TrackError::InvalidTransition {
        from: controller.state(),
        event: "stop",
    })
}

/// Convenience for bindings and the CLI: JSON in, run JSON out.
pub fn replay_track_json(json_str: &str) -> TrackResult<String> {
    let (samples, config) = parse_track_json(json_str)?;
    let config = config.unwrap_or_default();
    config.validate()?;
    let run = replay_track(&samples, &config, Box::new(DiscardHistory))?;
    Ok(run.to_json()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinate;
    use chrono::{Duration, TimeZone, Utc};

    const M_PER_DEG: f64 = 111_194.926_644_558_73;

    fn sample(secs_ms: i64, north_m: f64) -> PositionSample {
        let t0 = Utc.with_ymd_and_hms(2024, 12, 11, 7, 0, 0).single().unwrap();
        PositionSample::new(
            Coordinate::new(north_m / M_PER_DEG, 0.0),
            t0 + Duration::milliseconds(secs_ms),
        )
    }

    fn replay(track: &[PositionSample], config: &TrackerConfig) -> TrackResult<Run> {
        replay_track(track, config, Box::new(DiscardHistory))
    }

    #[test]
    fn ticks_follow_whole_seconds() {
        let track = vec![sample(0, 0.0), sample(5_400, 20.0), sample(10_000, 40.0)];
        let run = replay(&track, &TrackerConfig::default()).unwrap();
        assert_eq!(run.elapsed_s(), 10.0);
        assert!((run.total_distance_m() - 40.0).abs() < 1e-6);
        assert_eq!(run.route().len(), 3);
        assert_eq!(run.started_at(), track[0].timestamp);
    }

    #[test]
    fn going_back_in_time_is_rejected() {
        let track = vec![sample(0, 0.0), sample(2_000, 10.0), sample(1_000, 20.0)];
        let err = replay(&track, &TrackerConfig::default()).unwrap_err();
        assert!(matches!(err, TrackError::NonMonotonicTimestamp { index: 2 }));
    }

    #[test]
    fn oversized_gap_is_rejected() {
        let two_days_ms = 2 * 86_400 * 1_000;
        let track = vec![sample(0, 0.0), sample(1_000, 10.0), sample(two_days_ms, 20.0)];
        let err = replay(&track, &TrackerConfig::default()).unwrap_err();
        assert!(
            matches!(err, TrackError::TrackGap { index: 2, gap_s: 172_799, max_s: 86_400 }),
            "{err:?}"
        );

        let strict = TrackerConfig {
            max_tick_gap_s: 30,
            ..TrackerConfig::default()
        };
        let track = vec![sample(0, 0.0), sample(30_000, 10.0), sample(61_000, 20.0)];
        let err = replay(&track, &strict).unwrap_err();
        assert!(matches!(err, TrackError::TrackGap { index: 2, gap_s: 31, max_s: 30 }));

        // akkurat på grensen går fint
        let run = replay(&track[..2], &strict).unwrap();
        assert_eq!(run.elapsed_s(), 30.0);
    }

    #[test]
    fn empty_track() {
        let err = replay(&[], &TrackerConfig::default()).unwrap_err();
        assert!(matches!(err, TrackError::EmptyTrack));
    }

    #[test]
    fn json_object_and_bare_forms() {
        let bare = r#"[
            {
                "coordinate": {"latitude": 0.0, "longitude": 0.0},
                "timestamp": "2024-12-11T07:00:00Z"
            },
            {
                "coordinate": {"latitude": 0.001, "longitude": 0.0},
                "timestamp": "2024-12-11T07:00:30Z",
                "speed": 3.7
            }
        ]"#;
        let (samples, cfg) = parse_track_json(bare).unwrap();
        assert_eq!(samples.len(), 2);
        assert!(cfg.is_none());
        assert_eq!(samples[1].reported_speed, Some(3.7));

        let obj = format!(r#"{{"samples": {bare}, "config": {{"noise_threshold_m": 5.0}}}}"#);
        let (_, cfg) = parse_track_json(&obj).unwrap();
        assert_eq!(cfg.unwrap().noise_threshold_m, 5.0);

        let out = replay_track_json(&obj).unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["elapsed_s"], 30.0);
        assert!(v["total_distance_m"].as_f64().unwrap() > 100.0);
    }
}
