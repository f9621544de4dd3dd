use thiserror::Error;

use crate::models::SessionState;

/// Errors from the tracking core. Every operation is local and synchronous,
/// so nothing here is retried.
#[derive(Debug, Error)]
pub enum TrackError {
    /// Negative or non-finite duration passed to a clock formatter.
    #[error("invalid duration: {0}")]
    InvalidDuration(f64),

    /// Sessions are single-use; `start` after `stop` lands here.
    #[error("invalid transition: {event} from {from:?}")]
    InvalidTransition {
        from: SessionState,
        event: &'static str,
    },

    #[error("track sample {index} goes back in time")]
    NonMonotonicTimestamp { index: usize },

    /// Replay refuses to synthesize more ticks than `max_tick_gap_s` allows.
    #[error("track sample {index} follows a {gap_s}s gap (max {max_s}s)")]
    TrackGap { index: usize, gap_s: i64, max_s: u64 },

    #[error("track contains no samples")]
    EmptyTrack,

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("telemetry: {0}")]
    Telemetry(#[from] prometheus::Error),
}

pub type TrackResult<T> = Result<T, TrackError>;
