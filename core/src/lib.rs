pub mod accumulator;
pub mod cli;
pub mod config;
pub mod error;
pub mod feed;
pub mod filter;
pub mod geo;
pub mod history;
pub mod models;
pub mod replay;
pub mod session;
pub mod shared;
pub mod telemetry;

#[cfg(feature = "python")]
mod py;

pub use accumulator::{MetricsAccumulator, SampleOutcome};
pub use config::{load_config, TrackerConfig};
pub use error::{TrackError, TrackResult};
pub use feed::{
    IntervalTicker, PositionFeed, PushFeed, SampleSink, TickSink, TickSource, TickToken,
};
pub use filter::{SampleFilter, NOISE_THRESHOLD_M};
pub use geo::{
    distance_meters, format_clock, format_clock_clamped, format_distance_km, format_pace,
    pace_seconds_per_km, RoundTo,
};
pub use history::{DiscardHistory, InMemoryHistory, RunHistory};
pub use models::{
    ArtifactRef, Coordinate, MetricsSnapshot, PositionSample, Route, Run, SessionState,
};
pub use replay::{parse_track_json, replay_track, replay_track_json};
pub use session::{MetricsListener, SessionController};
pub use shared::SharedSession;
pub use telemetry::Telemetry;

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn runtrack_core(_py: Python, m: &PyModule) -> PyResult<()> {
    py::register(m)
}
