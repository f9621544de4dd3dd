use chrono::{DateTime, Utc};

use crate::accumulator::{MetricsAccumulator, SampleOutcome};
use crate::config::TrackerConfig;
use crate::error::{TrackError, TrackResult};
use crate::feed::{PositionFeed, SampleSink, TickSink, TickSource};
use crate::history::RunHistory;
use crate::models::{ArtifactRef, MetricsSnapshot, PositionSample, Route, Run, SessionState};
use crate::telemetry::Telemetry;

/// Kalles med nytt snapshot etter hver anvendt posisjon og tick.
/// Kjører mens sesjonslåsen holdes; lytteren må ikke kalle tilbake inn i økten.
pub type MetricsListener = Box<dyn Fn(&MetricsSnapshot) + Send>;

/// State machine for one tracked activity: Idle → Running ⇄ Paused → Stopped.
///
/// A controller is single-use. Once stopped it refuses `start`; a new
/// activity gets a new controller. A bare controller is driven directly
/// through `on_sample`/`on_tick`; producers (feed, ticker) are attached
/// through `SharedSession`, which owns the sinks they deliver into.
pub struct SessionController {
    state: SessionState,
    accumulator: MetricsAccumulator,
    route: Route,
    started_at: Option<DateTime<Utc>>,
    feed: Option<Box<dyn PositionFeed>>,
    ticker: Option<Box<dyn TickSource>>,
    sinks: Option<(SampleSink, TickSink)>,
    history: Box<dyn RunHistory>,
    listeners: Vec<MetricsListener>,
    telemetry: Telemetry,
}

impl SessionController {
    pub fn new(config: &TrackerConfig, history: Box<dyn RunHistory>) -> TrackResult<Self> {
        config.validate()?;
        Ok(Self {
            state: SessionState::Idle,
            accumulator: MetricsAccumulator::new(config.filter()),
            route: Route::new(),
            started_at: None,
            feed: None,
            ticker: None,
            sinks: None,
            history,
            listeners: Vec::new(),
            telemetry: Telemetry::new()?,
        })
    }

    /// Set by `SharedSession`; the sinks route deliveries back through the lock.
    pub(crate) fn bind_sinks(&mut self, sample_sink: SampleSink, tick_sink: TickSink) {
        self.sinks = Some((sample_sink, tick_sink));
    }

    /// Replaces the feed. A running session subscribes the new one at once.
    pub(crate) fn install_feed(&mut self, mut feed: Box<dyn PositionFeed>) {
        if let Some(mut old) = self.feed.take() {
            old.unsubscribe();
        }
        if self.state == SessionState::Running {
            if let Some((sample_sink, _)) = self.sinks.as_ref() {
                feed.subscribe(sample_sink.clone());
            }
        }
        self.feed = Some(feed);
    }

    /// Replaces the tick source. A running session starts the new one at once.
    pub(crate) fn install_ticker(&mut self, mut ticker: Box<dyn TickSource>) {
        if let Some(mut old) = self.ticker.take() {
            old.stop();
        }
        if self.state == SessionState::Running {
            if let Some((_, tick_sink)) = self.sinks.as_ref() {
                ticker.start(tick_sink.clone());
            }
        }
        self.ticker = Some(ticker);
    }

    pub fn on_metrics_changed(&mut self, listener: MetricsListener) {
        self.listeners.push(listener);
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.accumulator.snapshot()
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn start(&mut self) -> TrackResult<()> {
        self.start_at(Utc::now())
    }

    /// Like `start`, with an explicit start time. The timestamp only matters
    /// when starting from Idle; a resume keeps the original start time.
    pub fn start_at(&mut self, started_at: DateTime<Utc>) -> TrackResult<()> {
        match self.state {
            SessionState::Running => {
                log::debug!("start ignored: already running");
                Ok(())
            }
            SessionState::Stopped => Err(TrackError::InvalidTransition {
                from: SessionState::Stopped,
                event: "start",
            }),
            SessionState::Idle => {
                self.accumulator.reset();
                self.route.clear();
                self.started_at = Some(started_at);
                self.state = SessionState::Running;
                self.attach_producers();
                log::debug!("session started at {started_at}");
                Ok(())
            }
            SessionState::Paused => {
                self.state = SessionState::Running;
                self.attach_producers();
                log::debug!("session resumed at {}s", self.accumulator.snapshot().elapsed_s);
                Ok(())
            }
        }
    }

    pub fn pause(&mut self) {
        if self.state != SessionState::Running {
            log::debug!("pause ignored in state {:?}", self.state);
            return;
        }
        self.detach_producers();
        self.state = SessionState::Paused;
        log::debug!("session paused at {}s", self.accumulator.snapshot().elapsed_s);
    }

    pub fn stop(&mut self) -> Option<Run> {
        self.stop_with_artifact(None)
    }

    /// Finalizes the run and hands it to history. Returns a copy of what was
    /// recorded, or `None` when there was nothing to stop.
    pub fn stop_with_artifact(&mut self, artifact: Option<ArtifactRef>) -> Option<Run> {
        match self.state {
            SessionState::Running | SessionState::Paused => {}
            other => {
                log::debug!("stop ignored in state {other:?}");
                return None;
            }
        }
        self.detach_producers();
        self.state = SessionState::Stopped;

        let snapshot = self.accumulator.snapshot();
        let started_at = self.started_at.unwrap_or_else(Utc::now);
        let run = Run::finalize(started_at, &snapshot, self.route.clone(), artifact);
        self.history.record(run.clone());
        self.telemetry.runs_finalized.inc();

        log::info!(
            "run {} finalized: {:.1} m in {}s, {} route points",
            run.id(),
            run.total_distance_m(),
            run.elapsed_s(),
            run.route().len()
        );
        Some(run)
    }

    /// Route a feed sample. Returns `None` when the sample was not applied
    /// (session not running, or unusable coordinate).
    pub fn on_sample(&mut self, sample: PositionSample) -> Option<SampleOutcome> {
        if self.state != SessionState::Running {
            self.telemetry.samples_ignored.inc();
            return None;
        }
        let c = sample.coordinate;
        if !c.is_valid() {
            log::warn!("dropping invalid coordinate ({}, {})", c.latitude, c.longitude);
            self.telemetry.samples_invalid.inc();
            return None;
        }

        let outcome = self.accumulator.on_sample(c);
        // rejected points stay in the route so the drawn track is complete
        self.route.push(c);
        if outcome.is_accepted() {
            self.telemetry.samples_accepted.inc();
        } else {
            self.telemetry.samples_rejected.inc();
        }
        log::trace!("sample {:?} -> {:?}", c, outcome);

        self.notify();
        Some(outcome)
    }

    /// Returns `true` when the tick advanced elapsed time.
    pub fn on_tick(&mut self) -> bool {
        if self.state != SessionState::Running {
            return false;
        }
        self.accumulator.on_tick();
        self.telemetry.ticks_applied.inc();
        self.notify();
        true
    }

    fn notify(&self) {
        if self.listeners.is_empty() {
            return;
        }
        let snapshot = self.accumulator.snapshot();
        for listener in &self.listeners {
            listener(&snapshot);
        }
    }

    fn attach_producers(&mut self) {
        // producers are only installed alongside sinks
        let Some((sample_sink, tick_sink)) = self.sinks.as_ref() else {
            return;
        };
        if let Some(feed) = self.feed.as_mut() {
            feed.subscribe(sample_sink.clone());
        }
        if let Some(ticker) = self.ticker.as_mut() {
            ticker.start(tick_sink.clone());
        }
    }

    fn detach_producers(&mut self) {
        if let Some(feed) = self.feed.as_mut() {
            feed.unsubscribe();
        }
        if let Some(ticker) = self.ticker.as_mut() {
            ticker.stop();
        }
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state)
            .field("metrics", &self.accumulator.snapshot())
            .field("route_len", &self.route.len())
            .field("started_at", &self.started_at)
            .field("has_feed", &self.feed.is_some())
            .field("has_ticker", &self.ticker.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{DiscardHistory, InMemoryHistory};
    use crate::models::Coordinate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn controller() -> SessionController {
        SessionController::new(&TrackerConfig::default(), Box::new(DiscardHistory)).unwrap()
    }

    fn at(lat: f64) -> PositionSample {
        PositionSample::new(Coordinate::new(lat, 0.0), Utc::now())
    }

    #[test]
    fn samples_ignored_unless_running() {
        let mut c = controller();
        assert_eq!(c.on_sample(at(0.0)), None);
        assert!(!c.on_tick());
        c.start().unwrap();
        c.pause();
        assert_eq!(c.on_sample(at(0.0)), None);
        assert!(!c.on_tick());
        assert!(c.route().is_empty());
        assert_eq!(c.telemetry().samples_ignored.get(), 2);
    }

    #[test]
    fn invalid_coordinates_are_dropped() {
        let mut c = controller();
        c.start().unwrap();
        assert_eq!(c.on_sample(at(f64::NAN)), None);
        assert_eq!(c.on_sample(at(91.0)), None);
        assert!(c.route().is_empty());
        assert_eq!(c.telemetry().samples_invalid.get(), 2);
        assert_eq!(c.on_sample(at(10.0)), Some(SampleOutcome::Seeded));
    }

    #[test]
    fn listeners_see_every_applied_event() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut c = controller();
        let counter = Arc::clone(&calls);
        c.on_metrics_changed(Box::new(move |_s: &MetricsSnapshot| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        c.on_tick(); // idle: ignored
        c.start().unwrap();
        c.on_sample(at(0.0));
        c.on_tick();
        c.on_tick();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn stop_records_once() {
        let history = InMemoryHistory::new();
        let mut c =
            SessionController::new(&TrackerConfig::default(), Box::new(history.clone())).unwrap();
        c.start().unwrap();
        c.on_tick();
        let run = c.stop_with_artifact(Some(ArtifactRef("map-1.png".into()))).unwrap();
        assert_eq!(run.artifact(), Some(&ArtifactRef("map-1.png".into())));
        assert!(c.stop().is_none());
        c.pause();
        assert_eq!(c.state(), SessionState::Stopped);
        assert_eq!(history.len(), 1);
        assert_eq!(c.telemetry().runs_finalized.get(), 1);
    }

    #[test]
    fn start_after_stop_is_an_error() {
        let mut c = controller();
        c.start().unwrap();
        c.stop();
        let err = c.start().unwrap_err();
        assert!(matches!(
            err,
            TrackError::InvalidTransition { from: SessionState::Stopped, event: "start" }
        ));
    }
}
