use std::sync::{Arc, Mutex, MutexGuard, Weak};

use chrono::{DateTime, Utc};

use crate::accumulator::SampleOutcome;
use crate::error::TrackResult;
use crate::feed::{PositionFeed, SampleSink, TickSink, TickSource, TickToken};
use crate::models::{ArtifactRef, MetricsSnapshot, PositionSample, Route, Run, SessionState};
use crate::session::{MetricsListener, SessionController};

/// Mutex-serialized session. Samples, ticks and transitions go through the
/// same lock, so a distance update never interleaves with a tick.
///
/// Producers only ever see sinks holding a `Weak` back-reference, so the
/// controller owning its producers does not form a reference cycle.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<SessionController>>,
}

fn lock_session(inner: &Mutex<SessionController>) -> MutexGuard<'_, SessionController> {
    inner.lock().unwrap_or_else(|poisoned| {
        log::warn!("session lock poisoned, recovering");
        poisoned.into_inner()
    })
}

impl SharedSession {
    pub fn new(controller: SessionController) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<Mutex<SessionController>>| {
            let mut controller = controller;
            let w = weak.clone();
            let sample_sink: SampleSink = Arc::new(move |sample: PositionSample| {
                if let Some(inner) = w.upgrade() {
                    lock_session(&inner).on_sample(sample);
                }
            });
            let w = weak.clone();
            let tick_sink: TickSink = Arc::new(move |token: TickToken| {
                if let Some(inner) = w.upgrade() {
                    let mut session = lock_session(&inner);
                    // pause/stop bump the source generation under this lock
                    if token.is_current() {
                        session.on_tick();
                    } else {
                        log::trace!("stale tick dropped");
                    }
                }
            });
            controller.bind_sinks(sample_sink, tick_sink);
            Mutex::new(controller)
        });
        Self { inner }
    }

    /// Attach a position feed. It is subscribed on every start/resume and
    /// unsubscribed on pause/stop; if the session is already running it is
    /// subscribed immediately.
    pub fn with_feed(self, feed: Box<dyn PositionFeed>) -> Self {
        self.lock().install_feed(feed);
        self
    }

    /// Attach a tick source, with the same lifecycle as `with_feed`.
    pub fn with_ticker(self, ticker: Box<dyn TickSource>) -> Self {
        self.lock().install_ticker(ticker);
        self
    }

    fn lock(&self) -> MutexGuard<'_, SessionController> {
        lock_session(&self.inner)
    }

    pub fn start(&self) -> TrackResult<()> {
        self.lock().start()
    }

    pub fn start_at(&self, started_at: DateTime<Utc>) -> TrackResult<()> {
        self.lock().start_at(started_at)
    }

    pub fn pause(&self) {
        self.lock().pause()
    }

    /// Producers are detached before the lock is released, and anything that
    /// was already waiting on the lock is dropped by the state check.
    pub fn stop(&self) -> Option<Run> {
        self.lock().stop()
    }

    pub fn stop_with_artifact(&self, artifact: Option<ArtifactRef>) -> Option<Run> {
        self.lock().stop_with_artifact(artifact)
    }

    /// See [`SessionController::on_sample`].
    pub fn on_sample(&self, sample: PositionSample) -> Option<SampleOutcome> {
        self.lock().on_sample(sample)
    }

    pub fn on_tick(&self) -> bool {
        self.lock().on_tick()
    }

    pub fn on_metrics_changed(&self, listener: MetricsListener) {
        self.lock().on_metrics_changed(listener)
    }

    pub fn state(&self) -> SessionState {
        self.lock().state()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.lock().snapshot()
    }

    pub fn route(&self) -> Route {
        self.lock().route().clone()
    }

    /// Run `f` with exclusive access, e.g. for telemetry or several reads
    /// that must agree with each other.
    pub fn with<R>(&self, f: impl FnOnce(&SessionController) -> R) -> R {
        f(&self.lock())
    }
}

impl std::fmt::Debug for SharedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedSession").field(&*self.lock()).finish()
    }
}
