//! Producers consumed by the session: a position feed and a tick source.
//!
//! Both follow the same contract. The controller hands over a sink when it
//! starts or resumes and withdraws it on pause/stop. Implementations must
//! not call the sink synchronously from inside `subscribe`/`start`, since the
//! session lock is held at that point.
//!
//! Ticks carry a [`TickToken`]. The session checks it while holding its lock,
//! so a tick from a source generation that has since been stopped is dropped
//! even if a pause and resume slipped in between.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::models::PositionSample;

pub type SampleSink = Arc<dyn Fn(PositionSample) + Send + Sync>;
pub type TickSink = Arc<dyn Fn(TickToken) + Send + Sync>;

/// Identifies which start of a tick source produced a tick.
#[derive(Debug, Clone)]
pub struct TickToken {
    generation: Option<(Arc<AtomicU64>, u64)>,
}

impl TickToken {
    /// Token for generation `issued` of the counter `generation`. It stays
    /// current until the counter moves on.
    pub fn new(generation: Arc<AtomicU64>, issued: u64) -> Self {
        Self {
            generation: Some((generation, issued)),
        }
    }

    /// For sources that do not track generations; always current.
    pub fn untracked() -> Self {
        Self { generation: None }
    }

    pub fn is_current(&self) -> bool {
        match &self.generation {
            Some((counter, issued)) => counter.load(Ordering::SeqCst) == *issued,
            None => true,
        }
    }
}

pub trait PositionFeed: Send {
    fn subscribe(&mut self, sink: SampleSink);
    fn unsubscribe(&mut self);
}

pub trait TickSource: Send {
    fn start(&mut self, sink: TickSink);
    fn stop(&mut self);
}

/// Push-basert feed: sensorlaget beholder en klone og kaller `push`.
/// Posisjoner som kommer mens ingen abonnerer, forkastes (ingen buffring).
#[derive(Clone, Default)]
pub struct PushFeed {
    sink: Arc<Mutex<Option<SampleSink>>>,
}

impl PushFeed {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<SampleSink>> {
        self.sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_subscribed(&self) -> bool {
        self.lock().is_some()
    }

    /// Returns `false` when the sample was dropped for lack of a subscriber.
    pub fn push(&self, sample: PositionSample) -> bool {
        // klon sinken ut og slipp låsen før levering
        let sink = self.lock().clone();
        match sink {
            Some(deliver) => {
                deliver(sample);
                true
            }
            None => {
                log::trace!("push feed: no subscriber, sample dropped");
                false
            }
        }
    }
}

impl PositionFeed for PushFeed {
    fn subscribe(&mut self, sink: SampleSink) {
        *self.lock() = Some(sink);
    }

    fn unsubscribe(&mut self) {
        *self.lock() = None;
    }
}

impl std::fmt::Debug for PushFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushFeed").field("subscribed", &self.is_subscribed()).finish()
    }
}

/// Tick-kilde på egen tråd.
///
/// Hver `start` får et nytt generasjonsnummer. Tråden slutter når nummeret
/// endres, og hver tick bærer nummeret sitt i en `TickToken`, så en tick som
/// var underveis da `stop` ble kalt, forkastes av økten.
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Duration,
    generation: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
}

impl IntervalTicker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            generation: Arc::new(AtomicU64::new(0)),
            worker: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl TickSource for IntervalTicker {
    fn start(&mut self, sink: TickSink) {
        self.stop();
        let my_gen = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let interval = self.interval;

        let spawned = thread::Builder::new()
            .name("runtrack-ticker".into())
            .spawn(move || {
                let mut next = Instant::now() + interval;
                loop {
                    let now = Instant::now();
                    if now < next {
                        thread::park_timeout(next - now);
                    }
                    if generation.load(Ordering::SeqCst) != my_gen {
                        break;
                    }
                    // spurious unpark
                    if Instant::now() < next {
                        continue;
                    }
                    sink(TickToken::new(Arc::clone(&generation), my_gen));
                    next += interval;
                }
            });

        match spawned {
            Ok(handle) => self.worker = Some(handle),
            Err(e) => log::error!("failed to spawn ticker thread: {e}"),
        }
    }

    fn stop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        // Ikke join: tråden kan vente på sesjonslåsen som kalleren holder.
        if let Some(handle) = self.worker.take() {
            handle.thread().unpark();
        }
    }
}

impl Drop for IntervalTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
