use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::Run;

/// Mottaker for ferdige økter. Rekkefølge og lagring er mottakerens ansvar.
pub trait RunHistory: Send {
    fn record(&mut self, run: Run);
}

/// In-memory history, newest `started_at` first. Clones share the same list,
/// so one clone can be handed to a controller and another kept for reading.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistory {
    runs: Arc<Mutex<Vec<Run>>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Run>> {
        self.runs.lock().unwrap_or_else(|poisoned| {
            log::warn!("run history lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn runs(&self) -> Vec<Run> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn latest(&self) -> Option<Run> {
        self.lock().first().cloned()
    }
}

impl RunHistory for InMemoryHistory {
    fn record(&mut self, run: Run) {
        let mut runs = self.lock();
        runs.push(run);
        runs.sort_by(|a, b| b.started_at().cmp(&a.started_at()));
    }
}

/// Forkaster alt. Brukes når kalleren bare vil ha `Run` fra `stop()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardHistory;

impl RunHistory for DiscardHistory {
    fn record(&mut self, _run: Run) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MetricsSnapshot, Route};
    use chrono::{TimeZone, Utc};

    fn run_at(secs: i64) -> Run {
        let ts = Utc.timestamp_opt(secs, 0).single().unwrap();
        Run::finalize(ts, &MetricsSnapshot::default(), Route::new(), None)
    }

    #[test]
    fn newest_first() {
        let history = InMemoryHistory::new();
        let mut sink = history.clone();
        sink.record(run_at(100));
        sink.record(run_at(300));
        sink.record(run_at(200));

        let starts: Vec<i64> = history.runs().iter().map(|r| r.started_at().timestamp()).collect();
        assert_eq!(starts, vec![300, 200, 100]);
        assert_eq!(history.latest().unwrap().started_at().timestamp(), 300);
        assert_eq!(history.len(), 3);
    }
}
