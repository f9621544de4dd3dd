// Python-bindinger (feature "python"). Tynne omslag rundt kjernen; all logikk
// ligger i Rust-modulene.

use chrono::Utc;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::wrap_pyfunction;

use crate::config::TrackerConfig;
use crate::error::TrackError;
use crate::history::InMemoryHistory;
use crate::models::{ArtifactRef, Coordinate, PositionSample};
use crate::session::SessionController;

fn to_py_err(e: TrackError) -> PyErr {
    match e {
        TrackError::InvalidTransition { .. } => PyRuntimeError::new_err(e.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

#[pyfunction]
#[pyo3(name = "distance_meters")]
fn py_distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    crate::geo::distance_meters(Coordinate::new(lat1, lon1), Coordinate::new(lat2, lon2))
}

#[pyfunction]
#[pyo3(name = "format_clock")]
fn py_format_clock(total_seconds: f64) -> PyResult<String> {
    crate::geo::format_clock(total_seconds).map_err(to_py_err)
}

#[pyfunction]
#[pyo3(name = "pace_seconds_per_km")]
fn py_pace_seconds_per_km(distance_m: f64, elapsed_s: f64) -> Option<f64> {
    crate::geo::pace_seconds_per_km(distance_m, elapsed_s)
}

/// Tar imot str eller dict/list, returnerer run som dict.
#[pyfunction]
#[pyo3(name = "replay_track_json")]
fn py_replay_track_json(py: Python<'_>, payload: &PyAny) -> PyResult<PyObject> {
    let json_mod = py
        .import("json")
        .map_err(|e| PyValueError::new_err(format!("failed to import json: {e}")))?;

    let json_in: String = if let Ok(s) = payload.extract::<&str>() {
        s.to_owned()
    } else {
        json_mod
            .call_method1("dumps", (payload,))
            .and_then(|o| o.extract::<String>())
            .map_err(|e| {
                PyValueError::new_err(format!("failed to serialize payload with json.dumps: {e}"))
            })?
    };

    let out = crate::replay::replay_track_json(&json_in).map_err(to_py_err)?;
    let obj = json_mod
        .call_method1("loads", (out.as_str(),))
        .map_err(|e| {
            PyValueError::new_err(format!("internal JSON parse error via json.loads: {e}"))
        })?;
    Ok(obj.into_py(py))
}

/// Manuelt drevet økt: Python-siden leverer posisjoner og ticks selv.
#[pyclass(name = "RunSession")]
struct PyRunSession {
    inner: SessionController,
    history: InMemoryHistory,
}

#[pymethods]
impl PyRunSession {
    #[new]
    #[pyo3(signature = (config_json=None))]
    fn new(config_json: Option<&str>) -> PyResult<Self> {
        let config = match config_json {
            Some(s) => TrackerConfig::from_json(s).map_err(to_py_err)?,
            None => TrackerConfig::default(),
        };
        let history = InMemoryHistory::new();
        let inner = SessionController::new(&config, Box::new(history.clone())).map_err(to_py_err)?;
        Ok(Self { inner, history })
    }

    fn start(&mut self) -> PyResult<()> {
        self.inner.start().map_err(to_py_err)
    }

    fn pause(&mut self) {
        self.inner.pause()
    }

    /// Returnerer run som JSON, eller None hvis økten aldri ble startet.
    #[pyo3(signature = (artifact=None))]
    fn stop(&mut self, artifact: Option<String>) -> PyResult<Option<String>> {
        match self.inner.stop_with_artifact(artifact.map(ArtifactRef)) {
            Some(run) => run.to_json().map(Some).map_err(|e| PyValueError::new_err(e.to_string())),
            None => Ok(None),
        }
    }

    #[pyo3(signature = (latitude, longitude, speed=None))]
    fn push_sample(&mut self, latitude: f64, longitude: f64, speed: Option<f64>) -> bool {
        let mut sample = PositionSample::new(Coordinate::new(latitude, longitude), Utc::now());
        sample.reported_speed = speed;
        self.inner.on_sample(sample).map(|o| o.is_accepted()).unwrap_or(false)
    }

    fn tick(&mut self) -> bool {
        self.inner.on_tick()
    }

    fn state(&self) -> String {
        format!("{:?}", self.inner.state())
    }

    fn snapshot_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner.snapshot())
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    fn history_len(&self) -> usize {
        self.history.len()
    }
}

pub(crate) fn register(m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_distance_meters, m)?)?;
    m.add_function(wrap_pyfunction!(py_format_clock, m)?)?;
    m.add_function(wrap_pyfunction!(py_pace_seconds_per_km, m)?)?;
    m.add_function(wrap_pyfunction!(py_replay_track_json, m)?)?;
    m.add_class::<PyRunSession>()?;
    Ok(())
}
