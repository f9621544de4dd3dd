use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,  // grader
    pub longitude: f64, // grader
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Endelige verdier innenfor gyldig bredde-/lengdegrad.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// One timestamped position from the external feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub coordinate: Coordinate,
    pub timestamp: DateTime<Utc>,
    #[serde(default, alias = "speed", alias = "speed_ms")]
    pub reported_speed: Option<f64>, // m/s
}

impl PositionSample {
    pub fn new(coordinate: Coordinate, timestamp: DateTime<Utc>) -> Self {
        Self {
            coordinate,
            timestamp,
            reported_speed: None,
        }
    }
}

/// Append-only sekvens av koordinater i tidsrekkefølge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    points: Vec<Coordinate>,
}

impl Route {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, c: Coordinate) {
        self.points.push(c);
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&Coordinate> {
        self.points.last()
    }

    pub(crate) fn clear(&mut self) {
        self.points.clear();
    }
}

/// Read-only projection of the accumulator. `None` pace = undefined.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_distance_m: f64,
    pub elapsed_s: f64,
    pub current_pace_s_per_km: Option<f64>,
    pub average_pace_s_per_km: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Paused,
    Stopped,
}

/// Opak referanse til et visuelt vedlegg (f.eks. kartbilde). Tolkes ikke av kjernen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef(pub String);

/// Finalized run. Only the session controller builds one, at stop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Run {
    id: Uuid,
    started_at: DateTime<Utc>,
    total_distance_m: f64,
    elapsed_s: f64,
    average_pace_s_per_km: Option<f64>,
    route: Route,
    artifact: Option<ArtifactRef>,
}

impl Run {
    pub(crate) fn finalize(
        started_at: DateTime<Utc>,
        snapshot: &MetricsSnapshot,
        route: Route,
        artifact: Option<ArtifactRef>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at,
            total_distance_m: snapshot.total_distance_m,
            elapsed_s: snapshot.elapsed_s,
            average_pace_s_per_km: snapshot.average_pace_s_per_km,
            route,
            artifact,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn total_distance_m(&self) -> f64 {
        self.total_distance_m
    }

    pub fn elapsed_s(&self) -> f64 {
        self.elapsed_s
    }

    pub fn average_pace_s_per_km(&self) -> Option<f64> {
        self.average_pace_s_per_km
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn artifact(&self) -> Option<&ArtifactRef> {
        self.artifact.as_ref()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
