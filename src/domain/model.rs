use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// One GPS fix of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPoint {
    pub delivery_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl DeliveryPoint {
    pub fn new(delivery_id: i64, latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            delivery_id,
            latitude,
            longitude,
            timestamp,
        }
    }

    /// Builds a point from a unix timestamp in seconds. `None` when the
    /// timestamp is outside the range chrono can represent.
    pub fn from_unix(
        delivery_id: i64,
        latitude: f64,
        longitude: f64,
        seconds: i64,
    ) -> Option<Self> {
        let timestamp = DateTime::from_timestamp(seconds, 0)?;
        Some(Self::new(delivery_id, latitude, longitude, timestamp))
    }

    pub fn distance_to(&self, other: &DeliveryPoint) -> Option<f64> {
        crate::core::geo::haversine_km(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }

    pub fn elapsed_since(&self, earlier: &DeliveryPoint) -> TimeDelta {
        self.timestamp - earlier.timestamp
    }
}

/// All points of one delivery, in the order they were received.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryGroup {
    pub delivery_id: i64,
    pub points: Vec<DeliveryPoint>,
}

impl DeliveryGroup {
    pub fn new(delivery_id: i64, points: Vec<DeliveryPoint>) -> Self {
        Self {
            delivery_id,
            points,
        }
    }
}

/// Interval between two consecutive retained points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: DeliveryPoint,
    pub end: DeliveryPoint,
    pub distance_km: f64,
    pub duration: TimeDelta,
    pub speed_kmh: f64,
}

impl Segment {
    pub fn duration_hours(&self) -> f64 {
        self.duration.num_seconds() as f64 / 3600.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FareEstimate {
    pub delivery_id: i64,
    pub fare: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub records: u64,
    pub malformed: u64,
    pub groups: u64,
    pub split_groups: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub processed: u64,
    pub failed: u64,
    pub crashed_workers: u64,
    /// Set when workers stopped on a shutdown request rather than because
    /// the input ran dry. The output then covers only part of the input.
    pub interrupted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub written: u64,
    pub output_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub ingest: IngestReport,
    pub dispatch: DispatchReport,
    pub load: LoadReport,
    pub interrupted: bool,
}
