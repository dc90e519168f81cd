use crate::core::geo;
use crate::domain::model::DeliveryPoint;

pub const DEFAULT_MAX_SPEED_KMH: f64 = 100.0;

/// Greedy single-pass outlier filter. Each candidate is compared with the
/// last point that was kept, never with the raw predecessor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointFilter {
    pub max_speed_kmh: f64,
}

impl Default for PointFilter {
    fn default() -> Self {
        Self {
            max_speed_kmh: DEFAULT_MAX_SPEED_KMH,
        }
    }
}

impl PointFilter {
    pub fn new(max_speed_kmh: f64) -> Self {
        Self { max_speed_kmh }
    }

    pub fn filter(&self, points: Vec<DeliveryPoint>) -> Vec<DeliveryPoint> {
        if points.len() < 2 {
            return points;
        }

        let total = points.len();
        let mut retained: Vec<DeliveryPoint> = Vec::with_capacity(total);
        for point in points {
            let keep = retained
                .last()
                .map_or(true, |anchor| self.is_plausible(anchor, &point));
            if keep {
                retained.push(point);
            }
        }

        if retained.len() < total {
            tracing::debug!(
                delivery_id = retained[0].delivery_id,
                dropped = total - retained.len(),
                "dropped implausible points"
            );
        }
        retained
    }

    /// Zero or negative elapsed time and invalid coordinates both count as
    /// implausible.
    pub fn is_plausible(&self, anchor: &DeliveryPoint, candidate: &DeliveryPoint) -> bool {
        let Some(distance) = anchor.distance_to(candidate) else {
            return false;
        };
        match geo::speed_kmh(distance, candidate.elapsed_since(anchor)) {
            Some(speed) => speed <= self.max_speed_kmh,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64, seconds: i64) -> DeliveryPoint {
        DeliveryPoint::from_unix(7, lat, lon, seconds).unwrap()
    }

    #[test]
    fn test_short_sequences_are_unchanged() {
        let filter = PointFilter::default();
        assert!(filter.filter(vec![]).is_empty());

        let single = vec![point(95.0, 0.0, 0)];
        assert_eq!(filter.filter(single.clone()), single);
    }

    #[test]
    fn test_drops_fast_jump() {
        let filter = PointFilter::default();
        let points = vec![
            point(40.7128, -74.0060, 1_609_459_200),
            point(50.7129, -84.0061, 1_609_459_260),
        ];
        let filtered = filter.filter(points.clone());
        assert_eq!(filtered, vec![points[0]]);
    }

    #[test]
    fn test_compares_against_last_retained_point() {
        let filter = PointFilter::default();
        let points = vec![
            point(40.7128, -74.0060, 0),
            // outlier ~1100 km away
            point(50.7128, -74.0060, 60),
            // close to the first point; would look implausible against the outlier
            point(40.7138, -74.0060, 120),
        ];
        let filtered = filter.filter(points.clone());
        assert_eq!(filtered, vec![points[0], points[2]]);
    }

    #[test]
    fn test_drops_zero_duration_points() {
        let filter = PointFilter::default();
        let points = vec![point(40.7128, -74.0060, 100), point(40.7128, -74.0060, 100)];
        assert_eq!(filter.filter(points.clone()).len(), 1);
    }

    #[test]
    fn test_drops_points_going_back_in_time() {
        let filter = PointFilter::default();
        let points = vec![point(40.7128, -74.0060, 100), point(40.7128, -74.0061, 40)];
        assert_eq!(filter.filter(points).len(), 1);
    }

    #[test]
    fn test_drops_invalid_latitude() {
        let filter = PointFilter::default();
        let points = vec![
            point(40.7128, -74.0060, 0),
            point(91.0, -74.0060, 600),
            point(40.7129, -74.0060, 1200),
        ];
        let filtered = filter.filter(points.clone());
        assert_eq!(filtered, vec![points[0], points[2]]);
    }

    #[test]
    fn test_speed_at_limit_is_kept() {
        // 0.1 degree of latitude on the equator is ~11.12 km; pick the
        // elapsed time so the implied speed sits just under the limit
        let filter = PointFilter::new(100.0);
        let points = vec![point(0.0, 0.0, 0), point(0.1, 0.0, 401)];
        assert_eq!(filter.filter(points).len(), 2);

        let too_fast = vec![point(0.0, 0.0, 0), point(0.1, 0.0, 399)];
        assert_eq!(filter.filter(too_fast).len(), 1);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let filter = PointFilter::default();
        let points = vec![
            point(40.7128, -74.0060, 0),
            point(40.7130, -74.0062, 60),
            point(41.9000, -74.0062, 90),
            point(40.7135, -74.0065, 120),
            point(40.7135, -74.0065, 120),
            point(40.7200, -74.0100, 600),
        ];
        let once = filter.filter(points);
        let twice = filter.filter(once.clone());
        assert_eq!(once, twice);
    }
}
