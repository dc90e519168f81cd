use chrono::TimeDelta;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

const MAX_LATITUDE: f64 = 90.0;
const MIN_LATITUDE: f64 = -90.0;

pub fn is_valid_latitude(latitude: f64) -> bool {
    (MIN_LATITUDE..=MAX_LATITUDE).contains(&latitude)
}

/// Great-circle distance in kilometres between two coordinates given in
/// degrees. Returns `None` when either latitude is outside [-90, 90];
/// callers decide whether to drop or reject.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Option<f64> {
    if !is_valid_latitude(lat1) || !is_valid_latitude(lat2) {
        return None;
    }

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    // rounding can push `a` a hair past 1 for antipodal points
    let a = a.min(1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    Some(EARTH_RADIUS_KM * c)
}

/// Average speed in km/h, `None` for a non-positive duration.
pub fn speed_kmh(distance_km: f64, duration: TimeDelta) -> Option<f64> {
    let seconds = duration.num_seconds();
    if seconds <= 0 {
        return None;
    }
    Some(distance_km / (seconds as f64 / 3600.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::DeliveryPoint;

    fn km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
        haversine_km(lat1, lon1, lat2, lon2).unwrap()
    }

    #[test]
    fn test_same_point_is_zero() {
        assert_eq!(km(40.7128, -74.0060, 40.7128, -74.0060), 0.0);
    }

    #[test]
    fn test_known_city_distances() {
        assert!((km(40.7128, -74.0060, 34.0522, -118.2437) - 3935.746).abs() < 1.0);
        assert!((km(51.5074, -0.1278, 35.6762, 139.6503) - 9559.784).abs() < 5.0);
    }

    #[test]
    fn test_pole_to_pole_and_antipodes() {
        assert!((km(90.0, 0.0, -90.0, 0.0) - 20015.087).abs() < 10.0);
        assert!((km(51.5074, -0.1278, -51.5074, 179.8722) - 20015.087).abs() < 10.0);
    }

    #[test]
    fn test_longitude_wrap_around() {
        assert!((km(0.0, 179.0, 0.0, -179.0) - 222.4).abs() < 0.1);
        assert!((km(0.0, -179.0, 0.0, 179.0) - 222.4).abs() < 0.1);
    }

    #[test]
    fn test_symmetry() {
        let forward = km(40.7128, -74.0060, 40.7578, -73.9855);
        let backward = km(40.7578, -73.9855, 40.7128, -74.0060);
        assert!((forward - backward).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_latitude_is_rejected() {
        assert!(haversine_km(91.0, 0.0, 0.0, 0.0).is_none());
        assert!(haversine_km(0.0, 0.0, -91.0, 0.0).is_none());
        assert!(haversine_km(90.0, 0.0, -90.0, 0.0).is_some());
    }

    #[test]
    fn test_speed_between_points() {
        let p1 = DeliveryPoint::from_unix(1, 40.7128, -74.0060, 1_609_459_200).unwrap();
        let p2 = DeliveryPoint::from_unix(1, 40.7129, -74.0061, 1_609_459_260).unwrap();
        let distance = p1.distance_to(&p2).unwrap();
        let speed = speed_kmh(distance, p2.elapsed_since(&p1)).unwrap();
        assert!((speed - 0.8371704438758566).abs() < 1e-7);
    }

    #[test]
    fn test_speed_undefined_without_elapsed_time() {
        assert!(speed_kmh(1.0, TimeDelta::zero()).is_none());
        assert!(speed_kmh(1.0, TimeDelta::seconds(-60)).is_none());
        assert_eq!(speed_kmh(0.0, TimeDelta::hours(1)), Some(0.0));
    }
}
