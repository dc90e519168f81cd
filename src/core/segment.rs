use crate::core::geo;
use crate::domain::model::{DeliveryPoint, Segment};

/// Builds the segment between two consecutive points. A non-positive
/// duration yields speed 0 so the interval bills as idle; an invalid
/// distance counts as 0 km.
pub fn build_segment(start: &DeliveryPoint, end: &DeliveryPoint) -> Segment {
    let distance_km = start.distance_to(end).unwrap_or_else(|| {
        tracing::warn!(
            delivery_id = end.delivery_id,
            "segment with invalid latitude counted as zero distance"
        );
        0.0
    });
    let duration = end.elapsed_since(start);
    let speed_kmh = geo::speed_kmh(distance_km, duration).unwrap_or(0.0);

    Segment {
        start: *start,
        end: *end,
        distance_km,
        duration,
        speed_kmh,
    }
}

pub fn segments(points: &[DeliveryPoint]) -> impl Iterator<Item = Segment> + '_ {
    points.windows(2).map(|pair| build_segment(&pair[0], &pair[1]))
}

pub fn build_segments(points: &[DeliveryPoint]) -> Vec<Segment> {
    segments(points).collect()
}
