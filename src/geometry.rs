//! Geometry engine: vertex-mean centroid and ray-casting containment.
//!
//! Both operate on a single ring of (longitude, latitude) vertices with no
//! holes. Points lying exactly on a boundary may be classified either way.

use crate::error::GeometryError;
use crate::types::Polygon;
use geo::Point;

/// Arithmetic mean of every listed vertex, including the closing duplicate.
///
/// This is not an area-weighted centroid: for a closed ring the first vertex
/// is counted twice. District assignment depends on this exact point, so it
/// is kept as is.
///
/// # Errors
///
/// Returns [`GeometryError::EmptyRing`] if the ring has no vertices.
pub fn centroid(polygon: &Polygon) -> Result<Point<f64>, GeometryError> {
    if polygon.is_empty() {
        return Err(GeometryError::EmptyRing);
    }

    let (sum_lon, sum_lat) = polygon
        .coords()
        .iter()
        .fold((0.0, 0.0), |(lon, lat), c| (lon + c.x, lat + c.y));
    let n = polygon.len() as f64;

    Ok(Point::new(sum_lon / n, sum_lat / n))
}

/// Crossing-number test over the listed edges of the ring.
///
/// Each consecutive vertex pair is an edge; no edge is added from the last
/// vertex back to the first. An edge counts as a crossing when it straddles
/// the point's latitude and its intersection with that latitude lies to the
/// east of the point. Horizontal edges never straddle, so the division is
/// always well defined.
pub fn point_in_polygon(point: Point<f64>, polygon: &Polygon) -> bool {
    let (lon, lat) = (point.x(), point.y());

    let crossings = polygon
        .coords()
        .windows(2)
        .filter(|edge| {
            let (a, b) = (edge[0], edge[1]);
            (a.y > lat) != (b.y > lat) && lon < a.x + (b.x - a.x) * (lat - a.y) / (b.y - a.y)
        })
        .count();

    crossings % 2 == 1
}
