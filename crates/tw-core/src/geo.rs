//! Geographic coordinate type and spatial utilities.
//!
//! `Coord` stores a WGS-84 (lng, lat) pair as `f64`: route polylines are
//! densified to a 5 m step and walked repeatedly during snapshot
//! interpolation, so the extra precision over `f32` actually matters at
//! accumulation.

/// A WGS-84 geographic coordinate, longitude first to match the wire format.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coord {
    pub lng: f64,
    pub lat: f64,
}

impl Coord {
    #[inline]
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Haversine great-circle distance in metres.
    pub fn distance_m(self, other: Coord) -> f64 {
        const R: f64 = 6_371_000.0; // mean Earth radius, metres

        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lng * 0.5).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        R * c
    }

    /// Approximate bounding-box check — cheap rejection before a full
    /// `distance_m` call.
    #[inline]
    pub fn within_bbox(self, center: Coord, half_deg: f64) -> bool {
        (self.lat - center.lat).abs() <= half_deg && (self.lng - center.lng).abs() <= half_deg
    }

    /// Great-circle initial bearing from `self` to `other`, in degrees,
    /// 0 = north, clockwise. Used in place of a flat `atan2(d_lng, d_lat)`,
    /// which drifts noticeably off true heading away from the equator.
    pub fn bearing(self, other: Coord) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lng = (other.lng - self.lng).to_radians();

        let y = d_lng.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lng.cos();

        let theta = y.atan2(x).to_degrees();
        (theta + 360.0) % 360.0
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lng, self.lat)
    }
}

/// An axis-aligned lat/lng bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BBox {
    pub min: Coord,
    pub max: Coord,
}

impl BBox {
    pub fn from_points(points: impl IntoIterator<Item = Coord>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self { min: first, max: first };
        for p in iter {
            bbox.min.lng = bbox.min.lng.min(p.lng);
            bbox.min.lat = bbox.min.lat.min(p.lat);
            bbox.max.lng = bbox.max.lng.max(p.lng);
            bbox.max.lat = bbox.max.lat.max(p.lat);
        }
        Some(bbox)
    }

    pub fn center(&self) -> Coord {
        Coord::new((self.min.lng + self.max.lng) * 0.5, (self.min.lat + self.max.lat) * 0.5)
    }

    pub fn contains(&self, p: Coord) -> bool {
        p.lng >= self.min.lng && p.lng <= self.max.lng && p.lat >= self.min.lat && p.lat <= self.max.lat
    }

    /// Approximate area in km², treating the box as flat at its center
    /// latitude. Adequate at the radius scales this crate deals with
    /// (1-4 km).
    pub fn area_km2(&self) -> f64 {
        let center_lat = self.center().lat.to_radians();
        let width_m = (self.max.lng - self.min.lng).to_radians().abs() * 6_371_000.0 * center_lat.cos();
        let height_m = (self.max.lat - self.min.lat).to_radians().abs() * 6_371_000.0;
        (width_m * height_m) / 1_000_000.0
    }
}

/// Total great-circle length of a polyline, in metres.
pub fn polyline_length_m(coords: &[Coord]) -> f64 {
    coords.windows(2).map(|w| w[0].distance_m(w[1])).sum()
}

/// Resample a polyline to a fixed step, in metres.
///
/// Returns `coords` unchanged if it has fewer than two points. Otherwise
/// walks the polyline and emits the point at distance `i * step_m` for
/// `i = 0..=ceil(total_length / step_m)`, by piecewise-linear interpolation
/// between the surrounding input vertices.
pub fn densify(coords: &[Coord], step_m: f64) -> Vec<Coord> {
    if coords.len() < 2 {
        return coords.to_vec();
    }

    let total = polyline_length_m(coords);
    if total <= 0.0 {
        return vec![coords[0]];
    }

    let steps = (total / step_m).ceil() as usize;
    let mut out = Vec::with_capacity(steps + 1);
    for i in 0..=steps {
        let target = (i as f64 * step_m).min(total);
        out.push(point_at_distance(coords, target));
    }
    out
}

/// The point at great-circle distance `dist_m` along the polyline,
/// clamped to the polyline's endpoints.
pub fn point_at_distance(coords: &[Coord], dist_m: f64) -> Coord {
    if coords.is_empty() {
        return Coord::new(0.0, 0.0);
    }
    if coords.len() == 1 || dist_m <= 0.0 {
        return coords[0];
    }

    let mut remaining = dist_m;
    for w in coords.windows(2) {
        let seg_len = w[0].distance_m(w[1]);
        if seg_len <= 0.0 {
            continue;
        }
        if remaining <= seg_len {
            let t = remaining / seg_len;
            return Coord::new(
                w[0].lng + (w[1].lng - w[0].lng) * t,
                w[0].lat + (w[1].lat - w[0].lat) * t,
            );
        }
        remaining -= seg_len;
    }
    *coords.last().unwrap()
}

/// Point at fractional `progress` (0.0..=1.0) along the polyline's total
/// length, clamped to the endpoints.
pub fn point_at_progress(coords: &[Coord], progress: f64) -> Coord {
    let total = polyline_length_m(coords);
    point_at_distance(coords, total * progress.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route() -> Vec<Coord> {
        vec![
            Coord::new(0.0, 0.0),
            Coord::new(0.01, 0.0),
            Coord::new(0.01, 0.01),
            Coord::new(0.03, 0.02),
        ]
    }

    #[test]
    fn distance_m_is_symmetric_and_zero_for_identical_points() {
        let a = Coord::new(139.6917, 35.6895);
        let b = Coord::new(139.7017, 35.6995);
        assert_eq!(a.distance_m(a), 0.0);
        assert!((a.distance_m(b) - b.distance_m(a)).abs() < 1e-9);
        assert!(a.distance_m(b) > 0.0);
    }

    #[test]
    fn densify_preserves_total_length_for_any_step() {
        let coords = route();
        let total = polyline_length_m(&coords);
        for step in [1.0, 5.0, 17.0, 50.0] {
            let dense = densify(&coords, step);
            let dense_total = polyline_length_m(&dense);
            assert!((dense_total - total).abs() < 1.0, "step={step} dense_total={dense_total} total={total}");
        }
    }

    #[test]
    fn densify_endpoints_match_source_within_a_metre() {
        let coords = route();
        let dense = densify(&coords, 5.0);
        assert!(dense.first().unwrap().distance_m(coords[0]) < 1.0);
        assert!(dense.last().unwrap().distance_m(*coords.last().unwrap()) < 1.0);
    }

    #[test]
    fn densify_passthrough_below_two_points() {
        let single = vec![Coord::new(1.0, 2.0)];
        assert_eq!(densify(&single, 5.0), single);
        let empty: Vec<Coord> = vec![];
        assert_eq!(densify(&empty, 5.0), empty);
    }

    #[test]
    fn bearing_matches_point_nearby_along_the_same_heading() {
        let a = Coord::new(0.0, 0.0);
        let b = Coord::new(0.02, 0.03);
        let coords = vec![a, b];
        let near = point_at_progress(&coords, 0.001);
        let diff = (a.bearing(b) - a.bearing(near)).abs();
        assert!(diff < 1.0, "bearing diverged by {diff} degrees");
    }

    #[test]
    fn bearing_north_is_zero_and_east_is_ninety() {
        let origin = Coord::new(0.0, 0.0);
        let north = Coord::new(0.0, 1.0);
        let east = Coord::new(1.0, 0.0);
        assert!(origin.bearing(north).abs() < 1e-6);
        assert!((origin.bearing(east) - 90.0).abs() < 1e-6);
    }

    #[test]
    fn bbox_from_points_covers_all_inputs() {
        let pts = vec![Coord::new(1.0, 1.0), Coord::new(-1.0, 3.0), Coord::new(0.0, -2.0)];
        let bbox = BBox::from_points(pts.clone()).unwrap();
        for p in pts {
            assert!(bbox.contains(p));
        }
    }
}
