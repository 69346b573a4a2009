//! Great-circle distance, segment projection and degree/metre conversions.
//!
//! Earth radius is fixed at 6 371 000 m; edge identity elsewhere in the crate relies on exact
//! coordinate equality, so nothing here ever rounds or canonicalises a `Coordinate`.

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 point. Equality is bit-exact — two coordinates parsed from the same GTFS text are
/// the same node, two that differ by a single ULP are not.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Coordinate { lat, lon }
    }

    pub fn dist(&self, other: Coordinate) -> f64 {
        great_circle_m(self.lat, self.lon, other.lat, other.lon)
    }
}

/// Haversine distance in metres between two WGS84 points given in degrees.
pub fn great_circle_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Small-offset linearization: moves `(lat, lon)` by `(dy_m, dx_m)` metres north/east.
pub fn offset_meters(lat: f64, lon: f64, dy_m: f64, dx_m: f64) -> (f64, f64) {
    let lat_rad = lat.to_radians();
    let new_lat = lat + (180.0 / std::f64::consts::PI) * (dy_m / EARTH_RADIUS_M);
    let new_lon = lon + (180.0 / std::f64::consts::PI) * (dx_m / EARTH_RADIUS_M) / lat_rad.cos();
    (new_lat, new_lon)
}

/// Converts a radius in kilometres to an approximate radius in degrees, for building a bounding
/// circle to drive a spatial-index filter query. The index is only ever used as a prefilter —
/// exact distance checks always follow.
pub fn km_to_degrees(r_km: f64) -> f64 {
    r_km * 0.008993
}

/// Parametric projection of `p` onto segment `[a, b]`, clamped to `t ∈ [0, 1]`.
/// Returns the nearest point and the travelled fraction. For degenerate `a == b`, returns
/// `(a, 0.0)`.
pub fn project_onto_segment(p: Coordinate, a: Coordinate, b: Coordinate) -> (Coordinate, f64) {
    let (ax, ay) = (a.lon, a.lat);
    let (bx, by) = (b.lon, b.lat);
    let (px, py) = (p.lon, p.lat);

    let abx = bx - ax;
    let aby = by - ay;
    let ab_len_sq = abx * abx + aby * aby;

    if ab_len_sq == 0.0 {
        return (a, 0.0);
    }

    let apx = px - ax;
    let apy = py - ay;

    let t = ((apx * abx + apy * aby) / ab_len_sq).clamp(0.0, 1.0);

    let q = Coordinate::new(ay + t * aby, ax + t * abx);

    (q, t)
}

/// Great-circle distance in metres from `p` to its nearest point on segment `[a, b]`.
pub fn distance_to_segment_m(p: Coordinate, a: Coordinate, b: Coordinate) -> f64 {
    let (q, _) = project_onto_segment(p, a, b);
    p.dist(q)
}
