//! Wire-format DTOs for the JSON HTTP facade (§6). Kept separate from the core's own types so a
//! request-shape change never has to ripple through the matcher.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct MapMatchRequestDto {
    pub trip_id: String,
    pub coordinates: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectionsRequestDto {
    pub stop_name: String,
    /// Reference instant, unsigned milliseconds UTC (§3's `t_unix_ms` convention).
    pub now: u64,
    pub trip_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ShapesRequestDto {
    pub shape_id: String,
    pub trip_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ShapesResponseDto {
    pub polyline: Vec<[f64; 2]>,
    pub stops: Vec<[f64; 2]>,
}
