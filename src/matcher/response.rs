//! Response Assembler (§4.8): snapped location, next stop, and route display metadata for the
//! Identity Resolver's elected `(shape, service, trip, route)`.

use crate::geo::{Coordinate, project_onto_segment};
use crate::ids::TripId;
use crate::timetable::{Route, Timetable};

use super::identity::Identity;
use super::lattice::StateNode;

/// The `/map-match` result object (§6). Field order matches the spec's "keys verbatim" list.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MatchResult {
    pub route_name: String,
    pub trip_id: String,
    pub route_type: String,
    pub route_dest: String,
    pub route_color: String,
    pub shape_id: String,
    pub next_stop: String,
    pub location: [f64; 2],
}

impl MatchResult {
    /// The empty-match object (§6, §7): never an error, returned whenever the lattice or the
    /// Viterbi search or the Identity Resolver comes up empty.
    pub fn empty() -> Self {
        MatchResult {
            route_name: String::new(),
            trip_id: String::new(),
            route_type: String::new(),
            route_dest: String::new(),
            route_color: String::new(),
            shape_id: String::new(),
            next_stop: String::new(),
            location: [0.0, 0.0],
        }
    }
}

pub fn assemble_response(
    timetable: &Timetable,
    identity: &Identity,
    last_node: &StateNode,
    last_fix_point: Coordinate,
) -> MatchResult {
    let (snapped, _) = project_onto_segment(last_fix_point, last_node.from_coord, last_node.to_coord);

    let trip = timetable.trip(identity.trip_id);
    let route = timetable.route(identity.route_id);

    let mut segs = identity.segment_ids.clone();
    segs.sort_unstable();

    let next_stop = next_stop_name(
        timetable,
        identity.trip_id,
        &segs,
        snapped,
        last_node.from_coord,
        last_node.to_coord,
    )
    .unwrap_or_default();

    let (color, _text_color) = display_colors(route);

    MatchResult {
        route_name: route.short_name.clone(),
        trip_id: timetable.trip_id_string(identity.trip_id).to_string(),
        route_type: route.route_type.to_string(),
        route_dest: trip.destination_name(&timetable.stops).unwrap_or("").to_string(),
        route_color: color,
        shape_id: timetable.shape_id_string(identity.shape_id).to_string(),
        next_stop,
        location: [snapped.lat, snapped.lon],
    }
}

/// Walks the elected trip's stop list starting at `sorted_segment_ids[0] + 1` (§4.8). When more
/// than one segment is active on the final edge, advances past a later candidate stop only while
/// the snapped position has already travelled further along the edge than that stop's own
/// projection — stopping at the first candidate this isn't true for.
fn next_stop_name(
    timetable: &Timetable,
    trip_id: TripId,
    sorted_segment_ids: &[usize],
    snapped: Coordinate,
    edge_from: Coordinate,
    edge_to: Coordinate,
) -> Option<String> {
    let trip = timetable.trip(trip_id);
    let first_seg = *sorted_segment_ids.first()?;
    let mut stop_idx = first_seg + 1;

    let (_, snapped_frac) = project_onto_segment(snapped, edge_from, edge_to);

    for &seg in sorted_segment_ids.iter().skip(1) {
        let candidate_idx = seg + 1;
        if candidate_idx >= trip.stop_times.len() {
            break;
        }
        let stop_coord = timetable.stops[trip.stop_times[candidate_idx].stop_id.index()].coord;
        let (_, stop_frac) = project_onto_segment(stop_coord, edge_from, edge_to);
        if snapped_frac > stop_frac {
            stop_idx = candidate_idx;
        } else {
            break;
        }
    }

    trip.stop_times
        .get(stop_idx)
        .map(|st| timetable.stops[st.stop_id.index()].name.clone())
}

/// Colour override (§6): a fixed route-type table applied only when both colours are still at
/// their GTFS defaults (i.e. unset in the feed, per `src/ingestion/mod.rs`).
pub fn display_colors(route: &Route) -> (String, String) {
    match (&route.color, &route.text_color) {
        (None, None) => {
            category_override(route.route_type).unwrap_or_else(|| ("777777".to_string(), "FFFFFF".to_string()))
        }
        _ => (
            route.color.clone().unwrap_or_else(|| "777777".to_string()),
            route.text_color.clone().unwrap_or_else(|| "FFFFFF".to_string()),
        ),
    }
}

fn category_override(route_type: i16) -> Option<(String, String)> {
    let pair = match route_type {
        0 => ("E010C2", "FFFFFF"),
        1 => ("1279F3", "FFFFFF"),
        2 => ("000000", "FFFFFF"),
        3 => ("9B9B9B", "FFFFFF"),
        4 => ("A83DC2", "FFFFFF"),
        5 => ("ED77FF", "000000"),
        6 => ("F5A623", "000000"),
        7 => ("F15204", "000000"),
        11 => ("32F3C8", "000000"),
        12 => ("EA15BE", "000000"),
        _ => return None,
    };
    Some((pair.0.to_string(), pair.1.to_string()))
}
