//! Identity Resolver (§4.7): elects the most likely `(shape, service, trip, route)` for a matched
//! path, with a schedule-time-residual tie-break (§4.7.1).

use std::collections::HashMap;

use super::lattice::{Lattice, StateNode};
use super::viterbi::Path;
use crate::geo::project_onto_segment;
use crate::ids::{RouteId, ServiceId, ShapeId, TripId};
use crate::timetable::Timetable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Tuple {
    shape_id: ShapeId,
    service_id: ServiceId,
    trip_id: TripId,
    route_id: RouteId,
}

/// The elected identity plus the recovered segment ids on the last node that carried it.
#[derive(Debug, Clone)]
pub struct Identity {
    pub shape_id: ShapeId,
    pub service_id: ServiceId,
    pub trip_id: TripId,
    pub route_id: RouteId,
    pub segment_ids: Vec<usize>,
}

pub struct IdentityParams {
    pub prefer_last_trip: bool,
    pub last_trip_id_hint: Option<TripId>,
    pub time_after: bool,
}

pub fn resolve_identity(
    timetable: &Timetable,
    lattice: &Lattice,
    path: &Path,
    params: &IdentityParams,
) -> Option<Identity> {
    if path.is_empty() {
        return None;
    }

    let nodes: Vec<&StateNode> = path.iter().map(|&(l, i)| &lattice.layers[l][i]).collect();

    // Shape vote: per node, count each distinct shape once.
    let mut shape_counts: HashMap<ShapeId, usize> = HashMap::new();
    for node in &nodes {
        let mut seen = std::collections::HashSet::new();
        for occ in &node.candidate.payload {
            if seen.insert(occ.shape_id) {
                *shape_counts.entry(occ.shape_id).or_insert(0) += 1;
            }
        }
    }
    let max_shape_count = *shape_counts.values().max()?;
    let winning_shapes: std::collections::HashSet<ShapeId> = shape_counts
        .into_iter()
        .filter(|&(_, c)| c == max_shape_count)
        .map(|(s, _)| s)
        .collect();

    // Trip vote: count (service, trip, route, shape) tuples restricted to winning shapes.
    let mut tuple_counts: HashMap<Tuple, usize> = HashMap::new();
    let mut tuple_order: Vec<Tuple> = Vec::new();
    for node in &nodes {
        for occ in &node.candidate.payload {
            if !winning_shapes.contains(&occ.shape_id) {
                continue;
            }
            for trip in &occ.trips {
                let t = Tuple {
                    shape_id: occ.shape_id,
                    service_id: trip.service_id,
                    trip_id: trip.trip_id,
                    route_id: trip.route_id,
                };
                if !tuple_counts.contains_key(&t) {
                    tuple_order.push(t);
                }
                *tuple_counts.entry(t).or_insert(0) += 1;
            }
        }
    }
    let max_tuple_count = *tuple_counts.values().max()?;
    let winners: Vec<Tuple> = tuple_order
        .into_iter()
        .filter(|t| tuple_counts[t] == max_tuple_count)
        .collect();

    let elected = if winners.len() == 1 {
        winners[0]
    } else if params.prefer_last_trip
        && let Some(hint) = params.last_trip_id_hint
        && let Some(t) = winners.iter().find(|t| t.trip_id == hint)
    {
        *t
    } else if params.time_after {
        winners
            .iter()
            .min_by(|a, b| {
                let ra = average_residual(timetable, &nodes, **a);
                let rb = average_residual(timetable, &nodes, **b);
                ra.partial_cmp(&rb).unwrap_or(std::cmp::Ordering::Equal)
            })
            .copied()
            .unwrap_or(winners[0])
    } else {
        winners[0]
    };

    // Segment recovery: walk the path in reverse, take the first node carrying the elected tuple.
    for node in nodes.iter().rev() {
        for occ in &node.candidate.payload {
            if occ.shape_id != elected.shape_id {
                continue;
            }
            for trip in &occ.trips {
                if trip.service_id == elected.service_id
                    && trip.trip_id == elected.trip_id
                    && trip.route_id == elected.route_id
                {
                    return Some(Identity {
                        shape_id: elected.shape_id,
                        service_id: elected.service_id,
                        trip_id: elected.trip_id,
                        route_id: elected.route_id,
                        segment_ids: trip.segment_ids.clone(),
                    });
                }
            }
        }
    }

    None
}

/// §4.7.1: average absolute schedule-time residual, in seconds, across every path node where
/// `tuple` is present.
fn average_residual(timetable: &Timetable, nodes: &[&StateNode], tuple: Tuple) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;

    for node in nodes {
        for occ in &node.candidate.payload {
            if occ.shape_id != tuple.shape_id {
                continue;
            }
            for trip in &occ.trips {
                if trip.trip_id != tuple.trip_id || trip.route_id != tuple.route_id {
                    continue;
                }
                if let Some(r) = schedule_time_residual(timetable, node, trip.trip_id, &trip.segment_ids) {
                    total += r;
                    count += 1;
                }
            }
        }
    }

    if count == 0 { f64::INFINITY } else { total / count as f64 }
}

/// §4.7.1: for each candidate segment, projects the fix onto the segment's stored polyline to
/// get `fraction_travelled`, interpolates the bracketing stop times, applies the same day-shift
/// matrix §4.3 uses for `active_segments` (the segment's endpoints may sit on either side of
/// midnight relative to the fix), and returns the smallest absolute residual in seconds.
fn schedule_time_residual(
    timetable: &Timetable,
    node: &StateNode,
    trip_id: TripId,
    segs: &[usize],
) -> Option<f64> {
    use chrono::Timelike;

    let trip = timetable.trip(trip_id);
    let shape_hash = timetable.shape_hash_of.get(&timetable.trip_schedule(trip_id).shape_id)?;
    let index = timetable.edge_index.get(shape_hash)?;

    let (_, user_overtime) = timetable.is_trip_active(trip_id, node.t_local, None);
    let user_secs = node.t_local.time().num_seconds_from_midnight() as f64;

    let mut best: Option<f64> = None;

    for &seg in segs {
        if seg + 1 >= trip.stop_times.len() {
            continue;
        }
        let (polyline_a, polyline_b) = match index.segment_polylines.get(seg) {
            Some(p) => *p,
            None => continue,
        };
        let (_, fraction) = project_onto_segment(node.point, polyline_a, polyline_b);

        let start = trip.stop_times[seg];
        let end = trip.stop_times[seg + 1];
        let start_secs = start.arrival.secs as f64;
        let end_secs = end.arrival.secs as f64;

        let (td_start, td_end) =
            crate::timetable::day_shift(user_overtime, start.arrival.overflow, end.arrival.overflow);
        let shift_secs = td_start as f64 * 86_400.0 * (1.0 - fraction) + td_end as f64 * 86_400.0 * fraction;

        let optimal = start_secs + (end_secs - start_secs) * fraction + shift_secs;

        let residual = (optimal - user_secs).abs();
        best = Some(best.map_or(residual, |b: f64| b.min(residual)));
    }

    best
}
