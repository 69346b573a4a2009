//! The Candidate Filter (§4.4): `get_close_edges`, restricting nearby shape edges to those
//! currently traversed by a schedule-active trip.

use chrono::NaiveDateTime;

use crate::geo::Coordinate;
use crate::ids::{EdgeId, RouteId, ServiceId, ShapeId, TripId};
use crate::timetable::{RealtimeTable, Timetable};

/// One `(service, trip, route)` tuple active on a candidate edge, plus the segments of that trip
/// currently bracketing `t_local`.
#[derive(Debug, Clone)]
pub struct TripOnEdge {
    pub service_id: ServiceId,
    pub trip_id: TripId,
    pub route_id: RouteId,
    pub segment_ids: Vec<usize>,
}

/// One `(shape_id, seq_no)` occurrence of a candidate edge, plus every trip found active on it.
#[derive(Debug, Clone)]
pub struct ShapeOccurrence {
    pub shape_id: ShapeId,
    pub seq_no: u32,
    pub trips: Vec<TripOnEdge>,
}

/// An edge near the query point that survived the activity filter.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub edge_id: EdgeId,
    pub length_m: f64,
    pub from: Coordinate,
    pub to: Coordinate,
    pub payload: Vec<ShapeOccurrence>,
    pub exact_dist_m: f64,
}

impl Candidate {
    /// All `(shape_id, seq_no)` tags carried by this candidate, for the direction penalty (§4.6.1).
    pub fn tags(&self) -> impl Iterator<Item = (ShapeId, u32)> + '_ {
        self.payload.iter().map(|occ| (occ.shape_id, occ.seq_no))
    }
}

#[allow(clippy::too_many_arguments)]
pub fn get_close_edges(
    timetable: &Timetable,
    realtime: Option<&RealtimeTable>,
    point: Coordinate,
    t_local: NaiveDateTime,
    max_dist_km: f64,
    delay_secs: i64,
    earliness_secs: i64,
    ignore_time: bool,
) -> Vec<Candidate> {
    let nearby = timetable.graph.edges_within(point, max_dist_km);

    let mut by_shape: std::collections::HashMap<ShapeId, Vec<(f64, &crate::graph::ShapeEdge)>> =
        std::collections::HashMap::new();
    for edge in &nearby {
        let exact = timetable.graph.distance_to_edge_m(edge, point);
        for &(shape_id, _seq) in &edge.shapes {
            by_shape.entry(shape_id).or_default().push((exact, edge));
        }
    }

    let mut candidates = Vec::new();

    for occurrences in by_shape.values_mut() {
        occurrences.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        for &(exact_dist_m, edge) in occurrences.iter() {
            let mut payload = Vec::new();

            for &(shape_id, seq_no) in &edge.shapes {
                let trips = active_trips_on_edge(
                    timetable,
                    realtime,
                    shape_id,
                    edge.edge_id,
                    t_local,
                    delay_secs,
                    earliness_secs,
                    ignore_time,
                );
                if !trips.is_empty() {
                    payload.push(ShapeOccurrence {
                        shape_id,
                        seq_no,
                        trips,
                    });
                }
            }

            if !payload.is_empty() {
                candidates.push(Candidate {
                    edge_id: edge.edge_id,
                    length_m: edge.length_m,
                    from: timetable.graph.node_coord(edge.from),
                    to: timetable.graph.node_coord(edge.to),
                    payload,
                    exact_dist_m,
                });
            }
        }
    }

    candidates.sort_by(|a, b| {
        a.exact_dist_m
            .partial_cmp(&b.exact_dist_m)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates
}

/// §4.3's `active_trips_on_edge`: every `(service, trip, route)` with at least one active segment
/// on `edge_id` belonging to `shape_id`.
#[allow(clippy::too_many_arguments)]
fn active_trips_on_edge(
    timetable: &Timetable,
    realtime: Option<&RealtimeTable>,
    shape_id: ShapeId,
    edge_id: EdgeId,
    t_local: NaiveDateTime,
    delay_secs: i64,
    earliness_secs: i64,
    ignore_time: bool,
) -> Vec<TripOnEdge> {
    let mut out = Vec::new();

    for (trip_idx, schedule) in timetable.trip_schedules.iter().enumerate() {
        if schedule.shape_id != shape_id {
            continue;
        }
        let trip_id = TripId(trip_idx as u32);

        let segment_ids = if ignore_time {
            vec![0]
        } else {
            timetable.active_segments(
                trip_id,
                edge_id,
                t_local,
                realtime,
                false,
                delay_secs,
                earliness_secs,
            )
        };

        if segment_ids.is_empty() {
            continue;
        }

        let trip = timetable.trip(trip_id);
        out.push(TripOnEdge {
            service_id: trip.service_id,
            trip_id,
            route_id: trip.route_id,
            segment_ids,
        });
    }

    out
}
