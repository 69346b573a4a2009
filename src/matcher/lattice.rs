//! The HMM Lattice Builder (§4.5): turns a GPS trace into a layered DAG of candidate edges
//! bracketed by synthetic SOURCE/SINK nodes.

use chrono::NaiveDateTime;

use super::candidate::{Candidate, get_close_edges};
use crate::geo::Coordinate;
use crate::ids::{EdgeId, NodeId};
use crate::timetable::{RealtimeTable, Timetable};

/// One raw GPS fix: WGS84 point plus a local (timezone-resolved) timestamp.
#[derive(Debug, Clone, Copy)]
pub struct Fix {
    pub point: Coordinate,
    pub t_local: NaiveDateTime,
}

/// A lattice node: the candidate edge plus the fix it was generated from.
#[derive(Debug, Clone)]
pub struct StateNode {
    pub point: Coordinate,
    pub t_local: NaiveDateTime,
    pub edge_id: EdgeId,
    pub length_m: f64,
    pub from_node: NodeId,
    pub to_node: NodeId,
    pub from_coord: Coordinate,
    pub to_coord: Coordinate,
    pub candidate: Candidate,
}

pub struct MatchParams {
    pub max_dist_km: f64,
    pub slack: f64,
    pub delay_secs: i64,
    pub earliness_secs: i64,
    pub ignore_time: bool,
}

/// The layered lattice: `layers[i]` holds the candidates surviving fix `i` (fixes that were
/// skipped under the slack budget simply contribute no layer). `sink_distances[j]` is the
/// `distance(last_fix, node)` annotation for `layers.last()[j]` (§4.5 step 3).
pub struct Lattice {
    pub layers: Vec<Vec<StateNode>>,
    pub sink_distances: Vec<f64>,
}

pub fn build_lattice(
    timetable: &Timetable,
    graph_from_nodes: impl Fn(EdgeId) -> (NodeId, NodeId),
    realtime: Option<&RealtimeTable>,
    fixes: &[Fix],
    params: &MatchParams,
) -> Lattice {
    let mut slack_budget = ((fixes.len() as f64) * params.slack).floor() as i64;
    let mut layers: Vec<Vec<StateNode>> = Vec::new();

    for fix in fixes {
        let candidates = get_close_edges(
            timetable,
            realtime,
            fix.point,
            fix.t_local,
            params.max_dist_km,
            params.delay_secs,
            params.earliness_secs,
            params.ignore_time,
        );

        if candidates.is_empty() {
            if slack_budget > 0 {
                slack_budget -= 1;
                continue;
            }
            layers.push(Vec::new());
            continue;
        }

        let layer = candidates
            .into_iter()
            .map(|c| {
                let (from_node, to_node) = graph_from_nodes(c.edge_id);
                StateNode {
                    point: fix.point,
                    t_local: fix.t_local,
                    edge_id: c.edge_id,
                    length_m: c.length_m,
                    from_node,
                    to_node,
                    from_coord: c.from,
                    to_coord: c.to,
                    candidate: c,
                }
            })
            .collect();
        layers.push(layer);
    }

    layers.retain(|layer| !layer.is_empty());

    let sink_distances = match layers.last() {
        Some(last_layer) => {
            let last_point = fixes.last().map(|f| f.point).unwrap_or(Coordinate::new(0.0, 0.0));
            last_layer
                .iter()
                .map(|n| crate::geo::distance_to_segment_m(last_point, n.from_coord, n.to_coord))
                .collect()
        }
        None => Vec::new(),
    };

    Lattice { layers, sink_distances }
}
