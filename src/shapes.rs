//! `/shapes` (§6): reconstructs a shape's polyline by walking the Shape-Edge Graph from its seed
//! edge, always choosing the outgoing edge tagged with the smallest unvisited sequence number
//! for that shape (DESIGN.md Open Question: ties broken by ingestion insertion order).

use crate::geo::Coordinate;
use crate::ids::{EdgeId, ShapeId};
use crate::timetable::Timetable;

const MAX_STEPS: usize = 100_000;

/// The walked polyline, or empty if `shape_id` is unknown. First point is the shape's seed edge
/// start; length is the number of distinct edges walked, plus one (§8 S6).
pub fn walk_shape_polyline(timetable: &Timetable, shape_id: ShapeId) -> Vec<Coordinate> {
    let Some(record) = timetable.shapes.get(&shape_id) else {
        return Vec::new();
    };
    let graph = &timetable.graph;

    let mut visited: std::collections::HashSet<EdgeId> = std::collections::HashSet::new();
    let mut coords = Vec::new();

    let mut current = record.seed_edge;
    coords.push(graph.node_coord(graph.edge(current).from));

    for _ in 0..MAX_STEPS {
        if !visited.insert(current) {
            break;
        }
        let edge = graph.edge(current);
        coords.push(graph.node_coord(edge.to));

        let next = graph
            .successors_of(edge.to)
            .iter()
            .filter(|&&succ_id| !visited.contains(&succ_id))
            .filter_map(|&succ_id| {
                graph
                    .edge(succ_id)
                    .shapes
                    .iter()
                    .filter(|&&(sid, _)| sid == shape_id)
                    .map(|&(_, seq)| seq)
                    .min()
                    .map(|seq| (seq, succ_id))
            })
            .min_by_key(|&(seq, _)| seq);

        match next {
            Some((_, next_edge)) => current = next_edge,
            None => break,
        }
    }

    coords
}
