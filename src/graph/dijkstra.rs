//! Bounded bidirectional Dijkstra over the Shape-Edge Graph (§4.6.2).
//!
//! A neighbour whose tentative distance exceeds `threshold` stops the expansion of the
//! remaining neighbours of that node outright — the scan breaks rather than continues, so a
//! later, closer neighbour further down the same adjacency list would not be examined either.
//! This matches the reference bound: worst-case work is capped per expansion, not merely per
//! accepted edge.
//!
//! The two frontiers can meet at more than one node before either side finishes scanning —
//! branching shapes share edges at junctions. The search keeps the minimum total over every
//! meeting seen so far and only returns once a node has been finalized on both sides, matching
//! the reference `bidirectional_dijkstra_modified`'s `finaldist` bookkeeping rather than
//! returning on the first tentative meeting.

use std::cmp::Reverse;
use std::collections::HashMap;

use priority_queue::PriorityQueue;

use super::ShapeEdgeGraph;
use crate::ids::NodeId;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Dist(f64);

impl Eq for Dist {}

impl PartialOrd for Dist {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Dist {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.partial_cmp(&other.0).expect("non-NaN distance")
    }
}

/// Returns the shortest directed-path length from `source` to `target` along edge lengths,
/// bounded by `threshold` per expansion step; `penalty` if no meeting point is found.
pub fn bounded_bidirectional_dijkstra(
    graph: &ShapeEdgeGraph,
    source: NodeId,
    target: NodeId,
    threshold: f64,
    penalty: f64,
) -> f64 {
    if source == target {
        return 0.0;
    }

    let mut fringe: [PriorityQueue<NodeId, Reverse<Dist>>; 2] =
        [PriorityQueue::new(), PriorityQueue::new()];
    let mut finished: [HashMap<NodeId, f64>; 2] = [HashMap::new(), HashMap::new()];
    let mut seen: [HashMap<NodeId, f64>; 2] = [HashMap::new(), HashMap::new()];
    let mut best_total = penalty;

    fringe[0].push(source, Reverse(Dist(0.0)));
    fringe[1].push(target, Reverse(Dist(0.0)));
    seen[0].insert(source, 0.0);
    seen[1].insert(target, 0.0);

    let mut dir = 1usize;

    while !fringe[0].is_empty() && !fringe[1].is_empty() {
        dir = 1 - dir;

        let (v, Reverse(Dist(dist))) = match fringe[dir].pop() {
            Some(x) => x,
            None => break,
        };

        if finished[dir].contains_key(&v) {
            continue;
        }
        finished[dir].insert(v, dist);

        if let Some(&other_dist) = finished[1 - dir].get(&v) {
            let total = dist + other_dist;
            if total < best_total {
                best_total = total;
            }
            return best_total;
        }

        let neighbours: &[crate::ids::EdgeId] = if dir == 0 {
            graph.successors_of(v)
        } else {
            graph.predecessors_of(v)
        };

        for &edge_id in neighbours {
            let edge = graph.edge(edge_id);
            let w = if dir == 0 { edge.to } else { edge.from };
            let vw_length = dist + edge.length_m;

            if vw_length > threshold {
                break;
            }

            if finished[dir].contains_key(&w) {
                continue;
            }

            let improves = match seen[dir].get(&w) {
                Some(&known) => vw_length < known,
                None => true,
            };

            if improves {
                seen[dir].insert(w, vw_length);
                fringe[dir].push(w, Reverse(Dist(vw_length)));

                if let (Some(&d0), Some(&d1)) = (seen[0].get(&w), seen[1].get(&w)) {
                    let total = d0 + d1;
                    if total < best_total {
                        best_total = total;
                    }
                }
            }
        }
    }

    best_total
}
