//! Viterbi Path Search (§4.6): single-source-single-sink shortest path over the lattice under the
//! emission/transition/direction-penalty weight function.
//!
//! The lattice is a small layered DAG with exactly one source and one sink — a forward Dijkstra
//! already visits every reachable node exactly once in that setting, so this runs a plain
//! (single-direction) Dijkstra rather than the bidirectional variant used for the much larger
//! shape-edge graph in [`crate::graph::dijkstra`]; bidirectional search buys nothing when one side
//! of the frontier is a single node. See `DESIGN.md`.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::lattice::{Lattice, StateNode};
use crate::ids::ShapeId;
use crate::timetable::Timetable;

const GRAPH_THRESHOLD_M: f64 = 500.0;
const GRAPH_PENALTY_M: f64 = 1e9;
const DIRECTION_PENALTY_M: f64 = 1e5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Node {
    Source,
    State(usize, usize),
    Sink,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cost(f64);
impl Eq for Cost {}
impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Cost {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.partial_cmp(&other.0).expect("non-NaN cost")
    }
}

/// Merges `(shape_id, seq_no)` tag sets on shared shapes per §4.6.1. Returns `-1` (no shared
/// shape), `0` (direction agrees) or `1` (direction disagrees).
fn direction_penalty(u: &StateNode, v: &StateNode) -> i32 {
    let u_tags: Vec<_> = u.candidate.tags().collect();
    let v_tags: Vec<_> = v.candidate.tags().collect();

    let mut shared = 0usize;
    let mut correct = 0usize;

    for &(shape_u, seq_u) in &u_tags {
        for &(shape_v, seq_v) in &v_tags {
            if shape_u == shape_v {
                shared += 1;
                if seq_u <= seq_v {
                    correct += 1;
                }
            }
        }
    }

    if shared == 0 {
        return -1;
    }

    let min_tags = u_tags.len().min(v_tags.len()).max(1);
    if correct * 2 >= min_tags {
        0
    } else {
        1
    }
}

fn shares_edge(u: &StateNode, v: &StateNode) -> bool {
    u.from_node == v.from_node && u.to_node == v.to_node
}

fn edge_weight(timetable: &Timetable, u: &StateNode, v: &StateNode) -> f64 {
    if shares_edge(u, v) {
        return u.length_m;
    }

    let emission = crate::geo::distance_to_segment_m(u.point, u.from_coord, u.to_coord);

    let penalty = direction_penalty(u, v);
    if penalty == -1 {
        return emission + GRAPH_PENALTY_M;
    }

    let graph_cost = timetable
        .graph
        .shortest_path_cost(u.to_node, v.from_node, GRAPH_THRESHOLD_M, GRAPH_PENALTY_M);
    let transition = u.length_m + graph_cost + v.length_m;

    emission + transition + (penalty as f64) * DIRECTION_PENALTY_M
}

/// `(layer, candidate index within layer)` path through the lattice, excluding SOURCE/SINK.
pub type Path = Vec<(usize, usize)>;

pub fn find_path(timetable: &Timetable, lattice: &Lattice) -> Option<Path> {
    if lattice.layers.is_empty() {
        return None;
    }

    let mut dist: std::collections::HashMap<Node, f64> = std::collections::HashMap::new();
    let mut prev: std::collections::HashMap<Node, Node> = std::collections::HashMap::new();
    let mut heap: BinaryHeap<Reverse<(Cost, NodeOrd)>> = BinaryHeap::new();

    dist.insert(Node::Source, 0.0);
    heap.push(Reverse((Cost(0.0), NodeOrd(Node::Source))));

    while let Some(Reverse((Cost(d), NodeOrd(u)))) = heap.pop() {
        if d > *dist.get(&u).unwrap_or(&f64::INFINITY) {
            continue;
        }

        match u {
            Node::Source => {
                for (vi, v) in lattice.layers[0].iter().enumerate() {
                    let nd = d + source_weight(v);
                    relax(&mut dist, &mut prev, &mut heap, Node::State(0, vi), u, nd);
                }
            }
            Node::State(li, vi) => {
                let node = &lattice.layers[li][vi];
                if li + 1 < lattice.layers.len() {
                    for (wi, w) in lattice.layers[li + 1].iter().enumerate() {
                        let nd = d + edge_weight(timetable, node, w);
                        relax(&mut dist, &mut prev, &mut heap, Node::State(li + 1, wi), u, nd);
                    }
                } else {
                    let sink_dist = lattice.sink_distances.get(vi).copied().unwrap_or(0.0);
                    let nd = d + sink_dist * 1_000_000.0;
                    relax(&mut dist, &mut prev, &mut heap, Node::Sink, u, nd);
                }
            }
            Node::Sink => break,
        }
    }

    if !dist.contains_key(&Node::Sink) {
        return None;
    }

    let mut path = Vec::new();
    let mut cur = Node::Sink;
    while let Some(&p) = prev.get(&cur) {
        if let Node::State(li, vi) = p {
            path.push((li, vi));
        }
        cur = p;
    }
    path.reverse();

    if path.is_empty() { None } else { Some(path) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeOrd(Node);
impl PartialOrd for NodeOrd {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for NodeOrd {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        node_rank(self.0).cmp(&node_rank(other.0))
    }
}
fn node_rank(n: Node) -> (u8, usize, usize) {
    match n {
        Node::Source => (0, 0, 0),
        Node::State(l, i) => (1, l, i),
        Node::Sink => (2, 0, 0),
    }
}

fn source_weight(_v: &StateNode) -> f64 {
    1.0
}

fn relax(
    dist: &mut std::collections::HashMap<Node, f64>,
    prev: &mut std::collections::HashMap<Node, Node>,
    heap: &mut BinaryHeap<Reverse<(Cost, NodeOrd)>>,
    to: Node,
    from: Node,
    new_dist: f64,
) {
    let better = match dist.get(&to) {
        Some(&known) => new_dist < known,
        None => true,
    };
    if better {
        dist.insert(to, new_dist);
        prev.insert(to, from);
        heap.push(Reverse((Cost(new_dist), NodeOrd(to))));
    }
}

pub fn shape_vote_tags(node: &StateNode) -> impl Iterator<Item = ShapeId> + '_ {
    node.candidate.payload.iter().map(|occ| occ.shape_id)
}
