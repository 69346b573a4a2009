//! The Shape-Edge Graph (§3, §4.2): a directed graph over exact-equality `Coordinate` nodes,
//! built entirely from GTFS shapes (no street network ingestion — see `DESIGN.md` for the
//! dropped `osmpbf`/`kdtree` teacher dependencies this module replaces).

mod dijkstra;

use std::collections::HashMap;

use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::geo::{Coordinate, distance_to_segment_m, km_to_degrees};
use crate::ids::{EdgeId, NodeId, ShapeId};

pub use dijkstra::bounded_bidirectional_dijkstra;

/// A directed edge between two graph nodes, tagged with every `(shape_id, sequence_no)` pair
/// that traverses it. Multiple shapes (or the same shape visiting the same street twice) may
/// share one edge; each occurrence keeps its own sequence number.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ShapeEdge {
    pub edge_id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub length_m: f64,
    pub shapes: Vec<(ShapeId, u32)>,
}

struct EdgeEnvelope {
    edge_id: EdgeId,
    from: Coordinate,
    to: Coordinate,
}

impl RTreeObject for EdgeEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.from.lon, self.from.lat], [self.to.lon, self.to.lat])
    }
}

impl PointDistance for EdgeEnvelope {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let p = Coordinate::new(point[1], point[0]);
        let (q, _) = crate::geo::project_onto_segment(p, self.from, self.to);
        let dx = q.lon - p.lon;
        let dy = q.lat - p.lat;
        dx * dx + dy * dy
    }
}

fn coord_key(c: Coordinate) -> (u64, u64) {
    (c.lat.to_bits(), c.lon.to_bits())
}

/// Directed graph over shape edges, with an R-tree spatial index for radius queries.
pub struct ShapeEdgeGraph {
    nodes: Vec<Coordinate>,
    node_index: HashMap<(u64, u64), NodeId>,
    edges: Vec<ShapeEdge>,
    edge_index: HashMap<(NodeId, NodeId), EdgeId>,
    successors: Vec<Vec<EdgeId>>,
    predecessors: Vec<Vec<EdgeId>>,
    rtree: RTree<EdgeEnvelope>,
}

impl Default for ShapeEdgeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeEdgeGraph {
    pub fn new() -> Self {
        ShapeEdgeGraph {
            nodes: Vec::new(),
            node_index: HashMap::new(),
            edges: Vec::new(),
            edge_index: HashMap::new(),
            successors: Vec::new(),
            predecessors: Vec::new(),
            rtree: RTree::new(),
        }
    }

    pub fn get_or_create_node(&mut self, coord: Coordinate) -> NodeId {
        let key = coord_key(coord);
        if let Some(&id) = self.node_index.get(&key) {
            return id;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(coord);
        self.node_index.insert(key, id);
        self.successors.push(Vec::new());
        self.predecessors.push(Vec::new());
        id
    }

    pub fn node_coord(&self, id: NodeId) -> Coordinate {
        self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Adds (or augments) the directed edge `from -> to`, tagging it with `(shape_id, seq_no)`.
    /// An edge between the same exact pair of nodes is reused across shapes — this is the one
    /// place duplicate `(from, to)` geometry collapses into a single `ShapeEdge`.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, shape_id: u32, seq_no: u32) -> EdgeId {
        if let Some(&edge_id) = self.edge_index.get(&(from, to)) {
            self.edges[edge_id.index()]
                .shapes
                .push((ShapeId(shape_id), seq_no));
            return edge_id;
        }

        let edge_id = EdgeId(self.edges.len() as u32);
        let length_m = self.nodes[from.index()].dist(self.nodes[to.index()]);

        self.edges.push(ShapeEdge {
            edge_id,
            from,
            to,
            length_m,
            shapes: vec![(ShapeId(shape_id), seq_no)],
        });
        self.edge_index.insert((from, to), edge_id);
        self.successors[from.index()].push(edge_id);
        self.predecessors[to.index()].push(edge_id);

        self.rtree.insert(EdgeEnvelope {
            edge_id,
            from: self.nodes[from.index()],
            to: self.nodes[to.index()],
        });

        edge_id
    }

    pub fn edge(&self, id: EdgeId) -> &ShapeEdge {
        &self.edges[id.index()]
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub(crate) fn successors_of(&self, node: NodeId) -> &[EdgeId] {
        &self.successors[node.index()]
    }

    pub(crate) fn predecessors_of(&self, node: NodeId) -> &[EdgeId] {
        &self.predecessors[node.index()]
    }

    /// Every edge whose geometry intersects the disk of radius `r_km` around `center` (§4.1,
    /// §4.2): an approximate degree-space circle filters via the R-tree, then an exact
    /// point-to-segment check (still in degree space) discards edges that merely share a
    /// bounding box with the disk but don't actually cross it.
    pub fn edges_within(&self, center: Coordinate, r_km: f64) -> Vec<&ShapeEdge> {
        let r_deg = km_to_degrees(r_km);
        let r_deg_sq = r_deg * r_deg;

        self.rtree
            .locate_within_distance([center.lon, center.lat], r_deg_sq)
            .map(|env| &self.edges[env.edge_id.index()])
            .collect()
    }

    /// Great-circle distance in metres from `point` to the nearest point on `edge`.
    pub fn distance_to_edge_m(&self, edge: &ShapeEdge, point: Coordinate) -> f64 {
        distance_to_segment_m(point, self.node_coord(edge.from), self.node_coord(edge.to))
    }

    /// Bounded bidirectional Dijkstra shortest-path cost between two nodes, weighted by
    /// `length_m` (§4.2, §4.6.2). Returns `penalty` if unreachable within `threshold`.
    pub fn shortest_path_cost(
        &self,
        u: NodeId,
        v: NodeId,
        threshold: f64,
        penalty: f64,
    ) -> f64 {
        bounded_bidirectional_dijkstra(self, u, v, threshold, penalty)
    }

    /// A serializable projection of the graph (§9 snapshot persistence): node coordinates plus
    /// edges in insertion order. The R-tree and adjacency lists are derived, not stored.
    pub fn to_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.iter().map(|e| (e.from, e.to, e.shapes.clone())).collect(),
        }
    }

    /// Rebuilds a graph from a [`GraphSnapshot`], replaying every edge through `add_edge` so the
    /// R-tree, adjacency lists and `(from, to)` dedup table all come back exactly as ingestion
    /// would have built them.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        let mut graph = ShapeEdgeGraph::new();
        for &coord in &snapshot.nodes {
            graph.get_or_create_node(coord);
        }
        for (from, to, shapes) in snapshot.edges {
            for (shape_id, seq_no) in shapes {
                graph.add_edge(from, to, shape_id.0, seq_no);
            }
        }
        graph
    }
}

/// Serializable form of [`ShapeEdgeGraph`] (§9 snapshot persistence): everything else on the
/// live struct — the R-tree, adjacency lists, `(from, to)` dedup table — is rebuilt from this on
/// load via [`ShapeEdgeGraph::from_snapshot`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Coordinate>,
    pub edges: Vec<(NodeId, NodeId, Vec<(ShapeId, u32)>)>,
}
