// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use float_ord::FloatOrd;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use super::collapse_face;
use crate::prelude::*;

slotmap::new_key_type! { struct FaceKey; }

/// How far a reduction should go.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReduceTarget {
    /// Reduce to this number of nodes.
    Count(usize),
    /// Reduce to this fraction of the original node count, rounding up.
    Ratio(f32),
}

impl ReduceTarget {
    /// The node count this target asks for, for a graph of `original` nodes.
    /// Never larger than `original`.
    pub fn node_count(&self, original: usize) -> usize {
        match *self {
            ReduceTarget::Count(n) => n.min(original),
            ReduceTarget::Ratio(r) if r.is_nan() => original,
            ReduceTarget::Ratio(r) => {
                let r = r.clamp(0.0, 1.0) as f64;
                ((r * original as f64).ceil() as usize).min(original)
            }
        }
    }
}

/// The outcome of [`reduce`]. The graph is returned even when the target
/// could not be reached.
#[derive(Debug, Clone)]
pub struct Reduction {
    pub graph: MeshGraph,
    /// Node count before the reduction.
    pub original: usize,
    /// Requested node count.
    pub target: usize,
    /// Node count after the reduction.
    pub achieved: usize,
    pub collapses: usize,
}

impl Reduction {
    pub fn target_reached(&self) -> bool {
        self.achieved <= self.target
    }

    pub fn into_graph(self) -> MeshGraph {
        self.graph
    }
}

impl std::fmt::Display for Reduction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Reduction: {} -> {} nodes (target {}, {} collapses)",
            self.original, self.achieved, self.target, self.collapses
        )
    }
}

/// Priority of an edge collapse. The derived order sorts by length, then by
/// the sum of both ids, then by the lowest id.
type EdgeKey = (FloatOrd<f32>, u64, NodeId, NodeId);

/// Mutable working copy of the graph used while collapsing edges. Nodes are
/// addressed by their position in the original node list.
struct Collapser {
    nodes: Vec<Vertex>,
    alive: Vec<bool>,
    alive_count: usize,
    index: HashMap<NodeId, usize>,
    faces: SlotMap<FaceKey, SVec<NodeId>>,
    incident: Vec<SVec<FaceKey>>,
    neighbors: Vec<SVec<NodeId>>,
    queue: BinaryHeap<Reverse<EdgeKey>>,
}

impl Collapser {
    fn new(graph: &MeshGraph) -> Self {
        let nodes = graph.nodes().to_vec();
        let index: HashMap<NodeId, usize> =
            nodes.iter().enumerate().map(|(i, v)| (v.id(), i)).collect();

        let mut faces = SlotMap::with_capacity_and_key(graph.face_count());
        let mut incident = vec![SVec::new(); nodes.len()];
        for face in graph.faces() {
            let key = faces.insert(SVec::from_slice(face.vertices()));
            for id in face.vertices() {
                incident[index[id]].push(key);
            }
        }

        let neighbors = nodes
            .iter()
            .map(|v| SVec::from_slice(graph.neighbors(v.id())))
            .collect_vec();

        let mut this = Self {
            alive: vec![true; nodes.len()],
            alive_count: nodes.len(),
            nodes,
            index,
            faces,
            incident,
            neighbors,
            queue: BinaryHeap::new(),
        };
        for (a, b) in graph.edges().iter_cpy() {
            this.push_edge(a, b);
        }
        this
    }

    fn edge_length(&self, a: NodeId, b: NodeId) -> f32 {
        let (pa, pb) = (
            self.nodes[self.index[&a]].position,
            self.nodes[self.index[&b]].position,
        );
        pa.distance(pb)
    }

    fn push_edge(&mut self, a: NodeId, b: NodeId) {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let len = self.edge_length(lo, hi);
        self.queue.push(Reverse((
            FloatOrd(len),
            lo.get() as u64 + hi.get() as u64,
            lo,
            hi,
        )));
    }

    /// Entries are never removed from the queue. Instead, when popped, they
    /// are checked against the current state of the mesh.
    fn is_current(&self, lo: NodeId, hi: NodeId, len: f32) -> bool {
        let (il, ih) = (self.index[&lo], self.index[&hi]);
        self.alive[il]
            && self.alive[ih]
            && self.neighbors[il].contains(&hi)
            && self.edge_length(lo, hi) == len
    }

    /// Nodes sharing an edge with `node_index`, recomputed from its faces.
    fn neighbors_from_faces(&self, node_index: usize) -> SVec<NodeId> {
        let id = self.nodes[node_index].id;
        let mut ns = SVec::new();
        for key in self.incident[node_index].iter_cpy() {
            let face = &self.faces[key];
            if let Some(pos) = face.iter().position(|x| *x == id) {
                ns.push(face[(pos + 1) % face.len()]);
                ns.push(face[(pos + face.len() - 1) % face.len()]);
            }
        }
        ns.sort_unstable();
        ns.dedup();
        ns
    }

    /// Collapses the edge `keep - gone`. `keep` moves to the middle of the
    /// edge and takes the place of `gone` in every face.
    fn collapse(&mut self, keep: NodeId, gone: NodeId) {
        let (ik, ig) = (self.index[&keep], self.index[&gone]);
        self.nodes[ik] = midpoint(&self.nodes[ik], &self.nodes[ig]);
        self.alive[ig] = false;
        self.alive_count -= 1;

        // Every node of a rewritten or removed face may lose or gain edges,
        // not only the neighbors of the collapsed pair.
        let mut affected: SVec<NodeId> = self.neighbors[ik].clone();
        affected.extend(self.neighbors[ig].iter_cpy());

        for key in std::mem::take(&mut self.incident[ig]) {
            let replaced = self.faces[key]
                .iter()
                .map(|id| if *id == gone { keep } else { *id })
                .collect_svec();
            affected.extend(replaced.iter_cpy());
            match collapse_face(&replaced) {
                Some(face) => {
                    self.faces[key] = face;
                    if !self.incident[ik].contains(&key) {
                        self.incident[ik].push(key);
                    }
                }
                None => {
                    self.faces.remove(key);
                    for id in replaced.iter().unique() {
                        self.incident[self.index[id]].retain(|k| *k != key);
                    }
                }
            }
        }

        self.neighbors[ig].clear();
        for id in affected.into_iter().chain(std::iter::once(keep)).unique() {
            let i = self.index[&id];
            if self.alive[i] {
                self.neighbors[i] = self.neighbors_from_faces(i);
            }
        }
        for n in self.neighbors[ik].clone() {
            self.push_edge(keep, n);
        }
    }

    fn finish(self) -> MeshGraph {
        let nodes = self
            .nodes
            .into_iter()
            .zip(self.alive)
            .filter_map(|(v, alive)| alive.then_some(v))
            .collect_vec();
        // Faces are never inserted after a removal, so slot order is the
        // original face order.
        let faces = self.faces.into_iter().map(|(_, ids)| Face(ids)).collect_vec();
        MeshGraph::from_parts_unchecked(nodes, faces)
    }
}

fn midpoint(keep: &Vertex, gone: &Vertex) -> Vertex {
    let mut v = keep.moved(keep.position.lerp(gone.position, 0.5));
    if let (Some(a), Some(b)) = (keep.normal, gone.normal) {
        let n = (a + b).normalize_or_zero();
        v.normal = Some(if n == Vec3::ZERO { a } else { n });
    }
    if let (Some(a), Some(b)) = (keep.uv, gone.uv) {
        v.uv = Some(a.lerp(b, 0.5));
    }
    v
}

/// Decimates `graph` by collapsing edges, shortest first, until it has no
/// more than the requested number of nodes. Among edges of the same length,
/// the one with the lowest sum of ids goes first, then the one with the
/// lowest id. Each collapse keeps the lower id of the two nodes, placed at
/// the middle of the edge.
///
/// When no edge is left to collapse before reaching the target, the best
/// graph obtained is returned and a warning is logged. Check
/// [`Reduction::target_reached`] to tell the two situations apart.
#[profiling::function]
pub fn reduce(graph: &MeshGraph, target: ReduceTarget) -> Reduction {
    let original = graph.node_count();
    let target = target.node_count(original);

    let mut collapser = Collapser::new(graph);
    let mut collapses = 0;
    while collapser.alive_count > target {
        let Some(Reverse((len, _, lo, hi))) = collapser.queue.pop() else {
            break;
        };
        if collapser.is_current(lo, hi, len.0) {
            collapser.collapse(lo, hi);
            collapses += 1;
        }
    }

    let graph = collapser.finish();
    let reduction = Reduction {
        original,
        target,
        achieved: graph.node_count(),
        collapses,
        graph,
    };
    if !reduction.target_reached() {
        log::warn!(
            "Could not reduce mesh to {} nodes, no collapsible edge left at {} nodes",
            reduction.target,
            reduction.achieved
        );
    }
    reduction
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn target_resolution() {
        assert_eq!(ReduceTarget::Count(10).node_count(25), 10);
        assert_eq!(ReduceTarget::Count(100).node_count(25), 25);
        assert_eq!(ReduceTarget::Ratio(0.5).node_count(25), 13);
        assert_eq!(ReduceTarget::Ratio(2.0).node_count(25), 25);
        assert_eq!(ReduceTarget::Ratio(-1.0).node_count(25), 0);
        assert_eq!(ReduceTarget::Ratio(f32::NAN).node_count(25), 25);
    }

    #[test]
    fn reduce_reaches_target() {
        let grid = primitives::Grid::build(Vec3::ZERO, Vec2::splat(4.0), (4, 4));
        assert_eq!(grid.node_count(), 25);

        for n in [24, 20, 12] {
            let reduction = reduce(&grid, ReduceTarget::Count(n));
            assert!(reduction.target_reached());
            assert_eq!(reduction.achieved, n);
            assert_eq!(reduction.graph.node_count(), n);
            assert!(reduction.graph.validate().is_ok());
        }

        let half = reduce(&grid, ReduceTarget::Ratio(0.5));
        assert_eq!(half.target, 13);
        assert_eq!(half.graph.node_count(), 13);
    }

    #[test]
    fn reduce_is_monotonic() {
        let sphere = primitives::UVSphere::build(Vec3::ZERO, 10, 6, 1.0);
        let mut previous = sphere.node_count();
        for r in [0.9, 0.7, 0.5, 0.3, 0.1] {
            let reduction = reduce(&sphere, ReduceTarget::Ratio(r));
            assert!(reduction.graph.node_count() <= sphere.node_count());
            assert!(reduction.graph.node_count() <= previous);
            previous = reduction.graph.node_count();
        }
    }

    #[test]
    fn reduce_noop_when_below_target() {
        let cube = primitives::Box::build(Vec3::ZERO, Vec3::ONE);
        let reduction = reduce(&cube, ReduceTarget::Count(8));
        assert_eq!(reduction.collapses, 0);
        assert_eq!(reduction.graph, cube);
    }

    #[test]
    fn shortest_edge_goes_first() {
        // A 2x1 rectangle: the two short edges tie on length and on the sum
        // of their ids (1 + 2 and 0 + 3), so the one holding node 0 wins.
        let rect = primitives::Quad::build(Vec3::ZERO, Vec3::Y, Vec3::X, Vec2::new(2.0, 1.0));
        let reduction = reduce(&rect, ReduceTarget::Count(3));
        let g = reduction.graph;
        assert_eq!(g.node_count(), 3);
        assert!(!g.contains(NodeId(3)));
        assert_eq!(g.faces()[0].vertices(), &[NodeId(0), NodeId(1), NodeId(2)]);
        assert!(g
            .position(NodeId(0))
            .unwrap()
            .abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn lowest_id_sum_breaks_ties() {
        let square = primitives::Quad::build(Vec3::ZERO, Vec3::Y, Vec3::X, Vec2::ONE);
        let g = reduce(&square, ReduceTarget::Count(3)).graph;
        assert!(!g.contains(NodeId(1)));
        assert_eq!(g.faces()[0].vertices(), &[NodeId(0), NodeId(2), NodeId(3)]);
    }

    #[test]
    fn unreachable_target_returns_best_effort() {
        let tri =
            MeshGraph::from_polygons(&[Vec3::ZERO, Vec3::X, Vec3::Y], &[[0u32, 1, 2]]).unwrap();
        let reduction = reduce(&tri, ReduceTarget::Count(1));
        assert!(!reduction.target_reached());
        assert_eq!(reduction.achieved, 2);
        assert_eq!(reduction.graph.face_count(), 0);
        assert!(reduction.to_string().contains("3 -> 2 nodes"));
    }

    #[test]
    fn removed_faces_drop_their_edges() {
        // Collapsing 0-1 removes both faces, so 3-4 is no longer an edge.
        let positions = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.1, 0.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
            Vec3::new(-0.5, 2.0, 0.0),
            Vec3::new(1.0, 1.5, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(0.05, -1.5, 0.0),
        ];
        let polygons: Vec<Vec<u32>> = vec![vec![0, 2, 3, 4, 1, 5], vec![0, 1, 6]];
        let g = MeshGraph::from_polygons(&positions, &polygons).unwrap();

        let reduction = reduce(&g, ReduceTarget::Count(1));
        assert_eq!(reduction.collapses, 1);
        assert_eq!(reduction.achieved, 6);
        assert_eq!(reduction.graph.face_count(), 0);
        assert!(!reduction.target_reached());
        assert_eq!(reduction.graph.position(NodeId(3)), Some(positions[3]));
        assert_eq!(reduction.graph.position(NodeId(4)), Some(positions[4]));
        assert!(!reduction.graph.contains(NodeId(1)));
    }
}
