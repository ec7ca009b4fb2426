// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

/// Connectivity lookups derived from the face list. All per-node tables are
/// indexed by the position of the node in the graph's node list.
#[derive(Debug, Clone, Default)]
pub struct Adjacency {
    incident: Vec<SVec<usize>>,
    neighbors: Vec<SVec<NodeId>>,
    edges: Vec<(NodeId, NodeId)>,
    /// For each entry in `edges`, the number of faces using it.
    edge_faces: Vec<u32>,
}

impl Adjacency {
    #[profiling::function]
    pub(crate) fn build(nodes: &[Vertex], faces: &[Face], index: &HashMap<NodeId, usize>) -> Self {
        let mut incident = vec![SVec::new(); nodes.len()];
        let mut neighbors = vec![SVec::<NodeId>::new(); nodes.len()];
        let mut edges = Vec::new();
        let mut edge_faces = Vec::new();
        let mut edge_ids = HashMap::<(NodeId, NodeId), usize>::new();

        for (face_idx, face) in faces.iter().enumerate() {
            for (a, b) in face.edges() {
                let (ia, ib) = (index[&a], index[&b]);
                incident[ia].push(face_idx);

                let key = if a < b { (a, b) } else { (b, a) };
                match edge_ids.get(&key) {
                    Some(&e) => edge_faces[e] += 1,
                    None => {
                        edge_ids.insert(key, edges.len());
                        edges.push((a, b));
                        edge_faces.push(1);
                        neighbors[ia].push(b);
                        neighbors[ib].push(a);
                    }
                }
            }
        }

        for ns in neighbors.iter_mut() {
            ns.sort_unstable();
        }

        Self {
            incident,
            neighbors,
            edges,
            edge_faces,
        }
    }

    pub fn incident_faces(&self, node_index: usize) -> &[usize] {
        self.incident
            .get(node_index)
            .map(|fs| fs.as_slice())
            .unwrap_or(&[])
    }

    pub fn neighbors(&self, node_index: usize) -> &[NodeId] {
        self.neighbors
            .get(node_index)
            .map(|ns| ns.as_slice())
            .unwrap_or(&[])
    }

    pub fn edges(&self) -> &[(NodeId, NodeId)] {
        &self.edges
    }

    /// Edges used by a single face, i.e. lying on an open boundary.
    pub fn boundary_edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.edges
            .iter_cpy()
            .zip(self.edge_faces.iter_cpy())
            .filter(|(_, count)| *count == 1)
            .map(|(edge, _)| edge)
    }

    /// Edges used by more than two faces.
    pub fn non_manifold_edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.edges
            .iter_cpy()
            .zip(self.edge_faces.iter_cpy())
            .filter(|(_, count)| *count > 2)
            .map(|(edge, _)| edge)
    }
}
