// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use super::collapse_face;
use crate::prelude::*;

/// A correspondence between node ids, `old -> new`. Ids missing from the
/// mapping are left as they are.
pub type MergeMapping = HashMap<NodeId, NodeId>;

/// Parses a mapping written as a ron map, e.g. `{ 8: 0, 9: 3 }`.
pub fn mapping_from_ron_str(source: &str) -> Result<MergeMapping> {
    ron::from_str(source).map_err(|err| MeshGraphError::config(err.to_string()))
}

pub fn load_mapping(path: impl AsRef<Path>) -> Result<MergeMapping> {
    let source = std::fs::read_to_string(path)?;
    mapping_from_ron_str(&source)
}

/// Welds nodes following an explicit correspondence.
///
/// The mapping is applied once, without following chains: if `a -> b` and
/// `b -> c`, faces using `a` end up using `b`, and since `b` was itself
/// merged out, the operation fails. Nodes whose id maps to a different id
/// are removed. The surviving nodes keep their position and attributes.
///
/// Faces are re-indexed and, as in [`clean`](super::clean), collapsed and
/// dropped when they degenerate. Unreferenced nodes are kept.
///
/// Fails with `DanglingReference` when a face would reference an id that is
/// not a node of the result.
#[profiling::function]
pub fn merge(graph: &MeshGraph, mapping: &MergeMapping) -> Result<MeshGraph> {
    let mapped = |id: NodeId| mapping.get(&id).copied().unwrap_or(id);
    let survives = |id: NodeId| graph.contains(id) && mapped(id) == id;

    let mut faces = Vec::with_capacity(graph.face_count());
    for (face_idx, face) in graph.faces().iter().enumerate() {
        let ids = face.vertices().iter().map(|id| mapped(*id)).collect_svec();
        if let Some(node) = ids.iter().find(|id| !survives(**id)) {
            return Err(MeshGraphError::DanglingReference {
                face: face_idx,
                node: *node,
            });
        }
        if let Some(ids) = collapse_face(&ids) {
            faces.push(Face(ids));
        }
    }

    let nodes = graph
        .nodes()
        .iter()
        .filter(|v| mapped(v.id()) == v.id())
        .cloned()
        .collect_vec();

    log::debug!(
        "Merge: removed {} nodes and {} faces",
        graph.node_count() - nodes.len(),
        graph.face_count() - faces.len()
    );

    Ok(MeshGraph::from_parts_unchecked(nodes, faces))
}

#[cfg(test)]
mod test {
    use super::*;

    fn two_quads() -> MeshGraph {
        // Two quads side by side that do not share their middle edge: nodes
        // 4 and 5 are copies of 1 and 2.
        let positions = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(2.0, 1.0, 0.0),
        ];
        MeshGraph::from_polygons(&positions, &[[0u32, 1, 2, 3], [4, 6, 7, 5]]).unwrap()
    }

    #[test]
    fn merge_stitches_seam() {
        let g = two_quads();
        assert_eq!(g.edges().len(), 8);

        let mapping = MergeMapping::from([(NodeId(4), NodeId(1)), (NodeId(5), NodeId(2))]);
        let merged = merge(&g, &mapping).unwrap();
        assert_eq!(merged.node_count(), 6);
        assert_eq!(merged.edges().len(), 7);
        assert_eq!(merged.faces()[1].vertices(), &[NodeId(1), NodeId(6), NodeId(7), NodeId(2)]);
        assert!(merged.validate().is_ok());

        // No face references an id outside the codomain of the mapping.
        let codomain: HashSet<NodeId> = merged.nodes().iter().map(|v| v.id()).collect();
        for face in merged.faces() {
            assert!(face.vertices().iter().all(|id| codomain.contains(id)));
            assert!(face.vertices().iter().all(|id| !mapping.contains_key(id)));
        }
    }

    #[test]
    fn merge_drops_collapsed_faces() {
        let g = two_quads();
        let mapping = MergeMapping::from([(NodeId(6), NodeId(4)), (NodeId(7), NodeId(5))]);
        let merged = merge(&g, &mapping).unwrap();
        assert_eq!(merged.face_count(), 1);
        // Unreferenced nodes are left for `clean` to remove.
        assert_eq!(merged.node_count(), 6);
    }

    #[test]
    fn dangling_references() {
        let g = two_quads();

        let absent = MergeMapping::from([(NodeId(4), NodeId(100))]);
        assert!(matches!(
            merge(&g, &absent),
            Err(MeshGraphError::DanglingReference {
                face: 1,
                node: NodeId(100)
            })
        ));

        // Chains are not followed: 4 -> 1, but 1 is merged out as well.
        let chained = MergeMapping::from([(NodeId(4), NodeId(1)), (NodeId(1), NodeId(0))]);
        assert!(matches!(
            merge(&g, &chained),
            Err(MeshGraphError::DanglingReference {
                face: 1,
                node: NodeId(1)
            })
        ));
    }

    #[test]
    fn mapping_from_ron() {
        let mapping = mapping_from_ron_str("{ 4: 1, 5: 2 }").unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping[&NodeId(4)], NodeId(1));
        assert!(mapping_from_ron_str("[1, 2]").is_err());
    }
}
