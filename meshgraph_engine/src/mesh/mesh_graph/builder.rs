// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use once_cell::sync::OnceCell;

use super::*;

/// Accumulates vertices and faces, checking every invariant as data comes
/// in. Vertices must be added before the faces that reference them.
#[derive(Debug, Default)]
pub struct MeshGraphBuilder {
    nodes: Vec<Vertex>,
    faces: Vec<Face>,
    index: HashMap<NodeId, usize>,
}

impl MeshGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nodes: usize, faces: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(nodes),
            faces: Vec::with_capacity(faces),
            index: HashMap::with_capacity(nodes),
        }
    }

    pub fn add_vertex(&mut self, vertex: Vertex) -> Result<&mut Self> {
        check_vertex(&vertex)?;
        if self.index.contains_key(&vertex.id) {
            return Err(MeshGraphError::topology(format!(
                "Duplicate node id {}",
                vertex.id
            )));
        }
        self.index.insert(vertex.id, self.nodes.len());
        self.nodes.push(vertex);
        Ok(self)
    }

    pub fn add_node(&mut self, id: NodeId, position: Vec3) -> Result<&mut Self> {
        self.add_vertex(Vertex::new(id, position))
    }

    pub fn add_face(&mut self, ids: impl IntoIterator<Item = NodeId>) -> Result<&mut Self> {
        let face = check_face(ids.into_iter().collect(), &self.index)?;
        self.faces.push(face);
        Ok(self)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The id of the `i`-th vertex added so far.
    pub fn id_at(&self, i: usize) -> Option<NodeId> {
        self.nodes.get(i).map(|v| v.id)
    }

    /// Finishes construction. The adjacency is computed right away, so the
    /// first queries on the new graph do not pay for it.
    pub fn finalize(self) -> MeshGraph {
        let adjacency = OnceCell::new();
        let _ = adjacency.set(Adjacency::build(&self.nodes, &self.faces, &self.index));
        MeshGraph {
            nodes: self.nodes,
            faces: self.faces,
            index: self.index,
            adjacency,
        }
    }
}

pub(crate) fn check_finite_vec3(id: NodeId, v: Vec3, what: &str) -> Result<()> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(MeshGraphError::DegenerateGeometry {
            node: id,
            reason: format!("non-finite {what} {v}"),
        })
    }
}

pub(crate) fn check_vertex(vertex: &Vertex) -> Result<()> {
    check_finite_vec3(vertex.id, vertex.position, "position")?;
    if let Some(normal) = vertex.normal {
        check_finite_vec3(vertex.id, normal, "normal")?;
    }
    if !vertex.uv.is_none_or_(|uv| uv.is_finite()) {
        return Err(MeshGraphError::DegenerateGeometry {
            node: vertex.id,
            reason: "non-finite uv".into(),
        });
    }
    if !vertex
        .features
        .is_none_or_(|fs| fs.iter().all(|f| f.is_finite()))
    {
        return Err(MeshGraphError::DegenerateGeometry {
            node: vertex.id,
            reason: "non-finite feature value".into(),
        });
    }
    Ok(())
}

pub(crate) fn check_face(ids: SVec<NodeId>, index: &HashMap<NodeId, usize>) -> Result<Face> {
    if ids.len() < 3 {
        return Err(MeshGraphError::topology(format!(
            "Cannot build faces with less than three vertices, got {:?}",
            ids.as_slice()
        )));
    }
    if ids.has_duplicates() {
        return Err(MeshGraphError::topology(format!(
            "Cannot build a face with duplicate vertices {:?}",
            ids.as_slice()
        )));
    }
    if let Some(unknown) = ids.iter().find(|id| !index.contains_key(id)) {
        return Err(MeshGraphError::topology(format!(
            "Face references unknown node {unknown}"
        )));
    }
    Ok(Face(ids))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn incremental_construction() {
        let mut builder = MeshGraphBuilder::new();
        builder
            .add_node(NodeId(1), Vec3::ZERO)
            .unwrap()
            .add_node(NodeId(2), Vec3::X)
            .unwrap()
            .add_vertex(Vertex::new(NodeId(9), Vec3::Y).with_normal(Vec3::Z))
            .unwrap();
        builder.add_face([NodeId(1), NodeId(2), NodeId(9)]).unwrap();
        assert_eq!(builder.id_at(2), Some(NodeId(9)));

        let g = builder.finalize();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.face_count(), 1);
        assert_eq!(g.node(NodeId(9)).and_then(|v| v.normal()), Some(Vec3::Z));
    }

    #[test]
    fn topology_errors() {
        let mut builder = MeshGraphBuilder::new();
        builder.add_node(NodeId(0), Vec3::ZERO).unwrap();
        builder.add_node(NodeId(1), Vec3::X).unwrap();
        builder.add_node(NodeId(2), Vec3::Y).unwrap();

        let dup = builder.add_node(NodeId(1), Vec3::Z).map(|_| ());
        assert!(matches!(dup, Err(MeshGraphError::InvalidTopology(_))));

        let unknown = builder.add_face([NodeId(0), NodeId(1), NodeId(5)]).map(|_| ());
        assert!(matches!(unknown, Err(MeshGraphError::InvalidTopology(_))));

        let repeated = builder
            .add_face([NodeId(0), NodeId(1), NodeId(1)])
            .map(|_| ());
        assert!(matches!(repeated, Err(MeshGraphError::InvalidTopology(_))));

        let short = builder.add_face([NodeId(0), NodeId(1)]).map(|_| ());
        assert!(matches!(short, Err(MeshGraphError::InvalidTopology(_))));
    }

    #[test]
    fn geometry_errors() {
        let mut builder = MeshGraphBuilder::new();
        let inf = builder
            .add_node(NodeId(0), Vec3::new(0.0, f32::INFINITY, 0.0))
            .map(|_| ());
        assert!(matches!(
            inf,
            Err(MeshGraphError::DegenerateGeometry { node: NodeId(0), .. })
        ));

        let bad_uv = builder
            .add_vertex(Vertex::new(NodeId(1), Vec3::ZERO).with_uv(Vec2::new(f32::NAN, 0.0)))
            .map(|_| ());
        assert!(matches!(bad_uv, Err(MeshGraphError::DegenerateGeometry { .. })));

        let bad_features = builder
            .add_vertex(Vertex::new(NodeId(2), Vec3::ZERO).with_features(vec![1.0, f32::NAN]))
            .map(|_| ());
        assert!(matches!(bad_features, Err(MeshGraphError::DegenerateGeometry { .. })));
        assert_eq!(builder.node_count(), 0);
    }
}
