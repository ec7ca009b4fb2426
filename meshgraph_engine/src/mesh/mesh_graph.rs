// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use once_cell::sync::OnceCell;

use crate::prelude::*;

/// Type-safe wrapper over the integer node identities
pub mod id_types;
pub use id_types::*;

/// Incremental, validating construction of a [`MeshGraph`]
pub mod builder;
pub use builder::*;

/// Lazily computed connectivity queries (incident faces, neighbors, edges)
pub mod adjacency;
pub use adjacency::*;

/// A mesh node. Holds a position and, optionally, the per-node attributes
/// that some interchange formats can carry.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub(crate) id: NodeId,
    pub(crate) position: Vec3,
    pub(crate) normal: Option<Vec3>,
    pub(crate) uv: Option<Vec2>,
    pub(crate) features: Option<Vec<f32>>,
}

impl Vertex {
    pub fn new(id: NodeId, position: Vec3) -> Self {
        Self {
            id,
            position,
            normal: None,
            uv: None,
            features: None,
        }
    }

    pub fn with_normal(mut self, normal: Vec3) -> Self {
        self.normal = Some(normal);
        self
    }

    pub fn with_uv(mut self, uv: Vec2) -> Self {
        self.uv = Some(uv);
        self
    }

    pub fn with_features(mut self, features: Vec<f32>) -> Self {
        self.features = Some(features);
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn normal(&self) -> Option<Vec3> {
        self.normal
    }

    pub fn uv(&self) -> Option<Vec2> {
        self.uv
    }

    pub fn features(&self) -> Option<&[f32]> {
        self.features.as_deref()
    }

    /// Returns a copy of this vertex under a different id.
    pub(crate) fn renamed(&self, id: NodeId) -> Self {
        Self { id, ..self.clone() }
    }

    /// Returns a copy of this vertex at a different position.
    pub(crate) fn moved(&self, position: Vec3) -> Self {
        Self {
            position,
            ..self.clone()
        }
    }

    fn approx_eq(&self, other: &Vertex, tolerance: f32) -> bool {
        fn opt_eq<T>(a: &Option<T>, b: &Option<T>, eq: impl Fn(&T, &T) -> bool) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => eq(a, b),
                (None, None) => true,
                _ => false,
            }
        }
        self.id == other.id
            && self.position.abs_diff_eq(other.position, tolerance)
            && opt_eq(&self.normal, &other.normal, |a, b| {
                a.abs_diff_eq(*b, tolerance)
            })
            && opt_eq(&self.uv, &other.uv, |a, b| a.abs_diff_eq(*b, tolerance))
            && opt_eq(&self.features, &other.features, |a, b| {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= tolerance)
            })
    }
}

/// A polygon, as the cyclic sequence of the ids of its corners.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Face(pub(crate) SVec<NodeId>);

impl Face {
    pub fn vertices(&self) -> &[NodeId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.0.contains(&id)
    }

    /// The directed edges of this polygon, closing the loop at the end.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.0.iter_cpy().circular_tuple_windows()
    }
}

/// A 3D mesh stored as a graph: an ordered list of nodes and an ordered list
/// of polygonal faces referencing them by id.
///
/// The invariants (unique ids, faces referencing existing nodes with at least
/// three distinct ids, finite positions) are checked whenever data enters the
/// graph, so any `MeshGraph` value can be assumed valid.
///
/// Connectivity queries are answered from an [`Adjacency`] that is computed
/// on first use. Structural mutations drop it, and it is recomputed the next
/// time it is needed.
#[derive(Debug, Clone, Default)]
pub struct MeshGraph {
    nodes: Vec<Vertex>,
    faces: Vec<Face>,
    index: HashMap<NodeId, usize>,
    adjacency: OnceCell<Adjacency>,
}

impl PartialEq for MeshGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.faces == other.faces
    }
}

impl MeshGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from a list of positions, and a list of polygons,
    /// containing indices that reference those positions. Node ids are the
    /// position indices.
    ///
    /// - Generic over Index: Use as much precision as you need / want.
    /// - Generic over Polygon: Use whatever input layout you want.
    ///
    /// If unsure, you can pass `Vec<Vec<u32>>` as `polygons`. You can also use
    /// `[[u32;3]]` or `&[&[u32]]`.
    pub fn from_polygons<Index, Polygon>(positions: &[Vec3], polygons: &[Polygon]) -> Result<Self>
    where
        Index: num_traits::AsPrimitive<usize> + 'static + Copy,
        Polygon: AsRef<[Index]>,
    {
        let mut builder = MeshGraphBuilder::with_capacity(positions.len(), polygons.len());
        for (i, position) in positions.iter().enumerate() {
            builder.add_node(node_id_from_index(i)?, *position)?;
        }
        for polygon in polygons.iter().map(|p| p.as_ref()) {
            let ids = polygon
                .iter()
                .map(|idx| {
                    let idx: usize = idx.as_();
                    if idx < positions.len() {
                        node_id_from_index(idx)
                    } else {
                        Err(MeshGraphError::topology(format!(
                            "Out-of-bounds index in the polygon array {idx}"
                        )))
                    }
                })
                .collect::<Result<SVec<_>>>()?;
            builder.add_face(ids)?;
        }
        Ok(builder.finalize())
    }

    /// Assembles a graph from parts that are already known to satisfy every
    /// invariant. Used by the preprocessing transforms, whose output is valid
    /// by construction.
    pub(crate) fn from_parts_unchecked(nodes: Vec<Vertex>, faces: Vec<Face>) -> Self {
        let index = nodes.iter().enumerate().map(|(i, v)| (v.id, i)).collect();
        let graph = Self {
            nodes,
            faces,
            index,
            adjacency: OnceCell::new(),
        };
        debug_assert!(graph.validate().is_ok(), "{:?}", graph.validate());
        graph
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn nodes(&self) -> &[Vertex] {
        &self.nodes
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn node(&self, id: NodeId) -> Option<&Vertex> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn position(&self, id: NodeId) -> Option<Vec3> {
        self.node(id).map(|v| v.position)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// The position of node `id` in the ordered node list.
    pub fn node_index(&self, id: NodeId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// The largest node id in the graph, if any.
    pub fn max_id(&self) -> Option<NodeId> {
        self.nodes.iter().map(|v| v.id).max()
    }

    /// Returns the cached adjacency, computing it first if needed.
    pub fn adjacency(&self) -> &Adjacency {
        self.adjacency
            .get_or_init(|| Adjacency::build(&self.nodes, &self.faces, &self.index))
    }

    /// Indices (into [`MeshGraph::faces`]) of the faces touching `id`. Empty
    /// when the node is unreferenced or does not exist.
    pub fn incident_faces(&self, id: NodeId) -> &[usize] {
        match self.node_index(id) {
            Some(i) => self.adjacency().incident_faces(i),
            None => &[],
        }
    }

    /// Nodes sharing an edge with `id`, sorted by id.
    pub fn neighbors(&self, id: NodeId) -> &[NodeId] {
        match self.node_index(id) {
            Some(i) => self.adjacency().neighbors(i),
            None => &[],
        }
    }

    /// Unique undirected edges, in order of first appearance in the faces.
    pub fn edges(&self) -> &[(NodeId, NodeId)] {
        self.adjacency().edges()
    }

    /// Moves node `id`. This does not change connectivity, so the adjacency
    /// cache is kept.
    pub fn set_position(&mut self, id: NodeId, position: Vec3) -> Result<()> {
        builder::check_finite_vec3(id, position, "position")?;
        let i = self
            .node_index(id)
            .ok_or_else(|| MeshGraphError::topology(format!("Unknown node {id}")))?;
        self.nodes[i].position = position;
        Ok(())
    }

    /// Appends a new node. Fails if the id is taken or the data is not finite.
    pub fn add_node(&mut self, vertex: Vertex) -> Result<()> {
        builder::check_vertex(&vertex)?;
        if self.index.contains_key(&vertex.id) {
            return Err(MeshGraphError::topology(format!(
                "Duplicate node id {}",
                vertex.id
            )));
        }
        self.index.insert(vertex.id, self.nodes.len());
        self.nodes.push(vertex);
        self.adjacency.take();
        Ok(())
    }

    /// Appends a new face and returns its index.
    pub fn add_face(&mut self, ids: impl IntoIterator<Item = NodeId>) -> Result<usize> {
        let face = builder::check_face(ids.into_iter().collect(), &self.index)?;
        self.faces.push(face);
        self.adjacency.take();
        Ok(self.faces.len() - 1)
    }

    /// Removes the face at `face_index`, shifting the following faces down.
    pub fn remove_face(&mut self, face_index: usize) -> Option<Face> {
        if face_index < self.faces.len() {
            self.adjacency.take();
            Some(self.faces.remove(face_index))
        } else {
            None
        }
    }

    pub fn positions(&self) -> Vec<Vec3> {
        self.nodes.iter().map(|v| v.position).collect()
    }

    /// The faces, expressed as indices into the node list instead of ids.
    /// This is the layout used by most interchange formats.
    pub fn face_indices(&self) -> Vec<SVec<u32>> {
        self.faces
            .iter()
            .map(|f| {
                f.0.iter()
                    .map(|id| self.index[id] as u32)
                    .collect_svec()
            })
            .collect()
    }

    /// Normal of a polygon using Newell's method, which also behaves for
    /// non-planar and concave polygons. Its length is twice the area.
    fn newell_normal(&self, face: &Face) -> Vec3 {
        face.edges().fold(Vec3::ZERO, |acc, (a, b)| {
            let (p, q) = (self.nodes[self.index[&a]].position, self.nodes[self.index[&b]].position);
            acc + Vec3::new(
                (p.y - q.y) * (p.z + q.z),
                (p.z - q.z) * (p.x + q.x),
                (p.x - q.x) * (p.y + q.y),
            )
        })
    }

    pub fn face_area(&self, face: &Face) -> f32 {
        self.newell_normal(face).length() * 0.5
    }

    /// Unit normal of `face`, or zero for degenerate faces.
    pub fn face_normal(&self, face: &Face) -> Vec3 {
        self.newell_normal(face).normalize_or_zero()
    }

    /// Returns the center and size of the axis-aligned bounding box.
    pub fn bounding_box(&self) -> (Vec3, Vec3) {
        if self.nodes.is_empty() {
            return (Vec3::ZERO, Vec3::ZERO);
        }
        let (min, max) = self.nodes.iter().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(min, max), v| (min.min(v.position), max.max(v.position)),
        );
        ((min + max) * 0.5, max - min)
    }

    /// Number of different positions. Lower than the node count when several
    /// nodes sit exactly on top of each other.
    pub fn distinct_positions(&self) -> usize {
        self.nodes
            .iter()
            .map(|v| v.position.to_ord())
            .collect::<HashSet<Vec3Ord>>()
            .len()
    }

    /// Whether the node ids are exactly `0..node_count` in order.
    pub fn is_canonical(&self) -> bool {
        self.nodes
            .iter()
            .enumerate()
            .all(|(i, v)| v.id.0 as usize == i)
    }

    /// Returns a copy where node ids are replaced by their position in the
    /// node list.
    pub fn reindexed(&self) -> MeshGraph {
        let nodes = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, v)| v.renamed(NodeId(i as u32)))
            .collect();
        let faces = self
            .face_indices()
            .into_iter()
            .map(|f| Face(f.into_iter().map(NodeId).collect()))
            .collect();
        MeshGraph::from_parts_unchecked(nodes, faces)
    }

    /// Appends the nodes and faces of `other` to this graph. No connectivity
    /// is created between the two. Ids of `other` are shifted past the largest
    /// id of `self` so they stay unique.
    pub fn join_with(&mut self, other: &MeshGraph) -> Result<()> {
        let offset = match self.max_id() {
            Some(max) => max.next().ok_or_else(|| {
                MeshGraphError::topology("Node ids overflow when joining meshes")
            })?,
            None => NodeId(0),
        };
        let shift = |id: NodeId| {
            id.0.checked_add(offset.0)
                .map(NodeId)
                .ok_or_else(|| MeshGraphError::topology("Node ids overflow when joining meshes"))
        };

        for v in &other.nodes {
            let id = shift(v.id)?;
            self.index.insert(id, self.nodes.len());
            self.nodes.push(v.renamed(id));
        }
        for f in &other.faces {
            let ids = f.0.iter().map(|id| shift(*id)).collect::<Result<SVec<_>>>()?;
            self.faces.push(Face(ids));
        }
        self.adjacency.take();
        Ok(())
    }

    /// Joins several graphs into a single one. See [`MeshGraph::join_with`].
    pub fn join<'a>(graphs: impl IntoIterator<Item = &'a MeshGraph>) -> Result<MeshGraph> {
        let mut joined = MeshGraph::new();
        for g in graphs {
            joined.join_with(g)?;
        }
        Ok(joined)
    }

    /// Like `==`, but node positions and attributes only need to be within
    /// `tolerance`. Ids and connectivity must match exactly.
    pub fn approx_eq(&self, other: &MeshGraph, tolerance: f32) -> bool {
        self.faces == other.faces
            && self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .zip(&other.nodes)
                .all(|(a, b)| a.approx_eq(b, tolerance))
    }

    /// Checks every invariant from scratch.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashMap::with_capacity(self.nodes.len());
        for (i, v) in self.nodes.iter().enumerate() {
            builder::check_vertex(v)?;
            if seen.insert(v.id, i).is_some() {
                return Err(MeshGraphError::topology(format!("Duplicate node id {}", v.id)));
            }
        }
        for face in &self.faces {
            builder::check_face(face.0.clone(), &seen)?;
        }
        Ok(())
    }
}

fn node_id_from_index(index: usize) -> Result<NodeId> {
    u32::try_from(index)
        .map(NodeId)
        .map_err(|_| MeshGraphError::topology(format!("Index {index} does not fit a node id")))
}
