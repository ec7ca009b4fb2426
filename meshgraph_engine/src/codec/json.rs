// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};

use crate::codec::{Format, FormatHandler};
use crate::prelude::*;

pub struct JsonHandler;

impl FormatHandler for JsonHandler {
    fn format(&self) -> Format {
        Format::Json
    }

    fn encode(&self, graph: &MeshGraph) -> Result<Vec<u8>> {
        serde_json::to_vec(&JsonMesh::from_graph(graph))
            .map_err(|err| MeshGraphError::parse(Format::Json, None, err.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<MeshGraph> {
        let mesh: JsonMesh = serde_json::from_slice(bytes).map_err(|err| {
            MeshGraphError::parse(Format::Json, Some(err.line()), err.to_string())
        })?;
        mesh.into_graph()
    }
}

/// The on-disk layout. Faces hold indices into `nodes`. The optional arrays
/// are parallel to `nodes` and are only written when some node needs them:
/// `ids` for graphs whose ids are not `0..n`, and one entry per node (or
/// `null`) for each attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonMesh {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<NodeId>>,
    pub nodes: Vec<[f32; 3]>,
    pub faces: Vec<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normals: Option<Vec<Option<[f32; 3]>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uvs: Option<Vec<Option<[f32; 2]>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<Option<Vec<f32>>>>,
}

/// Collects one attribute of every node, or `None` when no node has it.
fn attribute<T>(nodes: &[Vertex], get: impl Fn(&Vertex) -> Option<T>) -> Option<Vec<Option<T>>> {
    let values = nodes.iter().map(get).collect_vec();
    values.iter().any(Option::is_some).then_some(values)
}

fn check_len<T>(name: &str, values: &Option<Vec<T>>, expected: usize) -> Result<()> {
    match values {
        Some(values) if values.len() != expected => Err(MeshGraphError::parse(
            Format::Json,
            None,
            format!("'{name}' has {} entries, expected one per node ({expected})", values.len()),
        )),
        _ => Ok(()),
    }
}

impl JsonMesh {
    pub fn from_graph(graph: &MeshGraph) -> Self {
        let nodes = graph.nodes();
        JsonMesh {
            ids: (!graph.is_canonical()).then(|| nodes.iter().map(|v| v.id()).collect()),
            nodes: nodes.iter().map(|v| v.position().to_array()).collect(),
            faces: graph.face_indices().into_iter().map(|f| f.to_vec()).collect(),
            normals: attribute(nodes, |v| v.normal().map(|n| n.to_array())),
            uvs: attribute(nodes, |v| v.uv().map(|uv| uv.to_array())),
            features: attribute(nodes, |v| v.features().map(|fs| fs.to_vec())),
        }
    }

    pub fn into_graph(self) -> Result<MeshGraph> {
        let n = self.nodes.len();
        check_len("ids", &self.ids, n)?;
        check_len("normals", &self.normals, n)?;
        check_len("uvs", &self.uvs, n)?;
        check_len("features", &self.features, n)?;

        let invalid =
            |err: MeshGraphError| MeshGraphError::parse(Format::Json, None, err.to_string());

        let ids = match self.ids {
            Some(ids) => ids,
            None => (0..n as u32).map(NodeId).collect(),
        };
        let mut normals = self.normals.unwrap_or_default().into_iter();
        let mut uvs = self.uvs.unwrap_or_default().into_iter();
        let mut features = self.features.unwrap_or_default().into_iter();

        let mut builder = MeshGraphBuilder::with_capacity(n, self.faces.len());
        for (id, position) in ids.iter_cpy().zip(self.nodes) {
            let mut vertex = Vertex::new(id, Vec3::from(position));
            vertex.normal = normals.next().flatten().map(Vec3::from);
            vertex.uv = uvs.next().flatten().map(Vec2::from);
            vertex.features = features.next().flatten();
            builder.add_vertex(vertex).map_err(invalid)?;
        }

        for (face_idx, face) in self.faces.iter().enumerate() {
            let face_ids = face
                .iter()
                .map(|i| {
                    ids.get(*i as usize).copied().ok_or_else(|| {
                        MeshGraphError::parse(
                            Format::Json,
                            None,
                            format!(
                                "face {face_idx} references node index {i}, \
                                 but there are {n} nodes"
                            ),
                        )
                    })
                })
                .collect::<Result<SVec<_>>>()?;
            builder.add_face(face_ids).map_err(invalid)?;
        }
        Ok(builder.finalize())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn decode_str(text: &str) -> Result<MeshGraph> {
        JsonHandler.decode(text.as_bytes())
    }

    #[test]
    fn plain_layout() {
        let g =
            decode_str(r#"{"nodes": [[0,0,0],[1,0,0],[0,1,0]], "faces": [[0,1,2]]}"#).unwrap();
        assert_eq!(g.node_count(), 3);
        assert!(g.is_canonical());

        let text = String::from_utf8(JsonHandler.encode(&g).unwrap()).unwrap();
        assert_eq!(
            text,
            r#"{"nodes":[[0.0,0.0,0.0],[1.0,0.0,0.0],[0.0,1.0,0.0]],"faces":[[0,1,2]]}"#
        );
    }

    #[test]
    fn exact_round_trip() {
        let mut builder = MeshGraphBuilder::new();
        builder
            .add_vertex(
                Vertex::new(NodeId(10), Vec3::new(0.1, 0.2, 0.3)).with_features(vec![0.5, 1.5]),
            )
            .unwrap()
            .add_vertex(
                Vertex::new(NodeId(4), Vec3::new(1.0 / 3.0, -7.25, 1e-7)).with_normal(Vec3::Y),
            )
            .unwrap()
            .add_vertex(
                Vertex::new(NodeId(7), Vec3::new(-2.0, 5.5, 0.0)).with_uv(Vec2::new(0.25, 0.75)),
            )
            .unwrap();
        builder.add_face([NodeId(4), NodeId(7), NodeId(10)]).unwrap();
        let g = builder.finalize();

        let bytes = JsonHandler.encode(&g).unwrap();
        let back = JsonHandler.decode(&bytes).unwrap();
        assert_eq!(back, g);
        assert_eq!(back.node(NodeId(10)).unwrap().features(), Some(&[0.5, 1.5][..]));
    }

    #[test]
    fn errors() {
        assert!(matches!(
            decode_str(r#"{"nodes": [[0,0,0]], "faces": [[0,1,2]]}"#),
            Err(MeshGraphError::ParseError { format: Format::Json, .. })
        ));
        assert!(matches!(
            decode_str("{\"nodes\": [[0,0,0]],\n \"faces\": [[0,1,2]"),
            Err(MeshGraphError::ParseError { line: Some(2), .. })
        ));
        assert!(matches!(
            decode_str(r#"{"nodes": [[0,0,0],[1,0,0],[0,1,0]], "faces": [[0,1,1]]}"#),
            Err(MeshGraphError::ParseError { .. })
        ));
        assert!(matches!(
            decode_str(r#"{"ids": [1], "nodes": [[0,0,0],[1,0,0]], "faces": []}"#),
            Err(MeshGraphError::ParseError { .. })
        ));
    }
}
