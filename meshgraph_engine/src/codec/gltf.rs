// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::borrow::Cow;

use base64::Engine;
use glam::Mat4;
use serde_json::{json, Value};

use crate::codec::{Format, FormatHandler};
use crate::prelude::*;

const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;
const FLOAT: u32 = 5126;
const UNSIGNED_INT: u32 = 5125;
const MODE_POINTS: u32 = 0;
const MODE_TRIANGLES: u32 = 4;

/// Handles both glTF flavors. With `binary` set, documents are written as a
/// `.glb` container. Otherwise the buffer is embedded in the JSON document
/// as a base64 data URI. Decoding accepts either flavor.
pub struct GltfHandler {
    pub binary: bool,
}

impl FormatHandler for GltfHandler {
    fn format(&self) -> Format {
        if self.binary {
            Format::Glb
        } else {
            Format::Gltf
        }
    }

    fn encode(&self, graph: &MeshGraph) -> Result<Vec<u8>> {
        let (document, bin) = build_document(graph, !self.binary);
        let json = serde_json::to_vec(&document)
            .map_err(|err| MeshGraphError::parse(self.format(), None, err.to_string()))?;
        if self.binary {
            to_glb(json, bin)
        } else {
            Ok(json)
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<MeshGraph> {
        read_gltf(bytes, self.format())
    }

    /// Polygons come back as triangles, node ids as positions and feature
    /// vectors are not stored.
    fn is_lossless(&self) -> bool {
        false
    }
}

/// Splits every polygon into a triangle fan around its first corner.
pub fn fan_triangulate(graph: &MeshGraph) -> Vec<[u32; 3]> {
    graph
        .face_indices()
        .iter()
        .flat_map(|face| {
            let first = face[0];
            face[1..]
                .iter_cpy()
                .tuple_windows()
                .map(move |(b, c)| [first, b, c])
        })
        .collect()
}

/// Binary buffer plus the views and accessors describing it.
#[derive(Default)]
struct BufferBuilder {
    bin: Vec<u8>,
    views: Vec<Value>,
    accessors: Vec<Value>,
}

impl BufferBuilder {
    /// Appends a tightly packed attribute or index array and returns the
    /// index of its accessor.
    fn push(
        &mut self,
        data: &[u8],
        count: usize,
        kind: &str,
        component: u32,
        target: u32,
    ) -> usize {
        let view = self.views.len();
        self.views.push(json!({
            "buffer": 0,
            "byteOffset": self.bin.len(),
            "byteLength": data.len(),
            "target": target,
        }));
        self.bin.extend_from_slice(data);
        self.accessors.push(json!({
            "bufferView": view,
            "componentType": component,
            "count": count,
            "type": kind,
        }));
        self.accessors.len() - 1
    }

    fn push_vec3(&mut self, values: &[Vec3]) -> usize {
        let data = values
            .iter()
            .flat_map(|v| v.to_array())
            .flat_map(f32::to_le_bytes)
            .collect_vec();
        self.push(&data, values.len(), "VEC3", FLOAT, ARRAY_BUFFER)
    }
}

fn build_document(graph: &MeshGraph, embed: bool) -> (Value, Vec<u8>) {
    let mut document = json!({
        "asset": { "version": "2.0", "generator": "meshgraph" },
    });
    if graph.node_count() == 0 {
        return (document, Vec::new());
    }

    let nodes = graph.nodes();
    let mut buffer = BufferBuilder::default();
    let mut attributes = serde_json::Map::new();

    let positions = graph.positions();
    let position_accessor = buffer.push_vec3(&positions);
    let (min, max) = positions.iter().fold(
        (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
        |(min, max), p| (min.min(*p), max.max(*p)),
    );
    buffer.accessors[position_accessor]["min"] = json!(min.to_array());
    buffer.accessors[position_accessor]["max"] = json!(max.to_array());
    attributes.insert("POSITION".into(), json!(position_accessor));

    if let Some(normals) = nodes.iter().map(|v| v.normal()).collect::<Option<Vec<_>>>() {
        attributes.insert("NORMAL".into(), json!(buffer.push_vec3(&normals)));
    }
    if let Some(uvs) = nodes.iter().map(|v| v.uv()).collect::<Option<Vec<_>>>() {
        let data = uvs
            .iter()
            .flat_map(|uv| uv.to_array())
            .flat_map(f32::to_le_bytes)
            .collect_vec();
        let accessor = buffer.push(&data, uvs.len(), "VEC2", FLOAT, ARRAY_BUFFER);
        attributes.insert("TEXCOORD_0".into(), json!(accessor));
    }

    let triangles = fan_triangulate(graph);
    let primitive = if triangles.is_empty() {
        json!({ "attributes": attributes, "mode": MODE_POINTS })
    } else {
        let data = triangles
            .iter()
            .flatten()
            .flat_map(|i| i.to_le_bytes())
            .collect_vec();
        let indices = buffer.push(
            &data,
            triangles.len() * 3,
            "SCALAR",
            UNSIGNED_INT,
            ELEMENT_ARRAY_BUFFER,
        );
        json!({ "attributes": attributes, "indices": indices, "mode": MODE_TRIANGLES })
    };

    let mut gltf_buffer = json!({ "byteLength": buffer.bin.len() });
    if embed {
        gltf_buffer["uri"] = json!(format!(
            "data:application/octet-stream;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&buffer.bin)
        ));
    }

    document["scene"] = json!(0);
    document["scenes"] = json!([{ "nodes": [0] }]);
    document["nodes"] = json!([{ "mesh": 0 }]);
    document["meshes"] = json!([{ "primitives": [primitive] }]);
    document["buffers"] = json!([gltf_buffer]);
    document["bufferViews"] = Value::Array(buffer.views);
    document["accessors"] = Value::Array(buffer.accessors);
    (document, buffer.bin)
}

fn to_glb(mut json: Vec<u8>, bin: Vec<u8>) -> Result<Vec<u8>> {
    // Chunks must be 4-byte aligned. The JSON chunk is padded with spaces.
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let bin = (!bin.is_empty()).then_some(bin);
    let length = 12 + 8 + json.len() + bin.as_ref().map(|b| 8 + b.len()).unwrap_or(0);
    let glb = ::gltf::binary::Glb {
        header: ::gltf::binary::Header {
            magic: *b"glTF",
            version: 2,
            length: length as u32,
        },
        json: Cow::Owned(json),
        bin: bin.map(Cow::Owned),
    };
    glb.to_vec()
        .map_err(|err| MeshGraphError::parse(Format::Glb, None, err.to_string()))
}

/// Reads every mesh instanced by the scene (or every mesh in the document,
/// when there is no scene) and joins them into a single graph. Node
/// transforms are applied, so positions come out in world space.
#[profiling::function]
fn read_gltf(bytes: &[u8], format: Format) -> Result<MeshGraph> {
    let invalid = |err: ::gltf::Error| MeshGraphError::parse(format, None, err.to_string());
    let ::gltf::Gltf { document, blob } = ::gltf::Gltf::from_slice(bytes).map_err(invalid)?;
    let buffers = ::gltf::import_buffers(&document, None, blob).map_err(invalid)?;

    let mut parts = Vec::new();
    match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => {
            for node in scene.nodes() {
                read_node(&node, Mat4::IDENTITY, &buffers, format, &mut parts)?;
            }
        }
        None => {
            for mesh in document.meshes() {
                read_mesh(&mesh, Mat4::IDENTITY, &buffers, format, &mut parts)?;
            }
        }
    }
    MeshGraph::join(parts.iter())
}

fn read_node(
    node: &::gltf::Node,
    parent: Mat4,
    buffers: &[::gltf::buffer::Data],
    format: Format,
    parts: &mut Vec<MeshGraph>,
) -> Result<()> {
    let transform = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        read_mesh(&mesh, transform, buffers, format, parts)?;
    }
    for child in node.children() {
        read_node(&child, transform, buffers, format, parts)?;
    }
    Ok(())
}

fn read_mesh(
    mesh: &::gltf::Mesh,
    transform: Mat4,
    buffers: &[::gltf::buffer::Data],
    format: Format,
    parts: &mut Vec<MeshGraph>,
) -> Result<()> {
    use ::gltf::mesh::Mode;

    let normal_matrix = transform.inverse().transpose();
    for prim in mesh.primitives() {
        let reader = prim.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));

        let positions = reader
            .read_positions()
            .ok_or_else(|| {
                MeshGraphError::parse(
                    format,
                    None,
                    format!("primitive {} of mesh {} has no POSITION", prim.index(), mesh.index()),
                )
            })?
            .map(|p| transform.transform_point3(Vec3::from(p)))
            .collect_vec();
        let normals = reader.read_normals().map(|ns| {
            ns.map(|n| {
                let n = Vec3::from(n);
                if transform == Mat4::IDENTITY {
                    n
                } else {
                    normal_matrix.transform_vector3(n).normalize_or_zero()
                }
            })
            .collect_vec()
        });
        let uvs = reader
            .read_tex_coords(0)
            .map(|tc| tc.into_f32().map(Vec2::from).collect_vec());

        let n = positions.len();
        let indices = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect_vec(),
            None => (0..n as u32).collect_vec(),
        };
        let triangles: Vec<[u32; 3]> = match prim.mode() {
            Mode::Triangles => indices
                .chunks_exact(3)
                .map(|t| [t[0], t[1], t[2]])
                .collect(),
            Mode::TriangleStrip => indices
                .windows(3)
                .enumerate()
                .map(|(i, t)| {
                    if i % 2 == 0 {
                        [t[0], t[1], t[2]]
                    } else {
                        [t[1], t[0], t[2]]
                    }
                })
                .collect(),
            Mode::TriangleFan => indices
                .get(1..)
                .unwrap_or_default()
                .windows(2)
                .map(|t| [indices[0], t[0], t[1]])
                .collect(),
            // Points and lines only contribute nodes.
            _ => Vec::new(),
        };

        let invalid = |err: MeshGraphError| MeshGraphError::parse(format, None, err.to_string());
        let mut builder = MeshGraphBuilder::with_capacity(n, triangles.len());
        for (i, position) in positions.into_iter().enumerate() {
            let mut vertex = Vertex::new(NodeId(i as u32), position);
            vertex.normal = normals.as_ref().and_then(|ns| ns.get(i).copied());
            vertex.uv = uvs.as_ref().and_then(|uvs| uvs.get(i).copied());
            builder.add_vertex(vertex).map_err(invalid)?;
        }

        let mut degenerate = 0;
        for triangle in triangles {
            if let Some(i) = triangle.iter().find(|i| **i as usize >= n) {
                return Err(MeshGraphError::parse(
                    format,
                    None,
                    format!("index {i} is out of range, primitive has {n} vertices"),
                ));
            }
            if triangle.has_duplicates() {
                degenerate += 1;
                continue;
            }
            builder
                .add_face(triangle.map(NodeId))
                .map_err(invalid)?;
        }
        if degenerate > 0 {
            log::warn!(
                "Skipped {degenerate} triangles with repeated vertices in mesh {}",
                mesh.index()
            );
        }
        parts.push(builder.finalize());
    }
    Ok(())
}
