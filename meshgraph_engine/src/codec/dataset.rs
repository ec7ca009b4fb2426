// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};

use crate::codec::{Format, FormatHandler};
use crate::prelude::*;

/// Coordinates are stored with this many decimals.
pub const DECIMALS: i32 = 4;

pub struct DatasetHandler;

impl FormatHandler for DatasetHandler {
    fn format(&self) -> Format {
        Format::Dataset
    }

    fn encode(&self, graph: &MeshGraph) -> Result<Vec<u8>> {
        self.encode_named(graph, "mesh")
    }

    fn encode_named(&self, graph: &MeshGraph, name: &str) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(&DatasetRecord::from_graph(graph, name))
            .map_err(|err| MeshGraphError::parse(Format::Dataset, None, err.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<MeshGraph> {
        let record: DatasetRecord = serde_json::from_slice(bytes).map_err(|err| {
            MeshGraphError::parse(Format::Dataset, Some(err.line()), err.to_string())
        })?;
        record.into_graph()
    }

    /// Coordinates are rounded, and only positions and faces are stored.
    fn is_lossless(&self) -> bool {
        false
    }
}

/// One asset of the training set, with single letter keys to keep the files
/// small. The object transform (`l`, `r`, `s`) is always the identity since
/// positions are stored in world space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    /// Asset name
    pub n: String,
    /// Location
    pub l: [f32; 3],
    /// Rotation, as XYZ euler angles in radians
    pub r: [f32; 3],
    /// Scale
    pub s: [f32; 3],
    /// Vertex positions
    pub v: Vec<[f32; 3]>,
    /// Edges, as pairs of vertex indices
    pub e: Vec<[u32; 2]>,
    /// Faces, as lists of vertex indices
    pub f: Vec<Vec<u32>>,
}

impl DatasetRecord {
    pub fn from_graph(graph: &MeshGraph, name: &str) -> Self {
        let index = |id: NodeId| graph.node_index(id).unwrap_or_default() as u32;
        DatasetRecord {
            n: name.to_string(),
            l: [0.0; 3],
            r: [0.0; 3],
            s: [1.0; 3],
            v: graph
                .nodes()
                .iter()
                .map(|v| round_vec3(v.position(), DECIMALS).to_array())
                .collect(),
            e: graph
                .edges()
                .iter()
                .map(|(a, b)| [index(*a), index(*b)])
                .collect(),
            f: graph.face_indices().into_iter().map(|f| f.to_vec()).collect(),
        }
    }

    /// Rebuilds the graph from `v` and `f`. The edges in `e` are redundant
    /// with the faces, they are only checked to reference existing vertices.
    pub fn into_graph(self) -> Result<MeshGraph> {
        let n = self.v.len();
        let invalid = |message: String| MeshGraphError::parse(Format::Dataset, None, message);
        if let Some([a, b]) = self
            .e
            .iter()
            .find(|[a, b]| *a as usize >= n || *b as usize >= n)
        {
            return Err(invalid(format!(
                "edge ({a}, {b}) references a missing vertex, there are {n}"
            )));
        }

        let positions = self.v.into_iter().map(Vec3::from).collect_vec();
        MeshGraph::from_polygons(&positions, &self.f).map_err(|err| invalid(err.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn record_layout() {
        let positions = [
            Vec3::new(0.123456, 1.0, -2.00004),
            Vec3::new(1.0, 0.99999, 0.0),
            Vec3::new(0.5, 1.5, 3.14159),
        ];
        let g = MeshGraph::from_polygons(&positions, &[[0u32, 1, 2]]).unwrap();
        let record = DatasetRecord::from_graph(&g, "airplane");
        assert_eq!(record.n, "airplane");
        assert_eq!(record.s, [1.0; 3]);
        assert_eq!(record.v[0], [0.1235, 1.0, -2.0]);
        assert_eq!(record.v[1], [1.0, 1.0, 0.0]);
        assert_eq!(record.v[2], [0.5, 1.5, 3.1416]);
        assert_eq!(record.e, vec![[0, 1], [1, 2], [2, 0]]);
        assert_eq!(record.f, vec![vec![0, 1, 2]]);

        let text = String::from_utf8(DatasetHandler.encode_named(&g, "airplane").unwrap()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        for key in ["n", "l", "r", "s", "v", "e", "f"] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
    }

    #[test]
    fn decode_record() {
        let cube = primitives::Box::build(Vec3::ZERO, Vec3::ONE);
        let bytes = DatasetHandler.encode(&cube).unwrap();
        assert_eq!(DatasetHandler.decode(&bytes).unwrap(), cube);

        let bad_edge = r#"{"n": "x", "l": [0,0,0], "r": [0,0,0], "s": [1,1,1],
            "v": [[0,0,0],[1,0,0],[0,1,0]], "e": [[0, 7]], "f": [[0,1,2]]}"#;
        assert!(DatasetHandler.decode(bad_edge.as_bytes()).unwrap_err().is_parse_error());
    }
}
