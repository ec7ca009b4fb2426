// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use super::collapse_face;
use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanParams {
    /// Vertices at this distance or closer are welded together.
    pub epsilon: f32,
    /// Faces with an area at or below this value are removed.
    pub area_epsilon: f32,
}

impl Default for CleanParams {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            area_epsilon: 0.0,
        }
    }
}

impl CleanParams {
    pub fn with_epsilon(epsilon: f32) -> Self {
        Self {
            epsilon,
            ..Default::default()
        }
    }

    fn check(&self) -> Result<()> {
        if !(self.epsilon.is_finite() && self.epsilon >= 0.0) {
            return Err(MeshGraphError::config(format!(
                "weld epsilon must be a non-negative number, got {}",
                self.epsilon
            )));
        }
        if !(self.area_epsilon.is_finite() && self.area_epsilon >= 0.0) {
            return Err(MeshGraphError::config(format!(
                "area epsilon must be a non-negative number, got {}",
                self.area_epsilon
            )));
        }
        Ok(())
    }
}

struct VertexPos {
    index: usize,
    pos: Vec3,
}

impl RTreeObject for VertexPos {
    type Envelope = AABB<[f32; 3]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.pos.to_array())
    }
}

impl PointDistance for VertexPos {
    fn distance_2(
        &self,
        point: &<Self::Envelope as rstar::Envelope>::Point,
    ) -> <<Self::Envelope as rstar::Envelope>::Point as rstar::Point>::Scalar {
        self.pos.distance_squared(Vec3::from_slice(point))
    }
}

/// For every node (by position in the node list), the index of the node it
/// is welded into. Nodes are visited in order and each one that was not
/// claimed yet claims every unclaimed node within `epsilon`, so the first
/// node of a cluster is the one that survives.
fn weld_targets(nodes: &[Vertex], epsilon: f32) -> Vec<usize> {
    let tree = RTree::bulk_load(
        nodes
            .iter()
            .enumerate()
            .map(|(index, v)| VertexPos {
                index,
                pos: v.position(),
            })
            .collect_vec(),
    );

    let mut target = vec![usize::MAX; nodes.len()];
    let radius_2 = epsilon * epsilon;
    for (i, v) in nodes.iter().enumerate() {
        if target[i] != usize::MAX {
            continue;
        }
        target[i] = i;
        for near in tree.locate_within_distance(v.position().to_array(), radius_2) {
            if target[near.index] == usize::MAX {
                target[near.index] = i;
            }
        }
    }
    target
}

/// Returns a cleaned copy of `graph`:
///
/// - Vertices within `params.epsilon` of each other are welded. The first
///   one in node order survives, keeping its id, position and attributes.
/// - Faces are re-indexed. Repeated consecutive ids are collapsed, and faces
///   left with fewer than three ids, with a repeated id, or with an area not
///   above `params.area_epsilon` are removed.
/// - Vertices no face references anymore are removed.
///
/// Cleaning a clean graph returns it unchanged.
#[profiling::function]
pub fn clean(graph: &MeshGraph, params: &CleanParams) -> Result<MeshGraph> {
    params.check()?;
    let nodes = graph.nodes();
    let target = weld_targets(nodes, params.epsilon);

    let mut faces = Vec::with_capacity(graph.face_count());
    let mut dropped = 0;
    for face in graph.faces() {
        let ids = face
            .vertices()
            .iter()
            .map(|id| nodes[target[graph.node_index(*id).unwrap_or_default()]].id())
            .collect_svec();
        match collapse_face(&ids).map(Face) {
            Some(face) if graph.face_area(&face) > params.area_epsilon => faces.push(face),
            _ => dropped += 1,
        }
    }

    let referenced: HashSet<NodeId> = faces.iter().flat_map(|f| f.vertices().iter_cpy()).collect();
    let kept = nodes
        .iter()
        .filter(|v| referenced.contains(&v.id()))
        .cloned()
        .collect_vec();

    let welded = target.iter().enumerate().filter(|(i, t)| i != *t).count();
    log::debug!(
        "Clean: welded {welded} nodes, dropped {dropped} faces and {} unreferenced nodes",
        nodes.len() - kept.len() - welded,
    );

    Ok(MeshGraph::from_parts_unchecked(kept, faces))
}
