// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// Vertex welding and removal of degenerate and unused elements
pub mod clean;
pub use clean::*;

/// Vertex merging driven by an explicit id correspondence
pub mod merge;
pub use merge::*;

/// Shortest-edge-first decimation
pub mod reduce;
pub use reduce::*;

/// Rewrites a polygon after some of its ids were replaced. Consecutive
/// repeated ids are collapsed. Returns `None` when what is left is not a
/// valid face anymore: fewer than three ids, or an id visited twice.
pub(crate) fn collapse_face(ids: &[NodeId]) -> Option<SVec<NodeId>> {
    let ids = dedup_cyclic(ids);
    if ids.len() < 3 || ids.has_duplicates() {
        None
    } else {
        Some(ids)
    }
}

/// The settings of a full preprocessing run, usually stored as a `.ron` file
/// next to the assets.
///
/// ```ron
/// (
///     clean: (epsilon: 1e-6, area_epsilon: 0.0),
///     target: Some(Count(2048)),
///     post_weld_epsilon: Some(1e-4),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub clean: CleanParams,
    /// When set, the cleaned mesh is decimated toward this node count.
    pub target: Option<ReduceTarget>,
    /// When set, a last weld with this distance runs after the reduction.
    pub post_weld_epsilon: Option<f32>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            clean: CleanParams::default(),
            target: None,
            post_weld_epsilon: Some(1e-4),
        }
    }
}

impl PreprocessConfig {
    pub fn from_ron_str(source: &str) -> Result<Self> {
        ron::from_str(source).map_err(|err| MeshGraphError::config(err.to_string()))
    }

    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|err| MeshGraphError::config(err.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_ron_str(&source)
    }
}

/// Runs the whole preprocessing sequence on `graph`: clean, then reduce
/// (when a target is configured), then a final weld of the vertices the
/// reduction brought together.
#[profiling::function]
pub fn preprocess(graph: &MeshGraph, config: &PreprocessConfig) -> Result<MeshGraph> {
    let mut result = clean(graph, &config.clean)?;

    if let Some(target) = config.target {
        let reduction = reduce(&result, target);
        log::debug!("{reduction}");
        result = reduction.graph;
    }

    if let Some(epsilon) = config.post_weld_epsilon {
        let params = CleanParams {
            epsilon,
            ..config.clean
        };
        result = clean(&result, &params)?;
    }

    log::debug!(
        "Preprocessed mesh: {} -> {} nodes, {} -> {} faces",
        graph.node_count(),
        result.node_count(),
        graph.face_count(),
        result.face_count()
    );
    Ok(result)
}
