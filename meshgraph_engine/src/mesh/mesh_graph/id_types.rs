// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// The integer identity of a node. Ids are unique within a [`MeshGraph`], but
/// they need not be contiguous nor sorted.
///
/// [`MeshGraph`]: super::MeshGraph
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    From,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn get(self) -> u32 {
        self.0
    }

    /// The id that comes right after this one, or `None` on overflow.
    pub fn next(self) -> Option<NodeId> {
        self.0.checked_add(1).map(NodeId)
    }
}
