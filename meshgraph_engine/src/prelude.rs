// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub use crate::error::{MeshGraphError, Result};

pub use glam::{Vec2, Vec3};

pub use itertools::Itertools;
pub use std::collections::{HashMap, HashSet};

pub use crate::mesh::mesh_graph::*;
pub use crate::mesh::primitives;

pub use meshgraph_commons::math::*;
pub use meshgraph_commons::utils::*;
