// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// The MeshGraph data structure: nodes, polygonal faces and their adjacency.
pub mod mesh_graph;
pub use mesh_graph::*;

/// Procedurally generated shapes, mostly useful to build test inputs.
pub mod primitives;
