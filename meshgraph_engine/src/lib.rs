// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Some useful re-exports
pub mod prelude;

/// The error type shared by every engine operation
pub mod error;
pub use error::{MeshGraphError, Result};

/// The mesh graph data structure and some primitive shapes
pub mod mesh;

/// Mesh cleanup, vertex merging and decimation
pub mod preprocess;

/// Reading and writing mesh graphs in interchange formats
pub mod codec;

/// The boundary with the learning stage, and batch processing of asset folders
pub mod pipeline;

#[cfg(test)]
mod engine_tests;
