// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::codec::Format;
use crate::mesh::NodeId;

pub type Result<T, E = MeshGraphError> = std::result::Result<T, E>;

/// Every failure the engine can report. Structural errors are fatal to the
/// operation that produced them and are never repaired silently. Codec errors
/// carry enough context to point at the offending input.
#[derive(Debug, thiserror::Error)]
pub enum MeshGraphError {
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("degenerate geometry at node {node}: {reason}")]
    DegenerateGeometry { node: NodeId, reason: String },

    #[error("face {face} references node {node}, which did not survive the merge")]
    DanglingReference { face: usize, node: NodeId },

    #[error(
        "{format} parse error{}: {message}",
        .line.map(|l| format!(" at line {l}")).unwrap_or_default()
    )]
    ParseError {
        format: Format,
        line: Option<usize>,
        message: String,
    },

    #[error("unsupported format: '{0}'")]
    UnsupportedFormat(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MeshGraphError {
    pub fn topology(message: impl Into<String>) -> Self {
        Self::InvalidTopology(message.into())
    }

    pub fn parse(format: Format, line: Option<usize>, message: impl Into<String>) -> Self {
        Self::ParseError {
            format,
            line,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::ParseError { .. })
    }
}
