// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// Wavefront `.obj`, ASCII
pub mod obj;

/// Plain JSON node and face lists
pub mod json;

/// glTF 2.0, both the JSON flavor with an embedded buffer and `.glb`
pub mod gltf;

/// The compact per-asset record of the training dataset
pub mod dataset;

/// The interchange formats a [`MeshGraph`] can be read from and written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[display(fmt = "obj")]
    Obj,
    #[display(fmt = "json")]
    Json,
    #[display(fmt = "gltf")]
    Gltf,
    #[display(fmt = "glb")]
    Glb,
    #[display(fmt = "dataset")]
    Dataset,
}

impl Format {
    pub const ALL: [Format; 5] = [
        Format::Obj,
        Format::Json,
        Format::Gltf,
        Format::Glb,
        Format::Dataset,
    ];

    /// The short name of the format, as accepted by [`Format::from_tag`].
    pub fn tag(self) -> &'static str {
        match self {
            Format::Obj => "obj",
            Format::Json => "json",
            Format::Gltf => "gltf",
            Format::Glb => "glb",
            Format::Dataset => "dataset",
        }
    }

    /// The file name suffix used when writing files, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Dataset => "dataset.json",
            other => other.tag(),
        }
    }

    pub fn from_tag(tag: &str) -> Result<Format> {
        let lower = tag.trim().trim_start_matches('.').to_ascii_lowercase();
        Format::ALL
            .into_iter()
            .find(|f| f.tag() == lower || f.extension() == lower)
            .ok_or_else(|| MeshGraphError::UnsupportedFormat(tag.to_string()))
    }

    /// Guesses the format from a file name. `.dataset.json` is checked
    /// before the plain `.json` extension.
    pub fn from_path(path: &Path) -> Result<Format> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if file_name.ends_with(".dataset.json") {
            return Ok(Format::Dataset);
        }
        match path.extension() {
            Some(ext) => Format::from_tag(&ext.to_string_lossy()),
            None => Err(MeshGraphError::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn handler(self) -> &'static dyn FormatHandler {
        match self {
            Format::Obj => &obj::ObjHandler,
            Format::Json => &json::JsonHandler,
            Format::Gltf => &crate::codec::gltf::GltfHandler { binary: false },
            Format::Glb => &crate::codec::gltf::GltfHandler { binary: true },
            Format::Dataset => &dataset::DatasetHandler,
        }
    }
}

/// Reads and writes one [`Format`].
pub trait FormatHandler: Send + Sync {
    fn format(&self) -> Format;

    fn encode(&self, graph: &MeshGraph) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<MeshGraph>;

    /// Like `encode`, for formats that store an asset name.
    fn encode_named(&self, graph: &MeshGraph, _name: &str) -> Result<Vec<u8>> {
        self.encode(graph)
    }

    /// Whether every graph survives an encode / decode round trip unchanged.
    fn is_lossless(&self) -> bool {
        true
    }
}

pub fn encode(graph: &MeshGraph, format: Format) -> Result<Vec<u8>> {
    format.handler().encode(graph)
}

pub fn decode(bytes: &[u8], format: Format) -> Result<MeshGraph> {
    format.handler().decode(bytes)
}

/// Reads a graph from `path`, picking the format from its extension.
pub fn read_file(path: impl AsRef<Path>) -> Result<MeshGraph> {
    let path = path.as_ref();
    let format = Format::from_path(path)?;
    let bytes = {
        let mut file = File::open(path)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        bytes
    };
    log::debug!("Decoding {} ({format}, {} bytes)", path.display(), bytes.len());
    decode(&bytes, format)
}

/// Writes `graph` to `path`, picking the format from its extension.
pub fn write_file(graph: &MeshGraph, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let format = Format::from_path(path)?;
    let name = asset_name(path);
    let bytes = format.handler().encode_named(graph, &name)?;

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&bytes)?;
    writer.flush()?;
    log::debug!("Wrote {} ({format}, {} bytes)", path.display(), bytes.len());
    Ok(())
}

/// The file name of `path` without any of the known extensions.
pub fn asset_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let lower = file_name.to_ascii_lowercase();
    Format::ALL
        .iter()
        .map(|f| format!(".{}", f.extension()))
        .find(|suffix| lower.ends_with(suffix.as_str()))
        .map(|suffix| file_name[..file_name.len() - suffix.len()].to_string())
        .unwrap_or(file_name)
}

/// Bytes to `&str`, for the text formats.
pub(crate) fn utf8(bytes: &[u8], format: Format) -> Result<&str> {
    std::str::from_utf8(bytes)
        .map_err(|err| MeshGraphError::parse(format, None, format!("input is not UTF-8: {err}")))
}
