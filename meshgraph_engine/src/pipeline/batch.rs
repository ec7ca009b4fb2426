// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::codec::{self, Format};
use crate::preprocess::{preprocess, PreprocessConfig, ReduceTarget};
use crate::prelude::*;

/// Settings for [`process_folder`], usually loaded from a `.ron` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub preprocess: PreprocessConfig,
    pub output_format: Format,
    /// Only files in these formats are picked up. Empty means every format
    /// the codec supports.
    pub input_formats: Vec<Format>,
    /// Whether to descend into subfolders.
    pub recursive: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            preprocess: PreprocessConfig {
                target: Some(ReduceTarget::Count(2000)),
                ..Default::default()
            },
            output_format: Format::Dataset,
            input_formats: Vec::new(),
            recursive: false,
        }
    }
}

impl BatchConfig {
    pub fn from_ron_str(source: &str) -> Result<Self> {
        ron::from_str(source).map_err(|err| MeshGraphError::config(err.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_ron_str(&source)
    }

    fn accepts(&self, format: Format) -> bool {
        self.input_formats.is_empty() || self.input_formats.contains(&format)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedAsset {
    pub input: PathBuf,
    pub output: PathBuf,
    pub nodes_before: usize,
    pub nodes_after: usize,
}

/// What happened to every asset of a batch. A failing asset does not stop
/// the others.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: Vec<ProcessedAsset>,
    pub failed: Vec<(PathBuf, MeshGraphError)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl std::fmt::Display for BatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} assets processed, {} failed",
            self.processed.len(),
            self.failed.len()
        )
    }
}

/// Lists the mesh files of `input_dir` the batch would process, sorted by
/// path.
pub fn find_assets(input_dir: &Path, config: &BatchConfig) -> Result<Vec<PathBuf>> {
    let max_depth = if config.recursive { usize::MAX } else { 1 };
    let mut assets = Vec::new();
    for entry in WalkDir::new(input_dir)
        .max_depth(max_depth)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        match Format::from_path(entry.path()) {
            Ok(format) if config.accepts(format) => assets.push(entry.into_path()),
            _ => log::trace!("Skipping {}", entry.path().display()),
        }
    }
    Ok(assets)
}

/// The file `input` is written to: `<output_dir>/<name>/<name>.<ext>`.
pub fn output_path(input: &Path, output_dir: &Path, format: Format) -> PathBuf {
    let name = codec::asset_name(input);
    output_dir
        .join(&name)
        .join(format!("{name}.{}", format.extension()))
}

fn process_asset(input: &Path, output_dir: &Path, config: &BatchConfig) -> Result<ProcessedAsset> {
    log::info!("Processing {}...", input.display());
    let graph = codec::read_file(input)?;
    let result = preprocess(&graph, &config.preprocess)?;

    let output = output_path(input, output_dir, config.output_format);
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    codec::write_file(&result, &output)?;

    Ok(ProcessedAsset {
        input: input.to_path_buf(),
        output,
        nodes_before: graph.node_count(),
        nodes_after: result.node_count(),
    })
}

/// Preprocesses every mesh file in `input_dir` and writes the results under
/// `output_dir`, one subfolder per asset. Assets are processed in parallel.
/// Errors reading the folder are returned. Errors with a single asset are
/// collected in the report.
#[profiling::function]
pub fn process_folder(
    input_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &BatchConfig,
) -> Result<BatchReport> {
    let (input_dir, output_dir) = (input_dir.as_ref(), output_dir.as_ref());
    std::fs::create_dir_all(output_dir)?;

    let assets = find_assets(input_dir, config)?;
    if assets.is_empty() {
        log::warn!("No mesh files found in {}", input_dir.display());
    }

    // Each output path belongs to the first asset (in path order) that maps
    // to it. Later assets with the same name are reported as failed.
    let mut report = BatchReport::default();
    let mut claimed = HashMap::<PathBuf, &PathBuf>::new();
    let mut unique = Vec::with_capacity(assets.len());
    for input in &assets {
        let output = output_path(input, output_dir, config.output_format);
        match claimed.get(&output) {
            Some(first) => {
                let err = MeshGraphError::config(format!(
                    "{} and {} would both be written to {}",
                    first.display(),
                    input.display(),
                    output.display()
                ));
                log::warn!("Skipping {}: {err}", input.display());
                report.failed.push((input.clone(), err));
            }
            None => {
                claimed.insert(output, input);
                unique.push(input);
            }
        }
    }

    let results = unique
        .par_iter()
        .map(|input| (*input, process_asset(input, output_dir, config)))
        .collect::<Vec<_>>();

    for (input, result) in results {
        match result {
            Ok(asset) => report.processed.push(asset),
            Err(err) => {
                log::warn!("Skipping {}: {err}", input.display());
                report.failed.push((input.clone(), err));
            }
        }
    }
    log::info!("Batch finished: {report}");
    Ok(report)
}
