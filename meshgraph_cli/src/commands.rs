// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use anyhow::{bail, Context, Result};
use meshgraph_engine::codec;
use meshgraph_engine::mesh::{MeshGraph, Vertex};
use meshgraph_engine::pipeline::{self, BatchConfig};
use meshgraph_engine::preprocess::{self, CleanParams, PreprocessConfig, ReduceTarget};

use crate::cli_args::Command;

fn read(path: &Path) -> Result<MeshGraph> {
    codec::read_file(path).with_context(|| format!("Reading {}", path.display()))
}

fn write(graph: &MeshGraph, path: &Path) -> Result<()> {
    codec::write_file(graph, path).with_context(|| format!("Writing {}", path.display()))
}

fn info(path: &Path) -> Result<()> {
    let graph = read(path)?;
    let adjacency = graph.adjacency();
    let (center, size) = graph.bounding_box();
    let count = |f: fn(&Vertex) -> bool| graph.nodes().iter().filter(|&v| f(v)).count();
    let coverage = |n: usize| match n {
        0 => "none".to_string(),
        n if n == graph.node_count() => "all".to_string(),
        n => n.to_string(),
    };

    println!("{}", path.display());
    println!("  nodes:              {}", graph.node_count());
    println!("  distinct positions: {}", graph.distinct_positions());
    println!("  faces:              {}", graph.face_count());
    println!("  edges:              {}", graph.edges().len());
    println!("  boundary edges:     {}", adjacency.boundary_edges().count());
    println!("  non-manifold edges: {}", adjacency.non_manifold_edges().count());
    println!("  bounding box:       center {center}, size {size}");
    println!("  canonical ids:      {}", graph.is_canonical());
    println!("  normals:            {}", coverage(count(|v| v.normal().is_some())));
    println!("  uvs:                {}", coverage(count(|v| v.uv().is_some())));
    println!("  features:           {}", coverage(count(|v| v.features().is_some())));
    Ok(())
}

fn load_preprocess_config(path: Option<&Path>) -> Result<PreprocessConfig> {
    match path {
        Some(path) => PreprocessConfig::load(path)
            .with_context(|| format!("Loading configuration {}", path.display())),
        None => Ok(PreprocessConfig::default()),
    }
}

pub fn run(command: Command) -> Result<()> {
    match command {
        Command::Info { file } => info(&file),
        Command::Convert { input, output } => {
            let graph = read(&input)?;
            write(&graph, &output)
        }
        Command::Clean {
            input,
            output,
            epsilon,
            area_epsilon,
        } => {
            let defaults = CleanParams::default();
            let params = CleanParams {
                epsilon: epsilon.unwrap_or(defaults.epsilon),
                area_epsilon: area_epsilon.unwrap_or(defaults.area_epsilon),
            };
            let graph = read(&input)?;
            let cleaned = preprocess::clean(&graph, &params)?;
            log::info!(
                "Cleaned {}: {} -> {} nodes",
                input.display(),
                graph.node_count(),
                cleaned.node_count()
            );
            write(&cleaned, &output)
        }
        Command::Reduce {
            input,
            output,
            count,
            ratio,
        } => {
            let target = match (count, ratio) {
                (Some(count), _) => ReduceTarget::Count(count),
                (None, Some(ratio)) => ReduceTarget::Ratio(ratio),
                (None, None) => bail!("Either --count or --ratio is required"),
            };
            let reduction = preprocess::reduce(&read(&input)?, target);
            log::info!("{reduction}");
            write(&reduction.graph, &output)
        }
        Command::Merge {
            input,
            output,
            mapping,
        } => {
            let mapping = preprocess::load_mapping(&mapping)
                .with_context(|| format!("Loading mapping {}", mapping.display()))?;
            let merged = preprocess::merge(&read(&input)?, &mapping)?;
            write(&merged, &output)
        }
        Command::Preprocess {
            input,
            output,
            config,
            target,
        } => {
            let mut config = load_preprocess_config(config.as_deref())?;
            if let Some(target) = target {
                config.target = Some(ReduceTarget::Count(target));
            }
            let result = preprocess::preprocess(&read(&input)?, &config)?;
            write(&result, &output)
        }
        Command::Batch {
            input_dir,
            output_dir,
            config,
            format,
            target,
            recursive,
        } => {
            let mut config = match config {
                Some(path) => BatchConfig::load(&path)
                    .with_context(|| format!("Loading configuration {}", path.display()))?,
                None => BatchConfig::default(),
            };
            if let Some(format) = format {
                config.output_format = format;
            }
            if let Some(target) = target {
                config.preprocess.target = Some(ReduceTarget::Count(target));
            }
            config.recursive |= recursive;

            let report = pipeline::process_folder(&input_dir, &output_dir, &config)
                .with_context(|| format!("Processing folder {}", input_dir.display()))?;
            for asset in &report.processed {
                println!(
                    "{} -> {} ({} -> {} nodes)",
                    asset.input.display(),
                    asset.output.display(),
                    asset.nodes_before,
                    asset.nodes_after
                );
            }
            for (path, err) in &report.failed {
                eprintln!("{}: {err}", path.display());
            }
            if !report.is_success() {
                bail!("{report}");
            }
            Ok(())
        }
    }
}
