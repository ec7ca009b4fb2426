// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use meshgraph_engine::codec::Format;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Prints statistics about a mesh file
    Info { file: PathBuf },

    /// Converts a mesh file to another format, chosen by the output extension
    Convert {
        input: PathBuf,
        output: PathBuf,
    },

    /// Welds close vertices and removes degenerate faces and unused vertices
    Clean {
        input: PathBuf,
        output: PathBuf,
        /// Vertices this close are welded together
        #[arg(long)]
        epsilon: Option<f32>,
        /// Faces with this area or less are removed
        #[arg(long)]
        area_epsilon: Option<f32>,
    },

    /// Decimates a mesh by collapsing its shortest edges
    Reduce {
        input: PathBuf,
        output: PathBuf,
        /// Target node count
        #[arg(long, conflicts_with = "ratio", required_unless_present = "ratio")]
        count: Option<usize>,
        /// Target node count, as a fraction of the current one
        #[arg(long)]
        ratio: Option<f32>,
    },

    /// Merges vertices following an `old id -> new id` mapping stored as ron
    Merge {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        mapping: PathBuf,
    },

    /// Runs the full preprocessing sequence (clean, reduce, weld) on one file
    Preprocess {
        input: PathBuf,
        output: PathBuf,
        /// A `.ron` preprocessing configuration
        #[arg(long)]
        config: Option<PathBuf>,
        /// Overrides the reduction target of the configuration
        #[arg(long)]
        target: Option<usize>,
    },

    /// Preprocesses every mesh file in a folder
    Batch {
        input_dir: PathBuf,
        output_dir: PathBuf,
        /// A `.ron` batch configuration
        #[arg(long)]
        config: Option<PathBuf>,
        /// Overrides the output format of the configuration
        #[arg(long, value_parser = parse_format)]
        format: Option<Format>,
        /// Overrides the reduction target of the configuration
        #[arg(long)]
        target: Option<usize>,
        /// Also look for files in subfolders
        #[arg(long)]
        recursive: bool,
    },
}

fn parse_format(tag: &str) -> Result<Format, String> {
    Format::from_tag(tag).map_err(|err| err.to_string())
}
