// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use clap::Parser;

/// Command line definition
pub mod cli_args;

/// What each subcommand does
pub mod commands;

fn main() -> anyhow::Result<()> {
    #[cfg(feature = "tracy")]
    let _client = profiling::tracy_client::Client::start();

    // Setup logging
    env_logger::init();

    let args = cli_args::Args::parse();
    commands::run(args.command)
}
