// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// The interface to the learning stage, which consumes and produces graphs
pub mod model;
pub use model::*;

/// Preprocessing of whole asset folders
pub mod batch;
pub use batch::*;
