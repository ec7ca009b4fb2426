// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Orderable / hashable wrappers over float vectors.
pub mod math;

/// Small vectors, iterator and slice helpers shared by the other crates.
pub mod utils;
