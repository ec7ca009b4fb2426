// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::preprocess::{preprocess, PreprocessConfig};
use crate::prelude::*;

/// A text-to-mesh model. The engine does not know how predictions are made,
/// it only hands graphs in and checks the graphs that come out.
pub trait MeshModel: Send + Sync {
    fn name(&self) -> &str;

    /// Produces a mesh for `prompt`, optionally starting from `seed`.
    fn predict(&self, prompt: &str, seed: Option<&MeshGraph>) -> Result<MeshGraph>;
}

/// Returns the seed unchanged, or an empty graph without one.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityModel;

impl MeshModel for IdentityModel {
    fn name(&self) -> &str {
        "identity"
    }

    fn predict(&self, _prompt: &str, seed: Option<&MeshGraph>) -> Result<MeshGraph> {
        Ok(seed.cloned().unwrap_or_default())
    }
}

/// Everything a generation step needs, passed around explicitly: the model
/// and the preprocessing applied to seeds before they reach it.
pub struct ModelContext<'a> {
    pub model: &'a dyn MeshModel,
    pub preprocess: PreprocessConfig,
}

impl<'a> ModelContext<'a> {
    pub fn new(model: &'a dyn MeshModel, preprocess: PreprocessConfig) -> Self {
        Self { model, preprocess }
    }

    /// Preprocesses the seed, runs the model and validates what it returns.
    pub fn generate(&self, prompt: &str, seed: Option<&MeshGraph>) -> Result<MeshGraph> {
        let seed = seed
            .map(|seed| preprocess(seed, &self.preprocess))
            .transpose()?;
        log::debug!(
            "Running model '{}' on prompt '{prompt}' ({} seed nodes)",
            self.model.name(),
            seed.as_ref().map(|s| s.node_count()).unwrap_or(0)
        );
        let output = self.model.predict(prompt, seed.as_ref())?;
        output.validate()?;
        Ok(output)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::preprocess::ReduceTarget;

    /// Always answers with the same cube, scaled by the prompt length.
    struct CubeModel;

    impl MeshModel for CubeModel {
        fn name(&self) -> &str {
            "cube"
        }

        fn predict(&self, prompt: &str, _seed: Option<&MeshGraph>) -> Result<MeshGraph> {
            Ok(primitives::Box::build(Vec3::ZERO, Vec3::splat(prompt.len() as f32)))
        }
    }

    #[test]
    fn identity_model_sees_preprocessed_seed() {
        let grid = primitives::Grid::build(Vec3::ZERO, Vec2::splat(2.0), (3, 3));
        let context = ModelContext::new(
            &IdentityModel,
            PreprocessConfig {
                target: Some(ReduceTarget::Count(10)),
                ..Default::default()
            },
        );
        let output = context.generate("a flat plate", Some(&grid)).unwrap();
        assert!(output.node_count() <= 10);
        assert_eq!(context.generate("nothing", None).unwrap().node_count(), 0);
    }

    #[test]
    fn model_output_is_returned() {
        let context = ModelContext::new(&CubeModel, PreprocessConfig::default());
        let cube = context.generate("box", None).unwrap();
        assert_eq!(cube.node_count(), 8);
        assert_eq!(cube.bounding_box().1, Vec3::splat(3.0));
    }
}
