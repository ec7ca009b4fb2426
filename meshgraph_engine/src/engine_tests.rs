// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::codec::{self, Format};
use crate::pipeline::{self, BatchConfig};
use crate::preprocess::{self, CleanParams, PreprocessConfig, ReduceTarget};
use crate::prelude::*;

#[derive(Clone, Copy)]
struct Example {
    name: &'static str,
    build: fn() -> MeshGraph,
    nodes: usize,
    faces: usize,
}

fn examples() -> [Example; 4] {
    [
        Example {
            name: "box",
            build: || primitives::Box::build(Vec3::ZERO, Vec3::ONE),
            nodes: 8,
            faces: 6,
        },
        Example {
            name: "grid",
            build: || {
                primitives::Grid::build(Vec3::new(1.0, 0.5, -2.0), Vec2::new(3.0, 2.0), (6, 4))
            },
            nodes: 35,
            faces: 24,
        },
        Example {
            name: "sphere",
            build: || primitives::UVSphere::build(Vec3::ZERO, 16, 8, 2.0),
            nodes: 114,
            faces: 128,
        },
        Example {
            name: "disc",
            build: || primitives::Circle::build(Vec3::Y, 0.5, 12),
            nodes: 12,
            faces: 1,
        },
    ]
}

#[test]
pub fn test_examples_through_every_format() {
    let dir = tempfile::tempdir().unwrap();
    for example in examples() {
        let graph = (example.build)();
        assert_eq!(graph.node_count(), example.nodes, "{}", example.name);
        assert_eq!(graph.face_count(), example.faces, "{}", example.name);

        for format in Format::ALL {
            println!("Round trip of {} through {format}", example.name);
            let path = dir.path().join(format!("{}.{}", example.name, format.extension()));
            codec::write_file(&graph, &path).unwrap();
            let back = codec::read_file(&path).unwrap();

            assert_eq!(back.node_count(), example.nodes);
            if format.handler().is_lossless() {
                assert_eq!(back, graph);
            } else if matches!(format, Format::Gltf | Format::Glb) {
                assert_eq!(back.positions(), graph.positions());
                let triangles: usize = graph.faces().iter().map(|f| f.len() - 2).sum();
                assert_eq!(back.face_count(), triangles);
            } else {
                assert!(back.approx_eq(&graph, 1e-4));
            }
        }
    }
}

#[test]
pub fn test_cube_with_duplicate_vertex() {
    // The last `v` line duplicates the first one, and the first face uses it.
    let text = "\
v -0.5 -0.5 -0.5
v 0.5 -0.5 -0.5
v 0.5 -0.5 0.5
v -0.5 -0.5 0.5
v -0.5 0.5 -0.5
v -0.5 0.5 0.5
v 0.5 0.5 0.5
v 0.5 0.5 -0.5
v -0.5 -0.5 -0.5
f 9 2 3 4
f 5 6 7 8
f 5 8 2 1
f 4 3 7 6
f 6 5 1 4
f 7 3 2 8
";
    let graph = codec::decode(text.as_bytes(), Format::Obj).unwrap();
    assert_eq!(graph.node_count(), 9);

    let cleaned = preprocess::clean(&graph, &CleanParams::with_epsilon(1e-6)).unwrap();
    assert_eq!(cleaned.node_count(), 8);
    assert_eq!(cleaned.face_count(), 6);
    assert_eq!(cleaned.edges().len(), 12);

    let encoded = codec::encode(&cleaned, Format::Obj).unwrap();
    assert_eq!(codec::decode(&encoded, Format::Obj).unwrap(), cleaned);
}

#[test]
pub fn test_preprocessing_invariants() {
    for example in examples() {
        let graph = (example.build)();
        let params = CleanParams::default();

        let cleaned = preprocess::clean(&graph, &params).unwrap();
        assert!(cleaned.validate().is_ok());
        assert_eq!(preprocess::clean(&cleaned, &params).unwrap(), cleaned);

        for target in [
            ReduceTarget::Ratio(0.75),
            ReduceTarget::Ratio(0.5),
            ReduceTarget::Count(4),
        ] {
            let reduction = preprocess::reduce(&cleaned, target);
            let reduced = &reduction.graph;
            assert!(reduced.validate().is_ok());
            assert!(reduced.node_count() <= cleaned.node_count());
            if reduction.target_reached() {
                assert_eq!(reduced.node_count(), target.node_count(cleaned.node_count()));
            }
        }
    }
}

#[test]
pub fn test_merge_then_clean() {
    // Two boxes sharing a face position: stitch the second one onto the
    // first by mapping its bottom corners onto the top corners of the first.
    let a = primitives::Box::build(Vec3::ZERO, Vec3::ONE);
    let b = primitives::Box::build(Vec3::Y, Vec3::ONE);
    let joined = MeshGraph::join([&a, &b]).unwrap();
    assert_eq!(joined.node_count(), 16);

    let mut mapping = preprocess::MergeMapping::new();
    for v in joined.nodes().iter().filter(|v| v.id().get() >= 8) {
        if let Some(target) = joined
            .nodes()
            .iter()
            .take(8)
            .find(|w| w.position().abs_diff_eq(v.position(), 1e-6))
        {
            mapping.insert(v.id(), target.id());
        }
    }
    assert_eq!(mapping.len(), 4);

    let merged = preprocess::merge(&joined, &mapping).unwrap();
    assert_eq!(merged.node_count(), 12);
    assert!(merged
        .faces()
        .iter()
        .all(|f| f.vertices().iter().all(|id| !mapping.contains_key(id))));

    // Welding by distance gives the same connectivity.
    let welded = preprocess::clean(&joined, &CleanParams::with_epsilon(1e-4)).unwrap();
    assert_eq!(welded.node_count(), 12);
    assert_eq!(welded.edges().len(), merged.edges().len());
}

#[test]
pub fn test_unsupported_and_malformed_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mesh.fbx");
    std::fs::write(&path, "").unwrap();
    assert!(matches!(
        codec::read_file(&path),
        Err(MeshGraphError::UnsupportedFormat(_))
    ));

    let path = dir.path().join("mesh.obj");
    std::fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 4\n").unwrap();
    assert!(matches!(
        codec::read_file(&path),
        Err(MeshGraphError::ParseError {
            format: Format::Obj,
            line: Some(4),
            ..
        })
    ));

    assert!(matches!(
        codec::read_file(dir.path().join("missing.obj")),
        Err(MeshGraphError::Io(_))
    ));
}

#[test]
pub fn test_batch_with_ron_config() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    for example in examples() {
        let path = input.path().join(format!("{}.glb", example.name));
        codec::write_file(&(example.build)(), path).unwrap();
    }

    let config = BatchConfig {
        preprocess: PreprocessConfig::from_ron_str("(target: Some(Ratio(0.5)))").unwrap(),
        output_format: Format::Json,
        ..Default::default()
    };
    let report = pipeline::process_folder(input.path(), output.path(), &config).unwrap();
    assert!(report.is_success());
    assert_eq!(report.processed.len(), examples().len());
    for asset in &report.processed {
        assert!(asset.nodes_after <= asset.nodes_before);
        let graph = codec::read_file(&asset.output).unwrap();
        assert_eq!(graph.node_count(), asset.nodes_after);
    }
}
