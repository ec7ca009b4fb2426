// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::f32::consts::PI;

use crate::prelude::*;

pub struct Box;

impl Box {
    pub fn build(center: Vec3, size: Vec3) -> MeshGraph {
        let hsize = size * 0.5;

        let v1 = center + Vec3::new(-hsize.x, -hsize.y, -hsize.z);
        let v2 = center + Vec3::new(hsize.x, -hsize.y, -hsize.z);
        let v3 = center + Vec3::new(hsize.x, -hsize.y, hsize.z);
        let v4 = center + Vec3::new(-hsize.x, -hsize.y, hsize.z);

        let v5 = center + Vec3::new(-hsize.x, hsize.y, -hsize.z);
        let v6 = center + Vec3::new(-hsize.x, hsize.y, hsize.z);
        let v7 = center + Vec3::new(hsize.x, hsize.y, hsize.z);
        let v8 = center + Vec3::new(hsize.x, hsize.y, -hsize.z);

        MeshGraph::from_polygons(
            &[v1, v2, v3, v4, v5, v6, v7, v8],
            &[
                [0u32, 1, 2, 3],
                [4, 5, 6, 7],
                [4, 7, 1, 0],
                [3, 2, 6, 5],
                [5, 4, 0, 3],
                [6, 2, 1, 7],
            ],
        )
        .expect("Cube construction should not fail")
    }
}

pub struct Quad;
impl Quad {
    pub fn build(center: Vec3, normal: Vec3, right: Vec3, size: Vec2) -> MeshGraph {
        let normal = normal.normalize();
        let right = right.normalize();
        let forward = normal.cross(right);

        let hsize = size * 0.5;

        let v1 = center + hsize.x * right + hsize.y * forward;
        let v2 = center - hsize.x * right + hsize.y * forward;
        let v3 = center - hsize.x * right - hsize.y * forward;
        let v4 = center + hsize.x * right - hsize.y * forward;

        MeshGraph::from_polygons(&[v1, v2, v3, v4], &[[0u32, 1, 2, 3]])
            .expect("Quad construction should not fail")
    }
}

/// A flat grid on the XZ plane made of `cells.0 * cells.1` quads. Node ids
/// go row by row, starting at the `-X -Z` corner.
pub struct Grid;
impl Grid {
    pub fn build(center: Vec3, size: Vec2, cells: (u32, u32)) -> MeshGraph {
        let (cx, cz) = (cells.0.max(1), cells.1.max(1));
        let origin = center - Vec3::new(size.x, 0.0, size.y) * 0.5;
        let step = Vec2::new(size.x / cx as f32, size.y / cz as f32);

        let mut vertices = Vec::with_capacity(((cx + 1) * (cz + 1)) as usize);
        for j in 0..=cz {
            for i in 0..=cx {
                vertices.push(origin + Vec3::new(i as f32 * step.x, 0.0, j as f32 * step.y));
            }
        }

        let row = cx + 1;
        let mut polygons = Vec::<SVec<u32>>::with_capacity((cx * cz) as usize);
        for j in 0..cz {
            for i in 0..cx {
                let i0 = j * row + i;
                polygons.push(smallvec::smallvec![i0, i0 + row, i0 + row + 1, i0 + 1]);
            }
        }

        MeshGraph::from_polygons(&vertices, &polygons).expect("Grid construction should not fail")
    }
}

pub struct Circle;
impl Circle {
    pub fn build(center: Vec3, radius: f32, num_vertices: usize) -> MeshGraph {
        let num_vertices = num_vertices.max(3);
        let angle_delta = (2.0 * PI) / num_vertices as f32;
        let verts = (0..num_vertices)
            .map(|i| {
                let (sin, cos) = (angle_delta * i as f32).sin_cos();
                center + Vec3::new(sin, 0.0, cos) * radius
            })
            .collect_vec();
        let polygon = (0..num_vertices).collect_vec();

        MeshGraph::from_polygons(&verts, &[&polygon])
            .expect("Circle construction should not fail")
    }
}

pub struct UVSphere;
impl UVSphere {
    pub fn build(center: Vec3, segments: u32, rings: u32, radius: f32) -> MeshGraph {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let mut vertices = Vec::<Vec3>::new();
        let mut polygons = Vec::<SVec<u32>>::new();

        let top_vertex = 0;
        vertices.push(center + Vec3::Y * radius);

        for i in 0..rings - 1 {
            let phi = PI * (i + 1) as f32 / rings as f32;
            for j in 0..segments {
                let theta = 2.0 * PI * j as f32 / segments as f32;
                let x = phi.sin() * theta.cos() * radius;
                let y = phi.cos() * radius;
                let z = phi.sin() * theta.sin() * radius;
                vertices.push(center + Vec3::new(x, y, z));
            }
        }

        let bottom_vertex = vertices.len() as u32;
        vertices.push(center - Vec3::Y * radius);

        // Top triangles
        for i in 0..segments {
            let i0 = i + 1;
            let i1 = (i + 1) % segments + 1;
            polygons.push(smallvec::smallvec![top_vertex, i1, i0]);
        }
        // Bottom triangles
        for i in 0..segments {
            let i0 = i + segments * (rings - 2) + 1;
            let i1 = (i + 1) % segments + segments * (rings - 2) + 1;
            polygons.push(smallvec::smallvec![bottom_vertex, i0, i1]);
        }
        // Middle quads
        for j in 0..rings - 2 {
            let j0 = j * segments + 1;
            let j1 = (j + 1) * segments + 1;
            for i in 0..segments {
                let i0 = j0 + i;
                let i1 = j0 + (i + 1) % segments;
                let i2 = j1 + (i + 1) % segments;
                let i3 = j1 + i;
                polygons.push(smallvec::smallvec![i0, i1, i2, i3]);
            }
        }

        MeshGraph::from_polygons(&vertices, &polygons)
            .expect("Sphere construction should not fail")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn grid_layout() {
        let grid = Grid::build(Vec3::ZERO, Vec2::splat(2.0), (2, 3));
        assert_eq!(grid.node_count(), 12);
        assert_eq!(grid.face_count(), 6);
        assert_eq!(grid.position(NodeId(0)), Some(Vec3::new(-1.0, 0.0, -1.0)));
        let last = grid.position(NodeId(11)).unwrap();
        assert!(last.abs_diff_eq(Vec3::new(1.0, 0.0, 1.0), 1e-6));
        for face in grid.faces() {
            assert!(grid.face_normal(face).abs_diff_eq(Vec3::Y, 1e-6)
                || grid.face_normal(face).abs_diff_eq(-Vec3::Y, 1e-6));
        }
    }

    #[test]
    fn sphere_is_closed() {
        let sphere = UVSphere::build(Vec3::ZERO, 8, 4, 1.0);
        assert_eq!(sphere.node_count(), 2 + 8 * 3);
        assert_eq!(sphere.face_count(), 8 * 2 + 8 * 2);
        assert_eq!(sphere.adjacency().boundary_edges().count(), 0);
    }

    #[test]
    fn circle_is_a_single_ngon() {
        let circle = Circle::build(Vec3::ZERO, 1.0, 6);
        assert_eq!(circle.face_count(), 1);
        assert_eq!(circle.faces()[0].len(), 6);
        assert_eq!(circle.adjacency().boundary_edges().count(), 6);
    }
}
