// Copyright (C) 2023 meshgraph contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt::Write;

use crate::codec::{utf8, Format, FormatHandler};
use crate::prelude::*;

pub struct ObjHandler;

impl FormatHandler for ObjHandler {
    fn format(&self) -> Format {
        Format::Obj
    }

    fn encode(&self, graph: &MeshGraph) -> Result<Vec<u8>> {
        Ok(to_obj_string(graph).into_bytes())
    }

    fn decode(&self, bytes: &[u8]) -> Result<MeshGraph> {
        parse_obj(utf8(bytes, Format::Obj)?)
    }

    /// Node ids are replaced by their position, and feature vectors are not
    /// stored.
    fn is_lossless(&self) -> bool {
        false
    }
}

/// One corner of an `f` statement: `v`, `v/vt`, `v//vn` or `v/vt/vn`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Corner {
    v: i64,
    vt: Option<i64>,
    vn: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
enum Statement {
    Vertex(Vec<f32>),
    Normal(Vec<f32>),
    TexCoord(Vec<f32>),
    Face(Vec<Corner>),
}

fn parse_statement(input: &str) -> std::result::Result<Statement, String> {
    use nom::{
        branch::alt,
        bytes::complete::tag,
        character::complete::{char, i64, space0, space1},
        combinator::{all_consuming, map, opt},
        multi::many1,
        number::complete::float,
        sequence::{preceded, terminated, tuple},
        IResult, Parser,
    };

    fn coords(input: &str) -> IResult<&str, Vec<f32>> {
        many1(preceded(space1, float)).parse(input)
    }

    fn corner(input: &str) -> IResult<&str, Corner> {
        map(
            tuple((
                i64,
                opt(preceded(char('/'), opt(i64))),
                opt(preceded(char('/'), i64)),
            )),
            |(v, vt, vn)| Corner {
                v,
                vt: vt.flatten(),
                vn,
            },
        )
        .parse(input)
    }

    fn corners(input: &str) -> IResult<&str, Vec<Corner>> {
        many1(preceded(space1, corner)).parse(input)
    }

    fn statement(input: &str) -> IResult<&str, Statement> {
        alt((
            map(preceded(tag("vn"), coords), Statement::Normal),
            map(preceded(tag("vt"), coords), Statement::TexCoord),
            map(preceded(tag("v"), coords), Statement::Vertex),
            map(preceded(tag("f"), corners), Statement::Face),
        ))
        .parse(input)
    }

    all_consuming(terminated(statement, space0))
        .parse(input)
        .map(|(_, statement)| statement)
        .map_err(|err| err.to_string())
}

fn finite_vec3(values: &[f32], line: usize) -> Result<Vec3> {
    let v = Vec3::new(values[0], values[1], values[2]);
    if v.is_finite() {
        Ok(v)
    } else {
        Err(MeshGraphError::parse(
            Format::Obj,
            Some(line),
            format!("non-finite coordinate {v}"),
        ))
    }
}

/// Turns a 1-based (or negative, relative) index into a 0-based one.
/// `defined` is the number of elements of that kind seen before the
/// statement, `total` the number in the whole file.
fn resolve_index(
    index: i64,
    defined: usize,
    total: usize,
    what: &str,
    line: usize,
) -> Result<usize> {
    let resolved = match index {
        0 => None,
        i if i > 0 => Some(i as u64 - 1).filter(|i| (*i as usize) < total),
        i => (defined as i64 + i).try_into().ok(),
    };
    resolved.map(|i| i as usize).ok_or_else(|| {
        MeshGraphError::parse(
            Format::Obj,
            Some(line),
            format!("{what} index {index} is out of range, {total} defined"),
        )
    })
}

struct FaceRecord {
    line: usize,
    corners: Vec<Corner>,
    defined: (usize, usize, usize),
}

/// Parses the text of an `.obj` file. Only the geometry is read: `v`, `vn`,
/// `vt` and `f` statements. Everything else (groups, objects, materials,
/// smoothing groups, lines) is skipped.
///
/// Normals and texture coordinates are attached to nodes. When several
/// corners of the same node point to different ones, the first one wins.
#[profiling::function]
pub fn parse_obj(source: &str) -> Result<MeshGraph> {
    let mut positions = Vec::<Vec3>::new();
    let mut normals = Vec::<Vec3>::new();
    let mut uvs = Vec::<Vec2>::new();
    let mut faces = Vec::<FaceRecord>::new();

    for (line_idx, raw_line) in source.lines().enumerate() {
        let line = line_idx + 1;
        let content = raw_line.split('#').next().unwrap_or_default().trim();
        let keyword = content.split_whitespace().next().unwrap_or_default();
        if !matches!(keyword, "v" | "vn" | "vt" | "f") {
            continue;
        }

        let statement = parse_statement(content).map_err(|err| {
            MeshGraphError::parse(
                Format::Obj,
                Some(line),
                format!("malformed '{keyword}' statement '{content}': {err}"),
            )
        })?;

        let wrong_count = |n: usize| {
            MeshGraphError::parse(
                Format::Obj,
                Some(line),
                format!("unexpected number of values ({n}) in '{keyword}' statement"),
            )
        };
        match statement {
            Statement::Vertex(values) => {
                // x y z, with an optional w or an rgb color after them
                if !matches!(values.len(), 3 | 4 | 6 | 7) {
                    return Err(wrong_count(values.len()));
                }
                positions.push(finite_vec3(&values, line)?);
            }
            Statement::Normal(values) => {
                if values.len() != 3 {
                    return Err(wrong_count(values.len()));
                }
                normals.push(finite_vec3(&values, line)?);
            }
            Statement::TexCoord(values) => {
                if values.is_empty() || values.len() > 3 {
                    return Err(wrong_count(values.len()));
                }
                let uv = Vec2::new(values[0], values.get(1).copied().unwrap_or(0.0));
                if !uv.is_finite() {
                    return Err(MeshGraphError::parse(
                        Format::Obj,
                        Some(line),
                        format!("non-finite texture coordinate {uv}"),
                    ));
                }
                uvs.push(uv);
            }
            Statement::Face(corners) => {
                if corners.len() < 3 {
                    return Err(wrong_count(corners.len()));
                }
                faces.push(FaceRecord {
                    line,
                    corners,
                    defined: (positions.len(), uvs.len(), normals.len()),
                });
            }
        }
    }

    let mut node_normals = vec![None; positions.len()];
    let mut node_uvs = vec![None; positions.len()];
    let mut polygons = Vec::with_capacity(faces.len());
    for record in &faces {
        let line = record.line;
        let (v_defined, vt_defined, vn_defined) = record.defined;
        let mut polygon = SVec::<usize>::new();
        for corner in &record.corners {
            let v = resolve_index(corner.v, v_defined, positions.len(), "vertex", line)?;
            if let Some(vt) = corner.vt {
                let vt = resolve_index(vt, vt_defined, uvs.len(), "texture coordinate", line)?;
                node_uvs[v].get_or_insert(uvs[vt]);
            }
            if let Some(vn) = corner.vn {
                let vn = resolve_index(vn, vn_defined, normals.len(), "normal", line)?;
                node_normals[v].get_or_insert(normals[vn]);
            }
            polygon.push(v);
        }
        polygons.push((line, polygon));
    }

    let mut builder = MeshGraphBuilder::with_capacity(positions.len(), polygons.len());
    for (i, position) in positions.iter_cpy().enumerate() {
        let mut vertex = Vertex::new(NodeId(i as u32), position);
        vertex.normal = node_normals[i];
        vertex.uv = node_uvs[i];
        builder.add_vertex(vertex)?;
    }
    for (line, polygon) in polygons {
        builder
            .add_face(polygon.iter().map(|i| NodeId(*i as u32)))
            .map_err(|err| MeshGraphError::parse(Format::Obj, Some(line), err.to_string()))?;
    }
    Ok(builder.finalize())
}

/// Writes `graph` as `.obj` text. Normals and texture coordinates are only
/// written when every node has one. Faces reference nodes by their position
/// in the node list.
pub fn to_obj_string(graph: &MeshGraph) -> String {
    let nodes = graph.nodes();
    let with_uvs = !nodes.is_empty() && nodes.iter().all(|v| v.uv().is_some());
    let with_normals = !nodes.is_empty() && nodes.iter().all(|v| v.normal().is_some());

    let mut out = String::new();
    // Writing to a String never fails.
    let _ = writeln!(
        out,
        "# meshgraph: {} nodes, {} faces",
        graph.node_count(),
        graph.face_count()
    );
    for v in nodes {
        let p = v.position();
        let _ = writeln!(out, "v {} {} {}", p.x, p.y, p.z);
    }
    if with_uvs {
        for uv in nodes.iter().filter_map(|v| v.uv()) {
            let _ = writeln!(out, "vt {} {}", uv.x, uv.y);
        }
    }
    if with_normals {
        for n in nodes.iter().filter_map(|v| v.normal()) {
            let _ = writeln!(out, "vn {} {} {}", n.x, n.y, n.z);
        }
    }
    for face in graph.face_indices() {
        out.push('f');
        for i in face.iter().map(|i| i + 1) {
            let _ = match (with_uvs, with_normals) {
                (true, true) => write!(out, " {i}/{i}/{i}"),
                (true, false) => write!(out, " {i}/{i}"),
                (false, true) => write!(out, " {i}//{i}"),
                (false, false) => write!(out, " {i}"),
            };
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    const CUBE: &str = "\
# A unit cube
mtllib cube.mtl
o Cube
v -0.5 -0.5 -0.5
v 0.5 -0.5 -0.5
v 0.5 -0.5 0.5
v -0.5 -0.5 0.5
v -0.5 0.5 -0.5
v -0.5 0.5 0.5
v 0.5 0.5 0.5
v 0.5 0.5 -0.5
usemtl Material
s off
f 1 2 3 4
f 5 6 7 8
f 5 8 2 1
f 4 3 7 6
f 6 5 1 4
f 7 3 2 8
";

    #[test]
    fn statements() {
        assert_eq!(
            parse_statement("v 1 -2.5 3e2"),
            Ok(Statement::Vertex(vec![1.0, -2.5, 300.0]))
        );
        assert_eq!(
            parse_statement("f 1/2/3 4//5 -1"),
            Ok(Statement::Face(vec![
                Corner {
                    v: 1,
                    vt: Some(2),
                    vn: Some(3),
                },
                Corner {
                    v: 4,
                    vt: None,
                    vn: Some(5),
                },
                Corner {
                    v: -1,
                    vt: None,
                    vn: None,
                },
            ]))
        );
        assert_eq!(
            parse_statement("vt 0.5 1\t"),
            Ok(Statement::TexCoord(vec![0.5, 1.0]))
        );
        assert!(parse_statement("v 1 2 abc").is_err());
        assert!(parse_statement("f 1 2 x").is_err());
    }

    #[test]
    fn parse_cube() {
        let g = parse_obj(CUBE).unwrap();
        assert_eq!(g, primitives::Box::build(Vec3::ZERO, Vec3::ONE));
    }

    #[test]
    fn cube_round_trip() {
        let cube = primitives::Box::build(Vec3::new(0.1, 2.0, -3.3), Vec3::new(1.0, 0.3, 2.7));
        let text = to_obj_string(&cube);
        assert_eq!(parse_obj(&text).unwrap(), cube);
    }

    #[test]
    fn attributes_round_trip() {
        let mut builder = MeshGraphBuilder::new();
        for (i, p) in [Vec3::ZERO, Vec3::X, Vec3::Y].into_iter().enumerate() {
            builder
                .add_vertex(
                    Vertex::new(NodeId(i as u32), p)
                        .with_normal(Vec3::Z)
                        .with_uv(p.truncate()),
                )
                .unwrap();
        }
        builder.add_face([NodeId(0), NodeId(1), NodeId(2)]).unwrap();
        let g = builder.finalize();

        let text = to_obj_string(&g);
        assert!(text.contains("f 1/1/1 2/2/2 3/3/3"));
        assert_eq!(parse_obj(&text).unwrap(), g);
    }

    #[test]
    fn relative_indices() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\nv 1 1 0\nf 2 -1 3\n";
        let g = parse_obj(text).unwrap();
        assert_eq!(g.face_count(), 2);
        assert_eq!(g.faces()[1].vertices(), &[NodeId(1), NodeId(3), NodeId(2)]);
    }

    #[test]
    fn index_past_vertex_count() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 4\n";
        match parse_obj(text) {
            Err(MeshGraphError::ParseError { format, line, .. }) => {
                assert_eq!(format, Format::Obj);
                assert_eq!(line, Some(4));
            }
            other => panic!("Expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_input() {
        let line_of = |text: &str| match parse_obj(text) {
            Err(MeshGraphError::ParseError { line, .. }) => line,
            other => panic!("Expected a parse error, got {other:?}"),
        };
        assert_eq!(line_of("v 0 0\n"), Some(1));
        assert_eq!(line_of("v 0 0 0\nv 1 zero 0\n"), Some(2));
        assert_eq!(line_of("v 0 0 0\nv 1 0 0\nf 1 2\n"), Some(3));
        assert_eq!(line_of("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 0 2\n"), Some(4));
        assert_eq!(line_of("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 1\n"), Some(4));
        assert_eq!(line_of("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 -4\n"), Some(4));
        assert_eq!(line_of("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1/1 2/1 3/1\n"), Some(4));
        assert_eq!(line_of("v nan 0 0\n"), Some(1));
    }
}
