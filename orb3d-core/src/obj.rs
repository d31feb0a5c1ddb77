/// Face-list mesh importer for Wavefront OBJ text
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use nalgebra::{Point3, Vector2, Vector3};
use nom::{
    bytes::complete::take_till1,
    character::complete::{char, i64 as integer, space0},
    combinator::{all_consuming, map_parser, opt},
    number::complete::float,
    sequence::preceded,
    IResult,
};

use crate::error::{Error, IndexKind, Result};
use crate::geometry::{
    face_normal, Color, IndexedMesh, MeshBuilder, Triangle, Vertex, VertexLayout,
};

/// Importer capabilities.
///
/// The basic variant reads exactly three corners per face; the textured variant
/// fan-triangulates polygons and flips texture V to match the graphics convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjOptions {
    pub triangulate_fans: bool,
    pub flip_v: bool,
}

impl ObjOptions {
    pub const BASIC: Self = Self {
        triangulate_fans: false,
        flip_v: false,
    };

    pub const TEXTURED: Self = Self {
        triangulate_fans: true,
        flip_v: true,
    };
}

impl ObjOptions {
    /// Interleaved layout that carries everything this variant reads
    pub fn vertex_layout(&self) -> VertexLayout {
        if self.flip_v {
            VertexLayout::PositionNormalTexcoord
        } else {
            VertexLayout::PositionNormal
        }
    }
}

impl Default for ObjOptions {
    fn default() -> Self {
        Self::TEXTURED
    }
}

/// One face corner, with 0-based indices into the raw arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceCorner {
    pub position: usize,
    pub texcoord: Option<usize>,
    pub normal: Option<usize>,
}

impl FaceCorner {
    pub fn new(position: usize) -> Self {
        Self {
            position,
            texcoord: None,
            normal: None,
        }
    }
}

/// A polygon in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Face {
    pub corners: Vec<FaceCorner>,
}

impl Face {
    pub fn new(corners: Vec<FaceCorner>) -> Self {
        Self { corners }
    }

    /// Fan triangulation around the first corner
    pub fn triangles(&self) -> impl Iterator<Item = [FaceCorner; 3]> + '_ {
        let first = self.corners.first().copied();
        self.corners
            .windows(2)
            .skip(1)
            .filter_map(move |pair| first.map(|a| [a, pair[0], pair[1]]))
    }
}

/// Raw arrays of one import, discarded once the indexed mesh is built
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjData {
    pub positions: Vec<Point3<f32>>,
    pub normals: Vec<Vector3<f32>>,
    pub texcoords: Vec<Vector2<f32>>,
    pub faces: Vec<Face>,
}

/// Parse OBJ text held in memory
pub fn parse_obj(input: &str, options: ObjOptions) -> Result<ObjData> {
    let mut parser = ObjParser::new(options);
    for (number, line) in input.lines().enumerate() {
        parser.parse_line(number + 1, line)?;
    }
    parser.finish()
}

/// Parse OBJ text line by line from a reader
pub fn read_obj<R: BufRead>(reader: R, options: ObjOptions) -> Result<ObjData> {
    let mut parser = ObjParser::new(options);
    for (number, line) in reader.lines().enumerate() {
        parser.parse_line(number + 1, &line?)?;
    }
    parser.finish()
}

/// Locate, parse and build an OBJ file in one step
pub fn load_obj_file(
    path: &Path,
    options: ObjOptions,
    layout: VertexLayout,
    face_color: Color,
) -> Result<IndexedMesh> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::ResourceMissing(path.to_path_buf()),
        _ => Error::Io(e),
    })?;

    let data = read_obj(BufReader::new(file), options)?;
    log::info!(
        "loaded {}: {} positions, {} normals, {} texcoords, {} faces",
        path.display(),
        data.positions.len(),
        data.normals.len(),
        data.texcoords.len(),
        data.faces.len(),
    );

    build(&data, layout, face_color)
}

struct ObjParser {
    options: ObjOptions,
    data: ObjData,
}

impl ObjParser {
    fn new(options: ObjOptions) -> Self {
        Self {
            options,
            data: ObjData::default(),
        }
    }

    fn parse_line(&mut self, number: usize, line: &str) -> Result<()> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }

        let (payload, keyword) =
            token(line).map_err(|_| Error::parse(number, "missing directive"))?;

        match keyword {
            "v" => {
                let [x, y, z] = numbers::<3>(payload, number)?;
                self.data.positions.push(Point3::new(x, y, z));
            }
            "vn" => {
                let [x, y, z] = numbers::<3>(payload, number)?;
                self.data.normals.push(Vector3::new(x, y, z));
            }
            "vt" => {
                let [u, v] = numbers::<2>(payload, number)?;
                let v = if self.options.flip_v { 1.0 - v } else { v };
                self.data.texcoords.push(Vector2::new(u, v));
            }
            "f" => {
                let face = self.parse_face(payload, number)?;
                self.data.faces.push(face);
            }
            other => log::trace!("line {number}: skipping `{other}` directive"),
        }

        Ok(())
    }

    fn parse_face(&self, mut payload: &str, number: usize) -> Result<Face> {
        let mut corners = Vec::with_capacity(4);

        while !payload.trim().is_empty() {
            let (rest, raw) =
                map_parser(token, all_consuming(corner))(payload).map_err(|_| {
                    Error::parse(number, format!("malformed face corner in `{}`", payload.trim()))
                })?;
            payload = rest;

            corners.push(FaceCorner {
                position: resolve(raw.position, self.data.positions.len(), IndexKind::Position)?,
                texcoord: raw
                    .texcoord
                    .map(|t| resolve(t, self.data.texcoords.len(), IndexKind::Texcoord))
                    .transpose()?,
                normal: raw
                    .normal
                    .map(|n| resolve(n, self.data.normals.len(), IndexKind::Normal))
                    .transpose()?,
            });
        }

        if corners.len() < 3 {
            return Err(Error::parse(
                number,
                format!("face needs at least 3 corners, found {}", corners.len()),
            ));
        }
        if corners.len() > 3 && !self.options.triangulate_fans {
            log::warn!(
                "line {number}: face has {} corners, keeping the first 3",
                corners.len()
            );
            corners.truncate(3);
        }

        Ok(Face::new(corners))
    }

    /// Check forward references once every element of the file is known
    fn finish(self) -> Result<ObjData> {
        let data = self.data;
        for corner in data.faces.iter().flat_map(|face| &face.corners) {
            lookup(&data.positions, corner.position, IndexKind::Position)?;
            if let Some(t) = corner.texcoord {
                lookup(&data.texcoords, t, IndexKind::Texcoord)?;
            }
            if let Some(n) = corner.normal {
                lookup(&data.normals, n, IndexKind::Normal)?;
            }
        }
        Ok(data)
    }
}

/// Face corner exactly as written, 1-based or negative (relative to the end)
struct RawCorner {
    position: i64,
    texcoord: Option<i64>,
    normal: Option<i64>,
}

fn token(input: &str) -> IResult<&str, &str> {
    preceded(space0, take_till1(|c: char| c.is_whitespace()))(input)
}

fn number(input: &str) -> IResult<&str, f32> {
    map_parser(token, all_consuming(float))(input)
}

/// Parse the leading `N` numbers; any further tokens (e.g. a `w` component) are ignored
fn numbers<const N: usize>(mut payload: &str, line: usize) -> Result<[f32; N]> {
    let mut values = [0.0; N];
    for (i, value) in values.iter_mut().enumerate() {
        let (rest, parsed) = number(payload).map_err(|_| {
            Error::parse(
                line,
                match payload.split_whitespace().next() {
                    Some(bad) => format!("invalid number `{bad}`"),
                    None => format!("expected {N} numbers, found {i}"),
                },
            )
        })?;
        *value = parsed;
        payload = rest;
    }
    Ok(values)
}

/// `pos`, `pos/tex`, `pos//norm` or `pos/tex/norm`
fn corner(input: &str) -> IResult<&str, RawCorner> {
    let (input, position) = integer(input)?;
    let (input, texcoord) = opt(preceded(char('/'), opt(integer)))(input)?;
    let (input, normal) = match texcoord {
        Some(_) => opt(preceded(char('/'), integer))(input)?,
        None => (input, None),
    };

    Ok((
        input,
        RawCorner {
            position,
            texcoord: texcoord.flatten(),
            normal,
        },
    ))
}

/// Positive indices may point past what is defined so far and are checked in `finish`.
/// Negative ones are relative to the `len` elements already read.
fn resolve(raw: i64, len: usize, kind: IndexKind) -> Result<usize> {
    if raw > 0 {
        return Ok((raw - 1) as usize);
    }

    let resolved = len as i64 + raw;
    if raw < 0 && resolved >= 0 {
        Ok(resolved as usize)
    } else {
        Err(Error::Index {
            kind,
            index: raw,
            len,
        })
    }
}

fn lookup<T: Copy>(items: &[T], index: usize, kind: IndexKind) -> Result<T> {
    items.get(index).copied().ok_or(Error::Index {
        kind,
        index: index as i64 + 1,
        len: items.len(),
    })
}

/// Turn raw import arrays into an indexed mesh.
///
/// Corners without a normal index get the face's flat normal, computed once from its first
/// three positions and shared by every corner of the face. Every new vertex gets `face_color`.
pub fn build(data: &ObjData, layout: VertexLayout, face_color: Color) -> Result<IndexedMesh> {
    let corner_count: usize = data.faces.iter().map(|f| f.corners.len()).sum();
    let mut builder = MeshBuilder::with_capacity(layout, corner_count, corner_count * 3);

    for face in &data.faces {
        let [a, b, c] = match face.corners.as_slice() {
            [a, b, c, ..] => [a, b, c],
            _ => {
                log::warn!("skipping face with {} corners", face.corners.len());
                continue;
            }
        };

        let needs_fallback = face
            .corners
            .iter()
            .any(|corner| corner.normal.is_none());
        let fallback = if needs_fallback {
            let a = lookup(&data.positions, a.position, IndexKind::Position)?;
            let b = lookup(&data.positions, b.position, IndexKind::Position)?;
            let c = lookup(&data.positions, c.position, IndexKind::Position)?;
            face_normal(&a, &b, &c)
        } else {
            Vector3::zeros()
        };

        for corners in face.triangles() {
            let mut vertices = [Vertex::from_parts(Point3::origin(), fallback); 3];
            for (vertex, corner) in vertices.iter_mut().zip(corners) {
                vertex.position = lookup(&data.positions, corner.position, IndexKind::Position)?;
                if let Some(n) = corner.normal {
                    vertex.normal = lookup(&data.normals, n, IndexKind::Normal)?;
                }
                if layout.has_texcoord() {
                    vertex.texcoord = corner
                        .texcoord
                        .map(|t| lookup(&data.texcoords, t, IndexKind::Texcoord))
                        .transpose()?;
                }
            }
            let [v0, v1, v2] = vertices;
            builder.push_triangle(&Triangle::new(v0, v1, v2), face_color);
        }
    }

    Ok(builder.finish())
}
