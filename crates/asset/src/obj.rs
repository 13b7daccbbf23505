//! Two-pass OBJ loader for triangle meshes.
//!
//! Only `v`, `vn`, `vt` and `f` records are read; every other leading token
//! is skipped. Faces must be triangles written as `v/vt/vn` corner triples.
//! The first pass counts records so the second pass can allocate once.
//! Every face gets three fresh vertices, so the result has exactly
//! `3 * faces` vertices and triangle `f` is `(3f, 3f+1, 3f+2)`.

use std::{
    fmt, fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::mesh::{Mesh, MeshError, MeshVertex, Triangle};

/// Kind of a recognised OBJ record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Position,
    Normal,
    TexCoord,
    Face,
}

impl RecordKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "v" => Some(Self::Position),
            "vn" => Some(Self::Normal),
            "vt" => Some(Self::TexCoord),
            "f" => Some(Self::Face),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Position => "position",
            Self::Normal => "normal",
            Self::TexCoord => "texcoord",
            Self::Face => "face",
        })
    }
}

/// Any error aborts the whole load; no partial mesh is produced.
#[derive(Debug, Error)]
pub enum ObjError {
    #[error("could not open OBJ file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read OBJ source")]
    Read(#[from] io::Error),
    #[error("OBJ file {} is not valid UTF-8 text", .path.display())]
    NotText { path: PathBuf },
    #[error("line {line}: malformed {kind} record, expected {expected} numbers")]
    MalformedRecord {
        line: usize,
        kind: RecordKind,
        expected: usize,
    },
    #[error("line {line}: face has {found} corners, only triangles are supported")]
    FaceCorners { line: usize, found: usize },
    #[error("line {line}: face corner '{corner}' is not of the form v/vt/vn")]
    MalformedCorner { line: usize, corner: String },
    #[error("line {line}: {kind} index {index} is out of range (1..={count})")]
    IndexOutOfRange {
        line: usize,
        kind: RecordKind,
        index: usize,
        count: usize,
    },
    #[error("OBJ source contains no faces")]
    NoFaces,
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// Number of records of each kind found by the scanning pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecordCounts {
    pub positions: usize,
    pub normals: usize,
    pub texcoords: usize,
    pub faces: usize,
}

impl RecordCounts {
    pub fn scan(source: &str) -> Self {
        let mut counts = Self::default();
        let kinds = source
            .lines()
            .filter_map(|l| l.split_whitespace().next())
            .filter_map(RecordKind::from_tag);
        for kind in kinds {
            match kind {
                RecordKind::Position => counts.positions += 1,
                RecordKind::Normal => counts.normals += 1,
                RecordKind::TexCoord => counts.texcoords += 1,
                RecordKind::Face => counts.faces += 1,
            }
        }
        counts
    }
}

/// Where a load currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    Scanning,
    Parsing,
    Done,
    Failed,
}

/// Loader over an in-memory OBJ source.
pub struct ObjLoader<'a> {
    source: &'a str,
    state: LoadState,
}

impl<'a> ObjLoader<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            state: LoadState::Scanning,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Run both passes and build the mesh.
    pub fn load(&mut self) -> Result<Mesh, ObjError> {
        self.state = LoadState::Scanning;
        let counts = RecordCounts::scan(self.source);
        log::debug!(
            "OBJ scan: found {} vertices, {} normals, {} texcoords, {} faces",
            counts.positions,
            counts.normals,
            counts.texcoords,
            counts.faces
        );

        self.state = LoadState::Parsing;
        match parse(self.source, &counts) {
            Ok(mesh) => {
                self.state = LoadState::Done;
                Ok(mesh)
            }
            Err(err) => {
                self.state = LoadState::Failed;
                Err(err)
            }
        }
    }
}

/// Load an OBJ mesh from a file path.
pub fn load_obj_from_path(path: impl AsRef<Path>) -> Result<Mesh, ObjError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| ObjError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let source = String::from_utf8(bytes).map_err(|_| ObjError::NotText {
        path: path.to_path_buf(),
    })?;
    let mesh = load_obj_from_str(&source)?;
    log::info!(
        "Loaded OBJ {:?}: {} vertices, {} triangles",
        path,
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

/// Load an OBJ mesh from any reader. The source is buffered in full since
/// it is read twice.
pub fn load_obj_from_reader<R: Read>(mut reader: R) -> Result<Mesh, ObjError> {
    let mut source = String::new();
    reader.read_to_string(&mut source)?;
    load_obj_from_str(&source)
}

pub fn load_obj_from_str(source: &str) -> Result<Mesh, ObjError> {
    ObjLoader::new(source).load()
}

impl Mesh {
    /// Replace the content with a mesh read from `path`. On failure the mesh
    /// is left empty.
    pub fn read_obj(&mut self, path: impl AsRef<Path>) -> Result<(), ObjError> {
        match load_obj_from_path(path) {
            Ok(mesh) => {
                *self = mesh;
                Ok(())
            }
            Err(err) => {
                self.clear();
                Err(err)
            }
        }
    }
}

/// 1-based indices of one face corner, as written in the file.
#[derive(Clone, Copy, Debug)]
struct Corner {
    position: usize,
    texcoord: usize,
    normal: usize,
}

#[derive(Debug)]
struct Face {
    line: usize,
    corners: [Corner; 3],
}

fn parse(source: &str, counts: &RecordCounts) -> Result<Mesh, ObjError> {
    let mut positions: Vec<[f32; 3]> = Vec::with_capacity(counts.positions);
    let mut normals: Vec<[f32; 3]> = Vec::with_capacity(counts.normals);
    let mut texcoords: Vec<[f32; 2]> = Vec::with_capacity(counts.texcoords);
    let mut faces: Vec<Face> = Vec::with_capacity(counts.faces);

    for (idx, raw) in source.lines().enumerate() {
        let line = idx + 1;
        let mut fields = raw.split_whitespace();
        let Some(kind) = fields.next().and_then(RecordKind::from_tag) else {
            continue;
        };
        match kind {
            RecordKind::Position => positions.push(parse_floats(fields, line, kind)?),
            RecordKind::Normal => normals.push(parse_floats(fields, line, kind)?),
            RecordKind::TexCoord => texcoords.push(parse_floats(fields, line, kind)?),
            RecordKind::Face => faces.push(parse_face(fields, line)?),
        }
    }

    if faces.is_empty() {
        return Err(ObjError::NoFaces);
    }
    let vertex_count = faces.len() * 3;
    u32::try_from(vertex_count).map_err(|_| MeshError::TooManyVertices(vertex_count))?;

    // Corners are resolved only now so faces may refer to attributes that
    // appear later in the file.
    let mut vertices = Vec::with_capacity(vertex_count);
    for face in &faces {
        for corner in &face.corners {
            vertices.push(MeshVertex::new(
                lookup(&positions, corner.position, face.line, RecordKind::Position)?,
                lookup(&normals, corner.normal, face.line, RecordKind::Normal)?,
                lookup(&texcoords, corner.texcoord, face.line, RecordKind::TexCoord)?,
            ));
        }
    }
    let triangles = (0..faces.len() as u32)
        .map(|f| Triangle::new(3 * f, 3 * f + 1, 3 * f + 2))
        .collect();

    Ok(Mesh::from_parts(vertices, triangles)?)
}

/// Parse the first `N` fields as floats. Trailing fields (such as an OBJ
/// `w` component) are ignored.
fn parse_floats<'s, const N: usize>(
    mut fields: impl Iterator<Item = &'s str>,
    line: usize,
    kind: RecordKind,
) -> Result<[f32; N], ObjError> {
    let mut out = [0.0; N];
    for slot in &mut out {
        *slot = fields
            .next()
            .and_then(|token| token.parse::<f32>().ok())
            .ok_or(ObjError::MalformedRecord {
                line,
                kind,
                expected: N,
            })?;
    }
    Ok(out)
}

fn parse_face<'s>(fields: impl Iterator<Item = &'s str>, line: usize) -> Result<Face, ObjError> {
    let tokens: Vec<&str> = fields.collect();
    let &[a, b, c] = tokens.as_slice() else {
        return Err(ObjError::FaceCorners {
            line,
            found: tokens.len(),
        });
    };
    Ok(Face {
        line,
        corners: [
            parse_corner(a, line)?,
            parse_corner(b, line)?,
            parse_corner(c, line)?,
        ],
    })
}

fn parse_corner(token: &str, line: usize) -> Result<Corner, ObjError> {
    let malformed = || ObjError::MalformedCorner {
        line,
        corner: token.to_string(),
    };
    let mut parts = token.split('/').map(|p| p.parse::<usize>().map_err(|_| malformed()));
    let (Some(position), Some(texcoord), Some(normal), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed());
    };
    Ok(Corner {
        position: position?,
        texcoord: texcoord?,
        normal: normal?,
    })
}

fn lookup<T: Copy>(
    items: &[T],
    index: usize,
    line: usize,
    kind: RecordKind,
) -> Result<T, ObjError> {
    index
        .checked_sub(1)
        .and_then(|i| items.get(i))
        .copied()
        .ok_or(ObjError::IndexOutOfRange {
            line,
            kind,
            index,
            count: items.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "\
v -1.0 -1.0 0.0
v 1.0 -1.0 0.0
v 0.0 1.0 0.0
vn 0.0 0.0 1.0
vt 0.0 0.0
vt 1.0 0.0
vt 0.5 1.0
f 1/1/1 2/2/1 3/3/1
";

    #[test]
    fn parse_simple_triangle() {
        let mesh = load_obj_from_str(TRIANGLE).expect("parse triangle");
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.indices(), &[0, 1, 2]);
        assert_eq!(mesh.vertices()[2].uv, [0.5, 1.0]);
        assert_eq!(mesh.vertices()[1].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn scan_counts_every_record_kind() {
        let counts = RecordCounts::scan(TRIANGLE);
        assert_eq!(
            counts,
            RecordCounts {
                positions: 3,
                normals: 1,
                texcoords: 3,
                faces: 1
            }
        );
    }

    #[test]
    fn faces_never_share_vertices() {
        let src = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
vt 0 0
f 1/1/1 2/1/1 3/1/1
f 1/1/1 3/1/1 4/1/1
";
        let mesh = load_obj_from_str(src).unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.indices(), &[0, 1, 2, 3, 4, 5]);
        assert_eq!(mesh.vertices()[0], mesh.vertices()[3]);
    }

    #[test]
    fn quad_face_is_fatal() {
        let src = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
vt 0 0
f 1/1/1 2/1/1 3/1/1 4/1/1
";
        let mut loader = ObjLoader::new(src);
        let err = loader.load().unwrap_err();
        assert!(matches!(err, ObjError::FaceCorners { line: 7, found: 4 }));
        assert_eq!(loader.state(), LoadState::Failed);
    }

    #[test]
    fn short_records_are_fatal() {
        let cases = [
            ("v 1.0 2.0\n", RecordKind::Position, 3),
            ("vn 0 1\n", RecordKind::Normal, 3),
            ("vt 0.5\n", RecordKind::TexCoord, 2),
            ("v 1.0 abc 2.0\n", RecordKind::Position, 3),
        ];
        for (src, expected_kind, expected_n) in cases {
            match load_obj_from_str(src) {
                Err(ObjError::MalformedRecord {
                    line,
                    kind,
                    expected,
                }) => {
                    assert_eq!(line, 1);
                    assert_eq!(kind, expected_kind);
                    assert_eq!(expected, expected_n);
                }
                other => panic!("unexpected result for {src:?}: {other:?}"),
            }
        }
    }

    #[test]
    fn corners_must_carry_all_three_indices() {
        for corner in ["1", "1//1", "1/1", "1/1/1/1", "-1/1/1", "a/1/1"] {
            let src = format!("v 0 0 0\nvt 0 0\nvn 0 0 1\nf {corner} 1/1/1 1/1/1\n");
            let err = load_obj_from_str(&src).unwrap_err();
            assert!(
                matches!(&err, ObjError::MalformedCorner { line: 4, corner: c } if c == corner),
                "{corner}: {err}"
            );
        }
    }

    #[test]
    fn out_of_range_indices_are_fatal() {
        let src = "v 0 0 0\nvt 0 0\nvn 0 0 1\nf 1/1/1 2/1/1 1/1/1\n";
        let err = load_obj_from_str(src).unwrap_err();
        assert!(matches!(
            err,
            ObjError::IndexOutOfRange {
                line: 4,
                kind: RecordKind::Position,
                index: 2,
                count: 1
            }
        ));

        let zero = "v 0 0 0\nvt 0 0\nvn 0 0 1\nf 1/1/1 1/1/0 1/1/1\n";
        assert!(matches!(
            load_obj_from_str(zero).unwrap_err(),
            ObjError::IndexOutOfRange {
                kind: RecordKind::Normal,
                index: 0,
                ..
            }
        ));
    }

    #[test]
    fn faces_may_reference_later_attributes() {
        let src = "f 1/1/1 2/1/1 3/1/1\nv 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvn 0 0 1\n";
        let mesh = load_obj_from_str(src).unwrap();
        assert_eq!(mesh.vertices()[1].position, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn unknown_directives_are_ignored() {
        let src = format!("# exported\no thing\ng group\nusemtl red\ns off\n{TRIANGLE}");
        let mesh = load_obj_from_str(&src).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn extra_components_are_ignored() {
        let src = "v 0 0 0 1\nv 1 0 0 1\nv 0 1 0 1\nvt 0 0 0\nvn 0 0 1\nf 1/1/1 2/1/1 3/1/1\n";
        let mesh = load_obj_from_str(src).unwrap();
        assert_eq!(mesh.vertices()[2].position, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn source_without_faces_is_rejected() {
        let mut loader = ObjLoader::new("v 0 0 0\nv 1 0 0\n");
        assert!(matches!(loader.load(), Err(ObjError::NoFaces)));
        assert_eq!(loader.state(), LoadState::Failed);
        assert!(matches!(load_obj_from_str(""), Err(ObjError::NoFaces)));
    }

    #[test]
    fn loader_reports_done() {
        let mut loader = ObjLoader::new(TRIANGLE);
        assert_eq!(loader.state(), LoadState::Scanning);
        loader.load().unwrap();
        assert_eq!(loader.state(), LoadState::Done);
    }

    #[test]
    fn reader_and_str_agree() {
        let a = load_obj_from_reader(TRIANGLE.as_bytes()).unwrap();
        let b = load_obj_from_str(TRIANGLE).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let err = load_obj_from_path("does/not/exist.obj").unwrap_err();
        assert!(matches!(err, ObjError::Open { .. }));
    }

    #[test]
    fn failed_read_leaves_mesh_empty() {
        let mut mesh = Mesh::triangle();
        assert!(mesh.read_obj("does/not/exist.obj").is_err());
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
    }

    /// Writes `contents` to a fresh file under the system temp directory.
    fn temp_obj(name: &str, contents: &[u8]) -> PathBuf {
        let file = format!("trisoup-{}-{name}.obj", std::process::id());
        let path = std::env::temp_dir().join(file);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn quad_file_leaves_populated_mesh_empty() {
        let path = temp_obj(
            "quad",
            b"v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvt 0 0\nvn 0 0 1\nf 1/1/1 2/1/1 3/1/1 4/1/1\n",
        );
        let mut mesh = Mesh::sphere(1.0, 4).unwrap();
        let err = mesh.read_obj(&path).unwrap_err();
        fs::remove_file(&path).unwrap();

        assert!(matches!(err, ObjError::FaceCorners { line: 7, found: 4 }));
        assert!(mesh.is_empty());
        assert_eq!(mesh.triangle_count(), 0);
    }

    #[test]
    fn binary_file_is_not_text() {
        let path = temp_obj("binary", &[b'v', b' ', 0xff, 0xfe, b'\n']);
        let err = load_obj_from_path(&path).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(matches!(err, ObjError::NotText { .. }));
    }
}
