//! Asset loading and generation: CPU-side meshes, procedural primitives,
//! the OBJ loader and the TGA texture loader.

pub mod mesh;
pub mod obj;
pub mod primitives;
pub mod texture;

pub use mesh::{Aabb, Mesh, MeshError, MeshInfo, MeshVertex, Triangle};
pub use obj::{ObjError, load_obj_from_path};
pub use texture::{TextureData, TextureError, TextureFormat};
