//! Typed scene graph consumed from the rendering collaborator.
//!
//! A closed node enumeration over mesh, group, light, and camera nodes with
//! explicit capability accessors. Meshes expose geometry buffers, a material
//! list, and per-material triangle groups.

pub mod geometry;
pub mod material;
pub mod node;

pub use geometry::{Geometry, MaterialGroup};
pub use material::{Material, TextureImage};
pub use node::{CameraNode, GroupNode, LightNode, MeshNode, SceneNode};
