//! Engine data structures: geometry, materials, transforms, scene and text.
//!
//! - `geometry` holds vertex/index data and the sphere/box tessellations
//! - `instance` holds per-object transformation data
//! - `material` describes surface appearance and its GPU uniform
//! - `scene` is the arena of everything that gets drawn
//! - `text` extrudes font outlines into 3D geometry
//! - `texture` wraps GPU textures
//! - `triangulate` turns outlines with holes into triangles

pub mod geometry;
pub mod instance;
pub mod material;
pub mod scene;
pub mod text;
pub mod texture;
pub mod triangulate;
