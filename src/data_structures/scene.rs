//! Scene container.
//!
//! The scene owns every geometry, material, mesh and light in flat arenas and
//! hands out typed ids. Objects are only ever added; nothing is removed during
//! the lifetime of the program.
//!
//! Every mutable access stamps the touched entry with a new revision so the GPU
//! mirror in [`crate::render`] can upload only what changed since its last sync.

use std::fmt::Debug;

use crate::data_structures::{geometry::Geometry, instance::Instance, material::Material};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(pub(crate) usize);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub(crate) usize);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) usize);

/// A renderable pairing of geometry and material with its own transform.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub name: String,
    pub geometry: GeometryId,
    pub material: MaterialId,
    pub transform: Instance,
}

impl Mesh {
    pub fn new(name: impl Into<String>, geometry: GeometryId, material: MaterialId) -> Self {
        Self {
            name: name.into(),
            geometry,
            material,
            transform: Instance::default(),
        }
    }
}

/// A light that shines from `position` towards the origin.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DirectionalLight {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: [f32; 3],
}

/// Ambient fill blended between `sky` (up-facing) and `ground` (down-facing).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HemisphereLight {
    pub sky: [f32; 3],
    pub ground: [f32; 3],
    pub intensity: f32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Light {
    Directional(DirectionalLight),
    Hemisphere(HemisphereLight),
}

#[derive(Debug)]
struct Tracked<T> {
    value: T,
    revision: u64,
}

#[derive(Default)]
pub struct Scene {
    geometries: Vec<Geometry>,
    materials: Vec<Tracked<Material>>,
    objects: Vec<Tracked<Mesh>>,
    lights: Vec<Light>,
    revision: u64,
}

impl Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("geometries", &self.geometries.len())
            .field("materials", &self.materials.len())
            .field("objects", &self.objects.len())
            .field("lights", &self.lights)
            .field("revision", &self.revision)
            .finish()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    /// Monotonic counter, incremented by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        self.bump();
        self.geometries.push(geometry);
        GeometryId(self.geometries.len() - 1)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let revision = self.bump();
        self.materials.push(Tracked {
            value: material,
            revision,
        });
        MaterialId(self.materials.len() - 1)
    }

    pub fn add(&mut self, mesh: Mesh) -> ObjectId {
        let revision = self.bump();
        self.objects.push(Tracked {
            value: mesh,
            revision,
        });
        ObjectId(self.objects.len() - 1)
    }

    pub fn add_light(&mut self, light: Light) {
        self.bump();
        self.lights.push(light);
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(id.0)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0).map(|m| &m.value)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        let revision = self.bump();
        self.materials.get_mut(id.0).map(|m| {
            m.revision = revision;
            &mut m.value
        })
    }

    pub fn object(&self, id: ObjectId) -> Option<&Mesh> {
        self.objects.get(id.0).map(|o| &o.value)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut Mesh> {
        let revision = self.bump();
        self.objects.get_mut(id.0).map(|o| {
            o.revision = revision;
            &mut o.value
        })
    }

    /// First object with the given name.
    pub fn find(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .position(|o| o.value.name == name)
            .map(ObjectId)
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &Mesh)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, o)| (ObjectId(i), &o.value))
    }

    pub fn materials(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials
            .iter()
            .enumerate()
            .map(|(i, m)| (MaterialId(i), &m.value))
    }

    /// Objects touched after `revision`.
    pub fn objects_changed_since(&self, revision: u64) -> impl Iterator<Item = (ObjectId, &Mesh)> {
        self.objects
            .iter()
            .enumerate()
            .filter(move |(_, o)| o.revision > revision)
            .map(|(i, o)| (ObjectId(i), &o.value))
    }

    /// Materials touched after `revision`.
    pub fn materials_changed_since(
        &self,
        revision: u64,
    ) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials
            .iter()
            .enumerate()
            .filter(move |(_, m)| m.revision > revision)
            .map(|(i, m)| (MaterialId(i), &m.value))
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    /// Number of meshes in the scene.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
