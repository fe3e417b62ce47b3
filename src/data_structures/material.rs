//! Surface appearance of a mesh.

use crate::resources::texture::TextureHandle;

/// Shading model. `Basic` ignores lights, `Standard` is diffuse only and `Phong`
/// adds a specular highlight controlled by `shininess`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MaterialKind {
    Basic,
    Standard,
    Phong,
}

impl MaterialKind {
    fn code(self) -> u32 {
        match self {
            MaterialKind::Basic => 0,
            MaterialKind::Standard => 1,
            MaterialKind::Phong => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub kind: MaterialKind,
    pub color: [f32; 3],
    pub map: Option<TextureHandle>,
    pub displacement_map: Option<TextureHandle>,
    pub displacement_scale: f32,
    pub bump_map: Option<TextureHandle>,
    pub bump_scale: f32,
    pub shininess: f32,
    pub wireframe: bool,
}

impl Material {
    pub fn new(kind: MaterialKind, color: [f32; 3]) -> Self {
        Self {
            kind,
            color,
            map: None,
            displacement_map: None,
            displacement_scale: 1.0,
            bump_map: None,
            bump_scale: 1.0,
            shininess: 30.0,
            wireframe: false,
        }
    }

    pub fn basic(color: [f32; 3]) -> Self {
        Self::new(MaterialKind::Basic, color)
    }

    pub fn standard(color: [f32; 3]) -> Self {
        Self::new(MaterialKind::Standard, color)
    }

    pub fn phong(color: [f32; 3]) -> Self {
        Self::new(MaterialKind::Phong, color)
    }

    pub fn with_map(mut self, map: TextureHandle) -> Self {
        self.map = Some(map);
        self
    }

    pub fn with_displacement(mut self, map: TextureHandle, scale: f32) -> Self {
        self.displacement_map = Some(map);
        self.displacement_scale = scale;
        self
    }

    pub fn with_bump(mut self, map: TextureHandle, scale: f32) -> Self {
        self.bump_map = Some(map);
        self.bump_scale = scale;
        self
    }

    pub fn with_shininess(mut self, shininess: f32) -> Self {
        self.shininess = shininess;
        self
    }

    /// All texture slots in binding order: colour, displacement, bump.
    pub fn textures(&self) -> [Option<TextureHandle>; 3] {
        [self.map, self.displacement_map, self.bump_map]
    }

    /// Scales are zeroed for missing maps so the placeholder textures have no effect.
    pub fn to_uniform(&self) -> MaterialUniform {
        MaterialUniform {
            color: [self.color[0], self.color[1], self.color[2], 1.0],
            displacement_scale: self
                .displacement_map
                .map_or(0.0, |_| self.displacement_scale),
            bump_scale: self.bump_map.map_or(0.0, |_| self.bump_scale),
            shininess: self.shininess,
            kind: self.kind.code(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub color: [f32; 4],
    pub displacement_scale: f32,
    pub bump_scale: f32,
    pub shininess: f32,
    pub kind: u32,
}
