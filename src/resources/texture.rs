//! Texture bookkeeping and decoding.
//!
//! Materials reference textures through [`TextureHandle`]s that are reserved
//! before any bytes arrive. A handle starts out `Pending`, becomes `Loaded` once
//! its image is decoded, or `Failed` for good if fetching or decoding goes wrong.
//! The renderer substitutes a neutral placeholder for anything not loaded.

use std::sync::Arc;

use anyhow::Context as _;

use crate::resources::load_binary;

/// How texel values are interpreted when sampled.
///
/// Colour maps are authored in sRGB and must be decoded to linear before
/// lighting; data maps (displacement, bump) are already linear.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColorSpace {
    Srgb,
    Linear,
}

impl ColorSpace {
    pub fn texture_format(self) -> wgpu::TextureFormat {
        match self {
            ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            ColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub(crate) usize);

#[derive(Clone, Debug)]
pub enum TextureState {
    Pending,
    Loaded(Arc<image::RgbaImage>),
    Failed,
}

#[derive(Clone, Debug)]
pub struct TextureEntry {
    pub path: String,
    pub color_space: ColorSpace,
    pub state: TextureState,
}

#[derive(Debug, Default)]
pub struct TextureRegistry {
    entries: Vec<TextureEntry>,
    generation: u64,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserve(&mut self, path: impl Into<String>, color_space: ColorSpace) -> TextureHandle {
        self.entries.push(TextureEntry {
            path: path.into(),
            color_space,
            state: TextureState::Pending,
        });
        TextureHandle(self.entries.len() - 1)
    }

    /// Attaches a decoded image. Only pending handles change state.
    pub fn resolve(&mut self, handle: TextureHandle, image: image::RgbaImage) -> bool {
        match self.entries.get_mut(handle.0) {
            Some(entry) if matches!(entry.state, TextureState::Pending) => {
                entry.state = TextureState::Loaded(Arc::new(image));
                self.generation += 1;
                true
            }
            _ => false,
        }
    }

    /// Marks a pending handle as permanently failed.
    pub fn fail(&mut self, handle: TextureHandle) -> bool {
        match self.entries.get_mut(handle.0) {
            Some(entry) if matches!(entry.state, TextureState::Pending) => {
                entry.state = TextureState::Failed;
                self.generation += 1;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, handle: TextureHandle) -> Option<&TextureEntry> {
        self.entries.get(handle.0)
    }

    pub fn image(&self, handle: TextureHandle) -> Option<Arc<image::RgbaImage>> {
        match &self.get(handle)?.state {
            TextureState::Loaded(image) => Some(image.clone()),
            _ => None,
        }
    }

    pub fn is_loaded(&self, handle: TextureHandle) -> bool {
        self.image(handle).is_some()
    }

    /// Incremented whenever a handle leaves the pending state.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pending(&self) -> impl Iterator<Item = (TextureHandle, &TextureEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| matches!(e.state, TextureState::Pending))
            .map(|(i, e)| (TextureHandle(i), e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decodes image file contents to RGBA8. The format is guessed from the bytes.
pub fn decode_image(bytes: &[u8], label: &str) -> anyhow::Result<image::RgbaImage> {
    let img = image::load_from_memory(bytes).with_context(|| format!("could not decode {label}"))?;
    Ok(img.to_rgba8())
}

pub async fn load_image(root: &str, file_name: &str) -> anyhow::Result<image::RgbaImage> {
    let data = load_binary(root, file_name).await?;
    decode_image(&data, file_name)
}
