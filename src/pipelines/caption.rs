//! Debug panel text through glyphon.
//!
//! Captions are shaped with the system fonts and drawn in the same pass as the
//! panel quads, after them, so they sit on top. Only compiled with the `ui`
//! feature; without it the panel shows its boxes alone.

use glyphon::{
    Attrs, Buffer, Cache, Color, Family, FontSystem, Metrics, Resolution, Shaping, SwashCache, TextArea,
    TextAtlas, TextBounds, TextRenderer, Viewport,
};

use crate::{
    data_structures::texture::Texture,
    gui::{Caption, TEXT_COLOUR},
};

pub struct CaptionRenderer {
    font_system: FontSystem,
    swash_cache: SwashCache,
    viewport: Viewport,
    atlas: TextAtlas,
    renderer: TextRenderer,
    /// Shaped lines of the last prepared captions.
    buffers: Vec<(Caption, Buffer)>,
}

impl CaptionRenderer {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let font_system = FontSystem::new();
        let swash_cache = SwashCache::new();
        let cache = Cache::new(device);
        let viewport = Viewport::new(device, &cache);
        let mut atlas = TextAtlas::new(device, queue, &cache, format);
        // the pass carries the scene depth buffer; text ignores it like the quads do
        let renderer = TextRenderer::new(
            &mut atlas,
            device,
            wgpu::MultisampleState::default(),
            Some(wgpu::DepthStencilState {
                format: Texture::DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
        );
        Self {
            font_system,
            swash_cache,
            viewport,
            atlas,
            renderer,
            buffers: Vec::new(),
        }
    }

    fn shape(&mut self, caption: &Caption) -> Buffer {
        let mut buffer = Buffer::new(&mut self.font_system, Metrics::new(caption.size, caption.size));
        buffer.set_size(&mut self.font_system, None, Some(caption.size));
        buffer.set_text(
            &mut self.font_system,
            &caption.text,
            &Attrs::new().family(Family::SansSerif),
            Shaping::Advanced,
            None,
        );
        buffer.shape_until_scroll(&mut self.font_system, false);
        buffer
    }

    /// Shapes changed captions and uploads the glyphs for this frame.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        captions: &[Caption],
        (width, height): (u32, u32),
    ) -> anyhow::Result<()> {
        let unchanged = self.buffers.len() == captions.len()
            && self.buffers.iter().zip(captions).all(|((old, _), new)| {
                old.text == new.text && old.size == new.size
            });
        if unchanged {
            for ((old, _), new) in self.buffers.iter_mut().zip(captions) {
                *old = new.clone();
            }
        } else {
            self.buffers = captions
                .iter()
                .map(|caption| (caption.clone(), self.shape(caption)))
                .collect();
        }

        self.viewport.update(queue, Resolution { width, height });
        let [r, g, b] = [TEXT_COLOUR >> 16, TEXT_COLOUR >> 8, TEXT_COLOUR].map(|c| (c & 0xff) as u8);
        let bounds = TextBounds {
            left: 0,
            top: 0,
            right: width as i32,
            bottom: height as i32,
        };
        let areas = self.buffers.iter().map(|(caption, buffer)| TextArea {
            buffer,
            left: caption.left,
            top: caption.top,
            scale: 1.0,
            bounds,
            default_color: Color::rgb(r, g, b),
            custom_glyphs: &[],
        });
        self.renderer.prepare(
            device,
            queue,
            &mut self.font_system,
            &mut self.atlas,
            &self.viewport,
            areas,
            &mut self.swash_cache,
        )?;
        Ok(())
    }

    pub fn render(&self, render_pass: &mut wgpu::RenderPass<'_>) -> anyhow::Result<()> {
        self.renderer
            .render(&self.atlas, &self.viewport, render_pass)?;
        Ok(())
    }

    /// Drops atlas glyphs that were not used this frame.
    pub fn trim(&mut self) {
        self.atlas.trim();
    }
}
