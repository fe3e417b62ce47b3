//! Render composition and the GPU mirror of the scene.
//!
//! [`SceneRenderer`] keeps one vertex/index buffer set per geometry, one
//! uniform and bind group per material, and a transform table with one slot per
//! scene object. Syncing is incremental: only objects and materials touched
//! since the last sync are re-uploaded, and material bind groups are rebuilt
//! when a texture arrives.
//!
//! Every object is its own draw. Each frame the objects are turned into
//! [`Render`] values, which sort themselves into filled, wireframe and overlay
//! draws.

use std::{
    collections::{HashMap, hash_map::Entry},
    iter,
};

use wgpu::util::DeviceExt;

#[cfg(feature = "ui")]
use crate::{gui::Caption, pipelines::caption::CaptionRenderer};
use crate::{
    context::Context,
    data_structures::{
        geometry::Geometry,
        instance::InstanceRaw,
        scene::{GeometryId, MaterialId, Scene},
        texture::Texture,
    },
    pipelines::{gui::GuiVertex, light::LightUniform},
    resources::texture::{TextureHandle, TextureRegistry},
};

const INSTANCE_STRIDE: wgpu::BufferAddress = std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress;

/// Geometry, transform slot and material bind group of one object.
pub struct Instanced<'a> {
    pub geometry: &'a GpuGeometry,
    pub instance: &'a wgpu::Buffer,
    pub material: &'a wgpu::BindGroup,
    /// Slot of the object's transform in `instance`.
    pub slot: u32,
}

/// Pre-transformed 2D geometry.
pub struct Flat<'a> {
    pub vertex: &'a wgpu::Buffer,
    pub index: &'a wgpu::Buffer,
    pub amount: usize,
}

/// Describes how something is drawn.
///
/// - `None` renders nothing
/// - `Defaults(Vec<Instanced>)` renders filled objects
/// - `Wireframe(Instanced)` renders the triangle edges as lines
/// - `GUI(Flat)` renders overlay geometry on top of everything
/// - `Composed(Vec<Render>)` recursively renders a composition
pub enum Render<'a> {
    None,
    Defaults(Vec<Instanced<'a>>),
    Wireframe(Instanced<'a>),
    GUI(Flat<'a>),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    pub(crate) fn set_pipelines(
        self,
        defaults: &mut Vec<Instanced<'a>>,
        wireframes: &mut Vec<Instanced<'a>>,
        guis: &mut Vec<Flat<'a>>,
    ) {
        match self {
            Render::Defaults(mut vec) => defaults.append(&mut vec),
            Render::Wireframe(instanced) => wireframes.push(instanced),
            Render::GUI(flat) => guis.push(flat),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pipelines(defaults, wireframes, guis)),
            Render::None => (),
        }
    }
}

/// Vertex buffer plus filled and wireframe index buffers of one geometry.
pub struct GpuGeometry {
    pub vertex: wgpu::Buffer,
    pub index: wgpu::Buffer,
    pub index_count: u32,
    pub wireframe: wgpu::Buffer,
    pub wireframe_count: u32,
}

impl GpuGeometry {
    fn new(device: &wgpu::Device, geometry: &Geometry, label: &str) -> Self {
        let edges = geometry.wireframe_indices();
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertex Buffer")),
            contents: bytemuck::cast_slice(&geometry.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Index Buffer")),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let wireframe = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Wireframe Buffer")),
            contents: bytemuck::cast_slice(&edges),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: geometry.indices.len() as u32,
            wireframe,
            wireframe_count: edges.len() as u32,
        }
    }
}

struct GpuMaterial {
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    wireframe: bool,
}

/// Per-object transforms, indexed by object id.
struct TransformTable {
    buffer: wgpu::Buffer,
    capacity: usize,
}

struct Overlay {
    vertices: Vec<GuiVertex>,
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    amount: usize,
}

/// GPU mirror of a [`Scene`].
#[derive(Default)]
pub struct SceneRenderer {
    geometries: Vec<GpuGeometry>,
    materials: Vec<GpuMaterial>,
    textures: HashMap<TextureHandle, Texture>,
    /// Geometry and material of every synced object, indexed by object id.
    objects: Vec<(GeometryId, MaterialId)>,
    transforms: Option<TransformTable>,
    overlay: Option<Overlay>,
    #[cfg(feature = "ui")]
    captions: Option<CaptionRenderer>,
    revision: Option<u64>,
    texture_generation: u64,
}

impl SceneRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects currently mirrored on the GPU.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Uploads everything that changed in `scene` or `textures` since the last call.
    pub fn sync(&mut self, ctx: &mut Context, scene: &Scene, textures: &TextureRegistry) {
        let since = self.revision.unwrap_or(0);
        let full = self.revision.is_none();
        if !full && since == scene.revision() && self.texture_generation == textures.generation() {
            return;
        }

        for i in self.geometries.len()..scene.geometry_count() {
            if let Some(geometry) = scene.geometry(GeometryId(i)) {
                self.geometries
                    .push(GpuGeometry::new(&ctx.device, geometry, &format!("Geometry {i}")));
            }
        }

        self.sync_transforms(ctx, scene, full, since);

        let rebind_all = self.texture_generation != textures.generation();
        if rebind_all {
            self.upload_textures(ctx, textures);
            self.texture_generation = textures.generation();
        }
        let materials: Vec<MaterialId> = if full || rebind_all {
            scene.materials().map(|(id, _)| id).collect()
        } else {
            scene.materials_changed_since(since).map(|(id, _)| id).collect()
        };
        for id in materials {
            self.sync_material(ctx, scene, id);
        }

        ctx.light
            .update(&ctx.queue, LightUniform::from_lights(scene.lights()));
        self.revision = Some(scene.revision());
    }

    fn sync_transforms(&mut self, ctx: &Context, scene: &Scene, full: bool, since: u64) {
        let grow = self
            .transforms
            .as_ref()
            .is_none_or(|table| table.capacity < scene.len());

        if full || grow {
            self.objects = scene
                .objects()
                .map(|(_, mesh)| (mesh.geometry, mesh.material))
                .collect();
            let raws: Vec<InstanceRaw> = scene
                .objects()
                .map(|(_, mesh)| mesh.transform.to_raw())
                .collect();
            let capacity = scene.len().max(1).next_power_of_two();
            log::debug!("transform table for {} objects (capacity {capacity})", scene.len());
            let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Instance Buffer"),
                size: capacity as wgpu::BufferAddress * INSTANCE_STRIDE,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            ctx.queue.write_buffer(&buffer, 0, bytemuck::cast_slice(&raws));
            self.transforms = Some(TransformTable { buffer, capacity });
            return;
        }

        let Some(table) = &self.transforms else {
            return;
        };
        for (id, mesh) in scene.objects_changed_since(since) {
            let entry = (mesh.geometry, mesh.material);
            match self.objects.get_mut(id.0) {
                Some(slot) => *slot = entry,
                None => self.objects.push(entry),
            }
            ctx.queue.write_buffer(
                &table.buffer,
                id.0 as wgpu::BufferAddress * INSTANCE_STRIDE,
                bytemuck::cast_slice(&[mesh.transform.to_raw()]),
            );
        }
    }

    fn upload_textures(&mut self, ctx: &Context, textures: &TextureRegistry) {
        for i in 0..textures.len() {
            let handle = TextureHandle(i);
            let Entry::Vacant(slot) = self.textures.entry(handle) else {
                continue;
            };
            let (Some(image), Some(entry)) = (textures.image(handle), textures.get(handle)) else {
                continue;
            };
            log::info!("uploading texture {}", entry.path);
            slot.insert(Texture::from_image(
                &ctx.device,
                &ctx.queue,
                &image,
                entry.color_space,
                Some(&entry.path),
            ));
        }
    }

    fn sync_material(&mut self, ctx: &Context, scene: &Scene, id: MaterialId) {
        let Some(material) = scene.material(id) else {
            return;
        };
        let uniform = material.to_uniform();
        let [map, displacement, bump] = material.textures();
        let view = |handle: Option<TextureHandle>, fallback: &Texture| {
            handle
                .and_then(|h| self.textures.get(&h))
                .unwrap_or(fallback)
                .view
                .clone()
        };
        let map = view(map, &ctx.white);
        let displacement = view(displacement, &ctx.black);
        let bump = view(bump, &ctx.black);

        let buffer = match self.materials.get(id.0) {
            Some(existing) => {
                ctx.queue
                    .write_buffer(&existing.uniform, 0, bytemuck::cast_slice(&[uniform]));
                existing.uniform.clone()
            }
            None => ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Material Buffer"),
                contents: bytemuck::cast_slice(&[uniform]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            }),
        };
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &ctx.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&map),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&displacement),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&bump),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&ctx.sampler),
                },
            ],
            label: Some("material_bind_group"),
        });

        let gpu = GpuMaterial {
            uniform: buffer,
            bind_group,
            wireframe: material.wireframe,
        };
        // materials are only ever appended, so ids arrive in order
        if id.0 < self.materials.len() {
            self.materials[id.0] = gpu;
        } else {
            self.materials.push(gpu);
        }
    }

    /// Replaces the overlay geometry if it differs from what was last uploaded.
    pub fn set_overlay(&mut self, device: &wgpu::Device, vertices: Vec<GuiVertex>, indices: &[u32]) {
        if self.overlay.as_ref().is_some_and(|o| o.vertices == vertices) {
            return;
        }
        if indices.is_empty() {
            self.overlay = None;
            return;
        }
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("GUI Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("GUI Index Buffer"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        self.overlay = Some(Overlay {
            vertices,
            vertex,
            index,
            amount: indices.len(),
        });
    }

    /// Prepares the overlay text for this frame.
    #[cfg(feature = "ui")]
    pub fn set_captions(&mut self, ctx: &Context, captions: &[Caption]) {
        let renderer = self
            .captions
            .get_or_insert_with(|| CaptionRenderer::new(&ctx.device, &ctx.queue, ctx.config.format));
        if let Err(e) = renderer.prepare(&ctx.device, &ctx.queue, captions, ctx.size()) {
            log::warn!("could not prepare captions: {e:#}");
        }
    }

    /// Everything to draw this frame.
    pub fn on_render(&self) -> Render<'_> {
        let Some(table) = &self.transforms else {
            return Render::None;
        };
        let mut filled = Vec::with_capacity(self.objects.len());
        let mut renders = Vec::new();
        for (slot, (geometry, material)) in self.objects.iter().enumerate() {
            let (Some(geometry), Some(material)) =
                (self.geometries.get(geometry.0), self.materials.get(material.0))
            else {
                continue;
            };
            let instanced = Instanced {
                geometry,
                instance: &table.buffer,
                material: &material.bind_group,
                slot: slot as u32,
            };
            if material.wireframe {
                renders.push(Render::Wireframe(instanced));
            } else {
                filled.push(instanced);
            }
        }
        renders.push(Render::Defaults(filled));
        if let Some(overlay) = &self.overlay {
            renders.push(Render::GUI(Flat {
                vertex: &overlay.vertex,
                index: &overlay.index,
                amount: overlay.amount,
            }));
        }
        Render::Composed(renders)
    }

    /// Draws one frame to the surface.
    pub fn render(&self, ctx: &Context) -> Result<(), wgpu::SurfaceError> {
        let output = ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            let mut defaults: Vec<Instanced> = Vec::new();
            let mut wireframes: Vec<Instanced> = Vec::new();
            let mut guis: Vec<Flat> = Vec::new();
            self.on_render()
                .set_pipelines(&mut defaults, &mut wireframes, &mut guis);

            render_pass.set_bind_group(1, &ctx.camera.bind_group, &[]);
            render_pass.set_bind_group(2, &ctx.light.bind_group, &[]);

            render_pass.set_pipeline(&ctx.pipelines.mesh);
            for instanced in defaults {
                draw_instanced(&mut render_pass, &instanced, false);
            }

            render_pass.set_pipeline(&ctx.pipelines.wireframe);
            for instanced in wireframes {
                draw_instanced(&mut render_pass, &instanced, true);
            }

            render_pass.set_pipeline(&ctx.pipelines.gui);
            for flat in guis {
                render_pass.set_vertex_buffer(0, flat.vertex.slice(..));
                render_pass.set_index_buffer(flat.index.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..flat.amount as u32, 0, 0..1);
            }

            #[cfg(feature = "ui")]
            {
                let drawn = self.captions.as_ref().map(|c| c.render(&mut render_pass));
                if let Some(Err(e)) = drawn {
                    log::warn!("could not draw captions: {e:#}");
                }
            }
        }

        ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    /// Frees per-frame caches once the frame is presented.
    pub fn end_frame(&mut self) {
        #[cfg(feature = "ui")]
        {
            if let Some(captions) = &mut self.captions {
                captions.trim();
            }
        }
    }
}

fn draw_instanced(render_pass: &mut wgpu::RenderPass<'_>, instanced: &Instanced, wireframe: bool) {
    let geometry = instanced.geometry;
    let (index, count) = if wireframe {
        (&geometry.wireframe, geometry.wireframe_count)
    } else {
        (&geometry.index, geometry.index_count)
    };
    render_pass.set_bind_group(0, instanced.material, &[]);
    render_pass.set_vertex_buffer(0, geometry.vertex.slice(..));
    render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
    render_pass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint32);
    render_pass.draw_indexed(0..count, 0, instanced.slot..instanced.slot + 1);
}
