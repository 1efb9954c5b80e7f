// SPDX-License-Identifier: GPL-3.0-only

//! Render pipeline and bind groups shared by both parallax strategies
//!
//! Group 0 holds the textures and sampler and is rebuilt on every texture
//! swap. Group 1 holds one uniform buffer per plane. Geometry comes from the
//! vertex index, so there are no vertex buffers to keep in sync.

use std::sync::Arc;

use tracing::debug;

use super::textures::{GpuImage, Placeholders, TextureSlots};
use super::uniforms::ParallaxUniforms;
use crate::shaders::parallax as shaders;

/// Which fragment stage and blend state a pipeline uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    SinglePlane,
    Layered,
}

impl PipelineKind {
    fn source(&self) -> &'static str {
        match self {
            Self::SinglePlane => shaders::single_plane_shader(),
            Self::Layered => shaders::layered_shader(),
        }
    }

    fn fragment_entry(&self) -> &'static str {
        match self {
            Self::SinglePlane => shaders::SINGLE_PLANE_FRAGMENT_ENTRY,
            Self::Layered => shaders::LAYERED_FRAGMENT_ENTRY,
        }
    }

    fn blend(&self) -> wgpu::BlendState {
        match self {
            Self::SinglePlane => wgpu::BlendState::ALPHA_BLENDING,
            Self::Layered => wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::SinglePlane => "parallax_single",
            Self::Layered => "parallax_layered",
        }
    }
}

pub struct ParallaxPipeline {
    kind: PipelineKind,
    pipeline: wgpu::RenderPipeline,
    texture_layout: wgpu::BindGroupLayout,
    uniform_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    placeholders: Placeholders,
}

impl ParallaxPipeline {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        kind: PipelineKind,
    ) -> Self {
        let label = kind.label();
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(kind.source().into()),
        });

        let texture_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("parallax_texture_layout"),
            entries: &[
                // Color
                texture_entry(0),
                // Depth
                texture_entry(1),
                // Mask
                texture_entry(2),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("parallax_uniform_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<ParallaxUniforms>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[&texture_layout, &uniform_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some(shaders::VERTEX_ENTRY),
                buffers: &[],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some(kind.fragment_entry()),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(kind.blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("parallax_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        debug!(?kind, ?format, "Parallax pipeline created");

        Self {
            kind,
            pipeline,
            texture_layout,
            uniform_layout,
            sampler,
            placeholders: Placeholders::new(device, queue),
        }
    }

    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    pub fn uniform_layout(&self) -> &wgpu::BindGroupLayout {
        &self.uniform_layout
    }

    /// Bind group for a texture set, `None` until a color image exists
    pub fn texture_bind_group(
        &self,
        device: &wgpu::Device,
        slots: &TextureSlots<Arc<GpuImage>>,
    ) -> Option<wgpu::BindGroup> {
        let color = slots.color.as_ref()?;
        let depth = slots.depth.as_deref().unwrap_or(&self.placeholders.depth);
        let mask = slots.mask.as_deref().unwrap_or(&self.placeholders.mask);

        Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("parallax_textures"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(color.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(depth.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(mask.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        }))
    }
}

/// Texture set plus the bind group built from it, swapped as one value
pub struct BoundTextures {
    pub slots: TextureSlots<Arc<GpuImage>>,
    pub bind_group: Option<wgpu::BindGroup>,
}

impl BoundTextures {
    pub fn empty() -> Self {
        Self {
            slots: TextureSlots::default(),
            bind_group: None,
        }
    }

    pub fn bind(
        device: &wgpu::Device,
        pipeline: &ParallaxPipeline,
        slots: TextureSlots<Arc<GpuImage>>,
    ) -> Self {
        let bind_group = pipeline.texture_bind_group(device, &slots);
        Self { slots, bind_group }
    }
}

/// Uniform buffer and bind group of one drawn plane
pub struct PlaneResources {
    pub uniforms: ParallaxUniforms,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    dirty: bool,
}

impl PlaneResources {
    pub fn new(
        device: &wgpu::Device,
        pipeline: &ParallaxPipeline,
        uniforms: ParallaxUniforms,
    ) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("parallax_plane_uniforms"),
            size: std::mem::size_of::<ParallaxUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("parallax_plane_bind_group"),
            layout: pipeline.uniform_layout(),
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self {
            uniforms,
            buffer,
            bind_group,
            dirty: true,
        }
    }

    /// Edit the uniforms; the buffer is written on the next `flush`
    pub fn update(&mut self, edit: impl FnOnce(&mut ParallaxUniforms)) {
        let before = self.uniforms;
        edit(&mut self.uniforms);
        if self.uniforms != before {
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn flush(&mut self, queue: &wgpu::Queue) {
        if self.dirty {
            queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&self.uniforms));
            self.dirty = false;
        }
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

impl Drop for PlaneResources {
    fn drop(&mut self) {
        self.buffer.destroy();
    }
}

/// Begin a pass on `target`, clearing it first when `clear` is set
pub fn begin_pass<'a>(
    encoder: &'a mut wgpu::CommandEncoder,
    target: &'a wgpu::TextureView,
    clear: Option<wgpu::Color>,
    label: &str,
) -> wgpu::RenderPass<'a> {
    let load = match clear {
        Some(color) => wgpu::LoadOp::Clear(color),
        None => wgpu::LoadOp::Load,
    };
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}
