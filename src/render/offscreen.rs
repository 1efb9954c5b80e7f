// SPDX-License-Identifier: GPL-3.0-only

//! Headless render target with CPU readback

use image::RgbaImage;
use tracing::debug;

use crate::errors::{AppResult, GpuError};
use crate::gpu::{
    CachedDimensions, GpuContext, padded_bytes_per_row, read_buffer_async, readback_buffer_size,
    unpad_rows,
};

const BYTES_PER_PIXEL: u32 = 4;

pub struct OffscreenTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    readback: wgpu::Buffer,
    dimensions: CachedDimensions,
    format: wgpu::TextureFormat,
}

impl OffscreenTarget {
    pub const DEFAULT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    pub fn new(context: &GpuContext, width: u32, height: u32) -> Self {
        let (width, height) = clamp_extent(width, height, max_dimension(context));
        let format = Self::DEFAULT_FORMAT;
        let (texture, view, readback) = create_resources(&context.device, format, width, height);

        debug!(width, height, ?format, "Offscreen target created");

        Self {
            texture,
            view,
            readback,
            dimensions: CachedDimensions::new(width, height),
            format,
        }
    }

    /// Reallocate for a new size; returns false when the size is unchanged
    pub fn resize(&mut self, context: &GpuContext, width: u32, height: u32) -> bool {
        let (width, height) = clamp_extent(width, height, max_dimension(context));
        if !self.dimensions.needs_update(width, height) {
            return false;
        }

        let (texture, view, readback) =
            create_resources(&context.device, self.format, width, height);
        self.texture.destroy();
        self.readback.destroy();
        self.texture = texture;
        self.view = view;
        self.readback = readback;
        self.dimensions.update(width, height);

        debug!(width, height, "Offscreen target resized");
        true
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.dimensions.width
    }

    pub fn height(&self) -> u32 {
        self.dimensions.height
    }

    /// Record the copy of the rendered texture into the readback buffer
    pub fn copy_to_readback(&self, encoder: &mut wgpu::CommandEncoder) {
        let CachedDimensions { width, height } = self.dimensions;
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row(width, BYTES_PER_PIXEL)),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Read the last copied frame back as an RGBA image
    pub async fn read_image(&self, context: &GpuContext) -> AppResult<RgbaImage> {
        let CachedDimensions { width, height } = self.dimensions;
        let data = read_buffer_async(&context.device, &self.readback).await?;
        let pixels = unpad_rows(&data, width, height, BYTES_PER_PIXEL);
        RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| GpuError::Readback("Readback size mismatch".to_string()).into())
    }
}

fn max_dimension(context: &GpuContext) -> u32 {
    context.device.limits().max_texture_dimension_2d
}

/// Keep a requested size between one pixel and the device texture limit
fn clamp_extent(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let max_dimension = max_dimension.max(1);
    (width.clamp(1, max_dimension), height.clamp(1, max_dimension))
}

fn create_resources(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
) -> (wgpu::Texture, wgpu::TextureView, wgpu::Buffer) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("offscreen_target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let readback = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("offscreen_readback"),
        size: readback_buffer_size(width, height, BYTES_PER_PIXEL),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    (texture, view, readback)
}

impl Drop for OffscreenTarget {
    fn drop(&mut self) {
        self.texture.destroy();
        self.readback.destroy();
    }
}
