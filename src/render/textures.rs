// SPDX-License-Identifier: GPL-3.0-only

//! Parallax input textures
//!
//! A renderer samples one color, one depth and one optional mask texture.
//! The three are always replaced together as a [`TextureSlots`] value, so a
//! frame never sees a new color with the depth of the previous asset.

use std::sync::Arc;

use image::{GrayImage, RgbaImage};
use tracing::debug;

use crate::constants::FLAT_DEPTH;

/// GPU texture with its default view; the texture is destroyed on drop
#[derive(Debug)]
pub struct GpuImage {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl GpuImage {
    /// Upload an RGBA color image (sRGB encoded)
    pub fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        image: &RgbaImage,
    ) -> Arc<Self> {
        Arc::new(Self::upload(
            device,
            queue,
            label,
            image.width(),
            image.height(),
            wgpu::TextureFormat::Rgba8UnormSrgb,
            4,
            image.as_raw(),
        ))
    }

    /// Upload a single-channel image (depth or mask)
    pub fn from_luma(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        image: &GrayImage,
    ) -> Arc<Self> {
        Arc::new(Self::upload(
            device,
            queue,
            label,
            image.width(),
            image.height(),
            wgpu::TextureFormat::R8Unorm,
            1,
            image.as_raw(),
        ))
    }

    /// 1x1 single-channel texture
    pub fn solid_luma(device: &wgpu::Device, queue: &wgpu::Queue, label: &str, value: u8) -> Self {
        Self::upload(
            device,
            queue,
            label,
            1,
            1,
            wgpu::TextureFormat::R8Unorm,
            1,
            &[value],
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        bytes_per_pixel: u32,
        data: &[u8],
    ) -> Self {
        // Zero-sized images become a 1x1 texture; wgpu rejects empty extents
        let (width, height, data) = if width == 0 || height == 0 {
            (1, 1, vec![0u8; bytes_per_pixel as usize])
        } else {
            (width, height, data.to_vec())
        };

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * bytes_per_pixel),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        debug!(label, width, height, ?format, "Uploaded texture");

        Self {
            texture,
            view,
            width,
            height,
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Size of one texel in UV units
    pub fn texel_size(&self) -> [f32; 2] {
        [1.0 / self.width as f32, 1.0 / self.height as f32]
    }
}

impl Drop for GpuImage {
    fn drop(&mut self) {
        self.texture.destroy();
    }
}

/// Partial texture replacement; see [`TextureSlots::merged`]
#[derive(Debug, Clone)]
pub struct TextureUpdate<T = Arc<GpuImage>> {
    pub color: Option<T>,
    pub depth: Option<T>,
    pub mask: Option<T>,
}

impl<T> Default for TextureUpdate<T> {
    fn default() -> Self {
        Self {
            color: None,
            depth: None,
            mask: None,
        }
    }
}

impl<T> TextureUpdate<T> {
    /// A complete asset: color plus its optional depth and mask
    pub fn asset(color: T, depth: Option<T>, mask: Option<T>) -> Self {
        Self {
            color: Some(color),
            depth,
            mask,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.depth.is_none() && self.mask.is_none()
    }
}

/// The texture set a renderer currently samples
#[derive(Debug, Clone)]
pub struct TextureSlots<T = Arc<GpuImage>> {
    pub color: Option<T>,
    pub depth: Option<T>,
    pub mask: Option<T>,
}

impl<T> Default for TextureSlots<T> {
    fn default() -> Self {
        Self {
            color: None,
            depth: None,
            mask: None,
        }
    }
}

impl<T: Clone> TextureSlots<T> {
    /// The set that results from applying `update`.
    ///
    /// A new color starts a new asset: depth and mask come only from the
    /// update. Without a color the update patches depth and/or mask of the
    /// current asset.
    pub fn merged(&self, update: TextureUpdate<T>) -> Self {
        match update.color {
            Some(color) => Self {
                color: Some(color),
                depth: update.depth,
                mask: update.mask,
            },
            None => Self {
                color: self.color.clone(),
                depth: update.depth.or_else(|| self.depth.clone()),
                mask: update.mask.or_else(|| self.mask.clone()),
            },
        }
    }
}

impl<T> TextureSlots<T> {
    /// Nothing is drawn until a color image is present
    pub fn is_drawable(&self) -> bool {
        self.color.is_some()
    }

    pub fn has_depth(&self) -> bool {
        self.depth.is_some()
    }

    pub fn has_mask(&self) -> bool {
        self.mask.is_some()
    }
}

impl TextureSlots<Arc<GpuImage>> {
    /// Texel size used for the depth blur taps
    pub fn depth_texel_size(&self) -> [f32; 2] {
        self.depth
            .as_ref()
            .or(self.color.as_ref())
            .map(|image| image.texel_size())
            .unwrap_or([1.0, 1.0])
    }
}

/// Stand-ins bound when an asset has no depth or mask
#[derive(Debug)]
pub struct Placeholders {
    pub depth: GpuImage,
    pub mask: GpuImage,
}

impl Placeholders {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self {
            depth: GpuImage::solid_luma(
                device,
                queue,
                "parallax_flat_depth",
                (FLAT_DEPTH * 255.0).round() as u8,
            ),
            mask: GpuImage::solid_luma(device, queue, "parallax_opaque_mask", 255),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(
        color: &'static str,
        depth: Option<&'static str>,
        mask: Option<&'static str>,
    ) -> TextureSlots<&'static str> {
        TextureSlots {
            color: Some(color),
            depth,
            mask,
        }
    }

    #[test]
    fn test_new_color_drops_stale_depth_and_mask() {
        let current = slots("old", Some("old_depth"), Some("old_mask"));
        let next = current.merged(TextureUpdate::asset("new", None, None));
        assert_eq!(next.color, Some("new"));
        assert_eq!(next.depth, None);
        assert_eq!(next.mask, None);
    }

    #[test]
    fn test_new_asset_replaces_everything() {
        let current = slots("old", Some("old_depth"), None);
        let next = current.merged(TextureUpdate::asset("new", Some("new_depth"), Some("new_mask")));
        assert_eq!(next.color, Some("new"));
        assert_eq!(next.depth, Some("new_depth"));
        assert_eq!(next.mask, Some("new_mask"));
    }

    #[test]
    fn test_depth_only_keeps_color_and_mask() {
        let current = slots("color", Some("coarse"), Some("mask"));
        let next = current.merged(TextureUpdate {
            depth: Some("refined"),
            ..Default::default()
        });
        assert_eq!(next.color, Some("color"));
        assert_eq!(next.depth, Some("refined"));
        assert_eq!(next.mask, Some("mask"));
    }

    #[test]
    fn test_empty_update_is_identity() {
        let current = slots("color", Some("depth"), None);
        let next = current.merged(TextureUpdate::default());
        assert_eq!(next.color, current.color);
        assert_eq!(next.depth, current.depth);
        assert_eq!(next.mask, current.mask);
    }

    #[test]
    fn test_drawable_requires_color() {
        let empty: TextureSlots<&str> = TextureSlots::default();
        assert!(!empty.is_drawable());
        let next = empty.merged(TextureUpdate {
            mask: Some("mask"),
            ..Default::default()
        });
        assert!(!next.is_drawable());
        assert!(next.has_mask());
    }
}
