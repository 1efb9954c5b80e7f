// SPDX-License-Identifier: GPL-3.0-only

//! Decoding color, depth and mask images
//!
//! Assets either come with a depth map (and, for isolated objects, a mask)
//! or get simple generated stand-ins so the renderer always has a full set.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, Luma, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{AppResult, AssetError};
use crate::gpu::GpuContext;
use crate::render::{GpuImage, PreviewInputs, TextureUpdate};

/// What an image shows, which decides whether it needs a mask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// A full scene, drawn edge to edge
    #[default]
    Scene,
    /// A single object that floats in front of the background
    Object,
}

/// Decoded images of one asset
#[derive(Debug, Clone)]
pub struct ImageSet {
    pub color: RgbaImage,
    /// 1.0 (255) is nearest
    pub depth: Option<GrayImage>,
    pub mask: Option<GrayImage>,
}

impl ImageSet {
    pub fn new(color: RgbaImage) -> Self {
        Self {
            color,
            depth: None,
            mask: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.color.width()
    }

    pub fn height(&self) -> u32 {
        self.color.height()
    }

    /// Fill in a radial depth map, and an elliptical mask for objects, where missing
    pub fn with_fallbacks(mut self, kind: AssetKind) -> Self {
        let (width, height) = self.color.dimensions();
        if self.depth.is_none() {
            debug!(width, height, "Generating fallback depth");
            self.depth = Some(fallback_depth(width, height));
        }
        if kind == AssetKind::Object && self.mask.is_none() {
            debug!(width, height, "Generating fallback mask");
            self.mask = Some(fallback_mask(width, height));
        }
        self
    }

    /// Upload every image and build the update that swaps them in together
    pub fn upload(&self, context: &GpuContext) -> TextureUpdate {
        let device = &context.device;
        let queue = &context.queue;
        TextureUpdate::asset(
            GpuImage::from_rgba(device, queue, "asset_color", &self.color),
            self.depth
                .as_ref()
                .map(|depth| GpuImage::from_luma(device, queue, "asset_depth", depth)),
            self.mask
                .as_ref()
                .map(|mask| GpuImage::from_luma(device, queue, "asset_mask", mask)),
        )
    }

    pub fn preview_inputs(&self) -> PreviewInputs<'_> {
        PreviewInputs {
            color: &self.color,
            depth: self.depth.as_ref(),
            mask: self.mask.as_ref(),
        }
    }
}

/// Decodes asset files; one instance per owner, no shared state
#[derive(Debug, Clone, Default)]
pub struct AssetLoader {
    base_dir: Option<PathBuf>,
}

impl AssetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `dir`
    pub fn with_base_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(dir.into()),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn open(&self, path: &Path) -> AppResult<DynamicImage> {
        let path = self.resolve(path);
        let image = image::open(&path).map_err(AssetError::from)?;
        if image.width() == 0 || image.height() == 0 {
            return Err(AssetError::Empty.into());
        }
        debug!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "Decoded image"
        );
        Ok(image)
    }

    pub fn load_color(&self, path: &Path) -> AppResult<RgbaImage> {
        Ok(self.open(path)?.to_rgba8())
    }

    /// Single-channel image (depth or mask); color input is converted to luma
    pub fn load_luma(&self, path: &Path) -> AppResult<GrayImage> {
        Ok(self.open(path)?.to_luma8())
    }

    /// Load an asset from files, generating any missing depth or mask
    pub fn load_set(
        &self,
        color: &Path,
        depth: Option<&Path>,
        mask: Option<&Path>,
        kind: AssetKind,
    ) -> AppResult<ImageSet> {
        let set = ImageSet {
            color: self.load_color(color)?,
            depth: depth.map(|p| self.load_luma(p)).transpose()?,
            mask: mask.map(|p| self.load_luma(p)).transpose()?,
        };
        info!(
            color = %color.display(),
            width = set.width(),
            height = set.height(),
            has_depth = set.depth.is_some(),
            has_mask = set.mask.is_some(),
            "Loaded asset"
        );
        Ok(set.with_fallbacks(kind))
    }

    /// Decode an in-memory color image
    pub fn decode_color(&self, bytes: &[u8]) -> AppResult<RgbaImage> {
        let image = image::load_from_memory(bytes).map_err(AssetError::from)?;
        if image.width() == 0 || image.height() == 0 {
            return Err(AssetError::Empty.into());
        }
        Ok(image.to_rgba8())
    }

    /// Decode an in-memory depth or mask image
    pub fn decode_luma(&self, bytes: &[u8]) -> AppResult<GrayImage> {
        let image = image::load_from_memory(bytes).map_err(AssetError::from)?;
        if image.width() == 0 || image.height() == 0 {
            return Err(AssetError::Empty.into());
        }
        Ok(image.to_luma8())
    }
}

/// Radial depth: brightest (nearest) at the center, 0 at the corners
pub fn fallback_depth(width: u32, height: u32) -> GrayImage {
    let center_x = (width / 2) as f32;
    let center_y = (height / 2) as f32;
    let max_dist = (center_x * center_x + center_y * center_y).sqrt();

    GrayImage::from_fn(width, height, |x, y| {
        if max_dist <= 0.0 {
            return Luma([255]);
        }
        let dx = x as f32 - center_x;
        let dy = y as f32 - center_y;
        let dist = (dx * dx + dy * dy).sqrt();
        let value = 255.0 * (1.0 - dist / max_dist);
        Luma([value.clamp(0.0, 255.0) as u8])
    })
}

/// Filled ellipse with radii of 40% of each dimension
pub fn fallback_mask(width: u32, height: u32) -> GrayImage {
    let center_x = (width / 2) as f32;
    let center_y = (height / 2) as f32;
    let radius_x = width as f32 * 0.4;
    let radius_y = height as f32 * 0.4;

    GrayImage::from_fn(width, height, |x, y| {
        if radius_x <= 0.0 || radius_y <= 0.0 {
            return Luma([0]);
        }
        let dx = (x as f32 - center_x) / radius_x;
        let dy = (y as f32 - center_y) / radius_y;
        Luma([if dx * dx + dy * dy <= 1.0 { 255 } else { 0 }])
    })
}
