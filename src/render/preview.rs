// SPDX-License-Identifier: GPL-3.0-only

//! Software rendition of both parallax strategies
//!
//! Samples the images with the same math as the shaders, composited over
//! opaque black with all planes coplanar (no perspective). Used when no GPU
//! adapter is available and to check image-level behavior in tests.

use image::{GrayImage, Rgba, RgbaImage};

use super::settings::{ParallaxMode, ParallaxSettings};
use super::shading;

/// Borrowed inputs of one frame
#[derive(Debug, Clone, Copy)]
pub struct PreviewInputs<'a> {
    pub color: &'a RgbaImage,
    pub depth: Option<&'a GrayImage>,
    pub mask: Option<&'a GrayImage>,
}

fn bilinear<const C: usize>(
    width: u32,
    height: u32,
    uv: [f32; 2],
    texel: impl Fn(u32, u32) -> [u8; C],
) -> [f32; C] {
    if width == 0 || height == 0 {
        return [0.0; C];
    }
    let x = (uv[0] * width as f32 - 0.5).clamp(0.0, (width - 1) as f32);
    let y = (uv[1] * height as f32 - 0.5).clamp(0.0, (height - 1) as f32);
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let (a, b, c, d) = (texel(x0, y0), texel(x1, y0), texel(x0, y1), texel(x1, y1));
    let mut out = [0.0f32; C];
    for i in 0..C {
        let top = a[i] as f32 * (1.0 - fx) + b[i] as f32 * fx;
        let bottom = c[i] as f32 * (1.0 - fx) + d[i] as f32 * fx;
        out[i] = (top * (1.0 - fy) + bottom * fy) / 255.0;
    }
    out
}

fn sample_color(image: &RgbaImage, uv: [f32; 2]) -> [f32; 4] {
    bilinear(image.width(), image.height(), uv, |x, y| image.get_pixel(x, y).0)
}

fn sample_luma(image: &GrayImage, uv: [f32; 2]) -> f32 {
    bilinear(image.width(), image.height(), uv, |x, y| image.get_pixel(x, y).0)[0]
}

fn sample_depth(depth: &GrayImage, uv: [f32; 2], depth_smoothing: f32) -> f32 {
    let texel = [1.0 / depth.width() as f32, 1.0 / depth.height() as f32];
    let taps = shading::blur_taps(shading::depth_blur_radius(depth_smoothing));
    let count = taps.len() as f32;
    taps.into_iter()
        .map(|tap| {
            let uv = shading::clamp_uv([uv[0] + tap[0] * texel[0], uv[1] + tap[1] * texel[1]]);
            sample_luma(depth, uv)
        })
        .sum::<f32>()
        / count
}

/// Premultiplied color of one plane at `uv`
fn shade_plane(
    inputs: &PreviewInputs,
    settings: &ParallaxSettings,
    viewer_offset: [f32; 2],
    uv: [f32; 2],
    band: Option<(u32, u32)>,
) -> [f32; 4] {
    let pivot = match band {
        Some((index, count)) => shading::band_center(index, count),
        None => settings.focus_distance,
    };

    let offset = match inputs.depth {
        Some(depth) => shading::parallax_offset(
            viewer_offset,
            sample_depth(depth, uv, settings.depth_smoothing),
            pivot,
            settings.strength,
            settings.depth_scale,
        ),
        None => [0.0, 0.0],
    };
    let uv = shading::displace_uv(uv, offset);

    let coverage = match band {
        Some((index, count)) => shading::band_coverage(
            inputs
                .depth
                .map(|depth| sample_depth(depth, uv, settings.depth_smoothing)),
            settings.focus_distance,
            index,
            count,
            settings.feather_width,
        ),
        None => 1.0,
    };

    let color = sample_color(inputs.color, uv);
    let mask = inputs.mask.map_or(1.0, |mask| sample_luma(mask, uv));
    let alpha = color[3] * coverage * shading::edge_fade(uv, settings.edge_fade) * mask;
    [color[0] * alpha, color[1] * alpha, color[2] * alpha, alpha]
}

/// Render one frame of `width` x `height` pixels
pub fn render_preview(
    inputs: &PreviewInputs,
    settings: &ParallaxSettings,
    viewer_offset: [f32; 2],
    width: u32,
    height: u32,
) -> RgbaImage {
    let settings = settings.sanitized();
    let width = width.max(1);
    let height = height.max(1);
    if inputs.color.width() == 0 || inputs.color.height() == 0 {
        return RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
    }

    RgbaImage::from_fn(width, height, |x, y| {
        let uv = [
            (x as f32 + 0.5) / width as f32,
            (y as f32 + 0.5) / height as f32,
        ];

        let rgb = match settings.mode {
            ParallaxMode::Single => {
                let c = shade_plane(inputs, &settings, viewer_offset, uv, None);
                [c[0], c[1], c[2]]
            }
            ParallaxMode::Layered => {
                // Back-to-front premultiplied "over"
                let count = settings.num_layers;
                let mut acc = [0.0f32; 3];
                for index in 0..count {
                    let c = shade_plane(inputs, &settings, viewer_offset, uv, Some((index, count)));
                    for i in 0..3 {
                        acc[i] = c[i] + acc[i] * (1.0 - c[3]);
                    }
                }
                acc
            }
        };

        let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgba([to_u8(rgb[0]), to_u8(rgb[1]), to_u8(rgb[2]), 255])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::settings::ParallaxSettingsPatch;
    use image::Luma;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, _| {
            Rgba([(x * 255 / (width - 1)) as u8, 64, 128, 255])
        })
    }

    fn no_fade() -> ParallaxSettings {
        let mut settings = ParallaxSettings::default();
        settings.apply(&ParallaxSettingsPatch {
            edge_fade: Some(0.0),
            depth_smoothing: Some(0.0),
            strength: Some(0.5),
            ..Default::default()
        });
        settings
    }

    #[test]
    fn test_depth_at_focus_is_static() {
        let color = gradient(32, 32);
        let settings = no_fade();
        let focus = (settings.focus_distance * 255.0).round() as u8;
        let depth = GrayImage::from_pixel(32, 32, Luma([focus]));
        let inputs = PreviewInputs {
            color: &color,
            depth: Some(&depth),
            mask: None,
        };

        let centered = render_preview(&inputs, &settings, [0.0, 0.0], 32, 32);
        let moved = render_preview(&inputs, &settings, [1.0, -1.0], 32, 32);
        for (a, b) in centered.pixels().zip(moved.pixels()) {
            for i in 0..3 {
                assert!((a.0[i] as i32 - b.0[i] as i32).abs() <= 1);
            }
        }
    }

    #[test]
    fn test_near_content_shifts_against_viewer() {
        let color = gradient(64, 8);
        let depth = GrayImage::from_pixel(64, 8, Luma([255]));
        let inputs = PreviewInputs {
            color: &color,
            depth: Some(&depth),
            mask: None,
        };
        let settings = no_fade();

        let centered = render_preview(&inputs, &settings, [0.0, 0.0], 64, 8);
        let right = render_preview(&inputs, &settings, [0.5, 0.0], 64, 8);
        // Content slides left, so brighter texels from the right reach the center
        let x = 32;
        assert!(right.get_pixel(x, 4).0[0] > centered.get_pixel(x, 4).0[0]);
    }

    #[test]
    fn test_missing_depth_is_flat() {
        let color = gradient(16, 16);
        let inputs = PreviewInputs {
            color: &color,
            depth: None,
            mask: None,
        };
        let settings = no_fade();
        let a = render_preview(&inputs, &settings, [0.0, 0.0], 16, 16);
        let b = render_preview(&inputs, &settings, [0.8, 0.8], 16, 16);
        assert_eq!(a, b);
    }

    #[test]
    fn test_layered_without_seams() {
        // A flat white image must stay white for any depth when layers are composited
        let color = RgbaImage::from_pixel(16, 16, Rgba([255, 255, 255, 255]));
        let depth = GrayImage::from_fn(16, 16, |x, _| Luma([(x * 17) as u8]));
        let inputs = PreviewInputs {
            color: &color,
            depth: Some(&depth),
            mask: None,
        };
        let mut settings = no_fade();
        settings.mode = ParallaxMode::Layered;
        let frame = render_preview(&inputs, &settings, [0.0, 0.0], 16, 16);
        for pixel in frame.pixels() {
            assert!(pixel.0[0] >= 254, "seam at {:?}", pixel);
        }
    }

    #[test]
    fn test_layered_without_depth_matches_single() {
        // Translucent color exposes any band drawn twice
        let color = RgbaImage::from_pixel(8, 8, Rgba([200, 100, 50, 128]));
        let inputs = PreviewInputs {
            color: &color,
            depth: None,
            mask: None,
        };
        let single = no_fade();
        let mut layered = no_fade();
        layered.mode = ParallaxMode::Layered;
        for (layers, focus) in [(2, 0.5), (3, 0.2), (4, 1.0)] {
            layered.num_layers = layers;
            layered.focus_distance = focus;
            let a = render_preview(&inputs, &single, [0.4, -0.3], 8, 8);
            let b = render_preview(&inputs, &layered, [0.4, -0.3], 8, 8);
            assert_eq!(a, b, "layers={layers} focus={focus}");
        }
    }

    #[test]
    fn test_mask_hides_content() {
        let color = RgbaImage::from_pixel(8, 8, Rgba([200, 200, 200, 255]));
        let mask = GrayImage::from_pixel(8, 8, Luma([0]));
        let inputs = PreviewInputs {
            color: &color,
            depth: None,
            mask: Some(&mask),
        };
        let frame = render_preview(&inputs, &no_fade(), [0.0, 0.0], 8, 8);
        assert!(frame.pixels().all(|p| p.0[..3] == [0, 0, 0]));
    }
}
