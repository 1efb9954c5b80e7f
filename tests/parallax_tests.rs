// SPDX-License-Identifier: MPL-2.0

//! Integration tests for depth band layout and the software renderer

use image::{GrayImage, Luma, Rgba, RgbaImage};
use nalgebra::Point3;
use virtual_window::assets::{AssetKind, ImageSet};
use virtual_window::projection::{ClipPlanes, OffAxisCamera};
use virtual_window::render::shading;
use virtual_window::render::{
    ParallaxMode, ParallaxSettings, ParallaxSettingsPatch, PreviewInputs, compute_layers,
    render_preview,
};
use virtual_window::tracking::{ScreenConfig, ViewerPosition};

fn settings(patch: ParallaxSettingsPatch) -> ParallaxSettings {
    let mut settings = ParallaxSettings::default();
    settings.apply(&ParallaxSettingsPatch {
        edge_fade: Some(0.0),
        depth_smoothing: Some(0.0),
        ..Default::default()
    });
    settings.apply(&patch);
    settings
}

fn stripes(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 7 % 256) as u8, (y * 11 % 256) as u8, ((x + y) % 256) as u8, 255])
    })
}

fn max_channel_difference(a: &RgbaImage, b: &RgbaImage) -> u8 {
    a.pixels()
        .zip(b.pixels())
        .flat_map(|(pa, pb)| (0..4).map(move |i| pa.0[i].abs_diff(pb.0[i])))
        .max()
        .unwrap_or(0)
}

#[test]
fn test_layers_tile_depth_range() {
    for num_layers in 2..=4 {
        let layers = compute_layers(&settings(ParallaxSettingsPatch {
            num_layers: Some(num_layers),
            ..Default::default()
        }));
        assert_eq!(layers.len(), num_layers as usize);
        assert_eq!(layers[0].depth_min, 0.0);
        assert_eq!(layers[layers.len() - 1].depth_max, 1.0);
        for pair in layers.windows(2) {
            assert!((pair[0].depth_max - pair[1].depth_min).abs() < 1e-6);
            // Farther bands sit behind nearer ones
            assert!(pair[0].z_offset < pair[1].z_offset);
        }
    }
}

#[test]
fn test_band_coverage_is_complete() {
    for num_layers in 2..=4 {
        for feather in [0.0, 0.02, 0.1, 0.25] {
            for step in 0..=100 {
                let depth = step as f32 / 100.0;
                let total: f32 = (0..num_layers)
                    .map(|k| shading::band_weight(depth, k, num_layers, feather))
                    .sum();
                assert!(
                    (total - 1.0).abs() < 1e-4,
                    "n={} feather={} depth={} total={}",
                    num_layers,
                    feather,
                    depth,
                    total
                );
            }
        }
    }
}

#[test]
fn test_focus_depth_stays_put() {
    let color = stripes(32, 24);
    let focus = 128.0 / 255.0;
    let depth = GrayImage::from_pixel(32, 24, Luma([128]));
    let inputs = PreviewInputs {
        color: &color,
        depth: Some(&depth),
        mask: None,
    };
    let settings = settings(ParallaxSettingsPatch {
        strength: Some(1.0),
        focus_distance: Some(focus),
        ..Default::default()
    });

    let centered = render_preview(&inputs, &settings, [0.0, 0.0], 32, 24);
    let moved = render_preview(&inputs, &settings, [0.9, -0.6], 32, 24);
    assert!(max_channel_difference(&centered, &moved) <= 1);
}

#[test]
fn test_near_content_moves_against_viewer() {
    let color = stripes(32, 24);
    let depth = GrayImage::from_pixel(32, 24, Luma([255]));
    let inputs = PreviewInputs {
        color: &color,
        depth: Some(&depth),
        mask: None,
    };
    let settings = settings(ParallaxSettingsPatch {
        strength: Some(1.0),
        focus_distance: Some(0.0),
        ..Default::default()
    });

    let centered = render_preview(&inputs, &settings, [0.0, 0.0], 32, 24);
    let moved = render_preview(&inputs, &settings, [0.25, 0.0], 32, 24);
    assert!(max_channel_difference(&centered, &moved) > 10);

    // Red grows with x, so content sliding left raises it at a fixed pixel
    assert!(moved.get_pixel(16, 12).0[0] > centered.get_pixel(16, 12).0[0]);
}

#[test]
fn test_shading_agrees_with_off_axis_geometry() {
    let screen = ScreenConfig::new(40.0, 25.0);
    let clip = ClipPlanes::default();
    let eye_centered = ViewerPosition::new(0.0, 0.0, 60.0);
    let eye_right = ViewerPosition::new(10.0, 0.0, 60.0);

    // A point in front of the screen drifts left on screen as the eye moves right
    let near_point = Point3::new(0.0, 0.0, 5.0);
    let before = OffAxisCamera::new(eye_centered, &screen, clip)
        .project(near_point)
        .unwrap();
    let after = OffAxisCamera::new(eye_right, &screen, clip)
        .project(near_point)
        .unwrap();
    let geometric_shift = after.x - before.x;
    assert!(geometric_shift < 0.0);

    // A point behind it drifts right
    let far_point = Point3::new(0.0, 0.0, -30.0);
    let before = OffAxisCamera::new(eye_centered, &screen, clip)
        .project(far_point)
        .unwrap();
    let after = OffAxisCamera::new(eye_right, &screen, clip)
        .project(far_point)
        .unwrap();
    assert!(after.x - before.x > 0.0);

    // The per-texel offset shifts content the same way
    let offset = eye_right.normalized_offset(&screen);
    let near = shading::parallax_offset(offset, 1.0, 0.5, 1.0, 1.0);
    let far = shading::parallax_offset(offset, 0.0, 0.5, 1.0, 1.0);
    assert_eq!(near[0].signum(), geometric_shift.signum());
    assert!(far[0] > 0.0);
}

#[test]
fn test_layered_matches_single_at_rest() {
    let color = stripes(40, 30);
    let images = ImageSet::new(color).with_fallbacks(AssetKind::Scene);
    let inputs = images.preview_inputs();

    for num_layers in 2..=4 {
        let single = render_preview(
            &inputs,
            &settings(ParallaxSettingsPatch::default()),
            [0.0, 0.0],
            40,
            30,
        );
        let layered = render_preview(
            &inputs,
            &settings(ParallaxSettingsPatch {
                mode: Some(ParallaxMode::Layered),
                num_layers: Some(num_layers),
                ..Default::default()
            }),
            [0.0, 0.0],
            40,
            30,
        );
        assert!(
            max_channel_difference(&single, &layered) <= 2,
            "layered output with {} layers differs at rest",
            num_layers
        );
    }
}

#[test]
fn test_object_mask_reveals_background() {
    let color = RgbaImage::from_pixel(20, 20, Rgba([255, 255, 255, 255]));
    let images = ImageSet::new(color).with_fallbacks(AssetKind::Object);
    let frame = render_preview(
        &images.preview_inputs(),
        &settings(ParallaxSettingsPatch::default()),
        [0.0, 0.0],
        20,
        20,
    );

    assert_eq!(frame.get_pixel(10, 10).0, [255, 255, 255, 255]);
    assert_eq!(frame.get_pixel(0, 0).0, [0, 0, 0, 255]);
}
