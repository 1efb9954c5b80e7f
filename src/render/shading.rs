// SPDX-License-Identifier: GPL-3.0-only

//! CPU reference of the parallax shading math
//!
//! Every function here has a WGSL twin in `shaders/parallax_common.wgsl`
//! with the same name and behavior. The CPU versions drive the software
//! preview and pin down the invariants in tests.

use crate::constants::{DEPTH_BLUR_MIN_RADIUS, DEPTH_BLUR_TEXELS_PER_UNIT, UV_EPSILON};

/// Hermite smoothstep; equal edges act as a hard step at `edge0`
#[inline]
pub fn soft_step(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// UV displacement for a texel at `depth` pivoting around `pivot`.
///
/// Returned in viewer orientation (+y up). Zero whenever `depth == pivot`.
/// Content nearer than the pivot moves against the viewer and farther
/// content moves with it, as seen through a real window.
#[inline]
pub fn parallax_offset(
    viewer_offset: [f32; 2],
    depth: f32,
    pivot: f32,
    strength: f32,
    depth_scale: f32,
) -> [f32; 2] {
    let relative_depth = pivot - depth;
    let gain = relative_depth * strength * depth_scale;
    [viewer_offset[0] * gain, viewer_offset[1] * gain]
}

/// Apply a parallax offset to a texture UV (v grows downward) and keep it inside the texture
#[inline]
pub fn displace_uv(uv: [f32; 2], offset: [f32; 2]) -> [f32; 2] {
    clamp_uv([uv[0] - offset[0], uv[1] + offset[1]])
}

#[inline]
pub fn clamp_uv(uv: [f32; 2]) -> [f32; 2] {
    [
        uv[0].clamp(UV_EPSILON, 1.0 - UV_EPSILON),
        uv[1].clamp(UV_EPSILON, 1.0 - UV_EPSILON),
    ]
}

/// Separable fade toward the texture borders; `width <= 0` disables it
#[inline]
pub fn edge_fade(uv: [f32; 2], width: f32) -> f32 {
    if width <= 0.0 {
        return 1.0;
    }
    let fx = soft_step(0.0, width, uv[0]) * soft_step(0.0, width, 1.0 - uv[0]);
    let fy = soft_step(0.0, width, uv[1]) * soft_step(0.0, width, 1.0 - uv[1]);
    fx * fy
}

/// Depth blur radius in texels
#[inline]
pub fn depth_blur_radius(depth_smoothing: f32) -> f32 {
    depth_smoothing.max(0.0) * DEPTH_BLUR_TEXELS_PER_UNIT
}

/// The nine box-blur tap offsets in texels, or just the center tap for tiny radii
pub fn blur_taps(radius: f32) -> Vec<[f32; 2]> {
    if radius < DEPTH_BLUR_MIN_RADIUS {
        return vec![[0.0, 0.0]];
    }
    let mut taps = Vec::with_capacity(9);
    for y in [-radius, 0.0, radius] {
        for x in [-radius, 0.0, radius] {
            taps.push([x, y]);
        }
    }
    taps
}

/// Width of one depth band
#[inline]
pub fn band_width(num_layers: u32) -> f32 {
    1.0 / num_layers.max(1) as f32
}

/// Center of band `index` (band 0 is the farthest, depth 1.0 is nearest)
#[inline]
pub fn band_center(index: u32, num_layers: u32) -> f32 {
    (index as f32 + 0.5) * band_width(num_layers)
}

/// Feather clamped so only adjacent bands overlap
#[inline]
pub fn effective_feather(feather_width: f32, num_layers: u32) -> f32 {
    let half = band_width(num_layers) * 0.5;
    feather_width.clamp(0.0, half)
}

/// Ramp from 0 to 1 across the boundary between band `index` and `index + 1`
#[inline]
pub fn boundary_step(depth: f32, index: u32, num_layers: u32, feather: f32) -> f32 {
    let boundary = (index + 1) as f32 * band_width(num_layers);
    soft_step(boundary - feather, boundary + feather, depth)
}

/// Inclusion weight of band `index` for a texel at `depth`.
///
/// Each boundary owns a single ramp shared by the bands on either side, so
/// the weights telescope and sum to one everywhere in `[0, 1]`.
pub fn band_weight(depth: f32, index: u32, num_layers: u32, feather_width: f32) -> f32 {
    let depth = depth.clamp(0.0, 1.0);
    let feather = effective_feather(feather_width, num_layers);

    let entered = if index == 0 {
        1.0
    } else {
        boundary_step(depth, index - 1, num_layers, feather)
    };
    let left = if index + 1 >= num_layers {
        0.0
    } else {
        boundary_step(depth, index, num_layers, feather)
    };
    (entered - left).max(0.0)
}

/// Band holding the focus distance
#[inline]
pub fn focus_band(focus_distance: f32, num_layers: u32) -> u32 {
    let n = num_layers.max(1);
    ((focus_distance.clamp(0.0, 1.0) * n as f32) as u32).min(n - 1)
}

/// Opacity of band `index` for back-to-front "over" compositing.
///
/// `w_k / sum(w_j for j <= k)`, so that after compositing every band
/// contributes exactly its inclusion weight.
pub fn band_alpha(depth: f32, index: u32, num_layers: u32, feather_width: f32) -> f32 {
    let weight = band_weight(depth, index, num_layers, feather_width);
    let cumulative: f32 = (0..=index)
        .map(|j| band_weight(depth, j, num_layers, feather_width))
        .sum();
    if cumulative <= 1.0e-6 {
        0.0
    } else {
        (weight / cumulative).clamp(0.0, 1.0)
    }
}

/// Layered coverage of band `index`; without depth only the focus band is drawn
pub fn band_coverage(
    depth: Option<f32>,
    focus_distance: f32,
    index: u32,
    num_layers: u32,
    feather_width: f32,
) -> f32 {
    match depth {
        Some(depth) => band_alpha(depth, index, num_layers, feather_width),
        None if index == focus_band(focus_distance, num_layers) => 1.0,
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_step() {
        assert_eq!(soft_step(0.0, 1.0, -1.0), 0.0);
        assert_eq!(soft_step(0.0, 1.0, 2.0), 1.0);
        assert_eq!(soft_step(0.0, 1.0, 0.5), 0.5);
        assert_eq!(soft_step(0.3, 0.3, 0.2), 0.0);
        assert_eq!(soft_step(0.3, 0.3, 0.3), 1.0);
    }

    #[test]
    fn test_focus_plane_never_moves() {
        for viewer in [[1.0, 0.0], [-0.7, 0.4], [0.2, -1.0]] {
            for strength in [0.0, 0.1, 1.0] {
                for focus in [0.0, 0.35, 1.0] {
                    let offset = parallax_offset(viewer, focus, focus, strength, 2.0);
                    assert_eq!(offset, [0.0, 0.0]);
                }
            }
        }
    }

    #[test]
    fn test_offset_direction() {
        // Nearer than focus moves against the viewer, farther moves with it
        let near = parallax_offset([1.0, 0.0], 0.9, 0.5, 0.1, 1.0);
        let far = parallax_offset([1.0, 0.0], 0.1, 0.5, 0.1, 1.0);
        assert!(near[0] < 0.0);
        assert!(far[0] > 0.0);
        assert!((near[0] + 0.04).abs() < 1e-6);

        // Sampling at uv - offset shifts near content toward -x on screen
        let uv = displace_uv([0.5, 0.5], near);
        assert!(uv[0] > 0.5);
    }

    #[test]
    fn test_displace_uv_flips_y_and_clamps() {
        let uv = displace_uv([0.5, 0.5], [0.1, 0.1]);
        assert!((uv[0] - 0.4).abs() < 1e-6);
        assert!((uv[1] - 0.6).abs() < 1e-6);

        let uv = displace_uv([0.0, 1.0], [0.5, 0.5]);
        assert_eq!(uv, [UV_EPSILON, 1.0 - UV_EPSILON]);
    }

    #[test]
    fn test_edge_fade() {
        assert_eq!(edge_fade([0.5, 0.5], 0.1), 1.0);
        assert_eq!(edge_fade([0.0, 0.5], 0.1), 0.0);
        assert!(edge_fade([0.05, 0.5], 0.1) > 0.0 && edge_fade([0.05, 0.5], 0.1) < 1.0);
        assert_eq!(edge_fade([0.0, 0.0], 0.0), 1.0);
    }

    #[test]
    fn test_blur_taps() {
        assert_eq!(blur_taps(0.0).len(), 1);
        let taps = blur_taps(depth_blur_radius(0.2));
        assert_eq!(taps.len(), 9);
        assert!(taps.contains(&[1.0, -1.0]));
        assert!(taps.contains(&[0.0, 0.0]));
    }

    #[test]
    fn test_band_centers_partition_unit_range() {
        for n in 2..=4 {
            let width = band_width(n);
            for k in 0..n {
                let min = k as f32 * width;
                let max = min + width;
                let center = band_center(k, n);
                assert!((center - (min + max) * 0.5).abs() < 1e-6);
            }
            assert!((band_width(n) * n as f32 - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_band_weights_sum_to_one() {
        for n in 2..=4 {
            for feather in [0.0, 0.02, 0.05, 0.1, 0.25] {
                for step in 0..=1000 {
                    let depth = step as f32 / 1000.0;
                    let sum: f32 = (0..n).map(|k| band_weight(depth, k, n, feather)).sum();
                    assert!(
                        (sum - 1.0).abs() < 1e-4,
                        "n={n} feather={feather} depth={depth} sum={sum}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_band_weights_at_boundary() {
        // Hard edges hand the boundary to the nearer band
        assert_eq!(band_weight(0.5, 0, 2, 0.0), 0.0);
        assert_eq!(band_weight(0.5, 1, 2, 0.0), 1.0);
        assert_eq!(band_weight(0.49, 0, 2, 0.0), 1.0);

        // A feathered boundary is shared evenly
        assert!((band_weight(0.5, 0, 2, 0.1) - 0.5).abs() < 1e-6);
        assert!((band_weight(0.5, 1, 2, 0.1) - 0.5).abs() < 1e-6);

        for n in 2..=4 {
            for k in 0..n - 1 {
                let boundary = (k + 1) as f32 * band_width(n);
                let sum: f32 = (0..n).map(|j| band_weight(boundary, j, n, 0.0)).sum();
                assert_eq!(sum, 1.0, "n={n} boundary={boundary}");
            }
        }
    }

    #[test]
    fn test_focus_band() {
        assert_eq!(focus_band(0.0, 3), 0);
        assert_eq!(focus_band(0.5, 2), 1);
        assert_eq!(focus_band(0.49, 2), 0);
        assert_eq!(focus_band(1.0, 4), 3);
        assert_eq!(focus_band(7.0, 4), 3);
        assert_eq!(focus_band(0.5, 0), 0);
    }

    #[test]
    fn test_coverage_without_depth_uses_one_band() {
        for (focus, n) in [(0.5, 2), (0.0, 3), (0.4, 4), (1.0, 3)] {
            let covered: Vec<u32> = (0..n)
                .filter(|&k| band_coverage(None, focus, k, n, 0.1) > 0.0)
                .collect();
            assert_eq!(covered, vec![focus_band(focus, n)]);
            assert_eq!(band_coverage(None, focus, focus_band(focus, n), n, 0.1), 1.0);
        }
        // With depth the regular band alpha applies
        assert_eq!(band_coverage(Some(0.5), 0.5, 0, 2, 0.1), band_alpha(0.5, 0, 2, 0.1));
    }

    #[test]
    fn test_band_weight_is_one_at_center() {
        for n in 2..=4 {
            for k in 0..n {
                let center = band_center(k, n);
                assert_eq!(band_weight(center, k, n, 0.05), 1.0);
                for other in (0..n).filter(|&j| j != k) {
                    assert_eq!(band_weight(center, other, n, 0.05), 0.0);
                }
            }
        }
    }

    #[test]
    fn test_band_alpha_composites_to_weights() {
        let n = 3;
        let feather = 0.08;
        for step in 0..=200 {
            let depth = step as f32 / 200.0;
            // Back-to-front "over": band 0 first
            let mut remaining = 1.0f32;
            let mut contributions = vec![0.0f32; n as usize];
            for k in (0..n).rev() {
                let alpha = band_alpha(depth, k, n, feather);
                contributions[k as usize] = alpha * remaining;
                remaining *= 1.0 - alpha;
            }
            for k in 0..n {
                let weight = band_weight(depth, k, n, feather);
                assert!((contributions[k as usize] - weight).abs() < 1e-4);
            }
            assert!(remaining.abs() < 1e-4);
        }
    }
}
