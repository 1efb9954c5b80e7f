// SPDX-License-Identifier: GPL-3.0-only
//! WGSL sources
//!
//! Shader text is embedded at compile time and shared by the GPU renderers.
//! The CPU preview in [`crate::render::shading`] mirrors the same math.

pub mod parallax;

pub use parallax::{layered_shader, single_plane_shader};
