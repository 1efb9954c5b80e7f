// SPDX-License-Identifier: GPL-3.0-only

//! WGSL sources for the parallax renderers
//!
//! The common part (uniform layout, bindings, vertex stage, band math) is
//! concatenated with the fragment stage of each strategy.

use std::sync::OnceLock;

/// Uniform layout, bindings, `vs_main` and the shared parallax functions
const COMMON_WGSL: &str = include_str!("parallax_common.wgsl");

/// `fs_single` entry point
const SINGLE_PLANE_WGSL: &str = include_str!("single_plane.wgsl");

/// `fs_layered` entry point
const LAYERED_WGSL: &str = include_str!("layered.wgsl");

static SINGLE_PLANE_COMBINED: OnceLock<String> = OnceLock::new();
static LAYERED_COMBINED: OnceLock<String> = OnceLock::new();

pub const VERTEX_ENTRY: &str = "vs_main";
pub const SINGLE_PLANE_FRAGMENT_ENTRY: &str = "fs_single";
pub const LAYERED_FRAGMENT_ENTRY: &str = "fs_layered";

/// Combined single-plane shader source
pub fn single_plane_shader() -> &'static str {
    SINGLE_PLANE_COMBINED.get_or_init(|| format!("{}\n\n{}", COMMON_WGSL, SINGLE_PLANE_WGSL))
}

/// Combined layered shader source
pub fn layered_shader() -> &'static str {
    LAYERED_COMBINED.get_or_init(|| format!("{}\n\n{}", COMMON_WGSL, LAYERED_WGSL))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(source: &str) -> naga::Module {
        let module = naga::front::wgsl::parse_str(source)
            .unwrap_or_else(|e| panic!("WGSL parse error: {}", e.emit_to_string(source)));
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::empty(),
        )
        .validate(&module)
        .unwrap_or_else(|e| panic!("WGSL validation error: {e:?}"));
        module
    }

    fn has_entry(module: &naga::Module, name: &str) -> bool {
        module.entry_points.iter().any(|ep| ep.name == name)
    }

    #[test]
    fn test_single_plane_shader_validates() {
        let module = validate(single_plane_shader());
        assert!(has_entry(&module, VERTEX_ENTRY));
        assert!(has_entry(&module, SINGLE_PLANE_FRAGMENT_ENTRY));
    }

    #[test]
    fn test_layered_shader_validates() {
        let module = validate(layered_shader());
        assert!(has_entry(&module, VERTEX_ENTRY));
        assert!(has_entry(&module, LAYERED_FRAGMENT_ENTRY));
    }

    #[test]
    fn test_uniform_struct_size_matches_rust() {
        let module = validate(single_plane_shader());
        let (_, ty) = module
            .types
            .iter()
            .find(|(_, ty)| ty.name.as_deref() == Some("ParallaxUniforms"))
            .expect("uniform struct present");
        let naga::TypeInner::Struct { span, .. } = &ty.inner else {
            panic!("ParallaxUniforms is not a struct");
        };
        assert_eq!(
            *span as usize,
            std::mem::size_of::<crate::render::ParallaxUniforms>()
        );
    }
}
