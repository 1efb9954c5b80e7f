// SPDX-License-Identifier: GPL-3.0-only

//! GPU device ownership and shared helpers
//!
//! There is no process-wide device: callers construct a [`GpuContext`] (or
//! wrap the device of the host application) and hand it to every renderer.

mod readback;

pub use readback::{
    CachedDimensions, padded_bytes_per_row, read_buffer_async, readback_buffer_size, unpad_rows,
};
pub use wgpu;

use crate::errors::{AppResult, GpuError};
use std::sync::Arc;
use tracing::{debug, info};

/// Information about the created GPU device
#[derive(Debug, Clone)]
pub struct GpuDeviceInfo {
    /// Name of the GPU adapter
    pub adapter_name: String,
    /// Backend being used (Vulkan, Metal, DX12, etc.)
    pub backend: wgpu::Backend,
}

/// Device and queue shared by all renderers of one window
#[derive(Debug, Clone)]
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub info: GpuDeviceInfo,
}

impl GpuContext {
    /// Wrap a device owned by the host application
    pub fn from_parts(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        info: GpuDeviceInfo,
    ) -> Self {
        Self {
            device,
            queue,
            info,
        }
    }

    /// Create a device without a surface, for offscreen rendering and tests.
    ///
    /// # Arguments
    ///
    /// * `label` - A label for the device (for debugging)
    pub async fn new_headless(label: &str) -> AppResult<Self> {
        info!(label = label, "Creating headless GPU device");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::VULKAN,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| GpuError::NoAdapter(e.to_string()))?;

        let adapter_info = adapter.get_info();

        info!(
            adapter = %adapter_info.name,
            backend = ?adapter_info.backend,
            "GPU adapter selected"
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(label),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await
            .map_err(|e| GpuError::DeviceCreation(e.to_string()))?;

        debug!(label = label, "GPU device ready");

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            info: GpuDeviceInfo {
                adapter_name: adapter_info.name,
                backend: adapter_info.backend,
            },
        })
    }
}
