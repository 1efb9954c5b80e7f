// SPDX-License-Identifier: GPL-3.0-only

//! Buffer readback and dimension caching shared by offscreen targets

use crate::errors::GpuError;

/// Cached resource dimensions - avoids reallocation when dimensions match
#[derive(Default, Clone, Copy, PartialEq, Debug)]
pub struct CachedDimensions {
    pub width: u32,
    pub height: u32,
}

impl CachedDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Check if dimensions have changed and need update
    pub fn needs_update(&self, width: u32, height: u32) -> bool {
        self.width != width || self.height != height
    }

    pub fn update(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}

/// Row pitch for texture-to-buffer copies, rounded up to wgpu's 256-byte alignment.
///
/// Saturates at `u32::MAX`; callers keep widths within the device texture limit.
#[inline]
pub fn padded_bytes_per_row(width: u32, bytes_per_pixel: u32) -> u32 {
    let align = u64::from(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
    let unpadded = u64::from(width) * u64::from(bytes_per_pixel);
    u32::try_from(unpadded.div_ceil(align) * align).unwrap_or(u32::MAX)
}

/// Size of a readback buffer holding `height` padded rows
#[inline]
pub fn readback_buffer_size(width: u32, height: u32, bytes_per_pixel: u32) -> u64 {
    u64::from(padded_bytes_per_row(width, bytes_per_pixel)) * u64::from(height)
}

/// Strip row padding from a readback buffer
pub fn unpad_rows(data: &[u8], width: u32, height: u32, bytes_per_pixel: u32) -> Vec<u8> {
    let padded = padded_bytes_per_row(width, bytes_per_pixel) as usize;
    let row = width as usize * bytes_per_pixel as usize;
    let mut out = Vec::with_capacity(row.saturating_mul(height as usize));
    for chunk in data.chunks(padded).take(height as usize) {
        out.extend_from_slice(&chunk[..row.min(chunk.len())]);
    }
    out
}

fn poll_failed(error: wgpu::PollError) -> GpuError {
    GpuError::Readback(format!("Device poll failed: {:?}", error))
}

/// Helper for async buffer readback (map, poll, read, unmap)
///
/// # Arguments
/// * `device` - The wgpu device for polling
/// * `buffer` - The buffer to read from (must be MAP_READ)
pub async fn read_buffer_async(
    device: &wgpu::Device,
    buffer: &wgpu::Buffer,
) -> Result<Vec<u8>, GpuError> {
    let slice = buffer.slice(..);
    let (sender, receiver) = futures::channel::oneshot::channel();

    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(poll_failed)?;

    receiver
        .await
        .map_err(|_| GpuError::Readback("Failed to receive buffer mapping".to_string()))?
        .map_err(|e| GpuError::Readback(format!("Failed to map buffer: {:?}", e)))?;

    let data = slice.get_mapped_range().to_vec();
    buffer.unmap();

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_dimensions() {
        let mut dims = CachedDimensions::default();
        assert!(dims.needs_update(640, 480));

        dims.update(640, 480);
        assert!(!dims.needs_update(640, 480));
        assert!(dims.needs_update(1280, 720));
    }

    #[test]
    fn test_padded_bytes_per_row() {
        assert_eq!(padded_bytes_per_row(64, 4), 256);
        assert_eq!(padded_bytes_per_row(65, 4), 512);
        assert_eq!(padded_bytes_per_row(1, 4), 256);
    }

    #[test]
    fn test_poll_error_message() {
        let error = poll_failed(wgpu::PollError::Timeout);
        assert_eq!(error.to_string(), "GPU readback failed: Device poll failed: Timeout");
    }

    #[test]
    fn test_large_sizes_do_not_wrap() {
        assert_eq!(padded_bytes_per_row(40_000, 4), 160_000);
        assert_eq!(readback_buffer_size(40_000, 40_000, 4), 6_400_000_000);
        assert_eq!(padded_bytes_per_row(u32::MAX, 4), u32::MAX);
        assert_eq!(readback_buffer_size(1, 1, 4), 256);
    }

    #[test]
    fn test_unpad_rows() {
        let padded = padded_bytes_per_row(2, 4) as usize;
        let mut data = vec![0u8; padded * 2];
        data[..8].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        data[padded..padded + 8].copy_from_slice(&[9, 10, 11, 12, 13, 14, 15, 16]);
        let out = unpad_rows(&data, 2, 2, 4);
        assert_eq!(out, (1..=16).collect::<Vec<u8>>());
    }
}
