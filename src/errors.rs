// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the virtual window
//!
//! The tracking, projection and shading math never fails: degenerate input
//! resolves to a safe default. Errors only come from the outer surfaces
//! (GPU setup, readback, asset decoding and config IO).

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// GPU-related errors
    Gpu(GpuError),
    /// Asset decoding errors
    Asset(AssetError),
    /// Configuration errors
    Config(String),
    /// Filesystem errors
    Io(String),
    /// Generic error with message
    Other(String),
}

/// GPU-specific errors
#[derive(Debug, Clone)]
pub enum GpuError {
    /// No adapter matched the request
    NoAdapter(String),
    /// Device creation failed
    DeviceCreation(String),
    /// Buffer mapping or readback failed
    Readback(String),
}

/// Asset loading errors
#[derive(Debug, Clone)]
pub enum AssetError {
    /// The image could not be decoded
    Decode(String),
    /// The image has zero width or height
    Empty,
    /// Output image could not be written
    Encode(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Gpu(e) => write!(f, "GPU error: {}", e),
            AppError::Asset(e) => write!(f, "Asset error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Io(msg) => write!(f, "I/O error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::NoAdapter(msg) => write!(f, "No suitable GPU adapter: {}", msg),
            GpuError::DeviceCreation(msg) => write!(f, "Failed to create GPU device: {}", msg),
            GpuError::Readback(msg) => write!(f, "GPU readback failed: {}", msg),
        }
    }
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::Decode(msg) => write!(f, "Failed to decode image: {}", msg),
            AssetError::Empty => write!(f, "Image has no pixels"),
            AssetError::Encode(msg) => write!(f, "Failed to write image: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for GpuError {}
impl std::error::Error for AssetError {}

impl From<GpuError> for AppError {
    fn from(err: GpuError) -> Self {
        AppError::Gpu(err)
    }
}

impl From<AssetError> for AppError {
    fn from(err: AssetError) -> Self {
        AppError::Asset(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<image::ImageError> for AssetError {
    fn from(err: image::ImageError) -> Self {
        AssetError::Decode(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Asset(err.into())
    }
}
