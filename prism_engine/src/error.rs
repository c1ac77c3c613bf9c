//! Error types for the Prism engine
//!
//! This module defines the error type used throughout the engine. Only
//! unrecoverable conditions travel through it: swapchain invalidation is
//! reported through `AcquireOutcome` / `PresentOutcome` instead.

use std::fmt;

/// Result type for Prism engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Prism engine errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error (Vulkan, mock, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (image, buffer, handle, etc.)
    InvalidResource(String),

    /// Initialization failed (device, surface, passes)
    InitializationFailed(String),

    /// The logical device was lost; the render loop cannot continue
    DeviceLost,

    /// The OS surface was destroyed underneath the swapchain
    SurfaceLost,
}

impl Error {
    /// Whether the logical device is gone.
    ///
    /// The frame loop aborts on every error, but teardown skips GPU
    /// waits after a device loss. A lost surface leaves the device usable.
    pub fn is_device_loss(&self) -> bool {
        matches!(self, Error::DeviceLost)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::DeviceLost => write!(f, "Device lost"),
            Error::SurfaceLost => write!(f, "Surface lost"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
