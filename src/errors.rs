//! Error Types
//!
//! This module defines the error type shared by every wrapper in the crate.
//!
//! # Overview
//!
//! [`EmberError`] covers two families of failure:
//! - Fatal initialization errors: window, surface, adapter and device
//!   negotiation, plus creation calls rejected by the backend.
//! - Checked usage errors: buffer writes outside the allocation, invalid
//!   binding declarations, index data that does not fit 16-bit indices, and
//!   surface textures acquired or presented out of order.
//!
//! Neither family is retried inside the crate. Errors propagate with `?` up to
//! the application loop, which logs them and exits. The one exception is a
//! transient surface error (see [`EmberError::is_transient_surface_error`]),
//! which only costs the frame.
//!
//! ```rust,ignore
//! use ember::errors::Result;
//!
//! fn upload(ctx: &ember::Context, buffer: &ember::Buffer, data: &[f32]) -> Result<()> {
//!     buffer.write(ctx, data)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the crate.
#[derive(Error, Debug)]
pub enum EmberError {
    // ========================================================================
    // Window & Initialization Errors
    // ========================================================================
    /// The platform refused to create the window.
    #[error("Failed to create window: {0}")]
    WindowCreateFailed(#[from] winit::error::OsError),

    /// Event loop error (winit).
    #[error("Event loop error: {0}")]
    EventLoopError(#[from] winit::error::EventLoopError),

    /// Raw window handle could not be obtained.
    #[error("Window handle error: {0}")]
    WindowHandleError(#[from] raw_window_handle::HandleError),

    /// The presentable surface could not be created for the window.
    #[error("Failed to create surface: {0}")]
    SurfaceCreateFailed(#[from] wgpu::CreateSurfaceError),

    /// No adapter compatible with the surface was found.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// The adapter rejected the device request.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// The surface cannot be configured for this adapter.
    #[error("Surface not supported by adapter: {0}")]
    SurfaceUnsupported(String),

    /// Acquiring the next surface texture failed.
    #[error("Surface error: {0}")]
    SurfaceError(#[from] wgpu::SurfaceError),

    /// A backend creation call failed.
    #[error("Backend error: {0}")]
    Backend(String),

    // ========================================================================
    // Usage Errors
    // ========================================================================
    /// A buffer write would read past the source data or write past the allocation.
    #[error("Buffer write out of bounds on {label:?}: {reason}")]
    BufferWrite {
        /// Label of the destination buffer
        label: Option<String>,
        /// What was violated
        reason: String,
    },

    /// A buffer was described with no usage flags.
    #[error("Buffer {label:?} has an empty usage mask")]
    EmptyBufferUsage {
        /// Label of the buffer
        label: Option<String>,
    },

    /// A bind group declaration cannot be turned into a valid layout.
    #[error("Invalid binding {binding} in bind group {label:?}: {reason}")]
    InvalidBinding {
        /// Label of the bind group
        label: Option<String>,
        /// Binding slot
        binding: u32,
        /// What was violated
        reason: String,
    },

    /// An index does not fit the fixed 16-bit index format.
    #[error("Index {index} at position {position} exceeds the 16-bit index range")]
    IndexOutOfRange {
        /// Offending index value
        index: u32,
        /// Position in the index list
        position: usize,
    },

    /// The draw count of a geometry does not fit its buffers.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// `surface_texture_view` was called twice without `present`.
    #[error("A surface texture is already acquired for this frame")]
    SurfaceTextureInUse,

    /// `present` was called without an acquired surface texture.
    #[error("No surface texture has been acquired")]
    NoSurfaceTexture,

    // ========================================================================
    // Asset Errors
    // ========================================================================
    /// OFF mesh parsing error.
    #[error("OFF parse error at line {line}: {reason}")]
    OffParse {
        /// 1-based line number
        line: usize,
        /// What was wrong
        reason: String,
    },

    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl EmberError {
    /// Surface errors after which the frame is skipped rather than the app
    /// stopped: a timed-out acquire, or a surface still outdated after one
    /// reconfigure (a minimized window keeps reporting this).
    #[must_use]
    pub fn is_transient_surface_error(&self) -> bool {
        matches!(
            self,
            Self::SurfaceError(wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Outdated)
        )
    }

    pub(crate) fn buffer_write(label: Option<&str>, reason: impl Into<String>) -> Self {
        Self::BufferWrite {
            label: label.map(str::to_owned),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_binding(
        label: Option<&str>,
        binding: u32,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidBinding {
            label: label.map(str::to_owned),
            binding,
            reason: reason.into(),
        }
    }
}

/// Alias for `Result<T, EmberError>`.
pub type Result<T> = std::result::Result<T, EmberError>;
