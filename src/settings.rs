//! Context Settings
//!
//! [`ContextSettings`] collects everything a [`Context`](crate::Context) needs
//! at construction: window title and size, the desired surface format, and the
//! adapter/device negotiation knobs.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ember::ContextSettings;
//!
//! // 1280×720, Bgra8UnormSrgb, vsync, high-performance adapter
//! let settings = ContextSettings::default();
//!
//! let settings = ContextSettings {
//!     title: "Mesh Viewer".into(),
//!     vsync: false,
//!     ..Default::default()
//! };
//! ```

/// Construction-time configuration for a [`Context`](crate::Context).
#[derive(Debug, Clone)]
pub struct ContextSettings {
    /// Window title.
    pub title: String,
    /// Requested window width in logical pixels.
    pub width: u32,
    /// Requested window height in logical pixels.
    pub height: u32,
    /// Desired surface format. Falls back to the first sRGB format the
    /// surface supports when unavailable.
    pub surface_format: wgpu::TextureFormat,
    /// Adapter power preference.
    pub power_preference: wgpu::PowerPreference,
    /// `true` selects FIFO presentation.
    pub vsync: bool,
    /// Features the device must support.
    pub required_features: wgpu::Features,
    /// Request every limit the adapter supports instead of the WebGPU defaults.
    pub use_adapter_limits: bool,
    /// Clear color used by the demo passes.
    pub clear_color: wgpu::Color,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            title: "Window".into(),
            width: 1280,
            height: 720,
            surface_format: wgpu::TextureFormat::Bgra8UnormSrgb,
            power_preference: wgpu::PowerPreference::HighPerformance,
            vsync: true,
            required_features: wgpu::Features::empty(),
            use_adapter_limits: true,
            clear_color: wgpu::Color::BLACK,
        }
    }
}

impl ContextSettings {
    /// Returns the present mode implied by [`vsync`](Self::vsync).
    #[inline]
    #[must_use]
    pub fn present_mode(&self) -> wgpu::PresentMode {
        if self.vsync {
            wgpu::PresentMode::Fifo
        } else {
            wgpu::PresentMode::AutoNoVsync
        }
    }
}
