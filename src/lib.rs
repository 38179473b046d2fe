//! CrabCapture: a single-session video capture core
//!
//! Opens a video source by name (a media file or a live camera), negotiates
//! an output pixel format and resolution, and hands out decoded frames one
//! at a time, scaled and converted when the source's native layout differs
//! from what was asked for.
//!
//! # Features
//! - Source enumeration with friendly names and name resolution
//! - A fixed platform-format table mapping media-subtype GUIDs to decoder
//!   pixel formats
//! - Pass-through when the source already produces the requested size
//! - Software scaling and colour conversion through `image`
//! - Camera sources behind the `device` feature (nokhwa)
//! - A C ABI compatible with the capture DLL it replaces
//!
//! # Usage
//! ```rust,no_run
//! use crabcapture::{formats, CaptureSession, CrabCaptureConfig};
//!
//! # fn main() -> Result<(), crabcapture::CaptureError> {
//! let config = CrabCaptureConfig::load_or_default();
//! let mut session = CaptureSession::from_config(&config)?;
//! session.open("clip.y4m")?;
//! session.start_capture(&formats::MEDIASUBTYPE_RGB32, 640, 480)?;
//! while let Some(frame) = session.read_frame()? {
//!     println!("{} bytes", frame.len());
//! }
//! # Ok(())
//! # }
//! ```
pub mod catalog;
pub mod config;
pub mod errors;
pub mod ffi;
pub mod formats;
pub mod scaler;
pub mod session;
pub mod source;
pub mod types;

// Testing utilities - synthetic frames and scripted sources
pub mod testing;

// Re-exports for convenience
pub use catalog::{FileCatalog, SourceCatalog};
pub use config::CrabCaptureConfig;
pub use errors::CaptureError;
pub use formats::{Guid, PixelFormatMapping};
pub use scaler::{OutputFormatPolicy, ScaleFilter, Scaler, SoftwareScaler};
pub use session::{CaptureSession, Negotiation, SessionState};
pub use source::{Decoder, MediaSource, Packet};
pub use types::{Frame, Image, MediaKind, PixelFormat, Size, SourceDescriptor, SourceKind};

#[cfg(feature = "device")]
pub use catalog::DeviceCatalog;

/// Initialize logging for the capture system
pub fn init_logging() {
    init_logging_with("info");
}

/// Initialize logging, defaulting `RUST_LOG` to `crabcapture=<level>`
pub fn init_logging_with(level: &str) {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", format!("crabcapture={}", level));
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        device_support: cfg!(feature = "device"),
        formats: formats::entries().iter().map(|m| m.label.to_string()).collect(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub device_support: bool,
    /// Labels of the platform formats `start_capture` accepts
    pub formats: Vec<String>,
}
