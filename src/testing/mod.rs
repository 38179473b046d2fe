//! Testing utilities for CrabCapture
//!
//! Synthetic frames, Y4M files and a scripted in-memory catalog, so
//! sessions can be exercised without cameras or media on disk.

pub mod memory;
pub mod synthetic_data;

pub use memory::{MemoryCatalog, ScriptedSource, StreamSpec};
pub use synthetic_data::{
    synthetic_frame_bytes, synthetic_rgba, synthetic_video_frame, write_y4m,
};
