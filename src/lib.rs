//! Audio visualizer library: decode an MP3, analyse its spectrum while it
//! plays, and draw one frame per redraw.

pub mod analyzer;
pub mod audio;
pub mod cli;
pub mod driver;
pub mod render;
pub mod visualizer;
