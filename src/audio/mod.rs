//! Decoding, playback, and the sample tap the analyzer reads from.

pub mod decode;
pub mod media;
pub mod player;
pub mod tap;

pub use decode::{decode_file, DecodedAudio};
pub use player::{CpalPlayer, Playback};
pub use tap::Tap;

/// Errors raised while decoding or playing a track.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    #[error("File has no playable track")]
    NoTrack,

    #[error("Unknown {0}")]
    UnknownFormat(&'static str),

    #[error("No output device available")]
    NoOutputDevice,

    #[error("Output device error: {0}")]
    Device(String),
}
