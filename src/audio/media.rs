//! Media type detection for selected files.

use std::path::Path;

/// The only media type the visualizer will play.
pub const ACCEPTED_MEDIA_TYPE: &str = "audio/mpeg";

const KNOWN_TYPES: &[(&str, &str)] = &[
    ("mp3", "audio/mpeg"),
    ("mpga", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    ("oga", "audio/ogg"),
    ("flac", "audio/flac"),
    ("m4a", "audio/mp4"),
    ("aac", "audio/aac"),
    ("opus", "audio/opus"),
    ("webm", "audio/webm"),
];

/// Declared media type of a file, derived from its extension.
pub fn media_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    KNOWN_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|&(_, mime)| mime)
}

pub fn is_accepted(path: &Path) -> bool {
    media_type(path) == Some(ACCEPTED_MEDIA_TYPE)
}
