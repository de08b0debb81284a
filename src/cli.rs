//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "audio-visualizer")]
#[command(about = "Plays an MP3 and draws its spectrum in real time", long_about = None)]
pub struct Args {
    /// MP3 file to play on startup. Drop a file on the window or press O to pick another.
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Which visualization to draw
    #[arg(long, value_enum, default_value_t = RendererKind::Field)]
    pub renderer: RendererKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererKind {
    /// Dashed spokes around a circle
    Radial,
    /// Shader-driven amplitude bars
    Field,
}

impl RendererKind {
    /// Analysis window size used with this renderer.
    pub fn window_size(self) -> usize {
        match self {
            RendererKind::Radial => 1024,
            RendererKind::Field => 512,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_field_without_a_file() {
        let args = Args::try_parse_from(["audio-visualizer"]).unwrap();
        assert_eq!(args.renderer, RendererKind::Field);
        assert!(args.file.is_none());
    }

    #[test]
    fn parses_file_and_renderer() {
        let args =
            Args::try_parse_from(["audio-visualizer", "--renderer", "radial", "song.mp3"]).unwrap();
        assert_eq!(args.renderer, RendererKind::Radial);
        assert_eq!(args.file, Some(PathBuf::from("song.mp3")));
    }

    #[test]
    fn rejects_unknown_renderer() {
        assert!(Args::try_parse_from(["audio-visualizer", "--renderer", "bars"]).is_err());
    }

    #[test]
    fn window_sizes_are_powers_of_two() {
        for kind in [RendererKind::Radial, RendererKind::Field] {
            assert!(kind.window_size().is_power_of_two());
        }
    }
}
