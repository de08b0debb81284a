use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::AudioError;

/// A fully decoded track, ready for playback.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Interleaved samples in `[-1, 1]`.
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: usize,
}

impl DecodedAudio {
    /// Number of frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }
}

/// Decode every packet of the file's default track into memory.
pub fn decode_file(path: &Path) -> Result<DecodedAudio, AudioError> {
    let src = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let mut format = probed.format;
    let track = format.default_track().ok_or(AudioError::NoTrack)?;
    let track_id = track.id;
    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count());
    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(Error::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate.get_or_insert(spec.rate);
                channels.get_or_insert(spec.channels.count());

                let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                sample_buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(sample_buf.samples());
            }
            // Corrupt frames are skipped, the rest of the track still plays
            Err(Error::DecodeError(e)) => {
                log::debug!("Skipping undecodable packet: {e}");
            }
            Err(Error::IoError(ref e)) if e.kind() == std::io::ErrorKind::InvalidData => {
                log::debug!("Skipping invalid packet: {e}");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let sample_rate = sample_rate.ok_or(AudioError::UnknownFormat("sample rate"))?;
    let channels = channels
        .filter(|&c| c > 0)
        .ok_or(AudioError::UnknownFormat("channel count"))?;

    log::info!(
        "Decoded {} ({}Hz, {} ch, {:.1}s)",
        path.display(),
        sample_rate,
        channels,
        samples.len() as f32 / channels as f32 / sample_rate as f32
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(name: &str, channels: u16, frames: usize) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "audio-visualizer-{}-{name}.wav",
            std::process::id()
        ));
        let spec = hound::WavSpec {
            channels,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..frames {
            for _ in 0..channels {
                let v = if i % 2 == 0 { i16::MAX / 2 } else { -(i16::MAX / 2) };
                writer.write_sample(v).unwrap();
            }
        }
        writer.finalize().unwrap();
        path
    }

    #[test]
    fn decodes_pcm_wav_to_interleaved_floats() {
        let path = write_wav("stereo", 2, 800);
        let decoded = decode_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(decoded.sample_rate, 8000);
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.frames(), 800);
        assert!((decoded.samples[0] - 0.5).abs() < 0.01);
        assert!((decoded.samples[2] + 0.5).abs() < 0.01);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = decode_file(Path::new("/definitely/not/here.mp3")).unwrap_err();
        assert!(matches!(err, AudioError::Io(_)));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let path = std::env::temp_dir().join(format!(
            "audio-visualizer-{}-garbage.mp3",
            std::process::id()
        ));
        std::fs::write(&path, b"this is not audio at all").unwrap();
        let result = decode_file(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(AudioError::Decode(_))));
    }
}
