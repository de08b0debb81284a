use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::{AudioError, DecodedAudio, Tap};

/// The playback side of a session, as seen by the controller.
pub trait Playback {
    /// Stop producing sound. Harmless when nothing is playing.
    fn pause(&mut self);

    /// Move the playback position back to the first frame.
    fn seek_to_start(&mut self);

    /// Start playing `track` from its first frame, feeding `tap`.
    fn play(&mut self, track: Arc<DecodedAudio>, tap: &Tap) -> Result<(), AudioError>;
}

/// Plays a decoded track through the default output device and
/// simultaneously feeds a mono copy into the tap.
pub struct CpalPlayer {
    // Must keep the stream alive or audio stops
    stream: Option<cpal::Stream>,
    /// Next frame to play, shared with the audio callback.
    position: Arc<AtomicUsize>,
}

impl CpalPlayer {
    pub fn new() -> Self {
        Self {
            stream: None,
            position: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[cfg(test)]
    fn position(&self) -> usize {
        self.position.load(Ordering::Relaxed)
    }

    /// Fresh frame cursor for a new stream. Callbacks of earlier streams keep
    /// their own cursor and can no longer move this one.
    fn start_session(&mut self) -> Arc<AtomicUsize> {
        self.position = Arc::new(AtomicUsize::new(0));
        self.position.clone()
    }
}

impl Default for CpalPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Playback for CpalPlayer {
    fn pause(&mut self) {
        if let Some(stream) = &self.stream {
            if let Err(e) = stream.pause() {
                log::warn!("Failed to pause output stream: {e}");
            }
        }
    }

    fn seek_to_start(&mut self) {
        self.position.store(0, Ordering::Relaxed);
    }

    fn play(&mut self, track: Arc<DecodedAudio>, tap: &Tap) -> Result<(), AudioError> {
        // Drop the previous stream before opening a new one on the same device
        self.stream = None;

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;

        let out_supported = device
            .default_output_config()
            .map_err(|e| AudioError::Device(e.to_string()))?;
        let dst_channels = out_supported.channels() as usize;

        // Use the file's sample rate so pitch is correct.
        // Most devices accept 44100 / 48000 natively.
        let config = cpal::StreamConfig {
            channels: dst_channels as u16,
            sample_rate: cpal::SampleRate(track.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        log::info!(
            "Playing on {} ({}Hz, {} ch out)",
            device.name().unwrap_or_default(),
            track.sample_rate,
            dst_channels
        );

        let position = self.start_session();
        let tap = tap.clone();

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    fill_output(data, dst_channels, &track, &position, &tap);
                },
                |err| log::error!("Audio output error: {err}"),
                None,
            )
            .map_err(|e| AudioError::Device(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::Device(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }
}

/// Render the next `data.len() / dst_channels` frames of `track` into `data`,
/// advancing `position` and mirroring the mono mix into `tap`.
///
/// Past the end of the track the output is silence; playback does not loop.
pub fn fill_output(
    data: &mut [f32],
    dst_channels: usize,
    track: &DecodedAudio,
    position: &AtomicUsize,
    tap: &Tap,
) {
    let src_channels = track.channels.max(1);
    let total_frames = track.frames();
    let frames_needed = data.len() / dst_channels.max(1);
    let mut pos = position.load(Ordering::Relaxed);
    let mut mono_samples: Vec<f32> = Vec::with_capacity(frames_needed);

    for frame in 0..frames_needed {
        let out = &mut data[frame * dst_channels..(frame + 1) * dst_channels];
        if pos >= total_frames {
            out.fill(0.0);
            mono_samples.push(0.0);
            continue;
        }

        let src = &track.samples[pos * src_channels..(pos + 1) * src_channels];
        mono_samples.push(src.iter().sum::<f32>() / src_channels as f32);

        // Duplicate / map source channels onto the output channels
        for (ch, sample) in out.iter_mut().enumerate() {
            *sample = src[ch % src_channels];
        }
        pos += 1;
    }

    position.store(pos, Ordering::Relaxed);
    tap.push_interleaved(&mono_samples, 1);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(samples: Vec<f32>, channels: usize) -> DecodedAudio {
        DecodedAudio {
            samples,
            sample_rate: 44100,
            channels,
        }
    }

    #[test]
    fn mono_track_is_duplicated_to_stereo_output() {
        let track = track(vec![0.1, 0.2, 0.3], 1);
        let position = AtomicUsize::new(0);
        let tap = Tap::new();
        let mut data = [0.0; 4];

        fill_output(&mut data, 2, &track, &position, &tap);

        assert_eq!(data, [0.1, 0.1, 0.2, 0.2]);
        assert_eq!(position.load(Ordering::Relaxed), 2);
        assert_eq!(tap.len(), 2);
    }

    #[test]
    fn stereo_track_feeds_mono_mix_to_tap() {
        let track = track(vec![1.0, 0.0, 0.0, 1.0], 2);
        let position = AtomicUsize::new(0);
        let tap = Tap::new();
        let mut data = [0.0; 4];

        fill_output(&mut data, 2, &track, &position, &tap);

        assert_eq!(data, [1.0, 0.0, 0.0, 1.0]);
        let mut mono = [0.0; 2];
        tap.copy_latest(&mut mono);
        assert_eq!(mono, [0.5, 0.5]);
    }

    #[test]
    fn end_of_track_is_silence_not_a_loop() {
        let track = track(vec![0.5, 0.5], 1);
        let position = AtomicUsize::new(1);
        let tap = Tap::new();
        let mut data = [9.0; 3];

        fill_output(&mut data, 1, &track, &position, &tap);

        assert_eq!(data, [0.5, 0.0, 0.0]);
        assert_eq!(position.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn old_stream_cannot_move_new_session_position() {
        let mut player = CpalPlayer::new();
        let stale = player.position.clone();
        let old_track = track(vec![0.25; 64], 1);
        let tap = Tap::new();

        player.seek_to_start();
        let fresh = player.start_session();

        // The previous stream's callback is still running
        let mut data = [0.0; 32];
        fill_output(&mut data, 1, &old_track, &stale, &tap);

        assert_eq!(stale.load(Ordering::Relaxed), 32);
        assert_eq!(fresh.load(Ordering::Relaxed), 0);
        assert_eq!(player.position(), 0);
    }

    #[test]
    fn seek_to_start_resets_position() {
        let mut player = CpalPlayer::new();
        player.position.store(1234, Ordering::Relaxed);
        player.seek_to_start();
        assert_eq!(player.position(), 0);
    }
}
