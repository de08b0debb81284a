//! The controller tying file selection, playback, analysis and drawing together.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::analyzer::{AnalyzerError, SpectralAnalyzer, SpectrumSnapshot};
use crate::audio::{self, media, AudioError, DecodedAudio, Playback, Tap};
use crate::driver::{AnimationDriver, DriverState};
use crate::render::Visualization;

/// A decoded track wired to the analyzer's tap.
pub struct PlaybackSession {
    pub track: Arc<DecodedAudio>,
    pub tap: Tap,
}

/// Process-wide mutable state, owned by the controller.
#[derive(Default)]
pub struct VisualizerState {
    pub session: Option<PlaybackSession>,
    pub animation: AnimationDriver,
}

/// Decode work for one accepted selection.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub generation: u64,
    pub path: PathBuf,
}

impl LoadRequest {
    /// Decode the file. Blocking; run it off the UI thread.
    pub fn run(self) -> LoadOutcome {
        let result = audio::decode_file(&self.path);
        LoadOutcome {
            generation: self.generation,
            path: self.path,
            result,
        }
    }
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub generation: u64,
    pub path: PathBuf,
    pub result: Result<DecodedAudio, AudioError>,
}

pub struct Visualizer<P: Playback> {
    player: P,
    /// Created the first time a file is accepted, then reused.
    tap: Option<Tap>,
    analyzer: SpectralAnalyzer,
    snapshot: SpectrumSnapshot,
    state: VisualizerState,
    generation: u64,
}

impl<P: Playback> Visualizer<P> {
    pub fn new(player: P, window_size: usize) -> Result<Self, AnalyzerError> {
        let analyzer = SpectralAnalyzer::new(window_size)?;
        let snapshot = analyzer.snapshot();
        Ok(Self {
            player,
            tap: None,
            analyzer,
            snapshot,
            state: VisualizerState::default(),
            generation: 0,
        })
    }

    pub fn state(&self) -> &VisualizerState {
        &self.state
    }

    pub fn driver_state(&self) -> DriverState {
        self.state.animation.state()
    }

    pub fn bin_count(&self) -> usize {
        self.analyzer.frequency_bin_count()
    }

    pub fn tap(&self) -> Option<&Tap> {
        self.tap.as_ref()
    }

    /// Handle a new file selection. `None` means the selection was emptied.
    ///
    /// Returns the decode work to run when the file is accepted.
    pub fn select_file(&mut self, file: Option<&Path>) -> Option<LoadRequest> {
        self.player.pause();
        self.player.seek_to_start();
        self.state.session = None;
        // Paused output is silence; don't keep analysing the old track's tail
        if let Some(tap) = &self.tap {
            tap.clear();
        }

        match file {
            Some(path) if media::is_accepted(path) => {
                self.tap.get_or_insert_with(Tap::new);
                self.generation += 1;
                self.state.animation.schedule();
                log::info!("Loading {}", path.display());
                Some(LoadRequest {
                    generation: self.generation,
                    path: path.to_path_buf(),
                })
            }
            other => {
                if let Some(path) = other {
                    log::debug!(
                        "Ignoring {} ({})",
                        path.display(),
                        media::media_type(path).unwrap_or("unknown type")
                    );
                }
                // Supersede any load still in flight
                self.generation += 1;
                self.state.animation.cancel();
                None
            }
        }
    }

    /// Start playback once a decode finishes. Stale decodes are dropped.
    pub fn finish_load(&mut self, outcome: LoadOutcome) {
        if outcome.generation != self.generation {
            log::debug!("Discarding superseded load of {}", outcome.path.display());
            return;
        }

        let Some(tap) = self.tap.clone() else {
            log::warn!("No tap for {}, dropping load", outcome.path.display());
            self.state.animation.cancel();
            return;
        };

        let track = match outcome.result {
            Ok(track) => Arc::new(track),
            Err(e) => {
                log::warn!("Could not decode {}: {e}", outcome.path.display());
                self.state.animation.cancel();
                return;
            }
        };

        tap.clear();
        match self.player.play(track.clone(), &tap) {
            Ok(()) => {
                self.state.session = Some(PlaybackSession { track, tap });
            }
            Err(e) => {
                log::warn!("Could not start playback of {}: {e}", outcome.path.display());
                self.state.animation.cancel();
            }
        }
    }

    /// Run the scheduled frame, if any: pull a fresh snapshot and draw it.
    ///
    /// Returns whether a frame ran.
    pub fn tick(&mut self, renderer: &mut dyn Visualization) -> bool {
        let Self {
            tap,
            analyzer,
            snapshot,
            state,
            ..
        } = self;

        state
            .animation
            .run_frame(|| {
                if let Some(tap) = tap {
                    if let Err(e) = analyzer.fill(tap, snapshot) {
                        log::error!("Spectrum pull failed: {e}");
                        return false;
                    }
                }
                renderer.draw(snapshot);
                true
            })
            .is_some()
    }

    /// Redraw the last snapshot without pulling new data.
    pub fn redraw(&mut self, renderer: &mut dyn Visualization) {
        renderer.draw(&self.snapshot);
    }
}

#[cfg(test)]
impl<P: Playback> Visualizer<P> {
    fn player(&self) -> &P {
        &self.player
    }
}
