//! Pull-based spectrum analysis of the sample tap.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::sync::Arc;

use crate::audio::Tap;

pub const MIN_WINDOW_SIZE: usize = 32;
pub const MAX_WINDOW_SIZE: usize = 32768;
/// Magnitudes at or below this level map to 0.
pub const MIN_DECIBELS: f32 = -100.0;
/// Magnitudes at or above this level map to 255.
pub const MAX_DECIBELS: f32 = -30.0;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AnalyzerError {
    #[error("window size {0} must be a power of two between 32 and 32768")]
    WindowSize(usize),

    #[error("buffer holds {actual} bins but the analyzer produces {expected}")]
    BufferLength { expected: usize, actual: usize },
}

/// Fixed-length byte magnitudes, one per frequency bin.
///
/// Only an analyzer can create one, so its length always matches the
/// analyzer's bin count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpectrumSnapshot {
    bins: Vec<u8>,
}

impl SpectrumSnapshot {
    pub fn bins(&self) -> &[u8] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

pub struct SpectralAnalyzer {
    fft: Arc<dyn rustfft::Fft<f32>>,
    size: usize,
    window: Vec<f32>,
    samples: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectralAnalyzer {
    pub fn new(size: usize) -> Result<Self, AnalyzerError> {
        if !size.is_power_of_two() || !(MIN_WINDOW_SIZE..=MAX_WINDOW_SIZE).contains(&size) {
            return Err(AnalyzerError::WindowSize(size));
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch_len = fft.get_inplace_scratch_len();

        // Blackman window: keeps side lobes low so quiet bins stay quiet
        let window: Vec<f32> = (0..size)
            .map(|i| {
                let x = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
                0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
            })
            .collect();

        Ok(Self {
            fft,
            size,
            window,
            samples: vec![0.0; size],
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        })
    }

    /// Number of bins produced per analysis: half the window size.
    pub fn frequency_bin_count(&self) -> usize {
        self.size / 2
    }

    /// A zeroed snapshot sized for this analyzer.
    pub fn snapshot(&self) -> SpectrumSnapshot {
        SpectrumSnapshot {
            bins: vec![0; self.frequency_bin_count()],
        }
    }

    /// Fill `snapshot` with the spectrum of the tap's most recent samples.
    pub fn fill(&mut self, tap: &Tap, snapshot: &mut SpectrumSnapshot) -> Result<(), AnalyzerError> {
        self.get_byte_frequency_data(tap, &mut snapshot.bins)
    }

    /// Write the current frequency magnitudes (0-255 per bin) into `out`.
    ///
    /// `out` must be exactly `frequency_bin_count()` long.
    pub fn get_byte_frequency_data(&mut self, tap: &Tap, out: &mut [u8]) -> Result<(), AnalyzerError> {
        if out.len() != self.frequency_bin_count() {
            return Err(AnalyzerError::BufferLength {
                expected: self.frequency_bin_count(),
                actual: out.len(),
            });
        }
        tap.copy_latest(&mut self.samples);
        self.analyze(out);
        Ok(())
    }

    fn analyze(&mut self, out: &mut [u8]) {
        for ((dst, &s), &w) in self.buffer.iter_mut().zip(&self.samples).zip(&self.window) {
            *dst = Complex::new(s * w, 0.0);
        }

        // Forward FFT (in-place)
        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        // Only positive frequencies = first half
        let scale = 1.0 / self.size as f32;
        for (dst, c) in out.iter_mut().zip(&self.buffer[..self.size / 2]) {
            *dst = magnitude_to_byte(c.norm() * scale);
        }
    }
}

/// Map a linear magnitude onto `0..=255` over the `[MIN_DECIBELS, MAX_DECIBELS]` range.
pub fn magnitude_to_byte(magnitude: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let t = (db - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS);
    (255.0 * t).clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_count_is_half_the_window() {
        for size in [32, 512, 1024, 2048, 32768] {
            let analyzer = SpectralAnalyzer::new(size).unwrap();
            assert_eq!(analyzer.frequency_bin_count(), size / 2);
            assert_eq!(analyzer.snapshot().len(), size / 2);
        }
        assert_eq!(SpectralAnalyzer::new(512).unwrap().snapshot().len(), 256);
        assert_eq!(SpectralAnalyzer::new(1024).unwrap().snapshot().len(), 512);
    }

    #[test]
    fn rejects_bad_window_sizes() {
        for size in [0, 16, 500, 1000, 65536] {
            assert_eq!(
                SpectralAnalyzer::new(size).err(),
                Some(AnalyzerError::WindowSize(size))
            );
        }
    }

    #[test]
    fn rejects_mismatched_buffer() {
        let mut analyzer = SpectralAnalyzer::new(512).unwrap();
        let mut out = vec![0u8; 512];
        let err = analyzer.get_byte_frequency_data(&Tap::new(), &mut out).unwrap_err();
        assert_eq!(
            err,
            AnalyzerError::BufferLength {
                expected: 256,
                actual: 512
            }
        );
    }

    #[test]
    fn silence_is_all_zeros() {
        let mut analyzer = SpectralAnalyzer::new(512).unwrap();
        let tap = Tap::new();
        tap.push_interleaved(&[0.0; 512], 1);
        let mut snapshot = analyzer.snapshot();
        analyzer.fill(&tap, &mut snapshot).unwrap();
        assert!(snapshot.bins().iter().all(|&b| b == 0));
    }

    #[test]
    fn full_scale_tone_peaks_at_its_bin() {
        let size = 1024;
        let bin = 64;
        let tone: Vec<f32> = (0..size)
            .map(|i| (2.0 * std::f32::consts::PI * bin as f32 * i as f32 / size as f32).sin())
            .collect();
        let tap = Tap::new();
        tap.push_interleaved(&tone, 1);

        let mut analyzer = SpectralAnalyzer::new(size).unwrap();
        let mut snapshot = analyzer.snapshot();
        analyzer.fill(&tap, &mut snapshot).unwrap();

        let bins = snapshot.bins();
        assert_eq!(bins[bin], 255);
        assert!(bins[bin - 10] < bins[bin]);
        assert!(bins[bin + 10] < bins[bin]);
        assert!(bins[400] < 50);
    }

    #[test]
    fn repeated_pulls_are_not_smoothed() {
        let size = 512;
        let tone: Vec<f32> = (0..size)
            .map(|i| (2.0 * std::f32::consts::PI * 32.0 * i as f32 / size as f32).sin())
            .collect();
        let tap = Tap::new();
        tap.push_interleaved(&tone, 1);

        let mut analyzer = SpectralAnalyzer::new(size).unwrap();
        let mut snapshot = analyzer.snapshot();
        analyzer.fill(&tap, &mut snapshot).unwrap();
        assert_eq!(snapshot.bins()[32], 255);

        tap.push_interleaved(&vec![0.0; size], 1);
        analyzer.fill(&tap, &mut snapshot).unwrap();
        assert!(snapshot.bins().iter().all(|&b| b == 0));
    }

    #[test]
    fn decibel_mapping_bounds() {
        assert_eq!(magnitude_to_byte(0.0), 0);
        assert_eq!(magnitude_to_byte(1e-6), 0);
        assert_eq!(magnitude_to_byte(1.0), 255);
        // -65 dB is halfway between -100 and -30
        let mid = magnitude_to_byte(10f32.powf(-65.0 / 20.0));
        assert!((126..=128).contains(&mid));
    }
}
