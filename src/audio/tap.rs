use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Maximum number of mono samples kept in the tap.
/// Large enough to hold several analysis windows of the largest size.
pub const MAX_BUFFER_SIZE: usize = 32768 * 4;

/// Shared ring buffer that the audio thread writes into and the analyzer
/// reads from.
///
/// Cloning a `Tap` yields another handle to the same buffer.
#[derive(Clone, Default)]
pub struct Tap {
    buffer: Arc<Mutex<VecDeque<f32>>>,
}

impl Tap {
    pub fn new() -> Self {
        Self {
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_BUFFER_SIZE))),
        }
    }

    /// Push interleaved multi-channel samples into the tap as mono.
    pub fn push_interleaved(&self, data: &[f32], channels: usize) {
        let mut buf = self.lock();
        if channels > 1 {
            for chunk in data.chunks(channels) {
                let mono: f32 = chunk.iter().sum::<f32>() / chunk.len() as f32;
                buf.push_back(mono);
            }
        } else {
            buf.extend(data.iter().copied());
        }
        while buf.len() > MAX_BUFFER_SIZE {
            buf.pop_front();
        }
    }

    /// Copy the most recent `out.len()` samples into `out`, oldest first.
    /// When fewer samples are available the front of `out` is zero-filled.
    pub fn copy_latest(&self, out: &mut [f32]) {
        let buf = self.lock();
        let available = buf.len().min(out.len());
        let pad = out.len() - available;
        out[..pad].fill(0.0);
        for (dst, &src) in out[pad..].iter_mut().zip(buf.range(buf.len() - available..)) {
            *dst = src;
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ptr_eq(&self, other: &Tap) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }

    // A panicking audio callback must not take the render loop down with it.
    fn lock(&self) -> MutexGuard<'_, VecDeque<f32>> {
        self.buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_is_mixed_to_mono() {
        let tap = Tap::new();
        tap.push_interleaved(&[1.0, 0.0, 0.5, 0.5], 2);
        let mut out = [0.0; 2];
        tap.copy_latest(&mut out);
        assert_eq!(out, [0.5, 0.5]);
    }

    #[test]
    fn short_tap_is_zero_padded_at_the_front() {
        let tap = Tap::new();
        tap.push_interleaved(&[0.25, 0.75], 1);
        let mut out = [9.0; 4];
        tap.copy_latest(&mut out);
        assert_eq!(out, [0.0, 0.0, 0.25, 0.75]);
    }

    #[test]
    fn keeps_only_the_newest_samples() {
        let tap = Tap::new();
        let data: Vec<f32> = (0..MAX_BUFFER_SIZE + 10).map(|i| i as f32).collect();
        tap.push_interleaved(&data, 1);
        assert_eq!(tap.len(), MAX_BUFFER_SIZE);

        let mut out = [0.0; 3];
        tap.copy_latest(&mut out);
        let last = (MAX_BUFFER_SIZE + 9) as f32;
        assert_eq!(out, [last - 2.0, last - 1.0, last]);
    }

    #[test]
    fn clones_share_one_buffer() {
        let tap = Tap::new();
        let other = tap.clone();
        other.push_interleaved(&[1.0], 1);
        assert_eq!(tap.len(), 1);
        assert!(tap.ptr_eq(&other));
        assert!(!tap.ptr_eq(&Tap::new()));
    }
}
