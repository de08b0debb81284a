//! Frame scheduling for the animation loop.
//!
//! The driver never calls itself: the shell asks it whether a frame is
//! pending, and `run_frame` re-arms the next one only if nothing cancelled
//! the loop while the frame was running.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// No frame is scheduled.
    Idle,
    /// A frame is scheduled and will run on the next redraw.
    Running,
}

/// Token identifying one scheduled frame. A cancelled token is never run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

#[derive(Debug, Default)]
pub struct AnimationDriver {
    next_id: u64,
    pending: Option<FrameHandle>,
}

impl AnimationDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DriverState {
        if self.pending.is_some() {
            DriverState::Running
        } else {
            DriverState::Idle
        }
    }

    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    pub fn is_live(&self, handle: FrameHandle) -> bool {
        self.pending == Some(handle)
    }

    /// Schedule a frame, superseding any frame already pending.
    pub fn schedule(&mut self) -> FrameHandle {
        self.cancel();
        let handle = FrameHandle(self.next_id);
        self.next_id += 1;
        self.pending = Some(handle);
        handle
    }

    /// Drop the pending frame, if any. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Run the pending frame, then schedule the next one.
    ///
    /// Returns `None` without calling `frame` when the driver is idle.
    /// `frame` may return `false` to stop the loop instead of re-arming.
    pub fn run_frame<F>(&mut self, frame: F) -> Option<FrameHandle>
    where
        F: FnOnce() -> bool,
    {
        let handle = self.pending.take()?;
        log::trace!("Running frame {:?}", handle);
        if frame() {
            Some(self.schedule())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        let driver = AnimationDriver::new();
        assert_eq!(driver.state(), DriverState::Idle);
        assert_eq!(driver.pending(), None);
    }

    #[test]
    fn schedule_supersedes_previous_frame() {
        let mut driver = AnimationDriver::new();
        let first = driver.schedule();
        let second = driver.schedule();
        assert_ne!(first, second);
        assert!(!driver.is_live(first));
        assert!(driver.is_live(second));
        assert_eq!(driver.state(), DriverState::Running);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut driver = AnimationDriver::new();
        assert!(!driver.cancel());
        driver.schedule();
        assert!(driver.cancel());
        assert!(!driver.cancel());
        assert_eq!(driver.state(), DriverState::Idle);
    }

    #[test]
    fn frames_rearm_until_cancelled() {
        let mut driver = AnimationDriver::new();
        driver.schedule();

        let mut ticks = 0;
        for _ in 0..5 {
            driver.run_frame(|| {
                ticks += 1;
                true
            });
        }
        assert_eq!(ticks, 5);
        assert_eq!(driver.state(), DriverState::Running);

        let stale = driver.pending().unwrap();
        driver.cancel();
        assert!(driver.run_frame(|| panic!("cancelled frame ran")).is_none());
        assert!(!driver.is_live(stale));
        assert_eq!(ticks, 5);
    }

    #[test]
    fn frame_can_stop_the_loop() {
        let mut driver = AnimationDriver::new();
        driver.schedule();
        assert_eq!(driver.run_frame(|| false), None);
        assert_eq!(driver.state(), DriverState::Idle);
    }
}
