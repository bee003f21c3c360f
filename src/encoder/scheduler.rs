/// Sample accurate grain spawn countdown.
///
/// The countdown starts at zero, so the first grain spawns on the very first frame. After each
/// spawn, the caller schedules the next one with a freshly drawn interval.
#[derive(Debug, Default, Clone)]
pub(crate) struct GrainScheduler {
    countdown: usize,
}

impl GrainScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart the countdown, so the next frame spawns a grain.
    pub fn reset(&mut self) {
        self.countdown = 0;
    }

    /// Frames left until the next spawn, 0 when the current frame spawns.
    #[cfg(test)]
    pub fn frames_until_spawn(&self) -> usize {
        self.countdown
    }

    /// Advance by one frame. Returns true when a grain should be spawned in this frame.
    /// Call [`Self::schedule`] after each spawn to restart the countdown.
    #[inline]
    pub fn tick(&mut self) -> bool {
        if self.countdown == 0 {
            true
        } else {
            self.countdown -= 1;
            false
        }
    }

    /// Schedule the next spawn in `interval` frames from the current spawn frame.
    #[inline]
    pub fn schedule(&mut self, interval: usize) {
        self.countdown = interval.max(1) - 1;
    }
}

/// Convert an interval in seconds into frames, rounded to the nearest frame and at least 1.
#[inline]
pub(crate) fn interval_in_frames(seconds: f32, sample_rate: u32) -> usize {
    ((seconds as f64 * sample_rate as f64).round() as usize).max(1)
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_frames(block_sizes: &[usize], total: usize, interval: usize) -> Vec<usize> {
        let mut scheduler = GrainScheduler::new();
        let mut spawns = Vec::new();
        let mut frame = 0;
        for block_size in block_sizes.iter().cycle() {
            if frame >= total {
                break;
            }
            let block_size = (*block_size).min(total - frame);
            for _ in 0..block_size {
                if scheduler.tick() {
                    spawns.push(frame);
                    scheduler.schedule(interval);
                }
                frame += 1;
            }
        }
        spawns
    }

    #[test]
    fn half_second_interval() {
        let interval = interval_in_frames(0.5, 48000);
        assert_eq!(interval, 24000);
        let expected = vec![0, 24000, 48000, 72000];
        assert_eq!(spawn_frames(&[512], 96000, interval), expected);
        assert_eq!(spawn_frames(&[1, 7, 4096, 333], 96000, interval), expected);
        assert_eq!(spawn_frames(&[96000], 96000, interval), expected);
    }

    #[test]
    fn minimum_interval() {
        assert_eq!(interval_in_frames(0.0, 48000), 1);
        assert_eq!(interval_in_frames(0.001, 44100), 44);
        assert_eq!(spawn_frames(&[3], 5, 0), vec![0, 1, 2, 3, 4]);

        let mut scheduler = GrainScheduler::new();
        assert!(scheduler.tick());
        scheduler.schedule(3);
        assert_eq!(scheduler.frames_until_spawn(), 2);
        scheduler.reset();
        assert!(scheduler.tick());
    }
}
