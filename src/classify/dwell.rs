use std::time::{Duration, Instant};

use crate::bands::Band;

/// Time spent continuously in the raw dominant band.
#[derive(Debug)]
pub struct DwellTracker {
    current: Option<Band>,
    since: Instant,
}

impl DwellTracker {
    pub fn new(now: Instant) -> Self {
        Self { current: None, since: now }
    }

    /// Record this frame's band and return the dwell so far. A band change
    /// restarts the clock at `now`.
    pub fn observe(&mut self, band: Band, now: Instant) -> Duration {
        if self.current != Some(band) {
            self.current = Some(band);
            self.since = now;
        }
        now.saturating_duration_since(self.since)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_starts_at_zero() {
        let t0 = Instant::now();
        let mut dwell = DwellTracker::new(t0);
        let d = dwell.observe(Band::Alpha, t0 + Duration::from_secs(5));
        assert_eq!(d, Duration::ZERO);
    }

    #[test]
    fn grows_while_band_holds_and_resets_on_change() {
        let t0 = Instant::now();
        let mut dwell = DwellTracker::new(t0);
        let at = |ms: u64| t0 + Duration::from_millis(ms);

        assert_eq!(dwell.observe(Band::Alpha, at(0)), Duration::ZERO);
        assert_eq!(dwell.observe(Band::Alpha, at(1000)), Duration::from_millis(1000));
        assert_eq!(dwell.observe(Band::Alpha, at(2500)), Duration::from_millis(2500));
        assert_eq!(dwell.observe(Band::Beta, at(3000)), Duration::ZERO);
        assert_eq!(dwell.observe(Band::Beta, at(3250)), Duration::from_millis(250));
        assert_eq!(dwell.observe(Band::Alpha, at(4000)), Duration::ZERO);
    }
}
