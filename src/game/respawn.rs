//! Respawn countdown owned by a character

use std::time::Duration;

/// Result of advancing a countdown by one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    /// Still running; `announce` is set when the whole-second display changed
    Pending { announce: Option<u32> },
    Fired,
}

#[derive(Debug, Clone)]
pub struct RespawnTimer {
    remaining: Duration,
    announced: Option<u32>,
}

impl RespawnTimer {
    pub fn new(duration: Duration) -> Self {
        Self {
            remaining: duration,
            announced: None,
        }
    }

    /// Whole seconds left, rounded up
    pub fn seconds_remaining(&self) -> u32 {
        let secs = self.remaining.as_secs();
        let rounded = if self.remaining.subsec_nanos() > 0 { secs + 1 } else { secs };
        u32::try_from(rounded).unwrap_or(u32::MAX)
    }

    pub fn advance(&mut self, dt: Duration) -> Countdown {
        self.remaining = self.remaining.saturating_sub(dt);
        if self.remaining.is_zero() {
            return Countdown::Fired;
        }

        let secs = self.seconds_remaining();
        if self.announced == Some(secs) {
            Countdown::Pending { announce: None }
        } else {
            self.announced = Some(secs);
            Countdown::Pending {
                announce: Some(secs),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_down_and_fires() {
        let mut timer = RespawnTimer::new(Duration::from_millis(2500));
        assert_eq!(timer.seconds_remaining(), 3);

        let step = Duration::from_millis(500);
        assert_eq!(timer.advance(step), Countdown::Pending { announce: Some(2) });
        assert_eq!(timer.advance(step), Countdown::Pending { announce: None });
        assert_eq!(timer.advance(step), Countdown::Pending { announce: Some(1) });
        assert_eq!(timer.advance(step), Countdown::Pending { announce: None });
        assert_eq!(timer.advance(step), Countdown::Fired);
    }

    #[test]
    fn zero_duration_fires_on_first_tick() {
        let mut timer = RespawnTimer::new(Duration::ZERO);
        assert_eq!(timer.advance(Duration::from_millis(33)), Countdown::Fired);
    }
}
