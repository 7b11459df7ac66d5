use std::time::{Duration, Instant};

/// Wait before another OTP may be requested
pub const RESEND_COOLDOWN: Duration = Duration::from_secs(30);

/// Local countdown gating the "resend code" action
#[derive(Debug, Clone)]
pub struct ResendCooldown {
    period: Duration,
    started_at: Option<Instant>,
}

impl ResendCooldown {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            started_at: None,
        }
    }

    pub fn restart(&mut self, now: Instant) {
        self.started_at = Some(now);
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        match self.started_at {
            Some(start) => self.period.saturating_sub(now.saturating_duration_since(start)),
            None => Duration::ZERO,
        }
    }

    /// Whole seconds left, rounded up, as shown on the countdown label
    pub fn remaining_secs(&self, now: Instant) -> u64 {
        let remaining = self.remaining(now);
        remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
    }

    pub fn can_resend(&self, now: Instant) -> bool {
        self.remaining(now).is_zero()
    }
}

impl Default for ResendCooldown {
    fn default() -> Self {
        Self::new(RESEND_COOLDOWN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_cooldown_allows_resend() {
        let cooldown = ResendCooldown::default();
        assert!(cooldown.can_resend(Instant::now()));
    }

    #[test]
    fn test_countdown() {
        let start = Instant::now();
        let mut cooldown = ResendCooldown::default();
        cooldown.restart(start);

        assert!(!cooldown.can_resend(start));
        assert_eq!(cooldown.remaining_secs(start), 30);
        assert_eq!(cooldown.remaining_secs(start + Duration::from_millis(10_500)), 20);
        assert!(cooldown.can_resend(start + Duration::from_secs(30)));
        assert_eq!(cooldown.remaining(start + Duration::from_secs(45)), Duration::ZERO);
    }
}
