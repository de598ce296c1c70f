//! Time-based position interpolation

use std::time::Duration;

use tokio::time::Instant;

use super::easing::EasingType;

/// Fraction of `duration` elapsed between `start` and `now`, clamped to [0, 1]
#[inline]
pub fn progress(start: Instant, now: Instant, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 1.0;
    }
    let elapsed = now.saturating_duration_since(start);
    (elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
}

/// Linear interpolation between two values
#[inline]
pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

/// An eased move from one position to another
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Animation {
    pub start: Instant,
    pub from: f64,
    pub to: f64,
    pub duration: Duration,
    pub easing: EasingType,
}

impl Animation {
    pub fn new(start: Instant, from: f64, to: f64, duration: Duration, easing: EasingType) -> Self {
        Self {
            start,
            from,
            to,
            duration,
            easing,
        }
    }

    #[inline]
    pub fn is_complete(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.start) >= self.duration
    }

    /// Position at `now`; exactly `to` once the animation is complete
    pub fn sample(&self, now: Instant) -> f64 {
        if self.is_complete(now) {
            return self.to;
        }
        let t = progress(self.start, now, self.duration);
        lerp(self.from, self.to, self.easing.apply(t))
    }

    /// Instant at which the animation completes
    pub fn end(&self) -> Instant {
        self.start + self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp() {
        assert!((lerp(0.0, 100.0, 0.0) - 0.0).abs() < 0.001);
        assert!((lerp(0.0, 100.0, 0.5) - 50.0).abs() < 0.001);
        assert!((lerp(1000.0, 0.0, 1.0) - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_progress_zero_duration() {
        let start = Instant::now();
        assert!((progress(start, start, Duration::ZERO) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_progress_before_start_is_zero() {
        let start = Instant::now() + Duration::from_millis(10);
        assert_eq!(progress(start, Instant::now(), Duration::from_millis(100)), 0.0);
    }

    #[test]
    fn test_sample_ends_exactly_on_target() {
        let start = Instant::now();
        let anim = Animation::new(start, 998.5, 0.0, Duration::from_millis(600), EasingType::Cubic);

        let mid = anim.sample(start + Duration::from_millis(300));
        assert!(mid > 0.0 && mid < 998.5);
        assert!(!anim.is_complete(start + Duration::from_millis(599)));
        assert_eq!(anim.sample(start + Duration::from_millis(600)), 0.0);
        assert_eq!(anim.end(), start + Duration::from_millis(600));
    }
}
