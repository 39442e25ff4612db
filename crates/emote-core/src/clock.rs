//! Face clock: tick counter and accumulated elapsed time.
//!
//! Hosts tick the face at whatever rate they render, passing the seconds
//! since the previous tick. The clock counts ticks with checked arithmetic
//! and accumulates elapsed time in `f64` so long sessions do not lose
//! precision.
//!
//! Tick 0 is the state before the first [`advance`](FaceClock::advance).
//! Reactions requested at tick 0 are deferred to the first tick.

/// Errors that can occur during clock operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,

    /// The host passed a NaN or infinite delta.
    #[error("non-finite tick delta: {delta}")]
    NonFiniteDelta {
        /// The rejected delta in seconds.
        delta: f32,
    },
}

/// Tick counter and elapsed time of one face.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FaceClock {
    /// Number of completed ticks.
    tick: u64,

    /// Seconds accumulated over all ticks.
    elapsed: f64,
}

impl FaceClock {
    /// A clock at tick 0.
    pub const fn new() -> Self {
        Self {
            tick: 0,
            elapsed: 0.0,
        }
    }

    /// Advance by one tick of `dt` seconds. Returns the sanitized delta.
    ///
    /// Negative deltas are treated as zero.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::NonFiniteDelta`] for NaN or infinite `dt`, and
    /// [`ClockError::TickOverflow`] if the tick counter would exceed
    /// `u64::MAX`. The clock is unchanged on error.
    pub fn advance(&mut self, dt: f32) -> Result<f32, ClockError> {
        if !dt.is_finite() {
            return Err(ClockError::NonFiniteDelta { delta: dt });
        }
        let dt = dt.max(0.0);
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        self.elapsed += f64::from(dt);
        Ok(dt)
    }

    /// Number of completed ticks.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Whether no tick has run yet.
    pub const fn is_first_tick(&self) -> bool {
        self.tick == 0
    }

    /// Seconds accumulated over all ticks.
    pub const fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let clock = FaceClock::new();
        assert_eq!(clock.tick(), 0);
        assert!(clock.is_first_tick());
        assert!(clock.elapsed().abs() < f64::EPSILON);
    }

    #[test]
    fn advance_counts_ticks_and_time() {
        let mut clock = FaceClock::new();
        for _ in 0..50 {
            clock.advance(0.02).unwrap();
        }
        assert_eq!(clock.tick(), 50);
        assert!(!clock.is_first_tick());
        assert!((clock.elapsed() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn negative_delta_is_zero() {
        let mut clock = FaceClock::new();
        let dt = clock.advance(-1.0).unwrap();
        assert!(dt.abs() < f32::EPSILON);
        assert_eq!(clock.tick(), 1);
        assert!(clock.elapsed().abs() < f64::EPSILON);
    }

    #[test]
    fn non_finite_delta_is_rejected() {
        let mut clock = FaceClock::new();
        let err = clock.advance(f32::NAN).unwrap_err();
        assert!(matches!(err, ClockError::NonFiniteDelta { .. }));
        assert_eq!(clock.tick(), 0);
    }

    #[test]
    fn overflow_is_reported() {
        let mut clock = FaceClock {
            tick: u64::MAX,
            elapsed: 0.0,
        };
        assert_eq!(clock.advance(0.02).unwrap_err(), ClockError::TickOverflow);
        assert_eq!(clock.tick(), u64::MAX);
    }
}
