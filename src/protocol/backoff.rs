//! Hello retry backoff.

use std::time::Duration;

/// Exponential delay sequence between unanswered hellos.
///
/// The first delay is `initial`; each later one doubles the previous,
/// capped at `max`. A schedule lives for one attempt sequence and is
/// discarded when the sequence ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffSchedule {
    initial: Duration,
    max: Duration,
    previous: Option<Duration>,
}

impl BackoffSchedule {
    /// Create a fresh schedule
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            previous: None,
        }
    }

    /// Delay most recently handed out
    pub fn previous(&self) -> Option<Duration> {
        self.previous
    }

    /// Advance and return the next delay
    pub fn next_delay(&mut self) -> Duration {
        let delay = match self.previous {
            None => self.initial,
            Some(previous) => previous.saturating_mul(2),
        }
        .min(self.max);

        self.previous = Some(delay);
        delay
    }
}

impl Iterator for BackoffSchedule {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_delay())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_default_sequence() {
        let delays: Vec<u64> = BackoffSchedule::new(ms(1000), ms(60_000))
            .take(9)
            .map(|d| d.as_millis() as u64)
            .collect();

        assert_eq!(
            delays,
            vec![1000, 2000, 4000, 8000, 16000, 32000, 60000, 60000, 60000]
        );
    }

    #[test]
    fn test_previous_tracks_last_delay() {
        let mut schedule = BackoffSchedule::new(ms(1000), ms(60_000));
        assert_eq!(schedule.previous(), None);
        schedule.next_delay();
        schedule.next_delay();
        assert_eq!(schedule.previous(), Some(ms(2000)));
    }

    #[test]
    fn test_initial_above_max_is_capped() {
        let mut schedule = BackoffSchedule::new(ms(5000), ms(3000));
        assert_eq!(schedule.next_delay(), ms(3000));
        assert_eq!(schedule.next_delay(), ms(3000));
    }

    proptest! {
        #[test]
        fn prop_doubles_until_capped(
            initial in 1u64..=60_000,
            extra in 0u64..=600_000,
            attempts in 1usize..64,
        ) {
            let max = initial + extra;
            let delays: Vec<Duration> = BackoffSchedule::new(ms(initial), ms(max))
                .take(attempts)
                .collect();

            prop_assert_eq!(delays[0], ms(initial));
            for pair in delays.windows(2) {
                prop_assert!(pair[1] >= pair[0]);
                prop_assert!(pair[1] <= ms(max));
                prop_assert_eq!(pair[1], (pair[0] * 2).min(ms(max)));
            }
        }
    }
}
