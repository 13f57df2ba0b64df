// src/batch/timing.rs

use std::time::Duration;

use chrono::{DateTime, Local};

/// Per-subject wall-clock samples, used only to estimate time remaining.
#[derive(Debug, Clone, Default)]
pub struct TimingSamples {
    samples: Vec<Duration>,
}

impl TimingSamples {
    /// Below this many samples no estimate is given.
    pub const MIN_SAMPLES: usize = 3;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, elapsed: Duration) {
        self.samples.push(elapsed);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Median sample; the mean of the two middle samples for even counts.
    pub fn median(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let mut sorted = self.samples.clone();
        sorted.sort();
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / 2)
        } else {
            Some(sorted[mid])
        }
    }

    /// Median and projected finish time for `remaining` more subjects.
    pub fn estimate(
        &self,
        remaining: usize,
        now: DateTime<Local>,
    ) -> Option<(Duration, DateTime<Local>)> {
        if self.samples.len() < Self::MIN_SAMPLES {
            return None;
        }
        let median = self.median()?;
        let left = median.checked_mul(u32::try_from(remaining).ok()?)?;
        let eta = now + chrono::Duration::from_std(left).ok()?;
        Some((median, eta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn samples(secs: &[u64]) -> TimingSamples {
        let mut t = TimingSamples::new();
        for s in secs {
            t.push(Duration::from_secs(*s));
        }
        t
    }

    #[test]
    fn median_of_odd_and_even_counts() {
        assert_eq!(samples(&[30, 10, 20]).median(), Some(Duration::from_secs(20)));
        assert_eq!(samples(&[40, 10, 20, 30]).median(), Some(Duration::from_secs(25)));
        assert_eq!(samples(&[]).median(), None);
    }

    #[test]
    fn no_estimate_until_enough_samples() {
        let now = Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert!(samples(&[60, 60]).estimate(5, now).is_none());

        let (median, eta) = samples(&[60, 120, 180]).estimate(5, now).unwrap();
        assert_eq!(median, Duration::from_secs(120));
        assert_eq!(eta, now + chrono::Duration::minutes(10));
    }
}
