//! Motion state transitions and interval bookkeeping.
//!
//! Every observed status is compared against the sample recorded two steps
//! earlier (the history is checked before the new sample is appended). A
//! differing pair fires a boundary:
//!
//! - `Motion` now, `Still` two back: rising boundary
//! - `Still` now, `Motion` two back: falling boundary
//!
//! Boundaries drive a two-state machine. A rising boundary opens an interval only
//! from NO_MOTION, a falling boundary closes one only from MOTION. Every fired
//! boundary is kept in the boundary log either way.
//!
//! The history is seeded with two unset samples, so the first two observations
//! can never fire.

use serde::Serialize;

use crate::detect::MotionStatus;
use crate::Timestamp;

/// Direction of a fired boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum BoundaryKind {
    Rising,
    Falling,
}

/// One fired boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Boundary {
    pub kind: BoundaryKind,
    pub at: Timestamp,
}

/// One contiguous motion episode. `start <= end` always holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MotionInterval {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl MotionInterval {
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

/// Logical detection state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MotionState {
    #[default]
    NoMotion,
    Motion,
}

#[derive(Debug)]
pub struct TransitionLogger {
    history: Vec<Option<MotionStatus>>,
    boundaries: Vec<Boundary>,
    intervals: Vec<MotionInterval>,
    open_since: Option<Timestamp>,
}

impl Default for TransitionLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitionLogger {
    pub fn new() -> Self {
        Self {
            history: vec![None, None],
            boundaries: Vec::new(),
            intervals: Vec::new(),
            open_since: None,
        }
    }

    /// Record `status` observed at `now`. Returns the boundary it fired, if any.
    pub fn observe(&mut self, status: MotionStatus, now: Timestamp) -> Option<BoundaryKind> {
        let fired = self.two_back().and_then(|previous| match (previous, status) {
            (MotionStatus::Still, MotionStatus::Motion) => Some(BoundaryKind::Rising),
            (MotionStatus::Motion, MotionStatus::Still) => Some(BoundaryKind::Falling),
            _ => None,
        });

        if let Some(kind) = fired {
            self.boundaries.push(Boundary { kind, at: now });
            self.apply(kind, now);
        }

        self.history.push(Some(status));
        fired
    }

    /// Close an interval still open at session end. Safe to call more than once.
    pub fn finish(&mut self, now: Timestamp) -> Option<MotionInterval> {
        let start = self.open_since?;
        let end = now.max(start);
        self.boundaries.push(Boundary {
            kind: BoundaryKind::Falling,
            at: end,
        });
        self.apply(BoundaryKind::Falling, end);
        self.intervals.last().copied()
    }

    pub fn state(&self) -> MotionState {
        if self.open_since.is_some() {
            MotionState::Motion
        } else {
            MotionState::NoMotion
        }
    }

    pub fn is_open(&self) -> bool {
        self.open_since.is_some()
    }

    /// Status history including the two unset seed samples.
    pub fn history(&self) -> &[Option<MotionStatus>] {
        &self.history
    }

    /// Number of real (non-seed) samples observed.
    pub fn observed(&self) -> usize {
        self.history.len() - 2
    }

    pub fn boundaries(&self) -> &[Boundary] {
        &self.boundaries
    }

    /// Closed intervals, in time order.
    pub fn intervals(&self) -> &[MotionInterval] {
        &self.intervals
    }

    pub fn into_intervals(self) -> Vec<MotionInterval> {
        self.intervals
    }

    fn two_back(&self) -> Option<MotionStatus> {
        if self.history.len() > 1 {
            self.history[self.history.len() - 2]
        } else {
            None
        }
    }

    fn apply(&mut self, kind: BoundaryKind, now: Timestamp) {
        match (kind, self.open_since) {
            (BoundaryKind::Rising, None) => {
                log::info!("motion started at {}", now);
                self.open_since = Some(now);
            }
            (BoundaryKind::Falling, Some(start)) => {
                log::info!("motion ended at {}", now);
                self.intervals.push(MotionInterval {
                    start,
                    end: now.max(start),
                });
                self.open_since = None;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn t(seconds: i64) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .expect("valid timestamp")
            + Duration::seconds(seconds)
    }

    fn status(bit: u8) -> MotionStatus {
        MotionStatus::from(bit == 1)
    }

    fn feed(logger: &mut TransitionLogger, seq: &[u8]) -> Vec<Option<BoundaryKind>> {
        seq.iter()
            .enumerate()
            .map(|(i, &bit)| logger.observe(status(bit), t(i as i64)))
            .collect()
    }

    fn two_back_changes(seq: &[u8]) -> usize {
        (2..seq.len()).filter(|&i| seq[i] != seq[i - 2]).count()
    }

    #[test]
    fn boundaries_follow_two_back_rule() {
        let seq = [0, 0, 1, 1, 0, 0];
        let mut logger = TransitionLogger::new();
        let fired = feed(&mut logger, &seq);

        assert_eq!(
            fired,
            vec![
                None,
                None,
                Some(BoundaryKind::Rising),
                Some(BoundaryKind::Rising),
                Some(BoundaryKind::Falling),
                Some(BoundaryKind::Falling),
            ]
        );
        let at: Vec<_> = logger.boundaries().iter().map(|b| b.at).collect();
        assert_eq!(at, vec![t(2), t(3), t(4), t(5)]);
        assert_eq!(logger.boundaries().len(), two_back_changes(&seq));
    }

    #[test]
    fn boundary_count_matches_two_back_changes_not_adjacent_changes() {
        for seq in [
            vec![0, 1, 0, 1, 0, 1, 0],
            vec![1, 1, 1, 0, 0, 0, 1],
            vec![0, 0, 0, 1, 0, 0, 0],
            vec![1, 0, 1, 1, 0, 1, 0, 0, 1],
        ] {
            let mut logger = TransitionLogger::new();
            feed(&mut logger, &seq);
            assert_eq!(logger.boundaries().len(), two_back_changes(&seq), "{seq:?}");
        }

        // Alternating samples change at every step but never two steps back.
        let mut logger = TransitionLogger::new();
        feed(&mut logger, &[0, 1, 0, 1, 0, 1]);
        assert!(logger.boundaries().is_empty());
    }

    #[test]
    fn repeated_triggers_collapse_into_one_interval() {
        let mut logger = TransitionLogger::new();
        feed(&mut logger, &[0, 0, 1, 1, 0, 0]);
        assert_eq!(
            logger.intervals(),
            &[MotionInterval {
                start: t(2),
                end: t(4)
            }]
        );
        assert!(!logger.is_open());
    }

    #[test]
    fn first_two_samples_never_fire() {
        let mut logger = TransitionLogger::new();
        assert_eq!(logger.observe(MotionStatus::Motion, t(0)), None);
        assert_eq!(logger.observe(MotionStatus::Still, t(1)), None);
        assert!(logger.boundaries().is_empty());
        assert_eq!(logger.observed(), 2);
        assert_eq!(logger.history().len(), 4);
    }

    #[test]
    fn history_grows_by_one_per_observation() {
        let mut logger = TransitionLogger::new();
        for (i, bit) in [0, 1, 1, 0, 1].into_iter().enumerate() {
            logger.observe(status(bit), t(i as i64));
            assert_eq!(logger.observed(), i + 1);
        }
    }

    #[test]
    fn finish_closes_open_interval_at_termination() {
        let mut logger = TransitionLogger::new();
        feed(&mut logger, &[0, 0, 1]);
        assert!(logger.is_open());
        assert_eq!(logger.boundaries().len(), 1);

        let closed = logger.finish(t(10));
        assert_eq!(
            closed,
            Some(MotionInterval {
                start: t(2),
                end: t(10)
            })
        );
        assert_eq!(logger.boundaries().len(), 2);
        assert!(!logger.is_open());

        // Second call is a no-op.
        assert_eq!(logger.finish(t(20)), None);
        assert_eq!(logger.intervals().len(), 1);
    }

    #[test]
    fn finish_never_produces_inverted_interval() {
        let mut logger = TransitionLogger::new();
        feed(&mut logger, &[0, 0, 0, 1]);
        let closed = logger.finish(t(0)).expect("closed");
        assert!(closed.start <= closed.end);
        assert_eq!(closed.end, t(3));
    }

    #[test]
    fn finish_without_open_interval_changes_nothing() {
        let mut logger = TransitionLogger::new();
        feed(&mut logger, &[0, 0, 1, 1, 0, 0]);
        assert_eq!(logger.finish(t(30)), None);
        assert_eq!(logger.boundaries().len(), 4);
        assert_eq!(logger.intervals().len(), 1);
    }

    #[test]
    fn intervals_are_ordered_and_well_formed() {
        let mut logger = TransitionLogger::new();
        feed(
            &mut logger,
            &[0, 0, 1, 1, 1, 0, 0, 0, 1, 1, 0, 0, 1, 0, 0, 1],
        );
        logger.finish(t(100));
        let intervals = logger.intervals();
        assert!(intervals.len() >= 3);
        for pair in intervals.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
        for interval in intervals {
            assert!(interval.start <= interval.end);
        }
    }
}
