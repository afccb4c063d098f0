// crates/livecut-core/src/state.rs
//
// SelectorState: the anti-thrash bookkeeping behind the stream selector.
// Kept in livecut-core so the hysteresis rule is a pure, testable decision
// with no pipeline machinery attached.

use crate::frame::SourceId;

/// Tracks the elected source and how long a challenger has been winning.
///
/// `time_since_switch` counts the consecutive tallies in which the argmax
/// disagreed with the incumbent. It resets to 0 on a committed switch and
/// whenever the incumbent is reaffirmed — a challenger has to win
/// `thrash_limit + 1` tallies in a row before the selector commits.
/// `last_selected` is `None` only before the first successful tally.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorState {
    pub last_selected:     Option<SourceId>,
    pub time_since_switch: u32,
    pub thrash_limit:      u32,
}

impl SelectorState {
    pub fn new(thrash_limit: u32) -> Self {
        Self { last_selected: None, time_since_switch: 0, thrash_limit }
    }

    /// Feed one tally winner through the hysteresis rule.
    ///
    /// Switches iff no source was ever elected, or the candidate differs
    /// from the incumbent and has already out-polled it for more than
    /// `thrash_limit` consecutive tallies. Returns the newly elected source
    /// on a switch, `None` when the incumbent keeps the chair.
    pub fn consider(&mut self, candidate: SourceId) -> Option<SourceId> {
        let Some(current) = &self.last_selected else {
            self.last_selected = Some(candidate.clone());
            self.time_since_switch = 0;
            return Some(candidate);
        };

        if candidate == *current {
            // Incumbent reaffirmed — any running challenge is abandoned.
            self.time_since_switch = 0;
            return None;
        }

        if self.time_since_switch > self.thrash_limit {
            self.last_selected = Some(candidate.clone());
            self.time_since_switch = 0;
            Some(candidate)
        } else {
            self.time_since_switch += 1;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cam(n: u32) -> SourceId {
        SourceId::Camera(n)
    }

    /// Run a tally-winner sequence through the rule, returning the elected
    /// source after each step.
    fn elect(state: &mut SelectorState, winners: &[u32]) -> Vec<u32> {
        winners
            .iter()
            .map(|&n| {
                state.consider(cam(n));
                match state.last_selected {
                    Some(SourceId::Camera(c)) => c,
                    _ => unreachable!(),
                }
            })
            .collect()
    }

    #[test]
    fn first_candidate_is_always_elected() {
        let mut s = SelectorState::new(30);
        assert_eq!(s.consider(cam(1)), Some(cam(1)));
        assert_eq!(s.time_since_switch, 0);
    }

    #[test]
    fn incumbent_never_re_elected() {
        let mut s = SelectorState::new(3);
        s.consider(cam(1));
        for _ in 0..10 {
            assert_eq!(s.consider(cam(1)), None);
        }
        assert_eq!(s.last_selected, Some(cam(1)));
        assert_eq!(s.time_since_switch, 0);
    }

    #[test]
    fn challenger_must_outlast_the_thrash_limit() {
        let mut s = SelectorState::new(3);
        let elected = elect(&mut s, &[1, 1, 1, 2, 2, 2, 2, 2]);
        assert_eq!(elected, vec![1, 1, 1, 1, 1, 1, 1, 2]);
    }

    #[test]
    fn reaffirmed_incumbent_cancels_a_running_challenge() {
        // The challenger's streak is broken at tick 4, so it has to start
        // over and never accumulates enough consecutive wins.
        let mut s = SelectorState::new(2);
        let elected = elect(&mut s, &[1, 2, 2, 1, 2, 2, 1, 2, 2]);
        assert!(elected.iter().all(|&c| c == 1));
    }

    #[test]
    fn switch_resets_the_clock() {
        let mut s = SelectorState::new(1);
        s.consider(cam(1));
        assert_eq!(s.consider(cam(2)), None); // streak 1
        assert_eq!(s.consider(cam(2)), None); // streak 2
        assert_eq!(s.consider(cam(2)), Some(cam(2))); // 2 > 1 — committed
        assert_eq!(s.time_since_switch, 0);
    }

    #[test]
    fn streak_grows_monotonically_while_challenging() {
        let mut s = SelectorState::new(100);
        s.consider(cam(1));
        for expect in 1..=20 {
            s.consider(cam(2));
            assert_eq!(s.time_since_switch, expect);
        }
    }
}
