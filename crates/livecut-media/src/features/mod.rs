// crates/livecut-media/src/features/mod.rs
//
// Feature stages: each one watches a set of input stages and periodically
// emits a vote — a normalized Distribution over video source ids. The
// per-tick scoring lives in plain structs (AudioLevelFeature,
// VideoMotionFeature) so the algorithms are testable without any pipeline
// machinery; `feature_stage` wraps one in a stage worker.

pub mod audio_level;
pub mod video_motion;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use livecut_core::distribution::Distribution;
use livecut_core::frame::{Payload, PipelineData, SourceId, StageId};

use crate::schedule::run_periodic;
use crate::stage::{Stage, StageInput};

pub use audio_level::AudioLevelFeature;
pub use video_motion::VideoMotionFeature;

/// How many votes the output queue keeps before evicting the oldest.
const VOTE_BACKLOG: usize = 4;

/// Per-tick scoring shared by every feature implementation.
pub trait FeatureCore: Send + 'static {
    /// Consume the bundles drained from the input queue this tick and
    /// return a fresh vote, or `None` when nothing vote-worthy happened.
    fn process(&mut self, bundles: Vec<StageInput>) -> Option<Distribution<SourceId>>;
}

/// Wrap `core` in a stage: accumulate upstream bundles on an unbounded
/// input queue, score them every `interval`, and push votes with a short
/// drop-oldest backlog.
pub fn feature_stage(
    name:     &str,
    mut core: impl FeatureCore,
    inputs:   Vec<Arc<Stage>>,
    interval: Duration,
) -> Arc<Stage> {
    let stage = Stage::with_caps(StageId::feature(name), 0, false, VOTE_BACKLOG, true);
    stage.set_inputs(inputs);

    let id = stage.id().clone();
    stage.set_worker(move |ctx| {
        run_periodic(
            interval,
            || ctx.stopping(),
            || {
                let bundles = ctx.input.pop_all();
                if let Some(vote) = core.process(bundles) {
                    ctx.output
                        .push_latest(PipelineData::new(id.clone(), Payload::Vote(vote)));
                }
            },
        );
    });
    stage
}

/// Sliding window of recent argmax winners, bounded at `capacity`.
#[derive(Debug)]
pub(crate) struct VoteWindow {
    window:   VecDeque<SourceId>,
    capacity: usize,
}

impl VoteWindow {
    pub fn new(capacity: usize) -> Self {
        Self { window: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, winner: SourceId) {
        while self.window.len() >= self.capacity.max(1) {
            self.window.pop_front();
        }
        self.window.push_back(winner);
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Normalized occurrence counts over `all_videos`, with an explicit 0.0
    /// entry for every video id the window never saw. `None` while empty.
    pub fn tally(&self, all_videos: &[SourceId]) -> Option<Distribution<SourceId>> {
        if self.window.is_empty() {
            return None;
        }
        let mut vote = Distribution::from_counts(self.window.iter().cloned());
        for v in all_videos {
            vote.entry(v.clone());
        }
        vote.normalize().ok()?;
        Some(vote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cam(n: u32) -> SourceId {
        SourceId::Camera(n)
    }

    #[test]
    fn window_never_exceeds_capacity() {
        let mut w = VoteWindow::new(3);
        for i in 0..10 {
            w.push(cam(i));
            assert!(w.len() <= 3);
        }
    }

    #[test]
    fn tally_includes_zero_entries_and_sums_to_one() {
        let mut w = VoteWindow::new(4);
        w.push(cam(0));
        w.push(cam(0));
        w.push(cam(1));
        let vote = w.tally(&[cam(0), cam(1), cam(2)]).unwrap();
        assert!((vote.total() - 1.0).abs() < 1e-9);
        assert!((vote.get(&cam(0)) - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(vote.get(&cam(2)), 0.0);
        assert_eq!(vote.len(), 3);
    }

    #[test]
    fn empty_window_produces_no_vote() {
        let w = VoteWindow::new(4);
        assert!(w.tally(&[cam(0)]).is_none());
    }
}
