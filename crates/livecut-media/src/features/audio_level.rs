// crates/livecut-media/src/features/audio_level.rs
//
// Loudness feature: the microphone with the highest peak amplitude this tick
// nominates its paired camera. Votes are the normalized occupancy of a
// sliding window of recent winners, so a single loud cough doesn't flip the
// program feed by itself.

use livecut_core::distribution::Distribution;
use livecut_core::frame::{Frame, Payload, SourceId};

use super::{FeatureCore, VoteWindow};
use crate::stage::StageInput;

pub struct AudioLevelFeature {
    /// (audio source, the video source it speaks for), in config order.
    /// Config order is the tie-break: equal peaks go to the earlier pair.
    pairs:  Vec<(SourceId, SourceId)>,
    videos: Vec<SourceId>,
    window: VoteWindow,
}

impl AudioLevelFeature {
    pub fn new(pairs: Vec<(SourceId, SourceId)>, window_length: usize) -> Self {
        let videos = pairs.iter().map(|(_, v)| v.clone()).collect();
        Self {
            pairs,
            videos,
            window: VoteWindow::new(window_length),
        }
    }

    /// Peak amplitude per audio source over every frame drained this tick.
    /// Sources that sent nothing score 0.
    fn peaks(&self, bundles: &[StageInput]) -> Vec<f64> {
        let mut peaks = vec![0.0f64; self.pairs.len()];
        let mut any = false;
        for bundle in bundles {
            for (stage_id, payload) in bundle {
                let Some(Payload::Media(Frame::Audio(frame))) = payload else { continue };
                let Some(source) = stage_id.as_source() else { continue };
                let Some(idx) = self.pairs.iter().position(|(a, _)| a == source) else {
                    continue;
                };
                peaks[idx] = peaks[idx].max(frame.samples.peak());
                any = true;
            }
        }
        if any { peaks } else { Vec::new() }
    }
}

impl FeatureCore for AudioLevelFeature {
    fn process(&mut self, bundles: Vec<StageInput>) -> Option<Distribution<SourceId>> {
        let peaks = self.peaks(&bundles);
        if !peaks.is_empty() {
            // Strict > keeps the first pair on ties.
            let mut winner = 0;
            for (i, &p) in peaks.iter().enumerate() {
                if p > peaks[winner] {
                    winner = i;
                }
            }
            self.window.push(self.pairs[winner].1.clone());
        }
        self.window.tally(&self.videos)
    }
}
