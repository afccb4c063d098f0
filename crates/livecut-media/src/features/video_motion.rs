// crates/livecut-media/src/features/video_motion.rs
//
// Motion feature: per camera, the fraction of the picture that changed since
// the camera's previous frame. The busiest camera wins the tick. A camera's
// first frame only primes its diff baseline — it cannot win until it has a
// past to differ from.

use std::collections::HashMap;

use livecut_core::distribution::Distribution;
use livecut_core::frame::{Frame, Payload, SourceId, VideoFrame};
use livecut_core::helpers::resample::resample_area;

use super::{FeatureCore, VoteWindow};
use crate::stage::StageInput;

/// Per-channel absolute difference below this is noise, not motion.
const DIFF_THRESHOLD: u8 = 25;

pub struct VideoMotionFeature {
    /// Video sources in config order; config order is the tie-break.
    videos:      Vec<SourceId>,
    window:      VoteWindow,
    last_frames: HashMap<SourceId, VideoFrame>,
}

impl VideoMotionFeature {
    pub fn new(videos: Vec<SourceId>, window_length: usize) -> Self {
        Self {
            videos,
            window: VoteWindow::new(window_length),
            last_frames: HashMap::new(),
        }
    }

    /// The freshest frame per source out of this tick's bundles.
    fn latest_frames(&self, bundles: &[StageInput]) -> HashMap<SourceId, VideoFrame> {
        let mut latest = HashMap::new();
        for bundle in bundles {
            for (stage_id, payload) in bundle {
                let Some(Payload::Media(Frame::Video(frame))) = payload else { continue };
                let Some(source) = stage_id.as_source() else { continue };
                if self.videos.contains(source) {
                    latest.insert(source.clone(), frame.clone());
                }
            }
        }
        latest
    }
}

impl FeatureCore for VideoMotionFeature {
    fn process(&mut self, bundles: Vec<StageInput>) -> Option<Distribution<SourceId>> {
        let fresh = self.latest_frames(&bundles);

        let mut winner: Option<(usize, f64)> = None;
        for (idx, source) in self.videos.iter().enumerate() {
            let Some(current) = fresh.get(source) else { continue };
            if let Some(prior) = self.last_frames.get(source) {
                let fraction = motion_fraction(prior, current);
                // Strict > keeps the earlier source on ties.
                if winner.map(|(_, best)| fraction > best).unwrap_or(true) {
                    winner = Some((idx, fraction));
                }
            }
            self.last_frames.insert(source.clone(), current.clone());
        }

        if let Some((idx, _)) = winner {
            self.window.push(self.videos[idx].clone());
        }
        self.window.tally(&self.videos)
    }
}

/// Fraction of channel samples whose absolute difference exceeds the noise
/// threshold. Frames of different sizes are compared at the prior frame's
/// dimensions.
pub fn motion_fraction(prior: &VideoFrame, current: &VideoFrame) -> f64 {
    let current = if current.width == prior.width && current.height == prior.height {
        current.clone()
    } else {
        resample_area(current, prior.width, prior.height)
    };
    if prior.data.is_empty() {
        return 0.0;
    }
    let moved = prior
        .data
        .iter()
        .zip(&current.data)
        .filter(|(&a, &b)| a.abs_diff(b) > DIFF_THRESHOLD)
        .count();
    moved as f64 / prior.data.len() as f64
}
