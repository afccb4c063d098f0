// crates/livecut-media/src/selector.rs
//
// StreamSelector: the supervisor that drives every stage, tallies feature
// votes under the configured weights, applies anti-thrash hysteresis, and
// rebinds the program-feed sinks to the elected camera.
//
// The selector owns no worker of its own — it is ticked by a periodic loop
// on the thread that calls run(). Stage starts are lazy: the first tick
// launches everything in dependency order (sources, then features, then
// sinks), so constructing a pipeline is side-effect free until run.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Result};

use livecut_core::distribution::Distribution;
use livecut_core::edl::CutLog;
use livecut_core::frame::{Payload, SourceId, StageId};
use livecut_core::state::SelectorState;

use crate::schedule::run_periodic;
use crate::stage::Stage;

pub struct StreamSelector {
    /// Every stage, in dependency order: sources, features, sinks.
    all_stages: Vec<Arc<Stage>>,
    features:   Vec<Arc<Stage>>,
    /// Per-feature vote weight, keyed by feature stage id.
    feature_weights: Distribution<StageId>,
    /// Elected source id → the input stage to bind the program sinks to.
    video_input_map: BTreeMap<SourceId, Arc<Stage>>,
    /// Sinks whose input binding follows the vote.
    main_video_sinks: Vec<Arc<Stage>>,

    state:      SelectorState,
    cut_log:    CutLog,
    started:    bool,
    started_at: Option<Instant>,
}

impl StreamSelector {
    pub fn new(
        all_stages:       Vec<Arc<Stage>>,
        weighted_features: Vec<(Arc<Stage>, f64)>,
        video_inputs:     Vec<(SourceId, Arc<Stage>)>,
        main_video_sinks: Vec<Arc<Stage>>,
        thrash_limit:     u32,
        log_fps:          u32,
    ) -> Result<Self> {
        if weighted_features.is_empty() {
            bail!("selector needs at least one weighted feature");
        }
        let mut feature_weights = Distribution::new();
        let mut features = Vec::with_capacity(weighted_features.len());
        for (stage, weight) in weighted_features {
            feature_weights.set(stage.id().clone(), weight);
            features.push(stage);
        }
        Ok(Self {
            all_stages,
            features,
            feature_weights,
            video_input_map: video_inputs.into_iter().collect(),
            main_video_sinks,
            state:      SelectorState::new(thrash_limit),
            cut_log:    CutLog::new(log_fps),
            started:    false,
            started_at: None,
        })
    }

    pub fn last_selected(&self) -> Option<&SourceId> {
        self.state.last_selected.as_ref()
    }

    pub fn cut_log(&self) -> &CutLog {
        &self.cut_log
    }

    /// Start every stage in dependency order. Invoked lazily by the first
    /// tick; calling a second time is an error (stages start exactly once).
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            bail!("selector already started");
        }
        for stage in &self.all_stages {
            stage.start()?;
        }
        self.started = true;
        self.started_at = Some(Instant::now());
        eprintln!("[selector] started {} stages", self.all_stages.len());
        Ok(())
    }

    /// One supervision pass: move data through every stage, tally the
    /// votes, and rebind the program sinks when the hysteresis rule commits
    /// a switch.
    pub fn tick(&mut self) -> Result<()> {
        if !self.started {
            self.start()?;
        }

        for stage in &self.all_stages {
            stage.tick();
        }

        let mut votes: Vec<(f64, Distribution<SourceId>)> = Vec::new();
        for feature in &self.features {
            let Some(data) = feature.read() else { continue };
            let Payload::Vote(vote) = data.payload else {
                bail!("feature {} emitted a non-vote payload", feature.id());
            };
            votes.push((self.feature_weights.get(feature.id()), vote));
        }

        let Some(candidate) = weighted_tally(votes) else {
            return Ok(()); // nobody has voted yet — keep the current binding
        };

        if let Some(elected) = self.state.consider(candidate) {
            let input = self
                .video_input_map
                .get(&elected)
                .ok_or_else(|| anyhow!("elected source {elected} has no input stage"))?
                .clone();
            for sink in &self.main_video_sinks {
                sink.set_inputs(vec![Arc::clone(&input)]);
            }
            let at = self
                .started_at
                .map(|t| t.elapsed().as_secs_f64())
                .unwrap_or(0.0);
            self.cut_log.record(at, elected.clone());
            eprintln!("[selector] program feed → {elected}");
        }
        Ok(())
    }

    /// Drive tick() at `interval` until `halt` flips or a tick fails.
    /// Closes the pipeline on the way out and returns the cut log.
    pub fn run(mut self, interval: Duration, halt: Arc<AtomicBool>) -> Result<CutLog> {
        let failed = std::cell::Cell::new(false);
        let mut failure: Option<anyhow::Error> = None;
        run_periodic(
            interval,
            || halt.load(Ordering::Relaxed) || failed.get(),
            || {
                if let Err(e) = self.tick() {
                    failure = Some(e);
                    failed.set(true);
                }
            },
        );
        self.close();
        match failure {
            Some(e) => Err(e),
            None => Ok(self.cut_log),
        }
    }

    /// Stop every stage, sinks first so nothing downstream reads from a
    /// closed upstream queue.
    pub fn close(&mut self) {
        for stage in self.all_stages.iter().rev() {
            stage.close();
        }
        eprintln!("[selector] closed");
    }
}

/// Combine weighted votes into one tally and pick its argmax.
/// `None` when no feature has voted or the weighted mass is zero.
fn weighted_tally(votes: Vec<(f64, Distribution<SourceId>)>) -> Option<SourceId> {
    let mut tally: Distribution<SourceId> = Distribution::new();
    let mut any = false;
    for (weight, vote) in votes {
        tally = tally + vote * weight;
        any = true;
    }
    if !any || tally.total() <= 0.0 {
        return None;
    }
    tally.argmax().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use livecut_core::frame::{Frame, PipelineData, VideoFrame};
    use parking_lot::Mutex;

    fn cam(n: u32) -> SourceId {
        SourceId::Camera(n)
    }

    fn vote(pairs: &[(u32, f64)]) -> Distribution<SourceId> {
        pairs.iter().map(|&(c, w)| (cam(c), w)).collect()
    }

    // ── weighted_tally ───────────────────────────────────────────────────────

    #[test]
    fn missing_votes_are_skipped_not_zeroed() {
        // A dead feature contributes nothing; the live one decides alone.
        let winner = weighted_tally(vec![(0.6, vote(&[(1, 1.0)]))]);
        assert_eq!(winner, Some(cam(1)));
    }

    #[test]
    fn weights_scale_the_votes() {
        let winner = weighted_tally(vec![
            (0.3, vote(&[(0, 1.0)])),
            (0.7, vote(&[(1, 1.0)])),
        ]);
        assert_eq!(winner, Some(cam(1)));
    }

    #[test]
    fn empty_or_zero_tally_elects_nobody() {
        assert_eq!(weighted_tally(vec![]), None);
        assert_eq!(weighted_tally(vec![(0.5, vote(&[(0, 0.0)]))]), None);
    }

    #[test]
    fn tally_ties_break_by_source_order() {
        let winner = weighted_tally(vec![
            (0.5, vote(&[(2, 1.0)])),
            (0.5, vote(&[(1, 1.0)])),
        ]);
        assert_eq!(winner, Some(cam(1)));
    }

    // ── Stage-level wiring ───────────────────────────────────────────────────

    /// A feature stage whose worker takes votes from a shared script and
    /// reposts the most recent one every poll — the cadence a real feature
    /// has — so tests control exactly what the selector sees.
    fn scripted_feature(
        name: &str,
        script: Arc<Mutex<Vec<Distribution<SourceId>>>>,
    ) -> Arc<Stage> {
        let stage = Stage::with_caps(StageId::feature(name), 0, false, 4, true);
        let id = stage.id().clone();
        stage.set_worker(move |ctx| {
            let mut current: Option<Distribution<SourceId>> = None;
            while !ctx.stopping() {
                {
                    let mut s = script.lock();
                    if !s.is_empty() {
                        current = Some(s.remove(0));
                    }
                }
                if let Some(v) = &current {
                    ctx.output
                        .push_latest(PipelineData::new(id.clone(), Payload::Vote(v.clone())));
                }
                std::thread::sleep(Duration::from_millis(1));
            }
        });
        stage
    }

    fn idle_source(id: SourceId) -> Arc<Stage> {
        let stage = Stage::new(StageId::Source(id.clone()), false, true);
        let sid = StageId::Source(id);
        stage.set_worker(move |ctx| {
            while !ctx.stopping() {
                ctx.output.push_latest(PipelineData::new(
                    sid.clone(),
                    Payload::Media(Frame::Video(VideoFrame::black(2, 2))),
                ));
                std::thread::sleep(Duration::from_millis(1));
            }
        });
        stage
    }

    fn collector_sink() -> Arc<Stage> {
        let stage = Stage::new(StageId::sink("program"), true, true);
        stage.set_worker(|ctx| {
            while !ctx.stopping() {
                let _ = ctx.input.pop_all();
                std::thread::sleep(Duration::from_millis(1));
            }
        });
        stage
    }

    /// Tick the selector until `done` holds (votes cross worker threads, so
    /// tests poll instead of assuming the race resolves in one pass).
    fn tick_until(selector: &mut StreamSelector, mut done: impl FnMut(&StreamSelector) -> bool) {
        for _ in 0..200 {
            selector.tick().unwrap();
            if done(selector) {
                return;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        panic!("selector never reached the expected state");
    }

    #[test]
    fn selector_rebinds_the_program_sink_on_a_switch() {
        let a = idle_source(cam(0));
        let b = idle_source(cam(1));
        let sink = collector_sink();

        let script = Arc::new(Mutex::new(vec![vote(&[(0, 1.0), (1, 0.0)])]));
        let feature = scripted_feature("loudness", Arc::clone(&script));
        feature.set_inputs(vec![Arc::clone(&a), Arc::clone(&b)]);

        let all = vec![
            Arc::clone(&a),
            Arc::clone(&b),
            Arc::clone(&feature),
            Arc::clone(&sink),
        ];
        let mut selector = StreamSelector::new(
            all,
            vec![(Arc::clone(&feature), 1.0)],
            vec![(cam(0), Arc::clone(&a)), (cam(1), Arc::clone(&b))],
            vec![Arc::clone(&sink)],
            0,
            30,
        )
        .unwrap();

        tick_until(&mut selector, |s| s.last_selected() == Some(&cam(0)));
        assert_eq!(sink.input_ids(), vec![StageId::Source(cam(0))]);

        // Camera 1 takes over; thrash_limit 0 commits after one challenge.
        script.lock().push(vote(&[(0, 0.0), (1, 1.0)]));
        tick_until(&mut selector, |s| s.last_selected() == Some(&cam(1)));
        assert_eq!(sink.input_ids(), vec![StageId::Source(cam(1))]);
        assert_eq!(selector.cut_log().events().len(), 2);

        selector.close();
    }

    #[test]
    fn elected_source_missing_from_the_input_map_is_fatal() {
        let a = idle_source(cam(0));
        let sink = collector_sink();
        let script = Arc::new(Mutex::new(vec![vote(&[(9, 1.0)])]));
        let feature = scripted_feature("loudness", Arc::clone(&script));

        let all = vec![Arc::clone(&a), Arc::clone(&feature), Arc::clone(&sink)];
        let mut selector = StreamSelector::new(
            all,
            vec![(Arc::clone(&feature), 1.0)],
            vec![(cam(0), Arc::clone(&a))],
            vec![Arc::clone(&sink)],
            0,
            30,
        )
        .unwrap();

        let mut failure = None;
        for _ in 0..200 {
            match selector.tick() {
                Ok(()) => std::thread::sleep(Duration::from_millis(2)),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        let err = failure.expect("unknown elected source must be fatal");
        assert!(err.to_string().contains("no input stage"), "{err}");
        selector.close();
    }

    #[test]
    fn selector_requires_weighted_features() {
        let a = idle_source(cam(0));
        let result = StreamSelector::new(
            vec![Arc::clone(&a)],
            vec![],
            vec![(cam(0), Arc::clone(&a))],
            vec![],
            0,
            30,
        );
        assert!(result.is_err());
    }
}
