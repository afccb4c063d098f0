// crates/livecut-app/src/pipeline.rs
//
// Config → pipeline wiring: build every stage, connect features to their
// inputs, and hand the whole graph to a StreamSelector. Nothing here starts
// a thread — the selector's first tick does that.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use crossbeam_channel::Sender;

use livecut_core::config::Config;
use livecut_core::frame::{PreviewEvent, SourceId, StageId};
use livecut_media::features::{feature_stage, AudioLevelFeature, VideoMotionFeature};
use livecut_media::selector::StreamSelector;
use livecut_media::sinks::{
    audio_file_sink, audio_playback_sink, preview_sink, tiled_preview_sink, video_file_sink,
};
use livecut_media::sources::{
    file_audio_source, file_video_source, live_audio_source, live_video_source,
};
use livecut_media::stage::Stage;

/// Canonical capture dimensions.
pub const FRAME_DIMS: (u32, u32) = (640, 480);
/// Preview window dimensions.
const PREVIEW_DIMS: (u32, u32) = (640, 480);
/// Production cadence for sources, sinks, and features.
const MEDIA_INTERVAL: Duration = Duration::from_millis(33);
/// The selector's supervision cadence.
pub const SELECTOR_TICK: Duration = Duration::from_millis(10);

/// The preview window name the program (elected) feed renders under.
pub const PROGRAM_WINDOW: &str = "program";
/// The preview window name showing every feed tiled.
pub const TILED_WINDOW: &str = "feeds";

pub struct Pipeline {
    pub selector:  StreamSelector,
    /// Recording paths, present when the config enables each file.
    pub video_out: Option<PathBuf>,
    pub audio_out: Option<PathBuf>,
}

pub fn build(config: &Config, events: Sender<PreviewEvent>) -> Result<Pipeline> {
    let pairs = config.audio_video_pairs();
    let video_ids = config.video_source_ids();

    // ── Input stages ─────────────────────────────────────────────────────────
    let mut video_inputs: Vec<(SourceId, Arc<Stage>)> = Vec::new();
    for id in &video_ids {
        let stage = match id {
            SourceId::Camera(n) => live_video_source(*n, FRAME_DIMS, MEDIA_INTERVAL),
            SourceId::VideoFile(path) => file_video_source(path, FRAME_DIMS),
            other => return Err(anyhow!("{other} is not a video source")),
        };
        video_inputs.push((id.clone(), stage));
    }

    let mut audio_inputs: Vec<(SourceId, Arc<Stage>)> = Vec::new();
    for (audio_id, _) in &pairs {
        let stage = match audio_id {
            SourceId::Microphone(n) => {
                live_audio_source(*n, config.use_f32_audio, MEDIA_INTERVAL)
            }
            SourceId::AudioFile(path) => file_audio_source(path, MEDIA_INTERVAL),
            other => return Err(anyhow!("{other} is not an audio source")),
        };
        audio_inputs.push((audio_id.clone(), stage));
    }

    // Main audio: reuse the feature input stage when the config points at
    // one of them (a device can only be opened once), otherwise open it.
    let main_audio_id = if config.mode.live_mode {
        SourceId::Microphone(config.live.audio_input_device_id)
    } else {
        SourceId::AudioFile(config.files.main_audio_file.clone())
    };
    let mut extra_main_audio = None;
    let main_audio = match audio_inputs.iter().find(|(id, _)| *id == main_audio_id) {
        Some((_, stage)) => Arc::clone(stage),
        None => {
            let stage = match &main_audio_id {
                SourceId::Microphone(n) => {
                    live_audio_source(*n, config.use_f32_audio, MEDIA_INTERVAL)
                }
                SourceId::AudioFile(path) => file_audio_source(path, MEDIA_INTERVAL),
                _ => unreachable!(),
            };
            extra_main_audio = Some(Arc::clone(&stage));
            stage
        }
    };

    // ── Features ─────────────────────────────────────────────────────────────
    let loudness = feature_stage(
        "loudness",
        AudioLevelFeature::new(pairs.clone(), config.window_length),
        audio_inputs.iter().map(|(_, s)| Arc::clone(s)).collect(),
        MEDIA_INTERVAL,
    );
    let motion = feature_stage(
        "motion",
        VideoMotionFeature::new(video_ids.clone(), config.window_length),
        video_inputs.iter().map(|(_, s)| Arc::clone(s)).collect(),
        MEDIA_INTERVAL,
    );

    // ── Sinks ────────────────────────────────────────────────────────────────
    let mut sinks: Vec<Arc<Stage>> = Vec::new();

    let tiled = tiled_preview_sink(
        TILED_WINDOW,
        video_inputs.iter().map(|(id, _)| StageId::Source(id.clone())).collect(),
        PREVIEW_DIMS,
        MEDIA_INTERVAL,
        events.clone(),
    );
    tiled.set_inputs(video_inputs.iter().map(|(_, s)| Arc::clone(s)).collect());
    sinks.push(tiled);

    // The program window and the AVI both follow the vote.
    let mut main_video_sinks: Vec<Arc<Stage>> = Vec::new();

    let program = preview_sink(PROGRAM_WINDOW, PREVIEW_DIMS, MEDIA_INTERVAL, events);
    main_video_sinks.push(Arc::clone(&program));
    sinks.push(program);

    let video_out = if config.output_video.video_file {
        let path = PathBuf::from(&config.output_video.video_filename);
        let recorder = video_file_sink(
            &config.output_video.video_filename,
            config.video_fps,
            FRAME_DIMS,
        );
        main_video_sinks.push(Arc::clone(&recorder));
        sinks.push(recorder);
        Some(path)
    } else {
        None
    };

    // Main-video sinks start on the first feed; the selector rebinds them
    // as soon as the first tally lands.
    if let Some((_, first)) = video_inputs.first() {
        for sink in &main_video_sinks {
            sink.set_inputs(vec![Arc::clone(first)]);
        }
    }

    // Audio sinks bind straight to the main audio channel — never vote-gated.
    let speaker = audio_playback_sink(config.output_audio.audio_output_device_id, MEDIA_INTERVAL);
    speaker.set_inputs(vec![Arc::clone(&main_audio)]);
    sinks.push(speaker);

    let audio_out = if config.output_audio.audio_file {
        let path = PathBuf::from(&config.output_audio.audio_filename);
        let recorder = audio_file_sink(
            &config.output_audio.audio_filename,
            config.sample_rate,
            MEDIA_INTERVAL,
        );
        recorder.set_inputs(vec![Arc::clone(&main_audio)]);
        sinks.push(recorder);
        Some(path)
    } else {
        None
    };

    // ── Assemble, dependency order: sources → features → sinks ───────────────
    let mut all_stages: Vec<Arc<Stage>> = Vec::new();
    all_stages.extend(audio_inputs.iter().map(|(_, s)| Arc::clone(s)));
    all_stages.extend(video_inputs.iter().map(|(_, s)| Arc::clone(s)));
    all_stages.extend(extra_main_audio);
    all_stages.push(Arc::clone(&loudness));
    all_stages.push(Arc::clone(&motion));
    all_stages.extend(sinks.iter().cloned());

    let selector = StreamSelector::new(
        all_stages,
        vec![
            (loudness, config.audio_feature_weight),
            (motion, config.motion_feature_weight),
        ],
        video_inputs,
        main_video_sinks,
        config.thrash_limit,
        config.video_fps,
    )?;

    Ok(Pipeline { selector, video_out, audio_out })
}
