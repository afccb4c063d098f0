// crates/livecut-media/src/sources/file_audio.rs
//
// WAV file source. The wall clock decides how much audio is due: every tick
// reads exactly `floor(elapsed / interval) - chunks_done` fixed-size chunks,
// so a slow tick is followed by catch-up reads (bounded) instead of drift.
// EOF is terminal — the worker exits and downstream reads None forever.

use std::sync::Arc;
use std::time::{Duration, Instant};

use hound::{SampleFormat, WavReader};

use livecut_core::frame::{AudioFrame, Frame, Payload, PipelineData, SampleBuf, SourceId, StageId};

use crate::schedule::run_periodic;
use crate::stage::Stage;

use super::CATCH_UP_MAX;

pub fn file_audio_source(path: &str, interval: Duration) -> Arc<Stage> {
    let id = SourceId::AudioFile(path.to_string());
    let stage = Stage::new(StageId::Source(id.clone()), false, false);
    let stage_id = StageId::Source(id);
    let path = path.to_string();

    stage.set_worker(move |ctx| {
        let mut reader = match WavReader::open(&path) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("[wav] open {path}: {e}");
                ctx.output.close();
                return;
            }
        };
        let spec = reader.spec();
        let channels = spec.channels as usize;
        let chunk_samples = (interval.as_secs_f64() * spec.sample_rate as f64) as usize;
        if chunk_samples == 0 {
            eprintln!("[wav] interval too short for {path} at {} Hz", spec.sample_rate);
            ctx.output.close();
            return;
        }
        eprintln!(
            "[wav] reading {path} ({} Hz, {} ch, {:?})",
            spec.sample_rate, spec.channels, spec.sample_format,
        );

        let started = Instant::now();
        let mut chunks_done: u64 = 0;
        let mut seq: u64 = 0;
        let eof = std::cell::Cell::new(false);

        run_periodic(
            interval,
            || ctx.stopping() || eof.get(),
            || {
                let due = (started.elapsed().as_secs_f64() / interval.as_secs_f64()) as u64;
                let chunks_to_go = due.saturating_sub(chunks_done).min(CATCH_UP_MAX);

                for _ in 0..chunks_to_go {
                    // Mono wire format: keep channel 0, drop the rest.
                    let samples = match spec.sample_format {
                        SampleFormat::Int => {
                            let chunk: Vec<i16> = reader
                                .samples::<i16>()
                                .take(chunk_samples * channels)
                                .filter_map(|s| s.ok())
                                .step_by(channels)
                                .collect();
                            if chunk.len() < chunk_samples {
                                eof.set(true);
                            }
                            SampleBuf::I16(chunk)
                        }
                        SampleFormat::Float => {
                            let chunk: Vec<f32> = reader
                                .samples::<f32>()
                                .take(chunk_samples * channels)
                                .filter_map(|s| s.ok())
                                .step_by(channels)
                                .collect();
                            if chunk.len() < chunk_samples {
                                eof.set(true);
                            }
                            SampleBuf::F32(chunk)
                        }
                    };
                    chunks_done += 1;

                    if !samples.is_empty() {
                        seq += 1;
                        ctx.output.push(PipelineData::new(
                            stage_id.clone(),
                            Payload::Media(Frame::Audio(AudioFrame {
                                sample_rate: spec.sample_rate,
                                samples,
                                seq,
                            })),
                        ));
                    }
                    if eof.get() {
                        eprintln!("[wav] {path} exhausted after {chunks_done} chunks");
                        break;
                    }
                }
            },
        );
    });

    stage
}
