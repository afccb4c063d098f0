// crates/livecut-media/src/sources/live_audio.rs
//
// Live microphone capture via cpal. The device callback appends samples to a
// shared buffer; the worker's ticker drains that buffer every `interval`
// into one AudioFrame. A tick that finds no samples emits nothing.

use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;

use livecut_core::frame::{AudioFrame, Frame, Payload, PipelineData, SampleBuf, SourceId, StageId};

use crate::schedule::run_periodic;
use crate::stage::Stage;

/// Build the stage for microphone `device_index` (position in the host's
/// input-device list). `use_f32` picks the wire format of emitted frames.
pub fn live_audio_source(device_index: u32, use_f32: bool, interval: Duration) -> Arc<Stage> {
    let id = SourceId::Microphone(device_index);
    let stage = Stage::new(StageId::Source(id.clone()), false, false);
    let stage_id = StageId::Source(id);

    stage.set_worker(move |ctx| {
        // Everything device-related stays on this thread — cpal streams
        // are not Send.
        let host = cpal::default_host();
        let device = match host.input_devices() {
            Ok(mut devices) => match devices.nth(device_index as usize) {
                Some(d) => d,
                None => {
                    eprintln!("[mic] input device {device_index} not found");
                    ctx.output.close();
                    return;
                }
            },
            Err(e) => {
                eprintln!("[mic] enumerate input devices: {e}");
                ctx.output.close();
                return;
            }
        };

        let config = match device.default_input_config() {
            Ok(c) => c,
            Err(e) => {
                eprintln!("[mic] default config for device {device_index}: {e}");
                ctx.output.close();
                return;
            }
        };
        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;

        // The callback downmixes to mono (channel 0) and accumulates here.
        let buffer: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
        let cb_buffer = Arc::clone(&buffer);
        let err_fn = move |e| eprintln!("[mic] stream error: {e}");

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_input_stream(
                &config.into(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    cb_buffer.lock().extend(data.iter().step_by(channels));
                },
                err_fn,
                None,
            ),
            cpal::SampleFormat::I16 => device.build_input_stream(
                &config.into(),
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    cb_buffer
                        .lock()
                        .extend(data.iter().step_by(channels).map(|&s| s as f32 / i16::MAX as f32));
                },
                err_fn,
                None,
            ),
            other => {
                eprintln!("[mic] unsupported sample format {other:?}");
                ctx.output.close();
                return;
            }
        };

        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[mic] build input stream: {e}");
                ctx.output.close();
                return;
            }
        };
        if let Err(e) = stream.play() {
            eprintln!("[mic] start input stream: {e}");
            ctx.output.close();
            return;
        }
        eprintln!("[mic] device {device_index} capturing at {sample_rate} Hz");

        let mut seq: u64 = 0;
        run_periodic(
            interval,
            || ctx.stopping(),
            || {
                let drained: Vec<f32> = std::mem::take(&mut *buffer.lock());
                if drained.is_empty() {
                    return; // device yielded nothing — skip the tick
                }
                seq += 1;
                let samples = if use_f32 {
                    SampleBuf::F32(drained)
                } else {
                    SampleBuf::I16(
                        drained
                            .iter()
                            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                            .collect(),
                    )
                };
                ctx.output.push(PipelineData::new(
                    stage_id.clone(),
                    Payload::Media(Frame::Audio(AudioFrame { sample_rate, samples, seq })),
                ));
            },
        );
        // Stream (and the device handle) released here on any exit path.
        drop(stream);
        eprintln!("[mic] device {device_index} released");
    });

    stage
}
