// crates/livecut-media/src/sinks/audio_playback.rs
//
// Live audio monitor via cpal. The worker appends every received sample to a
// shared deque in arrival order; the device callback drains it and pads with
// silence on underrun. Audio is never dropped here — a backlog plays late
// rather than leaving gaps.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;

use livecut_core::frame::{Frame, Payload, SampleBuf, StageId};

use crate::schedule::run_periodic;
use crate::stage::Stage;

pub fn audio_playback_sink(device_index: u32, interval: Duration) -> Arc<Stage> {
    let stage = Stage::new(StageId::sink(format!("speaker:{device_index}")), false, true);

    stage.set_worker(move |ctx| {
        let host = cpal::default_host();
        let device = match host.output_devices() {
            Ok(mut devices) => match devices.nth(device_index as usize) {
                Some(d) => d,
                None => {
                    eprintln!("[speaker] output device {device_index} not found");
                    return;
                }
            },
            Err(e) => {
                eprintln!("[speaker] enumerate output devices: {e}");
                return;
            }
        };
        let config = match device.default_output_config() {
            Ok(c) => c,
            Err(e) => {
                eprintln!("[speaker] default config: {e}");
                return;
            }
        };
        let channels = config.channels() as usize;

        let pending: Arc<Mutex<VecDeque<f32>>> = Arc::new(Mutex::new(VecDeque::new()));
        let cb_pending = Arc::clone(&pending);
        let err_fn = move |e| eprintln!("[speaker] stream error: {e}");

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &config.into(),
                move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut queue = cb_pending.lock();
                    for frame in out.chunks_mut(channels) {
                        let s = queue.pop_front().unwrap_or(0.0);
                        frame.fill(s); // mono duplicated to every channel
                    }
                },
                err_fn,
                None,
            ),
            cpal::SampleFormat::I16 => device.build_output_stream(
                &config.into(),
                move |out: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    let mut queue = cb_pending.lock();
                    for frame in out.chunks_mut(channels) {
                        let s = queue.pop_front().unwrap_or(0.0);
                        frame.fill((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16);
                    }
                },
                err_fn,
                None,
            ),
            other => {
                eprintln!("[speaker] unsupported sample format {other:?}");
                return;
            }
        };
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[speaker] build output stream: {e}");
                return;
            }
        };
        if let Err(e) = stream.play() {
            eprintln!("[speaker] start output stream: {e}");
            return;
        }
        eprintln!("[speaker] device {device_index} playing");

        run_periodic(
            interval,
            || ctx.stopping(),
            || {
                for bundle in ctx.input.pop_all() {
                    for (_, payload) in bundle {
                        let Some(Payload::Media(Frame::Audio(frame))) = payload else {
                            continue;
                        };
                        let mut queue = pending.lock();
                        match &frame.samples {
                            SampleBuf::F32(v) => queue.extend(v.iter().copied()),
                            SampleBuf::I16(v) => {
                                queue.extend(v.iter().map(|&s| s as f32 / i16::MAX as f32));
                            }
                        }
                    }
                }
            },
        );
        drop(stream);
        eprintln!("[speaker] device {device_index} released");
    });

    stage
}
