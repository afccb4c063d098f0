// crates/livecut-media/src/sinks/audio_file.rs
//
// WAV recording sink: 16-bit little-endian PCM, mono. Every received frame
// is written in arrival order; the input queue is unbounded and the worker
// drains it to the last sample before finalizing, so the sample count on
// disk equals the sample count received.

use std::sync::Arc;
use std::time::Duration;

use hound::{SampleFormat, WavSpec, WavWriter};

use livecut_core::frame::{Frame, Payload, StageId};

use crate::schedule::run_periodic;
use crate::stage::Stage;

pub fn audio_file_sink(path: &str, sample_rate: u32, interval: Duration) -> Arc<Stage> {
    let stage = Stage::new(StageId::sink(format!("record:{path}")), false, false);
    let path = path.to_string();

    stage.set_worker(move |ctx| {
        let spec = WavSpec {
            channels:        1,
            sample_rate,
            bits_per_sample: 16,
            sample_format:   SampleFormat::Int,
        };
        let mut writer = match WavWriter::create(&path, spec) {
            Ok(w) => w,
            Err(e) => {
                eprintln!("[wav] create {path}: {e}");
                return;
            }
        };
        eprintln!("[wav] recording {sample_rate} Hz mono → {path}");

        let mut written: u64 = 0;
        let mut write_pending = |writer: &mut WavWriter<_>, ctx: &crate::stage::WorkerCtx| {
            for bundle in ctx.input.pop_all() {
                for (_, payload) in bundle {
                    let Some(Payload::Media(Frame::Audio(frame))) = payload else { continue };
                    for s in frame.samples.to_i16() {
                        if let Err(e) = writer.write_sample(s) {
                            eprintln!("[wav] write: {e}");
                            return;
                        }
                        written += 1;
                    }
                }
            }
        };

        run_periodic(
            interval,
            || ctx.stopping(),
            || write_pending(&mut writer, &ctx),
        );
        // Final drain — anything queued between the last tick and close().
        write_pending(&mut writer, &ctx);

        match writer.finalize() {
            Ok(()) => eprintln!("[wav] {written} samples finalized → {path}"),
            Err(e) => eprintln!("[wav] finalize {path}: {e}"),
        }
    });

    stage
}

#[cfg(test)]
mod tests {
    use super::*;
    use livecut_core::frame::{AudioFrame, SampleBuf, SourceId, StageId};

    #[test]
    fn every_received_sample_lands_on_disk_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.wav");
        let path_str = path.to_string_lossy().to_string();

        let sink = audio_file_sink(&path_str, 16_000, Duration::from_millis(1));
        let input = sink.input_queue_for_tests();
        sink.start().unwrap();

        let src = StageId::Source(SourceId::Microphone(0));
        let mut expected = Vec::new();
        for chunk in 0..20i16 {
            let samples: Vec<i16> = (0..160).map(|i| chunk * 160 + i).collect();
            expected.extend_from_slice(&samples);
            let bundle = vec![(
                src.clone(),
                Some(Payload::Media(Frame::Audio(AudioFrame {
                    sample_rate: 16_000,
                    samples: SampleBuf::I16(samples),
                    seq: chunk as u64 + 1,
                }))),
            )];
            assert!(input.push(bundle), "file sink input must never drop");
        }

        std::thread::sleep(Duration::from_millis(100));
        sink.close();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let on_disk: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(on_disk, expected);
    }

    #[test]
    fn f32_frames_are_converted_to_pcm16() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f32.wav");
        let path_str = path.to_string_lossy().to_string();

        let sink = audio_file_sink(&path_str, 16_000, Duration::from_millis(1));
        let input = sink.input_queue_for_tests();
        sink.start().unwrap();

        let src = StageId::Source(SourceId::Microphone(0));
        let bundle = vec![(
            src,
            Some(Payload::Media(Frame::Audio(AudioFrame {
                sample_rate: 16_000,
                samples: SampleBuf::F32(vec![0.0, 1.0, -1.0]),
                seq: 1,
            }))),
        )];
        input.push(bundle);

        std::thread::sleep(Duration::from_millis(50));
        sink.close();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let on_disk: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(on_disk, vec![0, i16::MAX, -i16::MAX]);
    }
}
