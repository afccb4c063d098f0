// crates/livecut-media/src/sources/file_video.rs
//
// Video file source. The file's declared frame rate is the authoritative
// clock: each tick emits `floor(elapsed × fps) - frames_emitted` frames
// (catch-up bounded), never more than one emit per underlying file frame.
// EOF is terminal.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use livecut_core::frame::{Frame, Payload, PipelineData, SourceId, StageId};

use crate::decode::FileVideoReader;
use crate::schedule::run_periodic;
use crate::stage::Stage;

use super::{CATCH_UP_MAX, VIDEO_BACKLOG};

pub fn file_video_source(path: &str, target_dims: (u32, u32)) -> Arc<Stage> {
    let id = SourceId::VideoFile(path.to_string());
    let stage = Stage::with_caps(StageId::Source(id.clone()), 1, true, VIDEO_BACKLOG, true);
    let stage_id = StageId::Source(id);
    let path = path.to_string();

    stage.set_worker(move |ctx| {
        let (out_w, out_h) = target_dims;
        let mut reader = match FileVideoReader::open(Path::new(&path), out_w, out_h) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("[vfile] {e:#}");
                ctx.output.close();
                return;
            }
        };
        let fps = reader.frame_rate();
        let interval = Duration::from_secs_f64(1.0 / fps);

        let started = Instant::now();
        let mut emitted: u64 = 0;
        let eof = std::cell::Cell::new(false);

        run_periodic(
            interval,
            || ctx.stopping() || eof.get(),
            || {
                let due = (started.elapsed().as_secs_f64() * fps) as u64;
                let frames_to_go = due.saturating_sub(emitted).min(CATCH_UP_MAX);

                for _ in 0..frames_to_go {
                    match reader.next_frame() {
                        Some(frame) => {
                            emitted += 1;
                            ctx.output.push_latest(PipelineData::new(
                                stage_id.clone(),
                                Payload::Media(Frame::Video(frame)),
                            ));
                        }
                        None => {
                            eprintln!("[vfile] {path} exhausted after {emitted} frames");
                            eof.set(true);
                            break;
                        }
                    }
                }
            },
        );
    });

    stage
}
