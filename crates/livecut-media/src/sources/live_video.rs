// crates/livecut-media/src/sources/live_video.rs
//
// Live camera capture via nokhwa. One frame per tick, area-resampled to the
// canonical dimensions when the camera disagrees, pushed with drop-oldest
// semantics — a stalled consumer sees fresh frames, not a growing backlog.

use std::sync::Arc;
use std::time::Duration;

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

use livecut_core::frame::{Frame, Payload, PipelineData, SourceId, StageId, VideoFrame};
use livecut_core::helpers::resample::resample_area;

use crate::schedule::run_periodic;
use crate::stage::Stage;

use super::VIDEO_BACKLOG;

/// Consecutive read failures before the worker gives up on the camera.
const MAX_CONSECUTIVE_ERRORS: u32 = 30;

pub fn live_video_source(
    device_index: u32,
    target_dims:  (u32, u32),
    interval:     Duration,
) -> Arc<Stage> {
    let id = SourceId::Camera(device_index);
    let stage = Stage::with_caps(StageId::Source(id.clone()), 1, true, VIDEO_BACKLOG, true);
    let stage_id = StageId::Source(id);

    stage.set_worker(move |ctx| {
        let format =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = match Camera::new(CameraIndex::Index(device_index), format) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("[camera] open device {device_index}: {e}");
                ctx.output.close();
                return;
            }
        };
        if let Err(e) = camera.open_stream() {
            eprintln!("[camera] start stream {device_index}: {e}");
            ctx.output.close();
            return;
        }
        eprintln!("[camera] device {device_index} streaming");

        let (out_w, out_h) = target_dims;
        let mut seq: u64 = 0;
        let errors = std::cell::Cell::new(0u32);

        run_periodic(
            interval,
            || ctx.stopping() || errors.get() >= MAX_CONSECUTIVE_ERRORS,
            || {
                let decoded = camera
                    .frame()
                    .and_then(|raw| raw.decode_image::<RgbFormat>());
                let image = match decoded {
                    Ok(img) => {
                        errors.set(0);
                        img
                    }
                    Err(e) => {
                        // Transient: skip the tick. Persistent: the halt
                        // predicate above ends the worker — stream closed.
                        errors.set(errors.get() + 1);
                        if errors.get() == 1 || errors.get() == MAX_CONSECUTIVE_ERRORS {
                            eprintln!("[camera] device {device_index} read: {e}");
                        }
                        return;
                    }
                };

                seq += 1;
                let frame = VideoFrame {
                    width:  image.width(),
                    height: image.height(),
                    data:   image.into_raw(),
                    seq,
                };
                let frame = if frame.width == out_w && frame.height == out_h {
                    frame
                } else {
                    resample_area(&frame, out_w, out_h)
                };
                ctx.output
                    .push_latest(PipelineData::new(stage_id.clone(), Payload::Media(Frame::Video(frame))));
            },
        );

        if let Err(e) = camera.stop_stream() {
            eprintln!("[camera] stop stream {device_index}: {e}");
        }
        eprintln!("[camera] device {device_index} released");
    });

    stage
}
