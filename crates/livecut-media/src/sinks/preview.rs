// crates/livecut-media/src/sinks/preview.rs
//
// Preview sink: latest frame per tick, resampled to the window size and
// forwarded to the UI channel. The UI keeps showing its previous texture
// when no event arrives, so a dead upstream freezes on its last frame
// without any extra bookkeeping here.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;

use livecut_core::frame::{Frame, Payload, PreviewEvent, StageId};
use livecut_core::helpers::resample::resample_area;

use crate::schedule::run_periodic;
use crate::stage::Stage;

pub fn preview_sink(
    name:     &str,
    dims:     (u32, u32),
    interval: Duration,
    events:   Sender<PreviewEvent>,
) -> Arc<Stage> {
    let stage = Stage::new(StageId::sink(name), true, true);
    let window = name.to_string();

    stage.set_worker(move |ctx| {
        let (out_w, out_h) = dims;
        run_periodic(
            interval,
            || ctx.stopping(),
            || {
                // Keep only the freshest frame out of everything queued.
                let mut newest = None;
                for bundle in ctx.input.pop_all() {
                    for (_, payload) in bundle {
                        if let Some(Payload::Media(Frame::Video(f))) = payload {
                            newest = Some(f);
                        }
                    }
                }
                if let Some(frame) = newest {
                    let frame = resample_area(&frame, out_w, out_h);
                    // A full UI channel means the UI is behind — drop rather
                    // than stall the pipeline.
                    let _ = events.try_send(PreviewEvent::Frame {
                        window: window.clone(),
                        frame,
                    });
                }
            },
        );
    });

    stage
}

#[cfg(test)]
mod tests {
    use super::*;
    use livecut_core::frame::{SourceId, VideoFrame};

    #[test]
    fn forwards_the_latest_frame_resampled() {
        let (tx, rx) = crossbeam_channel::bounded(8);
        let sink = preview_sink("preview:cam0", (4, 4), Duration::from_millis(1), tx);

        // Queue two frames before the worker runs; the newer (brighter) one
        // must be the one that reaches the window.
        let src_id = StageId::Source(SourceId::Camera(0));
        let mut old = VideoFrame::black(8, 8);
        old.data.fill(10);
        let mut new = VideoFrame::black(8, 8);
        new.data.fill(200);

        let input = sink.input_queue_for_tests();
        for f in [old, new] {
            let bundle = vec![(src_id.clone(), Some(Payload::Media(Frame::Video(f))))];
            input.push_latest(bundle);
        }
        sink.start().unwrap();

        let event = rx.recv_timeout(Duration::from_millis(500)).expect("preview event");
        let PreviewEvent::Frame { window, frame } = event;
        assert_eq!(window, "preview:cam0");
        assert_eq!((frame.width, frame.height), (4, 4));
        assert!(frame.data.iter().all(|&b| b == 200));

        sink.close();
    }
}
