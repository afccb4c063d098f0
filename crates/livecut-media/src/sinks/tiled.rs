// crates/livecut-media/src/sinks/tiled.rs
//
// Tiled preview sink: one window showing every feed at once in a
// ⌈√N⌉ × ⌈√N⌉ grid. Remembers the last frame per feed so slow cameras hold
// their tile instead of flickering to black.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;

use livecut_core::frame::{Frame, Payload, PreviewEvent, StageId, VideoFrame};
use livecut_core::helpers::grid::compose_grid;

use crate::schedule::run_periodic;
use crate::stage::Stage;

pub fn tiled_preview_sink(
    name:     &str,
    slots:    Vec<StageId>,
    dims:     (u32, u32),
    interval: Duration,
    events:   Sender<PreviewEvent>,
) -> Arc<Stage> {
    let stage = Stage::new(StageId::sink(name), true, true);
    let window = name.to_string();

    stage.set_worker(move |ctx| {
        let (out_w, out_h) = dims;
        let mut last_seen: HashMap<StageId, VideoFrame> = HashMap::new();

        run_periodic(
            interval,
            || ctx.stopping(),
            || {
                for bundle in ctx.input.pop_all() {
                    for (id, payload) in bundle {
                        if let Some(Payload::Media(Frame::Video(f))) = payload {
                            last_seen.insert(id, f);
                        }
                    }
                }
                let tiles: Vec<Option<&VideoFrame>> =
                    slots.iter().map(|id| last_seen.get(id)).collect();
                let composed = compose_grid(&tiles, out_w, out_h);
                let _ = events.try_send(PreviewEvent::Frame {
                    window: window.clone(),
                    frame:  composed,
                });
            },
        );
    });

    stage
}
