// crates/livecut-media/src/sinks/mod.rs
//
// Output stages. Like sources, constructors register the worker and return
// the stage un-started; the selector launches everything on its first tick.
//
// Drop discipline: previews shed frames freely (fresh beats complete), file
// sinks never drop (their input queues are unbounded and their workers drain
// everything), and the video file fills realtime gaps by repeating its last
// frame.

pub mod audio_file;
pub mod audio_playback;
pub mod preview;
pub mod tiled;
pub mod video_file;

pub use audio_file::audio_file_sink;
pub use audio_playback::audio_playback_sink;
pub use preview::preview_sink;
pub use tiled::tiled_preview_sink;
pub use video_file::video_file_sink;
