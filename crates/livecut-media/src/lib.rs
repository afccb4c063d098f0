// crates/livecut-media/src/lib.rs

pub mod decode;
pub mod devices;
pub mod encode;
pub mod features;
pub mod mux;
pub mod queue;
pub mod schedule;
pub mod selector;
pub mod sinks;
pub mod sources;
pub mod stage;

pub use queue::Queue;
pub use selector::StreamSelector;
pub use stage::{Stage, StageInput, WorkerCtx};
