// crates/livecut-core/src/lib.rs

pub mod config;
pub mod distribution;
pub mod edl;
pub mod frame;
pub mod helpers;
pub mod state;

pub use config::Config;
pub use distribution::{Distribution, DistributionError};
pub use edl::CutLog;
pub use frame::{
    AudioFrame, Frame, Payload, PipelineData, PreviewEvent, SampleBuf, SourceId, StageId,
    VideoFrame,
};
pub use state::SelectorState;
