//! The per-reading stages: stamp, smooth, gate, buffer.

pub mod buffer;
pub mod clock;
pub mod config;
pub mod filter;
pub mod gate;

pub use buffer::BatchBuffer;
pub use clock::{ManualClock, SampleClock, Stamp, SystemClock, WallClock};
pub use config::{PipelineConfig, ResolvedPipeline, SequencePolicy};
pub use filter::SmoothingFilter;
pub use gate::MotionGate;
