//! Video Engine Module
//!
//! Core frame path including:
//! - Frame buffers and pixel formats
//! - Frame sampling policies
//! - Stream lifecycle state machine
//! - The frame pipeline tying sampling, inference and overlay together

pub mod frame;
pub mod pipeline;
pub mod sampler;
pub mod transport;

pub use frame::{Frame, PixelFormat, BYTES_PER_PIXEL};
pub use pipeline::{FramePipeline, PipelineBuilder, PipelineStats};
pub use sampler::{FrameSampler, SamplingPolicy, DEFAULT_STRIDE};
pub use transport::{StreamEvent, StreamLifecycle, StreamState};
