//! mediashift is a media transformation engine for images, audio, and video.
//!
//! It keeps a set of linked transformation parameters consistent while a user edits them,
//! estimates the size of the resulting artifact, and turns the final parameters into an
//! executable job that runs on one of two backends.
//!
//! # Pipeline overview
//!
//! 1. **Load**: `bytes + declared MIME -> ParameterSet` (classify, probe, initialize)
//! 2. **Edit**: `ParameterSet + ParamChange -> ParameterSet` through [`apply`], one canonical
//!    recomputation path for width/height/size%/resolution% and the trim range
//! 3. **Estimate**: `ParameterSet -> bytes` through the multiplicative cost model
//! 4. **Compile**: `ParameterSet -> TransformJob` (frozen, ordered operation list)
//! 5. **Execute**: `TransformJob -> Artifact` on the batch backend (one external encoder call,
//!    ffmpeg or the in-process image codec) or the streaming backend (tick-driven render loop
//!    feeding an incremental encoder)
//!
//! Audio/video work shells out to the system `ffmpeg`/`ffprobe` binaries.
#![forbid(unsafe_code)]

mod compile;
mod config;
mod encode;
mod engine;
mod estimate;
mod foundation;
mod metadata;
mod params;
mod probe;
mod stream;

pub use compile::compiler::compile;
pub use compile::job::{Backend, EncoderScale, Operation, TransformJob};
pub use config::EngineConfig;
pub use encode::batch::BatchExecutor;
pub use encode::ffmpeg::{
    FfmpegEncoder, INPUT_NAME, ensure_parent_dir, ffmpeg_args, is_ffmpeg_on_path,
    is_tool_available,
};
pub use encode::image_codec::ImageCodec;
pub use encode::{Artifact, Executor, ExternalEncoder};
pub use engine::Engine;
pub use estimate::cost::estimate_size;
pub use foundation::error::{EncodeError, EncodeStage, EngineError, EngineResult};
pub use foundation::format::{compression_ratio, format_bytes};
pub use metadata::{MetadataDocument, parse_metadata_entries};
pub use params::kind::{MediaKind, MetadataPolicy, OutputFormat, mime_from_extension};
pub use params::set::{
    ASSUMED_SOURCE_FRAME_RATE, BASELINE_QUALITY, MAX_FRAME_RATE, ParameterSet, SourceRef,
    SourceStats,
};
pub use params::solver::{ParamChange, apply, apply_all};
pub use probe::ffprobe::FfprobeProbe;
pub use probe::image::ImageProbe;
pub use probe::{MediaProbe, SourceProbe};
pub use stream::executor::{StreamState, StreamingExecutor};
pub use stream::ffmpeg::{FfmpegFrameSource, FfmpegIncrementalEncoder};
pub use stream::host::{RealtimeExecutor, drive};
pub use stream::surface::CpuSurface;
pub use stream::{
    CaptureStream, Clock, EncoderEvent, EncoderSettings, Frame, IncrementalEncoder, MediaSource,
    Pacing, RenderSurface, SourcePoll, WallClock,
};
