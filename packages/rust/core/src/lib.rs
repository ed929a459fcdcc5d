//! Pipeline orchestration for mdcc.
//!
//! This crate ties formatting, external instructions, output templates, and
//! the output sink into the concurrent per-file pipeline.

pub mod instructions;
pub mod pipeline;
pub mod sink;
pub mod template;

pub use instructions::{CommandRunner, InstructionRunner, apply_all};
pub use pipeline::{FileFailure, FileGroup, Pipeline, PipelineReport, parallelism};
pub use sink::{OutputSink, RecordingSink, SilentSink};
