//! Core pipeline orchestration for Prospector.
//!
//! This crate ties the provider collaborators together into an enrichment
//! run (`run_pipeline`) and owns the retry policy applied to every call.

pub mod pipeline;
pub mod retry;

pub use pipeline::{
    CandidateState, Collaborators, PipelineOptions, PipelineOutcome, PipelineProgress,
    RunSummary, SilentProgress, SkipReason, run_pipeline, select_best_contact,
};
pub use retry::RetryPolicy;
