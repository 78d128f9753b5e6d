//! Core pipeline orchestration for the article enhancer.
//!
//! This crate ties the store, search, extraction, and generation crates
//! together into end-to-end workflows: [`Pipeline::run`] derives one
//! enhanced article, [`ingest_url`] adds a new original, and
//! [`ingest_listing`] adds the posts linked from a blog listing page.

pub mod ingest;
pub mod pipeline;
pub mod references;

pub use ingest::{ingest_listing, ingest_url};
pub use pipeline::{
    Pipeline, PipelineSettings, ProgressReporter, RunOutcome, SilentProgress, Stage,
};
pub use references::ReferenceCollector;
