//! Test utilities for manimator-core tests.
//!
//! Hand-written collaborators for the pipeline: no network, no subprocesses.

pub mod mock_collaborators;

#[allow(unused_imports)]
pub use mock_collaborators::{
    FixResponse, MockGenerator, MockRenderer, MockSynthesizer, RecordingProgress, RenderResponse,
};
