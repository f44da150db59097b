//! trainhub-core — data model, validation and client-side engines.
//!
//! This crate defines the training data model, the `TrainingApi` seam and
//! the logic that runs on the learner's side of it: assessment taking,
//! scoring, progress tracking and certificate verification.

pub mod capability;
pub mod certificate;
pub mod engine;
pub mod error;
pub mod model;
pub mod progress;
pub mod scoring;
pub mod traits;
pub mod validate;

pub use error::{ApiError, ValidationError};
pub use traits::TrainingApi;
