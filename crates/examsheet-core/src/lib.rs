//! examsheet-core — Grading engine, submission protocol, and item analysis.
//!
//! This crate defines the fundamental data model, the exam-scoring state
//! machine, and the analytics aggregation that the rest of the examsheet
//! system builds on. Talking to the Response Store is behind the
//! [`traits::ResponseStore`] seam; nothing here does I/O of its own.

pub mod analysis;
pub mod error;
pub mod grading;
pub mod model;
pub mod session;
pub mod traits;
