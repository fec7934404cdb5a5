//! # Krigeo Parallel
//!
//! Dispatch strategies for independent estimation targets.
//!
//! This crate provides:
//! - `ProcessingMode`: sequential, global rayon pool, or fixed-size pool
//! - `map_chunks`: order-preserving chunked map with worker-local state
//! - `CancelToken`: stops dispatch of further chunks

pub mod cancel;
pub mod strategy;

pub use cancel::CancelToken;
pub use strategy::{available_threads, map_chunks, ChunkedOutput, ProcessingMode};
