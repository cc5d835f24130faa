//! # Speech Analysis Module
//!
//! Turns raw transcripts into the lexical analysis this service exists for:
//! a word count plus counts of speech fillers ("um", "like", "basically", ...)
//! drawn from a fixed pattern list.
//!
//! ## Key Components:
//! - **Filler matchers**: Compiled-once regular expressions, one per filler class
//! - **analyze()**: Pure function from transcript text to an `AnalysisResult`
//!
//! ## Design:
//! The analyzer holds no state and touches no locks, so any number of requests
//! can run it concurrently. The matcher list is process-wide immutable
//! configuration, fixed at build time.

pub mod filler;

pub use filler::{analyze, AnalysisResult};
