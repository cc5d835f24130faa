//! # Transcription Module
//!
//! Speech-to-text via Whisper models running on the Candle framework —
//! pure Rust, no FFI bindings to whisper.cpp.
//!
//! ## Key Components:
//! - **Model Management**: Downloading and loading one Whisper model at startup
//! - **Transcription Engine**: Turning a staged audio file into transcript text
//!
//! The model is loaded exactly once when the service starts and is never
//! swapped afterwards. Everything downstream treats the engine as a black box:
//! give it an audio file path, get text back or a distinguishable failure.

pub mod engine;
pub mod model;

pub use engine::TranscriptionEngine;
pub use model::ModelSize;
