//! # Audio Decoding Module
//!
//! Converts uploaded audio files into the sample format the Whisper model
//! expects: 32-bit float PCM, mono, 16kHz.
//!
//! ## Pipeline:
//! - **WAV reading**: 16/32-bit integer and float WAV files via `hound`
//! - **Channel folding**: Interleaved multi-channel audio averaged to mono
//! - **Resampling**: Linear interpolation down/up to the 16kHz model rate
//!
//! Anything that is not a readable WAV file fails here, and that failure is
//! surfaced to the client as a transcription failure.

pub mod decoder;

pub use decoder::load_audio;

/// Sample rate expected by the Whisper model.
pub const MODEL_SAMPLE_RATE: u32 = 16_000;
