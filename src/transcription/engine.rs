//! # Transcription Engine
//!
//! The boundary the rest of the service talks to: hand it a staged audio file,
//! get transcript text back. Wraps the one Whisper model this process loads at
//! startup, plus the audio decoding in front of it.
//!
//! ## Failure Model:
//! Every failure — unreadable file, unsupported format, model not loaded,
//! model inference error — comes back as an `Err` the caller turns into a
//! user-facing message. The engine never retries.

use crate::audio;
use crate::transcription::model::{ModelSize, WhisperModel};
use anyhow::{anyhow, Result};
use candle_core::Device;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Engine owning the process-wide Whisper model.
///
/// ## Thread Safety:
/// The model sits behind `Arc<RwLock<Option<_>>>`. Decoding mutates model
/// state, so each transcription takes the write lock; concurrent requests
/// queue on it rather than assuming the model itself is thread-safe.
pub struct TranscriptionEngine {
    /// The loaded Whisper model; `None` until startup loading completes
    model: Arc<RwLock<Option<WhisperModel>>>,

    /// Language hint passed to the model (ISO 639-1, e.g. "en")
    language: Option<String>,

    /// Device used for model inference
    device: Device,
}

impl TranscriptionEngine {
    pub fn new(language: Option<String>, device: Device) -> Self {
        Self {
            model: Arc::new(RwLock::new(None)),
            language,
            device,
        }
    }

    /// Load the Whisper model. Called once at startup, before the server
    /// starts accepting requests; the model is never swapped afterwards.
    pub async fn load_model(&self, size: ModelSize) -> Result<()> {
        let start_time = Instant::now();

        let new_model = WhisperModel::load(size, self.device.clone()).await?;

        {
            let mut model_guard = self.model.write().await;
            *model_guard = Some(new_model);
        }

        tracing::info!(
            "Transcription engine ready in {:.2}s",
            start_time.elapsed().as_secs_f64()
        );

        Ok(())
    }

    /// Whether the startup model load has completed.
    pub async fn is_model_loaded(&self) -> bool {
        self.model.read().await.is_some()
    }

    /// Name of the loaded model, if any.
    pub async fn model_name(&self) -> Option<String> {
        let model_guard = self.model.read().await;
        model_guard.as_ref().map(|m| m.size().to_string())
    }

    /// Transcribe a staged audio file to text.
    ///
    /// ## Process:
    /// 1. Decode the file to 16kHz mono f32 PCM
    /// 2. Run the Whisper model over the samples
    /// 3. Return the trimmed transcript text
    pub async fn transcribe_file(&self, path: &Path) -> Result<String> {
        let start_time = Instant::now();

        let samples = audio::load_audio(path)?;
        let audio_duration = samples.len() as f64 / audio::MODEL_SAMPLE_RATE as f64;

        tracing::debug!("Starting transcription of {:.2}s audio", audio_duration);

        let text = {
            let mut model_guard = self.model.write().await;
            match model_guard.as_mut() {
                Some(model) => model.transcribe(&samples, self.language.as_deref()).await?,
                None => return Err(anyhow!("No transcription model loaded")),
            }
        };

        tracing::info!(
            "Transcription completed: {:.2}s audio -> {} chars in {}ms",
            audio_duration,
            text.len(),
            start_time.elapsed().as_millis()
        );

        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};

    fn write_silence_wav(path: &Path) {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for _ in 0..16_000 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[tokio::test]
    async fn test_engine_starts_without_model() {
        let engine = TranscriptionEngine::new(Some("en".to_string()), Device::Cpu);
        assert!(!engine.is_model_loaded().await);
        assert_eq!(engine.model_name().await, None);
    }

    #[tokio::test]
    async fn test_transcribe_without_model_fails() {
        let engine = TranscriptionEngine::new(Some("en".to_string()), Device::Cpu);

        let tmp = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        write_silence_wav(tmp.path());

        let err = engine.transcribe_file(tmp.path()).await.unwrap_err();
        assert!(err.to_string().contains("No transcription model loaded"));
    }

    #[tokio::test]
    async fn test_transcribe_unreadable_file_fails_before_model_check() {
        let engine = TranscriptionEngine::new(None, Device::Cpu);

        let tmp = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        std::fs::write(tmp.path(), b"not audio").unwrap();

        let err = engine.transcribe_file(tmp.path()).await.unwrap_err();
        assert!(err.to_string().contains("WAV"));
    }
}
