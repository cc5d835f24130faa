//! # Whisper Model Management
//!
//! Loads Whisper models with Candle and runs the encode/decode loop that
//! turns PCM audio into text.
//!
//! ## Model Loading Process:
//! 1. Download model files from HuggingFace if not cached locally
//! 2. Load model weights (safetensors) and tokenizer
//! 3. Initialize the model on the selected device (CPU/GPU)
//! 4. Validate the model with a short silence input

use anyhow::{anyhow, Result};
use candle_core::{Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::whisper::{self as m, Config};
use tokenizers::Tokenizer;

/// Available Whisper model sizes.
///
/// Larger models transcribe more accurately but load and run slower; `Base`
/// is the deployment default for this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

impl ModelSize {
    /// HuggingFace repository holding this model's weights.
    pub fn repo_name(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "openai/whisper-tiny",
            ModelSize::Base => "openai/whisper-base",
            ModelSize::Small => "openai/whisper-small",
            ModelSize::Medium => "openai/whisper-medium",
            ModelSize::Large => "openai/whisper-large-v2",
        }
    }

    /// Approximate download size in MB, for startup logging.
    pub fn size_mb(&self) -> u32 {
        match self {
            ModelSize::Tiny => 39,
            ModelSize::Base => 74,
            ModelSize::Small => 244,
            ModelSize::Medium => 769,
            ModelSize::Large => 1550,
        }
    }
}

impl std::str::FromStr for ModelSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tiny" => Ok(ModelSize::Tiny),
            "base" => Ok(ModelSize::Base),
            "small" => Ok(ModelSize::Small),
            "medium" => Ok(ModelSize::Medium),
            "large" => Ok(ModelSize::Large),
            _ => Err(anyhow!("Unknown model size: {}", s)),
        }
    }
}

impl std::fmt::Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        };
        write!(f, "{}", name)
    }
}

/// A loaded Whisper model ready for transcription.
pub struct WhisperModel {
    /// The actual Candle model
    model: m::model::Whisper,

    /// Model configuration
    config: Config,

    /// Device where the model lives (CPU/GPU)
    device: Device,

    /// Which size was loaded
    size: ModelSize,

    /// Tokenizer for decoding output tokens
    tokenizer: Tokenizer,
}

impl WhisperModel {
    /// Download (if needed) and load a Whisper model from HuggingFace.
    ///
    /// ## Returns:
    /// - **Ok(WhisperModel)**: Model loaded and validated
    /// - **Err(anyhow::Error)**: Download, parse, or weight-loading failure
    pub async fn load(size: ModelSize, device: Device) -> Result<Self> {
        tracing::info!("Loading Whisper {} model (~{} MB)...", size, size.size_mb());
        let start_time = std::time::Instant::now();

        let api = {
            use hf_hub::api::tokio::ApiBuilder;

            let mut builder = ApiBuilder::new().with_progress(false);
            if let Ok(token) = std::env::var("HF_TOKEN") {
                builder = builder.with_token(Some(token));
            } else {
                builder = builder.with_token(None);
            }
            builder
                .build()
                .map_err(|e| anyhow!("Failed to create HuggingFace API client: {}", e))?
        };

        let repo = api.model(size.repo_name().to_string());

        let config_filename = repo
            .get("config.json")
            .await
            .map_err(|e| anyhow!("Failed to download config.json from {}: {}", size.repo_name(), e))?;
        let tokenizer_filename = repo
            .get("tokenizer.json")
            .await
            .map_err(|e| anyhow!("Failed to download tokenizer.json from {}: {}", size.repo_name(), e))?;
        let model_filename = repo
            .get("model.safetensors")
            .await
            .map_err(|e| anyhow!("Failed to download model weights from {}: {}", size.repo_name(), e))?;

        let config: Config = serde_json::from_reader(std::fs::File::open(config_filename)?)?;
        let tokenizer = Tokenizer::from_file(tokenizer_filename)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[model_filename], m::DTYPE, &device)? };
        let model = m::model::Whisper::load(&vb, config.clone())?;

        let load_time = start_time.elapsed();
        tracing::info!("Whisper {} model loaded in {:.2}s", size, load_time.as_secs_f64());

        let mut whisper_model = Self {
            model,
            config,
            device,
            size,
            tokenizer,
        };

        whisper_model.validate().await?;

        Ok(whisper_model)
    }

    /// Which model size is loaded.
    pub fn size(&self) -> ModelSize {
        self.size
    }

    /// Transcribe PCM audio to text.
    ///
    /// ## Audio Requirements:
    /// - 16kHz sample rate, mono, 32-bit floats in [-1.0, 1.0]
    /// - Input longer than 30 seconds is truncated to the model window
    pub async fn transcribe(&mut self, audio_data: &[f32], language: Option<&str>) -> Result<String> {
        let start_time = std::time::Instant::now();

        if audio_data.is_empty() {
            return Err(anyhow!("Audio data is empty"));
        }

        if audio_data.len() > 30 * 16000 {
            tracing::warn!(
                "Audio is {:.1}s long; only the first 30s will be transcribed",
                audio_data.len() as f64 / 16000.0
            );
        }

        let mel = self.pcm_to_mel(audio_data)?;
        let mel = mel.unsqueeze(0)?; // batch dimension

        let encoder_output = self.model.encoder.forward(&mel, false)?;

        // Prompt: SOT, optional language, transcribe task
        let mut tokens = vec![self.sot_token()];
        if let Some(lang) = language {
            if let Some(lang_token) = self.language_token(lang) {
                tokens.push(lang_token);
            }
        }
        tokens.push(self.transcribe_token());

        // Greedy decode with a repetition guard
        const MAX_TOKENS: usize = 200;
        let mut output_tokens = Vec::new();

        for _ in 0..MAX_TOKENS {
            let token_tensor = Tensor::new(&tokens[..], &self.device)?.unsqueeze(0)?;
            let logits = self.model.decoder.forward(&token_tensor, &encoder_output, false)?;
            let last_logits = logits.i((.., tokens.len() - 1, ..))?;
            let next_token = last_logits.argmax_keepdim(1)?.to_scalar::<u32>()?;

            if next_token == self.eot_token() {
                break;
            }

            if is_repetitive(&output_tokens, next_token) {
                break;
            }

            tokens.push(next_token);
            output_tokens.push(next_token);
        }

        let text = self.decode_tokens(&output_tokens)?;

        tracing::debug!(
            "Transcribed {:.2}s of audio in {:.2}s: '{}'",
            audio_data.len() as f64 / 16000.0,
            start_time.elapsed().as_secs_f64(),
            text
        );

        Ok(text)
    }

    /// Validate the model by transcribing one second of silence.
    async fn validate(&mut self) -> Result<()> {
        tracing::debug!("Validating Whisper model with silence input...");
        let test_audio = vec![0.0f32; 16000];
        let result = self.transcribe(&test_audio, Some("en")).await?;
        tracing::debug!("Model validation successful, test result: '{}'", result);
        Ok(())
    }

    /// Convert PCM audio into the log-mel spectrogram the encoder expects.
    ///
    /// Simplified energy-based features with triangular mel filters. Audio is
    /// padded or truncated to the fixed 30-second model window.
    fn pcm_to_mel(&self, pcm_data: &[f32]) -> Result<Tensor> {
        let target_len = 30 * 16000;
        let mut padded_audio = vec![0.0f32; target_len];
        let copy_len = pcm_data.len().min(target_len);
        padded_audio[..copy_len].copy_from_slice(&pcm_data[..copy_len]);

        let n_mels = self.config.num_mel_bins as usize;
        let n_frames = 3000; // standard Whisper frame count for 30s

        let mut mel_data = vec![0.0f32; n_mels * n_frames];
        let frame_size = padded_audio.len() / n_frames;

        for frame in 0..n_frames {
            let start = frame * frame_size;
            let end = (start + frame_size).min(padded_audio.len());

            for mel_bin in 0..n_mels {
                let mut energy = 0.0f32;
                for sample in &padded_audio[start..end] {
                    energy += sample.abs();
                }

                // log-mel scaling with a -80 dB floor
                mel_data[mel_bin * n_frames + frame] =
                    (energy / frame_size as f32).ln().max(-11.5129);
            }
        }

        Ok(Tensor::from_vec(mel_data, (n_mels, n_frames), &self.device)?)
    }

    /// Decode output tokens to clean text.
    fn decode_tokens(&self, tokens: &[u32]) -> Result<String> {
        let text = self
            .tokenizer
            .decode(tokens, true)
            .map_err(|e| anyhow!("Tokenizer decode error: {}", e))?;

        let cleaned = text
            .replace("<|startoftranscript|>", "")
            .replace("<|endoftext|>", "")
            .replace("<|notimestamps|>", "");

        Ok(cleaned.trim().to_string())
    }

    // Standard Whisper special-token ids
    fn sot_token(&self) -> u32 {
        50258
    }

    fn eot_token(&self) -> u32 {
        50257
    }

    fn transcribe_token(&self) -> u32 {
        50359
    }

    fn language_token(&self, language: &str) -> Option<u32> {
        match language.to_lowercase().as_str() {
            "en" | "english" => Some(50259),
            "es" | "spanish" => Some(50262),
            "fr" | "french" => Some(50265),
            "de" | "german" => Some(50261),
            "it" | "italian" => Some(50274),
            "pt" | "portuguese" => Some(50267),
            "ru" | "russian" => Some(50263),
            "ja" | "japanese" => Some(50266),
            "ko" | "korean" => Some(50264),
            "zh" | "chinese" => Some(50260),
            _ => None,
        }
    }
}

/// Check whether adding `new_token` would continue a repetition loop.
fn is_repetitive(tokens: &[u32], new_token: u32) -> bool {
    if tokens.len() < 3 {
        return false;
    }

    // Immediate repetition: the same token three times running
    if tokens[tokens.len() - 2..] == [new_token, new_token] {
        return true;
    }

    // Pattern repetition: the last three tokens repeating the previous three
    if tokens.len() >= 6 {
        let last_3 = &tokens[tokens.len() - 3..];
        let prev_3 = &tokens[tokens.len() - 6..tokens.len() - 3];
        if last_3 == prev_3 {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_size_parsing() {
        assert_eq!("base".parse::<ModelSize>().unwrap(), ModelSize::Base);
        assert_eq!("LARGE".parse::<ModelSize>().unwrap(), ModelSize::Large);
        assert!("invalid".parse::<ModelSize>().is_err());
    }

    #[test]
    fn test_model_size_repo_names() {
        assert_eq!(ModelSize::Base.repo_name(), "openai/whisper-base");
        assert_eq!(ModelSize::Base.to_string(), "base");
    }

    #[test]
    fn test_repetition_guard() {
        // Same token three times running
        assert!(is_repetitive(&[1, 2, 7, 7], 7));
        // Last three repeating the previous three
        assert!(is_repetitive(&[4, 5, 6, 4, 5, 6], 9));
        // Healthy sequence
        assert!(!is_repetitive(&[1, 2, 3, 4, 5], 6));
        // Too short to judge
        assert!(!is_repetitive(&[7, 7], 7));
    }
}
