//! WAV file decoding for the transcription pipeline.

use crate::audio::MODEL_SAMPLE_RATE;
use anyhow::{anyhow, Result};
use hound::WavReader;
use std::path::Path;
use tracing::debug;

/// Load an audio file and return mono f32 samples at the model sample rate.
///
/// ## Supported Input:
/// - WAV containers with 16-bit or 32-bit integer PCM, or 32-bit float PCM
/// - Any channel count (folded to mono by averaging)
/// - Any sample rate (resampled to 16kHz)
///
/// ## Returns:
/// - **Ok(Vec<f32>)**: Samples in [-1.0, 1.0], mono, 16kHz
/// - **Err(anyhow::Error)**: Unreadable file, unsupported format, or empty audio
pub fn load_audio<P: AsRef<Path>>(path: P) -> Result<Vec<f32>> {
    let mut reader = WavReader::open(path.as_ref())
        .map_err(|e| anyhow!("Failed to read audio file as WAV: {}", e))?;
    let spec = reader.spec();

    debug!(
        "Decoding WAV: {} Hz, {} channel(s), {}-bit {:?}",
        spec.sample_rate, spec.channels, spec.bits_per_sample, spec.sample_format
    );

    // Scale integer PCM to [-1.0, 1.0] the same way the model pipeline does
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => match spec.bits_per_sample {
            16 => reader
                .samples::<i16>()
                .map(|s| s.map(|sample| sample as f32 / i16::MAX as f32))
                .collect::<Result<_, _>>()?,
            32 => reader
                .samples::<i32>()
                .map(|s| s.map(|sample| sample as f32 / i32::MAX as f32))
                .collect::<Result<_, _>>()?,
            other => return Err(anyhow!("Unsupported WAV bit depth: {}", other)),
        },
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
    };

    if samples.is_empty() {
        return Err(anyhow!("Audio file contains no samples"));
    }

    let mono = fold_to_mono(&samples, spec.channels as usize);
    let resampled = resample(&mono, spec.sample_rate, MODEL_SAMPLE_RATE);

    debug!(
        "Decoded {:.2}s of audio ({} samples at {} Hz)",
        resampled.len() as f64 / MODEL_SAMPLE_RATE as f64,
        resampled.len(),
        MODEL_SAMPLE_RATE
    );

    Ok(resampled)
}

/// Average interleaved channels down to a single mono channel.
fn fold_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Linear-interpolation resampling between arbitrary rates.
///
/// Adequate for speech going into Whisper; the model is robust to the mild
/// aliasing a first-order resampler introduces.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).floor() as usize;
    let mut out = Vec::with_capacity(out_len.max(1));

    for i in 0..out_len.max(1) {
        let src_pos = i as f64 * ratio;
        let idx = src_pos.floor() as usize;
        let frac = (src_pos - idx as f64) as f32;

        let current = samples[idx.min(samples.len() - 1)];
        let next = samples[(idx + 1).min(samples.len() - 1)];
        out.push(current + (next - current) * frac);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};

    fn write_test_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_load_mono_16khz_wav() {
        let tmp = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        let samples: Vec<i16> = (0..1600).map(|i| ((i % 100) * 300 - 15000) as i16).collect();
        write_test_wav(tmp.path(), 16_000, 1, &samples);

        let decoded = load_audio(tmp.path()).unwrap();
        assert_eq!(decoded.len(), 1600);
        assert!(decoded.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn test_stereo_folds_to_mono() {
        let tmp = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        // Left channel at +10000, right at -10000: mono fold should be ~0
        let samples: Vec<i16> = (0..200).map(|i| if i % 2 == 0 { 10000 } else { -10000 }).collect();
        write_test_wav(tmp.path(), 16_000, 2, &samples);

        let decoded = load_audio(tmp.path()).unwrap();
        assert_eq!(decoded.len(), 100);
        assert!(decoded.iter().all(|s| s.abs() < 0.001));
    }

    #[test]
    fn test_resamples_to_model_rate() {
        let tmp = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        // One second at 8kHz should come out as roughly one second at 16kHz
        let samples: Vec<i16> = (0..8000).map(|i| ((i % 50) * 500 - 12000) as i16).collect();
        write_test_wav(tmp.path(), 8_000, 1, &samples);

        let decoded = load_audio(tmp.path()).unwrap();
        let duration = decoded.len() as f64 / MODEL_SAMPLE_RATE as f64;
        assert!((duration - 1.0).abs() < 0.01, "duration was {:.3}s", duration);
    }

    #[test]
    fn test_rejects_non_wav_data() {
        let tmp = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        std::fs::write(tmp.path(), b"this is definitely not a RIFF header").unwrap();

        let err = load_audio(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("WAV"));
    }

    #[test]
    fn test_resample_identity() {
        let samples = vec![0.0, 0.5, -0.5, 1.0];
        assert_eq!(resample(&samples, 16_000, 16_000), samples);
    }
}
