//! Audio I/O for the slicing stage

use crate::error::{GenreError, Result};
use hound::WavReader;
use std::path::Path;

/// Load audio file and return mono samples with sample rate
pub fn load_audio_file<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, u32)> {
    let path = path.as_ref();

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "wav" => load_wav_file(path),
        _ => Err(GenreError::InvalidAudioFormat(format!(
            "Unsupported audio format: {}",
            extension
        ))),
    }
}

/// Load WAV file
fn load_wav_file<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, u32)> {
    let mut reader =
        WavReader::open(path).map_err(|e| GenreError::AudioFileError(e.to_string()))?;
    let spec = reader.spec();

    // Validate format
    if spec.channels > 2 {
        return Err(GenreError::InvalidAudioFormat(
            "Multi-channel audio (>2 channels) not supported".to_string(),
        ));
    }

    if !matches!(
        spec.sample_format,
        hound::SampleFormat::Int | hound::SampleFormat::Float
    ) {
        return Err(GenreError::InvalidAudioFormat(
            "Unsupported sample format".to_string(),
        ));
    }

    if spec.bits_per_sample > 32 {
        return Err(GenreError::InvalidAudioFormat(format!(
            "Unsupported bit depth: {}",
            spec.bits_per_sample
        )));
    }

    let sr = spec.sample_rate;
    let mut samples: Vec<f32> = Vec::with_capacity(reader.len() as usize);

    match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            for sample in reader.samples::<i32>() {
                let sample =
                    sample.map_err(|e| GenreError::AudioFileError(e.to_string()))? as f32
                        / max_value;
                samples.push(sample);
            }
        }
        hound::SampleFormat::Float => {
            for sample in reader.samples::<f32>() {
                samples.push(sample.map_err(|e| GenreError::AudioFileError(e.to_string()))?);
            }
        }
    }

    // Downmix stereo to mono; the spectrogram stage works on a single channel
    let samples = if spec.channels == 2 {
        samples
            .chunks_exact(2)
            .map(|chunk| (chunk[0] + chunk[1]) * 0.5)
            .collect()
    } else {
        samples
    };

    Ok((samples, sr))
}

/// Validate audio file format and content before slicing
pub fn validate_audio_file<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(GenreError::InputValidationError(format!(
            "Audio file does not exist: {}",
            path.display()
        )));
    }

    let (samples, sr) = load_audio_file(path)?;

    if samples.is_empty() {
        return Err(GenreError::InputValidationError(
            "Audio file contains no samples".to_string(),
        ));
    }

    if !(8000..=192000).contains(&sr) {
        return Err(GenreError::UnsupportedSampleRate(sr));
    }

    Ok(())
}
