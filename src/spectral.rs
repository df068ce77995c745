//! Spectral processing utilities (STFT, spectrogram scaling)

use crate::error::{GenreError, Result};
use ndarray::Array2;
use rustfft::{num_complex::Complex32, FftPlanner};

/// STFT data structure
#[derive(Debug, Clone)]
pub struct StftData {
    pub s: Array2<Complex32>,
    pub freqs: Vec<f32>,
    pub times: Vec<f32>,
}

/// Compute STFT of audio signal
pub fn stft(
    y: &[f32],
    n_fft: usize,
    hop_length: usize,
    sample_rate: u32,
) -> Result<StftData> {
    if y.len() < n_fft {
        return Err(GenreError::SpectralProcessingError(format!(
            "Signal too short for STFT: {} samples < window of {}",
            y.len(),
            n_fft
        )));
    }

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n_fft);

    let n_frames = (y.len() - n_fft) / hop_length + 1;
    let mut s = Array2::<Complex32>::zeros((n_fft / 2 + 1, n_frames));

    let window_fn = hann_window(n_fft);

    for frame_idx in 0..n_frames {
        let start = frame_idx * hop_length;
        let end = start + n_fft;

        if end > y.len() {
            break;
        }

        // Apply window
        let mut frame: Vec<Complex32> = y[start..end]
            .iter()
            .zip(&window_fn)
            .map(|(&sample, &win)| Complex32::new(sample * win, 0.0))
            .collect();

        // FFT
        fft.process(&mut frame);

        // Store positive frequencies
        for (i, &val) in frame[..n_fft / 2 + 1].iter().enumerate() {
            s[[i, frame_idx]] = val;
        }
    }

    let freqs: Vec<f32> = (0..n_fft / 2 + 1)
        .map(|i| i as f32 * sample_rate as f32 / n_fft as f32)
        .collect();

    let times: Vec<f32> = (0..n_frames)
        .map(|i| i as f32 * hop_length as f32 / sample_rate as f32)
        .collect();

    Ok(StftData { s, freqs, times })
}

/// Generate Hann window
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos()))
        .collect()
}

/// Compute magnitude spectrogram
pub fn magnitude_spectrogram(stft_data: &StftData) -> Array2<f32> {
    stft_data.s.map(|c| c.norm())
}

/// Convert magnitude spectrogram to dB relative to its peak, clamped at `db_floor`
pub fn magnitude_to_db(mag: &Array2<f32>, db_floor: f32) -> Array2<f32> {
    let max_magnitude = mag.iter().cloned().fold(0.0f32, f32::max);
    if max_magnitude <= 0.0 {
        return Array2::from_elem(mag.raw_dim(), db_floor);
    }

    mag.map(|&m| {
        if m > 0.0 {
            (20.0 * (m / max_magnitude).log10()).max(db_floor)
        } else {
            db_floor
        }
    })
}
