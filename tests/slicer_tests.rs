//! Validation tests for spectrogram slicing

use audio2genre::config::Config;
use audio2genre::error::GenreError;
use audio2genre::slicer;
use audio2genre::spectral;
use std::f32::consts::PI;
use std::path::Path;
use tempfile::TempDir;

/// Generate a synthetic tone with a little broadband content
fn generate_song_audio(n_samples: usize, sr: u32) -> Vec<f32> {
    let mut audio = vec![0.0; n_samples];
    for (i, sample) in audio.iter_mut().enumerate() {
        let t = i as f32 / sr as f32;
        *sample = 0.4 * (2.0 * PI * 440.0 * t).sin()
            + 0.2 * (2.0 * PI * 880.0 * t).sin()
            + 0.05 * (2.0 * PI * 3000.0 * t).sin();
    }
    audio
}

fn write_wav(path: &Path, samples: &[f32], sr: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: sr,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample((s * i16::MAX as f32 * 0.8) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// Config with small tiles pointed at a temp raw/slices layout
fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.paths.raw_path = root.join("raw");
    config.paths.slices_path = root.join("slices");
    config.slice.x_size = 32;
    config.slice.y_size = 32;
    config.slice.hop_length = 256;
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stft_dimensions() {
        let sr = 22050;
        let audio = generate_song_audio(sr as usize, sr);
        let n_fft = 512;
        let hop_length = 256;

        let stft_data = spectral::stft(&audio, n_fft, hop_length, sr).unwrap();
        assert_eq!(stft_data.s.shape()[0], n_fft / 2 + 1);
        assert_eq!(stft_data.freqs.len(), n_fft / 2 + 1);
        assert_eq!(stft_data.times.len(), stft_data.s.shape()[1]);

        // DC at the bottom, Nyquist at the top
        assert!(stft_data.freqs[0].abs() < 1.0);
        assert!((stft_data.freqs.last().unwrap() - sr as f32 / 2.0).abs() < 100.0);
    }

    #[test]
    fn test_stft_rejects_short_signal() {
        let err = spectral::stft(&[0.0; 100], 512, 256, 22050).unwrap_err();
        assert!(matches!(err, GenreError::SpectralProcessingError(_)));
    }

    #[test]
    fn test_db_scale_bounded() {
        let sr = 22050;
        let audio = generate_song_audio(sr as usize, sr);
        let stft_data = spectral::stft(&audio, 512, 256, sr).unwrap();
        let mag = spectral::magnitude_spectrogram(&stft_data);
        let db = spectral::magnitude_to_db(&mag, -80.0);

        for &v in db.iter() {
            assert!((-80.0..=0.0).contains(&v), "dB value {} out of range", v);
        }
        // The peak bin sits at exactly 0 dB
        let max = db.iter().cloned().fold(f32::MIN, f32::max);
        assert!(max.abs() < 1e-3);
    }

    #[test]
    fn test_slicing_produces_fixed_size_tiles() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let sr = 22050;

        let genre_dir = config.paths.raw_path.join("rock");
        std::fs::create_dir_all(&genre_dir).unwrap();
        write_wav(
            &genre_dir.join("anthem.wav"),
            &generate_song_audio(sr as usize, sr),
            sr,
        );

        let summary = slicer::create_slices_from_audio(&config, true).unwrap();
        assert_eq!(summary.songs_processed, 1);

        // 1s at hop 256 and fft 64 gives 86 frames: two 32-frame tiles
        assert_eq!(summary.slices_written, 2);

        for tile_idx in 0..2 {
            let tile_path = config
                .paths
                .slices_path
                .join("rock")
                .join(format!("anthem_{}.png", tile_idx));
            let img = image::open(&tile_path).unwrap().to_luma8();
            assert_eq!(img.width(), 32);
            assert_eq!(img.height(), 32);
        }
    }

    #[test]
    fn test_reslicing_skips_existing_tiles() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let sr = 22050;

        let genre_dir = config.paths.raw_path.join("rock");
        std::fs::create_dir_all(&genre_dir).unwrap();
        write_wav(
            &genre_dir.join("anthem.wav"),
            &generate_song_audio(sr as usize, sr),
            sr,
        );

        let first = slicer::create_slices_from_audio(&config, true).unwrap();
        let second = slicer::create_slices_from_audio(&config, true).unwrap();

        assert_eq!(second.slices_written, 0);
        assert_eq!(second.slices_skipped, first.slices_written);
    }

    #[test]
    fn test_slicing_without_raw_directory_fails() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());

        let err = slicer::create_slices_from_audio(&config, true).unwrap_err();
        assert!(matches!(err, GenreError::DataNotFound(_)));
    }

    #[test]
    fn test_slicing_ignores_non_wav_files() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());

        let genre_dir = config.paths.raw_path.join("rock");
        std::fs::create_dir_all(&genre_dir).unwrap();
        std::fs::write(genre_dir.join("notes.txt"), "not audio").unwrap();

        let summary = slicer::create_slices_from_audio(&config, true).unwrap();
        assert_eq!(summary.songs_processed, 0);
        assert_eq!(summary.slices_written, 0);
    }
}
