//! Spectrogram slicing: raw audio to fixed-size grayscale tiles
//!
//! Walks the raw-audio root (one subdirectory per genre), renders each song's
//! log-magnitude spectrogram and crops it into square PNG tiles under the
//! slices root. Tiles already on disk are left untouched so slicing can be
//! re-run incrementally.

use crate::audio;
use crate::config::Config;
use crate::error::{GenreError, Result};
use crate::spectral;
use image::{GrayImage, Luma};
use ndarray::Array2;
use std::fs;
use std::path::Path;

/// Counters reported after a slicing run
#[derive(Debug, Clone, Default)]
pub struct SliceSummary {
    pub songs_processed: usize,
    pub slices_written: usize,
    pub slices_skipped: usize,
}

/// Slice every raw song into spectrogram tiles
pub fn create_slices_from_audio(config: &Config, quiet: bool) -> Result<SliceSummary> {
    let raw_root = &config.paths.raw_path;
    if !raw_root.is_dir() {
        return Err(GenreError::DataNotFound(format!(
            "Raw audio directory does not exist: {}",
            raw_root.display()
        )));
    }

    let mut genre_dirs: Vec<_> = fs::read_dir(raw_root)
        .map_err(|e| GenreError::AudioFileError(e.to_string()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    genre_dirs.sort();

    if genre_dirs.is_empty() {
        return Err(GenreError::DataNotFound(format!(
            "No genre subdirectories under {}",
            raw_root.display()
        )));
    }

    let mut summary = SliceSummary::default();

    for genre_dir in genre_dirs {
        let genre = genre_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        let out_dir = config.paths.slices_path.join(&genre);
        fs::create_dir_all(&out_dir)
            .map_err(|e| GenreError::SliceExportError(e.to_string()))?;

        let mut songs: Vec<_> = fs::read_dir(&genre_dir)
            .map_err(|e| GenreError::AudioFileError(e.to_string()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("wav"))
                    .unwrap_or(false)
            })
            .collect();
        songs.sort();

        for song_path in songs {
            if !quiet {
                println!("Slicing {}...", song_path.display());
            }
            slice_song(&song_path, &out_dir, config, &mut summary)?;
            summary.songs_processed += 1;
        }
    }

    Ok(summary)
}

/// Slice one song into tiles under `out_dir`
fn slice_song(
    song_path: &Path,
    out_dir: &Path,
    config: &Config,
    summary: &mut SliceSummary,
) -> Result<()> {
    audio::validate_audio_file(song_path)?;
    let (samples, sr) = audio::load_audio_file(song_path)?;

    let pixels = spectrogram_pixels(&samples, sr, config)?;

    let song_name = song_path
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("song");

    let x_size = config.slice.x_size;
    let n_tiles = pixels.shape()[1] / x_size;

    for tile_idx in 0..n_tiles {
        let tile_path = out_dir.join(format!("{}_{}.png", song_name, tile_idx));
        if tile_path.exists() {
            summary.slices_skipped += 1;
            continue;
        }

        let tile = crop_tile(&pixels, tile_idx * x_size, x_size);
        tile.save(&tile_path)
            .map_err(|e| GenreError::SliceExportError(e.to_string()))?;
        summary.slices_written += 1;
    }

    Ok(())
}

/// Render the full-song spectrogram as grayscale pixel rows
///
/// Rows are frequency bins with the lowest band at the bottom of the image,
/// columns are STFT frames. The FFT size is derived from the configured tile
/// height so one tile spans the full frequency axis.
fn spectrogram_pixels(samples: &[f32], sr: u32, config: &Config) -> Result<Array2<u8>> {
    let y_size = config.slice.y_size;
    let n_fft = y_size * 2;

    let stft_data = spectral::stft(samples, n_fft, config.slice.hop_length, sr)?;
    let mag = spectral::magnitude_spectrogram(&stft_data);
    let db = spectral::magnitude_to_db(&mag, config.slice.db_floor);

    let n_frames = db.shape()[1];
    let mut pixels = Array2::<u8>::zeros((y_size, n_frames));

    let floor = config.slice.db_floor;
    for row in 0..y_size {
        // bin 0 (DC) lands on the bottom pixel row; the Nyquist bin is dropped
        let bin = y_size - 1 - row;
        for col in 0..n_frames {
            let norm = (db[[bin, col]] - floor) / -floor;
            pixels[[row, col]] = (norm.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
    }

    Ok(pixels)
}

/// Crop one `x_size`-wide tile starting at `start_col`
fn crop_tile(pixels: &Array2<u8>, start_col: usize, x_size: usize) -> GrayImage {
    let y_size = pixels.shape()[0];
    let mut img = GrayImage::new(x_size as u32, y_size as u32);

    for row in 0..y_size {
        for col in 0..x_size {
            img.put_pixel(
                col as u32,
                row as u32,
                Luma([pixels[[row, start_col + col]]]),
            );
        }
    }

    img
}
