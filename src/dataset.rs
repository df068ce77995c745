//! Dataset discovery, partitioning and label encoding
//!
//! Slices live under `slices_path/<genre>/<song>_<index>.png`. The active
//! genre set is the sorted set difference of the discovered directories and
//! the configured ignore list; its order fixes the one-hot class indices.
//!
//! Partitioning is stratified per genre: each genre's slice list is sorted,
//! shuffled with an RNG seeded from the configured seed and the genre name,
//! capped, then split validation / test / train at the configured ratios.
//! The same seed therefore always yields the same partitions, and the split
//! of one genre does not depend on which other genres are present.

use crate::config::Config;
use crate::error::{GenreError, Result};
use ndarray::{Array2, Array3, Array4, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// Train-mode dataset: training examples plus the validation hold-out
#[derive(Debug)]
pub struct TrainData {
    pub train_x: Array4<f32>,
    pub train_y: Array2<f32>,
    pub validation_x: Array4<f32>,
    pub validation_y: Array2<f32>,
}

/// Test-mode dataset: the held-out test partition
#[derive(Debug)]
pub struct TestData {
    pub x: Array4<f32>,
    pub y: Array2<f32>,
}

/// Vote-mode dataset: test partition plus one song id per slice
#[derive(Debug)]
pub struct VoteData {
    pub x: Array4<f32>,
    pub y: Array2<f32>,
    pub song_ids: Vec<String>,
}

/// One genre's partitioned slice files
#[derive(Debug, Clone)]
struct GenrePartition {
    train: Vec<PathBuf>,
    validation: Vec<PathBuf>,
    test: Vec<PathBuf>,
}

/// Discover the active genre set from the slices directory
pub fn discover_genres(config: &Config) -> Result<Vec<String>> {
    let root = &config.paths.slices_path;
    if !root.is_dir() {
        return Err(GenreError::DataNotFound(format!(
            "Slices directory does not exist: {}",
            root.display()
        )));
    }

    let ignored: HashSet<&str> = config
        .dataset
        .ignore_genres
        .iter()
        .map(|g| g.as_str())
        .collect();

    let mut genres: Vec<String> = fs::read_dir(root)
        .map_err(|e| GenreError::DataNotFound(e.to_string()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(|s| s.to_string()))
        .filter(|name| !ignored.contains(name.as_str()))
        .collect();
    genres.sort();

    if genres.is_empty() {
        return Err(GenreError::DataNotFound(format!(
            "No genre directories under {}",
            root.display()
        )));
    }

    Ok(genres)
}

/// Build the train and validation partitions
pub fn build_train_dataset(config: &Config, genres: &[String]) -> Result<TrainData> {
    let mut train_files = Vec::new();
    let mut validation_files = Vec::new();

    for (class, genre) in genres.iter().enumerate() {
        let partition = partition_genre(config, genre)?;
        train_files.extend(partition.train.into_iter().map(|p| (p, class)));
        validation_files.extend(partition.validation.into_iter().map(|p| (p, class)));
    }

    let (train_x, train_y) = load_examples(config, genres.len(), &train_files)?;
    let (validation_x, validation_y) = load_examples(config, genres.len(), &validation_files)?;

    Ok(TrainData {
        train_x,
        train_y,
        validation_x,
        validation_y,
    })
}

/// Build the held-out test partition
pub fn build_test_dataset(config: &Config, genres: &[String]) -> Result<TestData> {
    let test_files = collect_test_files(config, genres)?;
    let (x, y) = load_examples(config, genres.len(), &test_files)?;
    Ok(TestData { x, y })
}

/// Build the vote partition: test data plus parallel song ids
pub fn build_vote_dataset(config: &Config, genres: &[String]) -> Result<VoteData> {
    let test_files = collect_test_files(config, genres)?;
    let song_ids = test_files
        .iter()
        .map(|(path, _)| song_id_from_slice(path))
        .collect();
    let (x, y) = load_examples(config, genres.len(), &test_files)?;
    Ok(VoteData { x, y, song_ids })
}

/// Derive the song identifier from a slice filename
///
/// `<song>_<index>.png` maps back to `<song>`; a stem without an underscore
/// is returned unchanged.
pub fn song_id_from_slice(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    match stem.rfind('_') {
        Some(pos) => stem[..pos].to_string(),
        None => stem.to_string(),
    }
}

fn collect_test_files(config: &Config, genres: &[String]) -> Result<Vec<(PathBuf, usize)>> {
    let mut test_files = Vec::new();
    for (class, genre) in genres.iter().enumerate() {
        let partition = partition_genre(config, genre)?;
        test_files.extend(partition.test.into_iter().map(|p| (p, class)));
    }
    Ok(test_files)
}

/// Shuffle, cap and split one genre's slice files
fn partition_genre(config: &Config, genre: &str) -> Result<GenrePartition> {
    let dir = config.paths.slices_path.join(genre);
    if !dir.is_dir() {
        return Err(GenreError::DataNotFound(format!(
            "Genre directory does not exist: {}",
            dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(&dir)
        .map_err(|e| GenreError::DataNotFound(e.to_string()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("png"))
                .unwrap_or(false)
        })
        .collect();

    if files.is_empty() {
        return Err(GenreError::DataNotFound(format!(
            "Genre '{}' holds no slices in {}",
            genre,
            dir.display()
        )));
    }

    // Sort before shuffling; read_dir order is filesystem-dependent
    files.sort();
    let mut rng = genre_rng(config.dataset.seed, genre);
    files.shuffle(&mut rng);

    let cap = config.dataset.cap_for(genre);
    if files.len() < cap && !config.dataset.allow_short_genres {
        return Err(GenreError::InsufficientData(format!(
            "Genre '{}' holds {} slices, {} requested",
            genre,
            files.len(),
            cap
        )));
    }
    files.truncate(cap);

    let n = files.len();
    let n_validation = (n as f32 * config.dataset.validation_ratio) as usize;
    let n_test = (n as f32 * config.dataset.test_ratio) as usize;

    let train = files.split_off(n_validation + n_test);
    let test = files.split_off(n_validation);
    let validation = files;

    Ok(GenrePartition {
        train,
        validation,
        test,
    })
}

/// Per-genre RNG so one genre's shuffle is independent of the others
fn genre_rng(seed: u64, genre: &str) -> StdRng {
    let mut hasher = DefaultHasher::new();
    genre.hash(&mut hasher);
    StdRng::seed_from_u64(seed ^ hasher.finish())
}

/// Load labeled slice files into input and one-hot label arrays
fn load_examples(
    config: &Config,
    num_classes: usize,
    files: &[(PathBuf, usize)],
) -> Result<(Array4<f32>, Array2<f32>)> {
    let (y_size, x_size, z_size) = (
        config.slice.y_size,
        config.slice.x_size,
        config.slice.z_size,
    );

    let mut x = Array4::<f32>::zeros((files.len(), y_size, x_size, z_size));
    let mut y = Array2::<f32>::zeros((files.len(), num_classes));

    for (i, (path, class)) in files.iter().enumerate() {
        let slice = load_slice(config, path)?;
        x.index_axis_mut(Axis(0), i).assign(&slice);
        y[[i, *class]] = 1.0;
    }

    Ok((x, y))
}

/// Load one slice tile as a (height, width, depth) tensor in [0, 1]
pub fn load_slice(config: &Config, path: &Path) -> Result<Array3<f32>> {
    let img = image::open(path)
        .map_err(|e| GenreError::DataNotFound(format!("{}: {}", path.display(), e)))?
        .to_luma8();

    let (x_size, y_size) = (config.slice.x_size, config.slice.y_size);
    if img.width() as usize != x_size || img.height() as usize != y_size {
        return Err(GenreError::InvalidAudioFormat(format!(
            "Slice {} is {}x{}, expected {}x{}",
            path.display(),
            img.width(),
            img.height(),
            x_size,
            y_size
        )));
    }

    let mut slice = Array3::<f32>::zeros((y_size, x_size, config.slice.z_size));
    for (col, row, pixel) in img.enumerate_pixels() {
        slice[[row as usize, col as usize, 0]] = pixel.0[0] as f32 / 255.0;
    }

    Ok(slice)
}
