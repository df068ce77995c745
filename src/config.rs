//! Configuration system for the genre classification pipeline

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: String,
    pub paths: PathsConfig,
    pub dataset: DatasetConfig,
    pub slice: SliceConfig,
    pub training: TrainingConfig,
    pub vote: VoteConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            paths: PathsConfig::default(),
            dataset: DatasetConfig::default(),
            slice: SliceConfig::default(),
            training: TrainingConfig::default(),
            vote: VoteConfig::default(),
        }
    }
}

/// Filesystem layout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Raw audio root, one subdirectory per genre holding WAV files
    pub raw_path: PathBuf,
    /// Slice root, one subdirectory per genre holding PNG tiles
    pub slices_path: PathBuf,
    /// Directory holding saved model weights
    pub checkpoint_path: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_path: PathBuf::from("./data/raw"),
            slices_path: PathBuf::from("./data/slices"),
            checkpoint_path: PathBuf::from("./data/checkpoints"),
        }
    }
}

/// Dataset discovery and partitioning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Fraction of each genre's pool held out for validation, in [0, 1)
    pub validation_ratio: f32,
    /// Fraction of each genre's pool held out for testing, in [0, 1)
    pub test_ratio: f32,
    /// Per-genre slice caps; genres not listed fall back to the default cap
    pub files_per_genre: HashMap<String, usize>,
    /// Cap applied to genres without an explicit entry
    pub default_files_per_genre: usize,
    /// Genre directories excluded from the active set
    pub ignore_genres: Vec<String>,
    /// Seed for the per-genre shuffle; fixed so splits are reproducible
    pub seed: u64,
    /// Accept genres whose pool is smaller than their cap instead of failing
    pub allow_short_genres: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            validation_ratio: 0.3,
            test_ratio: 0.1,
            files_per_genre: HashMap::new(),
            default_files_per_genre: 1000,
            ignore_genres: Vec::new(),
            seed: 42,
            allow_short_genres: false,
        }
    }
}

impl DatasetConfig {
    /// Slice cap for one genre
    pub fn cap_for(&self, genre: &str) -> usize {
        self.files_per_genre
            .get(genre)
            .copied()
            .unwrap_or(self.default_files_per_genre)
    }
}

/// Spectrogram slicing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceConfig {
    /// Tile width in pixels (time frames)
    pub x_size: usize,
    /// Tile height in pixels (frequency bins)
    pub y_size: usize,
    /// Tile depth; 1 for grayscale
    pub z_size: usize,
    /// STFT hop length in samples
    pub hop_length: usize,
    /// Floor of the dB range mapped to black
    pub db_floor: f32,
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            x_size: 128,
            y_size: 128,
            z_size: 1,
            hop_length: 512,
            db_floor: -80.0,
        }
    }
}

/// Model training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Dropout keep probability applied before the output layer
    pub dropout: f64,
    /// File stem of the default checkpoint artifact
    pub checkpoint_name: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 20,
            batch_size: 128,
            learning_rate: 1e-3,
            dropout: 0.5,
            checkpoint_name: "model".to_string(),
        }
    }
}

/// Chunked prediction configuration for vote and confusion-matrix modes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteConfig {
    /// Rows per prediction chunk; bounds peak memory, never affects results
    pub chunk_size: usize,
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self { chunk_size: 1000 }
    }
}

/// Validate configuration parameters
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    let v = config.dataset.validation_ratio;
    let t = config.dataset.test_ratio;
    if !(0.0..1.0).contains(&v) {
        anyhow::bail!("validation_ratio must be in [0, 1), got {}", v);
    }
    if !(0.0..1.0).contains(&t) {
        anyhow::bail!("test_ratio must be in [0, 1), got {}", t);
    }
    if v + t >= 1.0 {
        anyhow::bail!(
            "validation_ratio + test_ratio must leave room for training data, got {}",
            v + t
        );
    }

    if config.slice.x_size == 0 || config.slice.y_size == 0 {
        anyhow::bail!("slice dimensions must be non-zero");
    }
    if config.slice.z_size != 1 {
        anyhow::bail!(
            "slice depth {} not supported, slices are grayscale (depth 1)",
            config.slice.z_size
        );
    }
    if config.slice.hop_length == 0 {
        anyhow::bail!("hop_length must be non-zero");
    }

    if config.training.epochs == 0 {
        anyhow::bail!("epochs must be non-zero");
    }
    if config.training.batch_size == 0 {
        anyhow::bail!("batch_size must be non-zero");
    }
    if !(0.0..=1.0).contains(&config.training.dropout) {
        anyhow::bail!("dropout must be in [0, 1], got {}", config.training.dropout);
    }

    if config.vote.chunk_size == 0 {
        anyhow::bail!("vote chunk_size must be non-zero");
    }

    Ok(())
}

/// Load configuration from JSON file
pub fn load_config<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Save configuration to JSON file
pub fn save_config<P: AsRef<std::path::Path>>(config: &Config, path: P) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
