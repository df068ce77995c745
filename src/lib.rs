//! Music genre classification from spectrogram slices
//!
//! Songs are sliced into fixed-size spectrogram tiles, a convolutional
//! classifier is trained over the tiles, and per-song verdicts come from a
//! majority vote over each song's slice predictions.

pub mod audio;
pub mod config;
pub mod confusion;
pub mod dataset;
pub mod error;
pub mod model;
pub mod slicer;
pub mod spectral;
pub mod vote;

pub use config::Config;
pub use error::{GenreError, Result as GenreResult};
pub use model::GenreModel;

use crate::confusion::ConfusionMatrix;
use crate::model::{checkpoint_file, CnnModel};
use crate::vote::VoteAggregator;
use ndarray::s;
use std::time::Instant;

/// One requested CLI action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Slice,
    Train,
    Continue,
    Test,
    ConfusionMatrix,
    Vote,
    ShowConfig,
}

/// Flags shared by all actions of one invocation
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Checkpoint stem to continue training from
    pub resume: Option<String>,
    /// Epoch count override; only valid together with `resume`
    pub epochs: Option<usize>,
    /// Suppress progress output
    pub quiet: bool,
}

/// Main pipeline: dataset building, model wiring and metric reporting
pub struct AudioToGenre {
    config: Config,
}

impl AudioToGenre {
    /// Create a new pipeline with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute the requested actions in order
    pub fn run(&self, actions: &[Action], options: &RunOptions) -> GenreResult<()> {
        validate_actions(actions, options)?;

        // Slicing runs before anything model-related and ends the invocation
        if actions.contains(&Action::Slice) {
            let summary = slicer::create_slices_from_audio(&self.config, options.quiet)?;
            println!(
                "Sliced {} songs into {} tiles ({} already on disk)",
                summary.songs_processed, summary.slices_written, summary.slices_skipped
            );
            return Ok(());
        }

        if actions.len() == 1 && actions[0] == Action::ShowConfig {
            println!("{}", serde_json::to_string_pretty(&self.config)?);
            return Ok(());
        }

        let genres = dataset::discover_genres(&self.config)?;
        if !options.quiet {
            self.print_banner(&genres);
        }

        let slice = &self.config.slice;
        let mut model = CnnModel::new(
            genres.len(),
            slice.x_size,
            slice.y_size,
            slice.z_size,
            &self.config.training,
        )?;

        for action in actions {
            match action {
                Action::Slice => unreachable!("slice exits above"),
                Action::ShowConfig => {
                    println!("{}", serde_json::to_string_pretty(&self.config)?);
                }
                Action::Train => {
                    self.cmd_train(&mut model, &genres, None, options.epochs)?;
                }
                Action::Continue => {
                    // Validated above: continue always carries a resume stem
                    let resume = options.resume.as_deref().unwrap_or_default();
                    self.cmd_train(&mut model, &genres, Some(resume), options.epochs)?;
                }
                Action::Test => {
                    self.cmd_test(&mut model, &genres)?;
                }
                Action::ConfusionMatrix => {
                    self.cmd_confusion_matrix(&mut model, &genres)?;
                }
                Action::Vote => {
                    self.cmd_vote(&mut model, &genres)?;
                }
            }
        }

        Ok(())
    }

    /// Train (optionally resumed), save, then evaluate through the saved
    /// checkpoint so a corrupt save surfaces immediately
    pub fn cmd_train(
        &self,
        model: &mut dyn GenreModel,
        genres: &[String],
        resume: Option<&str>,
        epochs_override: Option<usize>,
    ) -> GenreResult<()> {
        if let Some(stem) = resume {
            let path = checkpoint_file(&self.config, stem);
            println!("[+] Resuming from {}...", path.display());
            model.load(&path)?;
        }

        let data = dataset::build_train_dataset(&self.config, genres)?;
        let epochs = epochs_override.unwrap_or(self.config.training.epochs);
        let batch_size = self.config.training.batch_size;

        println!("[+] Training the model...");
        let t0 = Instant::now();
        let report = model.train(
            &data.train_x,
            &data.train_y,
            epochs,
            batch_size,
            (&data.validation_x, &data.validation_y),
        )?;
        let elapsed = t0.elapsed().as_secs();
        println!(
            "[+] Time to train: {} hours, {} minutes",
            elapsed / 3600,
            (elapsed % 3600) / 60
        );
        println!(
            "    Run {}: final loss {:.4}, validation accuracy {:.2}%",
            report.run_id,
            report.final_loss,
            report.validation_accuracy * 100.0
        );

        let path = checkpoint_file(&self.config, &self.config.training.checkpoint_name);
        println!("[+] Saving the weights...");
        model.save(&path)?;
        println!("[+] Weights saved!");

        // Round-trip through the persisted artifact, not the live weights
        println!("[+] Test Neural Network");
        println!("[+] Loading weights...");
        model.load(&path)?;
        println!("    Weights loaded!");

        let test = dataset::build_test_dataset(&self.config, genres)?;
        let accuracy = model.evaluate(&test.x, &test.y)?;
        println!("[+] Test accuracy: {:.2}%", accuracy * 100.0);

        Ok(())
    }

    /// Evaluate the saved checkpoint on the test partition
    pub fn cmd_test(&self, model: &mut dyn GenreModel, genres: &[String]) -> GenreResult<()> {
        println!("[+] Test Neural Network");
        let test = dataset::build_test_dataset(&self.config, genres)?;

        let path = checkpoint_file(&self.config, &self.config.training.checkpoint_name);
        model.load(&path)?;

        let accuracy = model.evaluate(&test.x, &test.y)?;
        println!("[+] Test accuracy: {:.2}%", accuracy * 100.0);

        Ok(())
    }

    /// Build and report the genre confusion matrix over the test partition
    pub fn cmd_confusion_matrix(
        &self,
        model: &mut dyn GenreModel,
        genres: &[String],
    ) -> GenreResult<()> {
        println!("[+] Create a Confusion Matrix");
        let test = dataset::build_test_dataset(&self.config, genres)?;

        let path = checkpoint_file(&self.config, &self.config.training.checkpoint_name);
        model.load(&path)?;

        let mut matrix = ConfusionMatrix::new(genres.len());
        let n = test.x.shape()[0];
        let chunk_size = self.config.vote.chunk_size;

        let mut start = 0;
        while start < n {
            let end = (start + chunk_size).min(n);
            let x_chunk = test.x.slice(s![start..end, .., .., ..]).to_owned();
            let y_chunk = test.y.slice(s![start..end, ..]).to_owned();
            let predictions = model.predict(&x_chunk)?;
            matrix.add_chunk(&predictions, &y_chunk)?;
            start = end;
        }

        println!("\nConfusion Matrix:\n{}", matrix.render(genres));
        println!("[+] Test accuracy: {:.2}%", matrix.accuracy()? * 100.0);

        let heatmap = self.config.paths.checkpoint_path.join("confusion_matrix.png");
        matrix.save_heatmap(&heatmap, genres)?;
        println!("[+] Heatmap saved to {}", heatmap.display());

        Ok(())
    }

    /// Aggregate slice predictions into per-song majority verdicts
    pub fn cmd_vote(&self, model: &mut dyn GenreModel, genres: &[String]) -> GenreResult<()> {
        let data = dataset::build_vote_dataset(&self.config, genres)?;

        let path = checkpoint_file(&self.config, &self.config.training.checkpoint_name);
        model.load(&path)?;

        let mut aggregator = VoteAggregator::new();
        let n = data.x.shape()[0];
        let chunk_size = self.config.vote.chunk_size;

        let mut start = 0;
        while start < n {
            let end = (start + chunk_size).min(n);
            let x_chunk = data.x.slice(s![start..end, .., .., ..]).to_owned();
            let y_chunk = data.y.slice(s![start..end, ..]).to_owned();
            let predictions = model.predict(&x_chunk)?;
            aggregator.add_chunk(&predictions, &y_chunk, &data.song_ids[start..end])?;
            start = end;
        }

        let summary = aggregator.finish()?;
        println!(
            "[+] Calculated Test accuracy: {:.2}% ({} slices)",
            summary.slice_accuracy * 100.0,
            summary.total_slices
        );
        println!(
            "[+] Calculated Voted Test accuracy: {:.2}% ({} songs)",
            summary.song_accuracy * 100.0,
            summary.total_songs
        );

        let model_accuracy = model.evaluate(&data.x, &data.y)?;
        println!("[+] Model Calculated Test accuracy: {:.2}%", model_accuracy * 100.0);

        Ok(())
    }

    fn print_banner(&self, genres: &[String]) {
        let dataset = &self.config.dataset;
        let slice = &self.config.slice;
        println!("--------------------------");
        println!("| ** Config ** ");
        println!("| Validation ratio: {}", dataset.validation_ratio);
        println!("| Test ratio: {}", dataset.test_ratio);
        println!("| Batch size: {}", self.config.training.batch_size);
        println!("| Genres: {:?}", genres);
        println!("| Number of classes: {}", genres.len());
        println!("| Slices per genre cap: {}", dataset.default_files_per_genre);
        println!(
            "| Slice size: {}x{}x{}",
            slice.x_size, slice.y_size, slice.z_size
        );
        println!("--------------------------");
    }
}

/// Validate the requested action list and flag combinations up front
pub fn validate_actions(actions: &[Action], options: &RunOptions) -> GenreResult<()> {
    if actions.is_empty() {
        return Err(GenreError::InputValidationError(
            "No action requested".to_string(),
        ));
    }

    if options.resume.is_some() != options.epochs.is_some() {
        return Err(GenreError::InputValidationError(
            "--resume and --epochs must be given together".to_string(),
        ));
    }

    if actions.contains(&Action::Continue) && options.resume.is_none() {
        return Err(GenreError::InputValidationError(
            "continue requires --resume <version>".to_string(),
        ));
    }

    Ok(())
}
