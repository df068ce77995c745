//! Per-song majority voting over slice-level predictions
//!
//! Slice predictions arrive in chunks (chunking bounds peak memory and never
//! changes the result). Each slice casts one vote for its predicted class in
//! its song's tally; once all slices are in, every song takes the class with
//! the most votes. Ties go to the lowest class index, so a run over the same
//! slice order always reproduces the same verdicts.

use crate::error::{GenreError, Result};
use ndarray::Array2;
use std::collections::HashMap;

/// Index of the first maximum value in a score row
///
/// Ties resolve to the lowest index; this is the tie-break the whole
/// pipeline relies on for reproducibility.
pub fn argmax_row(row: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in row.iter().enumerate() {
        if v > row[best] {
            best = i;
        }
    }
    best
}

/// Accuracy figures computed after all slices are tallied
#[derive(Debug, Clone, PartialEq)]
pub struct VoteSummary {
    /// Fraction of slices whose predicted class matched their label
    pub slice_accuracy: f32,
    /// Fraction of songs whose majority class matched their label
    pub song_accuracy: f32,
    pub total_slices: usize,
    pub total_songs: usize,
}

/// Incremental tally of slice predictions grouped by song
#[derive(Debug, Default)]
pub struct VoteAggregator {
    /// song -> predicted class -> number of slices voting for it
    tally: HashMap<String, HashMap<usize, usize>>,
    /// song -> true class; every slice of a song carries the same label,
    /// so the last write is authoritative
    actual_class: HashMap<String, usize>,
    correct_slices: usize,
    total_slices: usize,
}

impl VoteAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tally one chunk of (prediction row, one-hot label row, song id) triples
    pub fn add_chunk(
        &mut self,
        predictions: &Array2<f32>,
        labels: &Array2<f32>,
        song_ids: &[String],
    ) -> Result<()> {
        let n = predictions.shape()[0];
        if labels.shape()[0] != n || song_ids.len() != n {
            return Err(GenreError::InputValidationError(format!(
                "Chunk length mismatch: {} predictions, {} labels, {} song ids",
                n,
                labels.shape()[0],
                song_ids.len()
            )));
        }

        for i in 0..n {
            let prediction = predictions.row(i);
            let label = labels.row(i);
            let song = &song_ids[i];

            let predicted_class = argmax_row(prediction.as_slice().unwrap_or(&[]));
            let actual_class = argmax_row(label.as_slice().unwrap_or(&[]));

            if predicted_class == actual_class {
                self.correct_slices += 1;
            }
            self.total_slices += 1;

            *self
                .tally
                .entry(song.clone())
                .or_default()
                .entry(predicted_class)
                .or_insert(0) += 1;
            self.actual_class.insert(song.clone(), actual_class);
        }

        Ok(())
    }

    /// Resolve every song's majority class and compute both accuracies
    pub fn finish(self) -> Result<VoteSummary> {
        if self.total_slices == 0 || self.tally.is_empty() {
            return Err(GenreError::EmptyDataset(
                "Vote partition holds no slices".to_string(),
            ));
        }

        let total_songs = self.tally.len();
        let mut correct_songs = 0;

        for (song, counts) in &self.tally {
            let voted = most_voted_class(counts);
            if self.actual_class.get(song) == Some(&voted) {
                correct_songs += 1;
            }
        }

        Ok(VoteSummary {
            slice_accuracy: self.correct_slices as f32 / self.total_slices as f32,
            song_accuracy: correct_songs as f32 / total_songs as f32,
            total_slices: self.total_slices,
            total_songs,
        })
    }
}

/// Class with the highest vote count; ties go to the lowest class index
fn most_voted_class(counts: &HashMap<usize, usize>) -> usize {
    let mut classes: Vec<(usize, usize)> = counts.iter().map(|(&c, &n)| (c, n)).collect();
    classes.sort_by_key(|&(class, _)| class);

    let mut best_class = 0;
    let mut best_count = 0;
    for (class, count) in classes {
        if count > best_count {
            best_class = class;
            best_count = count;
        }
    }
    best_class
}
