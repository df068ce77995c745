//! Validation tests for the per-song majority-vote aggregator

use audio2genre::error::GenreError;
use audio2genre::vote::{argmax_row, VoteAggregator, VoteSummary};
use ndarray::Array2;

/// Build a score matrix from literal rows
fn scores(rows: &[&[f32]]) -> Array2<f32> {
    let n_cols = rows.first().map(|r| r.len()).unwrap_or(0);
    let flat: Vec<f32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
    Array2::from_shape_vec((rows.len(), n_cols), flat).unwrap()
}

/// Build one-hot label rows from class indices
fn one_hot_rows(n_classes: usize, classes: &[usize]) -> Array2<f32> {
    let mut y = Array2::zeros((classes.len(), n_classes));
    for (i, &class) in classes.iter().enumerate() {
        y[[i, class]] = 1.0;
    }
    y
}

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Run the aggregator feeding `chunk_size` rows at a time
fn run_vote(
    predictions: &Array2<f32>,
    labels: &Array2<f32>,
    songs: &[String],
    chunk_size: usize,
) -> VoteSummary {
    let mut aggregator = VoteAggregator::new();
    let n = predictions.shape()[0];
    let mut start = 0;
    while start < n {
        let end = (start + chunk_size).min(n);
        let p = predictions
            .slice(ndarray::s![start..end, ..])
            .to_owned();
        let l = labels.slice(ndarray::s![start..end, ..]).to_owned();
        aggregator.add_chunk(&p, &l, &songs[start..end]).unwrap();
        start = end;
    }
    aggregator.finish().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_correct_two_genres_four_songs() {
        // 2 genres, 4 songs each with 2 slices, every slice predicted right
        let mut prediction_rows: Vec<&[f32]> = Vec::new();
        let mut classes = Vec::new();
        let mut songs = Vec::new();

        let class0: &[f32] = &[0.9, 0.1];
        let class1: &[f32] = &[0.1, 0.9];

        for song in 0..4 {
            for _ in 0..2 {
                prediction_rows.push(class0);
                classes.push(0);
                songs.push(format!("genre0_song{}", song));
            }
        }
        for song in 0..4 {
            for _ in 0..2 {
                prediction_rows.push(class1);
                classes.push(1);
                songs.push(format!("genre1_song{}", song));
            }
        }

        let predictions = scores(&prediction_rows);
        let labels = one_hot_rows(2, &classes);
        let summary = run_vote(&predictions, &labels, &songs, 1000);

        assert_eq!(summary.total_slices, 16);
        assert_eq!(summary.total_songs, 8);
        assert_eq!(summary.slice_accuracy, 1.0);
        assert_eq!(summary.song_accuracy, 1.0);
    }

    #[test]
    fn test_majority_two_vs_one() {
        // One song with slices [A, A, B], true label A: majority is A
        let predictions = scores(&[&[0.8, 0.2], &[0.7, 0.3], &[0.4, 0.6]]);
        let labels = one_hot_rows(2, &[0, 0, 0]);
        let songs = ids(&["song", "song", "song"]);

        let summary = run_vote(&predictions, &labels, &songs, 1000);
        assert_eq!(summary.total_songs, 1);
        assert_eq!(summary.song_accuracy, 1.0);
        assert!((summary.slice_accuracy - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_every_majority_wrong_scores_zero() {
        let predictions = scores(&[&[0.1, 0.9], &[0.2, 0.8], &[0.9, 0.1], &[0.8, 0.2]]);
        let labels = one_hot_rows(2, &[0, 0, 1, 1]);
        let songs = ids(&["a", "a", "b", "b"]);

        let summary = run_vote(&predictions, &labels, &songs, 1000);
        assert_eq!(summary.song_accuracy, 0.0);
        assert_eq!(summary.slice_accuracy, 0.0);
    }

    #[test]
    fn test_slice_accuracy_matches_independent_count() {
        // 5 slices, 3 predicted correctly
        let predictions = scores(&[
            &[0.9, 0.1, 0.0],
            &[0.1, 0.8, 0.1],
            &[0.2, 0.2, 0.6],
            &[0.5, 0.4, 0.1],
            &[0.3, 0.3, 0.4],
        ]);
        let labels = one_hot_rows(3, &[0, 1, 0, 1, 2]);
        let songs = ids(&["p", "q", "r", "s", "t"]);

        let summary = run_vote(&predictions, &labels, &songs, 1000);
        assert!((summary.slice_accuracy - 3.0 / 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_chunk_size_invariance() {
        let predictions = scores(&[
            &[0.9, 0.1],
            &[0.4, 0.6],
            &[0.3, 0.7],
            &[0.8, 0.2],
            &[0.6, 0.4],
            &[0.2, 0.8],
            &[0.7, 0.3],
        ]);
        let labels = one_hot_rows(2, &[0, 0, 1, 1, 0, 1, 0]);
        let songs = ids(&["a", "a", "b", "b", "a", "b", "c"]);

        let reference = run_vote(&predictions, &labels, &songs, 7);
        for chunk_size in [1, 2, 3, 5, 100] {
            let summary = run_vote(&predictions, &labels, &songs, chunk_size);
            assert_eq!(summary, reference, "chunk size {} diverged", chunk_size);
        }
    }

    #[test]
    fn test_vote_tie_breaks_to_lowest_class() {
        // One vote each for class 2 and class 0: class 0 must win
        let predictions = scores(&[&[0.1, 0.2, 0.7], &[0.7, 0.2, 0.1]]);
        let labels = one_hot_rows(3, &[0, 0]);
        let songs = ids(&["song", "song"]);

        let summary = run_vote(&predictions, &labels, &songs, 1000);
        assert_eq!(summary.song_accuracy, 1.0);

        // Same tally but true label 2: the tie still resolves to class 0
        let labels = one_hot_rows(3, &[2, 2]);
        let summary = run_vote(&predictions, &labels, &songs, 1000);
        assert_eq!(summary.song_accuracy, 0.0);
    }

    #[test]
    fn test_tie_break_reproducible_across_orderings() {
        // The winning class only depends on the tally, not insertion order
        let forward = scores(&[&[0.1, 0.2, 0.7], &[0.7, 0.2, 0.1]]);
        let reverse = scores(&[&[0.7, 0.2, 0.1], &[0.1, 0.2, 0.7]]);
        let labels = one_hot_rows(3, &[0, 0]);
        let songs = ids(&["song", "song"]);

        let a = run_vote(&forward, &labels, &songs, 1000);
        let b = run_vote(&reverse, &labels, &songs, 1000);
        assert_eq!(a.song_accuracy, b.song_accuracy);
        assert_eq!(a.song_accuracy, 1.0);
    }

    #[test]
    fn test_empty_vote_partition_is_an_error() {
        let aggregator = VoteAggregator::new();
        let err = aggregator.finish().unwrap_err();
        assert!(matches!(err, GenreError::EmptyDataset(_)));
    }

    #[test]
    fn test_mismatched_chunk_lengths_rejected() {
        let mut aggregator = VoteAggregator::new();
        let predictions = scores(&[&[0.9, 0.1]]);
        let labels = one_hot_rows(2, &[0, 1]);
        let songs = ids(&["song"]);

        let err = aggregator
            .add_chunk(&predictions, &labels, &songs)
            .unwrap_err();
        assert!(matches!(err, GenreError::InputValidationError(_)));
    }

    #[test]
    fn test_argmax_prefers_first_maximum() {
        assert_eq!(argmax_row(&[0.5, 0.5]), 0);
        assert_eq!(argmax_row(&[0.1, 0.9, 0.9]), 1);
    }
}
