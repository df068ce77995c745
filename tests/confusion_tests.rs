//! Validation tests for the genre confusion matrix

use audio2genre::confusion::ConfusionMatrix;
use audio2genre::error::GenreError;
use ndarray::Array2;

fn scores(rows: &[&[f32]]) -> Array2<f32> {
    let n_cols = rows.first().map(|r| r.len()).unwrap_or(0);
    let flat: Vec<f32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
    Array2::from_shape_vec((rows.len(), n_cols), flat).unwrap()
}

fn one_hot_rows(n_classes: usize, classes: &[usize]) -> Array2<f32> {
    let mut y = Array2::zeros((classes.len(), n_classes));
    for (i, &class) in classes.iter().enumerate() {
        y[[i, class]] = 1.0;
    }
    y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_land_in_actual_by_predicted_cells() {
        let mut matrix = ConfusionMatrix::new(3);
        let predictions = scores(&[
            &[0.9, 0.1, 0.0], // predicted 0
            &[0.1, 0.8, 0.1], // predicted 1
            &[0.1, 0.7, 0.2], // predicted 1
            &[0.2, 0.2, 0.6], // predicted 2
        ]);
        let labels = one_hot_rows(3, &[0, 1, 0, 2]);
        matrix.add_chunk(&predictions, &labels).unwrap();

        assert_eq!(matrix.counts()[[0, 0]], 1);
        assert_eq!(matrix.counts()[[1, 1]], 1);
        assert_eq!(matrix.counts()[[0, 1]], 1);
        assert_eq!(matrix.counts()[[2, 2]], 1);
        assert_eq!(matrix.total(), 4);
        assert!((matrix.accuracy().unwrap() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_chunked_accumulation_matches_single_pass() {
        let predictions = scores(&[
            &[0.9, 0.1],
            &[0.4, 0.6],
            &[0.3, 0.7],
            &[0.8, 0.2],
            &[0.6, 0.4],
        ]);
        let labels = one_hot_rows(2, &[0, 1, 0, 1, 0]);

        let mut single = ConfusionMatrix::new(2);
        single.add_chunk(&predictions, &labels).unwrap();

        let mut chunked = ConfusionMatrix::new(2);
        for start in 0..predictions.shape()[0] {
            let p = predictions.slice(ndarray::s![start..start + 1, ..]).to_owned();
            let l = labels.slice(ndarray::s![start..start + 1, ..]).to_owned();
            chunked.add_chunk(&p, &l).unwrap();
        }

        assert_eq!(single.counts(), chunked.counts());
    }

    #[test]
    fn test_accuracy_on_empty_matrix_is_an_error() {
        let matrix = ConfusionMatrix::new(4);
        let err = matrix.accuracy().unwrap_err();
        assert!(matches!(err, GenreError::EmptyDataset(_)));
    }

    #[test]
    fn test_mismatched_chunk_lengths_rejected() {
        let mut matrix = ConfusionMatrix::new(2);
        let predictions = scores(&[&[0.9, 0.1]]);
        let labels = one_hot_rows(2, &[0, 1]);

        let err = matrix.add_chunk(&predictions, &labels).unwrap_err();
        assert!(matches!(err, GenreError::InputValidationError(_)));
    }

    #[test]
    fn test_render_includes_genre_labels_and_counts() {
        let mut matrix = ConfusionMatrix::new(2);
        let predictions = scores(&[&[0.9, 0.1], &[0.1, 0.9], &[0.9, 0.1]]);
        let labels = one_hot_rows(2, &[0, 1, 1]);
        matrix.add_chunk(&predictions, &labels).unwrap();

        let table = matrix.render(&["jazz".to_string(), "rock".to_string()]);
        assert!(table.contains("jazz"));
        assert!(table.contains("rock"));
        // Two rows of counts beneath the header
        assert_eq!(table.lines().count(), 3);
    }
}
