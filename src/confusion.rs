//! Genre confusion matrix over chunked test predictions

use crate::error::{GenreError, Result};
use crate::vote::argmax_row;
use ndarray::Array2;
use plotters::prelude::*;
use std::path::Path;

/// Genre x genre contingency table, rows = actual, columns = predicted
#[derive(Debug, Clone)]
pub struct ConfusionMatrix {
    counts: Array2<u64>,
}

impl ConfusionMatrix {
    pub fn new(num_classes: usize) -> Self {
        Self {
            counts: Array2::zeros((num_classes, num_classes)),
        }
    }

    pub fn num_classes(&self) -> usize {
        self.counts.shape()[0]
    }

    pub fn counts(&self) -> &Array2<u64> {
        &self.counts
    }

    /// Accumulate one chunk of prediction and one-hot label rows
    pub fn add_chunk(&mut self, predictions: &Array2<f32>, labels: &Array2<f32>) -> Result<()> {
        let n = predictions.shape()[0];
        if labels.shape()[0] != n {
            return Err(GenreError::InputValidationError(format!(
                "Chunk length mismatch: {} predictions, {} labels",
                n,
                labels.shape()[0]
            )));
        }

        for i in 0..n {
            let predicted = argmax_row(predictions.row(i).as_slice().unwrap_or(&[]));
            let actual = argmax_row(labels.row(i).as_slice().unwrap_or(&[]));
            self.counts[[actual, predicted]] += 1;
        }

        Ok(())
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Fraction of examples on the diagonal
    pub fn accuracy(&self) -> Result<f32> {
        let total = self.total();
        if total == 0 {
            return Err(GenreError::EmptyDataset(
                "Confusion matrix holds no examples".to_string(),
            ));
        }
        let diagonal: u64 = (0..self.num_classes())
            .map(|i| self.counts[[i, i]])
            .sum();
        Ok(diagonal as f32 / total as f32)
    }

    /// Render an aligned text table with genre labels
    pub fn render(&self, genres: &[String]) -> String {
        let label = |i: usize| -> String {
            let name = genres.get(i).map(|g| g.as_str()).unwrap_or("?");
            let mut short = name.to_string();
            short.truncate(8);
            short
        };

        let mut out = String::new();
        out.push_str(&format!("{:>10}", "actual\\pred"));
        for i in 0..self.num_classes() {
            out.push_str(&format!(" {:>8}", label(i)));
        }
        out.push('\n');

        for row in 0..self.num_classes() {
            out.push_str(&format!("{:>10}", label(row)));
            for col in 0..self.num_classes() {
                out.push_str(&format!(" {:>8}", self.counts[[row, col]]));
            }
            out.push('\n');
        }

        out
    }

    /// Save a heatmap rendering of the matrix
    pub fn save_heatmap(&self, path: &Path, genres: &[String]) -> Result<()> {
        let n = self.num_classes();
        let root = BitMapBackend::new(path, (900, 800)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| {
            GenreError::ReportExportError(format!("Failed to fill plot background: {:?}", e))
        })?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Genre Confusion Matrix", ("sans-serif", 30))
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(80)
            .build_cartesian_2d(0..n, 0..n)
            .map_err(|e| {
                GenreError::ReportExportError(format!("Failed to build chart: {:?}", e))
            })?;

        let genre_label = |idx: &usize| -> String {
            genres.get(*idx).cloned().unwrap_or_else(|| idx.to_string())
        };

        chart
            .configure_mesh()
            .x_desc("Predicted")
            .y_desc("Actual")
            .x_label_formatter(&genre_label)
            .y_label_formatter(&genre_label)
            .draw()
            .map_err(|e| GenreError::ReportExportError(format!("Failed to draw mesh: {:?}", e)))?;

        let max_count = self.counts.iter().cloned().max().unwrap_or(0).max(1);

        chart
            .draw_series((0..n).flat_map(|row| {
                let counts = &self.counts;
                (0..n).map(move |col| {
                    let intensity = counts[[row, col]] as f64 / max_count as f64;
                    let shade = (255.0 * (1.0 - intensity)) as u8;
                    Rectangle::new(
                        [(col, n - 1 - row), (col + 1, n - row)],
                        RGBColor(255, shade, shade).filled(),
                    )
                })
            }))
            .map_err(|e| {
                GenreError::ReportExportError(format!("Failed to draw heatmap: {:?}", e))
            })?;

        root.present()
            .map_err(|e| GenreError::ReportExportError(format!("Failed to write plot: {:?}", e)))?;

        Ok(())
    }
}
