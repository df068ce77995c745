//! Model adapter boundary
//!
//! The orchestrator and the vote/confusion logic only see the [`GenreModel`]
//! trait, so they can run against a stub backend in tests. [`CnnModel`] is
//! the real implementation on top of tch (libtorch): four conv/ELU/max-pool
//! blocks widening 64 -> 512, a 1024-unit fully connected layer, dropout and
//! a softmax output, trained with RMSprop.
//!
//! Inputs cross the boundary as ndarray tensors shaped (n, height, width,
//! depth) with one-hot label rows; the adapter converts to NCHW tensors
//! internally.

use crate::config::{Config, TrainingConfig};
use crate::error::{GenreError, Result};
use ndarray::{Array2, Array4};
use rand::Rng;
use std::path::{Path, PathBuf};
use tch::nn::{ModuleT, OptimizerConfig};
use tch::{nn, Device, Kind, Tensor};

/// Summary of one training run
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub run_id: String,
    pub epochs_run: usize,
    pub final_loss: f64,
    pub validation_accuracy: f32,
}

/// Narrow interface over the external ML backend
pub trait GenreModel {
    /// Fit on the training partition, reporting validation accuracy
    fn train(
        &mut self,
        x: &Array4<f32>,
        y: &Array2<f32>,
        epochs: usize,
        batch_size: usize,
        validation: (&Array4<f32>, &Array2<f32>),
    ) -> Result<TrainingReport>;

    /// Class scores, one row per input slice
    fn predict(&self, x: &Array4<f32>) -> Result<Array2<f32>>;

    /// Fraction of inputs whose top class matches the one-hot label
    fn evaluate(&self, x: &Array4<f32>, y: &Array2<f32>) -> Result<f32>;

    fn save(&self, path: &Path) -> Result<()>;

    fn load(&mut self, path: &Path) -> Result<()>;
}

/// Path of a checkpoint artifact under the configured checkpoint directory
pub fn checkpoint_file(config: &Config, stem: &str) -> PathBuf {
    config.paths.checkpoint_path.join(format!("{}.ot", stem))
}

/// Human-readable id for one training run
fn generate_run_id(batch_size: usize, epochs: usize) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..10)
        .map(|_| rng.gen_range(b'A'..=b'Z') as char)
        .collect();
    format!("MusicGenres-{}x{}-{}", batch_size, epochs, suffix)
}

/// Convolutional classifier backed by tch
pub struct CnnModel {
    vs: nn::VarStore,
    net: nn::SequentialT,
    num_classes: usize,
    learning_rate: f64,
}

impl CnnModel {
    /// Build the network graph for the given class count and slice geometry
    pub fn new(
        num_classes: usize,
        width: usize,
        height: usize,
        depth: usize,
        training: &TrainingConfig,
    ) -> Result<Self> {
        if num_classes == 0 {
            return Err(GenreError::InvalidConfigParameter(
                "Model needs at least one class".to_string(),
            ));
        }

        let vs = nn::VarStore::new(Device::cuda_if_available());
        let net = build_network(
            &vs.root(),
            num_classes as i64,
            height as i64,
            width as i64,
            depth as i64,
            training.dropout,
        );

        Ok(Self {
            vs,
            net,
            num_classes,
            learning_rate: training.learning_rate,
        })
    }

    /// Convert (n, h, w, d) slice tensors to an NCHW input tensor
    fn input_tensor(&self, x: &Array4<f32>) -> Result<Tensor> {
        let t = Tensor::try_from(x.as_standard_layout())
            .map_err(|e| GenreError::ModelBackend(format!("Tensor conversion: {}", e)))?;
        Ok(t.permute([0, 3, 1, 2]).to_device(self.vs.device()))
    }

    /// Convert one-hot label rows to a class-index target tensor
    fn target_tensor(&self, y: &Array2<f32>) -> Tensor {
        let classes: Vec<i64> = y
            .rows()
            .into_iter()
            .map(|row| {
                let mut best = 0;
                for (i, &v) in row.iter().enumerate() {
                    if v > row[best] {
                        best = i;
                    }
                }
                best as i64
            })
            .collect();
        Tensor::from_slice(&classes).to_device(self.vs.device())
    }
}

impl GenreModel for CnnModel {
    fn train(
        &mut self,
        x: &Array4<f32>,
        y: &Array2<f32>,
        epochs: usize,
        batch_size: usize,
        validation: (&Array4<f32>, &Array2<f32>),
    ) -> Result<TrainingReport> {
        let n = x.shape()[0] as i64;
        if n == 0 {
            return Err(GenreError::EmptyDataset(
                "Training partition holds no slices".to_string(),
            ));
        }

        let x_t = self.input_tensor(x)?;
        let y_t = self.target_tensor(y);
        let val_x = self.input_tensor(validation.0)?;
        let val_y = self.target_tensor(validation.1);

        let mut opt = nn::RmsProp::default()
            .build(&self.vs, self.learning_rate)
            .map_err(|e| GenreError::ModelBackend(format!("Optimizer: {}", e)))?;

        let batch = batch_size as i64;
        let mut final_loss = 0.0;
        let mut validation_accuracy = 0.0;

        for epoch in 0..epochs {
            let perm = Tensor::randperm(n, (Kind::Int64, self.vs.device()));
            let x_shuffled = x_t.index_select(0, &perm);
            let y_shuffled = y_t.index_select(0, &perm);

            let mut epoch_loss = 0.0;
            let mut n_batches = 0;

            let mut start = 0;
            while start < n {
                let len = batch.min(n - start);
                let batch_x = x_shuffled.narrow(0, start, len);
                let batch_y = y_shuffled.narrow(0, start, len);

                let logits = self.net.forward_t(&batch_x, true);
                let loss = logits.cross_entropy_for_logits(&batch_y);
                opt.backward_step(&loss);

                epoch_loss += loss.double_value(&[]);
                n_batches += 1;
                start += len;
            }

            final_loss = epoch_loss / n_batches.max(1) as f64;
            validation_accuracy = tch::no_grad(|| {
                let logits = self.net.forward_t(&val_x, false);
                let correct = logits.argmax(-1, false).eq_tensor(&val_y);
                correct.to_kind(Kind::Float).mean(Kind::Float).double_value(&[]) as f32
            });

            println!(
                "Epoch {}/{} - loss: {:.4} - val accuracy: {:.2}%",
                epoch + 1,
                epochs,
                final_loss,
                validation_accuracy * 100.0
            );
        }

        Ok(TrainingReport {
            run_id: generate_run_id(batch_size, epochs),
            epochs_run: epochs,
            final_loss,
            validation_accuracy,
        })
    }

    fn predict(&self, x: &Array4<f32>) -> Result<Array2<f32>> {
        let n = x.shape()[0];
        let x_t = self.input_tensor(x)?;

        let scores = tch::no_grad(|| {
            self.net
                .forward_t(&x_t, false)
                .softmax(-1, Kind::Float)
                .to_device(Device::Cpu)
                .contiguous()
        });

        let flat_view = scores.view(-1);
        let flat: Vec<f32> = Vec::try_from(&flat_view)
            .map_err(|e| GenreError::ModelBackend(format!("Tensor readback: {}", e)))?;

        Array2::from_shape_vec((n, self.num_classes), flat)
            .map_err(|e| GenreError::ModelBackend(format!("Score reshape: {}", e)))
    }

    fn evaluate(&self, x: &Array4<f32>, y: &Array2<f32>) -> Result<f32> {
        let n = x.shape()[0] as i64;
        if n == 0 {
            return Err(GenreError::EmptyDataset(
                "Evaluation partition holds no slices".to_string(),
            ));
        }

        let x_t = self.input_tensor(x)?;
        let y_t = self.target_tensor(y);

        let accuracy = tch::no_grad(|| {
            let logits = self.net.forward_t(&x_t, false);
            let correct = logits.argmax(-1, false).eq_tensor(&y_t);
            correct.to_kind(Kind::Float).mean(Kind::Float).double_value(&[])
        });

        Ok(accuracy as f32)
    }

    fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| GenreError::CheckpointIo(e.to_string()))?;
        }
        self.vs
            .save(path)
            .map_err(|e| GenreError::CheckpointIo(format!("{}: {}", path.display(), e)))
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        self.vs
            .load(path)
            .map_err(|e| GenreError::CheckpointIo(format!("{}: {}", path.display(), e)))
    }
}

/// Conv 64/128/256/512 with ELU and 2x2 max-pooling, FC 1024, dropout, logits
fn build_network(
    root: &nn::Path,
    num_classes: i64,
    height: i64,
    width: i64,
    depth: i64,
    dropout: f64,
) -> nn::SequentialT {
    let conv_cfg = nn::ConvConfig {
        padding: 1,
        ..Default::default()
    };

    // conv k=2 p=1 grows each side by one, the 2x2 pool then halves it
    let block_out = |n: i64| (n + 1) / 2;
    let (mut h, mut w) = (height, width);
    for _ in 0..4 {
        h = block_out(h);
        w = block_out(w);
    }
    let flat_dim = 512 * h * w;

    nn::seq_t()
        .add(nn::conv2d(root / "conv1", depth, 64, 2, conv_cfg))
        .add_fn(|x| x.elu())
        .add_fn(|x| x.max_pool2d_default(2))
        .add(nn::conv2d(root / "conv2", 64, 128, 2, conv_cfg))
        .add_fn(|x| x.elu())
        .add_fn(|x| x.max_pool2d_default(2))
        .add(nn::conv2d(root / "conv3", 128, 256, 2, conv_cfg))
        .add_fn(|x| x.elu())
        .add_fn(|x| x.max_pool2d_default(2))
        .add(nn::conv2d(root / "conv4", 256, 512, 2, conv_cfg))
        .add_fn(|x| x.elu())
        .add_fn(|x| x.max_pool2d_default(2))
        .add_fn(|x| x.flat_view())
        .add(nn::linear(root / "fc1", flat_dim, 1024, Default::default()))
        .add_fn(|x| x.elu())
        .add_fn_t(move |x, train| x.dropout(dropout, train))
        .add(nn::linear(root / "out", 1024, num_classes, Default::default()))
}
