use audio2genre::{Action, AudioToGenre, Config, RunOptions};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Music Genre Classification from Spectrogram Slices
#[derive(Parser)]
#[command(name = "audio2genre")]
#[command(about = "Train and run a CNN genre classifier over spectrogram slices")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Actions to run, in order
    #[arg(required = true, value_enum)]
    mode: Vec<ModeArg>,

    /// Checkpoint version to continue training from
    #[arg(long)]
    resume: Option<String>,

    /// Epoch count override when resuming
    #[arg(long)]
    epochs: Option<usize>,

    /// Custom configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Slice,
    Train,
    Continue,
    Test,
    Confusionmatrix,
    Vote,
    Showconfig,
}

impl From<ModeArg> for Action {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Slice => Action::Slice,
            ModeArg::Train => Action::Train,
            ModeArg::Continue => Action::Continue,
            ModeArg::Test => Action::Test,
            ModeArg::Confusionmatrix => Action::ConfusionMatrix,
            ModeArg::Vote => Action::Vote,
            ModeArg::Showconfig => Action::ShowConfig,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = if let Some(config_path) = cli.config {
        audio2genre::config::load_config(config_path)?
    } else {
        Config::default()
    };
    audio2genre::config::validate_config(&config)?;

    let actions: Vec<Action> = cli.mode.iter().map(|&m| m.into()).collect();
    let options = RunOptions {
        resume: cli.resume,
        epochs: cli.epochs,
        quiet: cli.quiet,
    };

    let processor = AudioToGenre::new(config);
    processor.run(&actions, &options)?;

    Ok(())
}
