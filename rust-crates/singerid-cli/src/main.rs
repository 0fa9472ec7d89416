//! SingerID - identify the singer of an audio clip
//!
//! Loads the classifier once, turns the clip into a mel-spectrogram image
//! and prints the predicted artist together with the rendered spectrogram.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use singerid_cli::pipeline::render_spectrogram;
use singerid_cli::{SingerId, SingerIdConfig};
use singerid_classifier::Prediction;
use singerid_features::FeatureExtractor;

/// SingerID - singer recognition from mel-spectrograms
#[derive(Parser, Debug)]
#[command(name = "singerid")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// ONNX model, overriding the configured path
    #[arg(short, long, global = true)]
    model: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Predict the singer of an MP3 or WAV clip
    Predict {
        /// Audio file to identify
        audio: PathBuf,

        /// Keep a copy of the rendered spectrogram at this path
        #[arg(short, long)]
        save_spectrogram: Option<PathBuf>,

        /// Print the score of every label
        #[arg(long)]
        scores: bool,

        /// Print the prediction as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render the mel-spectrogram of a clip without classifying it
    Spectrogram {
        /// Audio file to render
        audio: PathBuf,

        /// Output JPEG path
        #[arg(short, long, default_value = "spectrogram.jpg")]
        output: PathBuf,
    },

    /// List the configured labels in model output order
    Labels,

    /// Show the active configuration
    Config,
}

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        Level::DEBUG
    } else if quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<SingerIdConfig> {
    match path {
        Some(path) => SingerIdConfig::load_from(path),
        None => SingerIdConfig::load(),
    }
}

fn print_prediction(prediction: &Prediction, labels: &[String], show_scores: bool) {
    println!("Singer: {}", prediction.label);
    if let Some(path) = &prediction.spectrogram_path {
        println!("Spectrogram: {}", path.display());
    }
    if show_scores {
        for (label, score) in labels.iter().zip(&prediction.scores) {
            println!("  {:>8.4}  {}", score, label);
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let config = load_config(cli.config.as_deref())?;
    info!(
        "SingerID v{} (config: {})",
        env!("CARGO_PKG_VERSION"),
        config.config_path.display()
    );

    match cli.command {
        Commands::Predict {
            audio,
            save_spectrogram,
            scores,
            json,
        } => {
            let mut singer_id = SingerId::from_config(&config, cli.model.as_deref())?;
            let labels = singer_id.context().labels().as_slice().to_vec();

            let prediction = singer_id.identify(&audio, save_spectrogram.as_deref(), |p| {
                if !json {
                    print_prediction(p, &labels, scores);
                }
                Ok(())
            })?;

            if json {
                let out = serde_json::to_string_pretty(&prediction)
                    .context("Failed to serialize prediction")?;
                println!("{}", out);
            }
        }

        Commands::Spectrogram { audio, output } => {
            let extractor = FeatureExtractor::new(config.features.clone())
                .context("Failed to create feature extractor")?;
            let tensor = render_spectrogram(&extractor, &audio, &output)?;
            println!("Spectrogram: {}", output.display());
            println!("Tensor shape: {:?}", tensor.shape());
        }

        Commands::Labels => {
            for (i, label) in config.label_set()?.iter().enumerate() {
                println!("{:>3}  {}", i, label);
            }
        }

        Commands::Config => {
            println!("# {}", config.config_path.display());
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
