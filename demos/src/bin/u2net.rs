use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::config::Config;
use clap::{Parser, Subcommand};
use tracing_subscriber::{prelude::*, EnvFilter};
use u2net_burn::{U2NetConfig, U2NetVariant};
use u2net_demos::{
    create_device, get_backend_name,
    inference::{run_inference, InferenceConfig, ModelSource, DEFAULT_INPUT_SIZE},
    summary::preset_summaries,
    SelectedBackend,
};

#[derive(Parser)]
#[command(name = "u2net")]
#[command(about = "U2-Net: nested U-structure for salient object detection")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show backend information and the preset family
    Info {
        /// Print the preset table as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the configuration of a preset as JSON
    Config {
        /// Preset name (e.g. "full", "prune-m", "prune-l")
        #[arg(short, long, default_value = "full")]
        variant: U2NetVariant,

        /// Number of predicted channels
        #[arg(long, default_value_t = 1)]
        out_channels: usize,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Predict saliency masks for images
    Infer {
        /// Input image path or directory
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory for masks
        #[arg(short, long)]
        output: PathBuf,

        /// Preset name
        #[arg(short, long, default_value = "full", conflicts_with = "config")]
        variant: U2NetVariant,

        /// Model configuration file, instead of a preset
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Weight file (.mpk, .bin, or .pth with the `import` feature)
        #[arg(short, long)]
        weights: Option<PathBuf>,

        /// Side length images are resized to before inference
        #[arg(long, default_value_t = DEFAULT_INPUT_SIZE)]
        size: usize,
    },

    /// Convert a PyTorch checkpoint to a Burn record
    #[cfg(feature = "import")]
    Convert {
        /// PyTorch checkpoint (.pth)
        #[arg(short, long)]
        input: PathBuf,

        /// Output record; the `.mpk` extension is added
        #[arg(short, long)]
        output: PathBuf,

        /// Preset the checkpoint was trained with
        #[arg(short, long, default_value = "full")]
        variant: U2NetVariant,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let device = create_device();
    tracing::debug!(backend = get_backend_name(), "device ready");

    match cli.command {
        Commands::Info { json } => {
            let summaries = preset_summaries::<SelectedBackend>(&device)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
                return Ok(());
            }

            println!("U2-Net Information:");
            println!("  Backend: {}", get_backend_name());
            println!("  Device: {device:?}");
            println!("  Presets:");
            for summary in summaries {
                println!(
                    "    {:<12} pruned {:>5.1}%  {:>10} parameters",
                    summary.name,
                    summary.pruning_ratio * 100.0,
                    summary.parameters
                );
            }
            Ok(())
        }

        Commands::Config {
            variant,
            out_channels,
            output,
        } => {
            let config: U2NetConfig = variant.config(out_channels);
            config.validate()?;
            config
                .save(&output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            tracing::info!(variant = %variant, path = %output.display(), "configuration written");
            Ok(())
        }

        Commands::Infer {
            input,
            output,
            variant,
            config,
            weights,
            size,
        } => {
            let source = match config {
                Some(path) => ModelSource::ConfigFile(path),
                None => ModelSource::Variant(variant),
            };
            let inference_config = InferenceConfig::new(input, output, source)
                .with_weights(weights)
                .with_input_size(size);

            run_inference::<SelectedBackend>(&inference_config, &device)?;
            Ok(())
        }

        #[cfg(feature = "import")]
        Commands::Convert {
            input,
            output,
            variant,
        } => {
            use u2net_demos::convert::convert_checkpoint;

            convert_checkpoint::<SelectedBackend>(&variant.config(1), &input, output, &device)?;
            Ok(())
        }
    }
}
