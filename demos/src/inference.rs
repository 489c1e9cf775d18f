use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    tensor::{
        module::interpolate,
        ops::{InterpolateMode, InterpolateOptions},
    },
};
use u2net_burn::{U2Net, U2NetConfig, U2NetVariant};

use crate::image::{apply_imagenet_normalization, is_supported_image_format, load_image, mask_to_image};

/// Side length of the square model input used by the published checkpoints.
pub const DEFAULT_INPUT_SIZE: usize = 320;

/// Where the model architecture comes from.
#[derive(Debug, Clone)]
pub enum ModelSource {
    /// One of the built-in presets.
    Variant(U2NetVariant),
    /// A JSON configuration file.
    ConfigFile(PathBuf),
}

impl ModelSource {
    /// Resolves the architecture into a validated configuration.
    ///
    /// `out_channels` only applies to presets; a configuration file carries its own.
    pub fn config(&self, out_channels: usize) -> Result<U2NetConfig> {
        match self {
            Self::Variant(variant) => Ok(variant.config(out_channels)),
            Self::ConfigFile(path) => U2NetConfig::from_file(path)
                .with_context(|| format!("failed to read model configuration {}", path.display())),
        }
    }
}

/// Inference configuration.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Input path (file or directory).
    pub input_path: PathBuf,
    /// Output directory.
    pub output_path: PathBuf,
    /// Model architecture.
    pub source: ModelSource,
    /// Optional weight file; without one the model keeps its random initialization.
    pub weights: Option<PathBuf>,
    /// Side length the images are resized to before the forward pass.
    pub input_size: usize,
}

impl InferenceConfig {
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        source: ModelSource,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            source,
            weights: None,
            input_size: DEFAULT_INPUT_SIZE,
        }
    }

    pub fn with_weights(mut self, weights: Option<PathBuf>) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_input_size(mut self, input_size: usize) -> Self {
        self.input_size = input_size;
        self
    }
}

/// Builds the model described by `config`, loading its weights when given.
pub fn load_model<B: Backend>(config: &InferenceConfig, device: &B::Device) -> Result<U2Net<B>> {
    let model = config.source.config(1)?.init::<B>(device)?;

    match &config.weights {
        Some(path) => {
            let model = model.load_weights(path, device)?;
            tracing::info!(path = %path.display(), "weights loaded");
            Ok(model)
        }
        None => {
            tracing::warn!("no weights given, predicting with random initialization");
            Ok(model)
        }
    }
}

/// Runs U2-Net on an image or a directory of images and writes one mask per image.
///
/// # Errors
///
/// Returns an error if the model cannot be built, the input path does not
/// exist, or a single input image fails to process. Failures inside a
/// directory are logged and skipped.
pub fn run_inference<B: Backend>(config: &InferenceConfig, device: &B::Device) -> Result<Vec<PathBuf>> {
    tracing::info!(
        input = %config.input_path.display(),
        output = %config.output_path.display(),
        size = config.input_size,
        "running inference",
    );

    if config.input_size == 0 {
        anyhow::bail!("Input size must be greater than 0");
    }

    let model = load_model::<B>(config, device)?;

    fs::create_dir_all(&config.output_path).with_context(|| {
        format!(
            "failed to create output directory {}",
            config.output_path.display()
        )
    })?;

    let written = if config.input_path.is_file() {
        vec![process_single_image(
            &model,
            &config.input_path,
            &config.output_path,
            config.input_size,
            device,
        )?]
    } else if config.input_path.is_dir() {
        process_directory(
            &model,
            &config.input_path,
            &config.output_path,
            config.input_size,
            device,
        )?
    } else {
        anyhow::bail!(
            "Input path does not exist: {}",
            config.input_path.display()
        );
    };

    tracing::info!(count = written.len(), "inference completed");
    Ok(written)
}

/// Predicts the mask of a single image and saves it as `<stem>_mask.png`.
fn process_single_image<B: Backend>(
    model: &U2Net<B>,
    input_path: &Path,
    output_dir: &Path,
    input_size: usize,
    device: &B::Device,
) -> Result<PathBuf> {
    tracing::info!(path = %input_path.display(), "processing image");

    let image = load_image::<B>(input_path, device)?;
    let [_, _, h, w] = image.dims();

    let image = interpolate(
        apply_imagenet_normalization(image)?,
        [input_size, input_size],
        InterpolateOptions::new(InterpolateMode::Bilinear),
    );

    let mask = model.predict(image)?;
    let mask = interpolate(
        mask,
        [h, w],
        InterpolateOptions::new(InterpolateMode::Bilinear),
    );

    let file_stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let output_path = output_dir.join(format!("{file_stem}_mask.png"));

    mask_to_image(mask)?
        .save(&output_path)
        .with_context(|| format!("failed to save {}", output_path.display()))?;

    tracing::info!(path = %output_path.display(), "saved result");
    Ok(output_path)
}

fn process_directory<B: Backend>(
    model: &U2Net<B>,
    input_dir: &Path,
    output_dir: &Path,
    input_size: usize,
    device: &B::Device,
) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(input_dir)
        .with_context(|| format!("failed to read directory {}", input_dir.display()))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file() && is_supported_image_format(path))
        .collect();
    paths.sort();

    let mut written = Vec::with_capacity(paths.len());
    for path in paths {
        match process_single_image(model, &path, output_dir, input_size, device) {
            Ok(output) => written.push(output),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to process image");
            }
        }
    }

    Ok(written)
}
