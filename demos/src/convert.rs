//! Conversion of PyTorch checkpoints into Burn records.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use burn::prelude::*;
use u2net_burn::{load_pytorch_record, U2NetConfig};

/// Reads the PyTorch state dict at `input` into a model built from `config` and
/// saves it as a named MessagePack record at `output`.
///
/// Returns the path actually written, which always ends in `.mpk`.
pub fn convert_checkpoint<B: Backend>(
    config: &U2NetConfig,
    input: &Path,
    output: impl Into<PathBuf>,
    device: &B::Device,
) -> Result<PathBuf> {
    tracing::info!(input = %input.display(), "reading PyTorch checkpoint");

    let model = config.init::<B>(device)?;
    let record = load_pytorch_record::<B>(input, device)
        .with_context(|| format!("failed to convert {}", input.display()))?;
    let model = model.load_record(record);
    let parameters = model.num_params();

    let written = model.save_weights(output)?;
    tracing::info!(output = %written.display(), parameters, "checkpoint converted");
    Ok(written)
}
