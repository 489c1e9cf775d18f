//! Size summaries of the preset family.

use burn::prelude::*;
use serde::Serialize;
use u2net_burn::{U2NetResult, U2NetVariant};

/// Size summary of one preset.
#[derive(Debug, Clone, Serialize)]
pub struct PresetSummary {
    pub name: String,
    pub pruning_ratio: f64,
    pub parameters: usize,
    pub side_outputs: usize,
}

impl PresetSummary {
    /// Builds the preset on `device` to count its parameters.
    pub fn new<B: Backend>(variant: U2NetVariant, device: &B::Device) -> U2NetResult<Self> {
        let model = variant.init::<B>(1, device)?;

        Ok(Self {
            name: variant.to_string(),
            pruning_ratio: variant.pruning_ratio(),
            parameters: model.num_params(),
            side_outputs: model.side_count(),
        })
    }
}

/// Summaries of every preset, from the widest to the narrowest.
pub fn preset_summaries<B: Backend>(device: &B::Device) -> U2NetResult<Vec<PresetSummary>> {
    U2NetVariant::ALL
        .into_iter()
        .map(|variant| PresetSummary::new::<B>(variant, device))
        .collect()
}
