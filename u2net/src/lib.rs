//! U2-Net salient object segmentation on Burn.
//!
//! The model is built from a [`U2NetConfig`], either one of the width-pruned
//! presets ([`U2NetVariant`], [`u2net_full`], [`u2net_prune_l`], ...) or a
//! custom table of stages. Every configuration is validated before any weight
//! is allocated.

mod config;
mod error;
mod models;
mod weights;

#[cfg(test)]
mod tests;

pub use config::*;
pub use error::{U2NetError, U2NetResult};
pub use models::{
    ConvBnRelu, ConvBnReluConfig, Rsu, Rsu4fConfig, RsuConfig, U2Net, U2NetRecord,
};
pub use weights::{load_pytorch_record, load_record, WeightFormat};
