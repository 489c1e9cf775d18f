//! Configuration module for U2-Net.
//!
//! This module provides the configuration structures of the model:
//! - `core`: the per-stage record and the model configuration with its validation
//! - `presets`: the full-width table and the family of width-pruned variants

pub mod core;
pub mod presets;

pub use self::core::{StageConfig, StageRow, U2NetConfig};
pub use presets::{
    u2net_full, u2net_prune_l, u2net_prune_l_s, u2net_prune_m, u2net_prune_m_s, u2net_prune_mm,
    u2net_prune_mm_s, u2net_prune_s, U2NetVariant,
};
