//! # Model Architectures
//!
//! This module aggregates the components of the U2-Net architecture:
//!
//! - `modules`: the convolution units and the residual U-blocks built from them.
//! - `u2net`: the `U2Net` model, which stacks residual U-blocks into an
//!   encoder-decoder with fused side outputs.

pub mod modules;
pub mod u2net;

pub use modules::*;
pub use u2net::{U2Net, U2NetRecord};
