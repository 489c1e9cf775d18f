//! # Residual U-blocks
//!
//! An RSU is a small encoder-decoder wrapped in a residual connection. The
//! input is first projected to the block's output width; a stack of encoder
//! units then shrinks the features, a stack of decoder units grows them back
//! while concatenating the matching encoder feature, and the projected input is
//! added to the result.
//!
//! Two layouts share the same module:
//!
//! - `RsuConfig` builds the recursive block of a given height, where every
//!   encoder level below the first halves the resolution and the deepest level
//!   uses a dilated convolution instead of pooling.
//! - `Rsu4fConfig` builds the fixed four-level block used at low resolutions,
//!   which never resamples and widens its receptive field with dilations
//!   1, 2, 4 and 8.

use burn::prelude::*;

use super::{
    ConvBnRelu, ConvBnReluConfig, DownConvBnRelu, DownConvBnReluConfig, UpConvBnRelu,
    UpConvBnReluConfig,
};
use crate::error::{U2NetError, U2NetResult};

/// Dilations of the RSU4F encoder units, from the first to the deepest.
const RSU4F_ENCODE_DILATIONS: [usize; 4] = [1, 2, 4, 8];

/// Configuration for a recursive residual U-block.
#[derive(Config, Debug)]
pub struct RsuConfig {
    /// Number of levels, counting the dilated bottom level. Must be at least 2.
    height: usize,
    /// Number of input channels.
    in_channels: usize,
    /// Number of channels inside the U.
    mid_channels: usize,
    /// Number of output channels.
    out_channels: usize,
}

impl RsuConfig {
    /// Initializes a new recursive `Rsu` module.
    ///
    /// # Errors
    ///
    /// Returns `Err(U2NetError::InvalidHeight)` when `height < 2`.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> U2NetResult<Rsu<B>> {
        if self.height < 2 {
            return Err(U2NetError::InvalidHeight {
                stage: "RSU".to_string(),
                height: self.height,
            });
        }

        let mid = self.mid_channels;
        let conv_in = ConvBnReluConfig::new(self.in_channels, self.out_channels).init(device);

        let mut encode_modules = Vec::with_capacity(self.height);
        encode_modules.push(
            DownConvBnReluConfig::new(self.out_channels, mid)
                .with_down(false)
                .init(device),
        );
        for _ in 0..self.height - 2 {
            encode_modules.push(DownConvBnReluConfig::new(mid, mid).init(device));
        }
        encode_modules.push(
            DownConvBnReluConfig::new(mid, mid)
                .with_dilation(2)
                .with_down(false)
                .init(device),
        );

        // The first decoder pairs the two full-depth features, which already
        // share a size; the last one restores the block's output width.
        let decode_modules = (0..self.height - 1)
            .map(|level| {
                let out = if level == self.height - 2 {
                    self.out_channels
                } else {
                    mid
                };
                UpConvBnReluConfig::new(mid * 2, out)
                    .with_up(level > 0)
                    .init(device)
            })
            .collect();

        Ok(Rsu {
            conv_in,
            encode_modules,
            decode_modules,
        })
    }
}

/// Configuration for the dilated four-level residual U-block.
#[derive(Config, Debug)]
pub struct Rsu4fConfig {
    /// Number of input channels.
    in_channels: usize,
    /// Number of channels inside the U.
    mid_channels: usize,
    /// Number of output channels.
    out_channels: usize,
}

impl Rsu4fConfig {
    /// Initializes a new `Rsu` module with the RSU4F layout.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> Rsu<B> {
        let mid = self.mid_channels;
        let conv_in = ConvBnReluConfig::new(self.in_channels, self.out_channels).init(device);

        let encode_modules = RSU4F_ENCODE_DILATIONS
            .iter()
            .enumerate()
            .map(|(level, &dilation)| {
                let in_channels = if level == 0 { self.out_channels } else { mid };
                DownConvBnReluConfig::new(in_channels, mid)
                    .with_dilation(dilation)
                    .with_down(false)
                    .init(device)
            })
            .collect();

        // Decoders mirror the encoder dilations, skipping the deepest one.
        let decode_modules = RSU4F_ENCODE_DILATIONS[..3]
            .iter()
            .rev()
            .enumerate()
            .map(|(level, &dilation)| {
                let out = if level == 2 { self.out_channels } else { mid };
                UpConvBnReluConfig::new(mid * 2, out)
                    .with_dilation(dilation)
                    .with_up(false)
                    .init(device)
            })
            .collect();

        Rsu {
            conv_in,
            encode_modules,
            decode_modules,
        }
    }
}

/// A residual U-block, built by either `RsuConfig` or `Rsu4fConfig`.
///
/// `encode_modules` always holds one unit more than `decode_modules`.
#[derive(Module, Debug)]
pub struct Rsu<B: Backend> {
    conv_in: ConvBnRelu<B>,
    encode_modules: Vec<DownConvBnRelu<B>>,
    decode_modules: Vec<UpConvBnRelu<B>>,
}

impl<B: Backend> Rsu<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x_in = self.conv_in.forward(x);

        let mut skips = Vec::with_capacity(self.encode_modules.len());
        let mut x = x_in.clone();
        for module in &self.encode_modules {
            x = module.forward(x);
            skips.push(x.clone());
        }

        // The deepest feature is `x` itself.
        skips.pop();
        for (module, skip) in self.decode_modules.iter().zip(skips.into_iter().rev()) {
            x = module.forward(x, skip);
        }

        x + x_in
    }

    /// Number of encoder units, which is the block height.
    pub fn height(&self) -> usize {
        self.encode_modules.len()
    }
}
