//! # U2-Net Model Implementation
//!
//! This module defines the `U2Net` model, a two-level nested U-structure:
//! an outer encoder-decoder whose every stage is itself a residual U-block.
//!
//! ## Core Components
//!
//! - `U2NetConfig::init`: validates a configuration and builds the model.
//! - `U2Net`: the model. Its forward pass returns the fused prediction followed
//!   by one side prediction per supervised stage, all at the input resolution.
//!
//! Side heads are paired with the outer stages from the bottleneck upwards:
//! the first head reads the bottleneck, the next one the first decoder stage,
//! and so on.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::sigmoid,
};

use super::modules::{resize_to, upsample_like, CeilMaxPool2d, Rsu, Rsu4fConfig, RsuConfig};
use crate::{
    config::{StageConfig, U2NetConfig},
    error::{U2NetError, U2NetResult},
};

impl StageConfig {
    /// Initializes the residual U-block described by this stage.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> U2NetResult<Rsu<B>> {
        if self.rsu4f {
            Ok(
                Rsu4fConfig::new(self.in_channels, self.mid_channels, self.out_channels)
                    .init(device),
            )
        } else {
            RsuConfig::new(
                self.height,
                self.in_channels,
                self.mid_channels,
                self.out_channels,
            )
            .init(device)
        }
    }
}

impl U2NetConfig {
    /// Initializes a `U2Net` model with this configuration.
    ///
    /// # Errors
    ///
    /// Returns any error of [`U2NetConfig::validate`]; nothing is allocated for an
    /// invalid configuration.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> U2NetResult<U2Net<B>> {
        self.validate()?;

        let encode_modules = self
            .encode
            .iter()
            .map(|stage| stage.init(device))
            .collect::<U2NetResult<Vec<_>>>()?;
        let decode_modules = self
            .decode
            .iter()
            .map(|stage| stage.init(device))
            .collect::<U2NetResult<Vec<_>>>()?;

        let side_count = self.side_count();
        let side_modules = self
            .decoder_path()
            .take(side_count)
            .map(|stage| {
                Conv2dConfig::new([stage.out_channels, self.out_channels], [3, 3])
                    .with_padding(PaddingConfig2d::Explicit(1, 1))
                    .init(device)
            })
            .collect();
        let out_conv =
            Conv2dConfig::new([side_count * self.out_channels, self.out_channels], [1, 1])
                .init(device);

        tracing::debug!(
            encode = self.encode.len(),
            decode = self.decode.len(),
            side_outputs = side_count,
            in_channels = self.in_channels(),
            out_channels = self.out_channels,
            "built U2Net",
        );

        Ok(U2Net {
            encode_modules,
            decode_modules,
            side_modules,
            out_conv,
            pool: CeilMaxPool2d::new(),
            in_channels: self.in_channels(),
            out_channels: self.out_channels,
        })
    }
}

/// The U2-Net model.
#[derive(Module, Debug)]
pub struct U2Net<B: Backend> {
    /// Encoder stages; the last one is the bottleneck.
    encode_modules: Vec<Rsu<B>>,
    /// Decoder stages, deepest first.
    decode_modules: Vec<Rsu<B>>,
    /// Side heads, bottleneck first.
    side_modules: Vec<Conv2d<B>>,
    /// 1x1 convolution fusing all side predictions.
    out_conv: Conv2d<B>,
    /// Downsampling between encoder stages.
    pool: CeilMaxPool2d,
    in_channels: usize,
    out_channels: usize,
}

impl<B: Backend> U2Net<B> {
    /// Performs the forward pass.
    ///
    /// # Arguments
    ///
    /// * `x` - The input tensor of shape `[N, C, H, W]`. Any `H` and `W` are accepted.
    ///
    /// # Returns
    ///
    /// `side_count() + 1` tensors of shape `[N, out_channels, H, W]`: the fused
    /// prediction, then the side predictions from the highest-resolution decoder
    /// stage down to the bottleneck.
    ///
    /// # Errors
    ///
    /// Returns `Err(U2NetError::InvalidTensorShape)` when `C` differs from the
    /// configured input channel count.
    pub fn forward(&self, x: Tensor<B, 4>) -> U2NetResult<Vec<Tensor<B, 4>>> {
        let [n, c, h, w] = x.dims();
        if c != self.in_channels {
            return Err(U2NetError::InvalidTensorShape {
                expected: format!("[N, {}, H, W]", self.in_channels),
                actual: format!("[{n}, {c}, {h}, {w}]"),
            });
        }

        let mut skips = Vec::with_capacity(self.encode_modules.len());
        let mut x = x;
        for (i, module) in self.encode_modules.iter().enumerate() {
            if i > 0 {
                x = self.pool.forward(x);
            }
            x = module.forward(x);
            skips.push(x.clone());
        }

        // The bottleneck output is `x` itself.
        skips.pop();
        let mut path = Vec::with_capacity(self.decode_modules.len() + 1);
        path.push(x.clone());
        for (module, skip) in self.decode_modules.iter().zip(skips.into_iter().rev()) {
            let up = upsample_like(x, &skip);
            x = module.forward(Tensor::cat(vec![up, skip], 1));
            path.push(x.clone());
        }

        let mut sides: Vec<Tensor<B, 4>> = self
            .side_modules
            .iter()
            .zip(path)
            .map(|(head, feature)| resize_to(head.forward(feature), [h, w]))
            .collect();
        sides.reverse();

        let fused = self.out_conv.forward(Tensor::cat(sides.clone(), 1));

        let mut outputs = Vec::with_capacity(sides.len() + 1);
        outputs.push(fused);
        outputs.extend(sides);
        Ok(outputs)
    }

    /// Returns the fused prediction mapped to `[0, 1]` with a sigmoid.
    pub fn predict(&self, x: Tensor<B, 4>) -> U2NetResult<Tensor<B, 4>> {
        let mut outputs = self.forward(x)?;
        Ok(sigmoid(outputs.swap_remove(0)))
    }

    /// Number of channels the model expects as input.
    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    /// Number of channels of every predicted map.
    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// Number of side predictions returned after the fused one.
    pub fn side_count(&self) -> usize {
        self.side_modules.len()
    }
}
