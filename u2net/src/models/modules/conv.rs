//! # Convolution Units
//!
//! The smallest building blocks of U2-Net: a convolution followed by batch
//! normalization and ReLU, optionally preceded by a downsampling step or by an
//! upsample-and-concatenate step.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
};

use super::{upsample_like, CeilMaxPool2d};

/// Configuration for the `ConvBnRelu` module.
#[derive(Config, Debug)]
pub struct ConvBnReluConfig {
    /// Number of input channels.
    in_channels: usize,
    /// Number of output channels.
    out_channels: usize,
    /// Side length of the square kernel.
    #[config(default = "3")]
    kernel_size: usize,
    /// Dilation of the kernel.
    #[config(default = "1")]
    dilation: usize,
}

impl ConvBnReluConfig {
    /// Initializes a new `ConvBnRelu` module.
    ///
    /// Padding keeps the spatial size: `kernel_size / 2` for an undilated
    /// kernel, `dilation` otherwise.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> ConvBnRelu<B> {
        let padding = if self.dilation == 1 {
            self.kernel_size / 2
        } else {
            self.dilation
        };

        let conv = Conv2dConfig::new(
            [self.in_channels, self.out_channels],
            [self.kernel_size, self.kernel_size],
        )
        .with_padding(PaddingConfig2d::Explicit(padding, padding))
        .with_dilation([self.dilation, self.dilation])
        .with_bias(false)
        .init(device);
        let bn = BatchNormConfig::new(self.out_channels).init(device);

        ConvBnRelu {
            conv,
            bn,
            relu: Relu::new(),
        }
    }
}

/// Convolution, batch normalization and ReLU.
#[derive(Module, Debug)]
pub struct ConvBnRelu<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
    relu: Relu,
}

impl<B: Backend> ConvBnRelu<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        self.relu.forward(x)
    }
}

/// Configuration for the `DownConvBnRelu` module.
#[derive(Config, Debug)]
pub struct DownConvBnReluConfig {
    /// Number of input channels.
    in_channels: usize,
    /// Number of output channels.
    out_channels: usize,
    #[config(default = "3")]
    kernel_size: usize,
    #[config(default = "1")]
    dilation: usize,
    /// Halve the spatial size before the convolution.
    #[config(default = "true")]
    down: bool,
}

impl DownConvBnReluConfig {
    /// Initializes a new `DownConvBnRelu` module.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> DownConvBnRelu<B> {
        let ConvBnRelu { conv, bn, relu } =
            ConvBnReluConfig::new(self.in_channels, self.out_channels)
                .with_kernel_size(self.kernel_size)
                .with_dilation(self.dilation)
                .init(device);

        DownConvBnRelu {
            pool: self.down.then(CeilMaxPool2d::new),
            conv,
            bn,
            relu,
        }
    }
}

/// A `ConvBnRelu` optionally preceded by a ceil-mode 2x2 max pooling.
///
/// The unit's layers sit directly on this module so its parameters keep the
/// same names as a plain `ConvBnRelu`.
#[derive(Module, Debug)]
pub struct DownConvBnRelu<B: Backend> {
    pool: Option<CeilMaxPool2d>,
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
    relu: Relu,
}

impl<B: Backend> DownConvBnRelu<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = match &self.pool {
            Some(pool) => pool.forward(x),
            None => x,
        };
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        self.relu.forward(x)
    }
}

/// Configuration for the `UpConvBnRelu` module.
#[derive(Config, Debug)]
pub struct UpConvBnReluConfig {
    /// Number of input channels, counting both concatenated inputs.
    in_channels: usize,
    /// Number of output channels.
    out_channels: usize,
    #[config(default = "3")]
    kernel_size: usize,
    #[config(default = "1")]
    dilation: usize,
    /// Resize the first input to the size of the second before concatenating.
    #[config(default = "true")]
    up: bool,
}

impl UpConvBnReluConfig {
    /// Initializes a new `UpConvBnRelu` module.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> UpConvBnRelu<B> {
        let ConvBnRelu { conv, bn, relu } =
            ConvBnReluConfig::new(self.in_channels, self.out_channels)
                .with_kernel_size(self.kernel_size)
                .with_dilation(self.dilation)
                .init(device);

        UpConvBnRelu {
            up: self.up,
            conv,
            bn,
            relu,
        }
    }
}

/// A `ConvBnRelu` over the channel concatenation of two feature maps.
#[derive(Module, Debug)]
pub struct UpConvBnRelu<B: Backend> {
    up: bool,
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
    relu: Relu,
}

impl<B: Backend> UpConvBnRelu<B> {
    /// Concatenates `[x1, x2]` along channels and applies the unit. When the
    /// block upsamples, `x1` is first resized bilinearly to the size of `x2`.
    pub fn forward(&self, x1: Tensor<B, 4>, x2: Tensor<B, 4>) -> Tensor<B, 4> {
        let x1 = if self.up { upsample_like(x1, &x2) } else { x1 };
        let x = self.conv.forward(Tensor::cat(vec![x1, x2], 1));
        let x = self.bn.forward(x);
        self.relu.forward(x)
    }
}
