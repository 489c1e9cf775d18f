//! Spatial resampling shared by the blocks and the full model.

use burn::{
    nn::pool::{MaxPool2d, MaxPool2dConfig},
    prelude::*,
    tensor::{
        module::interpolate,
        ops::{InterpolateMode, InterpolateOptions},
    },
};

/// A 2x2, stride 2 max pooling that rounds the output size up.
///
/// Odd inputs get one extra row or column of `-inf` at the bottom or right
/// before pooling, so the trailing pixels still form a (partial) window and an
/// `H x W` input always pools to `ceil(H / 2) x ceil(W / 2)`.
#[derive(Module, Clone, Debug)]
pub struct CeilMaxPool2d {
    pool: MaxPool2d,
}

impl CeilMaxPool2d {
    pub fn new() -> Self {
        Self {
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
        }
    }

    pub fn forward<B: Backend>(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let [_, _, h, w] = x.dims();

        let x = if h % 2 == 1 || w % 2 == 1 {
x.pad((0, w % 2, 0, h % 2), f32::NEG_INFINITY)
        } else {
            x
        };

        self.pool.forward(x)
    }
}

impl Default for CeilMaxPool2d {
    fn default() -> Self {
        Self::new()
    }
}

/// Bilinearly resizes `x` to `size` (`[height, width]`).
///
/// Returns `x` untouched when it already has the requested size.
pub fn resize_to<B: Backend>(x: Tensor<B, 4>, size: [usize; 2]) -> Tensor<B, 4> {
    let [_, _, h, w] = x.dims();
    if [h, w] == size {
        return x;
    }

    interpolate(x, size, InterpolateOptions::new(InterpolateMode::Bilinear))
}

/// Bilinearly resizes `x` to the spatial size of `target`.
pub fn upsample_like<B: Backend>(x: Tensor<B, 4>, target: &Tensor<B, 4>) -> Tensor<B, 4> {
    let [_, _, h, w] = target.dims();
    resize_to(x, [h, w])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn ceil_pool_rounds_odd_sizes_up() {
        let device = Default::default();
        let pool = CeilMaxPool2d::new();

        let x = Tensor::<TestBackend, 4>::zeros([2, 3, 7, 10], &device);
        assert_eq!(pool.forward(x).dims(), [2, 3, 4, 5]);

        let x = Tensor::<TestBackend, 4>::zeros([1, 1, 1, 1], &device);
        assert_eq!(pool.forward(x).dims(), [1, 1, 1, 1]);
    }

    #[test]
    fn ceil_pool_keeps_trailing_pixels() {
        let device = Default::default();
        let pool = CeilMaxPool2d::new();

        // Trailing column holds the largest values; a floor-mode pool would drop it.
        let x = Tensor::<TestBackend, 4>::from_floats(
            [[[[1.0, 2.0, 9.0], [3.0, 4.0, 8.0]]]],
            &device,
        );
        let y = pool.forward(x);

        assert_eq!(y.dims(), [1, 1, 1, 2]);
        let values = y.into_data().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![4.0, 9.0]);
    }

    #[test]
    fn resize_to_matches_requested_size() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 4>::ones([1, 2, 5, 3], &device);

        assert_eq!(resize_to(x.clone(), [11, 7]).dims(), [1, 2, 11, 7]);
        assert_eq!(resize_to(x, [5, 3]).dims(), [1, 2, 5, 3]);
    }

    #[test]
    fn upsample_like_follows_target() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 4>::ones([1, 4, 2, 2], &device);
        let target = Tensor::<TestBackend, 4>::zeros([1, 1, 3, 5], &device);

        let y = upsample_like(x, &target);
        assert_eq!(y.dims(), [1, 4, 3, 5]);
    }
}
