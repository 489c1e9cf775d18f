//! Conversions between image files and model tensors.

use std::path::Path;

use burn::tensor::{backend::Backend, DType, Tensor, TensorData};
use image::{buffer::ConvertBuffer, DynamicImage, GenericImageView, ImageBuffer, Luma};
use thiserror::Error;

/// ImageNet channel means, in RGB order.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet channel standard deviations, in RGB order.
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

const SUPPORTED_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to open image at '{path}': {source}")]
    ImageLoadError {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to convert tensor to data: {reason}")]
    TensorConversionError { reason: String },

    #[error("failed to create image buffer: {reason}")]
    BufferCreationError { reason: String },

    #[error("batch size mismatch: expected 1, got {actual}")]
    InvalidBatchSize { actual: usize },

    #[error("invalid channel count: expected {expected}, got {actual}")]
    InvalidChannels { expected: usize, actual: usize },
}

pub type ImageResult<T> = Result<T, ImageError>;

/// Returns whether `path` has an image extension this tool can decode.
pub fn is_supported_image_format(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// Loads an image file as an RGB tensor of shape `[1, 3, H, W]` with values in `[0, 1]`.
pub fn load_image<B: Backend>(path: impl AsRef<Path>, device: &B::Device) -> ImageResult<Tensor<B, 4>> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|source| ImageError::ImageLoadError {
        path: path.display().to_string(),
        source,
    })?;

    Ok(dynamic_image_to_tensor(img, device))
}

pub fn dynamic_image_to_tensor<B: Backend>(img: DynamicImage, device: &B::Device) -> Tensor<B, 4> {
    let (width, height) = img.dimensions();
    let buf = img.into_rgb32f().into_raw();

    let data = TensorData::new(buf, [height as usize, width as usize, 3]);
    let tensor = Tensor::<B, 3>::from_data(data.convert::<B::FloatElem>(), device);

    tensor.permute([2, 0, 1]).unsqueeze::<4>()
}

/// Normalizes an RGB tensor `[N, 3, H, W]` with the ImageNet statistics.
pub fn apply_imagenet_normalization<B: Backend>(image: Tensor<B, 4>) -> ImageResult<Tensor<B, 4>> {
    let [_, channels, _, _] = image.dims();
    if channels != 3 {
        return Err(ImageError::InvalidChannels {
            expected: 3,
            actual: channels,
        });
    }

    let device = image.device();
    let mean = Tensor::<B, 1>::from_floats(IMAGENET_MEAN, &device).reshape([1, 3, 1, 1]);
    let std = Tensor::<B, 1>::from_floats(IMAGENET_STD, &device).reshape([1, 3, 1, 1]);

    Ok((image - mean) / std)
}

/// Converts a single-channel mask `[1, 1, H, W]` with values in `[0, 1]` to an 8-bit grayscale image.
pub fn mask_to_image<B: Backend>(mask: Tensor<B, 4>) -> ImageResult<DynamicImage> {
    let [batch, channels, height, width] = mask.dims();
    if batch != 1 {
        return Err(ImageError::InvalidBatchSize { actual: batch });
    }
    if channels != 1 {
        return Err(ImageError::InvalidChannels {
            expected: 1,
            actual: channels,
        });
    }

    let data = mask
        .clamp(0.0, 1.0)
        .into_data()
        .convert_dtype(DType::F32)
        .to_vec::<f32>()
        .map_err(|e| ImageError::TensorConversionError {
            reason: format!("{e:?}"),
        })?;

    let buffer = ImageBuffer::<Luma<f32>, _>::from_raw(width as u32, height as u32, data)
        .ok_or_else(|| ImageError::BufferCreationError {
            reason: "Failed to create grayscale f32 image buffer".to_string(),
        })?;
    let buffer: ImageBuffer<Luma<u8>, Vec<u8>> = buffer.convert();

    Ok(DynamicImage::ImageLuma8(buffer))
}
