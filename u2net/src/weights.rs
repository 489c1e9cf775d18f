//! Loading and saving model weights.
//!
//! Native checkpoints use Burn's recorders at full precision. With the
//! `import` feature, state dicts saved by PyTorch can be read directly: the
//! module tree uses the same parameter names (`encode_modules.0.conv_in.conv.weight`,
//! `side_modules.3.bias`, `out_conv.weight`, ...), so no key remapping is needed
//! apart from the `module.` prefix that `DataParallel` checkpoints carry.

use std::path::{Path, PathBuf};

use burn::{
    prelude::*,
    record::{BinFileRecorder, FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
};
#[cfg(feature = "import")]
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};

use crate::{
    error::{U2NetError, U2NetResult},
    models::{U2Net, U2NetRecord},
};

/// On-disk formats understood by [`load_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightFormat {
    /// Burn named MessagePack (`.mpk`).
    MessagePack,
    /// Burn binary (`.bin`).
    Binary,
    /// PyTorch state dict (`.pth`, `.pt`).
    PyTorch,
}

impl WeightFormat {
    /// Infers the format from the file extension, defaulting to MessagePack.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("pth" | "pt") => Self::PyTorch,
            Some("bin") => Self::Binary,
            _ => Self::MessagePack,
        }
    }
}

/// Reads a model record, picking the recorder from the file extension.
///
/// # Errors
///
/// Returns `Err(U2NetError::WeightLoadingFailed)` when the file is missing or
/// cannot be decoded, or when a PyTorch file is given without the `import` feature.
pub fn load_record<B: Backend>(
    path: impl AsRef<Path>,
    device: &B::Device,
) -> U2NetResult<U2NetRecord<B>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(U2NetError::WeightLoadingFailed {
            reason: format!("Weight file not found: {}", path.display()),
        });
    }

    let format = WeightFormat::from_path(path);
    tracing::debug!(path = %path.display(), ?format, "loading weights");

    let record = match format {
        WeightFormat::MessagePack => {
            NamedMpkFileRecorder::<FullPrecisionSettings>::new().load(path.to_path_buf(), device)
        }
        WeightFormat::Binary => {
            BinFileRecorder::<FullPrecisionSettings>::new().load(path.to_path_buf(), device)
        }
        WeightFormat::PyTorch => return load_pytorch_record(path, device),
    };

    record.map_err(|e| U2NetError::WeightLoadingFailed {
        reason: format!("{format:?} record loading failed: {e}"),
    })
}

/// Reads a PyTorch state dict into a model record.
#[cfg(feature = "import")]
pub fn load_pytorch_record<B: Backend>(
    path: &Path,
    device: &B::Device,
) -> U2NetResult<U2NetRecord<B>> {
    let load_args =
        LoadArgs::new(path.to_path_buf()).with_key_remap("^module\\.(.+)", "$1");

    PyTorchFileRecorder::<FullPrecisionSettings>::default()
        .load(load_args, device)
        .map_err(|e| U2NetError::WeightLoadingFailed {
            reason: format!("PyTorch record loading failed: {e}"),
        })
}

#[cfg(not(feature = "import"))]
pub fn load_pytorch_record<B: Backend>(
    path: &Path,
    _device: &B::Device,
) -> U2NetResult<U2NetRecord<B>> {
    Err(U2NetError::WeightLoadingFailed {
        reason: format!(
            "{} is a PyTorch checkpoint; rebuild with the `import` feature to read it",
            path.display()
        ),
    })
}

impl<B: Backend> U2Net<B> {
    /// Replaces the model parameters with those stored at `path`.
    pub fn load_weights(self, path: impl AsRef<Path>, device: &B::Device) -> U2NetResult<Self> {
        let record = load_record(path, device)?;
        Ok(self.load_record(record))
    }

    /// Saves the model parameters as a named MessagePack record.
    ///
    /// The recorder appends the `.mpk` extension; the written path is returned.
    pub fn save_weights(self, path: impl Into<PathBuf>) -> U2NetResult<PathBuf> {
        let path = path.into().with_extension("mpk");
        self.save_file(path.clone(), &NamedMpkFileRecorder::<FullPrecisionSettings>::new())
            .map_err(|e| U2NetError::WeightLoadingFailed {
                reason: format!("failed to save weights to {}: {e}", path.display()),
            })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::U2NetConfig;
    use burn::{backend::NdArray, tensor::Distribution};

    type TestBackend = NdArray<f32>;

    fn tiny_config() -> U2NetConfig {
        U2NetConfig::from_rows(
            &[(3, 3, 2, 4, false, false), (4, 4, 2, 4, true, true)],
            &[(3, 8, 2, 4, false, true)],
            1,
        )
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            WeightFormat::from_path(Path::new("u2net.pth")),
            WeightFormat::PyTorch
        );
        assert_eq!(
            WeightFormat::from_path(Path::new("u2net.PT")),
            WeightFormat::PyTorch
        );
        assert_eq!(
            WeightFormat::from_path(Path::new("u2net.bin")),
            WeightFormat::Binary
        );
        assert_eq!(
            WeightFormat::from_path(Path::new("u2net.mpk")),
            WeightFormat::MessagePack
        );
        assert_eq!(
            WeightFormat::from_path(Path::new("u2net")),
            WeightFormat::MessagePack
        );
    }

    #[test]
    fn missing_file_is_reported() {
        let device = Default::default();
        let result = load_record::<TestBackend>("does/not/exist.mpk", &device);

        match result {
            Err(U2NetError::WeightLoadingFailed { reason }) => {
                assert!(reason.contains("Weight file not found"));
            }
            _ => panic!("Expected WeightLoadingFailed error"),
        }
    }

    #[test]
    fn saved_weights_reproduce_predictions() {
        let device = Default::default();
        let path = std::env::temp_dir().join(format!("u2net-weights-{}", std::process::id()));

        let model = tiny_config().init::<TestBackend>(&device).unwrap();
        let input =
            Tensor::<TestBackend, 4>::random([1, 3, 10, 14], Distribution::Default, &device);
        let expected = model.predict(input.clone()).unwrap();

        let saved = model.save_weights(&path).unwrap();
        let restored = tiny_config()
            .init::<TestBackend>(&device)
            .unwrap()
            .load_weights(&saved, &device)
            .unwrap();
        let actual = restored.predict(input).unwrap();
        std::fs::remove_file(&saved).ok();

        let diff = (expected - actual).abs().max().into_scalar();
        assert!(diff < 1e-6, "max difference {diff}");
    }
}
