//! Core configuration structures for U2-Net.
//!
//! A model is described by two ordered lists of stage records, one for the
//! encoder and one for the decoder. Each record carries the six values
//! `(height, in_channels, mid_channels, out_channels, rsu4f, side)`.

use std::path::Path;

use burn::prelude::*;

use crate::error::{U2NetError, U2NetResult};

/// A stage record in its compact tuple form:
/// `(height, in_channels, mid_channels, out_channels, rsu4f, side)`.
pub type StageRow = (usize, usize, usize, usize, bool, bool);

/// Configuration of a single encoder or decoder stage.
#[derive(Config, Debug, PartialEq)]
pub struct StageConfig {
    /// Depth of the RSU block. Ignored when `rsu4f` is set.
    pub height: usize,
    /// Number of input channels.
    pub in_channels: usize,
    /// Number of channels inside the block.
    pub mid_channels: usize,
    /// Number of output channels.
    pub out_channels: usize,
    /// Use the dilated, non-resampling RSU4F block instead of a recursive RSU.
    pub rsu4f: bool,
    /// Attach a side output head to this stage.
    pub side: bool,
}

impl From<StageRow> for StageConfig {
    fn from((height, in_channels, mid_channels, out_channels, rsu4f, side): StageRow) -> Self {
        Self::new(height, in_channels, mid_channels, out_channels, rsu4f, side)
    }
}

impl StageConfig {
    /// Checks the stage in isolation. `stage` names it in error messages.
    pub fn validate(&self, stage: &str) -> U2NetResult<()> {
        if self.in_channels == 0 || self.mid_channels == 0 || self.out_channels == 0 {
            return Err(U2NetError::InvalidConfiguration {
                reason: format!(
                    "{stage} has a zero channel count ({}, {}, {})",
                    self.in_channels, self.mid_channels, self.out_channels
                ),
            });
        }

        if !self.rsu4f && self.height < 2 {
            return Err(U2NetError::InvalidHeight {
                stage: stage.to_string(),
                height: self.height,
            });
        }

        Ok(())
    }
}

/// Main configuration for the U2-Net model.
#[derive(Config, Debug)]
pub struct U2NetConfig {
    /// Encoder stages, from the full-resolution stage down to the bottleneck.
    pub encode: Vec<StageConfig>,
    /// Decoder stages, from the lowest resolution back up to the input resolution.
    pub decode: Vec<StageConfig>,
    /// Number of channels of every predicted map.
    #[config(default = "1")]
    pub out_channels: usize,
}

impl U2NetConfig {
    /// Builds a configuration from compact stage rows.
    pub fn from_rows(encode: &[StageRow], decode: &[StageRow], out_channels: usize) -> Self {
        Self::new(
            encode.iter().copied().map(StageConfig::from).collect(),
            decode.iter().copied().map(StageConfig::from).collect(),
        )
        .with_out_channels(out_channels)
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns `Err(U2NetError::InvalidConfiguration)` when the document is not a
    /// configuration (for instance when `encode` or `decode` is missing, or a stage
    /// lacks one of its six fields), and any error of [`U2NetConfig::validate`].
    pub fn from_json(json: &str) -> U2NetResult<Self> {
        let config =
            Self::load_binary(json.as_bytes()).map_err(|e| U2NetError::InvalidConfiguration {
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> U2NetResult<Self> {
        let config = Self::load(path).map_err(|e| U2NetError::InvalidConfiguration {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Number of input channels the model expects.
    pub fn in_channels(&self) -> usize {
        self.encode.first().map_or(0, |stage| stage.in_channels)
    }

    /// Number of side output heads, and therefore of maps fed to the fusion convolution.
    pub fn side_count(&self) -> usize {
        self.decoder_path().take_while(|stage| stage.side).count()
    }

    /// The stages whose outputs can carry a side head, in pairing order:
    /// the bottleneck followed by every decoder stage.
    pub(crate) fn decoder_path(&self) -> impl Iterator<Item = &StageConfig> + '_ {
        self.encode.last().into_iter().chain(self.decode.iter())
    }

    /// Display name of the encoder stage at `index`.
    pub(crate) fn encode_stage_name(index: usize) -> String {
        format!("En{}", index + 1)
    }

    /// Display name of the decoder stage at `index`. Decoder stages are numbered
    /// after the encoder stage whose resolution they restore.
    pub(crate) fn decode_stage_name(&self, index: usize) -> String {
        format!("De{}", self.encode.len().saturating_sub(index + 1))
    }

    /// Validate the configuration and return appropriate errors for invalid settings.
    ///
    /// # Errors
    ///
    /// Returns `Err(U2NetError::InvalidConfiguration)` for structural problems,
    /// `Err(U2NetError::InvalidHeight)` for an RSU stage shallower than two levels
    /// and `Err(U2NetError::ChannelMismatch)` when consecutive stages do not line up.
    pub fn validate(&self) -> U2NetResult<()> {
        if self.out_channels == 0 {
            return Err(U2NetError::InvalidConfiguration {
                reason: "out_channels must be greater than 0".to_string(),
            });
        }

        let Some(bottleneck) = self.encode.last() else {
            return Err(U2NetError::InvalidConfiguration {
                reason: "encode must contain at least one stage".to_string(),
            });
        };

        let skips = self.encode.len() - 1;
        if self.decode.len() > skips {
            return Err(U2NetError::InvalidConfiguration {
                reason: format!(
                    "decode has {} stages but the encoder only provides {} skip features",
                    self.decode.len(),
                    skips
                ),
            });
        }

        for (i, stage) in self.encode.iter().enumerate() {
            stage.validate(&Self::encode_stage_name(i))?;
        }
        for (j, stage) in self.decode.iter().enumerate() {
            stage.validate(&self.decode_stage_name(j))?;
        }

        for (i, pair) in self.encode.windows(2).enumerate() {
            if pair[1].in_channels != pair[0].out_channels {
                return Err(U2NetError::ChannelMismatch {
                    stage: Self::encode_stage_name(i + 1),
                    expected: pair[0].out_channels,
                    actual: pair[1].in_channels,
                });
            }
        }

        // Each decoder stage sees the upsampled previous output concatenated
        // with the matching encoder feature.
        let mut previous = bottleneck.out_channels;
        for (j, stage) in self.decode.iter().enumerate() {
            let skip = &self.encode[skips - 1 - j];
            let expected = previous + skip.out_channels;
            if stage.in_channels != expected {
                return Err(U2NetError::ChannelMismatch {
                    stage: self.decode_stage_name(j),
                    expected,
                    actual: stage.in_channels,
                });
            }
            previous = stage.out_channels;
        }

        if let Some(i) = self.encode[..skips].iter().position(|stage| stage.side) {
            return Err(U2NetError::InvalidConfiguration {
                reason: format!(
                    "side outputs are only supported on the bottleneck and decoder stages, found one on {}",
                    Self::encode_stage_name(i)
                ),
            });
        }

        let side_count = self.side_count();
        if side_count == 0 {
            return Err(U2NetError::InvalidConfiguration {
                reason: "at least one stage must emit a side output".to_string(),
            });
        }

        if let Some(offset) = self
            .decoder_path()
            .skip(side_count)
            .position(|stage| stage.side)
        {
            // The bottleneck is at path position 0, decoder j at j + 1.
            let j = side_count + offset - 1;
            return Err(U2NetError::InvalidConfiguration {
                reason: format!(
                    "side outputs must form a contiguous run starting at the bottleneck, {} is detached",
                    self.decode_stage_name(j)
                ),
            });
        }

        Ok(())
    }

    /// All stages of the model in execution order, with their display names.
    pub fn stages(&self) -> impl Iterator<Item = (String, &StageConfig)> + '_ {
        let encode = self
            .encode
            .iter()
            .enumerate()
            .map(|(i, stage)| (Self::encode_stage_name(i), stage));
        let decode = self
            .decode
            .iter()
            .enumerate()
            .map(move |(j, stage)| (self.decode_stage_name(j), stage));
        encode.chain(decode)
    }
}
