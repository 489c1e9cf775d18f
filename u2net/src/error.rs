use thiserror::Error;

/// The error type for `u2net-burn` operations.
///
/// Every structural problem with a model configuration is reported through
/// this enum at construction time, before any weights are allocated.
#[derive(Error, Debug)]
pub enum U2NetError {
    /// Error for when a model configuration is logically inconsistent.
    #[error("Invalid model configuration: {reason}")]
    InvalidConfiguration {
        /// The reason why the configuration is invalid.
        reason: String,
    },

    /// Error for when a recursive RSU block is requested with fewer than two levels.
    #[error("Invalid RSU height for {stage}: expected at least 2, got {height}")]
    InvalidHeight {
        /// The stage the block belongs to.
        stage: String,
        /// The requested height.
        height: usize,
    },

    /// Error for when two consecutive stages disagree on their channel count.
    #[error("Channel mismatch at {stage}: expected {expected} input channels, got {actual}")]
    ChannelMismatch {
        /// The stage whose input does not line up.
        stage: String,
        /// The channel count produced by the preceding stages.
        expected: usize,
        /// The channel count the stage was configured with.
        actual: usize,
    },

    /// Error for when an input tensor has an invalid shape.
    #[error("Invalid input tensor shape: expected {expected}, got {actual}")]
    InvalidTensorShape {
        /// The expected tensor shape.
        expected: String,
        /// The actual tensor shape.
        actual: String,
    },

    /// Error for when a preset name does not match any known variant.
    #[error("Unknown model variant: {name}")]
    UnknownVariant {
        /// The name that failed to parse.
        name: String,
    },

    /// Error for when loading model weights fails.
    #[error("Failed to load weights: {reason}")]
    WeightLoadingFailed {
        /// The reason for the weight loading failure.
        reason: String,
    },
}

/// A specialized `Result` type for `u2net-burn` operations.
pub type U2NetResult<T> = Result<T, U2NetError>;
