// error.rs — Error taxonomy for the stencil engine.
//
// Device-layer failures (allocation, transfer, dispatch) are fatal for a
// gallery run: they propagate unchanged to the caller and nothing retries.
// The remaining variants reject malformed inputs before any device work.

use thiserror::Error;

use crate::gpu::device::GpuError;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StencilError>;

/// Every failure the engine can report.
#[derive(Debug, Error)]
pub enum StencilError {
    /// Device memory could not be reserved.
    #[error("device allocation of {bytes} bytes for `{label}` failed: {reason}")]
    AllocationFailure {
        label: String,
        bytes: u64,
        reason: String,
    },

    /// A host↔device copy failed or was malformed.
    #[error("transfer for `{label}` failed: {reason}")]
    TransferFailure { label: String, reason: String },

    /// Pipeline creation, argument binding or kernel execution failed.
    #[error("dispatch of `{entry}` failed: {reason}")]
    DispatchFailure { entry: &'static str, reason: String },

    /// A flat buffer does not hold `width * height` samples.
    #[error("buffer holds {actual} samples but {width}×{height} = {expected} were declared")]
    ShapeMismatch {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    /// A filter's coefficient count disagrees with its declared size.
    #[error("filter `{name}` declares {size}×{size} but carries {actual} coefficients")]
    FilterSizeMismatch {
        name: String,
        size: usize,
        actual: usize,
    },

    /// Only 3×3 and 5×5 stencils are supported.
    #[error("unsupported filter size {0} (supported: 3, 5)")]
    UnsupportedFilterSize(usize),

    /// Scale factors are positive integers.
    #[error("scale factor must be a positive integer (got {0})")]
    InvalidScaleFactor(u32),

    /// A gallery needs at least one entry to be indexable.
    #[error("gallery must contain at least one entry")]
    EmptyGallery,

    /// The navigator has reached its terminal state.
    #[error("navigation already terminated")]
    NavigationTerminated,

    /// Rejected configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Adapter/device initialization failed.
    #[error(transparent)]
    Device(#[from] GpuError),
}

impl StencilError {
    /// True for failures that originate on the compute device.
    pub fn is_device_failure(&self) -> bool {
        matches!(
            self,
            StencilError::AllocationFailure { .. }
                | StencilError::TransferFailure { .. }
                | StencilError::DispatchFailure { .. }
                | StencilError::Device(_)
        )
    }
}
