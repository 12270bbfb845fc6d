//! Error types for device selection, pooling, and submission.

use std::ffi::CStr;

use ash::vk;

/// Errors surfaced by adapter selection, resource pools, and queue submission.
///
/// Driver-level failures are classified on the way out of the driver layer and
/// otherwise surfaced unchanged; nothing in this crate retries internally.
/// [`DeviceLost`](Error::DeviceLost) and [`Vulkan`](Error::Vulkan) returned
/// from a submission are fatal to the device — the caller must rebuild it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No enumerated physical device meets the minimum API version.
    #[error("no physical device meets the minimum requirements")]
    NoSuitableAdapter,

    /// The chosen physical device has no graphics-capable queue family.
    ///
    /// A direct queue is mandatory; async compute and async transfer are
    /// optional and fall back to aliasing the direct family.
    #[error("physical device has no graphics-capable queue family")]
    NoDirectQueue,

    /// Host allocation failed, or a resource pool has no free handle left.
    ///
    /// The pool case is recoverable: reclaim handles with
    /// [`TimelinePool::reset`](crate::pool::TimelinePool::reset) or register
    /// new ones with [`TimelinePool::grow`](crate::pool::TimelinePool::grow).
    #[error("out of memory")]
    OutOfMemory,

    /// Device memory allocation failed.
    #[error("out of device memory")]
    OutOfDeviceMemory,

    /// The logical device was lost. Fatal; the device must be rebuilt.
    #[error("device lost")]
    DeviceLost,

    /// A required layer, extension, or feature is absent.
    #[error("missing required feature or extension: {0:?}")]
    FeatureNotSupported(&'static CStr),

    /// Any other Vulkan error code, surfaced unchanged.
    #[error("vulkan error: {0}")]
    Vulkan(vk::Result),
}

impl From<vk::Result> for Error {
    fn from(result: vk::Result) -> Self {
        match result {
            vk::Result::ERROR_OUT_OF_HOST_MEMORY => Error::OutOfMemory,
            vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => Error::OutOfDeviceMemory,
            vk::Result::ERROR_DEVICE_LOST => Error::DeviceLost,
            other => Error::Vulkan(other),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
