//! Error types surfaced at the crate's API boundaries.

use crate::handle::RenderSurfaceHandle;
use ash::vk;
use thiserror::Error;

/// Errors reported by swapchain acquisition and presentation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SwapchainError {
    /// The swapchain no longer matches the surface; the client must recreate
    /// it before acquiring or presenting again.
    #[error("swapchain is out of date and must be recreated")]
    OutOfDate,
    /// The swapchain still works but no longer matches the surface
    /// optimally; treated like out-of-date by the executor.
    #[error("swapchain is suboptimal for the surface")]
    Suboptimal,
    #[error("swapchain operation failed: {0}")]
    Device(vk::Result),
}

/// Errors produced while compiling a render graph.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum GraphError {
    /// The explicit `depends_on` edges of the active passes form a cycle.
    #[error("dependency cycle involving pass `{pass}`")]
    DependencyCycle { pass: String },
    /// One of the declared graph resources failed to materialise.
    #[error("failed to compile graph resources")]
    ResourceCompilation,
}

/// Errors produced while executing a frame.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum FrameError {
    /// Acquisition reported an unusable swapchain. The frame was abandoned;
    /// recreate the named render surface and retry.
    #[error("render surface {surface:?} must be recreated: {cause}")]
    SurfaceLost {
        surface: RenderSurfaceHandle,
        cause: SwapchainError,
    },
    /// A device-level failure. Fatal to the frame, not to the process.
    #[error("device error during frame execution: {0}")]
    Device(vk::Result),
}

/// Errors reported by device object creation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DeviceError {
    #[error("no compatible window surface could be created")]
    SurfaceCreation,
    #[error("vulkan call failed: {0}")]
    Vulkan(#[from] vk::Result),
}
