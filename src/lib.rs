//! Squall: a Vulkan render-graph core.
//!
//! The crate provides four layers, bottom to top:
//! - typed generational handles over a paged slot map ([`handle`],
//!   [`slot_map`]);
//! - a device owning GPU resources, with destruction deferred across the
//!   frames-in-flight window ([`device`], [`deletion`], [`swapchain`],
//!   [`queue`]);
//! - a declarative graph builder that records per-pass resource usage
//!   ([`graph::RenderGraphCompiler`], [`graph::GraphPassBuilder`]);
//! - a per-frame executor that sorts active passes, infers image and buffer
//!   barriers from last-known states, and drives submission and
//!   presentation ([`graph::RenderGraph`]).

pub use ash::{self, vk};

pub use crate::{
    device::{
        AcquiredImage, BufferDesc, BufferInfo, BufferUsage, Device, DeviceCreateInfo, ImageDesc,
        ImageInfo, ImageUsage, MappedRange, MemoryLocation, SamplerDesc,
    },
    error::{DeviceError, FrameError, GraphError, SwapchainError},
    graph::{
        AttachmentOps, BufferResourceUsage, ClearValue, GraphBufferDesc, GraphImageDesc,
        GraphPassBuilder, ImageResourceUsage, LoadOp, PipelineStage, QueueOperationType,
        RenderGraph, RenderGraphCompiler, ResourceAccessType, StoreOp,
    },
    handle::{
        marker, BufferHandle, CommandListHandle, DescriptorSetHandle, FenceHandle, GraphPassHandle,
        Handle, ImageHandle, PipelineHandle, RenderSurfaceHandle, SamplerHandle, SemaphoreHandle,
        SlotKey,
    },
    instance::{get_vulkan_entry, get_vulkan_instance},
    queue::{CommandList, SemaphoreWait, WorkQueue},
    swapchain::RenderSurfaceDesc,
};

pub mod deletion;
pub mod device;
pub mod error;
pub mod graph;
pub mod handle;
pub(crate) mod instance;
pub mod queue;
pub mod slot_map;
pub mod swapchain;
