//! Graph-scoped resource collection.
//!
//! Images and buffers declared while building a graph exist only as deferred
//! creation records until `compile`. Pass declarations accumulate usage bits
//! into the records, so the final device objects are created with exactly
//! the union of their declared uses.

use crate::{
    device::{BufferDesc, BufferUsage, Device, ImageDesc, ImageUsage, MemoryLocation},
    graph::pass::{BufferResourceUsage, ImageResourceUsage},
    handle::{BufferHandle, ImageHandle},
};
use ash::vk;
use std::sync::Arc;
use tracing::{error, trace};

/// Description of a graph-declared image; usage is accumulated, not
/// declared.
#[derive(Copy, Clone, Debug)]
pub struct GraphImageDesc {
    pub image_type: vk::ImageType,
    pub format: vk::Format,
    pub extent: vk::Extent3D,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub samples: u32,
}

impl Default for GraphImageDesc {
    fn default() -> Self {
        GraphImageDesc {
            image_type: vk::ImageType::TYPE_2D,
            format: vk::Format::UNDEFINED,
            extent: vk::Extent3D {
                width: 1,
                height: 1,
                depth: 1,
            },
            mip_levels: 1,
            array_layers: 1,
            samples: 1,
        }
    }
}

/// Description of a graph-declared buffer; usage is accumulated.
#[derive(Copy, Clone, Debug)]
pub struct GraphBufferDesc {
    pub byte_size: u64,
    pub location: MemoryLocation,
    pub per_frame: bool,
}

impl Default for GraphBufferDesc {
    fn default() -> Self {
        GraphBufferDesc {
            byte_size: 0,
            location: MemoryLocation::DeviceLocal,
            per_frame: false,
        }
    }
}

struct DeferredImage {
    handle: ImageHandle,
    desc: ImageDesc,
    name: String,
}

struct DeferredBuffer {
    handle: BufferHandle,
    desc: BufferDesc,
    name: String,
}

/// Owns the resources declared for one graph, for the graph's lifetime.
pub(crate) struct ResourceLibrary {
    device: Arc<Device>,
    images_to_compile: Vec<DeferredImage>,
    buffers_to_compile: Vec<DeferredBuffer>,
    compiled: bool,
}

impl ResourceLibrary {
    pub(crate) fn new(device: Arc<Device>) -> ResourceLibrary {
        ResourceLibrary {
            device,
            images_to_compile: Vec::new(),
            buffers_to_compile: Vec::new(),
            compiled: false,
        }
    }

    /// Reserves a handle for an image that will be created at compile time.
    pub(crate) fn declare_image(&mut self, name: &str, desc: &GraphImageDesc) -> ImageHandle {
        let handle = self.device.reserve_image_handle();
        self.images_to_compile.push(DeferredImage {
            handle,
            desc: ImageDesc {
                image_type: desc.image_type,
                usage: ImageUsage::empty(),
                format: desc.format,
                extent: desc.extent,
                mip_levels: desc.mip_levels,
                array_layers: desc.array_layers,
                samples: desc.samples,
            },
            name: name.to_string(),
        });
        handle
    }

    /// Reserves a handle for a buffer that will be created at compile time.
    pub(crate) fn declare_buffer(&mut self, name: &str, desc: &GraphBufferDesc) -> BufferHandle {
        let handle = self.device.reserve_buffer_handle();
        self.buffers_to_compile.push(DeferredBuffer {
            handle,
            desc: BufferDesc {
                usage: BufferUsage::empty(),
                byte_size: desc.byte_size,
                location: desc.location,
                per_frame: desc.per_frame,
            },
            name: name.to_string(),
        });
        handle
    }

    /// ORs a declared usage into the deferred record. Handles that are not
    /// deferred (external, already materialised images) are left alone.
    pub(crate) fn add_image_usage(&mut self, handle: ImageHandle, usage: ImageResourceUsage) {
        let record = self
            .images_to_compile
            .iter_mut()
            .find(|record| record.handle == handle);
        if let Some(record) = record {
            record.desc.usage |= match usage {
                ImageResourceUsage::ColorAttachment => ImageUsage::COLOR_ATTACHMENT,
                ImageResourceUsage::DepthAttachment => ImageUsage::DEPTH_ATTACHMENT,
                ImageResourceUsage::Sampled => ImageUsage::SAMPLED,
                ImageResourceUsage::Storage => ImageUsage::STORAGE,
                ImageResourceUsage::TransferSource => ImageUsage::TRANSFER_SRC,
                ImageResourceUsage::TransferDestination => ImageUsage::TRANSFER_DST,
                ImageResourceUsage::Present => ImageUsage::empty(),
            };
        }
    }

    /// ORs a declared usage into the deferred record; no-op for external
    /// buffers.
    pub(crate) fn add_buffer_usage(&mut self, handle: BufferHandle, usage: BufferResourceUsage) {
        let record = self
            .buffers_to_compile
            .iter_mut()
            .find(|record| record.handle == handle);
        if let Some(record) = record {
            record.desc.usage |= match usage {
                BufferResourceUsage::Structured => BufferUsage::STRUCTURED,
                BufferResourceUsage::Constant => BufferUsage::CONSTANT,
                BufferResourceUsage::Vertex => BufferUsage::VERTEX,
                BufferResourceUsage::Index => BufferUsage::INDEX,
                BufferResourceUsage::IndirectArgument => BufferUsage::INDIRECT,
                BufferResourceUsage::TransferSource => BufferUsage::TRANSFER_SRC,
                BufferResourceUsage::TransferDestination => BufferUsage::TRANSFER_DST,
            };
        }
    }

    /// Materialises every deferred record through the device. Returns true
    /// iff all creations succeed.
    pub(crate) fn compile(&mut self) -> bool {
        for image in self.images_to_compile.iter() {
            if !self
                .device
                .create_image_at(image.handle, &image.name, &image.desc)
            {
                error!(name = image.name.as_str(), "graph image failed to compile");
                return false;
            }
        }
        for buffer in self.buffers_to_compile.iter() {
            if !self
                .device
                .create_buffer_at(buffer.handle, &buffer.name, &buffer.desc)
            {
                error!(name = buffer.name.as_str(), "graph buffer failed to compile");
                return false;
            }
        }
        trace!(
            images = self.images_to_compile.len(),
            buffers = self.buffers_to_compile.len(),
            "compiled graph resources"
        );
        self.compiled = true;
        true
    }
}

impl Drop for ResourceLibrary {
    fn drop(&mut self) {
        // Compiled or not, release every declared handle through the
        // device's deferred path.
        for image in self.images_to_compile.drain(..) {
            self.device.destroy_image(image.handle);
        }
        for buffer in self.buffers_to_compile.drain(..) {
            self.device.destroy_buffer(buffer.handle);
        }
    }
}
