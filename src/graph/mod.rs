//! Declarative render graph: resource library, pass builders, compiler, and
//! the per-frame executor.

pub(crate) mod barrier;
pub(crate) mod dependency;
pub(crate) mod executor;
pub(crate) mod library;
pub(crate) mod pass;

pub use barrier::{
    format_aspect_mask, is_depth_and_stencil_format, is_depth_only_format, is_stencil_only_format,
    is_write_access,
};
pub use executor::RenderGraph;
pub use library::{GraphBufferDesc, GraphImageDesc};
pub use pass::{
    AttachmentOps, BufferResourceUsage, ClearValue, GraphPassBuilder, ImageResourceUsage, LoadOp,
    PipelineStage, QueueOperationType, ResourceAccessType, StoreOp,
};

use crate::{
    device::Device,
    error::GraphError,
    handle::{BufferHandle, GraphPassHandle, Handle, ImageHandle, SlotKey},
};
use dependency::DependencyGraph;
use library::ResourceLibrary;
use std::sync::Arc;
use tracing::trace_span;

/// Collects resource declarations and pass builders, then resolves them into
/// an executable [`RenderGraph`].
pub struct RenderGraphCompiler {
    device: Arc<Device>,
    library: ResourceLibrary,
    builders: Vec<GraphPassBuilder>,
}

impl RenderGraphCompiler {
    pub fn new(device: Arc<Device>) -> RenderGraphCompiler {
        RenderGraphCompiler {
            library: ResourceLibrary::new(device.clone()),
            device,
            builders: Vec::new(),
        }
    }

    /// Declares an image scoped to the graph. The image is materialised at
    /// compile time with the union of the usages passes declare for it.
    pub fn create_image(&mut self, name: &str, desc: &GraphImageDesc) -> ImageHandle {
        self.library.declare_image(name, desc)
    }

    /// Declares a buffer scoped to the graph.
    pub fn create_buffer(&mut self, name: &str, desc: &GraphBufferDesc) -> BufferHandle {
        self.library.declare_buffer(name, desc)
    }

    /// Adds a pass. `build` records the pass's resource usages and
    /// callbacks on the provided builder.
    pub fn add_graph_pass(
        &mut self,
        name: &str,
        operation_type: QueueOperationType,
        build: impl FnOnce(&mut GraphPassBuilder),
    ) -> GraphPassHandle {
        let mut builder = GraphPassBuilder::new(name, operation_type);
        builder.handle = Handle::from_key(SlotKey::new(self.builders.len() as u32, 0));

        build(&mut builder);
        builder.resolve_inferred_stages();

        for usage in builder.image_usages.iter() {
            self.library.add_image_usage(usage.image, usage.usage);
        }
        for usage in builder.buffer_usages.iter() {
            self.library.add_buffer_usage(usage.buffer, usage.usage);
        }

        let handle = builder.handle;
        self.builders.push(builder);
        handle
    }

    /// Materialises the declared resources, validates the dependency graph,
    /// and produces the executable graph.
    ///
    /// A dependency cycle is a declaration error and surfaces here, never
    /// during execution.
    pub fn compile(mut self) -> Result<RenderGraph, GraphError> {
        let _span = trace_span!("graph_compile", passes = self.builders.len()).entered();

        if !self.library.compile() {
            return Err(GraphError::ResourceCompilation);
        }

        let mut graph = DependencyGraph::new();
        for index in 0..self.builders.len() {
            graph.add_node(index);
        }
        for (index, builder) in self.builders.iter().enumerate() {
            for dep in builder.depends_on.iter() {
                let source = self
                    .builders
                    .iter()
                    .position(|candidate| candidate.handle == *dep);
                if let Some(source) = source {
                    graph.add_dependency(source, index);
                }
            }
        }
        let sorted = graph.toposort().map_err(|index| GraphError::DependencyCycle {
            pass: self.builders[index].name.clone(),
        })?;

        Ok(RenderGraph::new(
            self.device,
            self.library,
            self.builders,
            sorted,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Cycle detection itself is exercised through the dependency module;
    // compiler-level wiring is covered here via the handle mapping.
    #[test]
    fn pass_handles_are_declaration_indexed() {
        let a = GraphPassHandle::from_key(SlotKey::new(0, 0));
        let b = GraphPassHandle::from_key(SlotKey::new(1, 0));
        assert_ne!(a, b);
        assert_eq!(a.id(), 0);
        assert_eq!(b.id(), 1);
    }
}
