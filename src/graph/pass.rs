//! Pass declarations: the fluent builder and the records it produces.

use crate::{
    handle::{BufferHandle, GraphPassHandle, ImageHandle, RenderSurfaceHandle, SamplerHandle},
    queue::CommandList,
};
use ash::vk;
use std::fmt;

/// Queue-operation class of a pass.
///
/// The executor currently serialises all classes to the primary queue; the
/// class is kept on the record so dedicated-queue scheduling can be layered
/// on later without re-declaring passes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum QueueOperationType {
    Graphics,
    GraphicsAndTransfer,
    Compute,
    Transfer,
}

/// How a pass accesses a resource.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ResourceAccessType {
    Read,
    Write,
    ReadWrite,
}

impl ResourceAccessType {
    pub fn reads(self) -> bool {
        self != ResourceAccessType::Write
    }

    pub fn writes(self) -> bool {
        self != ResourceAccessType::Read
    }
}

/// What a pass uses an image for.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ImageResourceUsage {
    ColorAttachment,
    DepthAttachment,
    Sampled,
    Storage,
    TransferSource,
    TransferDestination,
    Present,
}

/// What a pass uses a buffer for.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BufferResourceUsage {
    Structured,
    Constant,
    Vertex,
    Index,
    IndirectArgument,
    TransferSource,
    TransferDestination,
}

/// Abstract pipeline stage points accepted by the builder. `Infer` resolves
/// from the declared usage.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PipelineStage {
    Infer,
    TopOfPipe,
    DrawIndirect,
    VertexInput,
    VertexShader,
    FragmentShader,
    /// Early and late fragment tests (depth/stencil).
    FragmentTests,
    ColorOutput,
    ComputeShader,
    Transfer,
    BottomOfPipe,
}

impl PipelineStage {
    pub(crate) fn to_vk(self) -> vk::PipelineStageFlags {
        match self {
            PipelineStage::Infer => vk::PipelineStageFlags::TOP_OF_PIPE,
            PipelineStage::TopOfPipe => vk::PipelineStageFlags::TOP_OF_PIPE,
            PipelineStage::DrawIndirect => vk::PipelineStageFlags::DRAW_INDIRECT,
            PipelineStage::VertexInput => vk::PipelineStageFlags::VERTEX_INPUT,
            PipelineStage::VertexShader => vk::PipelineStageFlags::VERTEX_SHADER,
            PipelineStage::FragmentShader => vk::PipelineStageFlags::FRAGMENT_SHADER,
            PipelineStage::FragmentTests => {
                vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
                    | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS
            }
            PipelineStage::ColorOutput => vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            PipelineStage::ComputeShader => vk::PipelineStageFlags::COMPUTE_SHADER,
            PipelineStage::Transfer => vk::PipelineStageFlags::TRANSFER,
            PipelineStage::BottomOfPipe => vk::PipelineStageFlags::BOTTOM_OF_PIPE,
        }
    }
}

/// Stage a usage resolves to when the builder is left on `Infer`.
fn infer_image_stage(usage: ImageResourceUsage) -> PipelineStage {
    match usage {
        ImageResourceUsage::ColorAttachment => PipelineStage::ColorOutput,
        ImageResourceUsage::DepthAttachment => PipelineStage::FragmentTests,
        ImageResourceUsage::Sampled => PipelineStage::FragmentShader,
        ImageResourceUsage::Storage => PipelineStage::ComputeShader,
        ImageResourceUsage::TransferSource | ImageResourceUsage::TransferDestination => {
            PipelineStage::Transfer
        }
        ImageResourceUsage::Present => PipelineStage::BottomOfPipe,
    }
}

fn infer_buffer_stage(usage: BufferResourceUsage) -> PipelineStage {
    match usage {
        BufferResourceUsage::Structured => PipelineStage::ComputeShader,
        BufferResourceUsage::Constant => PipelineStage::VertexShader,
        BufferResourceUsage::Vertex | BufferResourceUsage::Index => PipelineStage::VertexInput,
        BufferResourceUsage::IndirectArgument => PipelineStage::DrawIndirect,
        BufferResourceUsage::TransferSource | BufferResourceUsage::TransferDestination => {
            PipelineStage::Transfer
        }
    }
}

/// Clear value for attachments declared with `LoadOp::Clear`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

impl ClearValue {
    pub fn to_vk(self) -> vk::ClearValue {
        match self {
            ClearValue::Color(float32) => vk::ClearValue {
                color: vk::ClearColorValue { float32 },
            },
            ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
            },
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum LoadOp {
    Load,
    Clear,
    DontCare,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum StoreOp {
    Store,
    DontCare,
}

/// Load/store behaviour of an attachment declaration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AttachmentOps {
    pub load: LoadOp,
    pub store: StoreOp,
    pub clear: Option<ClearValue>,
}

impl AttachmentOps {
    pub const LOAD_STORE: AttachmentOps = AttachmentOps {
        load: LoadOp::Load,
        store: StoreOp::Store,
        clear: None,
    };

    pub fn clear_color(value: [f32; 4]) -> AttachmentOps {
        AttachmentOps {
            load: LoadOp::Clear,
            store: StoreOp::Store,
            clear: Some(ClearValue::Color(value)),
        }
    }

    pub fn clear_depth(depth: f32) -> AttachmentOps {
        AttachmentOps {
            load: LoadOp::Clear,
            store: StoreOp::Store,
            clear: Some(ClearValue::DepthStencil { depth, stencil: 0 }),
        }
    }
}

/// One image access declared by a pass.
#[derive(Copy, Clone, Debug)]
pub(crate) struct ImageUsageRecord {
    pub(crate) image: ImageHandle,
    pub(crate) usage: ImageResourceUsage,
    pub(crate) access: ResourceAccessType,
    pub(crate) first_stage: PipelineStage,
    pub(crate) last_stage: PipelineStage,
    pub(crate) ops: Option<AttachmentOps>,
}

/// One buffer access declared by a pass.
#[derive(Copy, Clone, Debug)]
pub(crate) struct BufferUsageRecord {
    pub(crate) buffer: BufferHandle,
    pub(crate) usage: BufferResourceUsage,
    pub(crate) access: ResourceAccessType,
    pub(crate) first_stage: PipelineStage,
    pub(crate) last_stage: PipelineStage,
}

/// One swapchain access declared by a pass.
#[derive(Copy, Clone, Debug)]
pub(crate) struct SwapchainUsageRecord {
    pub(crate) surface: RenderSurfaceHandle,
    pub(crate) usage: ImageResourceUsage,
    pub(crate) access: ResourceAccessType,
    pub(crate) ops: Option<AttachmentOps>,
}

/// Builder for a graph pass; also the pass record the compiled graph owns.
///
/// All declaration methods return `&mut Self` so a pass reads as one chain.
pub struct GraphPassBuilder {
    pub(crate) name: String,
    pub(crate) operation_type: QueueOperationType,
    pub(crate) handle: GraphPassHandle,
    pub(crate) image_usages: Vec<ImageUsageRecord>,
    pub(crate) buffer_usages: Vec<BufferUsageRecord>,
    pub(crate) swapchain_usages: Vec<SwapchainUsageRecord>,
    pub(crate) samplers: Vec<SamplerHandle>,
    pub(crate) depends_on: Vec<GraphPassHandle>,
    pub(crate) should_execute: Option<Box<dyn Fn() -> bool>>,
    pub(crate) execute: Option<Box<dyn FnMut(&mut CommandList)>>,
}

impl fmt::Debug for GraphPassBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("GraphPassBuilder")
            .field("name", &self.name)
            .field("operation_type", &self.operation_type)
            .field("images", &self.image_usages.len())
            .field("buffers", &self.buffer_usages.len())
            .field("swapchains", &self.swapchain_usages.len())
            .finish()
    }
}

impl GraphPassBuilder {
    pub(crate) fn new(name: &str, operation_type: QueueOperationType) -> GraphPassBuilder {
        GraphPassBuilder {
            name: name.to_string(),
            operation_type,
            handle: GraphPassHandle::NULL,
            image_usages: vec![],
            buffer_usages: vec![],
            swapchain_usages: vec![],
            samplers: vec![],
            depends_on: vec![],
            should_execute: None,
            execute: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operation_type(&self) -> QueueOperationType {
        self.operation_type
    }

    /// Handle other passes use in `depends_on` declarations.
    pub fn handle(&self) -> GraphPassHandle {
        self.handle
    }

    /// Samplers kept alive for this pass.
    pub fn samplers(&self) -> &[SamplerHandle] {
        &self.samplers
    }

    /// Load/store declaration for an attachment image of this pass, if any.
    pub fn image_attachment_ops(&self, image: ImageHandle) -> Option<AttachmentOps> {
        self.image_usages
            .iter()
            .find(|usage| usage.image == image)
            .and_then(|usage| usage.ops)
    }

    /// Load/store declaration for a swapchain output of this pass, if any.
    pub fn swapchain_attachment_ops(&self, surface: RenderSurfaceHandle) -> Option<AttachmentOps> {
        self.swapchain_usages
            .iter()
            .find(|usage| usage.surface == surface)
            .and_then(|usage| usage.ops)
    }

    fn add_image(
        &mut self,
        image: ImageHandle,
        usage: ImageResourceUsage,
        access: ResourceAccessType,
        first_stage: PipelineStage,
        last_stage: PipelineStage,
        ops: Option<AttachmentOps>,
    ) -> &mut Self {
        self.image_usages.push(ImageUsageRecord {
            image,
            usage,
            access,
            first_stage,
            last_stage,
            ops,
        });
        self
    }

    /// Declares a color attachment written by this pass.
    pub fn add_color_attachment(
        &mut self,
        image: ImageHandle,
        ops: AttachmentOps,
        first_write: PipelineStage,
        last_write: PipelineStage,
    ) -> &mut Self {
        self.add_image(
            image,
            ImageResourceUsage::ColorAttachment,
            ResourceAccessType::Write,
            first_write,
            last_write,
            Some(ops),
        )
    }

    /// Declares a depth attachment written by this pass.
    pub fn add_depth_attachment(
        &mut self,
        image: ImageHandle,
        ops: AttachmentOps,
        first_write: PipelineStage,
        last_write: PipelineStage,
    ) -> &mut Self {
        self.add_image(
            image,
            ImageResourceUsage::DepthAttachment,
            ResourceAccessType::Write,
            first_write,
            last_write,
            Some(ops),
        )
    }

    /// Declares an image sampled by this pass.
    pub fn add_sampled_image(
        &mut self,
        image: ImageHandle,
        first_read: PipelineStage,
        last_read: PipelineStage,
    ) -> &mut Self {
        self.add_image(
            image,
            ImageResourceUsage::Sampled,
            ResourceAccessType::Read,
            first_read,
            last_read,
            None,
        )
    }

    /// Declares a storage image read by this pass.
    pub fn add_storage_image(
        &mut self,
        image: ImageHandle,
        first_read: PipelineStage,
        last_read: PipelineStage,
    ) -> &mut Self {
        self.add_image(
            image,
            ImageResourceUsage::Storage,
            ResourceAccessType::Read,
            first_read,
            last_read,
            None,
        )
    }

    /// Declares a storage image read and written by this pass.
    pub fn add_writable_storage_image(
        &mut self,
        image: ImageHandle,
        first_access: PipelineStage,
        last_access: PipelineStage,
    ) -> &mut Self {
        self.add_image(
            image,
            ImageResourceUsage::Storage,
            ResourceAccessType::ReadWrite,
            first_access,
            last_access,
            None,
        )
    }

    /// Declares an image this pass copies or blits from.
    pub fn add_blit_source(
        &mut self,
        image: ImageHandle,
        first_read: PipelineStage,
        last_read: PipelineStage,
    ) -> &mut Self {
        self.add_image(
            image,
            ImageResourceUsage::TransferSource,
            ResourceAccessType::Read,
            first_read,
            last_read,
            None,
        )
    }

    /// Declares an image this pass copies or blits into.
    pub fn add_blit_target(
        &mut self,
        image: ImageHandle,
        first_write: PipelineStage,
        last_write: PipelineStage,
    ) -> &mut Self {
        self.add_image(
            image,
            ImageResourceUsage::TransferDestination,
            ResourceAccessType::Write,
            first_write,
            last_write,
            None,
        )
    }

    /// Declares a color attachment on the current back-buffer of a render
    /// surface.
    pub fn add_swapchain_color_output(
        &mut self,
        surface: RenderSurfaceHandle,
        ops: AttachmentOps,
    ) -> &mut Self {
        self.swapchain_usages.push(SwapchainUsageRecord {
            surface,
            usage: ImageResourceUsage::ColorAttachment,
            access: ResourceAccessType::Write,
            ops: Some(ops),
        });
        self
    }

    /// Declares the current back-buffer of a render surface as a blit
    /// target.
    pub fn add_swapchain_blit_target(&mut self, surface: RenderSurfaceHandle) -> &mut Self {
        self.swapchain_usages.push(SwapchainUsageRecord {
            surface,
            usage: ImageResourceUsage::TransferDestination,
            access: ResourceAccessType::Write,
            ops: None,
        });
        self
    }

    fn add_buffer(
        &mut self,
        buffer: BufferHandle,
        usage: BufferResourceUsage,
        access: ResourceAccessType,
        first_stage: PipelineStage,
        last_stage: PipelineStage,
    ) -> &mut Self {
        self.buffer_usages.push(BufferUsageRecord {
            buffer,
            usage,
            access,
            first_stage,
            last_stage,
        });
        self
    }

    pub fn add_structured_buffer(
        &mut self,
        buffer: BufferHandle,
        first_read: PipelineStage,
        last_read: PipelineStage,
    ) -> &mut Self {
        self.add_buffer(
            buffer,
            BufferResourceUsage::Structured,
            ResourceAccessType::Read,
            first_read,
            last_read,
        )
    }

    pub fn add_rw_structured_buffer(
        &mut self,
        buffer: BufferHandle,
        first_access: PipelineStage,
        last_access: PipelineStage,
    ) -> &mut Self {
        self.add_buffer(
            buffer,
            BufferResourceUsage::Structured,
            ResourceAccessType::ReadWrite,
            first_access,
            last_access,
        )
    }

    pub fn add_constant_buffer(
        &mut self,
        buffer: BufferHandle,
        first_read: PipelineStage,
        last_read: PipelineStage,
    ) -> &mut Self {
        self.add_buffer(
            buffer,
            BufferResourceUsage::Constant,
            ResourceAccessType::Read,
            first_read,
            last_read,
        )
    }

    pub fn add_vertex_buffer(
        &mut self,
        buffer: BufferHandle,
        first_read: PipelineStage,
        last_read: PipelineStage,
    ) -> &mut Self {
        self.add_buffer(
            buffer,
            BufferResourceUsage::Vertex,
            ResourceAccessType::Read,
            first_read,
            last_read,
        )
    }

    pub fn add_index_buffer(
        &mut self,
        buffer: BufferHandle,
        first_read: PipelineStage,
        last_read: PipelineStage,
    ) -> &mut Self {
        self.add_buffer(
            buffer,
            BufferResourceUsage::Index,
            ResourceAccessType::Read,
            first_read,
            last_read,
        )
    }

    pub fn add_indirect_argument_buffer(
        &mut self,
        buffer: BufferHandle,
        first_read: PipelineStage,
        last_read: PipelineStage,
    ) -> &mut Self {
        self.add_buffer(
            buffer,
            BufferResourceUsage::IndirectArgument,
            ResourceAccessType::Read,
            first_read,
            last_read,
        )
    }

    pub fn add_transfer_source_buffer(
        &mut self,
        buffer: BufferHandle,
        first_read: PipelineStage,
        last_read: PipelineStage,
    ) -> &mut Self {
        self.add_buffer(
            buffer,
            BufferResourceUsage::TransferSource,
            ResourceAccessType::Read,
            first_read,
            last_read,
        )
    }

    pub fn add_transfer_destination_buffer(
        &mut self,
        buffer: BufferHandle,
        first_write: PipelineStage,
        last_write: PipelineStage,
    ) -> &mut Self {
        self.add_buffer(
            buffer,
            BufferResourceUsage::TransferDestination,
            ResourceAccessType::Write,
            first_write,
            last_write,
        )
    }

    /// Keeps a sampler associated with this pass for its lifetime.
    pub fn add_sampler(&mut self, sampler: SamplerHandle) -> &mut Self {
        self.samplers.push(sampler);
        self
    }

    /// Forces this pass to execute after `pass`, beyond any data
    /// dependencies.
    pub fn depends_on(&mut self, pass: GraphPassHandle) -> &mut Self {
        self.depends_on.push(pass);
        self
    }

    /// Registers the predicate deciding per frame whether this pass runs.
    /// Absent a predicate, the pass always runs.
    pub fn should_execute(&mut self, predicate: impl Fn() -> bool + 'static) -> &mut Self {
        self.should_execute = Some(Box::new(predicate));
        self
    }

    /// Registers the recording callback invoked once the pass's barriers
    /// have been emitted.
    pub fn on_execute(&mut self, commands: impl FnMut(&mut CommandList) + 'static) -> &mut Self {
        self.execute = Some(Box::new(commands));
        self
    }

    pub(crate) fn evaluate_should_execute(&self) -> bool {
        self.should_execute.as_ref().map(|f| f()).unwrap_or(true)
    }

    pub(crate) fn run(&mut self, cmd: &mut CommandList) {
        if let Some(execute) = self.execute.as_mut() {
            execute(cmd);
        }
    }

    /// Resolves `Infer` stage sentinels from the declared usages.
    pub(crate) fn resolve_inferred_stages(&mut self) {
        for state in self.image_usages.iter_mut() {
            if state.first_stage == PipelineStage::Infer {
                state.first_stage = infer_image_stage(state.usage);
            }
            if state.last_stage == PipelineStage::Infer {
                state.last_stage = infer_image_stage(state.usage);
            }
        }
        for state in self.buffer_usages.iter_mut() {
            if state.first_stage == PipelineStage::Infer {
                state.first_stage = infer_buffer_stage(state.usage);
            }
            if state.last_stage == PipelineStage::Infer {
                state.last_stage = infer_buffer_stage(state.usage);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_resolves_from_usage() {
        let mut pass = GraphPassBuilder::new("p", QueueOperationType::Graphics);
        pass.add_color_attachment(
            Default::default(),
            AttachmentOps::clear_color([0.0; 4]),
            PipelineStage::Infer,
            PipelineStage::Infer,
        )
        .add_sampled_image(
            Default::default(),
            PipelineStage::Infer,
            PipelineStage::Infer,
        )
        .add_index_buffer(
            Default::default(),
            PipelineStage::Infer,
            PipelineStage::Infer,
        );
        pass.resolve_inferred_stages();

        assert_eq!(pass.image_usages[0].first_stage, PipelineStage::ColorOutput);
        assert_eq!(pass.image_usages[0].last_stage, PipelineStage::ColorOutput);
        assert_eq!(
            pass.image_usages[1].first_stage,
            PipelineStage::FragmentShader
        );
        assert_eq!(pass.buffer_usages[0].first_stage, PipelineStage::VertexInput);
    }

    #[test]
    fn explicit_stages_are_preserved() {
        let mut pass = GraphPassBuilder::new("p", QueueOperationType::Compute);
        pass.add_writable_storage_image(
            Default::default(),
            PipelineStage::ComputeShader,
            PipelineStage::ComputeShader,
        );
        pass.resolve_inferred_stages();
        assert_eq!(
            pass.image_usages[0].first_stage,
            PipelineStage::ComputeShader
        );
    }

    #[test]
    fn default_pass_always_executes() {
        let pass = GraphPassBuilder::new("p", QueueOperationType::Graphics);
        assert!(pass.evaluate_should_execute());

        let mut gated = GraphPassBuilder::new("q", QueueOperationType::Graphics);
        gated.should_execute(|| false);
        assert!(!gated.evaluate_should_execute());
    }
}
