//! The compiled render graph and its per-frame executor.

use crate::{
    device::Device,
    error::{FrameError, SwapchainError},
    graph::{
        barrier::{
            buffer_usage_access_mask, image_usage_access_mask, image_usage_layout,
            image_usage_stage_mask, BarrierBatch, BufferState, ImageBarrierTarget, ImageState,
            StateTracker, SwapchainState,
        },
        dependency::DependencyGraph,
        library::ResourceLibrary,
        pass::GraphPassBuilder,
    },
    handle::{BufferHandle, FenceHandle, ImageHandle, RenderSurfaceHandle, SemaphoreHandle},
    queue::SemaphoreWait,
};
use ash::vk;
use fixedbitset::FixedBitSet;
use std::{collections::HashMap, sync::Arc};
use tracing::{trace, trace_span, warn};

const FRAME_FENCE_TIMEOUT_NS: u64 = 1_000_000_000;

/// Per-resource lookups the planner needs; split out so planning runs
/// without a live device in tests.
pub(crate) struct PassResolvers<'a> {
    pub(crate) queue_family: u32,
    pub(crate) image: &'a dyn Fn(ImageHandle) -> Option<ImageBarrierTarget>,
    pub(crate) swapchain_image: &'a dyn Fn(RenderSurfaceHandle) -> Option<vk::Image>,
    pub(crate) buffer: &'a dyn Fn(BufferHandle) -> Option<vk::Buffer>,
}

/// Computes the barrier batch for one pass from the last-known states, and
/// advances those states to the pass's declared usage.
pub(crate) fn plan_pass_barriers(
    states: &mut StateTracker,
    pass: &GraphPassBuilder,
    resolvers: &PassResolvers,
) -> BarrierBatch {
    let mut batch = BarrierBatch::new();

    for swap in pass.swapchain_usages.iter() {
        let image = match (resolvers.swapchain_image)(swap.surface) {
            Some(image) => image,
            None => continue,
        };
        let next = SwapchainState {
            stage_mask: image_usage_stage_mask(swap.usage, swap.access),
            access_mask: image_usage_access_mask(swap.usage, swap.access),
            layout: image_usage_layout(swap.usage),
        };
        states.transition_swapchain(
            swap.surface.pack(),
            image,
            resolvers.queue_family,
            next,
            &mut batch,
        );
    }

    for usage in pass.image_usages.iter() {
        let target = match (resolvers.image)(usage.image) {
            Some(target) => target,
            None => continue,
        };
        let next = ImageState {
            stage_mask: image_usage_stage_mask(usage.usage, usage.access),
            access_mask: image_usage_access_mask(usage.usage, usage.access),
            layout: image_usage_layout(usage.usage),
            queue_family: resolvers.queue_family,
        };
        states.transition_image(usage.image.pack(), target, next, &mut batch);
    }

    for usage in pass.buffer_usages.iter() {
        let raw = match (resolvers.buffer)(usage.buffer) {
            Some(raw) => raw,
            None => continue,
        };
        let next = BufferState {
            // first and last access collapse into one pessimistic union
            stage_mask: usage.first_stage.to_vk() | usage.last_stage.to_vk(),
            access_mask: buffer_usage_access_mask(usage.usage, usage.access),
            queue_family: resolvers.queue_family,
        };
        states.transition_buffer(usage.buffer.pack(), raw, next, &mut batch);
    }

    batch
}

/// Topologically sorts the active passes, tie-breaking by declaration
/// order. Explicit dependencies on inactive passes are ignored.
pub(crate) fn sort_active_passes(
    passes: &[GraphPassBuilder],
    active: &FixedBitSet,
) -> Vec<usize> {
    let mut graph = DependencyGraph::new();
    for index in 0..passes.len() {
        if active.contains(index) {
            graph.add_node(index);
        }
    }
    for (index, pass) in passes.iter().enumerate() {
        if !active.contains(index) {
            continue;
        }
        for dep in pass.depends_on.iter() {
            let source = passes
                .iter()
                .position(|candidate| candidate.handle == *dep);
            if let Some(source) = source {
                if active.contains(source) {
                    graph.add_dependency(source, index);
                }
            }
        }
    }
    // An active subset of a compile-validated DAG cannot introduce a cycle.
    graph
        .toposort()
        .expect("active pass subset stopped being acyclic")
}

/// Unique render surfaces referenced by the sorted active passes, in first
/// use order.
pub(crate) fn collect_active_swapchains(
    passes: &[GraphPassBuilder],
    sorted: &[usize],
) -> Vec<RenderSurfaceHandle> {
    let mut surfaces = Vec::new();
    for &index in sorted {
        for usage in passes[index].swapchain_usages.iter() {
            if !surfaces.contains(&usage.surface) {
                surfaces.push(usage.surface);
            }
        }
    }
    surfaces
}

/// Per-frame-slot synchronisation objects.
struct FrameSync {
    fence: FenceHandle,
    submitted: bool,
    /// Signalled by acquire, waited by the frame's submission.
    acquire_semaphores: HashMap<u64, SemaphoreHandle>,
    /// Signalled by the submission, waited by present.
    render_finished_semaphores: HashMap<u64, SemaphoreHandle>,
}

/// An immutable, compiled render graph plus its per-frame execution state.
pub struct RenderGraph {
    device: Arc<Device>,
    // owns the graph-declared resources; dropped with the graph
    #[allow(dead_code)]
    library: ResourceLibrary,
    passes: Vec<GraphPassBuilder>,
    active: FixedBitSet,
    sorted: Vec<usize>,
    active_swapchains: Vec<RenderSurfaceHandle>,
    states: StateTracker,
    frames: Vec<FrameSync>,
    first_frame: bool,
}

impl RenderGraph {
    pub(crate) fn new(
        device: Arc<Device>,
        library: ResourceLibrary,
        passes: Vec<GraphPassBuilder>,
        sorted: Vec<usize>,
    ) -> RenderGraph {
        let mut active = FixedBitSet::with_capacity(passes.len());
        active.set_range(.., true);

        let frames = (0..device.frames_in_flight())
            .map(|_| FrameSync {
                fence: device.create_fence(true),
                submitted: false,
                acquire_semaphores: HashMap::new(),
                render_finished_semaphores: HashMap::new(),
            })
            .collect();

        let active_swapchains = collect_active_swapchains(&passes, &sorted);

        RenderGraph {
            device,
            library,
            passes,
            active,
            sorted,
            active_swapchains,
            states: StateTracker::new(),
            frames,
            first_frame: true,
        }
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Passes that will run next frame given the current predicates.
    pub fn active_pass_names(&self) -> Vec<&str> {
        self.sorted
            .iter()
            .map(|&index| self.passes[index].name.as_str())
            .collect()
    }

    /// A swapchain was recreated: forget the tracked states of its previous
    /// back-buffers.
    pub fn invalidate_surface(&mut self, surface: RenderSurfaceHandle) {
        self.states.begin_swapchain_frame(surface.pack());
        for image in self.device.render_surface_images(surface) {
            self.states.forget_image(image.pack());
        }
    }

    /// Runs one frame: re-evaluates the active set, acquires the swapchains
    /// the active passes touch, plans and records barriers and pass
    /// callbacks, then submits and presents.
    pub fn execute(&mut self) -> Result<(), FrameError> {
        let _span = trace_span!("frame", index = self.device.current_frame()).entered();

        // 1. recompute the active set; re-sort only when it changed
        let mut changed = self.first_frame;
        self.first_frame = false;
        for (index, pass) in self.passes.iter().enumerate() {
            let should = pass.evaluate_should_execute();
            if self.active.contains(index) != should {
                changed = true;
            }
            self.active.set(index, should);
        }
        if changed {
            let _span = trace_span!("sort").entered();
            self.sorted = sort_active_passes(&self.passes, &self.active);
            self.active_swapchains = collect_active_swapchains(&self.passes, &self.sorted);
            trace!(active = self.sorted.len(), "re-sorted pass order");
        }

        self.device.start_frame();

        if self.sorted.is_empty() {
            // nothing active: no GPU work, no barriers
            self.device.end_frame();
            return Ok(());
        }

        // 2. frame pacing
        let slot = self.device.frame_slot();
        if self.frames[slot].submitted {
            if let Err(err) = self
                .device
                .wait_for_fence(self.frames[slot].fence, FRAME_FENCE_TIMEOUT_NS)
            {
                warn!(?err, "frame fence wait failed");
            }
        }
        self.device.primary_queue().reset_frame_pool(slot);

        // 3. acquire every swapchain the active passes touch
        let mut acquired: Vec<(RenderSurfaceHandle, u32, SemaphoreHandle, SemaphoreHandle)> =
            Vec::with_capacity(self.active_swapchains.len());
        for &surface in self.active_swapchains.iter() {
            let device = &self.device;
            let acquire_semaphore = *self.frames[slot]
                .acquire_semaphores
                .entry(surface.pack())
                .or_insert_with(|| device.create_semaphore());
            let render_finished = *self.frames[slot]
                .render_finished_semaphores
                .entry(surface.pack())
                .or_insert_with(|| device.create_semaphore());

            match self
                .device
                .acquire_next_image(surface, acquire_semaphore, FenceHandle::NULL)
            {
                Ok(image) => {
                    // a fresh back-buffer lifetime starts with undefined
                    // contents
                    self.states.begin_swapchain_frame(surface.pack());
                    acquired.push((surface, image.image_index, acquire_semaphore, render_finished));
                }
                Err(cause) => {
                    // the frame is abandoned; the client recreates the
                    // surface and retries
                    self.device.end_frame();
                    return Err(FrameError::SurfaceLost { surface, cause });
                }
            }
        }

        // 4. record the frame on the primary queue
        let device = self.device.clone();
        let queue_family = device.graphics_queue_family();
        let resolve_image = |handle: ImageHandle| {
            device
                .image_info(handle)
                .map(|info| ImageBarrierTarget::whole(info.raw, info.aspect))
        };
        let resolve_swapchain_image = |surface: RenderSurfaceHandle| {
            device
                .render_surface_current_image(surface)
                .and_then(|image| device.image_info(image))
                .map(|info| info.raw)
        };
        let resolve_buffer =
            |handle: BufferHandle| device.buffer_info(handle).map(|info| info.raw);
        let resolvers = PassResolvers {
            queue_family,
            image: &resolve_image,
            swapchain_image: &resolve_swapchain_image,
            buffer: &resolve_buffer,
        };

        let mut queue = self.device.primary_queue();
        let mut cmd = queue.acquire_command_list(slot);

        let sorted = self.sorted.clone();
        for &index in sorted.iter() {
            let batch = {
                let _span =
                    trace_span!("barriers", pass = self.passes[index].name.as_str()).entered();
                plan_pass_barriers(&mut self.states, &self.passes[index], &resolvers)
            };
            emit_barrier_batch(&device, cmd.raw(), &batch);
            self.passes[index].run(&mut cmd);
        }

        // 5. bring every touched back-buffer into PRESENT layout
        let present_batch = self.states.present_transitions(queue_family, |key| {
            let surface = RenderSurfaceHandle::unpack(key);
            device
                .render_surface_current_image(surface)
                .and_then(|image| device.image_info(image))
                .map(|info| info.raw)
        });
        emit_barrier_batch(&device, cmd.raw(), &present_batch);

        // 6. submit, fenced for pacing
        let waits: Vec<SemaphoreWait> = acquired
            .iter()
            .filter_map(|&(_, _, acquire, _)| {
                device.semaphore(acquire).map(|semaphore| SemaphoreWait {
                    semaphore,
                    dst_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                })
            })
            .collect();
        let signals: Vec<vk::Semaphore> = acquired
            .iter()
            .filter_map(|&(_, _, _, finished)| device.semaphore(finished))
            .collect();
        let fence = device.fence(self.frames[slot].fence).unwrap_or_default();
        if let Err(err) = device.reset_fence(self.frames[slot].fence) {
            warn!(?err, "frame fence reset failed");
        }
        queue
            .submit(&[cmd], &waits, &signals, fence)
            .map_err(FrameError::Device)?;
        self.frames[slot].submitted = true;

        self.device.end_frame();

        // 7. present
        for &(surface, image_index, _, finished) in acquired.iter() {
            let (swapchain, _) = match device.render_surface_present_state(surface) {
                Some(state) => state,
                None => continue,
            };
            let wait = device.semaphore(finished).into_iter().collect::<Vec<_>>();
            if let Err(cause) =
                queue.present(&device.vk_khr_swapchain, swapchain, image_index, &wait)
            {
                return Err(FrameError::SurfaceLost { surface, cause });
            }
        }

        Ok(())
    }
}

impl Drop for RenderGraph {
    fn drop(&mut self) {
        for frame in self.frames.drain(..) {
            self.device.destroy_fence(frame.fence);
            for (_, semaphore) in frame.acquire_semaphores {
                self.device.destroy_semaphore(semaphore);
            }
            for (_, semaphore) in frame.render_finished_semaphores {
                self.device.destroy_semaphore(semaphore);
            }
        }
    }
}

fn emit_barrier_batch(device: &Device, cmd: vk::CommandBuffer, batch: &BarrierBatch) {
    if batch.is_empty() {
        return;
    }
    let src_stage_mask = if batch.src_stage_mask.is_empty() {
        vk::PipelineStageFlags::TOP_OF_PIPE
    } else {
        batch.src_stage_mask
    };
    let dst_stage_mask = if batch.dst_stage_mask.is_empty() {
        vk::PipelineStageFlags::BOTTOM_OF_PIPE
    } else {
        batch.dst_stage_mask
    };
    unsafe {
        device.raw.cmd_pipeline_barrier(
            cmd,
            src_stage_mask,
            dst_stage_mask,
            vk::DependencyFlags::empty(),
            &[],
            &batch.buffer_barriers,
            &batch.image_barriers,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::pass::{
        AttachmentOps, GraphPassBuilder, PipelineStage, QueueOperationType,
    };
    use crate::handle::{GraphPassHandle, SlotKey};

    const QF: u32 = 0;

    fn null_resolvers<'a>(
        image: &'a dyn Fn(ImageHandle) -> Option<ImageBarrierTarget>,
        swapchain_image: &'a dyn Fn(RenderSurfaceHandle) -> Option<vk::Image>,
        buffer: &'a dyn Fn(BufferHandle) -> Option<vk::Buffer>,
    ) -> PassResolvers<'a> {
        PassResolvers {
            queue_family: QF,
            image,
            swapchain_image,
            buffer,
        }
    }

    fn image_handle(index: u32) -> ImageHandle {
        ImageHandle::from_key(SlotKey::new(index, 0))
    }

    fn surface_handle(index: u32) -> RenderSurfaceHandle {
        RenderSurfaceHandle::from_key(SlotKey::new(index, 0))
    }

    fn pass_handle(index: u32) -> GraphPassHandle {
        GraphPassHandle::from_key(SlotKey::new(index, 0))
    }

    fn resolve_any_image(_: ImageHandle) -> Option<ImageBarrierTarget> {
        Some(ImageBarrierTarget::whole(
            vk::Image::null(),
            vk::ImageAspectFlags::COLOR,
        ))
    }

    fn resolve_any_swapchain(_: RenderSurfaceHandle) -> Option<vk::Image> {
        Some(vk::Image::null())
    }

    fn resolve_any_buffer(_: BufferHandle) -> Option<vk::Buffer> {
        Some(vk::Buffer::null())
    }

    /// One pass clearing a swapchain back-buffer: exactly one barrier
    /// UNDEFINED -> COLOR before the pass and one COLOR -> PRESENT after
    /// it.
    #[test]
    fn single_pass_clear_produces_two_transitions() {
        let mut states = StateTracker::new();
        let surface = surface_handle(1);

        let mut pass = GraphPassBuilder::new("clear", QueueOperationType::Graphics);
        pass.add_swapchain_color_output(surface, AttachmentOps::clear_color([0.0; 4]));

        states.begin_swapchain_frame(surface.pack());
        let resolvers =
            null_resolvers(&resolve_any_image, &resolve_any_swapchain, &resolve_any_buffer);
        let batch = plan_pass_barriers(&mut states, &pass, &resolvers);

        assert_eq!(batch.image_barriers.len(), 1);
        assert_eq!(batch.buffer_barriers.len(), 0);
        let barrier = &batch.image_barriers[0];
        assert_eq!(barrier.old_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(barrier.new_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

        let present = states.present_transitions(QF, |_| Some(vk::Image::null()));
        assert_eq!(present.image_barriers.len(), 1);
        let barrier = &present.image_barriers[0];
        assert_eq!(barrier.old_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(barrier.new_layout, vk::ImageLayout::PRESENT_SRC_KHR);
    }

    /// Pass A writes color into X, pass B samples X: the planner emits the
    /// UNDEFINED -> COLOR acquire before A and COLOR -> SHADER_READ between
    /// A and B with color-output as source stage and fragment as
    /// destination stage.
    #[test]
    fn two_pass_deferred_transition_chain() {
        let mut states = StateTracker::new();
        let x = image_handle(7);

        let mut a = GraphPassBuilder::new("gbuffer", QueueOperationType::Graphics);
        a.add_color_attachment(
            x,
            AttachmentOps::clear_color([0.0; 4]),
            PipelineStage::Infer,
            PipelineStage::Infer,
        );
        a.resolve_inferred_stages();
        let mut b = GraphPassBuilder::new("lighting", QueueOperationType::Graphics);
        b.add_sampled_image(x, PipelineStage::Infer, PipelineStage::Infer);
        b.resolve_inferred_stages();

        let resolvers =
            null_resolvers(&resolve_any_image, &resolve_any_swapchain, &resolve_any_buffer);
        let before_a = plan_pass_barriers(&mut states, &a, &resolvers);
        assert_eq!(before_a.image_barriers.len(), 1);
        assert_eq!(before_a.image_barriers[0].old_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(
            before_a.image_barriers[0].new_layout,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
        );

        let before_b = plan_pass_barriers(&mut states, &b, &resolvers);
        assert_eq!(before_b.image_barriers.len(), 1);
        let barrier = &before_b.image_barriers[0];
        assert_eq!(barrier.old_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(barrier.new_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert_eq!(
            before_b.src_stage_mask,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        );
        assert_eq!(before_b.dst_stage_mask, vk::PipelineStageFlags::FRAGMENT_SHADER);
    }

    /// Barrier counts follow state transitions, not declaration counts: a
    /// pass re-reading an image in the same layout plans nothing.
    #[test]
    fn redundant_declarations_plan_no_barriers() {
        let mut states = StateTracker::new();
        let x = image_handle(3);

        let mut producer = GraphPassBuilder::new("produce", QueueOperationType::Graphics);
        producer.add_color_attachment(
            x,
            AttachmentOps::LOAD_STORE,
            PipelineStage::Infer,
            PipelineStage::Infer,
        );
        producer.resolve_inferred_stages();

        let mut reader = GraphPassBuilder::new("read", QueueOperationType::Graphics);
        reader.add_sampled_image(x, PipelineStage::Infer, PipelineStage::Infer);
        reader.resolve_inferred_stages();

        let resolvers =
            null_resolvers(&resolve_any_image, &resolve_any_swapchain, &resolve_any_buffer);
        plan_pass_barriers(&mut states, &producer, &resolvers);
        let first_read = plan_pass_barriers(&mut states, &reader, &resolvers);
        assert_eq!(first_read.image_barriers.len(), 1);

        let mut second_reader = GraphPassBuilder::new("read2", QueueOperationType::Graphics);
        second_reader.add_sampled_image(x, PipelineStage::Infer, PipelineStage::Infer);
        second_reader.resolve_inferred_stages();
        let second_read = plan_pass_barriers(&mut states, &second_reader, &resolvers);
        assert!(second_read.is_empty());
    }

    fn three_pass_chain() -> Vec<GraphPassBuilder> {
        let mut a = GraphPassBuilder::new("a", QueueOperationType::Graphics);
        a.handle = pass_handle(0);
        let mut b = GraphPassBuilder::new("b", QueueOperationType::Graphics);
        b.handle = pass_handle(1);
        b.depends_on(pass_handle(0));
        let mut c = GraphPassBuilder::new("c", QueueOperationType::Graphics);
        c.handle = pass_handle(2);
        c.depends_on(pass_handle(1));
        vec![a, b, c]
    }

    #[test]
    fn explicit_dependencies_order_the_sort() {
        let passes = three_pass_chain();
        let mut active = FixedBitSet::with_capacity(3);
        active.set_range(.., true);
        assert_eq!(sort_active_passes(&passes, &active), vec![0, 1, 2]);
    }

    /// Disabling a middle pass re-sorts the remainder and the downstream
    /// pass observes the state the upstream pass left behind.
    #[test]
    fn inactive_pass_resort_skips_its_barriers() {
        let x = image_handle(9);

        let mut passes = three_pass_chain();
        passes[0].add_color_attachment(
            x,
            AttachmentOps::LOAD_STORE,
            PipelineStage::Infer,
            PipelineStage::Infer,
        );
        passes[0].resolve_inferred_stages();
        passes[1].add_writable_storage_image(x, PipelineStage::Infer, PipelineStage::Infer);
        passes[1].resolve_inferred_stages();
        passes[2].add_sampled_image(x, PipelineStage::Infer, PipelineStage::Infer);
        passes[2].resolve_inferred_stages();

        let resolvers =
            null_resolvers(&resolve_any_image, &resolve_any_swapchain, &resolve_any_buffer);

        // frame 1: all passes active
        let mut active = FixedBitSet::with_capacity(3);
        active.set_range(.., true);
        assert_eq!(sort_active_passes(&passes, &active), vec![0, 1, 2]);
        let mut states = StateTracker::new();
        for index in [0usize, 1, 2].iter() {
            plan_pass_barriers(&mut states, &passes[*index], &resolvers);
        }

        // frame 2: b inactive
        active.set(1, false);
        let sorted = sort_active_passes(&passes, &active);
        assert_eq!(sorted, vec![0, 2]);

        let mut states = StateTracker::new();
        let mut barriers = Vec::new();
        for index in sorted.iter() {
            let batch = plan_pass_barriers(&mut states, &passes[*index], &resolvers);
            barriers.extend(batch.image_barriers);
        }
        // acquire for a, then color -> sampled for c; no GENERAL layout
        // transitions from the disabled storage pass
        assert_eq!(barriers.len(), 2);
        assert!(barriers
            .iter()
            .all(|b| b.new_layout != vk::ImageLayout::GENERAL));
        assert_eq!(
            barriers[1].old_layout,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
        );
        assert_eq!(
            barriers[1].new_layout,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
        );
    }

    #[test]
    fn active_swapchains_follow_the_active_set() {
        let s1 = surface_handle(1);
        let s2 = surface_handle(2);

        let mut a = GraphPassBuilder::new("a", QueueOperationType::Graphics);
        a.handle = pass_handle(0);
        a.add_swapchain_color_output(s1, AttachmentOps::LOAD_STORE);
        let mut b = GraphPassBuilder::new("b", QueueOperationType::Graphics);
        b.handle = pass_handle(1);
        b.add_swapchain_color_output(s2, AttachmentOps::LOAD_STORE);
        // also touches s1; the set must stay unique
        b.add_swapchain_blit_target(s1);
        let passes = vec![a, b];

        let mut active = FixedBitSet::with_capacity(2);
        active.set_range(.., true);
        let sorted = sort_active_passes(&passes, &active);
        assert_eq!(collect_active_swapchains(&passes, &sorted), vec![s1, s2]);

        active.set(1, false);
        let sorted = sort_active_passes(&passes, &active);
        assert_eq!(collect_active_swapchains(&passes, &sorted), vec![s1]);
    }

    /// Re-sorting the same declarations yields the same order.
    #[test]
    fn recompiling_reproduces_the_sort() {
        let passes = three_pass_chain();
        let mut active = FixedBitSet::with_capacity(3);
        active.set_range(.., true);
        let first = sort_active_passes(&passes, &active);
        let second = sort_active_passes(&passes, &active);
        assert_eq!(first, second);
    }
}
