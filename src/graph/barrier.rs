//! Barrier planning: usage-to-state mapping tables and last-known-state
//! tracking.
//!
//! The planner is pessimistic on purpose: each pass gets at most one
//! pipeline-barrier command whose stage masks are the union of the first and
//! last access points of everything the pass touches.

use crate::graph::pass::{BufferResourceUsage, ImageResourceUsage, ResourceAccessType};
use ash::vk;
use std::collections::HashMap;

pub fn is_write_access(mask: vk::AccessFlags) -> bool {
    mask.intersects(
        vk::AccessFlags::SHADER_WRITE
            | vk::AccessFlags::COLOR_ATTACHMENT_WRITE
            | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE
            | vk::AccessFlags::TRANSFER_WRITE
            | vk::AccessFlags::HOST_WRITE
            | vk::AccessFlags::MEMORY_WRITE,
    )
}

pub fn is_depth_and_stencil_format(fmt: vk::Format) -> bool {
    match fmt {
        vk::Format::D16_UNORM_S8_UINT => true,
        vk::Format::D24_UNORM_S8_UINT => true,
        vk::Format::D32_SFLOAT_S8_UINT => true,
        _ => false,
    }
}

pub fn is_depth_only_format(fmt: vk::Format) -> bool {
    match fmt {
        vk::Format::D16_UNORM => true,
        vk::Format::X8_D24_UNORM_PACK32 => true,
        vk::Format::D32_SFLOAT => true,
        _ => false,
    }
}

pub fn is_stencil_only_format(fmt: vk::Format) -> bool {
    match fmt {
        vk::Format::S8_UINT => true,
        _ => false,
    }
}

pub fn format_aspect_mask(fmt: vk::Format) -> vk::ImageAspectFlags {
    if is_depth_only_format(fmt) {
        vk::ImageAspectFlags::DEPTH
    } else if is_stencil_only_format(fmt) {
        vk::ImageAspectFlags::STENCIL
    } else if is_depth_and_stencil_format(fmt) {
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

/// Layout an image must be in for the given usage.
pub(crate) fn image_usage_layout(usage: ImageResourceUsage) -> vk::ImageLayout {
    match usage {
        ImageResourceUsage::ColorAttachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ImageResourceUsage::DepthAttachment => vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL,
        ImageResourceUsage::Sampled => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        ImageResourceUsage::Storage => vk::ImageLayout::GENERAL,
        ImageResourceUsage::TransferSource => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        ImageResourceUsage::TransferDestination => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        ImageResourceUsage::Present => vk::ImageLayout::PRESENT_SRC_KHR,
    }
}

/// Pipeline stages touching an image for the given usage and access type.
/// Read-write unions the read and write stages.
pub(crate) fn image_usage_stage_mask(
    usage: ImageResourceUsage,
    access: ResourceAccessType,
) -> vk::PipelineStageFlags {
    match usage {
        ImageResourceUsage::ColorAttachment => match access {
            ResourceAccessType::Read | ResourceAccessType::ReadWrite => {
                vk::PipelineStageFlags::FRAGMENT_SHADER
                    | vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
            }
            ResourceAccessType::Write => vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        },
        ImageResourceUsage::DepthAttachment => match access {
            ResourceAccessType::Read => vk::PipelineStageFlags::FRAGMENT_SHADER,
            ResourceAccessType::Write => {
                vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
                    | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS
            }
            ResourceAccessType::ReadWrite => {
                vk::PipelineStageFlags::FRAGMENT_SHADER
                    | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
                    | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS
            }
        },
        ImageResourceUsage::Sampled => vk::PipelineStageFlags::FRAGMENT_SHADER,
        ImageResourceUsage::Storage => vk::PipelineStageFlags::COMPUTE_SHADER,
        ImageResourceUsage::TransferSource | ImageResourceUsage::TransferDestination => {
            vk::PipelineStageFlags::TRANSFER
        }
        ImageResourceUsage::Present => vk::PipelineStageFlags::BOTTOM_OF_PIPE,
    }
}

/// Access mask for an image usage. Read-write unions both directions.
pub(crate) fn image_usage_access_mask(
    usage: ImageResourceUsage,
    access: ResourceAccessType,
) -> vk::AccessFlags {
    match usage {
        ImageResourceUsage::ColorAttachment => match access {
            ResourceAccessType::Read => vk::AccessFlags::COLOR_ATTACHMENT_READ,
            ResourceAccessType::Write => vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            ResourceAccessType::ReadWrite => {
                vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE
            }
        },
        ImageResourceUsage::DepthAttachment => match access {
            ResourceAccessType::Read => vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
            ResourceAccessType::Write => vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            ResourceAccessType::ReadWrite => {
                vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE
            }
        },
        ImageResourceUsage::Sampled => vk::AccessFlags::SHADER_READ,
        ImageResourceUsage::Storage => match access {
            ResourceAccessType::Read => vk::AccessFlags::SHADER_READ,
            ResourceAccessType::Write => vk::AccessFlags::SHADER_WRITE,
            ResourceAccessType::ReadWrite => {
                vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE
            }
        },
        ImageResourceUsage::TransferSource => vk::AccessFlags::TRANSFER_READ,
        ImageResourceUsage::TransferDestination => vk::AccessFlags::TRANSFER_WRITE,
        ImageResourceUsage::Present => vk::AccessFlags::empty(),
    }
}

/// Access mask for a buffer usage.
pub(crate) fn buffer_usage_access_mask(
    usage: BufferResourceUsage,
    access: ResourceAccessType,
) -> vk::AccessFlags {
    match usage {
        BufferResourceUsage::Structured => match access {
            ResourceAccessType::Read => vk::AccessFlags::SHADER_READ,
            ResourceAccessType::Write => vk::AccessFlags::SHADER_WRITE,
            ResourceAccessType::ReadWrite => {
                vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE
            }
        },
        BufferResourceUsage::Constant => vk::AccessFlags::UNIFORM_READ,
        BufferResourceUsage::Vertex => vk::AccessFlags::VERTEX_ATTRIBUTE_READ,
        BufferResourceUsage::Index => vk::AccessFlags::INDEX_READ,
        BufferResourceUsage::IndirectArgument => vk::AccessFlags::INDIRECT_COMMAND_READ,
        BufferResourceUsage::TransferSource => vk::AccessFlags::TRANSFER_READ,
        BufferResourceUsage::TransferDestination => vk::AccessFlags::TRANSFER_WRITE,
    }
}

/// Last-known state of an image.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct ImageState {
    pub(crate) stage_mask: vk::PipelineStageFlags,
    pub(crate) access_mask: vk::AccessFlags,
    pub(crate) layout: vk::ImageLayout,
    pub(crate) queue_family: u32,
}

impl ImageState {
    /// State assumed for an image never seen before: undefined contents,
    /// nothing to wait for.
    pub(crate) fn initial(queue_family: u32) -> ImageState {
        ImageState {
            stage_mask: vk::PipelineStageFlags::TOP_OF_PIPE,
            access_mask: vk::AccessFlags::empty(),
            layout: vk::ImageLayout::UNDEFINED,
            queue_family,
        }
    }
}

/// Last-known state of a buffer. Layout does not apply.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct BufferState {
    pub(crate) stage_mask: vk::PipelineStageFlags,
    pub(crate) access_mask: vk::AccessFlags,
    pub(crate) queue_family: u32,
}

impl BufferState {
    pub(crate) fn initial(queue_family: u32) -> BufferState {
        BufferState {
            stage_mask: vk::PipelineStageFlags::TOP_OF_PIPE,
            access_mask: vk::AccessFlags::empty(),
            queue_family,
        }
    }
}

/// Last-known state of the currently acquired back-buffer of a swapchain.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct SwapchainState {
    pub(crate) stage_mask: vk::PipelineStageFlags,
    pub(crate) access_mask: vk::AccessFlags,
    pub(crate) layout: vk::ImageLayout,
}

/// Where an image barrier points.
#[derive(Copy, Clone, Debug)]
pub(crate) struct ImageBarrierTarget {
    pub(crate) image: vk::Image,
    pub(crate) subresource_range: vk::ImageSubresourceRange,
}

impl ImageBarrierTarget {
    /// Full-range target; subresource granularity is not tracked.
    pub(crate) fn whole(image: vk::Image, aspect_mask: vk::ImageAspectFlags) -> ImageBarrierTarget {
        ImageBarrierTarget {
            image,
            subresource_range: vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: 0,
                level_count: vk::REMAINING_MIP_LEVELS,
                base_array_layer: 0,
                layer_count: vk::REMAINING_ARRAY_LAYERS,
            },
        }
    }
}

/// The barriers accumulated for a single pass, emitted as one
/// pipeline-barrier command.
#[derive(Default)]
pub(crate) struct BarrierBatch {
    pub(crate) src_stage_mask: vk::PipelineStageFlags,
    pub(crate) dst_stage_mask: vk::PipelineStageFlags,
    pub(crate) image_barriers: Vec<vk::ImageMemoryBarrier>,
    pub(crate) buffer_barriers: Vec<vk::BufferMemoryBarrier>,
}

impl BarrierBatch {
    pub(crate) fn new() -> BarrierBatch {
        Default::default()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.image_barriers.is_empty() && self.buffer_barriers.is_empty()
    }
}

/// Maps resources (by packed handle) to their last-known state.
///
/// Image and buffer entries persist across frames: a resource untouched for
/// a whole frame keeps its state, which stays valid because nothing
/// unsynchronised is ever issued against it. Swapchain entries live for one
/// frame only, from acquire to present.
pub(crate) struct StateTracker {
    images: HashMap<u64, ImageState>,
    buffers: HashMap<u64, BufferState>,
    swapchains: HashMap<u64, SwapchainState>,
}

impl StateTracker {
    pub(crate) fn new() -> StateTracker {
        StateTracker {
            images: HashMap::new(),
            buffers: HashMap::new(),
            swapchains: HashMap::new(),
        }
    }

    /// Forgets the state of a resource whose underlying object went away
    /// (swapchain recreation).
    pub(crate) fn forget_image(&mut self, key: u64) {
        self.images.remove(&key);
    }

    /// Starts a new lifetime for a swapchain's acquired image: its contents
    /// are undefined until first written.
    pub(crate) fn begin_swapchain_frame(&mut self, key: u64) {
        self.swapchains.remove(&key);
    }

    /// Records a transition of `target` to `next`, emitting a barrier into
    /// `batch` iff the layout changes, the queue family changes, or the new
    /// access writes.
    pub(crate) fn transition_image(
        &mut self,
        key: u64,
        target: ImageBarrierTarget,
        next: ImageState,
        batch: &mut BarrierBatch,
    ) {
        let last = self
            .images
            .get(&key)
            .copied()
            .unwrap_or_else(|| ImageState::initial(next.queue_family));

        let needs_barrier = last.layout != next.layout
            || last.queue_family != next.queue_family
            || is_write_access(next.access_mask);
        if needs_barrier {
            batch.src_stage_mask |= last.stage_mask;
            batch.dst_stage_mask |= next.stage_mask;
            batch.image_barriers.push(vk::ImageMemoryBarrier {
                src_access_mask: last.access_mask,
                dst_access_mask: next.access_mask,
                old_layout: last.layout,
                new_layout: next.layout,
                src_queue_family_index: last.queue_family,
                dst_queue_family_index: next.queue_family,
                image: target.image,
                subresource_range: target.subresource_range,
                ..Default::default()
            });
        }

        self.images.insert(key, next);
    }

    /// Records a buffer transition; a barrier is emitted iff the queue
    /// family changes or a write is involved on either side.
    pub(crate) fn transition_buffer(
        &mut self,
        key: u64,
        buffer: vk::Buffer,
        next: BufferState,
        batch: &mut BarrierBatch,
    ) {
        let last = self
            .buffers
            .get(&key)
            .copied()
            .unwrap_or_else(|| BufferState::initial(next.queue_family));

        let needs_barrier = last.queue_family != next.queue_family
            || is_write_access(last.access_mask)
            || is_write_access(next.access_mask);
        if needs_barrier {
            batch.src_stage_mask |= last.stage_mask;
            batch.dst_stage_mask |= next.stage_mask;
            batch.buffer_barriers.push(vk::BufferMemoryBarrier {
                src_access_mask: last.access_mask,
                dst_access_mask: next.access_mask,
                src_queue_family_index: last.queue_family,
                dst_queue_family_index: next.queue_family,
                buffer,
                offset: 0,
                size: vk::WHOLE_SIZE,
                ..Default::default()
            });
        }

        self.buffers.insert(key, next);
    }

    /// Records a transition of a swapchain's acquired image. The first touch
    /// in a frame starts from undefined contents.
    pub(crate) fn transition_swapchain(
        &mut self,
        key: u64,
        image: vk::Image,
        queue_family: u32,
        next: SwapchainState,
        batch: &mut BarrierBatch,
    ) {
        let last = self.swapchains.get(&key).copied().unwrap_or(SwapchainState {
            stage_mask: vk::PipelineStageFlags::TOP_OF_PIPE,
            access_mask: vk::AccessFlags::empty(),
            layout: vk::ImageLayout::UNDEFINED,
        });

        let needs_barrier = last.layout != next.layout || is_write_access(next.access_mask);
        if needs_barrier {
            batch.src_stage_mask |= last.stage_mask;
            batch.dst_stage_mask |= next.stage_mask;
            batch.image_barriers.push(vk::ImageMemoryBarrier {
                src_access_mask: last.access_mask,
                dst_access_mask: next.access_mask,
                old_layout: last.layout,
                new_layout: next.layout,
                src_queue_family_index: queue_family,
                dst_queue_family_index: queue_family,
                image,
                subresource_range: vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: vk::REMAINING_MIP_LEVELS,
                    base_array_layer: 0,
                    layer_count: vk::REMAINING_ARRAY_LAYERS,
                },
                ..Default::default()
            });
        }

        self.swapchains.insert(key, next);
    }

    /// Emits the end-of-frame transitions that bring every touched swapchain
    /// image into PRESENT layout, and ends those images' tracked lifetimes.
    pub(crate) fn present_transitions(
        &mut self,
        queue_family: u32,
        resolve_image: impl Fn(u64) -> Option<vk::Image>,
    ) -> BarrierBatch {
        let mut batch = BarrierBatch::new();
        let mut states: Vec<(u64, SwapchainState)> = self.swapchains.drain().collect();
        states.sort_by_key(|(key, _)| *key);

        for (key, state) in states {
            let image = match resolve_image(key) {
                Some(image) => image,
                None => continue,
            };
            if state.layout == vk::ImageLayout::PRESENT_SRC_KHR {
                continue;
            }
            batch.src_stage_mask |= state.stage_mask;
            batch.dst_stage_mask |= vk::PipelineStageFlags::BOTTOM_OF_PIPE;
            batch.image_barriers.push(vk::ImageMemoryBarrier {
                src_access_mask: state.access_mask,
                dst_access_mask: vk::AccessFlags::empty(),
                old_layout: state.layout,
                new_layout: vk::ImageLayout::PRESENT_SRC_KHR,
                src_queue_family_index: queue_family,
                dst_queue_family_index: queue_family,
                image,
                subresource_range: vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: vk::REMAINING_MIP_LEVELS,
                    base_array_layer: 0,
                    layer_count: vk::REMAINING_ARRAY_LAYERS,
                },
                ..Default::default()
            });
        }
        batch
    }

    #[cfg(test)]
    pub(crate) fn image_state(&self, key: u64) -> Option<ImageState> {
        self.images.get(&key).copied()
    }

    #[cfg(test)]
    pub(crate) fn swapchain_state(&self, key: u64) -> Option<SwapchainState> {
        self.swapchains.get(&key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QF: u32 = 0;

    fn color_write_state() -> ImageState {
        ImageState {
            stage_mask: image_usage_stage_mask(
                ImageResourceUsage::ColorAttachment,
                ResourceAccessType::Write,
            ),
            access_mask: image_usage_access_mask(
                ImageResourceUsage::ColorAttachment,
                ResourceAccessType::Write,
            ),
            layout: image_usage_layout(ImageResourceUsage::ColorAttachment),
            queue_family: QF,
        }
    }

    fn sampled_state() -> ImageState {
        ImageState {
            stage_mask: image_usage_stage_mask(
                ImageResourceUsage::Sampled,
                ResourceAccessType::Read,
            ),
            access_mask: image_usage_access_mask(
                ImageResourceUsage::Sampled,
                ResourceAccessType::Read,
            ),
            layout: image_usage_layout(ImageResourceUsage::Sampled),
            queue_family: QF,
        }
    }

    #[test]
    fn mapping_tables_match_the_contract() {
        assert_eq!(
            image_usage_layout(ImageResourceUsage::ColorAttachment),
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
        );
        assert_eq!(
            image_usage_layout(ImageResourceUsage::Storage),
            vk::ImageLayout::GENERAL
        );
        assert_eq!(
            image_usage_stage_mask(ImageResourceUsage::ColorAttachment, ResourceAccessType::Read),
            vk::PipelineStageFlags::FRAGMENT_SHADER
                | vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        );
        assert_eq!(
            image_usage_stage_mask(
                ImageResourceUsage::DepthAttachment,
                ResourceAccessType::Write
            ),
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
                | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS
        );
        assert_eq!(
            image_usage_access_mask(ImageResourceUsage::Storage, ResourceAccessType::ReadWrite),
            vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE
        );
        assert_eq!(
            buffer_usage_access_mask(BufferResourceUsage::Constant, ResourceAccessType::Read),
            vk::AccessFlags::UNIFORM_READ
        );
        assert_eq!(
            buffer_usage_access_mask(BufferResourceUsage::IndirectArgument, ResourceAccessType::Read),
            vk::AccessFlags::INDIRECT_COMMAND_READ
        );
    }

    #[test]
    fn first_write_performs_an_acquire_transition() {
        let mut tracker = StateTracker::new();
        let mut batch = BarrierBatch::new();
        let target = ImageBarrierTarget::whole(vk::Image::null(), vk::ImageAspectFlags::COLOR);

        tracker.transition_image(1, target, color_write_state(), &mut batch);

        assert_eq!(batch.image_barriers.len(), 1);
        let barrier = &batch.image_barriers[0];
        assert_eq!(barrier.old_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(barrier.new_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(barrier.src_access_mask, vk::AccessFlags::empty());
        assert_eq!(batch.src_stage_mask, vk::PipelineStageFlags::TOP_OF_PIPE);
        assert_eq!(
            batch.dst_stage_mask,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        );
    }

    #[test]
    fn write_then_sample_emits_the_expected_transition() {
        let mut tracker = StateTracker::new();
        let target = ImageBarrierTarget::whole(vk::Image::null(), vk::ImageAspectFlags::COLOR);

        let mut first = BarrierBatch::new();
        tracker.transition_image(1, target, color_write_state(), &mut first);

        let mut second = BarrierBatch::new();
        tracker.transition_image(1, target, sampled_state(), &mut second);

        assert_eq!(second.image_barriers.len(), 1);
        let barrier = &second.image_barriers[0];
        assert_eq!(barrier.old_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(barrier.new_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert_eq!(barrier.src_access_mask, vk::AccessFlags::COLOR_ATTACHMENT_WRITE);
        assert_eq!(barrier.dst_access_mask, vk::AccessFlags::SHADER_READ);
        assert_eq!(
            second.src_stage_mask,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        );
        assert_eq!(second.dst_stage_mask, vk::PipelineStageFlags::FRAGMENT_SHADER);
    }

    #[test]
    fn repeated_reads_are_deduplicated() {
        let mut tracker = StateTracker::new();
        let target = ImageBarrierTarget::whole(vk::Image::null(), vk::ImageAspectFlags::COLOR);

        let mut first = BarrierBatch::new();
        tracker.transition_image(1, target, color_write_state(), &mut first);
        let mut second = BarrierBatch::new();
        tracker.transition_image(1, target, sampled_state(), &mut second);

        // A second sampled read sees the same layout, same queue family, no
        // write: no barrier.
        let mut third = BarrierBatch::new();
        tracker.transition_image(1, target, sampled_state(), &mut third);
        assert!(third.is_empty());
    }

    #[test]
    fn back_to_back_writes_keep_a_barrier() {
        let mut tracker = StateTracker::new();
        let target = ImageBarrierTarget::whole(vk::Image::null(), vk::ImageAspectFlags::COLOR);

        let mut first = BarrierBatch::new();
        tracker.transition_image(1, target, color_write_state(), &mut first);
        let mut second = BarrierBatch::new();
        tracker.transition_image(1, target, color_write_state(), &mut second);

        // Same layout, but write-after-write still needs ordering.
        assert_eq!(second.image_barriers.len(), 1);
        assert_eq!(
            second.image_barriers[0].old_layout,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
        );
    }

    #[test]
    fn buffer_read_to_read_is_silent_but_writes_are_not() {
        let read = BufferState {
            stage_mask: vk::PipelineStageFlags::VERTEX_INPUT,
            access_mask: vk::AccessFlags::VERTEX_ATTRIBUTE_READ,
            queue_family: QF,
        };
        let write = BufferState {
            stage_mask: vk::PipelineStageFlags::TRANSFER,
            access_mask: vk::AccessFlags::TRANSFER_WRITE,
            queue_family: QF,
        };

        let mut tracker = StateTracker::new();
        let mut batch = BarrierBatch::new();
        tracker.transition_buffer(7, vk::Buffer::null(), read, &mut batch);
        tracker.transition_buffer(7, vk::Buffer::null(), read, &mut batch);
        assert!(batch.is_empty());

        // read -> write
        let mut batch = BarrierBatch::new();
        tracker.transition_buffer(7, vk::Buffer::null(), write, &mut batch);
        assert_eq!(batch.buffer_barriers.len(), 1);

        // write -> read
        let mut batch = BarrierBatch::new();
        tracker.transition_buffer(7, vk::Buffer::null(), read, &mut batch);
        assert_eq!(batch.buffer_barriers.len(), 1);
        assert_eq!(
            batch.buffer_barriers[0].src_access_mask,
            vk::AccessFlags::TRANSFER_WRITE
        );
    }

    #[test]
    fn queue_family_change_always_emits() {
        let mut tracker = StateTracker::new();
        let target = ImageBarrierTarget::whole(vk::Image::null(), vk::ImageAspectFlags::COLOR);

        let mut batch = BarrierBatch::new();
        tracker.transition_image(1, target, sampled_state(), &mut batch);

        let other_family = ImageState {
            queue_family: 1,
            ..sampled_state()
        };
        let mut batch = BarrierBatch::new();
        tracker.transition_image(1, target, other_family, &mut batch);
        assert_eq!(batch.image_barriers.len(), 1);
        assert_eq!(batch.image_barriers[0].src_queue_family_index, 0);
        assert_eq!(batch.image_barriers[0].dst_queue_family_index, 1);
    }

    #[test]
    fn present_transitions_cover_every_touched_swapchain() {
        let mut tracker = StateTracker::new();
        let mut batch = BarrierBatch::new();
        tracker.transition_swapchain(
            11,
            vk::Image::null(),
            QF,
            SwapchainState {
                stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                access_mask: vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
                layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            },
            &mut batch,
        );
        assert_eq!(batch.image_barriers.len(), 1);
        assert_eq!(batch.image_barriers[0].old_layout, vk::ImageLayout::UNDEFINED);

        let present = tracker.present_transitions(QF, |_| Some(vk::Image::null()));
        assert_eq!(present.image_barriers.len(), 1);
        let barrier = &present.image_barriers[0];
        assert_eq!(barrier.old_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(barrier.new_layout, vk::ImageLayout::PRESENT_SRC_KHR);
        assert_eq!(barrier.dst_access_mask, vk::AccessFlags::empty());
        assert_eq!(present.dst_stage_mask, vk::PipelineStageFlags::BOTTOM_OF_PIPE);

        // The image's tracked lifetime ended with the present transition.
        assert!(tracker.swapchain_state(11).is_none());

        // Next frame starts from undefined again.
        tracker.begin_swapchain_frame(11);
        let mut batch = BarrierBatch::new();
        tracker.transition_swapchain(
            11,
            vk::Image::null(),
            QF,
            SwapchainState {
                stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                access_mask: vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
                layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            },
            &mut batch,
        );
        assert_eq!(batch.image_barriers[0].old_layout, vk::ImageLayout::UNDEFINED);
    }

    #[test]
    fn untouched_images_keep_state_across_frames() {
        let mut tracker = StateTracker::new();
        let target = ImageBarrierTarget::whole(vk::Image::null(), vk::ImageAspectFlags::COLOR);

        let mut batch = BarrierBatch::new();
        tracker.transition_image(1, target, sampled_state(), &mut batch);
        let state = tracker.image_state(1).unwrap();

        // nothing touches the image "next frame"; state is retained
        assert_eq!(tracker.image_state(1), Some(state));
    }
}
