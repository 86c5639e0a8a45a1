//! Work queues, command list pooling, submission and presentation.

use crate::error::SwapchainError;
use ash::vk;
use std::fmt;
use tracing::trace;

/// A command list acquired from a [`WorkQueue`], already in the recording
/// state. Recording ends when the list is submitted.
#[derive(Copy, Clone, Debug)]
pub struct CommandList {
    pub(crate) raw: vk::CommandBuffer,
    pub(crate) queue_family: u32,
}

impl CommandList {
    pub fn raw(&self) -> vk::CommandBuffer {
        self.raw
    }

    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }
}

/// A semaphore wait attached to a submission.
#[derive(Copy, Clone, Debug)]
pub struct SemaphoreWait {
    pub semaphore: vk::Semaphore,
    /// First stages of the submission that must wait.
    pub dst_stage: vk::PipelineStageFlags,
}

/// Allocates command buffers in a `vk::CommandPool` and re-uses freed ones.
struct CommandAllocator {
    command_pool: vk::CommandPool,
    free: Vec<vk::CommandBuffer>,
    used: Vec<vk::CommandBuffer>,
}

impl CommandAllocator {
    fn new(device: &ash::Device, queue_family: u32) -> CommandAllocator {
        let create_info = vk::CommandPoolCreateInfo {
            flags: vk::CommandPoolCreateFlags::TRANSIENT,
            queue_family_index: queue_family,
            ..Default::default()
        };
        let command_pool = unsafe {
            device
                .create_command_pool(&create_info, None)
                .expect("failed to create command pool")
        };
        CommandAllocator {
            command_pool,
            free: vec![],
            used: vec![],
        }
    }

    fn allocate(&mut self, device: &ash::Device) -> vk::CommandBuffer {
        let cb = self.free.pop().unwrap_or_else(|| unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo {
                command_pool: self.command_pool,
                level: vk::CommandBufferLevel::PRIMARY,
                command_buffer_count: 1,
                ..Default::default()
            };
            let buffers = device
                .allocate_command_buffers(&allocate_info)
                .expect("failed to allocate command buffers");
            buffers[0]
        });
        self.used.push(cb);
        cb
    }

    fn reset(&mut self, device: &ash::Device) {
        unsafe {
            device
                .reset_command_pool(self.command_pool, vk::CommandPoolResetFlags::empty())
                .expect("failed to reset command pool");
        }
        self.free.append(&mut self.used);
    }

    fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            device.destroy_command_pool(self.command_pool, None);
        }
        self.command_pool = vk::CommandPool::null();
        self.free.clear();
        self.used.clear();
    }
}

/// A native queue plus per-frame-slot command pools.
pub struct WorkQueue {
    device: ash::Device,
    queue: vk::Queue,
    queue_family: u32,
    pools: Vec<CommandAllocator>,
}

impl fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("WorkQueue")
            .field("queue_family", &self.queue_family)
            .finish()
    }
}

impl WorkQueue {
    pub(crate) fn new(
        device: ash::Device,
        queue: vk::Queue,
        queue_family: u32,
        frames_in_flight: usize,
    ) -> WorkQueue {
        let pools = (0..frames_in_flight)
            .map(|_| CommandAllocator::new(&device, queue_family))
            .collect();
        WorkQueue {
            device,
            queue,
            queue_family,
            pools,
        }
    }

    pub fn queue_family_index(&self) -> u32 {
        self.queue_family
    }

    pub fn raw(&self) -> vk::Queue {
        self.queue
    }

    /// Recycles the command buffers recorded for `frame_slot`. The caller
    /// must have waited on that slot's frame fence.
    pub fn reset_frame_pool(&mut self, frame_slot: usize) {
        let device = self.device.clone();
        self.pools[frame_slot].reset(&device);
    }

    /// Hands out a command list for `frame_slot` and begins recording.
    pub fn acquire_command_list(&mut self, frame_slot: usize) -> CommandList {
        let device = self.device.clone();
        let raw = self.pools[frame_slot].allocate(&device);
        let begin_info = vk::CommandBufferBeginInfo {
            flags: vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
            ..Default::default()
        };
        unsafe {
            device
                .begin_command_buffer(raw, &begin_info)
                .expect("failed to begin command buffer");
        }
        CommandList {
            raw,
            queue_family: self.queue_family,
        }
    }

    /// Ends recording on the given lists and submits them in order, waiting
    /// on `waits`, signalling `signals` and `fence` on completion.
    pub fn submit(
        &mut self,
        lists: &[CommandList],
        waits: &[SemaphoreWait],
        signals: &[vk::Semaphore],
        fence: vk::Fence,
    ) -> Result<(), vk::Result> {
        let command_buffers: Vec<vk::CommandBuffer> = lists.iter().map(|l| l.raw).collect();
        for &cb in &command_buffers {
            unsafe {
                self.device.end_command_buffer(cb)?;
            }
        }

        let wait_semaphores: Vec<vk::Semaphore> = waits.iter().map(|w| w.semaphore).collect();
        let wait_dst_stages: Vec<vk::PipelineStageFlags> =
            waits.iter().map(|w| w.dst_stage).collect();

        let submit_info = vk::SubmitInfo {
            wait_semaphore_count: wait_semaphores.len() as u32,
            p_wait_semaphores: wait_semaphores.as_ptr(),
            p_wait_dst_stage_mask: wait_dst_stages.as_ptr(),
            command_buffer_count: command_buffers.len() as u32,
            p_command_buffers: command_buffers.as_ptr(),
            signal_semaphore_count: signals.len() as u32,
            p_signal_semaphores: signals.as_ptr(),
            ..Default::default()
        };

        trace!(
            queue_family = self.queue_family,
            command_buffers = command_buffers.len(),
            waits = waits.len(),
            signals = signals.len(),
            "submit"
        );
        unsafe { self.device.queue_submit(self.queue, &[submit_info], fence) }
    }

    /// Presents a back-buffer, waiting on `waits` first.
    pub fn present(
        &mut self,
        loader: &ash::extensions::khr::Swapchain,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        waits: &[vk::Semaphore],
    ) -> Result<(), SwapchainError> {
        let present_info = vk::PresentInfoKHR {
            wait_semaphore_count: waits.len() as u32,
            p_wait_semaphores: waits.as_ptr(),
            swapchain_count: 1,
            p_swapchains: &swapchain,
            p_image_indices: &image_index,
            ..Default::default()
        };
        let result = unsafe { loader.queue_present(self.queue, &present_info) };
        match result {
            Ok(false) => Ok(()),
            Ok(true) => Err(SwapchainError::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(SwapchainError::OutOfDate),
            Err(err) => Err(SwapchainError::Device(err)),
        }
    }

    pub(crate) fn destroy_pools(&mut self) {
        let device = self.device.clone();
        for pool in self.pools.iter_mut() {
            pool.destroy(&device);
        }
    }
}
