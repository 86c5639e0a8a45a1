//! Device, queue discovery, and the GPU resource registry.

use crate::{
    deletion::DeletionQueue,
    graph::barrier::format_aspect_mask,
    handle::{
        BufferHandle, DescriptorSetHandle, FenceHandle, Handle, ImageHandle, PipelineHandle,
        SamplerHandle, SemaphoreHandle,
    },
    instance::{debug_utils_message_callback, VULKAN_ENTRY, VULKAN_INSTANCE},
    queue::WorkQueue,
    slot_map::SlotMap,
    swapchain::RenderSurface,
};
use ash::{vk, vk::Handle as _};
use gpu_allocator::vulkan as vkalloc;
use std::{
    ffi::{CStr, CString},
    fmt,
    ptr::NonNull,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
};
use tracing::{error, trace};

/// Where a resource's memory lives.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum MemoryLocation {
    /// Device-local memory, not host accessible.
    DeviceLocal,
    /// Host-visible upload memory.
    HostVisible,
    /// Host-visible memory, preferably device-local (ReBAR-style).
    HostVisibleDeviceLocal,
}

impl MemoryLocation {
    pub(crate) fn to_alloc(self) -> gpu_allocator::MemoryLocation {
        match self {
            MemoryLocation::DeviceLocal => gpu_allocator::MemoryLocation::GpuOnly,
            MemoryLocation::HostVisible | MemoryLocation::HostVisibleDeviceLocal => {
                gpu_allocator::MemoryLocation::CpuToGpu
            }
        }
    }

    pub fn is_host_visible(self) -> bool {
        self != MemoryLocation::DeviceLocal
    }
}

bitflags::bitflags! {
    /// Intended uses of an image, accumulated before creation.
    pub struct ImageUsage: u32 {
        const SAMPLED = 1 << 0;
        const STORAGE = 1 << 1;
        const COLOR_ATTACHMENT = 1 << 2;
        const DEPTH_ATTACHMENT = 1 << 3;
        const TRANSFER_SRC = 1 << 4;
        const TRANSFER_DST = 1 << 5;
    }
}

impl ImageUsage {
    pub(crate) fn to_vk(self) -> vk::ImageUsageFlags {
        let mut flags = vk::ImageUsageFlags::empty();
        if self.contains(ImageUsage::SAMPLED) {
            flags |= vk::ImageUsageFlags::SAMPLED;
        }
        if self.contains(ImageUsage::STORAGE) {
            flags |= vk::ImageUsageFlags::STORAGE;
        }
        if self.contains(ImageUsage::COLOR_ATTACHMENT) {
            flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
        }
        if self.contains(ImageUsage::DEPTH_ATTACHMENT) {
            flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
        }
        if self.contains(ImageUsage::TRANSFER_SRC) {
            flags |= vk::ImageUsageFlags::TRANSFER_SRC;
        }
        if self.contains(ImageUsage::TRANSFER_DST) {
            flags |= vk::ImageUsageFlags::TRANSFER_DST;
        }
        flags
    }
}

bitflags::bitflags! {
    /// Intended uses of a buffer, accumulated before creation.
    pub struct BufferUsage: u32 {
        const VERTEX = 1 << 0;
        const INDEX = 1 << 1;
        const CONSTANT = 1 << 2;
        const STRUCTURED = 1 << 3;
        const INDIRECT = 1 << 4;
        const TRANSFER_SRC = 1 << 5;
        const TRANSFER_DST = 1 << 6;
    }
}

impl BufferUsage {
    pub(crate) fn to_vk(self) -> vk::BufferUsageFlags {
        let mut flags = vk::BufferUsageFlags::empty();
        if self.contains(BufferUsage::VERTEX) {
            flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
        }
        if self.contains(BufferUsage::INDEX) {
            flags |= vk::BufferUsageFlags::INDEX_BUFFER;
        }
        if self.contains(BufferUsage::CONSTANT) {
            flags |= vk::BufferUsageFlags::UNIFORM_BUFFER;
        }
        if self.contains(BufferUsage::STRUCTURED) {
            flags |= vk::BufferUsageFlags::STORAGE_BUFFER;
        }
        if self.contains(BufferUsage::INDIRECT) {
            flags |= vk::BufferUsageFlags::INDIRECT_BUFFER;
        }
        if self.contains(BufferUsage::TRANSFER_SRC) {
            flags |= vk::BufferUsageFlags::TRANSFER_SRC;
        }
        if self.contains(BufferUsage::TRANSFER_DST) {
            flags |= vk::BufferUsageFlags::TRANSFER_DST;
        }
        flags
    }
}

/// Describes an image to be created with `Device::create_image`.
#[derive(Copy, Clone, Debug)]
pub struct ImageDesc {
    pub image_type: vk::ImageType,
    pub usage: ImageUsage,
    pub format: vk::Format,
    pub extent: vk::Extent3D,
    /// Number of mipmap levels. `0` is not a valid value.
    pub mip_levels: u32,
    /// Number of array layers. `0` is not a valid value.
    pub array_layers: u32,
    pub samples: u32,
}

impl Default for ImageDesc {
    fn default() -> Self {
        ImageDesc {
            image_type: vk::ImageType::TYPE_2D,
            usage: ImageUsage::empty(),
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

/// Describes a buffer to be created with `Device::create_buffer`.
#[derive(Copy, Clone, Debug)]
pub struct BufferDesc {
    pub usage: BufferUsage,
    /// Logical size in bytes. A per-frame buffer is physically
    /// `frames_in_flight` times larger.
    pub byte_size: u64,
    pub location: MemoryLocation,
    /// Rotate the buffer across the in-flight window: every frame addresses a
    /// disjoint `byte_size` sub-range selected by the current frame index.
    pub per_frame: bool,
}

impl Default for BufferDesc {
    fn default() -> Self {
        BufferDesc {
            usage: BufferUsage::empty(),
            byte_size: 0,
            location: MemoryLocation::DeviceLocal,
            per_frame: false,
        }
    }
}

/// Describes a sampler to be created with `Device::create_sampler`.
#[derive(Copy, Clone, Debug)]
pub struct SamplerDesc {
    pub min_filter: vk::Filter,
    pub mag_filter: vk::Filter,
    pub mipmap_mode: vk::SamplerMipmapMode,
    pub address_mode: vk::SamplerAddressMode,
    pub max_anisotropy: Option<f32>,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        SamplerDesc {
            min_filter: vk::Filter::LINEAR,
            mag_filter: vk::Filter::LINEAR,
            mipmap_mode: vk::SamplerMipmapMode::LINEAR,
            address_mode: vk::SamplerAddressMode::REPEAT,
            max_anisotropy: None,
        }
    }
}

pub(crate) struct ImageRecord {
    pub(crate) raw: vk::Image,
    pub(crate) view: vk::ImageView,
    pub(crate) allocation: Option<vkalloc::Allocation>,
    pub(crate) desc: ImageDesc,
    pub(crate) aspect: vk::ImageAspectFlags,
    /// Swapchain-owned images are destroyed with their swapchain, never
    /// individually.
    pub(crate) swapchain_owned: bool,
    pub(crate) name: String,
}

pub(crate) struct BufferRecord {
    pub(crate) raw: vk::Buffer,
    pub(crate) allocation: Option<vkalloc::Allocation>,
    pub(crate) desc: BufferDesc,
    /// Distance between consecutive frame sub-ranges; equals the logical
    /// size. `None` for plain buffers.
    pub(crate) per_frame_stride: Option<u64>,
    pub(crate) name: String,
}

/// Copy-out description of an image, as needed by the graph executor.
#[derive(Copy, Clone, Debug)]
pub struct ImageInfo {
    pub raw: vk::Image,
    pub view: vk::ImageView,
    pub format: vk::Format,
    pub extent: vk::Extent3D,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub aspect: vk::ImageAspectFlags,
    pub swapchain_owned: bool,
}

/// Copy-out description of a buffer.
#[derive(Copy, Clone, Debug)]
pub struct BufferInfo {
    pub raw: vk::Buffer,
    pub byte_size: u64,
    pub location: MemoryLocation,
    pub per_frame: bool,
}

/// A host-visible mapped range of a buffer.
#[derive(Copy, Clone, Debug)]
pub struct MappedRange {
    ptr: NonNull<u8>,
    len: usize,
}

impl MappedRange {
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// # Safety
    ///
    /// The caller must ensure no other live slice aliases this range and that
    /// the buffer outlives the returned slice.
    pub unsafe fn as_mut_slice(&self) -> &mut [u8] {
        std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len)
    }
}

/// Image handle plus back-buffer index returned by a successful acquire.
#[derive(Copy, Clone, Debug)]
pub struct AcquiredImage {
    pub image: ImageHandle,
    pub image_index: u32,
}

pub(crate) struct DeviceObjects {
    pub(crate) images: SlotMap<ImageRecord>,
    pub(crate) buffers: SlotMap<BufferRecord>,
    pub(crate) samplers: SlotMap<vk::Sampler>,
    pub(crate) surfaces: SlotMap<RenderSurface>,
    pub(crate) fences: SlotMap<vk::Fence>,
    pub(crate) semaphores: SlotMap<vk::Semaphore>,
    pub(crate) pipelines: SlotMap<vk::Pipeline>,
    pub(crate) descriptor_sets: SlotMap<vk::DescriptorSet>,
}

impl DeviceObjects {
    fn new() -> DeviceObjects {
        DeviceObjects {
            images: SlotMap::new(),
            buffers: SlotMap::new(),
            samplers: SlotMap::new(),
            surfaces: SlotMap::new(),
            fences: SlotMap::new(),
            semaphores: SlotMap::new(),
            pipelines: SlotMap::new(),
            descriptor_sets: SlotMap::new(),
        }
    }
}

/// The allocator is shared with pending deleters, and taken out of its slot
/// before the device itself is torn down.
pub(crate) type SharedAllocator = Arc<Mutex<Option<vkalloc::Allocator>>>;

pub(crate) fn free_allocation(allocator: &SharedAllocator, allocation: vkalloc::Allocation) {
    if let Some(allocator) = allocator.lock().unwrap().as_mut() {
        if let Err(err) = allocator.free(allocation) {
            error!("failed to free allocation: {:?}", err);
        }
    }
}

struct FrameState {
    current_frame: AtomicU64,
    is_building_frame: AtomicBool,
}

/// Parameters for `Device::new`.
#[derive(Copy, Clone, Debug, Default)]
pub struct DeviceCreateInfo {
    /// When set, the graphics queue family is additionally required to
    /// support presentation to this surface.
    pub present_surface: Option<vk::SurfaceKHR>,
    /// Maximum number of CPU frames whose GPU work may overlap. `0` selects
    /// the default of 2.
    pub frames_in_flight: usize,
}

/// Selected queues, by usage.
pub(crate) struct QueuesInfo {
    pub(crate) graphics_family: u32,
    pub(crate) compute_family: Option<u32>,
    pub(crate) transfer_family: Option<u32>,
}

/// Wrapper around a vulkan device, its queues, and the tracked resources.
pub struct Device {
    pub(crate) raw: ash::Device,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) physical_device_properties: vk::PhysicalDeviceProperties,
    pub(crate) queues_info: QueuesInfo,
    pub(crate) allocator: SharedAllocator,
    pub(crate) vk_khr_swapchain: ash::extensions::khr::Swapchain,
    pub(crate) vk_khr_surface: ash::extensions::khr::Surface,
    vk_ext_debug_utils: ash::extensions::ext::DebugUtils,
    debug_messenger: vk::DebugUtilsMessengerEXT,
    pub(crate) objects: Mutex<DeviceObjects>,
    deletion_queue: Mutex<DeletionQueue>,
    primary_queue: Mutex<WorkQueue>,
    dedicated_compute_queue: Option<Mutex<WorkQueue>>,
    dedicated_transfer_queue: Option<Mutex<WorkQueue>>,
    frame_state: FrameState,
    frames_in_flight: usize,
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Device")
            .field("frames_in_flight", &self.frames_in_flight)
            .finish()
    }
}

unsafe fn select_physical_device(instance: &ash::Instance) -> vk::PhysicalDevice {
    let physical_devices = instance
        .enumerate_physical_devices()
        .expect("failed to enumerate physical devices");
    if physical_devices.is_empty() {
        panic!("no device with vulkan support");
    }

    physical_devices
        .iter()
        .copied()
        .find(|&phy| {
            instance.get_physical_device_properties(phy).device_type
                == vk::PhysicalDeviceType::DISCRETE_GPU
        })
        .or_else(|| physical_devices.first().copied())
        .expect("no suitable physical device")
}

/// Finds the most specialized queue family matching `flags`, optionally
/// requiring presentation support to `present_surface`.
unsafe fn find_queue_family(
    phy: vk::PhysicalDevice,
    vk_khr_surface: &ash::extensions::khr::Surface,
    queue_families: &[vk::QueueFamilyProperties],
    flags: vk::QueueFlags,
    present_surface: Option<vk::SurfaceKHR>,
) -> u32 {
    let mut best_queue_family: Option<u32> = None;
    let mut best_flags = 0u32;
    for (index, queue_family) in queue_families.iter().enumerate() {
        let index = index as u32;
        if !queue_family.queue_flags.contains(flags) {
            continue;
        }
        if let Some(surface) = present_surface {
            let supported = vk_khr_surface
                .get_physical_device_surface_support(phy, index, surface)
                .unwrap_or(false);
            if !supported {
                continue;
            }
        }

        match best_queue_family {
            Some(_) => {
                // prefer the family with the fewest extra capability bits
                if queue_family.queue_flags.as_raw().count_ones() < best_flags.count_ones() {
                    best_queue_family = Some(index);
                    best_flags = queue_family.queue_flags.as_raw();
                }
            }
            None => {
                best_queue_family = Some(index);
                best_flags = queue_family.queue_flags.as_raw();
            }
        }
    }

    best_queue_family.expect("could not find a compatible queue")
}

const DEVICE_EXTENSIONS: &[&str] = &["VK_KHR_swapchain"];
const DEFAULT_FRAMES_IN_FLIGHT: usize = 2;

pub(crate) fn get_vk_sample_count(count: u32) -> vk::SampleCountFlags {
    match count {
        0 | 1 => vk::SampleCountFlags::TYPE_1,
        2 => vk::SampleCountFlags::TYPE_2,
        4 => vk::SampleCountFlags::TYPE_4,
        8 => vk::SampleCountFlags::TYPE_8,
        16 => vk::SampleCountFlags::TYPE_16,
        32 => vk::SampleCountFlags::TYPE_32,
        64 => vk::SampleCountFlags::TYPE_64,
        _ => panic!("unsupported number of samples"),
    }
}

/// Byte offset of a frame's sub-range inside a per-frame buffer. Rotates
/// through `frames_in_flight` disjoint ranges of `stride` bytes.
pub(crate) fn per_frame_offset(current_frame: u64, frames_in_flight: usize, stride: u64) -> u64 {
    (current_frame % frames_in_flight as u64) * stride
}

fn image_view_type(image_type: vk::ImageType, array_layers: u32) -> vk::ImageViewType {
    match (image_type, array_layers) {
        (vk::ImageType::TYPE_1D, 1) => vk::ImageViewType::TYPE_1D,
        (vk::ImageType::TYPE_1D, _) => vk::ImageViewType::TYPE_1D_ARRAY,
        (vk::ImageType::TYPE_2D, 1) => vk::ImageViewType::TYPE_2D,
        (vk::ImageType::TYPE_2D, _) => vk::ImageViewType::TYPE_2D_ARRAY,
        _ => vk::ImageViewType::TYPE_3D,
    }
}

impl Device {
    /// Creates a new `Device` that can render to `present_surface` if one is
    /// given.
    ///
    /// # Safety
    ///
    /// `create_info.present_surface`, when set, must be a valid surface of
    /// the global instance.
    pub unsafe fn new(create_info: &DeviceCreateInfo) -> Arc<Device> {
        let instance: &ash::Instance = &*VULKAN_INSTANCE;
        let vk_khr_surface = ash::extensions::khr::Surface::new(&*VULKAN_ENTRY, instance);

        let frames_in_flight = if create_info.frames_in_flight == 0 {
            DEFAULT_FRAMES_IN_FLIGHT
        } else {
            create_info.frames_in_flight
        };

        let phy = select_physical_device(instance);
        let physical_device_properties = instance.get_physical_device_properties(phy);
        let queue_family_properties = instance.get_physical_device_queue_family_properties(phy);

        let graphics_queue_family = find_queue_family(
            phy,
            &vk_khr_surface,
            &queue_family_properties,
            vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
            create_info.present_surface,
        );
        let compute_queue_family = find_queue_family(
            phy,
            &vk_khr_surface,
            &queue_family_properties,
            vk::QueueFlags::COMPUTE,
            None,
        );
        let transfer_queue_family = find_queue_family(
            phy,
            &vk_khr_surface,
            &queue_family_properties,
            vk::QueueFlags::TRANSFER,
            None,
        );

        trace!(
            device_name = ?CStr::from_ptr(physical_device_properties.device_name.as_ptr()),
            graphics_queue_family,
            compute_queue_family,
            transfer_queue_family,
            "selected physical device"
        );

        let mut device_queue_create_infos = Vec::<vk::DeviceQueueCreateInfo>::new();
        let queue_priorities = [1.0f32];
        for &family in &[
            graphics_queue_family,
            compute_queue_family,
            transfer_queue_family,
        ] {
            let already_created = device_queue_create_infos
                .iter()
                .any(|ci| ci.queue_family_index == family);
            if already_created {
                continue;
            }
            device_queue_create_infos.push(vk::DeviceQueueCreateInfo {
                flags: Default::default(),
                queue_family_index: family,
                queue_count: 1,
                p_queue_priorities: queue_priorities.as_ptr(),
                ..Default::default()
            });
        }

        let c_device_extensions: Vec<_> = DEVICE_EXTENSIONS
            .iter()
            .map(|&s| CString::new(s).unwrap())
            .collect();
        let device_extensions: Vec<_> = c_device_extensions.iter().map(|s| s.as_ptr()).collect();

        let features = vk::PhysicalDeviceFeatures {
            sampler_anisotropy: vk::TRUE,
            fill_mode_non_solid: vk::TRUE,
            shader_storage_image_extended_formats: vk::TRUE,
            ..Default::default()
        };

        let device_create_info = vk::DeviceCreateInfo {
            flags: Default::default(),
            queue_create_info_count: device_queue_create_infos.len() as u32,
            p_queue_create_infos: device_queue_create_infos.as_ptr(),
            enabled_extension_count: device_extensions.len() as u32,
            pp_enabled_extension_names: device_extensions.as_ptr(),
            p_enabled_features: &features,
            ..Default::default()
        };

        let raw: ash::Device = instance
            .create_device(phy, &device_create_info, None)
            .expect("could not create vulkan device");

        let graphics_queue = raw.get_device_queue(graphics_queue_family, 0);
        let primary_queue = WorkQueue::new(
            raw.clone(),
            graphics_queue,
            graphics_queue_family,
            frames_in_flight,
        );

        let dedicated_compute_queue = if compute_queue_family != graphics_queue_family {
            let queue = raw.get_device_queue(compute_queue_family, 0);
            Some(Mutex::new(WorkQueue::new(
                raw.clone(),
                queue,
                compute_queue_family,
                frames_in_flight,
            )))
        } else {
            None
        };
        let dedicated_transfer_queue = if transfer_queue_family != graphics_queue_family {
            let queue = raw.get_device_queue(transfer_queue_family, 0);
            Some(Mutex::new(WorkQueue::new(
                raw.clone(),
                queue,
                transfer_queue_family,
                frames_in_flight,
            )))
        } else {
            None
        };

        let allocator_create_desc = vkalloc::AllocatorCreateDesc {
            physical_device: phy,
            debug_settings: Default::default(),
            device: raw.clone(),
            instance: instance.clone(),
            buffer_device_address: false,
        };
        let allocator =
            vkalloc::Allocator::new(&allocator_create_desc).expect("failed to create GPU allocator");

        let vk_khr_swapchain = ash::extensions::khr::Swapchain::new(instance, &raw);
        let vk_ext_debug_utils = ash::extensions::ext::DebugUtils::new(&*VULKAN_ENTRY, instance);

        let debug_messenger = if cfg!(debug_assertions) {
            let debug_utils_messenger_create_info = vk::DebugUtilsMessengerCreateInfoEXT {
                flags: vk::DebugUtilsMessengerCreateFlagsEXT::empty(),
                message_severity: vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
                message_type: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                pfn_user_callback: Some(debug_utils_message_callback),
                ..Default::default()
            };
            vk_ext_debug_utils
                .create_debug_utils_messenger(&debug_utils_messenger_create_info, None)
                .unwrap_or_else(|_| vk::DebugUtilsMessengerEXT::null())
        } else {
            vk::DebugUtilsMessengerEXT::null()
        };

        Arc::new(Device {
            raw,
            physical_device: phy,
            physical_device_properties,
            queues_info: QueuesInfo {
                graphics_family: graphics_queue_family,
                compute_family: (compute_queue_family != graphics_queue_family)
                    .then(|| compute_queue_family),
                transfer_family: (transfer_queue_family != graphics_queue_family)
                    .then(|| transfer_queue_family),
            },
            allocator: Arc::new(Mutex::new(Some(allocator))),
            vk_khr_swapchain,
            vk_khr_surface,
            vk_ext_debug_utils,
            debug_messenger,
            objects: Mutex::new(DeviceObjects::new()),
            deletion_queue: Mutex::new(DeletionQueue::new(frames_in_flight)),
            primary_queue: Mutex::new(primary_queue),
            dedicated_compute_queue,
            dedicated_transfer_queue,
            frame_state: FrameState {
                current_frame: AtomicU64::new(0),
                is_building_frame: AtomicBool::new(false),
            },
            frames_in_flight,
        })
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn physical_device_properties(&self) -> &vk::PhysicalDeviceProperties {
        &self.physical_device_properties
    }

    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    /// Index of the frame currently being built.
    pub fn current_frame(&self) -> u64 {
        self.frame_state.current_frame.load(Ordering::Relaxed)
    }

    /// `current_frame mod frames_in_flight`: selects per-frame pools and
    /// buffer sub-ranges.
    pub fn frame_slot(&self) -> usize {
        (self.current_frame() % self.frames_in_flight as u64) as usize
    }

    /// Marks the beginning of a frame.
    pub fn start_frame(&self) {
        let prev = self
            .frame_state
            .is_building_frame
            .swap(true, Ordering::Relaxed);
        assert!(!prev, "frame already started");
    }

    /// Marks the end of a frame: advances the frame index and reclaims
    /// resources that have aged out of the in-flight window.
    pub fn end_frame(&self) {
        let prev = self
            .frame_state
            .is_building_frame
            .swap(false, Ordering::Relaxed);
        assert!(prev, "no frame in progress");
        let next = self
            .frame_state
            .current_frame
            .fetch_add(1, Ordering::Relaxed)
            + 1;
        self.deletion_queue.lock().unwrap().flush_frame(next);
    }

    /// The graphics queue; also the queue the graph executor submits to.
    pub fn primary_queue(&self) -> MutexGuard<'_, WorkQueue> {
        self.primary_queue.lock().unwrap()
    }

    /// The dedicated compute queue, or the primary queue when the hardware
    /// exposes none.
    pub fn dedicated_compute_queue(&self) -> MutexGuard<'_, WorkQueue> {
        match &self.dedicated_compute_queue {
            Some(q) => q.lock().unwrap(),
            None => self.primary_queue(),
        }
    }

    /// The dedicated transfer queue, or the primary queue when the hardware
    /// exposes none.
    pub fn dedicated_transfer_queue(&self) -> MutexGuard<'_, WorkQueue> {
        match &self.dedicated_transfer_queue {
            Some(q) => q.lock().unwrap(),
            None => self.primary_queue(),
        }
    }

    pub fn graphics_queue_family(&self) -> u32 {
        self.queues_info.graphics_family
    }

    /// Family of the dedicated compute queue, when the hardware has one.
    pub fn dedicated_compute_queue_family(&self) -> Option<u32> {
        self.queues_info.compute_family
    }

    /// Family of the dedicated transfer queue, when the hardware has one.
    pub fn dedicated_transfer_queue_family(&self) -> Option<u32> {
        self.queues_info.transfer_family
    }

    pub(crate) fn defer(&self, deleter: impl FnOnce() + 'static) {
        self.deletion_queue
            .lock()
            .unwrap()
            .defer(self.current_frame(), deleter);
    }

    /// Associates a debug name with a vulkan object handle.
    pub(crate) fn set_debug_object_name(
        &self,
        object_type: vk::ObjectType,
        object_handle: u64,
        name: &str,
    ) {
        if self.debug_messenger == vk::DebugUtilsMessengerEXT::null() {
            return;
        }
        unsafe {
            let object_name = CString::new(name).unwrap();
            let _ = self.vk_ext_debug_utils.debug_utils_set_object_name(
                self.raw.handle(),
                &vk::DebugUtilsObjectNameInfoEXT {
                    object_type,
                    object_handle,
                    p_object_name: object_name.as_ptr(),
                    ..Default::default()
                },
            );
        }
    }

    // ------------------------------------------------------------------
    // images

    /// Creates an image and its default view.
    ///
    /// Returns the null handle if the device rejects the description.
    pub fn create_image(&self, name: &str, desc: &ImageDesc) -> ImageHandle {
        let handle = self.reserve_image_handle();
        if self.create_image_at(handle, name, desc) {
            handle
        } else {
            ImageHandle::NULL
        }
    }

    /// Reserves a slot for an image created later; the graph resource
    /// library hands these out while declarations are still accumulating
    /// usage bits.
    pub(crate) fn reserve_image_handle(&self) -> ImageHandle {
        let key = self.objects.lock().unwrap().images.insert(ImageRecord {
            raw: vk::Image::null(),
            view: vk::ImageView::null(),
            allocation: None,
            desc: ImageDesc::default(),
            aspect: vk::ImageAspectFlags::empty(),
            swapchain_owned: false,
            name: String::new(),
        });
        Handle::from_key(key)
    }

    /// Fills a reserved image slot. On failure the reservation is released
    /// and the handle becomes stale.
    pub(crate) fn create_image_at(
        &self,
        handle: ImageHandle,
        name: &str,
        desc: &ImageDesc,
    ) -> bool {
        if handle.is_null() {
            return false;
        }
        let release = || {
            self.objects.lock().unwrap().images.erase(handle.key());
        };

        let create_info = vk::ImageCreateInfo {
            image_type: desc.image_type,
            format: desc.format,
            extent: desc.extent,
            mip_levels: desc.mip_levels,
            array_layers: desc.array_layers,
            samples: get_vk_sample_count(desc.samples),
            tiling: vk::ImageTiling::OPTIMAL,
            usage: desc.usage.to_vk(),
            sharing_mode: vk::SharingMode::EXCLUSIVE,
            initial_layout: vk::ImageLayout::UNDEFINED,
            ..Default::default()
        };
        let raw = match unsafe { self.raw.create_image(&create_info, None) } {
            Ok(raw) => raw,
            Err(err) => {
                error!(name, ?err, "image creation failed");
                release();
                return false;
            }
        };

        let mem_req = unsafe { self.raw.get_image_memory_requirements(raw) };
        let allocation_create_desc = vkalloc::AllocationCreateDesc {
            name,
            requirements: mem_req,
            location: gpu_allocator::MemoryLocation::GpuOnly,
            linear: false,
        };
        let allocation = match self
            .allocator
            .lock()
            .unwrap()
            .as_mut()
            .expect("allocator torn down")
            .allocate(&allocation_create_desc)
        {
            Ok(allocation) => allocation,
            Err(err) => {
                error!(name, ?err, "image memory allocation failed");
                unsafe { self.raw.destroy_image(raw, None) };
                release();
                return false;
            }
        };
        unsafe {
            if let Err(err) =
                self.raw
                    .bind_image_memory(raw, allocation.memory(), allocation.offset())
            {
                error!(name, ?err, "bind_image_memory failed");
                self.raw.destroy_image(raw, None);
                free_allocation(&self.allocator, allocation);
                release();
                return false;
            }
        }

        let aspect = format_aspect_mask(desc.format);
        let view_create_info = vk::ImageViewCreateInfo {
            image: raw,
            view_type: image_view_type(desc.image_type, desc.array_layers),
            format: desc.format,
            components: vk::ComponentMapping::default(),
            subresource_range: vk::ImageSubresourceRange {
                aspect_mask: aspect,
                base_mip_level: 0,
                level_count: desc.mip_levels,
                base_array_layer: 0,
                layer_count: desc.array_layers,
            },
            ..Default::default()
        };
        let view = match unsafe { self.raw.create_image_view(&view_create_info, None) } {
            Ok(view) => view,
            Err(err) => {
                error!(name, ?err, "image view creation failed");
                unsafe { self.raw.destroy_image(raw, None) };
                free_allocation(&self.allocator, allocation);
                release();
                return false;
            }
        };

        self.set_debug_object_name(vk::ObjectType::IMAGE, raw.as_raw(), name);

        let mut objects = self.objects.lock().unwrap();
        match objects.images.get_mut(handle.key()) {
            Some(record) => {
                record.raw = raw;
                record.view = view;
                record.allocation = Some(allocation);
                record.desc = *desc;
                record.aspect = aspect;
                record.name = name.to_string();
                true
            }
            None => {
                drop(objects);
                unsafe {
                    self.raw.destroy_image_view(view, None);
                    self.raw.destroy_image(raw, None);
                }
                free_allocation(&self.allocator, allocation);
                false
            }
        }
    }

    /// Registers an externally owned image (a swapchain back-buffer).
    pub(crate) fn register_swapchain_image(
        &self,
        raw: vk::Image,
        view: vk::ImageView,
        desc: &ImageDesc,
        name: &str,
    ) -> ImageHandle {
        let key = self.objects.lock().unwrap().images.insert(ImageRecord {
            raw,
            view,
            allocation: None,
            desc: *desc,
            aspect: format_aspect_mask(desc.format),
            swapchain_owned: true,
            name: name.to_string(),
        });
        Handle::from_key(key)
    }

    /// Releases the image wrapper now and destroys the native image once the
    /// in-flight window has passed. Swapchain-owned images only lose their
    /// view; the presentation engine owns the image itself.
    pub fn destroy_image(&self, handle: ImageHandle) {
        let record = {
            let mut objects = self.objects.lock().unwrap();
            match objects.images.get_mut(handle.key()) {
                Some(record) => {
                    let taken = ImageRecord {
                        raw: record.raw,
                        view: std::mem::take(&mut record.view),
                        allocation: record.allocation.take(),
                        desc: record.desc,
                        aspect: record.aspect,
                        swapchain_owned: record.swapchain_owned,
                        name: std::mem::take(&mut record.name),
                    };
                    objects.images.erase(handle.key());
                    taken
                }
                None => return,
            }
        };

        let device = self.raw.clone();
        let allocator = self.allocator.clone();
        self.defer(move || unsafe {
            trace!(name = record.name.as_str(), "destroy image");
            if record.view != vk::ImageView::null() {
                device.destroy_image_view(record.view, None);
            }
            if !record.swapchain_owned {
                device.destroy_image(record.raw, None);
            }
            if let Some(allocation) = record.allocation {
                free_allocation(&allocator, allocation);
            }
        });
    }

    pub fn image_info(&self, handle: ImageHandle) -> Option<ImageInfo> {
        let objects = self.objects.lock().unwrap();
        let record = objects.images.get(handle.key())?;
        Some(ImageInfo {
            raw: record.raw,
            view: record.view,
            format: record.desc.format,
            extent: record.desc.extent,
            mip_levels: record.desc.mip_levels,
            array_layers: record.desc.array_layers,
            aspect: record.aspect,
            swapchain_owned: record.swapchain_owned,
        })
    }

    // ------------------------------------------------------------------
    // buffers

    /// Creates a buffer. A per-frame buffer is allocated at
    /// `frames_in_flight x byte_size` and addressed through
    /// [`Device::buffer_frame_offset`].
    ///
    /// Returns the null handle if the device rejects the description.
    pub fn create_buffer(&self, name: &str, desc: &BufferDesc) -> BufferHandle {
        let handle = self.reserve_buffer_handle();
        if self.create_buffer_at(handle, name, desc) {
            handle
        } else {
            BufferHandle::NULL
        }
    }

    /// Reserves a slot for a buffer created later.
    pub(crate) fn reserve_buffer_handle(&self) -> BufferHandle {
        let key = self.objects.lock().unwrap().buffers.insert(BufferRecord {
            raw: vk::Buffer::null(),
            allocation: None,
            desc: BufferDesc::default(),
            per_frame_stride: None,
            name: String::new(),
        });
        Handle::from_key(key)
    }

    /// Fills a reserved buffer slot. On failure the reservation is released
    /// and the handle becomes stale.
    pub(crate) fn create_buffer_at(
        &self,
        handle: BufferHandle,
        name: &str,
        desc: &BufferDesc,
    ) -> bool {
        if handle.is_null() {
            return false;
        }
        let release = || {
            self.objects.lock().unwrap().buffers.erase(handle.key());
        };

        let physical_size = if desc.per_frame {
            desc.byte_size * self.frames_in_flight as u64
        } else {
            desc.byte_size
        };

        let create_info = vk::BufferCreateInfo {
            flags: Default::default(),
            size: physical_size,
            usage: desc.usage.to_vk(),
            sharing_mode: vk::SharingMode::EXCLUSIVE,
            ..Default::default()
        };
        let raw = match unsafe { self.raw.create_buffer(&create_info, None) } {
            Ok(raw) => raw,
            Err(err) => {
                error!(name, ?err, "buffer creation failed");
                release();
                return false;
            }
        };

        let mem_req = unsafe { self.raw.get_buffer_memory_requirements(raw) };
        let allocation_create_desc = vkalloc::AllocationCreateDesc {
            name,
            requirements: mem_req,
            location: desc.location.to_alloc(),
            linear: true,
        };
        let allocation = match self
            .allocator
            .lock()
            .unwrap()
            .as_mut()
            .expect("allocator torn down")
            .allocate(&allocation_create_desc)
        {
            Ok(allocation) => allocation,
            Err(err) => {
                error!(name, ?err, "buffer memory allocation failed");
                unsafe { self.raw.destroy_buffer(raw, None) };
                release();
                return false;
            }
        };
        unsafe {
            if let Err(err) =
                self.raw
                    .bind_buffer_memory(raw, allocation.memory(), allocation.offset())
            {
                error!(name, ?err, "bind_buffer_memory failed");
                self.raw.destroy_buffer(raw, None);
                free_allocation(&self.allocator, allocation);
                release();
                return false;
            }
        }

        self.set_debug_object_name(vk::ObjectType::BUFFER, raw.as_raw(), name);

        let mut objects = self.objects.lock().unwrap();
        match objects.buffers.get_mut(handle.key()) {
            Some(record) => {
                record.raw = raw;
                record.allocation = Some(allocation);
                record.desc = *desc;
                record.per_frame_stride = desc.per_frame.then(|| desc.byte_size);
                record.name = name.to_string();
                true
            }
            None => {
                drop(objects);
                unsafe {
                    self.raw.destroy_buffer(raw, None);
                }
                free_allocation(&self.allocator, allocation);
                false
            }
        }
    }

    /// Releases the buffer wrapper now and destroys the native buffer once
    /// the in-flight window has passed.
    pub fn destroy_buffer(&self, handle: BufferHandle) {
        let (raw, allocation, name) = {
            let mut objects = self.objects.lock().unwrap();
            match objects.buffers.get_mut(handle.key()) {
                Some(record) => {
                    let taken = (
                        record.raw,
                        record.allocation.take(),
                        std::mem::take(&mut record.name),
                    );
                    objects.buffers.erase(handle.key());
                    taken
                }
                None => return,
            }
        };

        let device = self.raw.clone();
        let allocator = self.allocator.clone();
        self.defer(move || unsafe {
            trace!(name = name.as_str(), "destroy buffer");
            device.destroy_buffer(raw, None);
            if let Some(allocation) = allocation {
                free_allocation(&allocator, allocation);
            }
        });
    }

    pub fn buffer_info(&self, handle: BufferHandle) -> Option<BufferInfo> {
        let objects = self.objects.lock().unwrap();
        let record = objects.buffers.get(handle.key())?;
        Some(BufferInfo {
            raw: record.raw,
            byte_size: record.desc.byte_size,
            location: record.desc.location,
            per_frame: record.per_frame_stride.is_some(),
        })
    }

    /// Byte offset of the current frame's sub-range inside a per-frame
    /// buffer; `0` for plain buffers. Computed against the frame index at
    /// call time; never cache it across frames.
    pub fn buffer_frame_offset(&self, handle: BufferHandle) -> Option<u64> {
        let objects = self.objects.lock().unwrap();
        let record = objects.buffers.get(handle.key())?;
        Some(match record.per_frame_stride {
            Some(stride) => {
                per_frame_offset(self.current_frame(), self.frames_in_flight, stride)
            }
            None => 0,
        })
    }

    /// Maps the whole physical range of a host-visible buffer.
    ///
    /// Mapping device-only memory is a precondition violation: it asserts in
    /// debug builds and returns `None` in release builds.
    pub fn map_buffer(&self, handle: BufferHandle) -> Option<MappedRange> {
        let objects = self.objects.lock().unwrap();
        let record = objects.buffers.get(handle.key())?;
        debug_assert!(
            record.desc.location.is_host_visible(),
            "mapping device-only buffer `{}`",
            record.name
        );
        let ptr = record.allocation.as_ref()?.mapped_ptr()?;
        let physical_size = match record.per_frame_stride {
            Some(stride) => stride * self.frames_in_flight as u64,
            None => record.desc.byte_size,
        };
        Some(MappedRange {
            ptr: ptr.cast(),
            len: physical_size as usize,
        })
    }

    /// Maps the current frame's sub-range of a per-frame buffer. For a plain
    /// buffer this is the same as [`Device::map_buffer`].
    pub fn map_buffer_frame(&self, handle: BufferHandle) -> Option<MappedRange> {
        let offset = self.buffer_frame_offset(handle)?;
        let whole = self.map_buffer(handle)?;
        let objects = self.objects.lock().unwrap();
        let record = objects.buffers.get(handle.key())?;
        let len = record.desc.byte_size as usize;
        debug_assert!(offset as usize + len <= whole.len);
        Some(MappedRange {
            ptr: unsafe { NonNull::new_unchecked(whole.ptr.as_ptr().add(offset as usize)) },
            len,
        })
    }

    /// Host-visible allocations stay persistently mapped; this validates the
    /// handle and exists for API symmetry.
    pub fn unmap_buffer(&self, handle: BufferHandle) {
        let objects = self.objects.lock().unwrap();
        debug_assert!(objects.buffers.get(handle.key()).is_some());
    }

    // ------------------------------------------------------------------
    // samplers

    pub fn create_sampler(&self, desc: &SamplerDesc) -> SamplerHandle {
        let create_info = vk::SamplerCreateInfo {
            min_filter: desc.min_filter,
            mag_filter: desc.mag_filter,
            mipmap_mode: desc.mipmap_mode,
            address_mode_u: desc.address_mode,
            address_mode_v: desc.address_mode,
            address_mode_w: desc.address_mode,
            anisotropy_enable: if desc.max_anisotropy.is_some() {
                vk::TRUE
            } else {
                vk::FALSE
            },
            max_anisotropy: desc.max_anisotropy.unwrap_or(1.0),
            max_lod: vk::LOD_CLAMP_NONE,
            ..Default::default()
        };
        match unsafe { self.raw.create_sampler(&create_info, None) } {
            Ok(sampler) => {
                let key = self.objects.lock().unwrap().samplers.insert(sampler);
                Handle::from_key(key)
            }
            Err(err) => {
                error!(?err, "sampler creation failed");
                SamplerHandle::NULL
            }
        }
    }

    pub fn destroy_sampler(&self, handle: SamplerHandle) {
        let sampler = {
            let mut objects = self.objects.lock().unwrap();
            match objects.samplers.get(handle.key()).copied() {
                Some(sampler) => {
                    objects.samplers.erase(handle.key());
                    sampler
                }
                None => return,
            }
        };
        let device = self.raw.clone();
        self.defer(move || unsafe { device.destroy_sampler(sampler, None) });
    }

    pub fn sampler(&self, handle: SamplerHandle) -> Option<vk::Sampler> {
        self.objects
            .lock()
            .unwrap()
            .samplers
            .get(handle.key())
            .copied()
    }

    // ------------------------------------------------------------------
    // fences and semaphores

    pub fn create_fence(&self, signaled: bool) -> FenceHandle {
        let create_info = vk::FenceCreateInfo {
            flags: if signaled {
                vk::FenceCreateFlags::SIGNALED
            } else {
                vk::FenceCreateFlags::empty()
            },
            ..Default::default()
        };
        match unsafe { self.raw.create_fence(&create_info, None) } {
            Ok(fence) => {
                let key = self.objects.lock().unwrap().fences.insert(fence);
                Handle::from_key(key)
            }
            Err(err) => {
                error!(?err, "fence creation failed");
                FenceHandle::NULL
            }
        }
    }

    pub fn destroy_fence(&self, handle: FenceHandle) {
        let fence = {
            let mut objects = self.objects.lock().unwrap();
            match objects.fences.get(handle.key()).copied() {
                Some(fence) => {
                    objects.fences.erase(handle.key());
                    fence
                }
                None => return,
            }
        };
        let device = self.raw.clone();
        self.defer(move || unsafe { device.destroy_fence(fence, None) });
    }

    pub fn fence(&self, handle: FenceHandle) -> Option<vk::Fence> {
        self.objects
            .lock()
            .unwrap()
            .fences
            .get(handle.key())
            .copied()
    }

    pub fn wait_for_fence(&self, handle: FenceHandle, timeout_ns: u64) -> Result<(), vk::Result> {
        let fence = match self.fence(handle) {
            Some(fence) => fence,
            None => return Ok(()),
        };
        unsafe { self.raw.wait_for_fences(&[fence], true, timeout_ns) }
    }

    pub fn reset_fence(&self, handle: FenceHandle) -> Result<(), vk::Result> {
        let fence = match self.fence(handle) {
            Some(fence) => fence,
            None => return Ok(()),
        };
        unsafe { self.raw.reset_fences(&[fence]) }
    }

    pub fn create_semaphore(&self) -> SemaphoreHandle {
        let create_info = vk::SemaphoreCreateInfo::default();
        match unsafe { self.raw.create_semaphore(&create_info, None) } {
            Ok(semaphore) => {
                let key = self.objects.lock().unwrap().semaphores.insert(semaphore);
                Handle::from_key(key)
            }
            Err(err) => {
                error!(?err, "semaphore creation failed");
                SemaphoreHandle::NULL
            }
        }
    }

    pub fn destroy_semaphore(&self, handle: SemaphoreHandle) {
        let semaphore = {
            let mut objects = self.objects.lock().unwrap();
            match objects.semaphores.get(handle.key()).copied() {
                Some(semaphore) => {
                    objects.semaphores.erase(handle.key());
                    semaphore
                }
                None => return,
            }
        };
        let device = self.raw.clone();
        self.defer(move || unsafe { device.destroy_semaphore(semaphore, None) });
    }

    pub fn semaphore(&self, handle: SemaphoreHandle) -> Option<vk::Semaphore> {
        self.objects
            .lock()
            .unwrap()
            .semaphores
            .get(handle.key())
            .copied()
    }

    // ------------------------------------------------------------------
    // pipelines and descriptor sets
    //
    // The registry stores these as opaque records; their creation is
    // API-specific and happens outside the core.

    pub fn register_pipeline(&self, pipeline: vk::Pipeline) -> PipelineHandle {
        let key = self.objects.lock().unwrap().pipelines.insert(pipeline);
        Handle::from_key(key)
    }

    pub fn destroy_pipeline(&self, handle: PipelineHandle) {
        let pipeline = {
            let mut objects = self.objects.lock().unwrap();
            match objects.pipelines.get(handle.key()).copied() {
                Some(pipeline) => {
                    objects.pipelines.erase(handle.key());
                    pipeline
                }
                None => return,
            }
        };
        let device = self.raw.clone();
        self.defer(move || unsafe { device.destroy_pipeline(pipeline, None) });
    }

    pub fn pipeline(&self, handle: PipelineHandle) -> Option<vk::Pipeline> {
        self.objects
            .lock()
            .unwrap()
            .pipelines
            .get(handle.key())
            .copied()
    }

    pub fn register_descriptor_set(&self, set: vk::DescriptorSet) -> DescriptorSetHandle {
        let key = self.objects.lock().unwrap().descriptor_sets.insert(set);
        Handle::from_key(key)
    }

    /// Descriptor sets are owned by their pool; releasing the handle only
    /// frees the slot.
    pub fn release_descriptor_set(&self, handle: DescriptorSetHandle) {
        self.objects
            .lock()
            .unwrap()
            .descriptor_sets
            .erase(handle.key());
    }

    pub fn descriptor_set(&self, handle: DescriptorSetHandle) -> Option<vk::DescriptorSet> {
        self.objects
            .lock()
            .unwrap()
            .descriptor_sets
            .get(handle.key())
            .copied()
    }

    pub fn wait_idle(&self) {
        unsafe {
            let _ = self.raw.device_wait_idle();
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            let _ = self.raw.device_wait_idle();
            self.deletion_queue.lock().unwrap().flush_all();

            let mut objects = self.objects.lock().unwrap();
            for (_, record) in objects.images.iter() {
                if record.view != vk::ImageView::null() {
                    self.raw.destroy_image_view(record.view, None);
                }
                if !record.swapchain_owned && record.raw != vk::Image::null() {
                    self.raw.destroy_image(record.raw, None);
                }
            }
            for (_, record) in objects.buffers.iter() {
                if record.raw != vk::Buffer::null() {
                    self.raw.destroy_buffer(record.raw, None);
                }
            }
            for (_, &sampler) in objects.samplers.iter() {
                self.raw.destroy_sampler(sampler, None);
            }
            for (_, &fence) in objects.fences.iter() {
                self.raw.destroy_fence(fence, None);
            }
            for (_, &semaphore) in objects.semaphores.iter() {
                self.raw.destroy_semaphore(semaphore, None);
            }
            for (_, &pipeline) in objects.pipelines.iter() {
                self.raw.destroy_pipeline(pipeline, None);
            }
            for (_, surface) in objects.surfaces.iter() {
                self.vk_khr_swapchain.destroy_swapchain(surface.swapchain, None);
                self.vk_khr_surface.destroy_surface(surface.surface, None);
            }
            // Leaked allocations are freed when the allocator itself drops;
            // the allocator must go before the device does.
            objects.images.clear();
            objects.buffers.clear();
            drop(objects);
            self.allocator.lock().unwrap().take();

            self.primary_queue.lock().unwrap().destroy_pools();
            if let Some(q) = &self.dedicated_compute_queue {
                q.lock().unwrap().destroy_pools();
            }
            if let Some(q) = &self.dedicated_transfer_queue {
                q.lock().unwrap().destroy_pools();
            }

            if self.debug_messenger != vk::DebugUtilsMessengerEXT::null() {
                self.vk_ext_debug_utils
                    .destroy_debug_utils_messenger(self.debug_messenger, None);
            }
            self.raw.destroy_device(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_frame_offsets_rotate_through_the_window() {
        // frames_in_flight = 2, 256-byte payload
        assert_eq!(per_frame_offset(0, 2, 256), 0);
        assert_eq!(per_frame_offset(1, 2, 256), 256);
        assert_eq!(per_frame_offset(2, 2, 256), 0);
        // frame 3 addresses the same sub-range as frame 1
        assert_eq!(per_frame_offset(3, 2, 256), per_frame_offset(1, 2, 256));

        assert_eq!(per_frame_offset(4, 3, 64), 64);
    }

    #[test]
    fn memory_locations_map_to_allocator_locations() {
        assert_eq!(
            MemoryLocation::DeviceLocal.to_alloc(),
            gpu_allocator::MemoryLocation::GpuOnly
        );
        assert!(MemoryLocation::HostVisible.is_host_visible());
        assert!(MemoryLocation::HostVisibleDeviceLocal.is_host_visible());
        assert!(!MemoryLocation::DeviceLocal.is_host_visible());
    }

    #[test]
    fn usage_bitsets_translate_to_vulkan_flags() {
        let usage = ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED;
        let flags = usage.to_vk();
        assert!(flags.contains(vk::ImageUsageFlags::COLOR_ATTACHMENT));
        assert!(flags.contains(vk::ImageUsageFlags::SAMPLED));
        assert!(!flags.contains(vk::ImageUsageFlags::STORAGE));

        let usage = BufferUsage::CONSTANT | BufferUsage::TRANSFER_DST;
        let flags = usage.to_vk();
        assert!(flags.contains(vk::BufferUsageFlags::UNIFORM_BUFFER));
        assert!(flags.contains(vk::BufferUsageFlags::TRANSFER_DST));
        assert!(!flags.contains(vk::BufferUsageFlags::INDEX_BUFFER));
    }
}
