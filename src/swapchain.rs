//! Render surfaces: native surface + swapchain lifecycle.

use crate::{
    device::{AcquiredImage, Device, ImageDesc, ImageUsage},
    error::{DeviceError, SwapchainError},
    handle::{FenceHandle, Handle, ImageHandle, RenderSurfaceHandle, SemaphoreHandle},
    instance::create_platform_surface,
};
use ash::vk;
use raw_window_handle::RawWindowHandle;
use tracing::trace;

const ACQUIRE_TIMEOUT_NS: u64 = 1_000_000_000;

/// Parameters for `Device::create_render_surface`.
#[derive(Copy, Clone, Debug)]
pub struct RenderSurfaceDesc {
    /// Window to derive the native surface from.
    pub window: RawWindowHandle,
    pub width: u32,
    pub height: u32,
    pub min_image_count: u32,
    pub format: vk::Format,
    pub color_space: vk::ColorSpaceKHR,
    pub present_mode: vk::PresentModeKHR,
}

pub(crate) struct RenderSurface {
    pub(crate) swapchain: vk::SwapchainKHR,
    pub(crate) surface: vk::SurfaceKHR,
    pub(crate) format: vk::SurfaceFormatKHR,
    pub(crate) extent: vk::Extent2D,
    pub(crate) images: Vec<ImageHandle>,
    /// Index acquired most recently; addressed by the executor between
    /// acquire and present.
    pub(crate) current_image: u32,
    /// The window this surface was derived from.
    window: RawWindowHandle,
    min_image_count: u32,
    present_mode: vk::PresentModeKHR,
}

/// Chooses a swapchain surface format among the supported ones.
fn choose_surface_format(
    requested: vk::SurfaceFormatKHR,
    surface_formats: &[vk::SurfaceFormatKHR],
) -> vk::SurfaceFormatKHR {
    surface_formats
        .iter()
        .copied()
        .find(|&fmt| fmt.format == requested.format && fmt.color_space == requested.color_space)
        .or_else(|| {
            surface_formats.iter().copied().find(|&fmt| {
                fmt.format == vk::Format::B8G8R8A8_SRGB
                    && fmt.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
            })
        })
        .or_else(|| surface_formats.first().copied())
        .expect("no suitable surface format available")
}

/// Chooses a present mode among the supported ones.
fn choose_present_mode(
    requested: vk::PresentModeKHR,
    available: &[vk::PresentModeKHR],
) -> vk::PresentModeKHR {
    if available.contains(&requested) {
        requested
    } else {
        // FIFO is always available
        vk::PresentModeKHR::FIFO
    }
}

/// Computes the swap extent.
fn choose_swap_extent(
    framebuffer_size: (u32, u32),
    capabilities: &vk::SurfaceCapabilitiesKHR,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: framebuffer_size.0.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: framebuffer_size.1.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

struct SwapchainObjects {
    swapchain: vk::SwapchainKHR,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    images: Vec<ImageHandle>,
}

impl Device {
    /// Builds the native swapchain and registers one image wrapper per
    /// back-buffer.
    unsafe fn build_swapchain(
        &self,
        surface: vk::SurfaceKHR,
        size: (u32, u32),
        min_image_count: u32,
        requested_format: vk::SurfaceFormatKHR,
        present_mode: vk::PresentModeKHR,
        old_swapchain: vk::SwapchainKHR,
    ) -> Result<SwapchainObjects, DeviceError> {
        let phy = self.physical_device;
        let capabilities = self
            .vk_khr_surface
            .get_physical_device_surface_capabilities(phy, surface)?;
        let formats = self
            .vk_khr_surface
            .get_physical_device_surface_formats(phy, surface)?;
        let present_modes = self
            .vk_khr_surface
            .get_physical_device_surface_present_modes(phy, surface)?;

        let format = choose_surface_format(requested_format, &formats);
        let present_mode = choose_present_mode(present_mode, &present_modes);
        let extent = choose_swap_extent(size, &capabilities);
        let image_count = if capabilities.max_image_count > 0 {
            min_image_count.clamp(capabilities.min_image_count, capabilities.max_image_count)
        } else {
            min_image_count.max(capabilities.min_image_count)
        };

        let create_info = vk::SwapchainCreateInfoKHR {
            flags: Default::default(),
            surface,
            min_image_count: image_count,
            image_format: format.format,
            image_color_space: format.color_space,
            image_extent: extent,
            image_array_layers: 1,
            image_usage: vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST,
            image_sharing_mode: vk::SharingMode::EXCLUSIVE,
            pre_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
            present_mode,
            clipped: vk::TRUE,
            old_swapchain,
            ..Default::default()
        };

        let swapchain = self.vk_khr_swapchain.create_swapchain(&create_info, None)?;
        let native_images = self.vk_khr_swapchain.get_swapchain_images(swapchain)?;

        let image_desc = ImageDesc {
            image_type: vk::ImageType::TYPE_2D,
            usage: ImageUsage::COLOR_ATTACHMENT | ImageUsage::TRANSFER_DST,
            format: format.format,
            extent: vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            },
            mip_levels: 1,
            array_layers: 1,
            samples: 1,
        };

        let mut images = Vec::with_capacity(native_images.len());
        for (index, &native) in native_images.iter().enumerate() {
            let view_create_info = vk::ImageViewCreateInfo {
                image: native,
                view_type: vk::ImageViewType::TYPE_2D,
                format: format.format,
                components: vk::ComponentMapping::default(),
                subresource_range: vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                },
                ..Default::default()
            };
            let view = self.raw.create_image_view(&view_create_info, None)?;
            let name = format!("swapchain image #{}", index);
            images.push(self.register_swapchain_image(native, view, &image_desc, &name));
        }

        Ok(SwapchainObjects {
            swapchain,
            format,
            extent,
            images,
        })
    }

    /// Creates a surface for the given window, then a swapchain on it.
    ///
    /// Returns the null handle when the surface or swapchain cannot be
    /// created.
    pub fn create_render_surface(&self, desc: &RenderSurfaceDesc) -> RenderSurfaceHandle {
        let surface = match unsafe { create_platform_surface(desc.window) } {
            Ok(surface) => surface,
            Err(err) => {
                tracing::error!(?err, "failed to create window surface");
                return RenderSurfaceHandle::NULL;
            }
        };

        let objects = unsafe {
            self.build_swapchain(
                surface,
                (desc.width, desc.height),
                desc.min_image_count,
                vk::SurfaceFormatKHR {
                    format: desc.format,
                    color_space: desc.color_space,
                },
                desc.present_mode,
                vk::SwapchainKHR::null(),
            )
        };
        let objects = match objects {
            Ok(objects) => objects,
            Err(err) => {
                tracing::error!(?err, "failed to create swapchain");
                unsafe { self.vk_khr_surface.destroy_surface(surface, None) };
                return RenderSurfaceHandle::NULL;
            }
        };

        trace!(
            images = objects.images.len(),
            format = ?objects.format.format,
            extent = ?objects.extent,
            "created render surface"
        );

        let key = self.objects.lock().unwrap().surfaces.insert(RenderSurface {
            swapchain: objects.swapchain,
            surface,
            format: objects.format,
            extent: objects.extent,
            images: objects.images,
            current_image: 0,
            window: desc.window,
            min_image_count: desc.min_image_count,
            present_mode: desc.present_mode,
        });
        Handle::from_key(key)
    }

    /// Rebuilds the swapchain after an out-of-date result, reusing the
    /// surface. Old back-buffer wrappers are released through the deferred
    /// path.
    pub fn recreate_render_surface(
        &self,
        handle: RenderSurfaceHandle,
        width: u32,
        height: u32,
    ) -> Result<(), DeviceError> {
        let (surface, old_swapchain, old_images, format, min_image_count, present_mode) = {
            let objects = self.objects.lock().unwrap();
            let record = objects
                .surfaces
                .get(handle.key())
                .ok_or(DeviceError::SurfaceCreation)?;
            (
                record.surface,
                record.swapchain,
                record.images.clone(),
                record.format,
                record.min_image_count,
                record.present_mode,
            )
        };

        let rebuilt = unsafe {
            self.build_swapchain(
                surface,
                (width, height),
                min_image_count,
                format,
                present_mode,
                old_swapchain,
            )?
        };

        for image in old_images {
            self.destroy_image(image);
        }
        let loader = self.vk_khr_swapchain.clone();
        self.defer(move || unsafe {
            loader.destroy_swapchain(old_swapchain, None);
        });

        let mut objects = self.objects.lock().unwrap();
        if let Some(record) = objects.surfaces.get_mut(handle.key()) {
            record.swapchain = rebuilt.swapchain;
            record.format = rebuilt.format;
            record.extent = rebuilt.extent;
            record.images = rebuilt.images;
            record.current_image = 0;
        }
        Ok(())
    }

    /// Releases the surface record; native objects are destroyed once the
    /// in-flight window has passed.
    pub fn destroy_render_surface(&self, handle: RenderSurfaceHandle) {
        let record = {
            let mut objects = self.objects.lock().unwrap();
            match objects.surfaces.get_mut(handle.key()) {
                Some(record) => {
                    let taken = RenderSurface {
                        swapchain: record.swapchain,
                        surface: record.surface,
                        format: record.format,
                        extent: record.extent,
                        images: std::mem::take(&mut record.images),
                        current_image: 0,
                        window: record.window,
                        min_image_count: record.min_image_count,
                        present_mode: record.present_mode,
                    };
                    objects.surfaces.erase(handle.key());
                    taken
                }
                None => return,
            }
        };

        for image in &record.images {
            self.destroy_image(*image);
        }
        let swapchain_loader = self.vk_khr_swapchain.clone();
        let surface_loader = self.vk_khr_surface.clone();
        self.defer(move || unsafe {
            swapchain_loader.destroy_swapchain(record.swapchain, None);
            surface_loader.destroy_surface(record.surface, None);
        });
    }

    /// The back-buffer image handles of a render surface, in swapchain
    /// order.
    pub fn render_surface_images(&self, handle: RenderSurfaceHandle) -> Vec<ImageHandle> {
        self.objects
            .lock()
            .unwrap()
            .surfaces
            .get(handle.key())
            .map(|record| record.images.clone())
            .unwrap_or_default()
    }

    pub fn render_surface_extent(&self, handle: RenderSurfaceHandle) -> Option<vk::Extent2D> {
        self.objects
            .lock()
            .unwrap()
            .surfaces
            .get(handle.key())
            .map(|record| record.extent)
    }

    /// The window a render surface was created for.
    pub fn render_surface_window(&self, handle: RenderSurfaceHandle) -> Option<RawWindowHandle> {
        self.objects
            .lock()
            .unwrap()
            .surfaces
            .get(handle.key())
            .map(|record| record.window)
    }

    pub fn render_surface_format(&self, handle: RenderSurfaceHandle) -> Option<vk::Format> {
        self.objects
            .lock()
            .unwrap()
            .surfaces
            .get(handle.key())
            .map(|record| record.format.format)
    }

    /// Acquires the next back-buffer of `handle`, signalling the given
    /// semaphore and/or fence (either may be null).
    ///
    /// An `OutOfDate` or `Suboptimal` result directs the client to call
    /// [`Device::recreate_render_surface`] and retry.
    pub fn acquire_next_image(
        &self,
        handle: RenderSurfaceHandle,
        signal_semaphore: SemaphoreHandle,
        signal_fence: FenceHandle,
    ) -> Result<AcquiredImage, SwapchainError> {
        let swapchain = {
            let objects = self.objects.lock().unwrap();
            objects
                .surfaces
                .get(handle.key())
                .map(|record| record.swapchain)
                .ok_or(SwapchainError::Device(vk::Result::ERROR_SURFACE_LOST_KHR))?
        };
        let semaphore = self.semaphore(signal_semaphore).unwrap_or_default();
        let fence = self.fence(signal_fence).unwrap_or_default();

        let result = unsafe {
            self.vk_khr_swapchain
                .acquire_next_image(swapchain, ACQUIRE_TIMEOUT_NS, semaphore, fence)
        };
        match result {
            Ok((image_index, false)) => {
                let mut objects = self.objects.lock().unwrap();
                let record = objects
                    .surfaces
                    .get_mut(handle.key())
                    .ok_or(SwapchainError::Device(vk::Result::ERROR_SURFACE_LOST_KHR))?;
                record.current_image = image_index;
                Ok(AcquiredImage {
                    image: record.images[image_index as usize],
                    image_index,
                })
            }
            Ok((_, true)) => Err(SwapchainError::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(SwapchainError::OutOfDate),
            Err(err) => Err(SwapchainError::Device(err)),
        }
    }

    /// Native swapchain handle plus the most recently acquired index;
    /// consumed by the executor at present time.
    pub(crate) fn render_surface_present_state(
        &self,
        handle: RenderSurfaceHandle,
    ) -> Option<(vk::SwapchainKHR, u32)> {
        self.objects
            .lock()
            .unwrap()
            .surfaces
            .get(handle.key())
            .map(|record| (record.swapchain, record.current_image))
    }

    /// Image handle of the most recently acquired back-buffer.
    pub fn render_surface_current_image(&self, handle: RenderSurfaceHandle) -> Option<ImageHandle> {
        self.objects
            .lock()
            .unwrap()
            .surfaces
            .get(handle.key())
            .map(|record| record.images[record.current_image as usize])
    }
}
