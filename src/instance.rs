//! Global Vulkan entry points and instance.

use ash::vk;
use lazy_static::lazy_static;
use raw_window_handle::RawWindowHandle;
use std::{
    ffi::CStr,
    os::raw::{c_char, c_void},
    ptr,
};

use crate::error::DeviceError;

/// List of validation layers to enable in debug builds.
const VALIDATION_LAYERS: [*const c_char; 1] =
    [b"VK_LAYER_KHRONOS_validation\0".as_ptr() as *const c_char];

lazy_static! {
    pub(crate) static ref VULKAN_ENTRY: ash::Entry = initialize_vulkan_entry();
    pub(crate) static ref VULKAN_INSTANCE: ash::Instance = create_vulkan_instance();
}

/// Returns the global Vulkan entry points.
pub fn get_vulkan_entry() -> &'static ash::Entry {
    &*VULKAN_ENTRY
}

/// Returns the global Vulkan instance.
pub fn get_vulkan_instance() -> &'static ash::Instance {
    &*VULKAN_INSTANCE
}

fn initialize_vulkan_entry() -> ash::Entry {
    unsafe { ash::Entry::new().expect("failed to initialize vulkan entry points") }
}

/// Checks if all validation layers are supported.
unsafe fn check_validation_layer_support() -> bool {
    let available_layers = VULKAN_ENTRY
        .enumerate_instance_layer_properties()
        .expect("failed to enumerate instance layers");
    VALIDATION_LAYERS.iter().all(|&required_layer| {
        available_layers.iter().any(|&layer| {
            CStr::from_ptr(layer.layer_name.as_ptr()) == CStr::from_ptr(required_layer)
        })
    })
}

fn create_vulkan_instance() -> ash::Instance {
    unsafe {
        let validation_available = cfg!(debug_assertions) && check_validation_layer_support();
        if cfg!(debug_assertions) && !validation_available {
            tracing::warn!("validation layer not available");
        }

        let mut instance_extensions: Vec<*const c_char> = Vec::new();
        instance_extensions.push(b"VK_KHR_surface\0".as_ptr() as *const c_char);
        instance_extensions.push(b"VK_EXT_debug_utils\0".as_ptr() as *const c_char);

        #[cfg(windows)]
        {
            instance_extensions.push(b"VK_KHR_win32_surface\0".as_ptr() as *const c_char);
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            instance_extensions.push(b"VK_KHR_xlib_surface\0".as_ptr() as *const c_char);
            instance_extensions.push(b"VK_KHR_wayland_surface\0".as_ptr() as *const c_char);
        }

        let application_info = vk::ApplicationInfo {
            p_application_name: b"SQUALL\0".as_ptr() as *const c_char,
            application_version: 0,
            p_engine_name: b"SQUALL\0".as_ptr() as *const c_char,
            engine_version: 0,
            api_version: vk::make_api_version(0, 1, 2, 0),
            ..Default::default()
        };

        let mut instance_create_info = vk::InstanceCreateInfo {
            flags: Default::default(),
            p_application_info: &application_info,
            enabled_layer_count: 0,
            pp_enabled_layer_names: ptr::null(),
            enabled_extension_count: instance_extensions.len() as u32,
            pp_enabled_extension_names: instance_extensions.as_ptr(),
            ..Default::default()
        };

        if validation_available {
            instance_create_info.enabled_layer_count = VALIDATION_LAYERS.len() as u32;
            instance_create_info.pp_enabled_layer_names = VALIDATION_LAYERS.as_ptr();
        }

        VULKAN_ENTRY
            .create_instance(&instance_create_info, None)
            .expect("failed to create vulkan instance")
    }
}

/// Translates debug-utils messages into tracing events.
pub(crate) unsafe extern "system" fn debug_utils_message_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_types: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut c_void,
) -> vk::Bool32 {
    let message = CStr::from_ptr((*p_callback_data).p_message).to_string_lossy();

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE => {
            tracing::event!(tracing::Level::TRACE, "{}", message);
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => {
            tracing::event!(tracing::Level::INFO, "{}", message);
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            tracing::event!(tracing::Level::WARN, "{}", message);
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            tracing::event!(tracing::Level::ERROR, "{}", message);
        }
        _ => {
            tracing::event!(tracing::Level::DEBUG, "{}", message);
        }
    };

    vk::FALSE
}

/// Creates a platform surface for the given window handle.
pub(crate) unsafe fn create_platform_surface(
    handle: RawWindowHandle,
) -> Result<vk::SurfaceKHR, DeviceError> {
    #[cfg(windows)]
    {
        if let RawWindowHandle::Windows(h) = handle {
            let loader =
                ash::extensions::khr::Win32Surface::new(&*VULKAN_ENTRY, &*VULKAN_INSTANCE);
            let create_info = vk::Win32SurfaceCreateInfoKHR {
                flags: Default::default(),
                hinstance: h.hinstance as *const c_void,
                hwnd: h.hwnd as *const c_void,
                ..Default::default()
            };
            return loader
                .create_win32_surface(&create_info, None)
                .map_err(DeviceError::Vulkan);
        }
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        match handle {
            RawWindowHandle::Xlib(h) => {
                let loader =
                    ash::extensions::khr::XlibSurface::new(&*VULKAN_ENTRY, &*VULKAN_INSTANCE);
                let create_info = vk::XlibSurfaceCreateInfoKHR {
                    flags: Default::default(),
                    dpy: h.display as *mut _,
                    window: h.window,
                    ..Default::default()
                };
                return loader
                    .create_xlib_surface(&create_info, None)
                    .map_err(DeviceError::Vulkan);
            }
            RawWindowHandle::Wayland(h) => {
                let loader =
                    ash::extensions::khr::WaylandSurface::new(&*VULKAN_ENTRY, &*VULKAN_INSTANCE);
                let create_info = vk::WaylandSurfaceCreateInfoKHR {
                    flags: Default::default(),
                    display: h.display,
                    surface: h.surface,
                    ..Default::default()
                };
                return loader
                    .create_wayland_surface(&create_info, None)
                    .map_err(DeviceError::Vulkan);
            }
            _ => {}
        }
    }

    let _ = handle;
    Err(DeviceError::SurfaceCreation)
}
