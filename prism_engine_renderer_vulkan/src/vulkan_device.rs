/// VulkanGraphicsDevice - Vulkan implementation of the device, allocator and
/// surface traits

use ash::vk;
use ash::vk::Handle;
use gpu_allocator::vulkan::{
    Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc,
};
use gpu_allocator::MemoryLocation;
use prism_engine::prism::render::{
    AcquireOutcome, BufferDesc, BufferHandle, BufferUsage, CommandList, Config, FenceHandle,
    GpuAllocator, GraphicsDevice, ImageAllocation, ImageDesc, ImageHandle, ImageViewHandle,
    PresentOutcome, SemaphoreHandle, SubmitInfo, SurfaceBackend, SurfaceSupport, SwapchainDesc,
    TextureFormat,
};
use prism_engine::prism::{Error, Result};
use prism_engine::{engine_debug, engine_err, engine_error, engine_info, engine_warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use rustc_hash::FxHashMap;
use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::vulkan_command_list::VulkanCommandList;
use crate::vulkan_format::{
    aspects_to_vk, capabilities_from_vk, color_space_to_vk, error_from_vk, extent_to_vk,
    format_to_vk, image_usage_to_vk, present_mode_from_vk, present_mode_to_vk,
    stages_to_vk, surface_format_from_vk,
};

/// Vulkan device, surface and memory allocator in one object
///
/// Implements `GraphicsDevice`, `GpuAllocator` and `SurfaceBackend`. Wrap it in
/// an `Arc` and hand it to `BackendHandles::from_backend`. Engine handles are
/// the raw values of the Vulkan handles they name.
///
/// The window passed to `new` must outlive the device: the surface is created
/// on it and kept until drop.
pub struct VulkanGraphicsDevice {
    /// Keeps the Vulkan library loaded
    _entry: ash::Entry,
    instance: ash::Instance,
    debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,

    surface_loader: ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,

    physical_device: vk::PhysicalDevice,
    device: Arc<ash::Device>,

    graphics_queue_family: u32,
    present_queue_family: u32,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    /// Queue access is externally synchronized
    queue_lock: Mutex<()>,

    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: Mutex<vk::SwapchainKHR>,

    /// Dropped before the device in `Drop`
    allocator: ManuallyDrop<Mutex<Allocator>>,
    /// Image raw handle -> (view, memory)
    images: Mutex<FxHashMap<u64, (vk::ImageView, Allocation)>>,
    /// Buffer raw handle -> memory
    buffers: Mutex<FxHashMap<u64, Allocation>>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| engine_err!("prism::vulkan", "{} mutex poisoned", what))
}

/// Destruction paths cannot report errors; a poisoned map is still consistent
fn lock_for_teardown<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Objects created so far by `VulkanGraphicsDevice::new`.
///
/// Dropped before `complete` is called (an early `?` return), it destroys
/// them in reverse creation order.
pub(crate) struct PartialInit {
    instance: ash::Instance,
    debug: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    surface: Option<(ash::khr::surface::Instance, vk::SurfaceKHR)>,
    device: Option<ash::Device>,
    complete: bool,
}

impl PartialInit {
    pub(crate) fn new(instance: ash::Instance) -> Self {
        Self { instance, debug: None, surface: None, device: None, complete: false }
    }

    pub(crate) fn set_debug(&mut self, loader: ash::ext::debug_utils::Instance, messenger: vk::DebugUtilsMessengerEXT) {
        self.debug = Some((loader, messenger));
    }

    pub(crate) fn set_surface(&mut self, loader: ash::khr::surface::Instance, surface: vk::SurfaceKHR) {
        self.surface = Some((loader, surface));
    }

    pub(crate) fn set_device(&mut self, device: ash::Device) {
        self.device = Some(device);
    }

    /// Ownership moved into the finished device; nothing is destroyed
    pub(crate) fn complete(mut self) {
        self.complete = true;
    }
}

impl Drop for PartialInit {
    fn drop(&mut self) {
        if self.complete {
            return;
        }
        unsafe {
            if let Some(device) = self.device.take() {
                device.destroy_device(None);
            }
            if let Some((loader, surface)) = self.surface.take() {
                loader.destroy_surface(surface, None);
            }
            if let Some((loader, messenger)) = self.debug.take() {
                #[cfg(feature = "vulkan-validation")]
                crate::debug::cleanup_debug_config();
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        engine_warn!("prism::vulkan", "Vulkan initialization aborted, partial objects destroyed");
    }
}

impl VulkanGraphicsDevice {
    /// Create the instance, surface, logical device and allocator for `window`
    ///
    /// Requires a Vulkan 1.3 device (dynamic rendering). Validation layers are
    /// enabled when `config.enable_validation` is set and the crate was built
    /// with the `vulkan-validation` feature.
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: Config) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                engine_error!("prism::vulkan", "Failed to load Vulkan library: {:?}", e);
                Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
            })?;

            let app_name = CString::new(config.app_name.clone()).map_err(|e| {
                Error::InitializationFailed(format!("Invalid application name: {}", e))
            })?;
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Prism")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let display_handle = window.display_handle().map_err(|e| {
                engine_error!("prism::vulkan", "Failed to get display handle: {}", e);
                Error::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;
            let window_handle = window.window_handle().map_err(|e| {
                engine_error!("prism::vulkan", "Failed to get window handle: {}", e);
                Error::InitializationFailed(format!("Failed to get window handle: {}", e))
            })?;

            let mut extension_names =
                ash_window::enumerate_required_extensions(display_handle.as_raw())
                    .map_err(|e| {
                        engine_error!("prism::vulkan", "Failed to get required extensions: {}", e);
                        Error::InitializationFailed(format!(
                            "Failed to get required extensions: {}",
                            e
                        ))
                    })?
                    .to_vec();

            let enable_validation =
                config.enable_validation && cfg!(feature = "vulkan-validation");
            if config.enable_validation && !enable_validation {
                engine_warn!(
                    "prism::vulkan",
                    "Validation requested but the crate was built without `vulkan-validation`"
                );
            }
            if enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }
            let layer_names = if enable_validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry.create_instance(&create_info, None).map_err(|e| {
                engine_error!("prism::vulkan", "Failed to create Vulkan instance: {:?}", e);
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })?;

            let mut partial = PartialInit::new(instance.clone());

            let (debug_utils_loader, debug_messenger) = if enable_validation {
                Self::create_debug_messenger(&entry, &instance, &config)?
            } else {
                (None, None)
            };
            if let (Some(loader), Some(messenger)) = (&debug_utils_loader, debug_messenger) {
                partial.set_debug(loader.clone(), messenger);
            }

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                engine_error!("prism::vulkan", "Failed to create surface: {:?}", e);
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?;
            partial.set_surface(surface_loader.clone(), surface);

            let (physical_device, graphics_queue_family, present_queue_family) =
                Self::pick_physical_device(&instance, &surface_loader, surface)?;

            let queue_priorities = [1.0];
            let mut queue_create_infos = vec![vk::DeviceQueueCreateInfo::default()
                .queue_family_index(graphics_queue_family)
                .queue_priorities(&queue_priorities)];
            if present_queue_family != graphics_queue_family {
                queue_create_infos.push(
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(present_queue_family)
                        .queue_priorities(&queue_priorities),
                );
            }

            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
            let mut vulkan_13_features =
                vk::PhysicalDeviceVulkan13Features::default().dynamic_rendering(true);

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .push_next(&mut vulkan_13_features);

            let device = Arc::new(
                instance
                    .create_device(physical_device, &device_create_info, None)
                    .map_err(|e| {
                        engine_error!("prism::vulkan", "Failed to create logical device: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                    })?,
            );
            partial.set_device((*device).clone());

            let graphics_queue = device.get_device_queue(graphics_queue_family, 0);
            let present_queue = device.get_device_queue(present_queue_family, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: (*device).clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                engine_error!("prism::vulkan", "Failed to create GPU allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);

            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = properties
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            engine_info!(
                "prism::vulkan",
                "Vulkan device created: {} (graphics queue family {}, present queue family {}, validation {})",
                device_name,
                graphics_queue_family,
                present_queue_family,
                if enable_validation { "on" } else { "off" }
            );

            partial.complete();
            Ok(Self {
                _entry: entry,
                instance,
                debug_utils_loader,
                debug_messenger,
                surface_loader,
                surface,
                physical_device,
                device,
                graphics_queue_family,
                present_queue_family,
                graphics_queue,
                present_queue,
                queue_lock: Mutex::new(()),
                swapchain_loader,
                swapchain: Mutex::new(vk::SwapchainKHR::null()),
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                images: Mutex::new(FxHashMap::default()),
                buffers: Mutex::new(FxHashMap::default()),
            })
        }
    }

    /// Logical device, for creating pipelines and descriptor sets
    pub fn device(&self) -> &Arc<ash::Device> {
        &self.device
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn graphics_queue_family(&self) -> u32 {
        self.graphics_queue_family
    }

    /// Prefer a discrete GPU; require Vulkan 1.3, a graphics queue and present support
    unsafe fn pick_physical_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<(vk::PhysicalDevice, u32, u32)> {
        let physical_devices = instance.enumerate_physical_devices().map_err(|e| {
            engine_error!("prism::vulkan", "Failed to enumerate physical devices: {:?}", e);
            Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
        })?;

        let mut best: Option<(vk::PhysicalDevice, u32, u32, bool)> = None;
        for physical_device in physical_devices {
            let properties = instance.get_physical_device_properties(physical_device);
            if properties.api_version < vk::API_VERSION_1_3 {
                continue;
            }

            let queue_families =
                instance.get_physical_device_queue_family_properties(physical_device);
            let Some(graphics) = queue_families
                .iter()
                .position(|qf| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                .map(|i| i as u32)
            else {
                continue;
            };

            let supports_present = |family: u32| {
                surface_loader
                    .get_physical_device_surface_support(physical_device, family, surface)
                    .unwrap_or(false)
            };
            let present = if supports_present(graphics) {
                Some(graphics)
            } else {
                (0..queue_families.len() as u32).find(|&i| supports_present(i))
            };
            let Some(present) = present else {
                continue;
            };

            let discrete = properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU;
            if best.map_or(true, |(_, _, _, best_discrete)| discrete && !best_discrete) {
                best = Some((physical_device, graphics, present, discrete));
            }
        }

        best.map(|(device, graphics, present, _)| (device, graphics, present))
            .ok_or_else(|| {
                engine_error!("prism::vulkan", "No Vulkan 1.3 GPU with graphics and present support found");
                Error::InitializationFailed(
                    "No Vulkan 1.3 GPU with graphics and present support found".to_string(),
                )
            })
    }

    #[cfg(feature = "vulkan-validation")]
    unsafe fn create_debug_messenger(
        entry: &ash::Entry,
        instance: &ash::Instance,
        config: &Config,
    ) -> Result<(Option<ash::ext::debug_utils::Instance>, Option<vk::DebugUtilsMessengerEXT>)> {
        let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);

        crate::debug::init_debug_config(crate::debug::Config {
            severity: config.debug_severity,
            output: config.debug_output.clone(),
            message_filter: config.debug_message_filter,
            break_on_error: config.break_on_validation_error,
            panic_on_error: config.panic_on_error,
            enable_stats: config.enable_validation_stats,
        });

        let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(crate::debug::severity_flags(config.debug_severity))
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

        let messenger = debug_utils
            .create_debug_utils_messenger(&debug_info, None)
            .map_err(|e| {
                engine_error!("prism::vulkan", "Failed to create debug messenger: {:?}", e);
                Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
            })?;

        Ok((Some(debug_utils), Some(messenger)))
    }

    #[cfg(not(feature = "vulkan-validation"))]
    unsafe fn create_debug_messenger(
        _entry: &ash::Entry,
        _instance: &ash::Instance,
        _config: &Config,
    ) -> Result<(Option<ash::ext::debug_utils::Instance>, Option<vk::DebugUtilsMessengerEXT>)> {
        Ok((None, None))
    }

    fn check_strict_mode(&self) {
        #[cfg(feature = "vulkan-validation")]
        if self.debug_messenger.is_some() {
            crate::debug::check_strict_mode();
        }
    }

    unsafe fn create_view(
        &self,
        image: vk::Image,
        format: vk::Format,
        aspect_mask: vk::ImageAspectFlags,
    ) -> std::result::Result<vk::ImageView, vk::Result> {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });
        self.device.create_image_view(&create_info, None)
    }
}

// ===== GraphicsDevice =====

impl GraphicsDevice for VulkanGraphicsDevice {
    fn create_semaphore(&self) -> Result<SemaphoreHandle> {
        let semaphore = unsafe {
            self.device
                .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                .map_err(|e| error_from_vk("Failed to create semaphore", e))?
        };
        Ok(SemaphoreHandle(semaphore.as_raw()))
    }

    fn destroy_semaphore(&self, semaphore: SemaphoreHandle) {
        unsafe {
            self.device
                .destroy_semaphore(vk::Semaphore::from_raw(semaphore.0), None);
        }
    }

    fn create_fence(&self, signaled: bool) -> Result<FenceHandle> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let fence = unsafe {
            self.device
                .create_fence(&vk::FenceCreateInfo::default().flags(flags), None)
                .map_err(|e| error_from_vk("Failed to create fence", e))?
        };
        Ok(FenceHandle(fence.as_raw()))
    }

    fn wait_for_fence(&self, fence: FenceHandle, timeout_ns: u64) -> Result<()> {
        unsafe {
            self.device
                .wait_for_fences(&[vk::Fence::from_raw(fence.0)], true, timeout_ns)
                .map_err(|e| {
                    engine_error!("prism::vulkan", "Fence wait failed: {:?}", e);
                    error_from_vk("Fence wait failed", e)
                })
        }
    }

    fn reset_fence(&self, fence: FenceHandle) -> Result<()> {
        unsafe {
            self.device
                .reset_fences(&[vk::Fence::from_raw(fence.0)])
                .map_err(|e| error_from_vk("Failed to reset fence", e))
        }
    }

    fn destroy_fence(&self, fence: FenceHandle) {
        unsafe {
            self.device.destroy_fence(vk::Fence::from_raw(fence.0), None);
        }
    }

    fn create_command_list(&self) -> Result<Box<dyn CommandList>> {
        let command_list = VulkanCommandList::new(Arc::clone(&self.device), self.graphics_queue_family)?;
        Ok(Box::new(command_list))
    }

    fn submit(&self, commands: &dyn CommandList, info: &SubmitInfo) -> Result<()> {
        self.check_strict_mode();

        let command_buffers = [vk::CommandBuffer::from_raw(commands.handle().0)];
        let wait_semaphores = [vk::Semaphore::from_raw(info.wait_semaphore.0)];
        let wait_stages = [stages_to_vk(info.wait_stage)];
        let signal_semaphores = [vk::Semaphore::from_raw(info.signal_semaphore.0)];

        let mut submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
        if !info.wait_semaphore.is_null() {
            submit_info = submit_info
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages);
        }
        if !info.signal_semaphore.is_null() {
            submit_info = submit_info.signal_semaphores(&signal_semaphores);
        }

        let _queue = lock(&self.queue_lock, "queue")?;
        unsafe {
            self.device
                .queue_submit(
                    self.graphics_queue,
                    &[submit_info],
                    vk::Fence::from_raw(info.signal_fence.0),
                )
                .map_err(|e| {
                    engine_error!("prism::vulkan", "Failed to submit commands to GPU queue: {:?}", e);
                    error_from_vk("Failed to submit commands", e)
                })
        }
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device
                .device_wait_idle()
                .map_err(|e| error_from_vk("Failed to wait idle", e))
        }
    }
}

// ===== GpuAllocator =====

impl GpuAllocator for VulkanGraphicsDevice {
    fn create_image(&self, desc: &ImageDesc) -> Result<ImageAllocation> {
        if desc.extent.is_zero_area() {
            return Err(Error::InvalidResource(format!(
                "Image '{}' has a zero extent",
                desc.name
            )));
        }

        let format = format_to_vk(desc.format);
        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: desc.extent.width,
                height: desc.extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(image_usage_to_vk(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        unsafe {
            let image = self.device.create_image(&image_info, None).map_err(|e| {
                engine_error!("prism::vulkan", "Failed to create image '{}': {:?}", desc.name, e);
                error_from_vk("Failed to create image", e)
            })?;

            let requirements = self.device.get_image_memory_requirements(image);
            let allocation = lock(&self.allocator, "allocator")?.allocate(&AllocationCreateDesc {
                name: &desc.name,
                requirements,
                location: MemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    self.device.destroy_image(image, None);
                    engine_error!("prism::vulkan", "Failed to allocate memory for '{}': {:?}", desc.name, e);
                    return Err(Error::OutOfMemory);
                }
            };

            let bound = self
                .device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
                .and_then(|_| self.create_view(image, format, aspects_to_vk(desc.aspects)));
            let view = match bound {
                Ok(view) => view,
                Err(e) => {
                    self.device.destroy_image(image, None);
                    lock_for_teardown(&self.allocator).free(allocation).ok();
                    engine_error!("prism::vulkan", "Failed to bind image '{}': {:?}", desc.name, e);
                    return Err(error_from_vk("Failed to bind image", e));
                }
            };

            engine_debug!(
                "prism::vulkan",
                "Created image '{}' {}x{} {:?}",
                desc.name,
                desc.extent.width,
                desc.extent.height,
                desc.format
            );

            lock(&self.images, "images")?.insert(image.as_raw(), (view, allocation));
            Ok(ImageAllocation {
                image: ImageHandle(image.as_raw()),
                view: ImageViewHandle(view.as_raw()),
            })
        }
    }

    fn destroy_image(&self, allocation: ImageAllocation) {
        let Some((view, memory)) = lock_for_teardown(&self.images).remove(&allocation.image.0) else {
            engine_warn!("prism::vulkan", "destroy_image: unknown image {:?}", allocation.image);
            return;
        };
        unsafe {
            self.device.destroy_image_view(view, None);
            self.device
                .destroy_image(vk::Image::from_raw(allocation.image.0), None);
        }
        if let Err(e) = lock_for_teardown(&self.allocator).free(memory) {
            engine_warn!("prism::vulkan", "Failed to free image memory: {:?}", e);
        }
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<BufferHandle> {
        let usage = match desc.usage {
            BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
            BufferUsage::Storage => vk::BufferUsageFlags::STORAGE_BUFFER,
        };
        let buffer_info = vk::BufferCreateInfo::default()
            .size(desc.size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        unsafe {
            let buffer = self.device.create_buffer(&buffer_info, None).map_err(|e| {
                engine_error!("prism::vulkan", "Failed to create buffer '{}': {:?}", desc.name, e);
                error_from_vk("Failed to create buffer", e)
            })?;

            let requirements = self.device.get_buffer_memory_requirements(buffer);
            let allocation = lock(&self.allocator, "allocator")?.allocate(&AllocationCreateDesc {
                name: &desc.name,
                requirements,
                location: MemoryLocation::CpuToGpu,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    self.device.destroy_buffer(buffer, None);
                    engine_error!("prism::vulkan", "Failed to allocate memory for '{}': {:?}", desc.name, e);
                    return Err(Error::OutOfMemory);
                }
            };

            if let Err(e) =
                self.device
                    .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
            {
                self.device.destroy_buffer(buffer, None);
                lock_for_teardown(&self.allocator).free(allocation).ok();
                engine_error!("prism::vulkan", "Failed to bind buffer '{}': {:?}", desc.name, e);
                return Err(error_from_vk("Failed to bind buffer", e));
            }

            lock(&self.buffers, "buffers")?.insert(buffer.as_raw(), allocation);
            Ok(BufferHandle(buffer.as_raw()))
        }
    }

    fn write_buffer(&self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        let mut buffers = lock(&self.buffers, "buffers")?;
        let allocation = buffers
            .get_mut(&buffer.0)
            .ok_or_else(|| Error::InvalidResource(format!("Unknown buffer {:?}", buffer)))?;
        let mapped = allocation
            .mapped_slice_mut()
            .ok_or_else(|| Error::InvalidResource(format!("Buffer {:?} is not host-visible", buffer)))?;

        let start = offset as usize;
        let end = start + data.len();
        if end > mapped.len() {
            return Err(Error::InvalidResource(format!(
                "Write of {} bytes at offset {} overflows buffer {:?} ({} bytes)",
                data.len(),
                offset,
                buffer,
                mapped.len()
            )));
        }
        mapped[start..end].copy_from_slice(data);
        Ok(())
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        let Some(memory) = lock_for_teardown(&self.buffers).remove(&buffer.0) else {
            engine_warn!("prism::vulkan", "destroy_buffer: unknown buffer {:?}", buffer);
            return;
        };
        unsafe {
            self.device.destroy_buffer(vk::Buffer::from_raw(buffer.0), None);
        }
        if let Err(e) = lock_for_teardown(&self.allocator).free(memory) {
            engine_warn!("prism::vulkan", "Failed to free buffer memory: {:?}", e);
        }
    }
}

// ===== SurfaceBackend =====

impl SurfaceBackend for VulkanGraphicsDevice {
    fn surface_support(&self) -> Result<SurfaceSupport> {
        unsafe {
            let capabilities = self
                .surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, self.surface)
                .map_err(|e| error_from_vk("Failed to get surface capabilities", e))?;
            let formats = self
                .surface_loader
                .get_physical_device_surface_formats(self.physical_device, self.surface)
                .map_err(|e| error_from_vk("Failed to get surface formats", e))?;
            let present_modes = self
                .surface_loader
                .get_physical_device_surface_present_modes(self.physical_device, self.surface)
                .map_err(|e| error_from_vk("Failed to get present modes", e))?;

            Ok(SurfaceSupport {
                capabilities: capabilities_from_vk(&capabilities),
                formats: formats.into_iter().map(surface_format_from_vk).collect(),
                present_modes: present_modes
                    .into_iter()
                    .filter_map(present_mode_from_vk)
                    .collect(),
            })
        }
    }

    fn create_swapchain(&self, desc: &SwapchainDesc) -> Result<Vec<ImageHandle>> {
        let mut current = lock(&self.swapchain, "swapchain")?;
        if *current != vk::SwapchainKHR::null() {
            return Err(Error::InvalidResource(
                "A swapchain already exists; destroy it first".to_string(),
            ));
        }

        unsafe {
            let capabilities = self
                .surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, self.surface)
                .map_err(|e| error_from_vk("Failed to get surface capabilities", e))?;

            let queue_family_indices = [self.graphics_queue_family, self.present_queue_family];
            let mut create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(self.surface)
                .min_image_count(desc.image_count)
                .image_format(format_to_vk(desc.format.format))
                .image_color_space(color_space_to_vk(desc.format.color_space))
                .image_extent(extent_to_vk(desc.extent))
                .image_array_layers(1)
                .image_usage(
                    vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST,
                )
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(present_mode_to_vk(desc.present_mode))
                .clipped(true);
            create_info = if self.graphics_queue_family != self.present_queue_family {
                create_info
                    .image_sharing_mode(vk::SharingMode::CONCURRENT)
                    .queue_family_indices(&queue_family_indices)
            } else {
                create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            };

            let swapchain = self
                .swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| {
                    engine_error!("prism::vulkan", "Failed to create swapchain: {:?}", e);
                    error_from_vk("Failed to create swapchain", e)
                })?;

            let images = match self.swapchain_loader.get_swapchain_images(swapchain) {
                Ok(images) => images,
                Err(e) => {
                    self.swapchain_loader.destroy_swapchain(swapchain, None);
                    engine_error!("prism::vulkan", "Failed to get swapchain images: {:?}", e);
                    return Err(error_from_vk("Failed to get swapchain images", e));
                }
            };

            *current = swapchain;
            engine_debug!(
                "prism::vulkan",
                "Swapchain created: {} images, {}x{}, {:?}",
                images.len(),
                desc.extent.width,
                desc.extent.height,
                desc.present_mode
            );
            Ok(images.into_iter().map(|image| ImageHandle(image.as_raw())).collect())
        }
    }

    fn destroy_swapchain(&self) {
        let mut current = lock_for_teardown(&self.swapchain);
        if *current != vk::SwapchainKHR::null() {
            unsafe {
                self.swapchain_loader.destroy_swapchain(*current, None);
            }
            *current = vk::SwapchainKHR::null();
        }
    }

    fn create_image_view(&self, image: ImageHandle, format: TextureFormat) -> Result<ImageViewHandle> {
        let view = unsafe {
            self.create_view(
                vk::Image::from_raw(image.0),
                format_to_vk(format),
                vk::ImageAspectFlags::COLOR,
            )
            .map_err(|e| error_from_vk("Failed to create swapchain image view", e))?
        };
        Ok(ImageViewHandle(view.as_raw()))
    }

    fn destroy_image_view(&self, view: ImageViewHandle) {
        unsafe {
            self.device
                .destroy_image_view(vk::ImageView::from_raw(view.0), None);
        }
    }

    fn acquire_next_image(&self, timeout_ns: u64, signal: SemaphoreHandle) -> Result<AcquireOutcome> {
        let swapchain = *lock(&self.swapchain, "swapchain")?;
        if swapchain == vk::SwapchainKHR::null() {
            return Err(Error::InvalidResource("No swapchain to acquire from".to_string()));
        }

        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                swapchain,
                timeout_ns,
                vk::Semaphore::from_raw(signal.0),
                vk::Fence::null(),
            )
        };
        match result {
            Ok((index, suboptimal)) => Ok(AcquireOutcome::Acquired { index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(e) => {
                engine_error!("prism::vulkan", "Failed to acquire next swapchain image: {:?}", e);
                Err(error_from_vk("Failed to acquire swapchain image", e))
            }
        }
    }

    fn present(&self, wait: SemaphoreHandle, image_index: u32) -> Result<PresentOutcome> {
        self.check_strict_mode();

        let swapchains = [*lock(&self.swapchain, "swapchain")?];
        let image_indices = [image_index];
        let wait_semaphores = [vk::Semaphore::from_raw(wait.0)];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let _queue = lock(&self.queue_lock, "queue")?;
        let result = unsafe {
            self.swapchain_loader
                .queue_present(self.present_queue, &present_info)
        };
        match result {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(e) => {
                engine_error!("prism::vulkan", "Failed to present: {:?}", e);
                Err(error_from_vk("Failed to present", e))
            }
        }
    }

    fn wait_idle(&self) -> Result<()> {
        GraphicsDevice::wait_idle(self)
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // 1. Swapchain, if its owner did not destroy it
            let swapchain = *lock_for_teardown(&self.swapchain);
            if swapchain != vk::SwapchainKHR::null() {
                engine_warn!("prism::vulkan", "Swapchain still alive at device drop");
                self.swapchain_loader.destroy_swapchain(swapchain, None);
            }

            // 2. Leaked images and buffers
            let allocator = self
                .allocator
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner);
            let images: Vec<_> = lock_for_teardown(&self.images).drain().collect();
            let buffers: Vec<_> = lock_for_teardown(&self.buffers).drain().collect();
            if !images.is_empty() || !buffers.is_empty() {
                engine_warn!(
                    "prism::vulkan",
                    "{} image(s) and {} buffer(s) still alive at device drop",
                    images.len(),
                    buffers.len()
                );
            }
            for (raw, (view, memory)) in images {
                self.device.destroy_image_view(view, None);
                self.device.destroy_image(vk::Image::from_raw(raw), None);
                allocator.free(memory).ok();
            }
            for (raw, memory) in buffers {
                self.device.destroy_buffer(vk::Buffer::from_raw(raw), None);
                allocator.free(memory).ok();
            }

            // 3. Allocator frees its memory blocks while the device is alive
            ManuallyDrop::drop(&mut self.allocator);

            // 4. Messenger before the instance; silence late callbacks first
            #[cfg(feature = "vulkan-validation")]
            crate::debug::cleanup_debug_config();
            if let (Some(debug_utils), Some(messenger)) =
                (&self.debug_utils_loader, self.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            // 5. Surface, device, instance
            self.surface_loader.destroy_surface(self.surface, None);
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }

        engine_info!("prism::vulkan", "Vulkan device destroyed");
    }
}

#[cfg(test)]
#[path = "vulkan_device_init_tests.rs"]
mod tests;
