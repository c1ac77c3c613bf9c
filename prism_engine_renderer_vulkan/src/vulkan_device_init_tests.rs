//! Teardown of partially created Vulkan objects
//!
//! Needs a Vulkan driver (no window), marked with #[ignore].
//!
//! Run with: cargo test -p prism_engine_renderer_vulkan --lib -- --ignored

use super::*;

/// Headless instance, no surface extensions
unsafe fn create_headless_instance(entry: &ash::Entry) -> ash::Instance {
    let app_info = vk::ApplicationInfo::default()
        .application_name(c"prism init test")
        .api_version(vk::API_VERSION_1_3);
    let create_info = vk::InstanceCreateInfo::default().application_info(&app_info);
    entry.create_instance(&create_info, None).unwrap()
}

// ============================================================================
// ABORTED INITIALIZATION
// ============================================================================

#[test]
#[ignore] // Requires a Vulkan driver
fn test_aborted_init_destroys_instance() {
    unsafe {
        let entry = ash::Entry::load().unwrap();
        let instance = create_headless_instance(&entry);
        let partial = PartialInit::new(instance.clone());
        // Early return before any other object was created
        drop(partial);
    }
}

#[test]
#[ignore] // Requires a Vulkan driver
fn test_aborted_init_destroys_device_then_instance() {
    unsafe {
        let entry = ash::Entry::load().unwrap();
        let instance = create_headless_instance(&entry);
        let mut partial = PartialInit::new(instance.clone());

        let physical_devices = instance.enumerate_physical_devices().unwrap();
        let physical_device = physical_devices[0];
        let priorities = [1.0];
        let queue_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(0)
            .queue_priorities(&priorities)];
        let device = instance
            .create_device(
                physical_device,
                &vk::DeviceCreateInfo::default().queue_create_infos(&queue_infos),
                None,
            )
            .unwrap();
        partial.set_device(device);

        // Allocator creation failed here: device and instance both go
        drop(partial);
    }
}

#[test]
#[ignore] // Requires a Vulkan driver
fn test_completed_init_leaves_objects_alive() {
    unsafe {
        let entry = ash::Entry::load().unwrap();
        let instance = create_headless_instance(&entry);
        let partial = PartialInit::new(instance.clone());
        partial.complete();

        // Still usable after the guard is gone
        let physical_devices = instance.enumerate_physical_devices().unwrap();
        assert!(!physical_devices.is_empty());
        instance.destroy_instance(None);
    }
}
