/// GraphicsDevice trait - synchronization objects, command lists and submission

use crate::error::Result;
use crate::graphics_device::{CommandList, FenceHandle, PipelineStages, SemaphoreHandle};

/// Queue submission of one recorded command list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitInfo {
    /// Semaphore to wait on before the waiting stage may run
    pub wait_semaphore: SemaphoreHandle,
    /// Stage at which the wait applies
    pub wait_stage: PipelineStages,
    /// Semaphore signaled when the command list completes
    pub signal_semaphore: SemaphoreHandle,
    /// Fence signaled when the command list completes
    pub signal_fence: FenceHandle,
}

/// Logical device: creates sync objects and command lists, submits work
///
/// Implemented by backend crates (e.g. the Vulkan backend). Shared between the
/// components that own device objects as `Arc<dyn GraphicsDevice>`.
pub trait GraphicsDevice: Send + Sync {
    /// Create a binary semaphore
    fn create_semaphore(&self) -> Result<SemaphoreHandle>;

    /// Destroy a semaphore (must not be in use by the GPU)
    fn destroy_semaphore(&self, semaphore: SemaphoreHandle);

    /// Create a fence, optionally already signaled
    fn create_fence(&self, signaled: bool) -> Result<FenceHandle>;

    /// Block until the fence is signaled or the timeout expires
    ///
    /// A timeout is reported as an error: the render loop treats a GPU that
    /// never finishes as fatal.
    fn wait_for_fence(&self, fence: FenceHandle, timeout_ns: u64) -> Result<()>;

    /// Return the fence to the unsignaled state
    fn reset_fence(&self, fence: FenceHandle) -> Result<()>;

    /// Destroy a fence
    fn destroy_fence(&self, fence: FenceHandle);

    /// Create a primary command list with its own pool
    fn create_command_list(&self) -> Result<Box<dyn CommandList>>;

    /// Submit a recorded command list to the graphics queue
    fn submit(&self, commands: &dyn CommandList, info: &SubmitInfo) -> Result<()>;

    /// Block until the device has finished all submitted work
    fn wait_idle(&self) -> Result<()>;
}
