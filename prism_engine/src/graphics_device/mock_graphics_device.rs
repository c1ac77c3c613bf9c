/// Mock graphics device for unit tests (no GPU required)
///
/// One `MockGraphicsDevice` implements every backend trait the core consumes
/// (device, allocator, surface, frame-buffer size). Every call is recorded so
/// tests can assert on barriers, submissions, presents and swapchain rebuilds.
/// Acquire and present results can be scripted.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::graphics_device::{
    AcquireOutcome, BufferDesc, BufferHandle, ColorSpace, CommandBufferHandle, CommandList,
    DescriptorSetHandle, Extent2D, FenceHandle, FramebufferSizeSource, GpuAllocator,
    GraphicsDevice, ImageAllocation, ImageBarrier, ImageBlit, ImageDesc, ImageHandle,
    ImageViewHandle, IndexType, PipelineHandle, PipelineLayoutHandle, PresentMode,
    PresentOutcome, Rect2D, RenderingInfo, SemaphoreHandle, ShaderStages, SubmitInfo,
    SurfaceBackend, SurfaceCapabilities, SurfaceFormat, SurfaceSupport, SwapchainDesc,
    TextureFormat, Viewport,
};

// ============================================================================
// Recorded data
// ============================================================================

/// One recorded command
#[derive(Debug, Clone, PartialEq)]
pub enum MockCommand {
    Begin,
    End,
    SetViewport(Viewport),
    SetScissor(Rect2D),
    Barrier(Vec<ImageBarrier>),
    BeginRendering(RenderingInfo),
    EndRendering,
    BindPipeline(PipelineHandle),
    BindDescriptorSet { set_index: u32, descriptor_set: DescriptorSetHandle },
    PushConstants { stages: ShaderStages, data: Vec<u8> },
    BindVertexBuffer(BufferHandle),
    BindIndexBuffer(BufferHandle, IndexType),
    Draw { vertex_count: u32 },
    DrawIndexed { index_count: u32 },
    Blit(ImageBlit),
}

/// A submitted command list
#[derive(Debug, Clone)]
pub struct MockSubmission {
    pub command_buffer: CommandBufferHandle,
    pub info: SubmitInfo,
    pub commands: Vec<MockCommand>,
}

impl MockSubmission {
    /// Barrier commands in recording order
    pub fn barriers(&self) -> Vec<&Vec<ImageBarrier>> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                MockCommand::Barrier(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    /// Image barriers flattened across all barrier commands
    pub fn image_barriers(&self) -> Vec<ImageBarrier> {
        self.barriers().into_iter().flatten().copied().collect()
    }
}

/// Surface-side events, in call order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    WaitIdle,
    SwapchainCreated { image_count: u32, extent: Extent2D },
    SwapchainDestroyed,
    ViewCreated(ImageViewHandle),
    ViewDestroyed(ImageViewHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceState {
    Signaled,
    Unsignaled,
    /// Submitted; signals on the next wait
    Pending,
}

struct MockState {
    next_handle: u64,
    semaphores: HashSet<SemaphoreHandle>,
    fences: HashMap<FenceHandle, FenceState>,
    fence_waits: usize,
    recordings: HashMap<CommandBufferHandle, Vec<MockCommand>>,
    submissions: Vec<MockSubmission>,
    images: HashMap<ImageHandle, ImageDesc>,
    image_views: HashSet<ImageViewHandle>,
    buffers: HashMap<BufferHandle, Vec<u8>>,
    support: SurfaceSupport,
    swapchain: Option<Vec<ImageHandle>>,
    swapchain_descs: Vec<SwapchainDesc>,
    surface_views: HashSet<ImageViewHandle>,
    surface_events: Vec<SurfaceEvent>,
    next_image: u32,
    acquire_script: VecDeque<AcquireOutcome>,
    present_script: VecDeque<PresentOutcome>,
    acquires: Vec<SemaphoreHandle>,
    presents: Vec<(SemaphoreHandle, u32)>,
    framebuffer_size: Extent2D,
    framebuffer_script: VecDeque<Extent2D>,
    device_waits: usize,
    fail_next_submit: Option<Error>,
}

impl MockState {
    fn handle(&mut self) -> u64 {
        let h = self.next_handle;
        self.next_handle += 1;
        h
    }

    /// A full device wait: every submitted fence fires
    fn wait_device_idle(&mut self) {
        self.device_waits += 1;
        for state in self.fences.values_mut() {
            if *state == FenceState::Pending {
                *state = FenceState::Signaled;
            }
        }
    }
}

/// Default surface: 2..=8 images, free extent, BGRA unorm + sRGB, FIFO + mailbox
pub fn default_surface_support() -> SurfaceSupport {
    SurfaceSupport {
        capabilities: SurfaceCapabilities {
            min_image_count: 2,
            max_image_count: 8,
            current_extent: None,
            min_image_extent: Extent2D::new(1, 1),
            max_image_extent: Extent2D::new(4096, 4096),
        },
        formats: vec![
            SurfaceFormat { format: TextureFormat::B8G8R8A8_UNORM, color_space: ColorSpace::SrgbNonLinear },
            SurfaceFormat { format: TextureFormat::B8G8R8A8_SRGB, color_space: ColorSpace::SrgbNonLinear },
        ],
        present_modes: vec![PresentMode::Fifo, PresentMode::Mailbox],
    }
}

// ============================================================================
// Mock device
// ============================================================================

/// Recording mock of every backend trait
pub struct MockGraphicsDevice {
    state: Arc<Mutex<MockState>>,
}

impl MockGraphicsDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(Mutex::new(MockState {
                next_handle: 1,
                semaphores: HashSet::new(),
                fences: HashMap::new(),
                fence_waits: 0,
                recordings: HashMap::new(),
                submissions: Vec::new(),
                images: HashMap::new(),
                image_views: HashSet::new(),
                buffers: HashMap::new(),
                support: default_surface_support(),
                swapchain: None,
                swapchain_descs: Vec::new(),
                surface_views: HashSet::new(),
                surface_events: Vec::new(),
                next_image: 0,
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                acquires: Vec::new(),
                presents: Vec::new(),
                framebuffer_size: Extent2D::new(800, 600),
                framebuffer_script: VecDeque::new(),
                device_waits: 0,
                fail_next_submit: None,
            })),
        })
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    // ===== Scripting =====

    pub fn set_surface_support(&self, support: SurfaceSupport) {
        self.lock().support = support;
    }

    pub fn set_framebuffer_size(&self, width: u32, height: u32) {
        self.lock().framebuffer_size = Extent2D::new(width, height);
    }

    /// Size reported by the next query only, before falling back to the set size
    pub fn push_framebuffer_size(&self, width: u32, height: u32) {
        self.lock().framebuffer_script.push_back(Extent2D::new(width, height));
    }

    pub fn push_acquire_outcome(&self, outcome: AcquireOutcome) {
        self.lock().acquire_script.push_back(outcome);
    }

    pub fn push_present_outcome(&self, outcome: PresentOutcome) {
        self.lock().present_script.push_back(outcome);
    }

    pub fn fail_next_submit(&self, error: Error) {
        self.lock().fail_next_submit = Some(error);
    }

    // ===== Inspection =====

    pub fn submissions(&self) -> Vec<MockSubmission> {
        self.lock().submissions.clone()
    }

    pub fn presents(&self) -> Vec<(SemaphoreHandle, u32)> {
        self.lock().presents.clone()
    }

    pub fn acquires(&self) -> Vec<SemaphoreHandle> {
        self.lock().acquires.clone()
    }

    pub fn swapchain_descs(&self) -> Vec<SwapchainDesc> {
        self.lock().swapchain_descs.clone()
    }

    pub fn surface_events(&self) -> Vec<SurfaceEvent> {
        self.lock().surface_events.clone()
    }

    pub fn clear_surface_events(&self) {
        self.lock().surface_events.clear();
    }

    pub fn swapchain_images(&self) -> Option<Vec<ImageHandle>> {
        self.lock().swapchain.clone()
    }

    pub fn live_surface_views(&self) -> usize {
        self.lock().surface_views.len()
    }

    pub fn live_images(&self) -> Vec<ImageDesc> {
        self.lock().images.values().cloned().collect()
    }

    pub fn live_buffers(&self) -> usize {
        self.lock().buffers.len()
    }

    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<Vec<u8>> {
        self.lock().buffers.get(&buffer).cloned()
    }

    pub fn live_semaphores(&self) -> usize {
        self.lock().semaphores.len()
    }

    pub fn live_fences(&self) -> usize {
        self.lock().fences.len()
    }

    pub fn fence_waits(&self) -> usize {
        self.lock().fence_waits
    }

    pub fn is_fence_signaled(&self, fence: FenceHandle) -> bool {
        self.lock().fences.get(&fence) == Some(&FenceState::Signaled)
    }

    pub fn device_waits(&self) -> usize {
        self.lock().device_waits
    }

    /// Commands recorded so far into a command list (not yet submitted)
    pub fn recording(&self, command_buffer: CommandBufferHandle) -> Vec<MockCommand> {
        self.lock().recordings.get(&command_buffer).cloned().unwrap_or_default()
    }

    /// A command list recording into this mock
    pub fn new_command_list(&self) -> MockCommandList {
        let handle = CommandBufferHandle(self.lock().handle());
        MockCommandList {
            handle,
            state: Arc::clone(&self.state),
        }
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_semaphore(&self) -> Result<SemaphoreHandle> {
        let mut s = self.lock();
        let handle = SemaphoreHandle(s.handle());
        s.semaphores.insert(handle);
        Ok(handle)
    }

    fn destroy_semaphore(&self, semaphore: SemaphoreHandle) {
        assert!(self.lock().semaphores.remove(&semaphore), "double destroy of {:?}", semaphore);
    }

    fn create_fence(&self, signaled: bool) -> Result<FenceHandle> {
        let mut s = self.lock();
        let handle = FenceHandle(s.handle());
        let state = if signaled { FenceState::Signaled } else { FenceState::Unsignaled };
        s.fences.insert(handle, state);
        Ok(handle)
    }

    fn wait_for_fence(&self, fence: FenceHandle, _timeout_ns: u64) -> Result<()> {
        let mut s = self.lock();
        s.fence_waits += 1;
        let state = s
            .fences
            .get_mut(&fence)
            .ok_or_else(|| Error::InvalidResource(format!("unknown {:?}", fence)))?;
        match *state {
            FenceState::Pending => {
                *state = FenceState::Signaled;
                Ok(())
            }
            FenceState::Signaled => Ok(()),
            // Nothing will ever signal it
            FenceState::Unsignaled => Err(Error::BackendError(format!("wait on idle unsignaled {:?} would deadlock", fence))),
        }
    }

    fn reset_fence(&self, fence: FenceHandle) -> Result<()> {
        let mut s = self.lock();
        let state = s
            .fences
            .get_mut(&fence)
            .ok_or_else(|| Error::InvalidResource(format!("unknown {:?}", fence)))?;
        match *state {
            FenceState::Pending => Err(Error::BackendError(format!("reset of in-flight {:?}", fence))),
            FenceState::Signaled | FenceState::Unsignaled => {
                *state = FenceState::Unsignaled;
                Ok(())
            }
        }
    }

    fn destroy_fence(&self, fence: FenceHandle) {
        assert!(self.lock().fences.remove(&fence).is_some(), "double destroy of {:?}", fence);
    }

    fn create_command_list(&self) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(self.new_command_list()))
    }

    fn submit(&self, commands: &dyn CommandList, info: &SubmitInfo) -> Result<()> {
        let mut s = self.lock();
        if let Some(err) = s.fail_next_submit.take() {
            return Err(err);
        }
        if !s.semaphores.contains(&info.wait_semaphore) || !s.semaphores.contains(&info.signal_semaphore) {
            return Err(Error::InvalidResource("submit with unknown semaphore".to_string()));
        }
        let fence = s
            .fences
            .get_mut(&info.signal_fence)
            .ok_or_else(|| Error::InvalidResource("submit with unknown fence".to_string()))?;
        match *fence {
            FenceState::Unsignaled => *fence = FenceState::Pending,
            other => {
                return Err(Error::BackendError(format!("submit with fence in state {:?}", other)))
            }
        }
        let recorded = s.recordings.get(&commands.handle()).cloned().unwrap_or_default();
        if recorded.last() != Some(&MockCommand::End) {
            return Err(Error::BackendError("submit of a command list that was not ended".to_string()));
        }
        s.submissions.push(MockSubmission {
            command_buffer: commands.handle(),
            info: *info,
            commands: recorded,
        });
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        self.lock().wait_device_idle();
        Ok(())
    }
}

impl GpuAllocator for MockGraphicsDevice {
    fn create_image(&self, desc: &ImageDesc) -> Result<ImageAllocation> {
        if desc.extent.is_zero_area() {
            return Err(Error::InvalidResource(format!("zero-sized image '{}'", desc.name)));
        }
        let mut s = self.lock();
        let image = ImageHandle(s.handle());
        let view = ImageViewHandle(s.handle());
        s.images.insert(image, desc.clone());
        s.image_views.insert(view);
        Ok(ImageAllocation { image, view })
    }

    fn destroy_image(&self, allocation: ImageAllocation) {
        let mut s = self.lock();
        assert!(s.image_views.remove(&allocation.view), "double destroy of {:?}", allocation.view);
        assert!(s.images.remove(&allocation.image).is_some(), "double destroy of {:?}", allocation.image);
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<BufferHandle> {
        let mut s = self.lock();
        let buffer = BufferHandle(s.handle());
        s.buffers.insert(buffer, vec![0; desc.size as usize]);
        Ok(buffer)
    }

    fn write_buffer(&self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        let mut s = self.lock();
        let contents = s
            .buffers
            .get_mut(&buffer)
            .ok_or_else(|| Error::InvalidResource(format!("unknown {:?}", buffer)))?;
        let start = offset as usize;
        let end = start + data.len();
        if end > contents.len() {
            return Err(Error::InvalidResource(format!("write past end of {:?}", buffer)));
        }
        contents[start..end].copy_from_slice(data);
        Ok(())
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        assert!(self.lock().buffers.remove(&buffer).is_some(), "double destroy of {:?}", buffer);
    }
}

impl SurfaceBackend for MockGraphicsDevice {
    fn surface_support(&self) -> Result<SurfaceSupport> {
        Ok(self.lock().support.clone())
    }

    fn create_swapchain(&self, desc: &SwapchainDesc) -> Result<Vec<ImageHandle>> {
        let mut s = self.lock();
        if s.swapchain.is_some() {
            return Err(Error::BackendError("swapchain already exists".to_string()));
        }
        let images: Vec<ImageHandle> = (0..desc.image_count).map(|_| ImageHandle(s.handle())).collect();
        s.swapchain = Some(images.clone());
        s.swapchain_descs.push(*desc);
        s.next_image = 0;
        s.surface_events.push(SurfaceEvent::SwapchainCreated {
            image_count: desc.image_count,
            extent: desc.extent,
        });
        Ok(images)
    }

    fn destroy_swapchain(&self) {
        let mut s = self.lock();
        assert!(s.swapchain.take().is_some(), "destroy without swapchain");
        s.surface_events.push(SurfaceEvent::SwapchainDestroyed);
    }

    fn create_image_view(&self, image: ImageHandle, _format: TextureFormat) -> Result<ImageViewHandle> {
        let mut s = self.lock();
        let owned = s.swapchain.as_ref().map_or(false, |images| images.contains(&image));
        if !owned {
            return Err(Error::InvalidResource(format!("{:?} is not a swapchain image", image)));
        }
        let view = ImageViewHandle(s.handle());
        s.surface_views.insert(view);
        s.surface_events.push(SurfaceEvent::ViewCreated(view));
        Ok(view)
    }

    fn destroy_image_view(&self, view: ImageViewHandle) {
        let mut s = self.lock();
        assert!(s.surface_views.remove(&view), "double destroy of {:?}", view);
        s.surface_events.push(SurfaceEvent::ViewDestroyed(view));
    }

    fn acquire_next_image(&self, _timeout_ns: u64, signal: SemaphoreHandle) -> Result<AcquireOutcome> {
        let mut s = self.lock();
        let count = match &s.swapchain {
            Some(images) => images.len() as u32,
            None => return Err(Error::BackendError("acquire without swapchain".to_string())),
        };
        s.acquires.push(signal);
        let outcome = match s.acquire_script.pop_front() {
            Some(outcome) => outcome,
            None => {
                let index = s.next_image;
                s.next_image = (s.next_image + 1) % count;
                AcquireOutcome::Acquired { index, suboptimal: false }
            }
        };
        Ok(outcome)
    }

    fn present(&self, wait: SemaphoreHandle, image_index: u32) -> Result<PresentOutcome> {
        let mut s = self.lock();
        s.presents.push((wait, image_index));
        Ok(s.present_script.pop_front().unwrap_or(PresentOutcome::Presented))
    }

    fn wait_idle(&self) -> Result<()> {
        let mut s = self.lock();
        s.surface_events.push(SurfaceEvent::WaitIdle);
        s.wait_device_idle();
        Ok(())
    }
}

impl FramebufferSizeSource for MockGraphicsDevice {
    fn framebuffer_size(&self) -> Extent2D {
        let mut s = self.lock();
        match s.framebuffer_script.pop_front() {
            Some(extent) => extent,
            None => s.framebuffer_size,
        }
    }
}

// ============================================================================
// Mock command list
// ============================================================================

/// Command list recording into the shared mock state
pub struct MockCommandList {
    handle: CommandBufferHandle,
    state: Arc<Mutex<MockState>>,
}

impl MockCommandList {
    fn push(&mut self, command: MockCommand) {
        self.state
            .lock()
            .unwrap()
            .recordings
            .entry(self.handle)
            .or_default()
            .push(command);
    }
}

impl CommandList for MockCommandList {
    fn handle(&self) -> CommandBufferHandle {
        self.handle
    }

    fn begin(&mut self) -> Result<()> {
        self.state.lock().unwrap().recordings.insert(self.handle, vec![MockCommand::Begin]);
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.push(MockCommand::End);
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.push(MockCommand::SetViewport(viewport));
    }

    fn set_scissor(&mut self, scissor: Rect2D) {
        self.push(MockCommand::SetScissor(scissor));
    }

    fn pipeline_barrier(&mut self, barriers: &[ImageBarrier]) {
        self.push(MockCommand::Barrier(barriers.to_vec()));
    }

    fn begin_rendering(&mut self, info: &RenderingInfo) {
        self.push(MockCommand::BeginRendering(info.clone()));
    }

    fn end_rendering(&mut self) {
        self.push(MockCommand::EndRendering);
    }

    fn bind_pipeline(&mut self, pipeline: PipelineHandle) {
        self.push(MockCommand::BindPipeline(pipeline));
    }

    fn bind_descriptor_set(
        &mut self,
        _layout: PipelineLayoutHandle,
        set_index: u32,
        descriptor_set: DescriptorSetHandle,
    ) {
        self.push(MockCommand::BindDescriptorSet { set_index, descriptor_set });
    }

    fn push_constants(&mut self, _layout: PipelineLayoutHandle, stages: ShaderStages, _offset: u32, data: &[u8]) {
        self.push(MockCommand::PushConstants { stages, data: data.to_vec() });
    }

    fn bind_vertex_buffer(&mut self, buffer: BufferHandle, _offset: u64) {
        self.push(MockCommand::BindVertexBuffer(buffer));
    }

    fn bind_index_buffer(&mut self, buffer: BufferHandle, _offset: u64, index_type: IndexType) {
        self.push(MockCommand::BindIndexBuffer(buffer, index_type));
    }

    fn draw(&mut self, vertex_count: u32, _first_vertex: u32) {
        self.push(MockCommand::Draw { vertex_count });
    }

    fn draw_indexed(&mut self, index_count: u32, _first_index: u32, _vertex_offset: i32) {
        self.push(MockCommand::DrawIndexed { index_count });
    }

    fn blit_image(&mut self, blit: &ImageBlit) {
        self.push(MockCommand::Blit(*blit));
    }
}
