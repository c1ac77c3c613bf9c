/// Backend and frame-loop configuration

use crate::graphics_device::{PresentMode, TextureFormat};

/// Which validation messages are displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    ErrorsOnly,
    ErrorsAndWarnings,
    All,
}

/// Where validation messages are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugOutput {
    Console,
    /// Append to the file at this path
    File(String),
    Both(String),
}

/// Validation message categories to display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugMessageFilter {
    pub show_general: bool,
    pub show_validation: bool,
    pub show_performance: bool,
}

impl Default for DebugMessageFilter {
    fn default() -> Self {
        Self {
            show_general: true,
            show_validation: true,
            show_performance: true,
        }
    }
}

/// Validation message counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

/// Backend creation configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Validation messages displayed
    pub debug_severity: DebugSeverity,
    /// Validation message destination
    pub debug_output: DebugOutput,
    /// Validation categories displayed
    pub debug_message_filter: DebugMessageFilter,
    /// Abort the process on a validation error (for debugger attachment)
    pub break_on_validation_error: bool,
    /// Panic on a validation error
    ///
    /// Invalid stage/access/layout combinations in a transition surface as
    /// validation errors, so this makes them fatal.
    pub panic_on_error: bool,
    /// Count validation messages
    pub enable_validation_stats: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Prism Application".to_string(),
            app_version: (1, 0, 0),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            debug_output: DebugOutput::Console,
            debug_message_filter: DebugMessageFilter::default(),
            break_on_validation_error: false,
            panic_on_error: cfg!(debug_assertions),
            enable_validation_stats: true,
        }
    }
}

/// Preferred presentation behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentModePreference {
    /// Mailbox if available, FIFO otherwise
    LowLatency,
    /// Immediate if available, then mailbox, FIFO otherwise
    Uncapped,
    /// Always FIFO
    Vsync,
}

impl PresentModePreference {
    /// Candidate modes in order of preference (FIFO is the implicit fallback)
    pub fn candidates(self) -> &'static [PresentMode] {
        match self {
            PresentModePreference::LowLatency => &[PresentMode::Mailbox],
            PresentModePreference::Uncapped => &[PresentMode::Immediate, PresentMode::Mailbox],
            PresentModePreference::Vsync => &[],
        }
    }
}

/// Tone curve applied by the tone-mapping pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneMapOperator {
    Reinhard,
    Aces,
}

/// Tone-mapping parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneMapSettings {
    pub operator: ToneMapOperator,
    pub exposure: f32,
}

impl Default for ToneMapSettings {
    fn default() -> Self {
        Self {
            operator: ToneMapOperator::Aces,
            exposure: 1.0,
        }
    }
}

/// Formats of the images owned by the render passes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassFormats {
    /// Depth-only; formats with a stencil aspect are rejected
    pub depth: TextureFormat,
    pub albedo: TextureFormat,
    pub normal: TextureFormat,
    pub hdr: TextureFormat,
    pub tone_mapped: TextureFormat,
}

impl Default for PassFormats {
    fn default() -> Self {
        Self {
            depth: TextureFormat::D32_SFLOAT,
            albedo: TextureFormat::R8G8B8A8_UNORM,
            normal: TextureFormat::R16G16B16A16_SFLOAT,
            hdr: TextureFormat::R16G16B16A16_SFLOAT,
            tone_mapped: TextureFormat::R8G8B8A8_UNORM,
        }
    }
}

/// Frame orchestrator configuration
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Number of frames the CPU may record ahead of the GPU (>= 2)
    pub frames_in_flight: usize,
    /// Timeout for swapchain image acquisition, in nanoseconds
    pub acquire_timeout_ns: u64,
    /// Timeout for the per-slot completion fence, in nanoseconds
    pub fence_timeout_ns: u64,
    /// Presentation mode preference
    pub present_mode: PresentModePreference,
    /// Clear color of the G-buffer albedo target
    pub clear_color: [f32; 4],
    /// Tone-mapping parameters
    pub tone_map: ToneMapSettings,
    /// Formats of pass-owned images
    pub formats: PassFormats,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            acquire_timeout_ns: u64::MAX,
            fence_timeout_ns: u64::MAX,
            present_mode: PresentModePreference::LowLatency,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            tone_map: ToneMapSettings::default(),
            formats: PassFormats::default(),
        }
    }
}
