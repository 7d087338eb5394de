//! Renderer crate for shaderdeck.
//!
//! Glues the preview window, the `wgpu` pipeline, and the shader wrapping
//! together around one guarantee: a broken edit on disk never blanks the
//! screen. The overall flow is:
//!
//! ```text
//!   CLI / shaderdeck
//!          │ RendererConfig + ShaderCycle
//!          ▼
//!   Renderer::run ──▶ winit event loop ──▶ render frame
//!          ▲               │
//!          │               ├─ poll mtime / keys ─▶ attempt_reload()
//!          │               │        build new program; swap on success,
//!          │               │        keep the previous one on failure
//!          │               └─▶ DeckUniforms ─▶ GPU uniform buffer
//! ```
//!
//! `GpuState` owns all GPU resources (surface, device, the single active
//! program); `window::run` owns the reload triggers; `compile` turns raw
//! user fragments into compilable GLSL by injecting the uniform header and
//! the `mainImage` entry wrapper when they are missing.

mod compile;
mod gpu;
mod window;

use anyhow::Result;
use shaderset::ShaderCycle;

/// Immutable configuration passed to the renderer at start-up.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Optional FPS cap; `None` renders every vsync tick.
    pub target_fps: Option<f32>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (960, 540),
            target_fps: None,
        }
    }
}

/// High-level entry point owning the configuration and the shader set.
pub struct Renderer {
    config: RendererConfig,
    shaders: ShaderCycle,
}

impl Renderer {
    pub fn new(config: RendererConfig, shaders: ShaderCycle) -> Self {
        Self { config, shaders }
    }

    /// Opens the window and drives the event loop until quit.
    ///
    /// Returns an error only for unrecoverable startup failures (window or
    /// GPU init, the very first shader build); everything after that is
    /// absorbed by the hot-reload fallback.
    pub fn run(self) -> Result<()> {
        window::run(self.config, self.shaders)
    }
}
