//! GPU-facing half of the renderer:
//!
//! - `context` owns the wgpu instance/surface/device and reconfigures the
//!   swapchain on resize.
//! - `uniforms` mirrors the injected `DeckParams` block and tracks frame
//!   timing.
//! - `pipeline` turns validated shader source into a render pipeline plus
//!   the bind group resolved against it.
//! - `state` holds the single active program and performs the
//!   swap-or-keep reload transition.

mod context;
mod pipeline;
mod state;
mod uniforms;

pub(crate) use state::GpuState;
