use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use shaderset::{ShaderCycle, ShaderSource};
use tracing::{error, info, warn};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowBuilder;

use crate::gpu::GpuState;
use crate::RendererConfig;

/// Runs the window loop until quit. Owns every reload trigger: bracket-key
/// switching, the forced-reload key, and the once-per-frame modification
/// poll. All post-startup failures are absorbed here as diagnostics.
pub(crate) fn run(config: RendererConfig, mut shaders: ShaderCycle) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to initialize event loop")?;
    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title("shaderdeck")
        .with_inner_size(window_size)
        .build(&event_loop)
        .context("failed to create window")?;
    let window = Arc::new(window);

    // First load has no fallback; any failure here ends startup.
    let entry = ShaderSource::load(shaders.selected())
        .with_context(|| format!("failed to load shader {}", shaders.selected().display()))?;
    let mut gpu = GpuState::new(window.as_ref(), window.inner_size(), &entry)
        .context("failed to build initial shader program")?;

    info!(shader = %gpu.active_shader().display(), candidates = shaders.len(), "loaded shader");
    info!("controls: [ / ] switch shader, R reload, Esc quit");

    let mut pointer = PointerState::default();
    let mut limiter = config.target_fps.map(FrameLimiter::new);

    event_loop
        .run(move |event, elwt| {
            match event {
                Event::WindowEvent { window_id, event } if window_id == window.id() => {
                    match event {
                        WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                            elwt.exit();
                        }
                        WindowEvent::KeyboardInput { event, .. } => {
                            // Edge-triggered with key repeat suppressed, so
                            // holding R does not retrigger builds.
                            if event.state != ElementState::Pressed || event.repeat {
                                return;
                            }
                            match event.logical_key.as_ref() {
                                Key::Named(NamedKey::Escape) => elwt.exit(),
                                Key::Character("[") => {
                                    if shaders.select_previous() {
                                        attempt_reload(&mut gpu, shaders.selected(), "switch");
                                    }
                                }
                                Key::Character("]") => {
                                    if shaders.select_next() {
                                        attempt_reload(&mut gpu, shaders.selected(), "switch");
                                    }
                                }
                                Key::Character("r") | Key::Character("R") => {
                                    attempt_reload(&mut gpu, shaders.selected(), "forced");
                                }
                                _ => {}
                            }
                        }
                        WindowEvent::CursorMoved { position, .. } => {
                            pointer.handle_cursor_moved(position);
                        }
                        WindowEvent::MouseInput { state, button, .. } => {
                            if button == MouseButton::Left {
                                pointer.handle_button(state);
                            }
                        }
                        WindowEvent::Resized(new_size) => {
                            gpu.resize(new_size);
                        }
                        WindowEvent::RedrawRequested => {
                            if shaders.poll_modified() {
                                attempt_reload(&mut gpu, shaders.selected(), "file changed");
                            }

                            let height = gpu.size().height.max(1) as f32;
                            match gpu.render(pointer.as_uniform(height)) {
                                Ok(()) => {
                                    if let Some(limiter) = limiter.as_mut() {
                                        limiter.mark_rendered(Instant::now());
                                    }
                                }
                                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                    gpu.resize(gpu.size());
                                }
                                Err(wgpu::SurfaceError::OutOfMemory) => {
                                    error!("surface out of memory; exiting");
                                    elwt.exit();
                                }
                                Err(err) => {
                                    warn!("surface error: {err:?}; retrying next frame");
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Event::AboutToWait => match limiter.as_ref() {
                    None => {
                        window.request_redraw();
                        elwt.set_control_flow(ControlFlow::Poll);
                    }
                    Some(limiter) => {
                        let now = Instant::now();
                        if limiter.ready(now) {
                            window.request_redraw();
                            elwt.set_control_flow(ControlFlow::Poll);
                        } else {
                            elwt.set_control_flow(ControlFlow::WaitUntil(limiter.deadline()));
                        }
                    }
                },
                _ => {}
            }
        })
        .context("event loop terminated abnormally")
}

/// Shared by all three reload triggers. Every failure below the fatal tier
/// lands here: the previous program keeps rendering and the diagnostic goes
/// to the log.
fn attempt_reload(gpu: &mut GpuState, path: &Path, trigger: &'static str) {
    let source = match ShaderSource::load(path) {
        Ok(source) => source,
        Err(err) => {
            error!(shader = %path.display(), trigger, "keeping previous program: {err}");
            return;
        }
    };

    match gpu.install_program(&source) {
        Ok(()) => info!(shader = %path.display(), trigger, "hot reload applied"),
        Err(err) => {
            error!(shader = %path.display(), trigger, "keeping previous program:\n{err:#}");
        }
    }
}

/// Cursor and button state fed into the pointer uniform each frame.
#[derive(Default)]
struct PointerState {
    position: Option<PhysicalPosition<f64>>,
    pressed_anchor: Option<PhysicalPosition<f64>>,
    is_pressed: bool,
}

impl PointerState {
    fn handle_cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        self.position = Some(position);
        if self.is_pressed {
            self.pressed_anchor.get_or_insert(position);
        }
    }

    fn handle_button(&mut self, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.is_pressed = true;
                if let Some(pos) = self.position {
                    self.pressed_anchor = Some(pos);
                }
            }
            ElementState::Released => {
                self.is_pressed = false;
                self.pressed_anchor = None;
            }
        }
    }

    /// Packs (x, y, press-x, press-y) with Y flipped to the bottom-left
    /// convention. The anchor components are zero while the button is up.
    fn as_uniform(&self, height: f32) -> [f32; 4] {
        let mut data = [0.0; 4];

        if let Some(pos) = self.position {
            data[0] = pos.x as f32;
            data[1] = height - pos.y as f32;
        }

        if let Some(anchor) = self.pressed_anchor {
            data[2] = anchor.x as f32;
            data[3] = height - anchor.y as f32;
        }

        data
    }
}

/// Optional FPS cap driving the control flow between redraws.
struct FrameLimiter {
    interval: Duration,
    next_deadline: Instant,
}

impl FrameLimiter {
    fn new(target_fps: f32) -> Self {
        Self {
            interval: Duration::from_secs_f32(1.0 / target_fps.max(0.1)),
            next_deadline: Instant::now(),
        }
    }

    fn ready(&self, now: Instant) -> bool {
        now >= self.next_deadline
    }

    fn deadline(&self) -> Instant {
        self.next_deadline
    }

    fn mark_rendered(&mut self, now: Instant) {
        self.next_deadline = now + self.interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_uniform_flips_y() {
        let mut pointer = PointerState::default();
        pointer.handle_cursor_moved(PhysicalPosition::new(10.0, 30.0));
        assert_eq!(pointer.as_uniform(100.0), [10.0, 70.0, 0.0, 0.0]);
    }

    #[test]
    fn pointer_anchor_tracks_press_and_clears_on_release() {
        let mut pointer = PointerState::default();
        pointer.handle_cursor_moved(PhysicalPosition::new(5.0, 20.0));
        pointer.handle_button(ElementState::Pressed);
        pointer.handle_cursor_moved(PhysicalPosition::new(40.0, 60.0));

        let uniform = pointer.as_uniform(100.0);
        assert_eq!(uniform, [40.0, 40.0, 5.0, 80.0]);

        pointer.handle_button(ElementState::Released);
        assert_eq!(pointer.as_uniform(100.0), [40.0, 40.0, 0.0, 0.0]);
    }

    #[test]
    fn limiter_waits_out_the_interval() {
        let mut limiter = FrameLimiter::new(10.0);
        let start = Instant::now();
        assert!(limiter.ready(start));
        limiter.mark_rendered(start);
        assert!(!limiter.ready(start + Duration::from_millis(50)));
        assert!(limiter.ready(start + Duration::from_millis(100)));
    }
}
