use std::time::Instant;

use bytemuck::{Pod, Zeroable};

/// CPU mirror of the `DeckParams` uniform block declared by the injected
/// shader header. Field order matches std140: the time scalar packs into
/// the tail of the resolution vec3, so the two layouts agree byte for byte.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub(crate) struct DeckUniforms {
    resolution: [f32; 3],
    time: f32,
    mouse: [f32; 4],
    frame: i32,
    _padding: [f32; 3],
}

unsafe impl Zeroable for DeckUniforms {}
unsafe impl Pod for DeckUniforms {}

impl DeckUniforms {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            // z is a constant depth hint, never varied.
            resolution: [width as f32, height as f32, 1.0],
            time: 0.0,
            mouse: [0.0; 4],
            frame: 0,
            _padding: [0.0; 3],
        }
    }

    pub fn set_resolution(&mut self, width: f32, height: f32) {
        self.resolution[0] = width;
        self.resolution[1] = height;
    }

    pub fn set_time(&mut self, seconds: f32) {
        self.time = seconds;
    }

    pub fn set_frame(&mut self, frame: i32) {
        self.frame = frame;
    }

    pub fn set_mouse(&mut self, mouse: [f32; 4]) {
        self.mouse = mouse;
    }
}

/// Monotonic frame timing: elapsed seconds since startup plus a counter
/// that advances exactly once per rendered frame and never rewinds.
pub(crate) struct FrameClock {
    origin: Instant,
    frame: u32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            frame: 0,
        }
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.origin.elapsed().as_secs_f32()
    }

    pub fn frame_index(&self) -> i32 {
        self.frame.min(i32::MAX as u32) as i32
    }

    pub fn advance(&mut self) {
        self.frame = self.frame.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_block_matches_std140_size() {
        assert_eq!(std::mem::size_of::<DeckUniforms>(), 48);
        assert_eq!(std::mem::align_of::<DeckUniforms>(), 16);
    }

    #[test]
    fn frame_clock_advances_monotonically() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.frame_index(), 0);
        clock.advance();
        clock.advance();
        assert_eq!(clock.frame_index(), 2);
    }

    #[test]
    fn resolution_keeps_its_constant_z() {
        let mut uniforms = DeckUniforms::new(640, 480);
        uniforms.set_resolution(1280.0, 720.0);
        assert_eq!(uniforms.resolution, [1280.0, 720.0, 1.0]);
    }
}
