use std::path::Path;

use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use shaderset::ShaderSource;
use winit::dpi::PhysicalSize;

use super::context::GpuContext;
use super::pipeline::{PipelineLayouts, ShaderProgram};
use super::uniforms::{DeckUniforms, FrameClock};

/// GPU half of the hot-reload controller.
///
/// Exactly one [`ShaderProgram`] is active at a time. It is owned here and
/// replaced only by [`install_program`](Self::install_program) succeeding;
/// a failed build leaves the active program and its bind group untouched,
/// so a broken edit never blanks the screen.
pub(crate) struct GpuState {
    context: GpuContext,
    layouts: PipelineLayouts,
    uniform_buffer: wgpu::Buffer,
    uniforms: DeckUniforms,
    clock: FrameClock,
    program: ShaderProgram,
}

impl GpuState {
    /// Builds the context and the very first program. There is no previous
    /// program to fall back to here, so any failure propagates and ends
    /// startup.
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        entry: &ShaderSource,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, initial_size)?;
        let layouts = PipelineLayouts::new(&context.device)?;

        let uniform_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("deck uniform buffer"),
            size: std::mem::size_of::<DeckUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let program = ShaderProgram::new(
            &context.device,
            &layouts,
            context.surface_format,
            &uniform_buffer,
            &entry.text,
            &entry.path,
        )?;

        let uniforms = DeckUniforms::new(context.size.width, context.size.height);

        Ok(Self {
            context,
            layouts,
            uniform_buffer,
            uniforms,
            clock: FrameClock::new(),
            program,
        })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub(crate) fn active_shader(&self) -> &Path {
        &self.program.shader_source
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.context.resize(new_size);
        self.uniforms
            .set_resolution(new_size.width as f32, new_size.height as f32);
    }

    /// The swap-or-keep transition shared by every reload trigger.
    ///
    /// The replacement is built in full before anything changes; only a
    /// successful build replaces the active program, and the previous one is
    /// dropped after the swap. On failure the error carries the compiler's
    /// diagnostic and the active program keeps rendering.
    pub(crate) fn install_program(&mut self, source: &ShaderSource) -> Result<()> {
        let next = ShaderProgram::new(
            &self.context.device,
            &self.layouts,
            self.context.surface_format,
            &self.uniform_buffer,
            &source.text,
            &source.path,
        )?;
        let previous = std::mem::replace(&mut self.program, next);
        drop(previous);
        Ok(())
    }

    /// Renders one frame with the active program and advances the frame
    /// counter by exactly one.
    pub(crate) fn render(&mut self, pointer: [f32; 4]) -> Result<(), wgpu::SurfaceError> {
        let frame = self.context.surface.get_current_texture()?;

        self.uniforms.set_time(self.clock.elapsed_seconds());
        self.uniforms.set_frame(self.clock.frame_index());
        self.uniforms.set_mouse(pointer);
        self.context.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&self.uniforms),
        );

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("deck render encoder"),
                });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("deck render pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&self.program.pipeline);
            render_pass.set_bind_group(0, &self.program.uniform_bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        self.clock.advance();
        Ok(())
    }
}
