use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

use crate::compile::{compile_fragment_shader, compile_vertex_shader};

/// Resources shared by every program built during the run: the uniform
/// bind-group layout and the fixed full-screen triangle vertex module.
pub(crate) struct PipelineLayouts {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub vertex_module: wgpu::ShaderModule,
}

impl PipelineLayouts {
    pub fn new(device: &wgpu::Device) -> Result<Self> {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("deck uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let vertex_module = compile_vertex_shader(device)?;

        Ok(Self {
            uniform_layout,
            vertex_module,
        })
    }
}

/// One linked shader program: the render pipeline plus the uniform bind
/// group resolved against that pipeline's own layout. Every reload builds a
/// fresh value from scratch; nothing is shared between attempts except the
/// layouts above.
pub(crate) struct ShaderProgram {
    pub pipeline: wgpu::RenderPipeline,
    pub uniform_bind_group: wgpu::BindGroup,
    pub shader_source: PathBuf,
}

impl ShaderProgram {
    pub fn new(
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        surface_format: wgpu::TextureFormat,
        uniform_buffer: &wgpu::Buffer,
        source_text: &str,
        shader_path: &Path,
    ) -> Result<Self> {
        // Module and pipeline creation are the link step; capture their
        // validation errors instead of letting them surface as uncaptured
        // device errors.
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let fragment_module = match compile_fragment_shader(device, source_text) {
            Ok(module) => module,
            Err(err) => {
                let _ = pollster::block_on(device.pop_error_scope());
                return Err(err);
            }
        };

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("deck pipeline layout"),
            bind_group_layouts: &[&layouts.uniform_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("deck pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &layouts.vertex_module,
                entry_point: Some("main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(anyhow!(
                "program link failed for {}:\n{error}",
                shader_path.display()
            ));
        }

        // Uniform locations are not stable across links; resolve the bind
        // group against the freshly linked pipeline.
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("deck uniform bind group"),
            layout: &pipeline.get_bind_group_layout(0),
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Ok(Self {
            pipeline,
            uniform_bind_group,
            shader_source: shader_path.to_path_buf(),
        })
    }
}
