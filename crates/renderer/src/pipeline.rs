//! GPU resources for the demonstration payloads.

use anyhow::{Context as AnyhowContext, Result};
use bytemuck::{Pod, Zeroable};
use wgpu::naga::ShaderStage;
use wgpu::util::DeviceExt;

use crate::compile::{
    compile_shader, fullscreen_vertex_source, triangle_fragment_source, triangle_vertex_source,
    wrap_fragment_payload,
};
use crate::context::{SurfaceContext, TARGET_FORMAT};
use crate::math::{self, Mat4};
use crate::types::RenderPayload;

/// CPU mirror of the `FrameParams` uniform block (std140).
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub(crate) struct PayloadUniforms {
    pub mvp: Mat4,
    /// x: elapsed seconds, y: frame delta, z: frame index, w: aspect ratio.
    pub clock: [f32; 4],
    /// x: width, y: height in physical pixels.
    pub resolution: [f32; 4],
}

unsafe impl Zeroable for PayloadUniforms {}
unsafe impl Pod for PayloadUniforms {}

impl PayloadUniforms {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            mvp: math::IDENTITY,
            clock: [0.0; 4],
            resolution: [width as f32, height as f32, 0.0, 0.0],
        }
    }

    pub fn advance(&mut self, mvp: Mat4, seconds: f32, delta: f32, frame: u32, width: u32, height: u32) {
        let aspect = width as f32 / height.max(1) as f32;
        self.mvp = mvp;
        self.clock = [seconds, delta, frame as f32, aspect];
        self.resolution[0] = width as f32;
        self.resolution[1] = height as f32;
    }
}

/// Clip-space vertex for the triangle payload.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Vertex {
    position: [f32; 2],
    color: [f32; 3],
}

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x3];

/// The original demonstration geometry: one triangle, one color per corner.
const TRIANGLE: [Vertex; 3] = [
    Vertex {
        position: [-0.6, -0.4],
        color: [1.0, 0.0, 0.0],
    },
    Vertex {
        position: [0.6, -0.4],
        color: [0.0, 1.0, 0.0],
    },
    Vertex {
        position: [0.0, 0.6],
        color: [0.0, 0.0, 1.0],
    },
];

/// Compiled pipeline plus the buffers and bind group a payload draws with.
pub(crate) struct PayloadPipeline {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    vertex_buffer: Option<wgpu::Buffer>,
    vertex_count: u32,
}

impl PayloadPipeline {
    /// Builds every static GPU resource for `payload`. Shader compilation
    /// failures surface as errors so the worker can stop without rendering.
    pub fn new(ctx: &SurfaceContext, payload: &RenderPayload) -> Result<Self> {
        let device = ctx.device();

        let (vertex_source, fragment_source, vertex_label, fragment_label) = match payload {
            RenderPayload::Triangle => (
                triangle_vertex_source(),
                triangle_fragment_source(),
                "triangle vertex",
                "triangle fragment",
            ),
            RenderPayload::Fragment { source } => (
                fullscreen_vertex_source(),
                wrap_fragment_payload(source),
                "fullscreen vertex",
                "payload fragment",
            ),
        };

        let vertex_module = compile_shader(device, vertex_label, vertex_source, ShaderStage::Vertex)
            .context("failed to build payload vertex shader")?;
        let fragment_module =
            compile_shader(device, fragment_label, fragment_source, ShaderStage::Fragment)
                .context("failed to build payload fragment shader")?;

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform layout"),
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

        let (width, height) = ctx.size();
        let uniforms = PayloadUniforms::new(width, height);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("uniform buffer"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform bind group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let vertex_buffer = match payload {
            RenderPayload::Triangle => Some(device.create_buffer_init(
                &wgpu::util::BufferInitDescriptor {
                    label: Some("triangle vertices"),
                    contents: bytemuck::cast_slice(&TRIANGLE),
                    usage: wgpu::BufferUsages::VERTEX,
                },
            )),
            RenderPayload::Fragment { .. } => None,
        };

        let vertex_layouts = [wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &VERTEX_ATTRIBUTES,
        }];
        let buffers: &[wgpu::VertexBufferLayout] = if vertex_buffer.is_some() {
            &vertex_layouts
        } else {
            &[]
        };

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("payload pipeline layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("payload pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("main"),
                buffers,
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
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            vertex_buffer,
            vertex_count: 3,
        })
    }

    pub fn write_uniforms(&self, queue: &wgpu::Queue, uniforms: &PayloadUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    /// Records the payload's render pass against `view`, clearing to black.
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("payload pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
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
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        if let Some(buffer) = &self.vertex_buffer {
            render_pass.set_vertex_buffer(0, buffer.slice(..));
        }
        render_pass.draw(0..self.vertex_count, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    #[test]
    fn payload_uniforms_follow_std140_layout() {
        let uniforms = PayloadUniforms::new(1920, 1080);
        let base = &uniforms as *const _ as usize;

        assert_eq!(align_of::<PayloadUniforms>(), 16);
        assert_eq!(size_of::<PayloadUniforms>(), 96);
        assert_eq!(&uniforms.mvp as *const _ as usize - base, 0);
        assert_eq!(&uniforms.clock as *const _ as usize - base, 64);
        assert_eq!(&uniforms.resolution as *const _ as usize - base, 80);
    }

    #[test]
    fn advance_tracks_clock_and_aspect() {
        let mut uniforms = PayloadUniforms::new(200, 100);
        uniforms.advance(math::IDENTITY, 1.5, 0.016, 90, 200, 100);
        assert_eq!(uniforms.clock[0], 1.5);
        assert_eq!(uniforms.clock[2], 90.0);
        assert_eq!(uniforms.clock[3], 2.0);
        assert_eq!(uniforms.resolution[0], 200.0);
    }

    #[test]
    fn triangle_vertices_match_the_buffer_stride() {
        assert_eq!(size_of::<Vertex>(), 20);
        assert_eq!(TRIANGLE.len(), 3);
    }
}
