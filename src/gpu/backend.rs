//! [`SimulationBackend`] implemented on wgpu.
//!
//! Owns every GPU object the driver needs: the particle storage buffer, the
//! indirect args buffer, uniform buffers, the update pipeline and the
//! per-topology draw pipelines. Dispatch and draw are each encoded and
//! submitted on the shared queue, so the draw of a frame is ordered after
//! the dispatch of the same frame by submission order alone.

use std::collections::HashMap;
use std::sync::mpsc;

use bytemuck::{bytes_of, cast_slice, Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

use super::pipeline::{create_draw_pipeline, create_update_pipeline};
use super::{GpuContext, GpuError, KERNEL_RECORD_STRIDE_BYTES};
use crate::backend::{BoundsHint, FrameUniforms, MaterialParams, SimulationBackend};
use crate::dispatch::{DrawArgs, DRAW_ARGS_BYTES};
use crate::mesh::{PrimitiveKind, PrimitiveMesh};
use crate::particle::{ParticleRecord, RECORD_STRIDE_BYTES};

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct UpdateUniforms {
    time: f32,
    phi: f32,
    particle_count: u32,
    vertices_per_instance: u32,
    _pad: [u32; 4],
}

impl UpdateUniforms {
    fn new(uniforms: FrameUniforms) -> Self {
        Self {
            time: uniforms.time,
            phi: uniforms.phi,
            particle_count: uniforms.particle_count,
            vertices_per_instance: uniforms.vertices_per_instance,
            _pad: [0; 4],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct DrawUniforms {
    view_proj: [[f32; 4]; 4],
    mesh_scale: [f32; 3],
    particle_count: u32,
    vertices_per_instance: u32,
    _pad: [u32; 3],
}

impl DrawUniforms {
    fn new(view_proj: Mat4, params: MaterialParams) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            mesh_scale: params.mesh_scale.to_array(),
            particle_count: params.particle_count,
            vertices_per_instance: params.vertices_per_instance,
            _pad: [0; 3],
        }
    }
}

struct DrawPrimitive {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
}

struct GpuResources {
    particle_buffer: wgpu::Buffer,
    record_count: u32,
    args_buffer: wgpu::Buffer,
    update_uniform_buffer: wgpu::Buffer,
    draw_uniform_buffer: wgpu::Buffer,
    update_pipeline: wgpu::ComputePipeline,
    update_bind_group: wgpu::BindGroup,
    draw_pipeline_layout: wgpu::PipelineLayout,
    draw_bind_group: wgpu::BindGroup,
    draw_primitives: HashMap<PrimitiveKind, DrawPrimitive>,
}

/// wgpu-backed simulation and render backend.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target_format: wgpu::TextureFormat,
    view_proj: Mat4,
    target: Option<wgpu::TextureView>,
    resources: Option<GpuResources>,
}

impl WgpuBackend {
    /// Build a backend on an existing device and queue.
    ///
    /// Fails fast if the host record layout does not match the stride the
    /// kernels declare; a mismatch at the GPU boundary would otherwise be
    /// silent corruption.
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        target_format: wgpu::TextureFormat,
    ) -> Result<Self, GpuError> {
        if RECORD_STRIDE_BYTES != KERNEL_RECORD_STRIDE_BYTES {
            return Err(GpuError::StrideMismatch {
                host: RECORD_STRIDE_BYTES,
                kernel: KERNEL_RECORD_STRIDE_BYTES,
            });
        }
        Ok(Self {
            device,
            queue,
            target_format,
            view_proj: Mat4::IDENTITY,
            target: None,
            resources: None,
        })
    }

    /// Convenience constructor acquiring its own device.
    pub fn from_context(
        context: GpuContext,
        target_format: wgpu::TextureFormat,
    ) -> Result<Self, GpuError> {
        Self::new(context.device, context.queue, target_format)
    }

    /// Texture view the next draw renders into. The view is loaded, not
    /// cleared; clearing is the host's business.
    pub fn set_render_target(&mut self, view: wgpu::TextureView) {
        self.target = Some(view);
    }

    pub fn clear_render_target(&mut self) {
        self.target = None;
    }

    /// Camera matrix applied by the draw shader. Defaults to identity.
    pub fn set_view_proj(&mut self, view_proj: Mat4) {
        self.view_proj = view_proj;
    }

    /// Copy the particle buffer back to the CPU.
    ///
    /// Diagnostic only: this maps a staging buffer and blocks until the GPU
    /// drains, a full pipeline stall. Never call it from the frame loop.
    pub fn read_back_particles(&self) -> Result<Vec<ParticleRecord>, GpuError> {
        let resources = self.resources.as_ref().ok_or(GpuError::NotResident)?;
        let bytes = u64::from(resources.record_count) * RECORD_STRIDE_BYTES;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("particles.readback.staging"),
            size: bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("particles.readback.encoder"),
            });
        encoder.copy_buffer_to_buffer(&resources.particle_buffer, 0, &staging, 0, bytes);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|_| GpuError::ChannelClosed)?
            .map_err(|_| GpuError::MapFailed)?;

        let data = slice.get_mapped_range();
        let records: Vec<ParticleRecord> = cast_slice(&data).to_vec();
        drop(data);
        staging.unmap();
        Ok(records)
    }

    fn build_resources(&self, records: &[ParticleRecord]) -> GpuResources {
        let particle_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("particles.storage"),
                contents: cast_slice(records),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
            });

        let args_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("particles.indirect_args"),
            size: DRAW_ARGS_BYTES,
            usage: wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let update_uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("particles.update.uniforms"),
            size: std::mem::size_of::<UpdateUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let draw_uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("particles.draw.uniforms"),
            size: std::mem::size_of::<DrawUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let update_bind_group_layout =
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("particles.update.bgl"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Storage { read_only: false },
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                    ],
                });

        let update_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("particles.update.bg"),
            layout: &update_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: particle_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: update_uniform_buffer.as_entire_binding(),
                },
            ],
        });

        let update_pipeline = create_update_pipeline(&self.device, &update_bind_group_layout);

        let draw_bind_group_layout =
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("particles.draw.bgl"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::VERTEX,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Storage { read_only: true },
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::VERTEX,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                    ],
                });

        let draw_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("particles.draw.bg"),
            layout: &draw_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: particle_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: draw_uniform_buffer.as_entire_binding(),
                },
            ],
        });

        let draw_pipeline_layout =
            self.device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("particles.draw.layout"),
                    bind_group_layouts: &[&draw_bind_group_layout],
                    push_constant_ranges: &[],
                });

        GpuResources {
            particle_buffer,
            record_count: records.len() as u32,
            args_buffer,
            update_uniform_buffer,
            draw_uniform_buffer,
            update_pipeline,
            update_bind_group,
            draw_pipeline_layout,
            draw_bind_group,
            draw_primitives: HashMap::new(),
        }
    }

}

impl SimulationBackend for WgpuBackend {
    fn upload_particles(&mut self, records: &[ParticleRecord]) {
        self.resources = Some(self.build_resources(records));
        log::debug!(
            "uploaded {} particle records ({} bytes)",
            records.len(),
            records.len() as u64 * RECORD_STRIDE_BYTES,
        );
    }

    fn dispatch_update(&mut self, uniforms: FrameUniforms, group_count: u32) {
        let Some(resources) = self.resources.as_ref() else {
            log::trace!("dispatch skipped: no particle buffer resident");
            return;
        };
        if group_count == 0 {
            return;
        }

        self.queue.write_buffer(
            &resources.update_uniform_buffer,
            0,
            bytes_of(&UpdateUniforms::new(uniforms)),
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("particles.update.encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("particles.update.pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&resources.update_pipeline);
            pass.set_bind_group(0, &resources.update_bind_group, &[]);
            pass.dispatch_workgroups(group_count, 1, 1);
        }
        self.queue.submit(Some(encoder.finish()));
    }

    fn write_draw_args(&mut self, args: DrawArgs) {
        let Some(resources) = self.resources.as_ref() else {
            return;
        };
        self.queue
            .write_buffer(&resources.args_buffer, 0, bytes_of(&args));
    }

    fn draw_indirect(&mut self, mesh: &PrimitiveMesh, params: MaterialParams, bounds: BoundsHint) {
        let Some(resources) = self.resources.as_mut() else {
            log::trace!("draw skipped: no particle buffer resident");
            return;
        };
        let Some(target) = self.target.as_ref() else {
            log::trace!("draw skipped: no render target set");
            return;
        };

        // wgpu has no per-draw culling volume; the hint is advisory only.
        log::trace!(
            "indirect draw: {} instances, bounds center {:?} size {:?}",
            params.particle_count,
            bounds.center,
            bounds.size,
        );

        self.queue.write_buffer(
            &resources.draw_uniform_buffer,
            0,
            bytes_of(&DrawUniforms::new(self.view_proj, params)),
        );

        if !resources.draw_primitives.contains_key(&mesh.kind()) {
            let primitive = {
                let layout = &resources.draw_pipeline_layout;
                let pipeline =
                    create_draw_pipeline(&self.device, layout, self.target_format, mesh.kind());
                let vertex_buffer =
                    self.device
                        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                            label: Some("particles.template.vertices"),
                            contents: cast_slice(mesh.vertices()),
                            usage: wgpu::BufferUsages::VERTEX,
                        });
                let index_buffer =
                    self.device
                        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                            label: Some("particles.template.indices"),
                            contents: cast_slice(mesh.indices()),
                            usage: wgpu::BufferUsages::INDEX,
                        });
                DrawPrimitive { pipeline, vertex_buffer, index_buffer }
            };
            resources.draw_primitives.insert(mesh.kind(), primitive);
        }
        let primitive = &resources.draw_primitives[&mesh.kind()];

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("particles.draw.encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("particles.draw.pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&primitive.pipeline);
            pass.set_bind_group(0, &resources.draw_bind_group, &[]);
            pass.set_vertex_buffer(0, primitive.vertex_buffer.slice(..));
            pass.set_index_buffer(primitive.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed_indirect(&resources.args_buffer, 0);
        }
        self.queue.submit(Some(encoder.finish()));
    }

    fn release(&mut self) {
        if let Some(resources) = self.resources.take() {
            resources.particle_buffer.destroy();
            resources.args_buffer.destroy();
            resources.update_uniform_buffer.destroy();
            resources.draw_uniform_buffer.destroy();
            log::debug!("released particle GPU resources");
        }
        self.target = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_uniforms_are_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<UpdateUniforms>() % 16, 0);
    }

    #[test]
    fn draw_uniforms_match_wgsl_struct_size() {
        // mat4x4 (64) + vec3 + u32 (16) + u32 + pad (16)
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 96);
    }

    #[test]
    fn host_and_kernel_strides_agree() {
        assert_eq!(RECORD_STRIDE_BYTES, KERNEL_RECORD_STRIDE_BYTES);
    }
}
