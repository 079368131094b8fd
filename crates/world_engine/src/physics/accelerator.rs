//! Compute-kernel collision backend
//!
//! Both borders are packed as `(first_point, dimension, movement)` into one
//! storage buffer. A WGSL kernel runs one invocation per step and keeps the
//! smallest overlapping step with `atomicMin`; the host reads that index back
//! and converts it exactly like the CPU backends do.
//!
//! Device, queue, pipeline and buffers are shared by every caller and sit
//! behind one mutex. A call holds it from upload to read-back.

use std::sync::Mutex;

use crate::foundation::math::previous_power_of_two;
use crate::foundation::sync::lock;
use crate::physics::border::PACKED_LEN;
use crate::physics::{Border, CollisionError};

/// Invocations per workgroup, must match `@workgroup_size` in the kernel
const WORKGROUP_SIZE: u32 = 64;

const SHADER: &str = r"
@group(0) @binding(0) var<storage, read> borders: array<f32, 18>;
@group(0) @binding(1) var<uniform> params: vec4<u32>;
@group(0) @binding(2) var<storage, read_write> first_hit: atomic<u32>;

fn overlaps(a: f32, a_ext: f32, b: f32, b_ext: f32) -> bool {
    return a <= b + b_ext && b <= a + a_ext;
}

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let granularity = params.x;
    let step = id.x + 1u;
    if (step > granularity) {
        return;
    }

    let part = f32(step) / f32(granularity);
    var hit = true;
    for (var axis = 0u; axis < 3u; axis = axis + 1u) {
        let a = borders[axis] + borders[6u + axis] * part;
        let b = borders[9u + axis] + borders[15u + axis] * part;
        hit = hit && overlaps(a, borders[3u + axis], b, borders[12u + axis]);
    }

    if (hit) {
        atomicMin(&first_hit, step);
    }
}
";

struct DeviceState {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
    borders_buffer: wgpu::Buffer,
    params_buffer: wgpu::Buffer,
    result_buffer: wgpu::Buffer,
    staging_buffer: wgpu::Buffer,
}

/// Collision search dispatched to a compute device
pub struct AcceleratorEngine {
    granularity: u32,
    adapter_name: String,
    state: Mutex<DeviceState>,
}

impl AcceleratorEngine {
    /// Acquire a device and build the kernel
    ///
    /// Fails with [`CollisionError::AcceleratorInit`] when no adapter or
    /// device is available.
    pub fn new(granularity: u32) -> Result<Self, CollisionError> {
        if granularity == 0 {
            return Err(CollisionError::InvalidGranularity(granularity));
        }

        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| CollisionError::AcceleratorInit(format!("no adapter: {e}")))?;

        let adapter_name = adapter.get_info().name;
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Collision Device"),
            required_limits: adapter.limits(),
            ..Default::default()
        }))
        .map_err(|e| CollisionError::AcceleratorInit(format!("device request on {adapter_name}: {e}")))?;

        let max_invocations = device
            .limits()
            .max_compute_workgroups_per_dimension
            .saturating_mul(WORKGROUP_SIZE);
        let effective = clamp_granularity(granularity, max_invocations);
        if effective != granularity {
            log::warn!(
                "Granularity {} exceeds device limit {}, using {}",
                granularity, max_invocations, effective
            );
        }

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Collision Search Shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Collision Search Pipeline"),
            layout: None,
            module: &module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let borders_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Collision Borders"),
            size: (2 * PACKED_LEN * std::mem::size_of::<f32>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Collision Params"),
            size: (4 * std::mem::size_of::<u32>()) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let result_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Collision First Hit"),
            size: std::mem::size_of::<u32>() as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Collision Readback"),
            size: std::mem::size_of::<u32>() as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Collision Bind Group"),
            layout: &pipeline.get_bind_group_layout(0),
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: borders_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: params_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: result_buffer.as_entire_binding() },
            ],
        });

        log::info!("Accelerator ready on {} (granularity {})", adapter_name, effective);

        Ok(Self {
            granularity: effective,
            adapter_name,
            state: Mutex::new(DeviceState {
                device,
                queue,
                pipeline,
                bind_group,
                borders_buffer,
                params_buffer,
                result_buffer,
                staging_buffer,
            }),
        })
    }

    /// Effective number of steps after clamping to the device
    pub fn granularity(&self) -> u32 {
        self.granularity
    }

    /// Name of the adapter in use
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// Smallest overlapping step (1-based), if any
    pub fn first_hit(&self, target: &Border, obstacle: &Border) -> Result<Option<u32>, CollisionError> {
        let mut packed = [0.0_f32; 2 * PACKED_LEN];
        packed[..PACKED_LEN].copy_from_slice(&target.packed());
        packed[PACKED_LEN..].copy_from_slice(&obstacle.packed());

        let granularity = self.granularity;
        let none_sentinel = granularity + 1;

        let state = lock(&self.state);
        state.queue.write_buffer(&state.borders_buffer, 0, bytemuck::cast_slice(&packed));
        state.queue.write_buffer(&state.params_buffer, 0, bytemuck::cast_slice(&[granularity, 0, 0, 0]));
        state.queue.write_buffer(&state.result_buffer, 0, bytemuck::cast_slice(&[none_sentinel]));

        let mut encoder = state.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Collision Search"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Collision Search Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&state.pipeline);
            pass.set_bind_group(0, &state.bind_group, &[]);
            pass.dispatch_workgroups(granularity.div_ceil(WORKGROUP_SIZE), 1, 1);
        }
        encoder.copy_buffer_to_buffer(
            &state.result_buffer,
            0,
            &state.staging_buffer,
            0,
            std::mem::size_of::<u32>() as u64,
        );
        state.queue.submit(Some(encoder.finish()));

        let slice = state.staging_buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            sender.send(result).ok();
        });
        state
            .device
            .poll(wgpu::PollType::Wait)
            .map_err(|e| CollisionError::Accelerator(format!("poll failed: {e}")))?;
        receiver
            .recv()
            .map_err(|e| CollisionError::Accelerator(format!("readback dropped: {e}")))?
            .map_err(|e| CollisionError::Accelerator(format!("map failed: {e}")))?;

        let step = {
            let view = slice.get_mapped_range();
            let words: &[u32] = bytemuck::cast_slice(&view);
            words.first().copied().unwrap_or(none_sentinel)
        };
        state.staging_buffer.unmap();

        Ok((step <= granularity).then_some(step))
    }
}

/// Clamp to the device's invocation limit, rounding down to a power of two when clamped
fn clamp_granularity(granularity: u32, max_invocations: u32) -> u32 {
    if granularity <= max_invocations {
        granularity
    } else if max_invocations == 0 {
        1
    } else {
        previous_power_of_two(max_invocations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    #[test]
    fn test_clamp_granularity() {
        assert_eq!(clamp_granularity(16, 65_535 * 64), 16);
        assert_eq!(clamp_granularity(100, 100), 100);
        assert_eq!(clamp_granularity(5000, 3000), 2048);
        assert_eq!(clamp_granularity(5000, 0), 1);
    }

    #[test]
    fn test_kernel_matches_serial_search() {
        let engine = match AcceleratorEngine::new(32) {
            Ok(engine) => engine,
            Err(e) => {
                eprintln!("Skipping: {e}");
                return;
            }
        };
        let a = Border::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0)).with_movement(Vec3::new(4.0, 0.0, 0.0));
        let b = Border::new(Vec3::new(4.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(engine.first_hit(&a, &b).unwrap(), Some(16));

        let far = Border::new(Vec3::new(40.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(engine.first_hit(&a, &far).unwrap(), None);
    }
}
