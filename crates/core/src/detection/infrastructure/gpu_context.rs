use std::sync::Arc;

use thiserror::Error;
use wgpu::{self};

use crate::detection::infrastructure::preprocess;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum GpuError {
    #[error("no compatible compute adapter available")]
    NoAdapter,
    #[error("device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("buffer readback failed: {0}")]
    Readback(String),
}

/// Shared GPU context for detection preprocessing.
///
/// Holds the wgpu device, queue, and the two compute pipelines
/// (grayscale+histogram, LUT application) so they are built once and
/// reused across frames.
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    gray_pipeline: wgpu::ComputePipeline,
    gray_bind_layout: wgpu::BindGroupLayout,
    equalize_pipeline: wgpu::ComputePipeline,
    equalize_bind_layout: wgpu::BindGroupLayout,
}

/// Packed params matching the WGSL uniform layout (16 bytes, 4 x u32).
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct GpuPreprocessParams {
    width: u32,
    height: u32,
    _pad0: u32,
    _pad1: u32,
}

impl GpuContext {
    /// Create a new GPU context. Errors if no suitable adapter or device
    /// is available; the pipeline owner decides whether that is fatal.
    pub fn new() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or(GpuError::NoAdapter)?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("detect-preprocess-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))?;

        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let gray_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("gray-histogram-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/gray_histogram.wgsl").into()),
        });
        let equalize_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("equalize-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/equalize.wgsl").into()),
        });

        let gray_bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("gray-bind-group-layout"),
            entries: &[
                uniform_entry(0),
                storage_entry(1, true),  // packed pixels
                storage_entry(2, false), // gray plane
                storage_entry(3, false), // histogram
            ],
        });
        let equalize_bind_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("equalize-bind-group-layout"),
                entries: &[
                    uniform_entry(0),
                    storage_entry(1, false), // gray plane, in place
                    storage_entry(2, true),  // LUT
                ],
            });

        let gray_pipeline = build_pipeline(&device, "gray", &gray_bind_layout, &gray_shader);
        let equalize_pipeline =
            build_pipeline(&device, "equalize", &equalize_bind_layout, &equalize_shader);

        Ok(Self {
            device,
            queue,
            gray_pipeline,
            gray_bind_layout,
            equalize_pipeline,
            equalize_bind_layout,
        })
    }

    /// Runs both preprocessing steps on the device: upload the packed
    /// frame, reduce to grayscale while accumulating the histogram, build
    /// the equalization LUT on the host (256 entries), apply it on the
    /// device, and marshal the equalized plane back into `gray_out`.
    ///
    /// All of this sits inside the caller's timed region: the transfer
    /// cost is part of what the latency comparison exists to measure.
    pub fn preprocess(&self, frame: &Frame, gray_out: &mut Vec<u8>) -> Result<(), GpuError> {
        let width = frame.width();
        let height = frame.height();
        let pixel_count = (width * height) as usize;
        let plane_size = (pixel_count * 4) as u64; // one u32 per pixel

        let packed = pack_rgb(frame);

        let params = GpuPreprocessParams {
            width,
            height,
            _pad0: 0,
            _pad1: 0,
        };
        let params_buf = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("preprocess-params"),
            size: std::mem::size_of::<GpuPreprocessParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let pixels_buf = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pixels"),
            size: plane_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let gray_buf = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("gray"),
            size: plane_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let hist_buf = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("histogram"),
            size: 256 * 4,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let lut_buf = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lut"),
            size: 256 * 4,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let hist_staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("histogram-staging"),
            size: 256 * 4,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let gray_staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("gray-staging"),
            size: plane_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        self.queue
            .write_buffer(&params_buf, 0, bytemuck::bytes_of(&params));
        self.queue
            .write_buffer(&pixels_buf, 0, bytemuck::cast_slice(&packed));
        self.queue
            .write_buffer(&hist_buf, 0, bytemuck::cast_slice(&[0u32; 256]));

        let workgroups_x = width.div_ceil(16);
        let workgroups_y = height.div_ceil(16);

        // Pass 1: grayscale + histogram
        {
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("gray-bg"),
                layout: &self.gray_bind_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: params_buf.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: pixels_buf.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: gray_buf.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: hist_buf.as_entire_binding(),
                    },
                ],
            });

            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("enc-gray"),
                });
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("grayscale-histogram"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.gray_pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(workgroups_x, workgroups_y, 1);
            }
            encoder.copy_buffer_to_buffer(&hist_buf, 0, &hist_staging, 0, 256 * 4);
            self.queue.submit(Some(encoder.finish()));
        }

        // LUT construction stays on the host: 256 entries of sequential
        // prefix-sum work, not worth a dispatch.
        let hist_bytes = self.read_buffer(&hist_staging)?;
        let hist_words: &[u32] = bytemuck::cast_slice(&hist_bytes);
        let mut hist = [0u32; 256];
        hist.copy_from_slice(hist_words);
        let lut = preprocess::equalization_lut(&hist);
        let lut_words: Vec<u32> = lut.iter().map(|&v| v as u32).collect();
        self.queue
            .write_buffer(&lut_buf, 0, bytemuck::cast_slice(&lut_words));

        // Pass 2: apply LUT in place, then stage the plane for readback
        {
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("equalize-bg"),
                layout: &self.equalize_bind_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: params_buf.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: gray_buf.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: lut_buf.as_entire_binding(),
                    },
                ],
            });

            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("enc-equalize"),
                });
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("equalize"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.equalize_pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(workgroups_x, workgroups_y, 1);
            }
            encoder.copy_buffer_to_buffer(&gray_buf, 0, &gray_staging, 0, plane_size);
            self.queue.submit(Some(encoder.finish()));
        }

        let plane_bytes = self.read_buffer(&gray_staging)?;
        let plane_words: &[u32] = bytemuck::cast_slice(&plane_bytes);

        gray_out.clear();
        gray_out.reserve(pixel_count);
        gray_out.extend(plane_words.iter().map(|&v| v as u8));
        Ok(())
    }

    fn read_buffer(&self, staging: &wgpu::Buffer) -> Result<Vec<u8>, GpuError> {
        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(GpuError::Readback(e.to_string())),
            Err(_) => return Err(GpuError::Readback("map callback never ran".into())),
        }

        let mapped = slice.get_mapped_range();
        let bytes = mapped.to_vec();
        drop(mapped);
        staging.unmap();
        Ok(bytes)
    }
}

/// Packs an RGB frame into one little-endian u32 per pixel (0x00BBGGRR),
/// the layout both shaders consume.
pub fn pack_rgb(frame: &Frame) -> Vec<u32> {
    let ch = frame.channels() as usize;
    frame
        .data()
        .chunks_exact(ch)
        .map(|px| {
            let r = px[0] as u32;
            let g = *px.get(1).unwrap_or(&px[0]) as u32;
            let b = *px.get(2).unwrap_or(&px[0]) as u32;
            r | (g << 8) | (b << 16)
        })
        .collect()
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    name: &str,
    layout: &wgpu::BindGroupLayout,
    shader: &wgpu::ShaderModule,
) -> wgpu::ComputePipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{name}-pipeline-layout")),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });
    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(&format!("{name}-pipeline")),
        layout: Some(&pipeline_layout),
        module: shader,
        entry_point: Some("main"),
        compilation_options: Default::default(),
        cache: None,
    })
}
