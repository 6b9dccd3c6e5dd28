//! The off-screen GPU surface context and its binding discipline.
//!
//! A `SurfaceContext` is not safe to drive from two threads at once: command
//! encoding for the target and the readback buffer must be serialized.
//! `SharedContext` wraps it in the per-context mutex and hands out
//! [`ContextGuard`]s: holding the guard *is* having the context bound on the
//! calling thread, and dropping it unbinds. Both the render worker and the
//! capture path go through `bind()`, and nothing else touches the context.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context as AnyhowContext, Result};
use thiserror::Error;

use crate::pixels::FrameCache;

/// Color format of the off-screen target; readback yields RGBA8 directly.
pub(crate) const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Reading the color target back into CPU memory failed.
#[derive(Debug, Error)]
pub enum ReadbackError {
    #[error("GPU poll failed during readback: {0}")]
    Poll(String),
    #[error("readback mapping was abandoned by the device")]
    MapLost,
    #[error("failed to map readback buffer: {0}")]
    Map(String),
}

/// GPU device, queue, off-screen color target and readback staging for one
/// render session.
pub struct SurfaceContext {
    _instance: wgpu::Instance,
    device: wgpu::Device,
    queue: wgpu::Queue,
    target: wgpu::Texture,
    target_view: wgpu::TextureView,
    readback: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_bytes_per_row: u32,
}

impl SurfaceContext {
    /// Creates a context with an off-screen target of the given physical
    /// size (already scale-adjusted by the caller; zero extents are clamped
    /// to one pixel since GPU textures cannot be empty).
    pub fn new(physical_width: u32, physical_height: u32) -> Result<Self> {
        let width = physical_width.max(1);
        let height = physical_height.max(1);

        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        tracing::info!(
            name = %info.name,
            backend = ?info.backend,
            device_type = ?info.device_type,
            "selected GPU adapter"
        );

        let limits = adapter.limits();
        let max_dimension = limits.max_texture_dimension_2d;
        if width > max_dimension || height > max_dimension {
            anyhow::bail!(
                "GPU max texture dimension is {max_dimension}, requested surface is {width}x{height}"
            );
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("framebridge device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        let (target, target_view, readback, padded_bytes_per_row) =
            create_target(&device, width, height);

        tracing::info!(width, height, "created off-screen surface");

        Ok(Self {
            _instance: instance,
            device,
            queue,
            target,
            target_view,
            readback,
            width,
            height,
            padded_bytes_per_row,
        })
    }

    /// Physical size of the off-screen target.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub(crate) fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub(crate) fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub(crate) fn target_view(&self) -> &wgpu::TextureView {
        &self.target_view
    }

    /// Copies the current color target into `cache`, clipping to the smaller
    /// of the native and cached extents on each axis. Rows land
    /// top-to-bottom. Blocks until the GPU finishes the copy.
    pub(crate) fn read_into(&self, cache: &mut FrameCache) -> Result<(), ReadbackError> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("capture encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = self.readback.slice(..);
        let (sender, receiver) = crossbeam_channel::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait)
            .map_err(|err| ReadbackError::Poll(format!("{err:?}")))?;
        receiver
            .recv()
            .map_err(|_| ReadbackError::MapLost)?
            .map_err(|err| ReadbackError::Map(format!("{err:?}")))?;

        {
            let mapped = slice.get_mapped_range();
            cache.fill_from_padded(
                &mapped,
                self.width,
                self.height,
                self.padded_bytes_per_row as usize,
            );
        }
        self.readback.unmap();
        Ok(())
    }
}

fn create_target(
    device: &wgpu::Device,
    width: u32,
    height: u32,
) -> (wgpu::Texture, wgpu::TextureView, wgpu::Buffer, u32) {
    let target = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("framebridge color target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

    let padded_bytes_per_row = padded_bytes_per_row(width);
    let readback = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("framebridge readback"),
        size: u64::from(padded_bytes_per_row) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    (target, target_view, readback, padded_bytes_per_row)
}

/// Rows in texture-to-buffer copies must align to `COPY_BYTES_PER_ROW_ALIGNMENT`.
fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// The per-context binding lock around a [`SurfaceContext`].
#[derive(Clone)]
pub struct SharedContext {
    inner: Arc<Mutex<SurfaceContext>>,
}

impl SharedContext {
    pub fn new(context: SurfaceContext) -> Self {
        Self {
            inner: Arc::new(Mutex::new(context)),
        }
    }

    /// Binds the context on the calling thread, blocking until whichever
    /// thread currently holds it unbinds.
    pub fn bind(&self) -> ContextGuard<'_> {
        ContextGuard {
            guard: self.inner.lock().expect("surface context lock poisoned"),
        }
    }
}

/// Exclusive access to the bound context; dropping the guard unbinds.
pub struct ContextGuard<'a> {
    guard: MutexGuard<'a, SurfaceContext>,
}

impl Deref for ContextGuard<'_> {
    type Target = SurfaceContext;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl DerefMut for ContextGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

/// Cooperative shutdown flag for a render worker.
///
/// Raising the flag is the only cancellation input the worker observes; it
/// checks the flag once per frame between context bindings.
#[derive(Clone, Default)]
pub struct CloseSignal {
    flag: Arc<AtomicBool>,
}

impl CloseSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_close(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn should_close(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_padding_rounds_up_to_the_copy_alignment() {
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        assert_eq!(padded_bytes_per_row(64), 64 * 4);
        assert_eq!(padded_bytes_per_row(1), align);
        assert_eq!(padded_bytes_per_row(63), align);
    }

    #[test]
    fn close_signal_latches() {
        let signal = CloseSignal::new();
        assert!(!signal.should_close());
        signal.request_close();
        assert!(signal.should_close());
        assert!(signal.clone().should_close());
    }
}
