//! The render worker: a joinable thread driving the frame loop.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context as AnyhowContext, Result};

use crate::context::{CloseSignal, SharedContext};
use crate::math;
use crate::pipeline::{PayloadPipeline, PayloadUniforms};
use crate::types::RenderPayload;

/// Lifecycle of a render worker.
///
/// `Uninitialized -> Configuring -> Running -> Stopped`; `Stopped` is
/// terminal, reached either through the close signal or a failed configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Uninitialized,
    Configuring,
    Running,
    Stopped,
}

impl LoopPhase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Configuring,
            2 => Self::Running,
            3 => Self::Stopped,
            _ => Self::Uninitialized,
        }
    }
}

/// Shared cell publishing the worker's current phase.
#[derive(Default)]
pub(crate) struct PhaseCell(AtomicU8);

impl PhaseCell {
    pub fn get(&self) -> LoopPhase {
        LoopPhase::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn set(&self, phase: LoopPhase) {
        self.0.store(phase as u8, Ordering::SeqCst);
    }
}

/// Starts the render worker on its own named thread.
pub(crate) fn spawn(
    context: SharedContext,
    payload: RenderPayload,
    phase: Arc<PhaseCell>,
    close: CloseSignal,
    target_fps: Option<f32>,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("framebridge-render".to_string())
        .spawn(move || run(context, payload, &phase, &close, target_fps))
        .context("failed to spawn render worker thread")
}

fn run(
    context: SharedContext,
    payload: RenderPayload,
    phase: &PhaseCell,
    close: &CloseSignal,
    target_fps: Option<f32>,
) {
    phase.set(LoopPhase::Configuring);

    let pipeline = {
        let ctx = context.bind();
        match PayloadPipeline::new(&ctx, &payload) {
            Ok(pipeline) => pipeline,
            Err(err) => {
                tracing::error!(
                    error = %format!("{err:#}"),
                    "payload setup failed; render worker stopping without producing frames"
                );
                phase.set(LoopPhase::Stopped);
                return;
            }
        }
    };

    phase.set(LoopPhase::Running);
    tracing::debug!("render worker running");

    let interval = target_fps
        .filter(|fps| *fps > 0.0)
        .map(|fps| Duration::from_secs_f32(1.0 / fps));
    let start = Instant::now();
    let mut last_frame = start;
    let mut frame: u32 = 0;
    let mut uniforms = {
        let ctx = context.bind();
        let (width, height) = ctx.size();
        PayloadUniforms::new(width, height)
    };

    while !close.should_close() {
        let frame_started = Instant::now();
        {
            let ctx = context.bind();
            let (width, height) = ctx.size();

            let now = Instant::now();
            let seconds = now.duration_since(start).as_secs_f32();
            let delta = now.duration_since(last_frame).as_secs_f32();
            last_frame = now;

            let mvp = payload_transform(&payload, seconds, width, height);
            uniforms.advance(mvp, seconds, delta, frame, width, height);
            pipeline.write_uniforms(ctx.queue(), &uniforms);

            let mut encoder = ctx
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("render encoder"),
                });
            pipeline.encode(&mut encoder, ctx.target_view());
            ctx.queue().submit(std::iter::once(encoder.finish()));
        }
        // The context is unbound here, so captures can interleave while the
        // worker paces the next frame.
        frame = frame.saturating_add(1);

        if let Some(interval) = interval {
            let elapsed = frame_started.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            }
        } else {
            thread::yield_now();
        }
    }

    phase.set(LoopPhase::Stopped);
    tracing::debug!(frames = frame, "render worker stopped");
}

/// Model-view-projection for the current payload: a Z-spin under an
/// aspect-corrected ortho projection for the triangle, identity otherwise.
fn payload_transform(payload: &RenderPayload, seconds: f32, width: u32, height: u32) -> math::Mat4 {
    match payload {
        RenderPayload::Triangle => {
            let aspect = width as f32 / height.max(1) as f32;
            let projection = math::ortho(-aspect, aspect, -1.0, 1.0, 1.0, -1.0);
            let model = math::rotation_z(seconds);
            math::multiply(&projection, &model)
        }
        RenderPayload::Fragment { .. } => math::IDENTITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_cell_round_trips_every_phase() {
        let cell = PhaseCell::default();
        assert_eq!(cell.get(), LoopPhase::Uninitialized);
        for phase in [
            LoopPhase::Configuring,
            LoopPhase::Running,
            LoopPhase::Stopped,
        ] {
            cell.set(phase);
            assert_eq!(cell.get(), phase);
        }
    }

    #[test]
    fn triangle_transform_depends_on_aspect() {
        let wide = payload_transform(&RenderPayload::Triangle, 0.0, 200, 100);
        let square = payload_transform(&RenderPayload::Triangle, 0.0, 100, 100);
        assert_ne!(wide[0][0], square[0][0]);
    }
}
