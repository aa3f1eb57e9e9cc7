//! Windowless run of the host kernel, selected by `FLUID_HEADLESS_STEPS`.

use std::time::Instant;

use crate::config::{HEADLESS_STEPS_ENV, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::error::InitError;
use crate::simulation::{
    CpuKernel, FrameInput, GridExtent, PaintControls, PhysicsConfig, PointerState,
    SimulationLoop,
};

const FRAME_TIME: f32 = 1.0 / 60.0;

/// Step count requested through the environment, if any
pub fn requested_steps() -> Option<u64> {
    let raw = std::env::var(HEADLESS_STEPS_ENV).ok()?;
    match raw.trim().parse() {
        Ok(steps) => Some(steps),
        Err(_) => {
            log::warn!("Ignoring {}={:?}: not a step count", HEADLESS_STEPS_ENV, raw);
            None
        }
    }
}

/// Pointer for frame `n` of a circular stroke around the screen centre
fn scripted_pointer(n: u64) -> PointerState {
    let angle = n as f32 * 0.05;
    let radius = SCREEN_HEIGHT as f32 * 0.25;
    PointerState {
        position: Some([
            SCREEN_WIDTH as f32 * 0.5 + radius * angle.cos(),
            SCREEN_HEIGHT as f32 * 0.5 + radius * angle.sin(),
        ]),
        left: true,
        right: false,
    }
}

pub fn run(steps: u64) -> Result<(), InitError> {
    let extent = GridExtent::default_display();
    log::info!(
        "Headless run: {} steps on a {}x{} grid",
        steps,
        extent.width,
        extent.height
    );

    let kernel = CpuKernel::new(extent, PhysicsConfig::default())?;
    let tiling = kernel.tiling();
    log::info!(
        "Host kernel tiling: {}x{} workgroups of {}x{}",
        tiling.groups_x,
        tiling.groups_y,
        tiling.size,
        tiling.size
    );
    let mut simulation = SimulationLoop::new(kernel);
    let controls = PaintControls::default();

    let started = Instant::now();
    for n in 0..steps {
        simulation.step(
            &controls,
            &FrameInput {
                pointer: scripted_pointer(n),
                frame_time: FRAME_TIME,
            },
        );
    }
    let elapsed = started.elapsed();

    if let Some(cells) = simulation.kernel().grid(simulation.latest()) {
        let total_density: f64 = cells.iter().map(|c| c.density as f64).sum();
        let initialized = cells.iter().filter(|c| c.is_initialized()).count();
        log::info!(
            "Finished {} steps in {:.2?} ({:.0} steps/s): total density {:.4}, {} initialized cells",
            simulation.scheduler().steps_completed(),
            elapsed,
            steps as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
            total_density,
            initialized
        );
    }

    simulation.shutdown();
    Ok(())
}
