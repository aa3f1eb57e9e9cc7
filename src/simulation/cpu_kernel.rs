//! Host implementation of the grid kernel.
//!
//! Each region is a flat arena indexed by `y * width + x`. A step is a pure
//! function `(read arena, index) -> Cell` run as a parallel-for over rows of
//! the write arena, so no invocation ever touches another cell's output.
//! `grid.wgsl` runs the same body on the GPU.

use rayon::prelude::*;

use crate::config::WORKGROUP_SIZE;
use crate::error::InitError;
use crate::simulation::grid::GridExtent;
use crate::simulation::interaction::ParamRecord;
use crate::simulation::kernel::{KernelDispatch, KernelParams, PhysicsConfig, WorkgroupTiling};
use crate::simulation::scheduler::{BufferId, Roles, StepCommitted};
use crate::simulation::store::GridStateStore;
use crate::simulation::Cell;

/// Output image texel (rgba)
pub type Texel = [f32; 4];

pub struct CpuKernel {
    store: GridStateStore<Vec<Cell>>,
    params: KernelParams,
    tiling: WorkgroupTiling,
    bound: Option<Roles>,
    dispatched: Option<Roles>,
    image: Vec<Texel>,
}

impl CpuKernel {
    pub fn new(extent: GridExtent, physics: PhysicsConfig) -> Result<Self, InitError> {
        let tiling = WorkgroupTiling::configure(extent, WORKGROUP_SIZE)?;
        let store = GridStateStore::allocate(extent)?;

        Ok(Self {
            store,
            params: KernelParams::new(extent, physics),
            tiling,
            bound: None,
            dispatched: None,
            // Blank white surface until the first step lands
            image: vec![[1.0; 4]; extent.cell_count()],
        })
    }

    pub fn tiling(&self) -> WorkgroupTiling {
        self.tiling
    }

    /// Current parameter slots
    #[cfg(test)]
    pub fn params(&self) -> &KernelParams {
        &self.params
    }

    /// Contents of one region, None after release
    pub fn grid(&self, id: BufferId) -> Option<&[Cell]> {
        self.store.region(id).map(Vec::as_slice)
    }

    /// The sampled output image, one texel per cell
    #[cfg(test)]
    pub fn image(&self) -> &[Texel] {
        &self.image
    }
}

impl KernelDispatch for CpuKernel {
    fn extent(&self) -> GridExtent {
        self.store.extent()
    }

    fn bind_roles(&mut self, roles: Roles) {
        self.bound = Some(roles);
    }

    fn push_parameters(&mut self, record: &ParamRecord) {
        self.params.apply(record);
    }

    fn dispatch(&mut self) {
        let Some(roles) = self.bound else {
            debug_assert!(false, "dispatch without bound roles");
            return;
        };
        let Some((read, write)) = self.store.split(roles) else {
            log::warn!("Dispatch after grid storage was released");
            return;
        };

        let params = &self.params;
        let width = params.grid_width as usize;

        write
            .par_chunks_mut(width)
            .zip(self.image.par_chunks_mut(width))
            .enumerate()
            .for_each(|(y, (cells, texels))| {
                for (x, (cell, texel)) in cells.iter_mut().zip(texels.iter_mut()).enumerate() {
                    let next = update_cell(read, params, x as u32, y as u32);
                    *texel = shade(&next);
                    *cell = next;
                }
            });

        self.dispatched = Some(roles);
    }

    fn barrier(&mut self) -> Option<StepCommitted> {
        // The parallel-for has joined by the time dispatch returns, so both
        // the arena and the image are already visible here.
        self.dispatched
            .take()
            .map(|roles| StepCommitted::new(roles.write()))
    }

    fn release(&mut self) {
        self.store.release();
        self.bound = None;
        self.dispatched = None;
    }
}

/// Nearest cell to a continuous grid position, clamped to the grid
fn sample_index(p: &KernelParams, pos: [f32; 2]) -> usize {
    let max_x = p.grid_width as i32 - 1;
    let max_y = p.grid_height as i32 - 1;
    let x = (pos[0].round_ties_even() as i32).clamp(0, max_x);
    let y = (pos[1].round_ties_even() as i32).clamp(0, max_y);
    y as usize * p.grid_width as usize + x as usize
}

fn neighbor(read: &[Cell], p: &KernelParams, x: u32, y: u32, dx: i32, dy: i32) -> Cell {
    read[sample_index(p, [(x as i32 + dx) as f32, (y as i32 + dy) as f32])]
}

/// One cell's next state, computed only from the read arena
pub fn update_cell(read: &[Cell], p: &KernelParams, x: u32, y: u32) -> Cell {
    let current = read[sample_index(p, [x as f32, y as f32])];
    let mut next = current;
    let dt = p.delta_time;

    // Semi-Lagrangian back-trace in `iterations` segments
    if p.advection != 0.0 {
        let steps = p.iterations.max(1);
        let h = dt * p.advection / steps as f32;
        let mut pos = [x as f32, y as f32];
        for _ in 0..steps {
            let v = read[sample_index(p, pos)].velocity;
            pos = [pos[0] - v[0] * h, pos[1] - v[1] * h];
        }
        let source = read[sample_index(p, pos)];
        next.density = source.density;
        next.color = source.color;
        next.velocity = source.velocity;
    }

    let east = neighbor(read, p, x, y, 1, 0);
    let west = neighbor(read, p, x, y, -1, 0);
    let south = neighbor(read, p, x, y, 0, 1);
    let north = neighbor(read, p, x, y, 0, -1);

    if p.diffusion != 0.0 {
        // Explicit scheme is unstable past a quarter
        let k = (dt * p.diffusion).clamp(-0.25, 0.25);
        let lap = east.density + west.density + south.density + north.density
            - 4.0 * current.density;
        next.density = (next.density + k * lap).max(0.0);
        for c in 0..3 {
            let lap = east.color[c] + west.color[c] + south.color[c] + north.color[c]
                - 4.0 * current.color[c];
            next.color[c] += k * lap;
        }
    }

    if p.pressure_response != 0.0 {
        let divergence =
            0.5 * ((east.velocity[0] - west.velocity[0]) + (south.velocity[1] - north.velocity[1]));
        next.pressure = 0.0 - 0.5 * divergence;
        let grad = [
            0.5 * (east.pressure - west.pressure),
            0.5 * (south.pressure - north.pressure),
        ];
        next.velocity[0] -= p.pressure_response * grad[0];
        next.velocity[1] -= p.pressure_response * grad[1];
    }

    if p.paint_strength != 0.0 {
        paint(&mut next, p, x, y);
    }

    next
}

fn paint(cell: &mut Cell, p: &KernelParams, x: u32, y: u32) {
    let scale = p.downsample.max(1.0);
    let center = [p.pointer[0] / scale, p.pointer[1] / scale];
    let dx = x as f32 + 0.5 - center[0];
    let dy = y as f32 + 0.5 - center[1];
    let dist = (dx * dx + dy * dy).sqrt();
    let radius = p.paint_radius.max(1) as f32;
    if dist >= radius {
        return;
    }

    let mut amount = p.paint_strength * (1.0 - dist / radius);
    if p.right_button != 0 {
        amount = -amount;
    }

    match p.paint_mode {
        0 => cell.density = (cell.density + amount).max(0.0),
        1 => {
            let drag = [
                ((p.pointer[0] - p.secondary_pointer[0]) / scale).clamp(-radius, radius),
                ((p.pointer[1] - p.secondary_pointer[1]) / scale).clamp(-radius, radius),
            ];
            cell.velocity[0] += drag[0] * amount;
            cell.velocity[1] += drag[1] * amount;
        }
        _ => {
            let t = amount.abs().min(1.0);
            for c in 0..3 {
                cell.color[c] += (p.paint_color[c] - cell.color[c]) * t;
            }
            cell.color[3] = 1.0;
        }
    }
    cell.initialized = 1;
}

/// Output texel: density times the paint tint (white where unpainted)
pub fn shade(cell: &Cell) -> Texel {
    let a = cell.color[3].clamp(0.0, 1.0);
    let mut texel = [0.0, 0.0, 0.0, 1.0];
    for c in 0..3 {
        let tint = 1.0 + (cell.color[c] - 1.0) * a;
        texel[c] = (cell.density * tint).clamp(0.0, 1.0);
    }
    texel
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::interaction::PaintMode;
    use crate::simulation::scheduler::{resolve_roles, StepState};

    fn extent() -> GridExtent {
        GridExtent::from_display(128, 64, 4)
    }

    fn stroke(mode: PaintMode, pointer: [f32; 2], strength: f32) -> ParamRecord {
        ParamRecord {
            paint_color: [1.0, 0.0, 0.0],
            paint_strength: strength,
            paint_radius: 4,
            paint_mode: mode,
            right_button: false,
            pointer,
            secondary_pointer: None,
            delta_time: 0.016,
            precision: 10,
        }
    }

    fn run_step(kernel: &mut CpuKernel, state: StepState, record: &ParamRecord) -> BufferId {
        kernel.bind_roles(resolve_roles(state));
        kernel.push_parameters(record);
        kernel.dispatch();
        kernel.barrier().expect("step was dispatched").written()
    }

    #[test]
    fn test_density_paint_near_pointer_only() {
        let mut kernel = CpuKernel::new(extent(), PhysicsConfig::at_rest()).unwrap();
        let written = run_step(
            &mut kernel,
            StepState::StateA,
            &stroke(PaintMode::Density, [40.0, 40.0], 0.5),
        );
        assert_eq!(written, BufferId::B);

        let grid = kernel.grid(BufferId::B).unwrap();
        let hit = grid[extent().index(10, 10)];
        assert!(hit.density > 0.0);
        assert!(hit.is_initialized());

        let miss = grid[extent().index(25, 2)];
        assert_eq!(miss.density, 0.0);
        assert!(!miss.is_initialized());

        // Read region untouched
        assert!(kernel.grid(BufferId::A).unwrap().iter().all(|c| c.density == 0.0));
    }

    #[test]
    fn test_erase_never_goes_negative() {
        let mut kernel = CpuKernel::new(extent(), PhysicsConfig::at_rest()).unwrap();
        let mut record = stroke(PaintMode::Density, [40.0, 40.0], 0.5);
        record.right_button = true;
        run_step(&mut kernel, StepState::StateA, &record);
        assert!(kernel.grid(BufferId::B).unwrap().iter().all(|c| c.density >= 0.0));
    }

    #[test]
    fn test_color_paint_sets_tint() {
        let mut kernel = CpuKernel::new(extent(), PhysicsConfig::at_rest()).unwrap();
        run_step(&mut kernel, StepState::StateA, &stroke(PaintMode::Color, [40.0, 40.0], 1.0));
        let cell = kernel.grid(BufferId::B).unwrap()[extent().index(10, 10)];
        assert_eq!(cell.color[3], 1.0);
        assert!(cell.color[0] > 0.0);
        assert_eq!(cell.color[1], 0.0);
    }

    #[test]
    fn test_velocity_paint_follows_drag() {
        let mut kernel = CpuKernel::new(extent(), PhysicsConfig::at_rest()).unwrap();
        let mut record = stroke(PaintMode::Velocity, [48.0, 40.0], 1.0);
        record.secondary_pointer = Some([40.0, 40.0]);
        run_step(&mut kernel, StepState::StateA, &record);
        let cell = kernel.grid(BufferId::B).unwrap()[extent().index(11, 10)];
        assert!(cell.velocity[0] > 0.0);
        assert_eq!(cell.velocity[1], 0.0);
    }

    #[test]
    fn test_diffusion_spreads_density() {
        let mut kernel = CpuKernel::new(extent(), PhysicsConfig::default()).unwrap();
        run_step(&mut kernel, StepState::StateA, &stroke(PaintMode::Density, [40.0, 40.0], 1.0));
        let mut idle = stroke(PaintMode::Density, [40.0, 40.0], 0.0);
        idle.delta_time = 0.5;
        run_step(&mut kernel, StepState::StateB, &idle);

        let grid = kernel.grid(BufferId::A).unwrap();
        // Just outside the brush: empty after painting, non-zero after diffusion
        let rim = grid[extent().index(14, 10)];
        assert!(rim.density > 0.0);
    }

    #[test]
    fn test_image_matches_written_grid() {
        let mut kernel = CpuKernel::new(extent(), PhysicsConfig::at_rest()).unwrap();
        assert!(kernel.image().iter().all(|t| *t == [1.0; 4]));

        run_step(&mut kernel, StepState::StateA, &stroke(PaintMode::Density, [40.0, 40.0], 0.5));
        let grid = kernel.grid(BufferId::B).unwrap();
        for (cell, texel) in grid.iter().zip(kernel.image()) {
            assert_eq!(*texel, shade(cell));
        }
    }

    #[test]
    fn test_release_stops_dispatch() {
        let mut kernel = CpuKernel::new(extent(), PhysicsConfig::at_rest()).unwrap();
        kernel.release();
        kernel.release();
        assert!(kernel.grid(BufferId::A).is_none());
        kernel.bind_roles(resolve_roles(StepState::StateA));
        kernel.dispatch();
        assert!(kernel.barrier().is_none());
    }

    #[test]
    fn test_barrier_without_dispatch_commits_nothing() {
        let mut kernel = CpuKernel::new(extent(), PhysicsConfig::at_rest()).unwrap();
        assert!(kernel.barrier().is_none());
        run_step(&mut kernel, StepState::StateA, &stroke(PaintMode::Density, [40.0, 40.0], 0.5));
        // One commit per dispatch
        assert!(kernel.barrier().is_none());
    }

    #[test]
    fn test_tiling_configured() {
        let kernel = CpuKernel::new(extent(), PhysicsConfig::at_rest()).unwrap();
        assert_eq!((kernel.tiling().groups_x, kernel.tiling().groups_y), (4, 2));
    }
}
