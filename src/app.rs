use std::sync::Arc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::config::{
    PAINT_COLOR_STEP, PAINT_STRENGTH_STEP, SCREEN_HEIGHT, SCREEN_WIDTH, TIME_SCALE_STEP,
    WINDOW_TITLE,
};
use crate::error::InitError;
use crate::gpu::{GpuContext, GpuKernel, RenderPipeline};
use crate::simulation::{
    FrameInput, GridExtent, PaintControls, PaintMode, PhysicsConfig, PointerState, SimulationLoop,
};

/// Everything that exists once the window and device are up
struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    simulation: SimulationLoop<GpuKernel>,
    presenter: RenderPipeline,
    present_bind_group: wgpu::BindGroup,
}

/// Application state
pub struct App {
    running: Option<Running>,
    controls: PaintControls,
    pointer: PointerState,
    last_frame: Instant,
    fps_counter: FpsCounter,
    init_error: Option<InitError>,
    stopped: bool,
}

impl App {
    pub fn new() -> Self {
        Self {
            running: None,
            controls: PaintControls::default(),
            pointer: PointerState::default(),
            last_frame: Instant::now(),
            fps_counter: FpsCounter::new(),
            init_error: None,
            stopped: false,
        }
    }

    /// The error that stopped start-up, if any
    pub fn take_init_error(&mut self) -> Option<InitError> {
        self.init_error.take()
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> Result<Running, InitError> {
        log::info!("Initializing fluid simulation...");

        let window_attrs = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(winit::dpi::LogicalSize::new(SCREEN_WIDTH, SCREEN_HEIGHT))
            .with_resizable(false);
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        log::info!("Creating GPU context...");
        let gpu = pollster::block_on(GpuContext::new(window.clone()))?;

        let extent = GridExtent::default_display();
        log::info!(
            "Grid size: {}x{} ({} bytes per region)",
            extent.width,
            extent.height,
            extent.byte_size()
        );

        log::info!("Creating grid kernel...");
        let kernel = GpuKernel::new(
            gpu.device.clone(),
            gpu.queue.clone(),
            extent,
            PhysicsConfig::default(),
        )?;

        log::info!("Creating render pipeline...");
        let presenter = RenderPipeline::new(&gpu.device, gpu.format());
        let present_bind_group = presenter.create_bind_group(&gpu.device, kernel.output_view());

        log::info!("Initialization complete!");
        log::info!("Controls:");
        log::info!("  Left mouse: paint, right mouse: erase");
        log::info!("  1/2/3: Paint density/velocity/color");
        log::info!("  [/]: Paint radius, -/=: Paint strength");
        log::info!("  ,/.: Time scale, 9/0: Simulation precision");
        log::info!("  R/G/B: Cycle paint color channel");
        log::info!("  Escape: Quit");

        Ok(Running {
            window,
            gpu,
            simulation: SimulationLoop::new(kernel),
            presenter,
            present_bind_group,
        })
    }

    fn render(&mut self) {
        let Some(running) = self.running.as_mut() else {
            return;
        };

        let now = Instant::now();
        let frame_time = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        // 1. One simulation step (submitted before anything samples the image)
        running.simulation.step(
            &self.controls,
            &FrameInput {
                pointer: self.pointer,
                frame_time,
            },
        );

        // 2. Present the post-barrier image
        let gpu = &running.gpu;
        let output = match gpu.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.device, &gpu.config);
                return;
            }
            Err(e) => {
                log::error!("Surface error: {:?}", e);
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("present-encoder"),
            });
        running
            .presenter
            .draw(&mut encoder, &view, &running.present_bind_group);

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        if let Some(fps) = self.fps_counter.tick() {
            running.window.set_title(&format!(
                "{} - {:.0} FPS - {} {:+.2}",
                WINDOW_TITLE,
                fps,
                self.controls.mode().label(),
                self.controls.strength()
            ));
        }
    }

    fn handle_key(&mut self, key_code: KeyCode) {
        let c = &mut self.controls;
        match key_code {
            KeyCode::Digit1 => c.set_mode(PaintMode::Density),
            KeyCode::Digit2 => c.set_mode(PaintMode::Velocity),
            KeyCode::Digit3 => c.set_mode(PaintMode::Color),

            KeyCode::BracketLeft => c.set_radius(c.radius() - 1),
            KeyCode::BracketRight => c.set_radius(c.radius() + 1),

            KeyCode::Minus => c.set_strength(c.strength() - PAINT_STRENGTH_STEP),
            KeyCode::Equal => c.set_strength(c.strength() + PAINT_STRENGTH_STEP),

            KeyCode::Comma => c.set_time_scale(c.time_scale() - TIME_SCALE_STEP),
            KeyCode::Period => c.set_time_scale(c.time_scale() + TIME_SCALE_STEP),

            KeyCode::Digit9 => c.set_precision(c.precision() - 1),
            KeyCode::Digit0 => c.set_precision(c.precision() + 1),

            KeyCode::KeyR => c.set_color(cycle_channel(c.color(), 0)),
            KeyCode::KeyG => c.set_color(cycle_channel(c.color(), 1)),
            KeyCode::KeyB => c.set_color(cycle_channel(c.color(), 2)),

            _ => return,
        }

        log::info!(
            "Paint {} radius {} strength {:+.2} color {:?} | time scale {:+.1} precision {}",
            c.mode().label(),
            c.radius(),
            c.strength(),
            c.color(),
            c.time_scale(),
            c.precision()
        );
    }

    /// Release grid storage and drop the device state; later redraws are no-ops
    fn shutdown(&mut self) {
        self.stopped = true;
        if let Some(mut running) = self.running.take() {
            running.simulation.shutdown();
        }
    }
}

/// Step one colour channel, wrapping back to zero past full intensity
fn cycle_channel(mut color: [f32; 3], channel: usize) -> [f32; 3] {
    let next = color[channel] + PAINT_COLOR_STEP;
    color[channel] = if next > 1.0 + f32::EPSILON { 0.0 } else { next };
    color
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() || self.init_error.is_some() || self.stopped {
            return;
        }

        match self.initialize(event_loop) {
            Ok(running) => {
                self.last_frame = Instant::now();
                running.window.request_redraw();
                self.running = Some(running);
            }
            Err(e) => {
                log::error!("Initialization failed: {}", e);
                self.init_error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting...");
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state.is_pressed() {
                    if let PhysicalKey::Code(key_code) = event.physical_key {
                        if key_code == KeyCode::Escape {
                            log::info!("Escape pressed, exiting...");
                            self.shutdown();
                            event_loop.exit();
                        } else {
                            self.handle_key(key_code);
                        }
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(running) = &self.running {
                    let logical = position.to_logical::<f32>(running.window.scale_factor());
                    self.pointer.position = Some([logical.x, logical.y]);
                }
            }
            WindowEvent::CursorLeft { .. } => {
                self.pointer.position = None;
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = state == ElementState::Pressed;
                match button {
                    MouseButton::Left => self.pointer.left = pressed,
                    MouseButton::Right => self.pointer.right = pressed,
                    _ => {}
                }
            }
            WindowEvent::Resized(new_size) => {
                if let Some(running) = &mut self.running {
                    log::info!("Window resized to {}x{}", new_size.width, new_size.height);
                    running.gpu.resize(new_size);
                }
            }
            WindowEvent::RedrawRequested => {
                self.render();
                // Request another frame immediately
                if let Some(running) = &self.running {
                    running.window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}

/// Simple FPS counter
struct FpsCounter {
    last_update: Instant,
    frame_count: u32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            last_update: Instant::now(),
            frame_count: 0,
        }
    }

    /// Tick the counter, returns Some(fps) every second
    fn tick(&mut self) -> Option<f64> {
        self.frame_count += 1;
        let elapsed = self.last_update.elapsed();

        if elapsed.as_secs_f64() >= 1.0 {
            let fps = self.frame_count as f64 / elapsed.as_secs_f64();
            self.frame_count = 0;
            self.last_update = Instant::now();
            Some(fps)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_without_window_marks_stopped() {
        let mut app = App::new();
        app.shutdown();
        app.shutdown();
        assert!(app.stopped);
        assert!(app.running.is_none());
        // Redraws after shutdown have nothing to step
        app.render();
    }

    #[test]
    fn test_cycle_channel_wraps() {
        let mut color = [0.0, 0.0, 0.0];
        for expected in [0.25, 0.5, 0.75, 1.0, 0.0] {
            color = cycle_channel(color, 1);
            assert_eq!(color[1], expected);
        }
        assert_eq!(color[0], 0.0);
    }
}
