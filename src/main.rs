mod app;
mod config;
mod error;
mod gpu;
mod headless;
mod simulation;

use winit::event_loop::{ControlFlow, EventLoop};

use crate::app::App;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Some(steps) = headless::requested_steps() {
        if let Err(e) = headless::run(steps) {
            log::error!("{}", e);
            std::process::exit(1);
        }
        return;
    }

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {}", e);
        std::process::exit(1);
    }

    if let Some(e) = app.take_init_error() {
        log::error!("Exiting: {}", e);
        std::process::exit(1);
    }
}
