/*
 * Steering Boids
 *
 * Interactive front end for the steering-boids library. Two groups of
 * autonomous agents flock, chase a target placed with the mouse, wander,
 * follow a flow field and steer around obstacles, while a control panel
 * edits the simulation parameters live.
 *
 * Logging is configured through RUST_LOG (default "info") and the RNG seed
 * through BOIDS_SEED.
 */

mod app;
mod debug;
mod input;
mod renderer;
mod ui;

use env_logger::{Builder, Env};

fn main() {
    Builder::from_env(Env::default().default_filter_or("info"))
        // The graphics stack is chatty at info
        .filter_module("wgpu_core", log::LevelFilter::Warn)
        .filter_module("wgpu_hal", log::LevelFilter::Warn)
        .filter_module("naga", log::LevelFilter::Warn)
        .init();

    nannou::app(app::model).update(app::update).run();
}
