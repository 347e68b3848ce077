/*
 * Application Module
 *
 * This module defines the main application model and logic for the front end.
 * It creates the window and control panel, applies parameter edits to the
 * simulation and advances it on a fixed timestep, independent of frame rate.
 */

use std::time::Duration;

use log::{debug, error, info, warn};
use nannou::prelude::*;
use nannou_egui::Egui;

use steering_boids::params::SimulationParams;
use steering_boids::simulation::{FrameInput, Simulation};

use crate::debug::DebugInfo;
use crate::{input, renderer, ui};

// Simulation ticks per second
const TICK_RATE: f32 = 60.0;
// Upper bound on catch-up ticks after a slow frame
const MAX_TICKS_PER_FRAME: usize = 8;

// Main model for the application
pub struct Model {
    pub sim: Simulation,
    // Working copy edited by the control panel
    pub params: SimulationParams,
    pub egui: Egui,
    pub debug_info: DebugInfo,
    // Cursor in world coordinates
    pub mouse_position: Vec2,
    pub target: Option<Vec2>,
    pub step_requested: bool,
    // Fixed timestep variables
    pub physics_accumulator: Duration,
    pub physics_step_size: Duration,
}

// Initialize the model
pub fn model(app: &App) -> Model {
    let params = SimulationParams::from_env();
    let sim = match Simulation::new(params.clone()) {
        Ok(sim) => sim,
        Err(e) => {
            error!("invalid simulation parameters: {}", e);
            std::process::exit(1);
        }
    };
    let bounds = sim.bounds();

    let window_id = match app
        .new_window()
        .title("Steering Boids")
        .size(bounds.width as u32, bounds.height as u32)
        .view(renderer::view)
        .mouse_moved(input::mouse_moved)
        .mouse_pressed(input::mouse_pressed)
        .key_pressed(input::key_pressed)
        .raw_event(input::raw_window_event)
        .build()
    {
        Ok(id) => id,
        Err(e) => {
            error!("failed to create window: {:?}", e);
            std::process::exit(1);
        }
    };

    let Some(window) = app.window(window_id) else {
        error!("window {:?} closed before startup finished", window_id);
        std::process::exit(1);
    };
    let egui = Egui::from_window(&window);

    info!("press F for vision, M for mode, Space to pause, S to step");

    Model {
        sim,
        params,
        egui,
        debug_info: DebugInfo::default(),
        mouse_position: bounds.center(),
        target: None,
        step_requested: false,
        physics_accumulator: Duration::ZERO,
        physics_step_size: Duration::from_secs_f32(1.0 / TICK_RATE),
    }
}

// Update the model
pub fn update(app: &App, model: &mut Model, update: Update) {
    model.debug_info.fps = app.fps();
    model.debug_info.frame_time = update.since_last;

    let action = ui::update_ui(&mut model.egui, &mut model.params, &model.sim, &model.debug_info);

    if action.changes.any() {
        apply_params(model);
    }
    if action.reset {
        reset(model);
    }
    if action.step {
        model.step_requested = true;
    }

    let input = FrameInput { target: model.target };
    let mut ticks = 0;

    if model.params.pause_simulation {
        model.physics_accumulator = Duration::ZERO;
        if std::mem::take(&mut model.step_requested) {
            model.sim.tick(&input);
            ticks = 1;
        }
    } else {
        model.physics_accumulator += update.since_last;
        while model.physics_accumulator >= model.physics_step_size && ticks < MAX_TICKS_PER_FRAME {
            model.sim.tick(&input);
            model.physics_accumulator -= model.physics_step_size;
            ticks += 1;
        }
        // Drop the backlog rather than spiral after a long stall
        if ticks == MAX_TICKS_PER_FRAME {
            model.physics_accumulator = Duration::ZERO;
        }
    }

    model.debug_info.ticks_per_frame = ticks;
}

// Push the edited parameters into the simulation, rolling the edit back if it is rejected
pub fn apply_params(model: &mut Model) {
    match model.sim.apply_params(model.params.clone()) {
        Ok(()) => debug!("applied parameter edit"),
        Err(e) => {
            warn!("rejected parameter change: {}", e);
            model.params.restore_snapshot();
        }
    }
}

pub fn reset(model: &mut Model) {
    if let Err(e) = model.sim.reset() {
        error!("reset failed: {}", e);
    }
}
