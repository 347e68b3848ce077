/*
 * Input Module
 *
 * This module handles user input events for the front end.
 *
 * Features:
 * - Left click places the target, right click clears it
 * - Shift + left click makes the boid under the cursor its group's leader,
 *   or clears every leader when nothing is there
 * - F toggles narrow vision and M cycles the behaviour mode
 * - Space pauses, S single-steps while paused, R respawns every group
 */

use log::{info, warn};
use nannou::prelude::*;
use nannou::winit::event::{MouseButton, WindowEvent};

use crate::app::{self, Model};
use crate::renderer::screen_to_world;

// Pick radius around the cursor when selecting a leader
const SELECTION_RADIUS: f32 = 12.0;

// Mouse moved event handler
pub fn mouse_moved(_app: &App, model: &mut Model, pos: Point2) {
    model.mouse_position = screen_to_world(pos, model.sim.bounds());
}

// Mouse pressed event handler
pub fn mouse_pressed(app: &App, model: &mut Model, button: MouseButton) {
    // Clicks on the control panel belong to egui
    if model.egui.ctx().is_pointer_over_area() {
        return;
    }

    match button {
        MouseButton::Left if app.keys.mods.shift() => select_leader(model),
        MouseButton::Left => model.target = Some(model.mouse_position),
        MouseButton::Right => model.target = None,
        _ => {}
    }
}

fn select_leader(model: &mut Model) {
    match model.sim.boid_near(model.mouse_position, SELECTION_RADIUS) {
        Some((group, index)) => {
            if let Err(e) = model.sim.set_leader(group, Some(index)) {
                warn!("could not select leader: {}", e);
                return;
            }
            info!("boid {} leads group {}", index, model.sim.flocks()[group].name);
        }
        None => {
            for group in 0..model.sim.flocks().len() {
                if let Err(e) = model.sim.set_leader(group, None) {
                    warn!("could not clear leader: {}", e);
                }
            }
            info!("leaders cleared");
        }
    }
}

pub fn key_pressed(_app: &App, model: &mut Model, key: Key) {
    if model.egui.ctx().wants_keyboard_input() {
        return;
    }

    match key {
        Key::F => match model.sim.toggle_vision() {
            Ok(field_of_view) => {
                model.params.narrow_vision = model.sim.params().narrow_vision;
                info!("field of view {:.0} degrees", field_of_view.to_degrees());
            }
            Err(e) => warn!("could not change field of view: {}", e),
        },
        Key::M => {
            let mode = model.sim.cycle_mode();
            model.params.policy.mode = mode;
            info!("behaviour mode: {}", mode.label());
        }
        Key::Space => {
            model.params.pause_simulation = !model.params.pause_simulation;
        }
        Key::S => model.step_requested = true,
        Key::R => app::reset(model),
        _ => {}
    }
}

// Handle raw window events for egui
pub fn raw_window_event(_app: &App, model: &mut Model, event: &WindowEvent) {
    model.egui.handle_raw_event(event);
}
