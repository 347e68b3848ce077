/*
 * UI Module
 *
 * This module contains functions for creating and updating the user interface
 * using nannou_egui. It provides controls for adjusting simulation parameters.
 * Parameter change detection is handled by the SimulationParams struct.
 */

use nannou_egui::{egui, Egui};

use steering_boids::params::{BehaviorMode, BoundaryPolicy, SimulationParams};
use steering_boids::simulation::Simulation;

use crate::debug::DebugInfo;

// What the app should do after this frame's UI pass
#[derive(Clone, Copy, Debug, Default)]
pub struct UiAction {
    pub reset: bool,
    pub step: bool,
    pub changes: steering_boids::params::ParamChanges,
}

const TURN_BACK_DEFAULT: BoundaryPolicy = BoundaryPolicy::TurnBack { margin: 50.0, strength: 0.2 };

// Update the UI and report resets, single steps and parameter changes
pub fn update_ui(egui: &mut Egui, params: &mut SimulationParams, sim: &Simulation, debug_info: &DebugInfo) -> UiAction {
    let mut action = UiAction::default();

    // Take a snapshot of current parameter values for change detection
    params.take_snapshot();

    let ctx = egui.begin_frame();

    egui::Window::new("Simulation Controls")
        .default_pos([10.0, 10.0])
        .show(&ctx, |ui| {
            ui.collapsing("Groups", |ui| {
                for group in &mut params.groups {
                    ui.add(
                        egui::Slider::new(&mut group.count, SimulationParams::get_group_size_range())
                            .text(group.name.as_str()),
                    );
                }
                ui.add(egui::Slider::new(&mut params.agent.max_speed, SimulationParams::get_max_speed_range()).text("Max Speed"));
                ui.add(egui::Slider::new(&mut params.agent.max_force, SimulationParams::get_max_force_range()).text("Max Force"));
                ui.checkbox(&mut params.narrow_vision, "Narrow Vision");

                if ui.button("Reset Boids").clicked() {
                    action.reset = true;
                }
            });

            ui.collapsing("Behaviour", |ui| {
                egui::ComboBox::from_label("Mode")
                    .selected_text(params.policy.mode.label())
                    .show_ui(ui, |ui| {
                        for mode in BehaviorMode::ALL {
                            ui.selectable_value(&mut params.policy.mode, mode, mode.label());
                        }
                    });

                ui.horizontal(|ui| {
                    ui.radio_value(&mut params.policy.boundary, BoundaryPolicy::Reflect, "Reflect");
                    let turning_back = matches!(params.policy.boundary, BoundaryPolicy::TurnBack { .. });
                    if ui.radio(turning_back, "Turn Back").clicked() && !turning_back {
                        params.policy.boundary = TURN_BACK_DEFAULT;
                    }
                });
                if let BoundaryPolicy::TurnBack { margin, strength } = &mut params.policy.boundary {
                    ui.add(egui::Slider::new(margin, 0.0..=200.0).text("Turn-back Margin"));
                    ui.add(egui::Slider::new(strength, 0.0..=1.0).text("Turn-back Strength"));
                }
            });

            ui.collapsing("Flocking Weights", |ui| {
                let w = &mut params.policy.weights;
                let range = SimulationParams::get_weight_range;
                ui.add(egui::Slider::new(&mut w.separation, range()).text("Separation"));
                ui.add(egui::Slider::new(&mut w.alignment, range()).text("Alignment"));
                ui.add(egui::Slider::new(&mut w.cohesion, range()).text("Cohesion"));
                ui.add(egui::Slider::new(&mut w.rival_separation, range()).text("Rival Separation"));
                ui.add(egui::Slider::new(&mut w.seek, range()).text("Seek"));
                ui.add(egui::Slider::new(&mut w.wander, range()).text("Wander"));
                ui.add(egui::Slider::new(&mut w.flow_field, range()).text("Flow Field"));
                ui.add(egui::Slider::new(&mut w.evasion, range()).text("Evasion"));
                ui.add(egui::Slider::new(&mut w.group_evasion, range()).text("Group Evasion"));
                ui.add(egui::Slider::new(&mut w.obstacle_avoidance, range()).text("Obstacle Avoidance"));
            });

            ui.collapsing("Neighbour Radii", |ui| {
                let r = &mut params.policy.radii;
                let range = SimulationParams::get_radius_range;
                ui.add(egui::Slider::new(&mut r.separation, range()).text("Separation"));
                ui.add(egui::Slider::new(&mut r.alignment, range()).text("Alignment"));
                ui.add(egui::Slider::new(&mut r.cohesion, range()).text("Cohesion"));
                ui.add(egui::Slider::new(&mut r.rival_separation, range()).text("Rival Separation"));
            });

            ui.collapsing("Performance Tuning", |ui| {
                ui.checkbox(&mut params.policy.enable_parallel, "Enable Parallel Processing");
                ui.checkbox(&mut params.policy.enable_spatial_grid, "Enable Spatial Grid");
                ui.add(
                    egui::Slider::new(&mut params.policy.cell_size_factor, SimulationParams::get_cell_size_factor_range())
                        .text("Cell Size Factor"),
                );

                ui.separator();

                // Performance metrics
                ui.label(format!("FPS: {:.1}", debug_info.fps));
                ui.label(format!("Frame time: {:.2} ms", debug_info.frame_time_ms()));
                ui.label(format!("Total Boids: {}", sim.total_boids()));
                ui.label(format!("Seed: {}", sim.seed()));
            });

            ui.checkbox(&mut params.show_debug, "Show Debug Info");
            ui.horizontal(|ui| {
                ui.checkbox(&mut params.pause_simulation, "Pause Simulation");
                if ui.add_enabled(params.pause_simulation, egui::Button::new("Step")).clicked() {
                    action.step = true;
                }
            });
        });

    action.changes = params.detect_changes();
    action
}

// Draw debug information on the screen
pub fn draw_debug_info(draw: &nannou::Draw, debug_info: &DebugInfo, window_rect: nannou::geom::Rect, sim: &Simulation) {
    // Create a background panel in the bottom-left corner
    let margin = 20.0;
    let line_height = 20.0;
    let panel_width = 220.0;
    let panel_height = line_height * 6.0 + margin;
    let panel_x = window_rect.left() + panel_width / 2.0;
    let panel_y = window_rect.bottom() + panel_height / 2.0;

    draw.rect()
        .x_y(panel_x, panel_y)
        .w_h(panel_width, panel_height)
        .color(nannou::color::rgba(0.0, 0.0, 0.0, 0.7));

    let text_x = window_rect.left() + margin;
    let text_y = window_rect.bottom() + panel_height - margin;

    let params = sim.params();
    let debug_texts = [
        format!("FPS: {:.1}", debug_info.fps),
        format!("Frame time: {:.2} ms", debug_info.frame_time_ms()),
        format!("Ticks: {} ({} this frame)", sim.ticks(), debug_info.ticks_per_frame),
        format!("Boids: {}", sim.total_boids()),
        format!("Mode: {}", params.policy.mode.label()),
        format!("Vision: {:.0} deg", params.field_of_view().to_degrees()),
    ];

    for (i, text) in debug_texts.iter().enumerate() {
        let y = text_y - (i as f32 * line_height);

        // Position the text with a fixed offset from the left edge
        draw.text(text)
            .x_y(text_x + 80.0, y)
            .color(nannou::color::WHITE)
            .font_size(14);
    }
}
