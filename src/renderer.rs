/*
 * Renderer Module
 *
 * This module handles the rendering of the simulation. The world spans
 * [0, width] x [0, height] with y growing downward; nannou's window is
 * centred on the origin with y growing upward, so every position goes
 * through world_to_screen before it is drawn.
 */

use log::error;
use nannou::prelude::*;

use steering_boids::boid::Boid;
use steering_boids::config::Bounds;

use crate::app::Model;
use crate::ui;

// Point-sized agents still get a visible triangle
const MIN_BOID_SIZE: f32 = 2.0;

pub fn world_to_screen(point: Vec2, bounds: Bounds) -> Point2 {
    pt2(point.x - bounds.width / 2.0, bounds.height / 2.0 - point.y)
}

pub fn screen_to_world(point: Point2, bounds: Bounds) -> Vec2 {
    vec2(point.x + bounds.width / 2.0, bounds.height / 2.0 - point.y)
}

// Render the model
pub fn view(app: &App, model: &Model, frame: Frame) {
    let draw = app.draw();
    draw.background().color(BLACK);

    let bounds = model.sim.bounds();

    // World boundary
    draw.rect()
        .x_y(0.0, 0.0)
        .w_h(bounds.width, bounds.height)
        .no_fill()
        .stroke_weight(1.0)
        .stroke(rgba(0.3, 0.3, 0.3, 1.0));

    for obstacle in model.sim.obstacles() {
        draw.ellipse()
            .xy(world_to_screen(obstacle.position, bounds))
            .radius(obstacle.radius)
            .color(rgba(0.5, 0.5, 0.5, 0.6));
    }

    for flock in model.sim.flocks() {
        let leader = flock.leader();
        for (i, boid) in flock.boids().iter().enumerate() {
            draw_boid(&draw, boid, flock.color, leader == Some(i), bounds);
        }
    }

    if let Some(target) = model.target {
        draw.ellipse()
            .xy(world_to_screen(target, bounds))
            .radius(6.0)
            .no_fill()
            .stroke(YELLOW)
            .stroke_weight(2.0);
    }

    if model.params.show_debug {
        draw_perception(&draw, model, bounds);
        ui::draw_debug_info(&draw, &model.debug_info, app.window_rect(), &model.sim);
    }

    if let Err(e) = draw.to_frame(app, &frame) {
        error!("failed to draw frame: {:?}", e);
    }
    if let Err(e) = model.egui.draw_to_frame(&frame) {
        error!("failed to draw control panel: {:?}", e);
    }
}

fn boid_size(boid: &Boid, is_leader: bool) -> f32 {
    let size = boid.radius.max(MIN_BOID_SIZE);
    if is_leader {
        size * 1.8
    } else {
        size
    }
}

// Nose, left and right corners of a triangle pointing along the heading
fn boid_outline(boid: &Boid, size: f32) -> [Vec2; 3] {
    let angle = boid.heading_angle();
    let forward = vec2(angle.cos(), angle.sin());
    let side = vec2(-forward.y, forward.x);

    [
        boid.position + forward * size * 1.5,
        boid.position - forward * size + side * size * 0.8,
        boid.position - forward * size - side * size * 0.8,
    ]
}

fn draw_boid(draw: &Draw, boid: &Boid, color: Rgb<u8>, is_leader: bool, bounds: Bounds) {
    let size = boid_size(boid, is_leader);
    let [nose, left, right] = boid_outline(boid, size);

    draw.tri()
        .points(
            world_to_screen(nose, bounds),
            world_to_screen(left, bounds),
            world_to_screen(right, bounds),
        )
        .color(color);

    if is_leader {
        draw.ellipse()
            .xy(world_to_screen(boid.position, bounds))
            .radius(size * 2.0)
            .no_fill()
            .stroke(WHITE)
            .stroke_weight(1.0);
    }
}

// Neighbour radii and velocity of the first boid of the first non-empty group
fn draw_perception(draw: &Draw, model: &Model, bounds: Bounds) {
    let Some(boid) = model.sim.flocks().iter().find_map(|f| f.boids().first()) else {
        return;
    };
    let center = world_to_screen(boid.position, bounds);
    let radii = &model.sim.params().policy.radii;

    for (radius, color) in [(radii.separation, RED), (radii.alignment, GREEN), (radii.cohesion, BLUE)] {
        draw.ellipse()
            .xy(center)
            .radius(radius)
            .no_fill()
            .stroke(color)
            .stroke_weight(1.0);
    }

    draw.arrow()
        .start(center)
        .end(world_to_screen(boid.position + boid.velocity * 10.0, bounds))
        .color(YELLOW)
        .stroke_weight(2.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use steering_boids::boid::AgentId;
    use steering_boids::config::AgentConfig;

    #[test]
    fn world_corners_map_to_window_corners() {
        let bounds = Bounds::new(800.0, 600.0);
        assert_eq!(world_to_screen(vec2(0.0, 0.0), bounds), pt2(-400.0, 300.0));
        assert_eq!(world_to_screen(vec2(800.0, 600.0), bounds), pt2(400.0, -300.0));
        assert_eq!(world_to_screen(bounds.center(), bounds), pt2(0.0, 0.0));
    }

    #[test]
    fn screen_to_world_inverts_world_to_screen() {
        let bounds = Bounds::new(800.0, 600.0);
        let p = vec2(123.0, 456.0);
        assert_eq!(screen_to_world(world_to_screen(p, bounds), bounds), p);
    }

    fn boid_with_radius(radius: f32) -> Boid {
        let config = AgentConfig { radius, ..AgentConfig::default() };
        Boid::configure(AgentId::new(0, 0), &config, vec2(100.0, 100.0), vec2(1.0, 0.0)).unwrap()
    }

    #[test]
    fn triangle_scales_with_agent_radius() {
        let small = boid_with_radius(4.0);
        let large = boid_with_radius(10.0);

        let [nose, _, _] = boid_outline(&small, boid_size(&small, false));
        assert_eq!(nose, vec2(106.0, 100.0));
        let [nose, left, right] = boid_outline(&large, boid_size(&large, false));
        assert_eq!(nose, vec2(115.0, 100.0));
        assert_eq!(left.x, 90.0);
        assert_eq!((left.y - right.y).abs(), 16.0);

        assert_eq!(boid_size(&large, true), 18.0);
        assert_eq!(boid_size(&boid_with_radius(0.0), false), MIN_BOID_SIZE);
    }
}
