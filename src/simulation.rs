/*
 * Simulation Module
 *
 * Owns every flock, the obstacle layout and the random number generator.
 * A tick snapshots all flocks first and then steps each one against those
 * snapshots, so rival groups also see each other's previous-tick state only.
 *
 * The presentation layer drives it once per frame through `tick` and reads
 * positions and headings back through `flocks`.
 */

use log::{debug, info, trace};
use nannou::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::boid::{Kinematics, StepContext};
use crate::config::Bounds;
use crate::error::ConfigError;
use crate::flock::Flock;
use crate::obstacle::Obstacle;
use crate::params::{BehaviorMode, SimulationParams};

// Inputs the presentation layer supplies each frame
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    pub target: Option<Vec2>,
}

pub struct Simulation {
    params: SimulationParams,
    flocks: Vec<Flock>,
    obstacles: Vec<Obstacle>,
    rng: StdRng,
    seed: u64,
    ticks: u64,
}

impl Simulation {
    pub fn new(params: SimulationParams) -> Result<Self, ConfigError> {
        params.validate()?;
        let seed = params.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let flocks = spawn_flocks(&params, &mut rng)?;

        info!(
            "simulation seeded with {}: {} boids in {} groups, {} obstacles",
            seed,
            flocks.iter().map(Flock::len).sum::<usize>(),
            flocks.len(),
            params.obstacles.len()
        );

        Ok(Self {
            obstacles: params.obstacles.clone(),
            params,
            flocks,
            rng,
            seed,
            ticks: 0,
        })
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn flocks(&self) -> &[Flock] {
        &self.flocks
    }

    // Direct access to one group, for placing boids by hand
    pub fn flock_mut(&mut self, group: usize) -> Option<&mut Flock> {
        self.flocks.get_mut(group)
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn bounds(&self) -> Bounds {
        self.params.agent.bounds
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn total_boids(&self) -> usize {
        self.flocks.iter().map(Flock::len).sum()
    }

    /// Advances every flock by one tick.
    pub fn tick(&mut self, input: &FrameInput) {
        let snapshots: Vec<Vec<Kinematics>> = self.flocks.iter().map(Flock::snapshot).collect();
        let centers: Vec<Vec2> = self.flocks.iter().map(Flock::center_of_mass).collect();

        for (i, flock) in self.flocks.iter_mut().enumerate() {
            let layout = &self.params.groups[i];
            let rival = layout.rival.filter(|&r| !snapshots[r].is_empty());
            let evade_point = if layout.evades_rival { rival.map(|r| centers[r]) } else { None };

            let ctx = StepContext::new(&self.obstacles)
                .with_target(input.target)
                .with_evade_point(evade_point)
                .with_rivals(rival.map(|r| snapshots[r].as_slice()));
            flock.step(&ctx, &mut self.rng);
        }

        self.ticks += 1;
        trace!("tick {} done", self.ticks);
    }

    /// Replaces the parameters. Changes to group layout, agent limits or
    /// obstacles respawn every flock, since those are fixed for the life of
    /// a population; policy and vision changes apply in place.
    pub fn apply_params(&mut self, params: SimulationParams) -> Result<(), ConfigError> {
        params.validate()?;

        let respawn = params.groups != self.params.groups
            || params.agent != self.params.agent
            || params.obstacles != self.params.obstacles;

        if respawn {
            self.params = params;
            return self.reset();
        }

        let field_of_view = params.field_of_view();
        for flock in &mut self.flocks {
            flock.set_policy(params.policy);
            flock.set_field_of_view(field_of_view)?;
        }
        debug!(
            "parameters applied: mode {}, field of view {:.0} degrees",
            params.policy.mode.label(),
            field_of_view.to_degrees()
        );
        self.params = params;
        Ok(())
    }

    // Respawn every flock from the current parameters, continuing the same RNG stream
    pub fn reset(&mut self) -> Result<(), ConfigError> {
        self.flocks = spawn_flocks(&self.params, &mut self.rng)?;
        self.obstacles = self.params.obstacles.clone();
        self.ticks = 0;
        info!("simulation reset: {} boids", self.total_boids());
        Ok(())
    }

    pub fn set_mode(&mut self, mode: BehaviorMode) {
        self.params.policy.mode = mode;
        for flock in &mut self.flocks {
            flock.set_policy(self.params.policy);
        }
    }

    pub fn cycle_mode(&mut self) -> BehaviorMode {
        let mode = self.params.policy.mode.next();
        self.set_mode(mode);
        mode
    }

    // Switch between the wide and narrow field of view
    pub fn toggle_vision(&mut self) -> Result<f32, ConfigError> {
        self.params.narrow_vision = !self.params.narrow_vision;
        let field_of_view = self.params.field_of_view();
        for flock in &mut self.flocks {
            flock.set_field_of_view(field_of_view)?;
        }
        debug!("field of view now {:.0} degrees", field_of_view.to_degrees());
        Ok(field_of_view)
    }

    pub fn set_leader(&mut self, group: usize, leader: Option<usize>) -> Result<(), ConfigError> {
        let groups = self.flocks.len();
        let flock = self
            .flocks
            .get_mut(group)
            .ok_or(ConfigError::UnknownGroup { group, groups })?;
        flock.set_leader(leader)
    }

    /// Group and index of the boid closest to `point` within `radius`.
    pub fn boid_near(&self, point: Vec2, radius: f32) -> Option<(usize, usize)> {
        self.flocks
            .iter()
            .enumerate()
            .flat_map(|(g, flock)| flock.boids().iter().enumerate().map(move |(i, b)| (g, i, b.position.distance(point))))
            .filter(|&(_, _, d)| d <= radius)
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(g, i, _)| (g, i))
    }
}

fn spawn_flocks(params: &SimulationParams, rng: &mut StdRng) -> Result<Vec<Flock>, ConfigError> {
    let config = params.agent_config();
    let bounds = config.bounds;

    params
        .groups
        .iter()
        .enumerate()
        .map(|(g, layout)| {
            let mut flock = Flock::new(g as u32, layout.name.clone(), layout.color, bounds, params.policy)?;
            flock.set_chases_target(layout.chases_target);
            flock.spawn(layout.count, &config, rng)?;
            debug!("spawned {} boids in group {}", layout.count, layout.name);
            Ok(flock)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::BoundaryPolicy;

    fn seeded() -> SimulationParams {
        SimulationParams::default().with_seed(42)
    }

    #[test]
    fn spawns_configured_groups() {
        let sim = Simulation::new(seeded()).unwrap();
        assert_eq!(sim.flocks().len(), 2);
        assert_eq!(sim.total_boids(), 60);
        assert_eq!(sim.obstacles().len(), 3);
        for flock in sim.flocks() {
            for boid in flock.boids() {
                assert!(sim.bounds().contains(boid.position));
            }
        }
    }

    #[test]
    fn invalid_params_are_rejected() {
        let mut params = seeded();
        params.agent.max_force = 0.0;
        assert!(matches!(Simulation::new(params), Err(ConfigError::InvalidMaxForce(_))));
    }

    #[test]
    fn same_seed_same_run() {
        let mut a = Simulation::new(seeded()).unwrap();
        let mut b = Simulation::new(seeded()).unwrap();
        let input = FrameInput { target: Some(vec2(200.0, 200.0)) };
        for _ in 0..30 {
            a.tick(&input);
            b.tick(&input);
        }
        for (fa, fb) in a.flocks().iter().zip(b.flocks()) {
            for (x, y) in fa.boids().iter().zip(fb.boids()) {
                assert_eq!(x.position, y.position);
            }
        }
        assert_eq!(a.ticks(), 30);
    }

    #[test]
    fn invariants_hold_across_modes() {
        let mut sim = Simulation::new(seeded()).unwrap();
        for mode in BehaviorMode::ALL {
            sim.set_mode(mode);
            for t in 0..60 {
                let target = if t % 2 == 0 { Some(vec2(400.0, 300.0)) } else { None };
                sim.tick(&FrameInput { target });
                for flock in sim.flocks() {
                    for boid in flock.boids() {
                        assert!(boid.velocity.length() <= boid.max_speed + 1e-4);
                        assert!(boid.position.x.is_finite() && boid.position.y.is_finite());
                    }
                }
            }
        }
    }

    #[test]
    fn policy_changes_apply_in_place() {
        let mut sim = Simulation::new(seeded()).unwrap();
        let before: Vec<Vec2> = sim.flocks()[0].boids().iter().map(|b| b.position).collect();

        let mut params = sim.params().clone();
        params.policy.boundary = BoundaryPolicy::TurnBack { margin: 30.0, strength: 0.2 };
        params.narrow_vision = true;
        sim.apply_params(params).unwrap();

        let after: Vec<Vec2> = sim.flocks()[0].boids().iter().map(|b| b.position).collect();
        assert_eq!(before, after);
        let narrow = sim.params().narrow_field_of_view;
        assert!(sim.flocks()[0].boids().iter().all(|b| b.field_of_view == narrow));
    }

    #[test]
    fn count_changes_respawn() {
        let mut sim = Simulation::new(seeded()).unwrap();
        sim.tick(&FrameInput::default());

        let mut params = sim.params().clone();
        params.groups[1].count = 5;
        sim.apply_params(params).unwrap();

        assert_eq!(sim.flocks()[1].len(), 5);
        assert_eq!(sim.ticks(), 0);
    }

    #[test]
    fn rejected_params_leave_simulation_untouched() {
        let mut sim = Simulation::new(seeded()).unwrap();
        let mut params = sim.params().clone();
        params.policy.weights.separation = f32::NAN;
        assert!(sim.apply_params(params).is_err());
        assert_eq!(sim.params().policy.weights.separation, 1.5);
    }

    #[test]
    fn vision_toggle_round_trips() {
        let mut sim = Simulation::new(seeded()).unwrap();
        let narrow = sim.toggle_vision().unwrap();
        assert_eq!(narrow, sim.params().narrow_field_of_view);
        let wide = sim.toggle_vision().unwrap();
        assert_eq!(wide, sim.params().wide_field_of_view);
    }

    #[test]
    fn boid_lookup_and_leader_selection() {
        let mut sim = Simulation::new(seeded()).unwrap();
        let spot = sim.flocks()[1].boids()[3].position;
        assert_eq!(sim.boid_near(spot, 0.5), Some((1, 3)));
        assert!(sim.set_leader(1, Some(3)).is_ok());
        assert_eq!(sim.flocks()[1].leader(), Some(3));
        assert!(sim.set_leader(7, None).is_err());
    }

    #[test]
    fn empty_rival_group_is_ignored() {
        let mut params = seeded();
        params.groups[0].count = 0;
        let mut sim = Simulation::new(params).unwrap();
        for _ in 0..10 {
            sim.tick(&FrameInput::default());
        }
        assert!(sim.flocks()[0].is_empty());
        assert_eq!(sim.flocks()[0].center_of_mass(), sim.bounds().center());
    }
}
