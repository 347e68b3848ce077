/*
 * Flock Module
 *
 * A flock owns an ordered group of boids sharing one policy and one colour.
 * Each tick runs in two passes:
 * 1. Compute: every boid accumulates its forces against a snapshot of the
 *    group taken before the tick, so no boid sees another's in-progress update
 * 2. Integrate: every boid applies its accumulated force and the boundary policy
 *
 * Neither pass shares mutable state between boids, so both run on rayon's
 * pool when parallel processing is enabled.
 */

use log::{debug, trace};
use nannou::prelude::*;
use rand::Rng;
use rayon::prelude::*;

use crate::boid::{AgentId, Boid, Kinematics, Orders, StepContext};
use crate::config::{AgentConfig, Bounds};
use crate::error::ConfigError;
use crate::params::FlockPolicy;
use crate::spatial_grid::SpatialGrid;
use crate::steering::wander_jitter;

pub struct Flock {
    pub group: u32,
    pub name: String,
    pub color: Rgb<u8>,
    boids: Vec<Boid>,
    policy: FlockPolicy,
    bounds: Bounds,
    // Returned by center_of_mass while the flock is empty
    fallback_center: Vec2,
    chases_target: bool,
    leader: Option<usize>,
    spatial_grid: SpatialGrid,
}

impl Flock {
    pub fn new(
        group: u32,
        name: impl Into<String>,
        color: Rgb<u8>,
        bounds: Bounds,
        policy: FlockPolicy,
    ) -> Result<Self, ConfigError> {
        // Spawning samples positions from these bounds
        bounds.validate()?;
        Ok(Self {
            group,
            name: name.into(),
            color,
            boids: Vec::new(),
            policy,
            bounds,
            fallback_center: bounds.center(),
            chases_target: true,
            leader: None,
            spatial_grid: SpatialGrid::new(grid_cell_size(&policy), bounds),
        })
    }

    /// Adds a boid at the end of the group. Its id is reassigned to match
    /// this group and its slot.
    pub fn add(&mut self, mut boid: Boid) {
        boid.id = AgentId::new(self.group, self.boids.len() as u32);
        self.boids.push(boid);
    }

    // Spawn boids at uniformly random positions inside the bounds
    pub fn spawn(&mut self, count: usize, config: &AgentConfig, rng: &mut impl Rng) -> Result<(), ConfigError> {
        self.boids.reserve(count);
        for _ in 0..count {
            let position = vec2(
                rng.gen_range(0.0..self.bounds.width),
                rng.gen_range(0.0..self.bounds.height),
            );
            let id = AgentId::new(self.group, self.boids.len() as u32);
            self.boids.push(Boid::spawn(id, config, position, rng)?);
        }
        Ok(())
    }

    pub fn boids(&self) -> &[Boid] {
        &self.boids
    }

    pub fn len(&self) -> usize {
        self.boids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boids.is_empty()
    }

    pub fn policy(&self) -> &FlockPolicy {
        &self.policy
    }

    pub fn set_policy(&mut self, policy: FlockPolicy) {
        if grid_cell_size(&policy) != self.spatial_grid.cell_size {
            self.spatial_grid = SpatialGrid::new(grid_cell_size(&policy), self.bounds);
        }
        debug!("flock {} policy updated, mode {}", self.name, policy.mode.label());
        self.policy = policy;
    }

    pub fn set_fallback_center(&mut self, center: Vec2) {
        self.fallback_center = center;
    }

    pub fn set_chases_target(&mut self, chases_target: bool) {
        self.chases_target = chases_target;
    }

    pub fn leader(&self) -> Option<usize> {
        self.leader
    }

    /// With a leader set, only the leader seeks the target in chase mode.
    pub fn set_leader(&mut self, leader: Option<usize>) -> Result<(), ConfigError> {
        if let Some(index) = leader {
            if index >= self.boids.len() {
                return Err(ConfigError::LeaderOutOfRange { index, len: self.boids.len() });
            }
        }
        self.leader = leader;
        Ok(())
    }

    pub fn set_field_of_view(&mut self, field_of_view: f32) -> Result<(), ConfigError> {
        for boid in &mut self.boids {
            boid.set_field_of_view(field_of_view)?;
        }
        Ok(())
    }

    // Mean position, or the fallback point when there is nobody to average
    pub fn center_of_mass(&self) -> Vec2 {
        if self.boids.is_empty() {
            return self.fallback_center;
        }
        let sum = self.boids.iter().fold(Vec2::ZERO, |acc, boid| acc + boid.position);
        sum / self.boids.len() as f32
    }

    pub fn snapshot(&self) -> Vec<Kinematics> {
        self.boids.iter().map(Boid::kinematics).collect()
    }

    fn seeks_target(&self, index: usize) -> bool {
        self.chases_target && self.leader.map_or(true, |leader| leader == index)
    }

    // Scale of the whole-group flee when the centre of mass nears the evasion point
    fn group_evasion(&self, evade_point: Option<Vec2>) -> f32 {
        let Some(point) = evade_point else {
            return 0.0;
        };
        let radius = self.policy.steering.group_evasion_radius;
        let distance = self.center_of_mass().distance(point);
        if radius > 0.0 && distance < radius {
            self.policy.weights.group_evasion * (1.0 - distance / radius)
        } else {
            0.0
        }
    }

    /// Advances every boid by one tick, in collection order.
    pub fn step(&mut self, ctx: &StepContext, rng: &mut impl Rng) {
        if self.boids.is_empty() {
            return;
        }

        let policy = self.policy;
        let snapshot = self.snapshot();
        let group_evasion = self.group_evasion(ctx.evade_point);

        // Random draws happen here, in order, so the parallel pass below
        // does not depend on thread scheduling
        let orders: Vec<Orders> = (0..self.boids.len())
            .map(|i| Orders {
                seeks_target: self.seeks_target(i),
                wander_jitter: wander_jitter(&policy.steering, rng),
                group_evasion,
            })
            .collect();

        if policy.enable_spatial_grid {
            self.spatial_grid.rebuild(snapshot.iter().map(|k| k.position));
        }

        let grid = &self.spatial_grid;
        let boids = &mut self.boids;

        // First pass: accumulate forces against the snapshot
        let accumulate = |(i, boid): (usize, &mut Boid)| {
            let candidates: Vec<&Kinematics> = if policy.enable_spatial_grid {
                grid.nearby(snapshot[i].position).into_iter().map(|j| &snapshot[j]).collect()
            } else {
                snapshot.iter().collect()
            };
            boid.accumulate(&candidates, ctx, &policy, orders[i]);
        };

        // Second pass: integrate and keep inside the world
        let integrate = |boid: &mut Boid| {
            boid.update();
            boid.apply_boundary(policy.boundary);
        };

        if policy.enable_parallel {
            boids.par_iter_mut().enumerate().for_each(accumulate);
            boids.par_iter_mut().for_each(integrate);
        } else {
            boids.iter_mut().enumerate().for_each(accumulate);
            boids.iter_mut().for_each(integrate);
        }

        trace!("flock {} stepped {} boids", self.name, self.boids.len());
    }
}

// Cells must be at least as wide as the largest own-group radius
fn grid_cell_size(policy: &FlockPolicy) -> f32 {
    policy.radii.max_own_group() * policy.cell_size_factor.max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obstacle::Obstacle;
    use crate::params::{BehaviorMode, BoundaryPolicy};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn flock_with(policy: FlockPolicy) -> Flock {
        Flock::new(0, "test", rgb(255, 255, 255), Bounds::default(), policy).unwrap()
    }

    fn boid(position: Vec2, velocity: Vec2) -> Boid {
        Boid::configure(AgentId::new(0, 0), &AgentConfig::default(), position, velocity).unwrap()
    }

    #[test]
    fn empty_flock_reports_fallback_center() {
        let flock = flock_with(FlockPolicy::default());
        let center = flock.center_of_mass();
        assert_eq!(center, vec2(400.0, 300.0));
        assert!(!center.x.is_nan());
    }

    #[test]
    fn empty_bounds_are_rejected() {
        let result = Flock::new(0, "flat", rgb(0, 0, 0), Bounds::new(0.0, 600.0), FlockPolicy::default());
        assert!(matches!(result, Err(ConfigError::InvalidBounds { .. })));
    }

    #[test]
    fn center_of_mass_is_mean_position() {
        let mut flock = flock_with(FlockPolicy::default());
        flock.add(boid(vec2(100.0, 100.0), Vec2::ZERO));
        flock.add(boid(vec2(300.0, 200.0), Vec2::ZERO));
        assert_eq!(flock.center_of_mass(), vec2(200.0, 150.0));
    }

    #[test]
    fn add_assigns_sequential_ids() {
        let mut flock = flock_with(FlockPolicy::default());
        flock.add(boid(vec2(1.0, 1.0), Vec2::ZERO));
        flock.add(boid(vec2(2.0, 2.0), Vec2::ZERO));
        let ids: Vec<u32> = flock.boids().iter().map(|b| b.id.index).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn leader_must_exist() {
        let mut flock = flock_with(FlockPolicy::default());
        flock.add(boid(vec2(1.0, 1.0), Vec2::ZERO));
        assert!(flock.set_leader(Some(0)).is_ok());
        assert_eq!(
            flock.set_leader(Some(3)),
            Err(ConfigError::LeaderOutOfRange { index: 3, len: 1 })
        );
        assert_eq!(flock.leader(), Some(0));
    }

    #[test]
    fn step_order_does_not_change_the_outcome() {
        // The same flock stepped sequentially and in parallel must agree exactly
        let mut rng = StdRng::seed_from_u64(21);
        let mut sequential = flock_with(FlockPolicy {
            enable_parallel: false,
            ..FlockPolicy::default()
        });
        sequential.spawn(40, &AgentConfig::default(), &mut rng).unwrap();

        let mut parallel = flock_with(FlockPolicy::default());
        for b in sequential.boids() {
            parallel.add(b.clone());
        }

        let obstacles = [Obstacle::new(vec2(400.0, 300.0), 40.0)];
        let ctx = StepContext::new(&obstacles).with_target(Some(vec2(100.0, 500.0)));
        let mut rng_a = StdRng::seed_from_u64(5);
        let mut rng_b = StdRng::seed_from_u64(5);
        for _ in 0..20 {
            sequential.step(&ctx, &mut rng_a);
            parallel.step(&ctx, &mut rng_b);
        }

        for (a, b) in sequential.boids().iter().zip(parallel.boids()) {
            assert_eq!(a.position, b.position);
            assert_eq!(a.velocity, b.velocity);
        }
    }

    #[test]
    fn spatial_grid_matches_full_scan() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut scanned = flock_with(FlockPolicy {
            enable_spatial_grid: false,
            ..FlockPolicy::default()
        });
        scanned.spawn(60, &AgentConfig::default(), &mut rng).unwrap();

        let mut gridded = flock_with(FlockPolicy::default());
        for b in scanned.boids() {
            gridded.add(b.clone());
        }

        let ctx = StepContext::new(&[]);
        let mut rng_a = StdRng::seed_from_u64(9);
        let mut rng_b = StdRng::seed_from_u64(9);
        for _ in 0..5 {
            scanned.step(&ctx, &mut rng_a);
            gridded.step(&ctx, &mut rng_b);
        }

        for (a, b) in scanned.boids().iter().zip(gridded.boids()) {
            assert_relative_eq!(a.position.x, b.position.x, epsilon = 1e-3);
            assert_relative_eq!(a.position.y, b.position.y, epsilon = 1e-3);
        }
    }

    #[test]
    fn speed_stays_bounded_over_many_ticks() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut flock = flock_with(FlockPolicy {
            mode: BehaviorMode::FlowField,
            boundary: BoundaryPolicy::TurnBack { margin: 40.0, strength: 0.3 },
            ..FlockPolicy::default()
        });
        flock.spawn(50, &AgentConfig::default(), &mut rng).unwrap();
        let obstacles = [Obstacle::new(vec2(300.0, 300.0), 50.0)];
        let ctx = StepContext::new(&obstacles).with_evade_point(Some(vec2(400.0, 300.0)));

        for _ in 0..200 {
            flock.step(&ctx, &mut rng);
            for b in flock.boids() {
                assert!(b.velocity.length() <= b.max_speed + 1e-4);
                assert_eq!(b.acceleration, Vec2::ZERO);
            }
        }
    }

    #[test]
    fn only_the_leader_chases() {
        let policy = FlockPolicy {
            mode: BehaviorMode::Chase,
            enable_spatial_grid: false,
            ..FlockPolicy::default()
        };
        let mut flock = flock_with(policy);
        // Far apart so no flocking rule fires
        flock.add(boid(vec2(100.0, 100.0), Vec2::ZERO));
        flock.add(boid(vec2(700.0, 500.0), Vec2::ZERO));
        flock.set_leader(Some(0)).unwrap();

        let ctx = StepContext::new(&[]).with_target(Some(vec2(400.0, 300.0)));
        let mut rng = StdRng::seed_from_u64(2);
        flock.step(&ctx, &mut rng);

        assert!(flock.boids()[0].velocity.length() > 0.0);
        // Out of every neighbour radius, the follower feels no force at all
        assert_eq!(flock.boids()[1].velocity, Vec2::ZERO);
        assert_eq!(flock.boids()[1].position, vec2(700.0, 500.0));
    }

    #[test]
    fn group_evasion_fades_with_centre_distance() {
        let mut flock = flock_with(FlockPolicy::default());
        flock.add(boid(vec2(100.0, 100.0), Vec2::ZERO));
        let weight = flock.policy().weights.group_evasion;

        assert_eq!(flock.group_evasion(None), 0.0);
        assert_relative_eq!(flock.group_evasion(Some(vec2(100.0, 175.0))), weight * 0.5, epsilon = 1e-5);
        assert_eq!(flock.group_evasion(Some(vec2(100.0, 400.0))), 0.0);
    }
}
