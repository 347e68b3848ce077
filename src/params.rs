/*
 * Simulation Parameters Module
 *
 * This module defines the SimulationParams struct that contains all the
 * adjustable parameters for the simulation: force weights, neighbour radii,
 * steering constants, the active behaviour mode, the boundary policy and the
 * group/obstacle layout used at startup. The presentation layer edits these
 * through its control panel; snapshot-based change detection tells it what
 * has to be pushed back into the running simulation.
 */

use std::env;
use std::f32::consts::TAU;

use log::warn;
use nannou::prelude::*;

use crate::config::{validate_field_of_view, AgentConfig};
use crate::error::ConfigError;
use crate::obstacle::Obstacle;

// Environment variable holding the RNG seed
pub const SEED_ENV_VAR: &str = "BOIDS_SEED";

// Goal behaviour applied on top of the flocking rules
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BehaviorMode {
    /// No goal force: flocking, evasion and avoidance only.
    Drift,
    /// Seek the target when one is supplied, wander otherwise.
    Chase,
    Wander,
    FlowField,
}

impl BehaviorMode {
    pub const ALL: [BehaviorMode; 4] = [
        BehaviorMode::Drift,
        BehaviorMode::Chase,
        BehaviorMode::Wander,
        BehaviorMode::FlowField,
    ];

    pub fn next(self) -> Self {
        match self {
            BehaviorMode::Drift => BehaviorMode::Chase,
            BehaviorMode::Chase => BehaviorMode::Wander,
            BehaviorMode::Wander => BehaviorMode::FlowField,
            BehaviorMode::FlowField => BehaviorMode::Drift,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BehaviorMode::Drift => "Drift",
            BehaviorMode::Chase => "Chase",
            BehaviorMode::Wander => "Wander",
            BehaviorMode::FlowField => "Flow field",
        }
    }
}

// What happens when an agent reaches the edge of the world
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BoundaryPolicy {
    /// Invert the velocity component on the axis that left [0, width] or [0, height].
    Reflect,
    /// Within `margin` of an edge, nudge the velocity inward by `strength` per tick.
    TurnBack { margin: f32, strength: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlockWeights {
    pub separation: f32,
    pub alignment: f32,
    pub cohesion: f32,
    pub rival_separation: f32,
    pub seek: f32,
    pub wander: f32,
    pub flow_field: f32,
    pub evasion: f32,
    pub group_evasion: f32,
    pub obstacle_avoidance: f32,
}

impl Default for FlockWeights {
    fn default() -> Self {
        Self {
            separation: 1.5,
            alignment: 1.0,
            cohesion: 1.0,
            rival_separation: 3.0,
            seek: 1.0,
            wander: 1.0,
            flow_field: 1.0,
            evasion: 1.0,
            group_evasion: 1.5,
            obstacle_avoidance: 2.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NeighborRadii {
    pub separation: f32,
    pub alignment: f32,
    pub cohesion: f32,
    pub rival_separation: f32,
}

impl Default for NeighborRadii {
    fn default() -> Self {
        Self {
            separation: 30.0,
            alignment: 75.0,
            cohesion: 250.0,
            rival_separation: 30.0,
        }
    }
}

impl NeighborRadii {
    pub fn max_own_group(&self) -> f32 {
        self.separation.max(self.alignment).max(self.cohesion)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SteeringParams {
    pub slowing_radius: f32,
    pub wander_radius: f32,
    pub wander_distance: f32,
    pub wander_jitter: f32,
    pub flow_scale: f32,
    pub obstacle_margin: f32,
    pub evasion_radius: f32,
    pub group_evasion_radius: f32,
}

impl Default for SteeringParams {
    fn default() -> Self {
        Self {
            slowing_radius: 100.0,
            wander_radius: 25.0,
            wander_distance: 55.0,
            wander_jitter: 0.3,
            flow_scale: 0.01,
            obstacle_margin: 50.0,
            evasion_radius: 100.0,
            group_evasion_radius: 150.0,
        }
    }
}

// Everything one group needs to evaluate a tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlockPolicy {
    pub weights: FlockWeights,
    pub radii: NeighborRadii,
    pub steering: SteeringParams,
    pub mode: BehaviorMode,
    pub boundary: BoundaryPolicy,
    // Performance settings
    pub enable_parallel: bool,
    pub enable_spatial_grid: bool,
    pub cell_size_factor: f32, // Multiplier for cell size relative to the largest radius
}

impl Default for FlockPolicy {
    fn default() -> Self {
        Self {
            weights: FlockWeights::default(),
            radii: NeighborRadii::default(),
            steering: SteeringParams::default(),
            mode: BehaviorMode::Chase,
            boundary: BoundaryPolicy::Reflect,
            enable_parallel: true,
            enable_spatial_grid: true,
            cell_size_factor: 1.0,
        }
    }
}

impl FlockPolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.weights;
        let r = &self.radii;
        let s = &self.steering;
        let checks: [(&'static str, f32); 23] = [
            ("separation weight", w.separation),
            ("alignment weight", w.alignment),
            ("cohesion weight", w.cohesion),
            ("rival separation weight", w.rival_separation),
            ("seek weight", w.seek),
            ("wander weight", w.wander),
            ("flow field weight", w.flow_field),
            ("evasion weight", w.evasion),
            ("group evasion weight", w.group_evasion),
            ("obstacle avoidance weight", w.obstacle_avoidance),
            ("separation radius", r.separation),
            ("alignment radius", r.alignment),
            ("cohesion radius", r.cohesion),
            ("rival separation radius", r.rival_separation),
            ("slowing radius", s.slowing_radius),
            ("wander radius", s.wander_radius),
            ("wander distance", s.wander_distance),
            ("wander jitter", s.wander_jitter),
            ("flow scale", s.flow_scale),
            ("obstacle margin", s.obstacle_margin),
            ("evasion radius", s.evasion_radius),
            ("group evasion radius", s.group_evasion_radius),
            ("cell size factor", self.cell_size_factor),
        ];
        for (name, value) in checks {
            non_negative(name, value)?;
        }
        // Cells narrower than the largest radius would miss neighbours
        if self.cell_size_factor < 1.0 {
            return Err(ConfigError::InvalidParameter { name: "cell size factor", value: self.cell_size_factor });
        }
        if let BoundaryPolicy::TurnBack { margin, strength } = self.boundary {
            non_negative("turn-back margin", margin)?;
            non_negative("turn-back strength", strength)?;
        }
        if w.separation < w.alignment || w.separation < w.cohesion {
            warn!(
                "separation weight {} is below alignment {} or cohesion {}; agents may overlap",
                w.separation, w.alignment, w.cohesion
            );
        }
        Ok(())
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter { name, value })
    }
}

// One group spawned at startup
#[derive(Clone, Debug, PartialEq)]
pub struct GroupSpec {
    pub name: String,
    pub color: Rgb<u8>,
    pub count: usize,
    /// Seek the user target in chase mode.
    pub chases_target: bool,
    /// Index of the opposing group used for cross-group separation.
    pub rival: Option<usize>,
    /// Flee the rival group's centre of mass.
    pub evades_rival: bool,
}

// Parameters for the simulation that can be adjusted via UI
#[derive(Clone, Debug)]
pub struct SimulationParams {
    pub agent: AgentConfig,
    pub policy: FlockPolicy,
    pub groups: Vec<GroupSpec>,
    pub obstacles: Vec<Obstacle>,
    pub wide_field_of_view: f32,
    pub narrow_field_of_view: f32,
    pub narrow_vision: bool,
    pub seed: Option<u64>,
    pub show_debug: bool,
    pub pause_simulation: bool,

    // Internal state for tracking changes
    previous_values: Option<ParamSnapshot>,
}

// A snapshot of parameter values used for change detection
#[derive(Clone, Debug)]
struct ParamSnapshot {
    policy: FlockPolicy,
    max_speed: f32,
    max_force: f32,
    narrow_vision: bool,
    group_counts: Vec<usize>,
}

// What changed since the last snapshot
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParamChanges {
    pub policy: bool,
    pub agents: bool,
    pub group_counts: bool,
}

impl ParamChanges {
    pub fn any(&self) -> bool {
        self.policy || self.agents || self.group_counts
    }
}

impl Default for SimulationParams {
    fn default() -> Self {
        let agent = AgentConfig::default();
        Self {
            agent,
            policy: FlockPolicy::default(),
            groups: vec![
                GroupSpec {
                    name: "Hunters".to_string(),
                    color: rgb(255, 0, 0),
                    count: 30,
                    chases_target: true,
                    rival: Some(1),
                    evades_rival: false,
                },
                GroupSpec {
                    name: "Prey".to_string(),
                    color: rgb(50, 150, 255),
                    count: 30,
                    chases_target: false,
                    rival: Some(0),
                    evades_rival: true,
                },
            ],
            obstacles: vec![
                Obstacle::new(vec2(200.0, 150.0), 30.0),
                Obstacle::new(vec2(600.0, 200.0), 40.0),
                Obstacle::new(vec2(400.0, 450.0), 35.0),
            ],
            wide_field_of_view: agent.field_of_view,
            narrow_field_of_view: 120.0_f32.to_radians(),
            narrow_vision: false,
            seed: None,
            show_debug: false,
            pause_simulation: false,
            previous_values: None,
        }
    }
}

impl SimulationParams {
    // Defaults with the seed taken from the environment, if set
    pub fn from_env() -> Self {
        Self {
            seed: seed_from_env(),
            ..Self::default()
        }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.agent.validate()?;
        self.policy.validate()?;
        validate_field_of_view(self.wide_field_of_view)?;
        validate_field_of_view(self.narrow_field_of_view)?;
        for obstacle in &self.obstacles {
            non_negative("obstacle radius", obstacle.radius)?;
        }
        let groups = self.groups.len();
        for (group, layout) in self.groups.iter().enumerate() {
            if let Some(rival) = layout.rival {
                if rival >= groups || rival == group {
                    return Err(ConfigError::UnknownRival { group, rival, groups });
                }
            }
        }
        Ok(())
    }

    // Field of view currently selected by the vision toggle
    pub fn field_of_view(&self) -> f32 {
        if self.narrow_vision {
            self.narrow_field_of_view
        } else {
            self.wide_field_of_view
        }
    }

    // Agent construction parameters with the active field of view applied
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            field_of_view: self.field_of_view(),
            ..self.agent
        }
    }

    // Take a snapshot of current parameter values for change detection
    pub fn take_snapshot(&mut self) {
        self.previous_values = Some(ParamSnapshot {
            policy: self.policy,
            max_speed: self.agent.max_speed,
            max_force: self.agent.max_force,
            narrow_vision: self.narrow_vision,
            group_counts: self.groups.iter().map(|g| g.count).collect(),
        });
    }

    // Check which parameters have changed since the last snapshot
    pub fn detect_changes(&self) -> ParamChanges {
        // If we don't have previous values, nothing has changed
        let Some(prev) = &self.previous_values else {
            return ParamChanges::default();
        };

        let counts: Vec<usize> = self.groups.iter().map(|g| g.count).collect();
        ParamChanges {
            policy: self.policy != prev.policy,
            agents: self.agent.max_speed != prev.max_speed
                || self.agent.max_force != prev.max_force
                || self.narrow_vision != prev.narrow_vision,
            group_counts: counts != prev.group_counts,
        }
    }

    // Put back the values from the last snapshot, used when an edit is rejected
    pub fn restore_snapshot(&mut self) {
        if let Some(prev) = self.previous_values.clone() {
            self.policy = prev.policy;
            self.agent.max_speed = prev.max_speed;
            self.agent.max_force = prev.max_force;
            self.narrow_vision = prev.narrow_vision;
            for (group, count) in self.groups.iter_mut().zip(prev.group_counts) {
                group.count = count;
            }
        }
    }

    // Get parameter ranges for UI sliders
    pub fn get_group_size_range() -> std::ops::RangeInclusive<usize> {
        0..=500
    }

    pub fn get_max_speed_range() -> std::ops::RangeInclusive<f32> {
        0.5..=10.0
    }

    pub fn get_max_force_range() -> std::ops::RangeInclusive<f32> {
        0.01..=1.0
    }

    pub fn get_weight_range() -> std::ops::RangeInclusive<f32> {
        0.0..=5.0
    }

    pub fn get_radius_range() -> std::ops::RangeInclusive<f32> {
        5.0..=300.0
    }

    pub fn get_cell_size_factor_range() -> std::ops::RangeInclusive<f32> {
        1.0..=4.0
    }
}

pub fn seed_from_env() -> Option<u64> {
    env::var(SEED_ENV_VAR).ok().and_then(|s| s.trim().parse::<u64>().ok())
}

// Full circle, for callers that want field-of-view gating disabled
pub const FULL_CIRCLE: f32 = TAU;
