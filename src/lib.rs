/*
 * Steering Boids - Module Definitions
 *
 * Core of the simulation: vector helpers, agent configuration, steering and
 * flocking rules, flocks and the simulation that ties them together. The
 * window, controls and drawing live in the binary.
 */

// Re-export key components for easier access
pub use boid::{AgentId, Boid, Kinematics, Neighbor, StepContext};
pub use config::{AgentConfig, Bounds};
pub use error::ConfigError;
pub use flock::Flock;
pub use obstacle::Obstacle;
pub use params::{BehaviorMode, BoundaryPolicy, FlockPolicy, SimulationParams};
pub use simulation::{FrameInput, Simulation};
pub use spatial_grid::SpatialGrid;

// Define modules
pub mod boid;
pub mod config;
pub mod error;
pub mod flock;
pub mod flocking;
pub mod obstacle;
pub mod params;
pub mod simulation;
pub mod spatial_grid;
pub mod steering;
pub mod vector;
