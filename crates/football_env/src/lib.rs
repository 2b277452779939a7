//! # football_env - Environment factory for multi-agent football simulation
//!
//! Turns a scenario name plus construction options into a ready-to-step
//! environment: a simulator handle wrapped in an ordered pipeline of stages
//! (reward shaping, observation encoding, action masking, scenario
//! reduction, dump control, squeezing, frame stacking, global state).
//!
//! ## Features
//! - Built-in scenario table with per-scenario controllable player counts
//! - Seven observation representations, including pixel and minimap planes
//! - Composable reward shaping (`scoring`, `checkpoints`)
//! - Local simulators through [`SimulatorFactory`], remote ones through [`RemoteConnector`]

pub mod config;
pub mod contract;
pub mod env;
pub mod error;
pub mod observation;
pub mod pipeline;
pub mod plan;
pub mod representation;
pub mod reward;
pub mod roster;
pub mod scenario;
pub mod simulator;

#[cfg(test)]
mod testing;

// Re-export construction entry points
pub use env::{create_environment, create_environment_with, create_remote_environment, FootballEnv, RemoteOptions};
pub use error::{EnvError, EnvResult};
pub use plan::{CreateOptions, EnvironmentPlan};

// Re-export configuration
pub use config::{ConfigMerger, ConfigOverrides, ConfigValue, EnvironmentConfig, NamedArguments};
pub use roster::{AgentCounts, PlayerSpec, RosterBuilder, RosterPlan};
pub use scenario::{ScenarioConfig, ScenarioResolver};

// Re-export data model
pub use contract::{ActionSpec, Element, ObservationSpec, RewardSpec};
pub use observation::{Observation, ObservationError, ObservationFrame, PlayerObservation};
pub use pipeline::{Actions, Pipeline, Reward, StageKind, StepInfo, Timestep, Transform};
pub use representation::{ChannelDimensions, Representation, RepresentationEncoder};
pub use reward::{CompositeReward, RewardComponent, RewardSet, RewardShaper};

// Re-export simulator boundary
pub use simulator::{
    Action, DumpOptions, RemoteConnector, RemoteRequest, Simulator, SimulatorError, SimulatorFactory,
    SimulatorLayout, SimulatorOutput, BUILTIN_AI_ACTION, DEFAULT_ACTION_SET_SIZE,
};
