//! Simulator boundary
//!
//! The game engine, renderer, trace writer and network transport live
//! outside this crate. They are reached through the [`Simulator`] trait;
//! local handles are built by a [`SimulatorFactory`] from the final merged
//! configuration, remote ones by a [`RemoteConnector`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EnvironmentConfig;
use crate::observation::ObservationFrame;

/// Index into the action set
pub type Action = usize;

/// Size of the default action set
pub const DEFAULT_ACTION_SET_SIZE: usize = 19;

/// Hands a player back to the built-in AI
pub const BUILTIN_AI_ACTION: Action = DEFAULT_ACTION_SET_SIZE;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulatorError {
    #[error("Simulator backend failure: {0}")]
    Backend(String),

    #[error("Simulator handle already closed")]
    Closed,

    #[error("Simulator does not support {0}")]
    Unsupported(&'static str),

    #[error("Expected {expected} actions, got {found}")]
    ActionCount { expected: usize, found: usize },

    #[error("Remote connection failed: {0}")]
    Connection(String),
}

/// Shapes the simulator emits every step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorLayout {
    /// Records per frame (one per controlled player)
    pub controlled_agents: usize,
    pub left_team_size: usize,
    pub right_team_size: usize,
}

/// Trace dumping switches owned by the simulator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpOptions {
    pub dump_scores: bool,
    pub dump_full_episodes: bool,
    pub write_video: bool,
}

impl DumpOptions {
    pub fn disabled() -> Self {
        Self::default()
    }
}

/// One reset/step result as produced by the simulator
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorOutput {
    pub frame: ObservationFrame,
    /// Scoring signal per record
    pub reward: Vec<f32>,
    pub done: bool,
    /// Legal-action mask per record
    pub action_mask: Option<Vec<Vec<bool>>>,
}

pub trait Simulator: Send {
    fn layout(&self) -> SimulatorLayout;

    fn reset(&mut self) -> Result<SimulatorOutput, SimulatorError>;

    /// One action per record of the last frame
    fn step(&mut self, actions: &[Action]) -> Result<SimulatorOutput, SimulatorError>;

    fn render(&mut self) -> Result<(), SimulatorError> {
        Err(SimulatorError::Unsupported("rendering"))
    }

    fn disable_render(&mut self) -> Result<(), SimulatorError> {
        Err(SimulatorError::Unsupported("rendering"))
    }

    fn dump_options(&self) -> DumpOptions {
        DumpOptions::disabled()
    }

    fn set_dump_options(&mut self, _options: DumpOptions) {}

    fn get_state(&self) -> Result<Vec<u8>, SimulatorError> {
        Err(SimulatorError::Unsupported("state snapshots"))
    }

    fn set_state(&mut self, _state: &[u8]) -> Result<(), SimulatorError> {
        Err(SimulatorError::Unsupported("state snapshots"))
    }

    fn close(&mut self) {}
}

/// Builds local simulator handles from the merged configuration
pub trait SimulatorFactory {
    fn create(&self, config: &EnvironmentConfig) -> Result<Box<dyn Simulator>, SimulatorError>;
}

impl<F> SimulatorFactory for F
where
    F: Fn(&EnvironmentConfig) -> Result<Box<dyn Simulator>, SimulatorError>,
{
    fn create(&self, config: &EnvironmentConfig) -> Result<Box<dyn Simulator>, SimulatorError> {
        self(config)
    }
}

/// Credentials and options for a remote game server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRequest {
    pub username: String,
    pub token: String,
    pub model_name: String,
    pub track: String,
    pub include_rendering: bool,
}

pub trait RemoteConnector {
    fn connect(&self, request: &RemoteRequest) -> Result<Box<dyn Simulator>, SimulatorError>;
}

impl<F> RemoteConnector for F
where
    F: Fn(&RemoteRequest) -> Result<Box<dyn Simulator>, SimulatorError>,
{
    fn connect(&self, request: &RemoteRequest) -> Result<Box<dyn Simulator>, SimulatorError> {
        self(request)
    }
}
