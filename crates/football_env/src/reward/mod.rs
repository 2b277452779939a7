//! Reward shaping
//!
//! The requested reward set is a comma-separated list of component names.
//! `scoring` is mandatory and passes the simulator's scoring signal through;
//! `checkpoints` adds a dense bonus for carrying the ball towards the
//! opponent goal.
//!
//! ## Components
//!
//! - `RewardShaper` trait: per-agent contribution of one component
//! - `ScoringReward`: simulator scoring signal, unchanged
//! - `CheckpointReward`: once-per-zone progress bonus
//! - `CompositeReward`: sums the components of a `RewardSet`

mod checkpoint;
mod scoring;

pub use checkpoint::{CheckpointReward, CHECKPOINT_COUNT, CHECKPOINT_REWARD};
pub use scoring::ScoringReward;

use serde::Serialize;
use std::fmt;
use tracing::warn;

use crate::error::{EnvError, EnvResult};
use crate::observation::{ObservationFrame, PlayerObservation};

// =============================================================================
// RewardShaper Trait
// =============================================================================

pub trait RewardShaper: Send + fmt::Debug {
    /// Contribution of this component for agent `agent`
    ///
    /// `score` is the simulator's scoring signal for that agent.
    fn compute(&mut self, agent: usize, record: &PlayerObservation, score: f32) -> f32;

    fn name(&self) -> &str;

    /// Called on episode reset
    fn reset(&mut self) {}
}

// =============================================================================
// RewardSet
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardComponent {
    Scoring,
    Checkpoints,
}

impl RewardComponent {
    pub fn key(&self) -> &'static str {
        match self {
            RewardComponent::Scoring => "scoring",
            RewardComponent::Checkpoints => "checkpoints",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "scoring" => Some(RewardComponent::Scoring),
            "checkpoints" => Some(RewardComponent::Checkpoints),
            _ => None,
        }
    }
}

/// Parsed reward component list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RewardSet {
    components: Vec<RewardComponent>,
}

impl RewardSet {
    pub fn parse(rewards: &str) -> EnvResult<Self> {
        let mut components = Vec::new();
        for name in rewards.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match RewardComponent::from_key(name) {
                Some(c) if !components.contains(&c) => components.push(c),
                Some(_) => {}
                None => warn!(component = name, "Ignoring unknown reward component"),
            }
        }

        if !components.contains(&RewardComponent::Scoring) {
            return Err(EnvError::config("rewards", rewards, "reward set must include scoring"));
        }
        Ok(Self { components })
    }

    pub fn contains(&self, component: RewardComponent) -> bool {
        self.components.contains(&component)
    }

    pub fn components(&self) -> &[RewardComponent] {
        &self.components
    }

    pub fn build(&self) -> CompositeReward {
        let mut composite = CompositeReward::new().add(Box::new(ScoringReward));
        if self.contains(RewardComponent::Checkpoints) {
            composite = composite.add(Box::new(CheckpointReward::new()));
        }
        composite
    }
}

impl fmt::Display for RewardSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let keys: Vec<_> = self.components.iter().map(|c| c.key()).collect();
        f.write_str(&keys.join(","))
    }
}

// =============================================================================
// CompositeReward
// =============================================================================

/// Sum of reward components
#[derive(Debug, Default)]
pub struct CompositeReward {
    shapers: Vec<Box<dyn RewardShaper>>,
}

impl CompositeReward {
    pub fn new() -> Self {
        Self { shapers: Vec::new() }
    }

    pub fn add(mut self, shaper: Box<dyn RewardShaper>) -> Self {
        self.shapers.push(shaper);
        self
    }

    pub fn len(&self) -> usize {
        self.shapers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.shapers.iter().map(|s| s.name()).collect()
    }

    /// Shaped reward per record
    pub fn shape(&mut self, frame: &ObservationFrame, scores: &[f32]) -> Vec<f32> {
        frame
            .iter()
            .zip(scores)
            .enumerate()
            .map(|(agent, (record, &score))| {
                self.shapers.iter_mut().map(|s| s.compute(agent, record, score)).sum()
            })
            .collect()
    }

    pub fn reset(&mut self) {
        for shaper in &mut self.shapers {
            shaper.reset();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
