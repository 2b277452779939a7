//! Values flowing through the pipeline

use serde::Serialize;
use std::sync::Arc;

use crate::error::{EnvError, EnvResult};
use crate::observation::{Observation, ObservationFrame};
use crate::simulator::{Action, SimulatorOutput};

/// Reward as seen at some point of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reward {
    PerAgent(Vec<f32>),
    Single(f32),
}

impl Reward {
    pub fn per_agent(&self) -> Option<&[f32]> {
        match self {
            Reward::PerAgent(v) => Some(v),
            Reward::Single(_) => None,
        }
    }

    pub fn single(&self) -> Option<f32> {
        match self {
            Reward::Single(r) => Some(*r),
            Reward::PerAgent(_) => None,
        }
    }

    /// Sum over agents
    pub fn total(&self) -> f32 {
        match self {
            Reward::PerAgent(v) => v.iter().sum(),
            Reward::Single(r) => *r,
        }
    }

    pub fn select(&self, indices: &[usize]) -> EnvResult<Self> {
        match self {
            Reward::PerAgent(v) => indices
                .iter()
                .map(|&i| {
                    v.get(i).copied().ok_or_else(|| {
                        EnvError::invariant(format!("reward index {i} out of range for {} agents", v.len()))
                    })
                })
                .collect::<EnvResult<Vec<_>>>()
                .map(Reward::PerAgent),
            Reward::Single(_) => Err(EnvError::invariant("cannot select agents from a scalar reward")),
        }
    }

    /// Collapse a one-agent reward to a scalar
    pub fn squeeze(&self) -> EnvResult<Self> {
        match self {
            Reward::PerAgent(v) if v.len() == 1 => Ok(Reward::Single(v[0])),
            other => Err(EnvError::invariant(format!("cannot squeeze reward {other:?}"))),
        }
    }
}

/// Caller actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Actions {
    PerAgent(Vec<Action>),
    Single(Action),
}

impl Actions {
    pub fn into_vec(self) -> Vec<Action> {
        match self {
            Actions::PerAgent(v) => v,
            Actions::Single(a) => vec![a],
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Actions::PerAgent(v) => v.len(),
            Actions::Single(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Action> for Actions {
    fn from(action: Action) -> Self {
        Actions::Single(action)
    }
}

impl From<Vec<Action>> for Actions {
    fn from(actions: Vec<Action>) -> Self {
        Actions::PerAgent(actions)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepInfo {
    /// Unshaped scoring signal
    pub score_reward: Reward,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_mask: Option<Vec<Vec<bool>>>,
}

/// One reset or step result, transformed stage by stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timestep {
    /// Simulator frame before any reduction
    #[serde(skip)]
    pub native: Arc<ObservationFrame>,
    /// Raw records, reduced alongside the observation
    #[serde(skip)]
    pub frame: ObservationFrame,
    pub observation: Observation,
    pub reward: Reward,
    pub done: bool,
    pub info: StepInfo,
    /// Global state, when the representation defines one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Vec<f32>>,
}

impl Timestep {
    pub fn from_output(output: SimulatorOutput) -> Self {
        let SimulatorOutput { frame, reward, done, action_mask } = output;
        Self {
            native: Arc::new(frame.clone()),
            observation: Observation::Raw { frame: frame.clone() },
            frame,
            reward: Reward::PerAgent(reward.clone()),
            done,
            info: StepInfo { score_reward: Reward::PerAgent(reward), action_mask },
            state: None,
        }
    }

    /// Agents currently visible to the caller
    pub fn agents(&self) -> usize {
        self.frame.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_select_and_squeeze() {
        let r = Reward::PerAgent(vec![0.1, 0.2, 0.3]);
        assert_eq!(r.select(&[2]).unwrap(), Reward::PerAgent(vec![0.3]));
        assert_eq!(r.select(&[2]).unwrap().squeeze().unwrap(), Reward::Single(0.3));
        assert!(r.squeeze().is_err());
        assert!(r.select(&[3]).is_err());
        assert!((r.total() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_actions_into_vec() {
        assert_eq!(Actions::from(5usize).into_vec(), vec![5]);
        assert_eq!(Actions::from(vec![1usize, 2]).len(), 2);
    }
}
