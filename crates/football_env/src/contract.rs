//! Observation, reward and action contracts reported by each stage

use serde::{Deserialize, Serialize};

/// Element type of an observation artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    F32,
    U8,
    /// Structured records, no numeric bounds
    Records,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSpec {
    pub shape: Vec<usize>,
    pub element: Element,
    pub low: f32,
    pub high: f32,
}

impl ObservationSpec {
    pub fn vector(shape: Vec<usize>) -> Self {
        Self { shape, element: Element::F32, low: f32::NEG_INFINITY, high: f32::INFINITY }
    }

    pub fn spatial(shape: Vec<usize>) -> Self {
        Self { shape, element: Element::U8, low: 0.0, high: 255.0 }
    }

    pub fn records(agents: usize) -> Self {
        Self { shape: vec![agents], element: Element::Records, low: 0.0, high: 0.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardSpec {
    PerAgent(usize),
    Scalar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSpec {
    /// One discrete action per agent
    MultiDiscrete { agents: usize, actions: usize },
    Discrete { actions: usize },
}
