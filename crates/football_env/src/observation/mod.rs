//! Observation Module - structured simulator records and encoded artifacts
//!
//! ## Contents
//!
//! - `ObservationFrame`: ordered per-agent records, validated at the simulator boundary
//! - `Observation`: the artifact a pipeline hands back to the caller, with
//!   encoded vectors and spatial planes held as `ndarray::ArrayD`

mod frame;

pub use frame::{BallOwner, GameMode, ObservationFrame, PlayerObservation, RenderedFrame, StickyActions};

use ndarray::{ArrayD, Axis, IxDyn};
use serde::Serialize;
use thiserror::Error;

use crate::error::{EnvError, EnvResult};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObservationError {
    #[error("Observation frame is empty")]
    EmptyFrame,

    #[error("Expected {expected} agent records, found {found}")]
    AgentCount { expected: usize, found: usize },

    #[error("Record {record}: {team} team has {positions} positions but {directions} directions")]
    TeamLength { record: usize, team: &'static str, positions: usize, directions: usize },

    #[error("Record {record}: {field} index {index} out of range (len {len})")]
    IndexOutOfRange { record: usize, field: &'static str, index: usize, len: usize },

    #[error("Record {record}: team sizes {found:?} differ from {expected:?}")]
    TeamSizeChanged { record: usize, expected: (usize, usize), found: (usize, usize) },

    #[error("Team sizes {left}v{right} not supported, expected {expected} players per side")]
    TeamSize { expected: usize, left: usize, right: usize },

    #[error("Record {record} has no active player")]
    MissingActive { record: usize },

    #[error("Rendered frame missing; enable rendering for pixel representations")]
    MissingFrame,

    #[error("Frame buffer of {len} bytes does not match {width}x{height} RGB")]
    InvalidFrameBuffer { width: u32, height: u32, len: usize },

    #[error("Reward has {rewards} entries for {records} records")]
    RewardCount { rewards: usize, records: usize },
}

// =============================================================================
// Observation artifact
// =============================================================================

/// Encoded observation handed to the caller
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    /// Raw records, no transform
    Raw { frame: ObservationFrame },
    /// Fixed-length float vectors
    Vector { array: ArrayD<f32> },
    /// Spatial planes (HWC, 0..=255)
    Spatial { array: ArrayD<u8> },
}

impl Observation {
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Observation::Raw { frame } => vec![frame.len()],
            Observation::Vector { array } => array.shape().to_vec(),
            Observation::Spatial { array } => array.shape().to_vec(),
        }
    }

    pub fn as_vector(&self) -> Option<&ArrayD<f32>> {
        match self {
            Observation::Vector { array } => Some(array),
            _ => None,
        }
    }

    pub fn as_spatial(&self) -> Option<&ArrayD<u8>> {
        match self {
            Observation::Spatial { array } => Some(array),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&ObservationFrame> {
        match self {
            Observation::Raw { frame } => Some(frame),
            _ => None,
        }
    }

    /// Keep per-agent entries at `indices`
    pub fn select_agents(&self, indices: &[usize]) -> EnvResult<Self> {
        Ok(match self {
            Observation::Raw { frame } => Observation::Raw { frame: frame.select(indices) },
            Observation::Vector { array } => Observation::Vector { array: select_leading(array, indices)? },
            Observation::Spatial { array } => Observation::Spatial { array: select_leading(array, indices)? },
        })
    }
}

/// Stack equally-shaped per-agent rows along a new leading axis
pub(crate) fn stack_rows<T>(rows: Vec<Vec<T>>, row_shape: &[usize]) -> EnvResult<ArrayD<T>> {
    let mut shape = Vec::with_capacity(row_shape.len() + 1);
    shape.push(rows.len());
    shape.extend_from_slice(row_shape);
    let data: Vec<T> = rows.into_iter().flatten().collect();
    Ok(ArrayD::from_shape_vec(IxDyn(&shape), data)?)
}

fn select_leading<T: Clone>(array: &ArrayD<T>, indices: &[usize]) -> EnvResult<ArrayD<T>> {
    let Some(&rows) = array.shape().first() else {
        return Err(EnvError::invariant("cannot select agents from a scalar array"));
    };
    if let Some(&bad) = indices.iter().find(|&&i| i >= rows) {
        return Err(EnvError::invariant(format!("row {} out of range for shape {:?}", bad, array.shape())));
    }
    Ok(array.select(Axis(0), indices))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_rows_checks_row_shape() {
        let a = stack_rows(vec![vec![1.0f32, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]], &[2]).unwrap();
        assert_eq!(a.shape(), &[3, 2]);
        assert!(stack_rows(vec![vec![1u8, 2], vec![3]], &[2]).is_err());
    }

    #[test]
    fn test_select_agents_keeps_requested_rows() {
        let array = stack_rows(vec![vec![1.0f32, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]], &[2]).unwrap();
        let obs = Observation::Vector { array };

        let picked = obs.select_agents(&[2, 0]).unwrap();
        assert_eq!(picked.shape(), vec![2, 2]);
        let values: Vec<f32> = picked.as_vector().unwrap().iter().copied().collect();
        assert_eq!(values, vec![5.0, 6.0, 1.0, 2.0]);

        assert!(obs.select_agents(&[3]).is_err());
    }
}
