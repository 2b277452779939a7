use ndarray::{ArrayD, Axis};

use crate::contract::{ObservationSpec, RewardSpec};
use crate::error::{EnvError, EnvResult};
use crate::observation::Observation;
use crate::pipeline::{Timestep, Transform};

fn squeeze_leading<T>(array: ArrayD<T>) -> EnvResult<ArrayD<T>> {
    if array.shape().first() != Some(&1) {
        return Err(EnvError::invariant(format!("cannot squeeze leading axis of shape {:?}", array.shape())));
    }
    Ok(array.index_axis_move(Axis(0), 0))
}

/// Drops the agent axis of a one-agent observation
#[derive(Debug, Clone, Copy, Default)]
pub struct ObservationSqueeze;

impl ObservationSqueeze {
    fn squeeze(ts: &mut Timestep) -> EnvResult<()> {
        let observation = std::mem::replace(&mut ts.observation, Observation::Raw { frame: Default::default() });
        ts.observation = match observation {
            Observation::Vector { array } => Observation::Vector { array: squeeze_leading(array)? },
            Observation::Spatial { array } => Observation::Spatial { array: squeeze_leading(array)? },
            Observation::Raw { .. } => {
                return Err(EnvError::invariant("raw observations are never squeezed"));
            }
        };
        Ok(())
    }
}

impl Transform for ObservationSqueeze {
    fn name(&self) -> &'static str {
        "observation_squeeze"
    }

    fn on_reset(&mut self, ts: &mut Timestep) -> EnvResult<()> {
        Self::squeeze(ts)
    }

    fn on_step(&mut self, ts: &mut Timestep) -> EnvResult<()> {
        Self::squeeze(ts)
    }

    fn observation_contract(&self, mut spec: ObservationSpec) -> EnvResult<ObservationSpec> {
        if spec.shape.first() != Some(&1) {
            return Err(EnvError::invariant(format!("cannot squeeze observation shape {:?}", spec.shape)));
        }
        spec.shape.remove(0);
        Ok(spec)
    }
}

/// Collapses a one-agent reward to a scalar
#[derive(Debug, Clone, Copy, Default)]
pub struct RewardSqueeze;

impl RewardSqueeze {
    fn squeeze(ts: &mut Timestep) -> EnvResult<()> {
        ts.reward = ts.reward.squeeze()?;
        ts.info.score_reward = ts.info.score_reward.squeeze()?;
        Ok(())
    }
}

impl Transform for RewardSqueeze {
    fn name(&self) -> &'static str {
        "reward_squeeze"
    }

    fn on_reset(&mut self, ts: &mut Timestep) -> EnvResult<()> {
        Self::squeeze(ts)
    }

    fn on_step(&mut self, ts: &mut Timestep) -> EnvResult<()> {
        Self::squeeze(ts)
    }

    fn reward_contract(&self, _spec: RewardSpec) -> RewardSpec {
        RewardSpec::Scalar
    }
}
