use super::{Representation, RepresentationEncoder};
use crate::contract::ObservationSpec;
use crate::error::EnvResult;
use crate::observation::{Observation, ObservationFrame};
use crate::simulator::SimulatorLayout;

/// Passes the records through untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct RawEncoder;

impl RepresentationEncoder for RawEncoder {
    fn representation(&self) -> Representation {
        Representation::Raw
    }

    fn encode(&self, frame: &ObservationFrame) -> EnvResult<Observation> {
        Ok(Observation::Raw { frame: frame.clone() })
    }

    fn observation_spec(&self, layout: &SimulatorLayout) -> EnvResult<ObservationSpec> {
        Ok(ObservationSpec::records(layout.controlled_agents))
    }
}
