use std::sync::Arc;

use crate::contract::ObservationSpec;
use crate::error::EnvResult;
use crate::pipeline::{Timestep, Transform};
use crate::representation::RepresentationEncoder;
use crate::simulator::SimulatorLayout;

/// Encodes the simulator records into the selected representation
#[derive(Debug)]
pub struct RepresentationStage {
    encoder: Arc<dyn RepresentationEncoder>,
    layout: SimulatorLayout,
}

impl RepresentationStage {
    pub fn new(encoder: Arc<dyn RepresentationEncoder>, layout: SimulatorLayout) -> Self {
        Self { encoder, layout }
    }

    fn encode(&self, ts: &mut Timestep) -> EnvResult<()> {
        ts.observation = self.encoder.encode(&ts.frame)?;
        Ok(())
    }
}

impl Transform for RepresentationStage {
    fn name(&self) -> &'static str {
        "representation"
    }

    fn on_reset(&mut self, ts: &mut Timestep) -> EnvResult<()> {
        self.encode(ts)
    }

    fn on_step(&mut self, ts: &mut Timestep) -> EnvResult<()> {
        self.encode(ts)
    }

    fn observation_contract(&self, _spec: ObservationSpec) -> EnvResult<ObservationSpec> {
        self.encoder.observation_spec(&self.layout)
    }
}
