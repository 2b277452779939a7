use std::sync::Arc;

use crate::error::EnvResult;
use crate::pipeline::{Timestep, Transform};
use crate::representation::RepresentationEncoder;

/// Last stage; attaches the global state of the native frame
#[derive(Debug)]
pub struct StateAccessor {
    encoder: Arc<dyn RepresentationEncoder>,
}

impl StateAccessor {
    pub fn new(encoder: Arc<dyn RepresentationEncoder>) -> Self {
        Self { encoder }
    }

    fn attach(&self, ts: &mut Timestep) -> EnvResult<()> {
        ts.state = self.encoder.global_state(&ts.native).transpose()?;
        Ok(())
    }
}

impl Transform for StateAccessor {
    fn name(&self) -> &'static str {
        "state_accessor"
    }

    fn on_reset(&mut self, ts: &mut Timestep) -> EnvResult<()> {
        self.attach(ts)
    }

    fn on_step(&mut self, ts: &mut Timestep) -> EnvResult<()> {
        self.attach(ts)
    }
}
