use crate::error::EnvResult;
use crate::pipeline::{Timestep, Transform};

/// Forwards or strips the simulator's legal-action mask
#[derive(Debug, Clone, Copy)]
pub struct ActionMaskStage {
    enabled: bool,
}

impl ActionMaskStage {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn apply(&self, ts: &mut Timestep) {
        if !self.enabled {
            ts.info.action_mask = None;
        }
    }
}

impl Transform for ActionMaskStage {
    fn name(&self) -> &'static str {
        "action_mask"
    }

    fn on_reset(&mut self, ts: &mut Timestep) -> EnvResult<()> {
        self.apply(ts);
        Ok(())
    }

    fn on_step(&mut self, ts: &mut Timestep) -> EnvResult<()> {
        self.apply(ts);
        Ok(())
    }
}
