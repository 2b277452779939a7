use std::collections::VecDeque;

use ndarray::{ArrayD, ArrayViewD, Axis};

use crate::contract::ObservationSpec;
use crate::error::{EnvError, EnvResult};
use crate::observation::Observation;
use crate::pipeline::{Timestep, Transform};

pub const FRAME_STACK_DEPTH: usize = 4;

/// Concatenates the last `depth` spatial artifacts along the channel axis
#[derive(Debug, Clone)]
pub struct FrameStack {
    depth: usize,
    history: VecDeque<ArrayD<u8>>,
}

impl FrameStack {
    pub fn new(depth: usize) -> Self {
        Self { depth: depth.max(1), history: VecDeque::with_capacity(depth) }
    }

    fn take_spatial(ts: &Timestep) -> EnvResult<ArrayD<u8>> {
        ts.observation
            .as_spatial()
            .cloned()
            .ok_or_else(|| EnvError::invariant("frame stacking needs a spatial observation"))
    }

    fn emit(&self, ts: &mut Timestep) -> EnvResult<()> {
        let parts: Vec<ArrayViewD<u8>> = self.history.iter().map(|a| a.view()).collect();
        let channels = match parts.first() {
            Some(first) if first.ndim() > 0 => Axis(first.ndim() - 1),
            _ => return Err(EnvError::invariant("frame stacking needs a channel axis")),
        };
        ts.observation = Observation::Spatial { array: ndarray::concatenate(channels, &parts)? };
        Ok(())
    }
}

impl Transform for FrameStack {
    fn name(&self) -> &'static str {
        "frame_stack"
    }

    fn on_reset(&mut self, ts: &mut Timestep) -> EnvResult<()> {
        let first = Self::take_spatial(ts)?;
        self.history.clear();
        self.history.extend(std::iter::repeat(first).take(self.depth));
        self.emit(ts)
    }

    fn on_step(&mut self, ts: &mut Timestep) -> EnvResult<()> {
        if self.history.is_empty() {
            return Err(EnvError::invariant("frame stack stepped before reset"));
        }
        let next = Self::take_spatial(ts)?;
        if self.history.len() == self.depth {
            self.history.pop_front();
        }
        self.history.push_back(next);
        self.emit(ts)
    }

    fn observation_contract(&self, mut spec: ObservationSpec) -> EnvResult<ObservationSpec> {
        match spec.shape.last_mut() {
            Some(channels) => *channels *= self.depth,
            None => return Err(EnvError::invariant("frame stacking needs a channel axis")),
        }
        Ok(spec)
    }
}
