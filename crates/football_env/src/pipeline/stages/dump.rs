//! Dump and render hooks
//!
//! Trace and video writing happen inside the simulator; these stages only
//! toggle them.

use tracing::debug;

use crate::error::{EnvError, EnvResult};
use crate::pipeline::Transform;
use crate::simulator::{DumpOptions, Simulator};

/// Keeps dumps (and rendering) on for one episode in `frequency`
#[derive(Debug, Clone)]
pub struct PeriodicDumpWriter {
    frequency: u32,
    render: bool,
    episode: u64,
    original: Option<DumpOptions>,
}

impl PeriodicDumpWriter {
    pub fn new(frequency: u32, render: bool) -> Self {
        Self { frequency: frequency.max(1), render, episode: 0, original: None }
    }

    /// Episodes started so far
    pub fn episode(&self) -> u64 {
        self.episode
    }
}

impl Transform for PeriodicDumpWriter {
    fn name(&self) -> &'static str {
        "periodic_dump"
    }

    fn on_attach(&mut self, sim: &mut dyn Simulator) -> EnvResult<()> {
        self.original = Some(sim.dump_options());
        Ok(())
    }

    fn before_reset(&mut self, sim: &mut dyn Simulator) -> EnvResult<()> {
        let original = self
            .original
            .clone()
            .ok_or_else(|| EnvError::invariant("dump writer reset before attach"))?;

        if self.episode % u64::from(self.frequency) == 0 {
            debug!(episode = self.episode, "Dumping episode");
            sim.set_dump_options(original);
            if self.render {
                sim.render()?;
            }
        } else {
            sim.set_dump_options(DumpOptions::disabled());
            if self.render {
                sim.disable_render()?;
            }
        }
        self.episode += 1;
        Ok(())
    }
}

/// Turns rendering on once, when the pipeline is assembled
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateRender;

impl Transform for ImmediateRender {
    fn name(&self) -> &'static str {
        "immediate_render"
    }

    fn on_attach(&mut self, sim: &mut dyn Simulator) -> EnvResult<()> {
        sim.render()?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
