//! Pipeline - ordered transformation stages around a simulator
//!
//! Stages are assembled once, in a fixed order:
//!
//! 1. reward shaping (sees the simulator-native reward)
//! 2. representation encoding
//! 3. action mask pass-through
//! 4. scenario reducer (only when the roster was expanded)
//! 5. dump/render hook
//! 6. single-agent squeezes (observation, then reward)
//! 7. frame stacking
//! 8. state accessor
//!
//! Step output flows through [`Transform::on_step`] in stage order; caller
//! actions flow through [`Transform::on_action`] in reverse order before
//! reaching the simulator.

mod stages;
mod timestep;

pub use stages::{
    ActionMaskStage, FrameStack, ImmediateRender, ObservationSqueeze, PeriodicDumpWriter,
    RepresentationStage, RewardSqueeze, RewardStage, ScenarioReducer, StateAccessor, FRAME_STACK_DEPTH,
};
pub use timestep::{Actions, Reward, StepInfo, Timestep};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::contract::{ActionSpec, ObservationSpec, RewardSpec};
use crate::error::{EnvError, EnvResult};
use crate::observation::ObservationError;
use crate::simulator::{Simulator, SimulatorError, SimulatorLayout, SimulatorOutput, DEFAULT_ACTION_SET_SIZE};

// =============================================================================
// Transform
// =============================================================================

/// One pipeline stage
///
/// Every hook has a pass-through default, so stages only implement what
/// they change.
pub trait Transform: Send {
    fn name(&self) -> &'static str;

    /// Called once when the pipeline takes ownership of the simulator
    fn on_attach(&mut self, _sim: &mut dyn Simulator) -> EnvResult<()> {
        Ok(())
    }

    /// Called before every simulator reset
    fn before_reset(&mut self, _sim: &mut dyn Simulator) -> EnvResult<()> {
        Ok(())
    }

    fn on_reset(&mut self, _ts: &mut Timestep) -> EnvResult<()> {
        Ok(())
    }

    fn on_action(&mut self, actions: Actions) -> EnvResult<Actions> {
        Ok(actions)
    }

    fn on_step(&mut self, _ts: &mut Timestep) -> EnvResult<()> {
        Ok(())
    }

    fn observation_contract(&self, spec: ObservationSpec) -> EnvResult<ObservationSpec> {
        Ok(spec)
    }

    fn reward_contract(&self, spec: RewardSpec) -> RewardSpec {
        spec
    }

    fn action_contract(&self, spec: ActionSpec) -> ActionSpec {
        spec
    }
}

/// Stage selected for a pipeline, before instantiation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageKind {
    Reward,
    Representation,
    ActionMask { enabled: bool },
    ScenarioReducer { agents: usize },
    PeriodicDump { frequency: u32, render: bool },
    ImmediateRender,
    ObservationSqueeze,
    RewardSqueeze,
    FrameStack { depth: usize },
    StateAccessor,
}

impl StageKind {
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Reward => "reward",
            StageKind::Representation => "representation",
            StageKind::ActionMask { .. } => "action_mask",
            StageKind::ScenarioReducer { .. } => "scenario_reducer",
            StageKind::PeriodicDump { .. } => "periodic_dump",
            StageKind::ImmediateRender => "immediate_render",
            StageKind::ObservationSqueeze => "observation_squeeze",
            StageKind::RewardSqueeze => "reward_squeeze",
            StageKind::FrameStack { .. } => "frame_stack",
            StageKind::StateAccessor => "state_accessor",
        }
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Simulator handle wrapped in its stages
///
/// Owns the simulator and closes it exactly once, on [`close`](Self::close)
/// or drop.
pub struct Pipeline {
    simulator: Box<dyn Simulator>,
    layout: SimulatorLayout,
    stages: Vec<Box<dyn Transform>>,
    last: Option<Timestep>,
    closed: bool,
}

impl Pipeline {
    pub fn new(mut simulator: Box<dyn Simulator>, mut stages: Vec<Box<dyn Transform>>) -> EnvResult<Self> {
        let layout = simulator.layout();
        for stage in &mut stages {
            stage.on_attach(simulator.as_mut())?;
        }
        let pipeline = Self { simulator, layout, stages, last: None, closed: false };
        let spec = pipeline.observation_spec()?;
        debug!(stages = ?pipeline.stage_names(), shape = ?spec.shape, "Pipeline assembled");
        Ok(pipeline)
    }

    pub fn layout(&self) -> SimulatorLayout {
        self.layout
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn simulator(&self) -> &dyn Simulator {
        self.simulator.as_ref()
    }

    pub fn simulator_mut(&mut self) -> &mut dyn Simulator {
        self.simulator.as_mut()
    }

    /// Result of the last reset or step
    pub fn last(&self) -> Option<&Timestep> {
        self.last.as_ref()
    }

    fn ensure_open(&self) -> EnvResult<()> {
        if self.closed {
            return Err(SimulatorError::Closed.into());
        }
        Ok(())
    }

    /// Validate a simulator result before any stage sees it
    fn admit(&self, output: SimulatorOutput) -> EnvResult<Timestep> {
        output.frame.validate(self.layout.controlled_agents)?;
        if output.reward.len() != output.frame.len() {
            return Err(ObservationError::RewardCount {
                rewards: output.reward.len(),
                records: output.frame.len(),
            }
            .into());
        }
        Ok(Timestep::from_output(output))
    }

    pub fn reset(&mut self) -> EnvResult<&Timestep> {
        self.ensure_open()?;
        for stage in &mut self.stages {
            stage.before_reset(self.simulator.as_mut())?;
        }

        let output = self.simulator.reset()?;
        let mut ts = self.admit(output)?;
        for stage in &mut self.stages {
            stage.on_reset(&mut ts)?;
        }
        Ok(self.last.insert(ts))
    }

    pub fn step(&mut self, actions: impl Into<Actions>) -> EnvResult<&Timestep> {
        self.ensure_open()?;
        if self.last.is_none() {
            return Err(EnvError::invariant("step called before reset"));
        }

        let mut actions = actions.into();
        for stage in self.stages.iter_mut().rev() {
            actions = stage.on_action(actions)?;
        }
        let actions = actions.into_vec();
        if actions.len() != self.layout.controlled_agents {
            return Err(SimulatorError::ActionCount {
                expected: self.layout.controlled_agents,
                found: actions.len(),
            }
            .into());
        }

        let output = self.simulator.step(&actions)?;
        let mut ts = self.admit(output)?;
        for stage in &mut self.stages {
            stage.on_step(&mut ts)?;
        }
        Ok(self.last.insert(ts))
    }

    /// Contract of the observation handed to the caller
    pub fn observation_spec(&self) -> EnvResult<ObservationSpec> {
        self.stages
            .iter()
            .try_fold(ObservationSpec::records(self.layout.controlled_agents), |spec, stage| {
                stage.observation_contract(spec)
            })
    }

    pub fn reward_spec(&self) -> RewardSpec {
        self.stages
            .iter()
            .fold(RewardSpec::PerAgent(self.layout.controlled_agents), |spec, stage| stage.reward_contract(spec))
    }

    pub fn action_spec(&self) -> ActionSpec {
        let base = native_action_spec(self.layout.controlled_agents);
        self.stages.iter().fold(base, |spec, stage| stage.action_contract(spec))
    }

    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.simulator.close();
            debug!("Simulator closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.close();
    }
}

/// Action contract of a simulator driving `agents` players
pub fn native_action_spec(agents: usize) -> ActionSpec {
    if agents == 1 {
        ActionSpec::Discrete { actions: DEFAULT_ACTION_SET_SIZE }
    } else {
        ActionSpec::MultiDiscrete { agents, actions: DEFAULT_ACTION_SET_SIZE }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::ObservationFrame;
    use crate::testing::{output, record, ScriptedSimulator};

    struct Tag(&'static str, std::sync::Arc<std::sync::Mutex<Vec<String>>>);

    impl Transform for Tag {
        fn name(&self) -> &'static str {
            self.0
        }

        fn on_action(&mut self, actions: Actions) -> EnvResult<Actions> {
            self.1.lock().unwrap().push(format!("action:{}", self.0));
            Ok(actions)
        }

        fn on_step(&mut self, _ts: &mut Timestep) -> EnvResult<()> {
            self.1.lock().unwrap().push(format!("step:{}", self.0));
            Ok(())
        }
    }

    fn two_agent_frame() -> ObservationFrame {
        ObservationFrame::new(vec![record(3, 2), record(3, 2)])
    }

    #[test]
    fn test_actions_reverse_steps_forward() {
        let calls = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let stages: Vec<Box<dyn Transform>> =
            vec![Box::new(Tag("a", calls.clone())), Box::new(Tag("b", calls.clone()))];
        let sim = ScriptedSimulator::new(two_agent_frame());
        let mut pipeline = Pipeline::new(Box::new(sim), stages).unwrap();

        pipeline.reset().unwrap();
        pipeline.step(vec![0usize, 0]).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec!["action:b", "action:a", "step:a", "step:b"]);
    }

    #[test]
    fn test_step_before_reset_is_invariant_violation() {
        let sim = ScriptedSimulator::new(two_agent_frame());
        let mut pipeline = Pipeline::new(Box::new(sim), Vec::new()).unwrap();
        assert!(matches!(pipeline.step(vec![0usize, 0]), Err(EnvError::InvariantViolation(_))));
    }

    #[test]
    fn test_action_count_checked() {
        let sim = ScriptedSimulator::new(two_agent_frame());
        let mut pipeline = Pipeline::new(Box::new(sim), Vec::new()).unwrap();
        pipeline.reset().unwrap();
        assert!(matches!(
            pipeline.step(vec![0usize]),
            Err(EnvError::Simulator(SimulatorError::ActionCount { expected: 2, found: 1 }))
        ));
    }

    #[test]
    fn test_malformed_simulator_output_rejected() {
        let sim = ScriptedSimulator::new(two_agent_frame())
            .with_steps(vec![output(ObservationFrame::new(vec![record(3, 2)]), vec![0.0])]);
        let mut pipeline = Pipeline::new(Box::new(sim), Vec::new()).unwrap();
        pipeline.reset().unwrap();
        assert!(matches!(
            pipeline.step(vec![0usize, 0]),
            Err(EnvError::Observation(ObservationError::AgentCount { expected: 2, found: 1 }))
        ));
    }

    #[test]
    fn test_reward_count_checked() {
        let sim = ScriptedSimulator::new(two_agent_frame()).with_steps(vec![output(two_agent_frame(), vec![0.0])]);
        let mut pipeline = Pipeline::new(Box::new(sim), Vec::new()).unwrap();
        pipeline.reset().unwrap();
        assert!(matches!(
            pipeline.step(vec![0usize, 0]),
            Err(EnvError::Observation(ObservationError::RewardCount { rewards: 1, records: 2 }))
        ));
    }

    #[test]
    fn test_close_once_and_on_drop() {
        let sim = ScriptedSimulator::new(two_agent_frame());
        let log = sim.log();
        let mut pipeline = Pipeline::new(Box::new(sim), Vec::new()).unwrap();
        pipeline.close();
        pipeline.close();
        assert!(pipeline.reset().is_err());
        drop(pipeline);
        assert_eq!(log.lock().unwrap().closes, 1);

        let sim = ScriptedSimulator::new(two_agent_frame());
        let log = sim.log();
        drop(Pipeline::new(Box::new(sim), Vec::new()).unwrap());
        assert_eq!(log.lock().unwrap().closes, 1);
    }

    #[test]
    fn test_base_contracts() {
        let sim = ScriptedSimulator::new(two_agent_frame());
        let pipeline = Pipeline::new(Box::new(sim), Vec::new()).unwrap();
        assert_eq!(pipeline.observation_spec().unwrap().shape, vec![2]);
        assert_eq!(pipeline.reward_spec(), RewardSpec::PerAgent(2));
        assert_eq!(pipeline.action_spec(), ActionSpec::MultiDiscrete { agents: 2, actions: 19 });
        assert_eq!(native_action_spec(1), ActionSpec::Discrete { actions: 19 });
    }
}
