//! Scenario-level reduction
//!
//! Scenarios that force control of every player run the simulator with one
//! record per controllable player. Only records whose designated player is
//! the one they drive stay visible to the caller; the rest are handed to
//! the built-in AI when stepping.

use tracing::debug;

use crate::contract::{ActionSpec, ObservationSpec, RewardSpec};
use crate::error::{EnvError, EnvResult};
use crate::pipeline::{native_action_spec, Actions, Timestep, Transform};
use crate::simulator::{Action, BUILTIN_AI_ACTION};

#[derive(Debug, Clone)]
pub struct ScenarioReducer {
    /// Caller-visible agent count
    agents: usize,
    /// Records per native frame
    native_agents: usize,
    /// Native indices kept by the last reset/step
    kept: Option<Vec<usize>>,
}

impl ScenarioReducer {
    pub fn new(agents: usize, native_agents: usize) -> Self {
        Self { agents, native_agents, kept: None }
    }

    fn reduce(&mut self, ts: &mut Timestep) -> EnvResult<()> {
        let kept: Vec<usize> = ts
            .native
            .iter()
            .enumerate()
            .filter(|(_, r)| r.designated == r.active)
            .map(|(i, _)| i)
            .collect();

        if kept.len() != self.agents {
            return Err(EnvError::invariant(format!(
                "reduction kept {} of {} records, expected {}",
                kept.len(),
                ts.native.len(),
                self.agents
            )));
        }

        ts.frame = ts.native.select(&kept);
        ts.observation = ts.observation.select_agents(&kept)?;
        ts.reward = ts.reward.select(&kept)?;
        ts.info.score_reward = ts.info.score_reward.select(&kept)?;
        if let Some(mask) = &ts.info.action_mask {
            ts.info.action_mask = Some(kept.iter().filter_map(|&i| mask.get(i).cloned()).collect());
        }

        self.kept = Some(kept);
        Ok(())
    }
}

impl Transform for ScenarioReducer {
    fn name(&self) -> &'static str {
        "scenario_reducer"
    }

    fn on_reset(&mut self, ts: &mut Timestep) -> EnvResult<()> {
        self.reduce(ts)
    }

    fn on_step(&mut self, ts: &mut Timestep) -> EnvResult<()> {
        self.reduce(ts)
    }

    /// Kept records get the caller's actions in order, all others the built-in AI
    fn on_action(&mut self, actions: Actions) -> EnvResult<Actions> {
        let kept = self
            .kept
            .as_ref()
            .ok_or_else(|| EnvError::invariant("scenario reducer stepped before reset"))?;
        let actions = actions.into_vec();
        if actions.len() != kept.len() {
            return Err(EnvError::invariant(format!(
                "got {} actions for {} visible agents",
                actions.len(),
                kept.len()
            )));
        }

        let mut native: Vec<Action> = vec![BUILTIN_AI_ACTION; self.native_agents];
        for (&idx, action) in kept.iter().zip(actions) {
            native[idx] = action;
        }
        debug!(?native, "Expanded reduced actions");
        Ok(Actions::PerAgent(native))
    }

    fn observation_contract(&self, mut spec: ObservationSpec) -> EnvResult<ObservationSpec> {
        match spec.shape.first_mut() {
            Some(lead) => *lead = self.agents,
            None => return Err(EnvError::invariant("observation contract has no agent axis")),
        }
        Ok(spec)
    }

    fn reward_contract(&self, _spec: RewardSpec) -> RewardSpec {
        RewardSpec::PerAgent(self.agents)
    }

    fn action_contract(&self, _spec: ActionSpec) -> ActionSpec {
        native_action_spec(self.agents)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::ObservationFrame;
    use crate::pipeline::Reward;
    use crate::simulator::SimulatorOutput;
    use crate::testing::record;

    /// Three controlled records; the second drives the designated player
    fn native_step() -> Timestep {
        let records = (0..3)
            .map(|i| {
                let mut r = record(3, 3);
                r.active = Some(i);
                r.designated = Some(1);
                r
            })
            .collect();
        Timestep::from_output(SimulatorOutput {
            frame: ObservationFrame::new(records),
            reward: vec![0.1, 0.2, 0.3],
            done: false,
            action_mask: Some(vec![vec![true], vec![false], vec![true]]),
        })
    }

    #[test]
    fn test_keeps_designated_record() {
        let mut reducer = ScenarioReducer::new(1, 3);
        let mut ts = native_step();
        reducer.on_reset(&mut ts).unwrap();

        assert_eq!(ts.agents(), 1);
        assert_eq!(ts.frame.records()[0].active, Some(1));
        assert_eq!(ts.reward, Reward::PerAgent(vec![0.2]));
        assert_eq!(ts.info.action_mask, Some(vec![vec![false]]));
        assert_eq!(ts.native.len(), 3);
    }

    #[test]
    fn test_actions_expand_to_builtin_ai() {
        let mut reducer = ScenarioReducer::new(1, 3);
        reducer.on_reset(&mut native_step()).unwrap();
        let native = reducer.on_action(Actions::Single(5)).unwrap();
        assert_eq!(native, Actions::PerAgent(vec![BUILTIN_AI_ACTION, 5, BUILTIN_AI_ACTION]));
    }

    #[test]
    fn test_step_before_reset() {
        let mut reducer = ScenarioReducer::new(1, 3);
        assert!(matches!(reducer.on_action(Actions::Single(0)), Err(EnvError::InvariantViolation(_))));
    }

    #[test]
    fn test_count_mismatch_is_invariant_violation() {
        let mut reducer = ScenarioReducer::new(2, 3);
        assert!(matches!(reducer.on_reset(&mut native_step()), Err(EnvError::InvariantViolation(_))));
    }

    #[test]
    fn test_contracts() {
        let reducer = ScenarioReducer::new(1, 3);
        let spec = reducer.observation_contract(ObservationSpec::vector(vec![3, 115])).unwrap();
        assert_eq!(spec.shape, vec![1, 115]);
        assert_eq!(reducer.reward_contract(RewardSpec::PerAgent(3)), RewardSpec::PerAgent(1));
        assert_eq!(
            reducer.action_contract(ActionSpec::MultiDiscrete { agents: 3, actions: 19 }),
            ActionSpec::Discrete { actions: 19 }
        );
    }
}
