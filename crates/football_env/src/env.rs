//! Environment construction
//!
//! `create_environment` resolves and plans a local environment, builds the
//! simulator from the merged configuration and wraps it in the planned
//! stages. `create_remote_environment` does the same around a remote game
//! server connection.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::contract::{ActionSpec, ObservationSpec, RewardSpec};
use crate::error::{EnvError, EnvResult};
use crate::observation::Observation;
use crate::pipeline::{
    ActionMaskStage, Actions, FrameStack, ImmediateRender, ObservationSqueeze, PeriodicDumpWriter, Pipeline,
    RepresentationStage, RewardSqueeze, RewardStage, ScenarioReducer, StageKind, StateAccessor, Timestep,
    Transform,
};
use crate::plan::{check_stacking, select_stages, CreateOptions, EnvironmentPlan, StageSelection};
use crate::representation::{build_encoder, ChannelDimensions, Representation, RepresentationEncoder};
use crate::reward::RewardSet;
use crate::scenario::ScenarioResolver;
use crate::simulator::{RemoteConnector, RemoteRequest, SimulatorFactory, SimulatorLayout};

// =============================================================================
// RemoteOptions
// =============================================================================

/// Arguments of a remote environment construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteOptions {
    pub username: String,
    pub token: String,
    pub model_name: String,
    pub track: String,
    pub stacked: bool,
    pub representation: String,
    pub rewards: String,
    pub channel_dimensions: ChannelDimensions,
    pub include_rendering: bool,
}

impl Default for RemoteOptions {
    fn default() -> Self {
        Self {
            username: String::new(),
            token: String::new(),
            model_name: String::new(),
            track: String::new(),
            stacked: false,
            representation: Representation::Raw.key().to_string(),
            rewards: "scoring".to_string(),
            channel_dimensions: ChannelDimensions::default(),
            include_rendering: false,
        }
    }
}

impl RemoteOptions {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self { username: username.into(), token: token.into(), ..Self::default() }
    }

    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    pub fn track(mut self, track: impl Into<String>) -> Self {
        self.track = track.into();
        self
    }

    pub fn stacked(mut self, stacked: bool) -> Self {
        self.stacked = stacked;
        self
    }

    pub fn representation(mut self, representation: impl Into<String>) -> Self {
        self.representation = representation.into();
        self
    }

    pub fn rewards(mut self, rewards: impl Into<String>) -> Self {
        self.rewards = rewards.into();
        self
    }

    pub fn channel_dimensions(mut self, width: u32, height: u32) -> Self {
        self.channel_dimensions = ChannelDimensions::new(width, height);
        self
    }

    pub fn include_rendering(mut self, on: bool) -> Self {
        self.include_rendering = on;
        self
    }

    fn request(&self) -> RemoteRequest {
        RemoteRequest {
            username: self.username.clone(),
            token: self.token.clone(),
            model_name: self.model_name.clone(),
            track: self.track.clone(),
            include_rendering: self.include_rendering,
        }
    }
}

// =============================================================================
// FootballEnv
// =============================================================================

/// Fully assembled environment
pub struct FootballEnv {
    pipeline: Pipeline,
    encoder: Arc<dyn RepresentationEncoder>,
    plan: Option<EnvironmentPlan>,
}

impl FootballEnv {
    pub fn reset(&mut self) -> EnvResult<&Timestep> {
        self.pipeline.reset()
    }

    pub fn step(&mut self, actions: impl Into<Actions>) -> EnvResult<&Timestep> {
        self.pipeline.step(actions)
    }

    pub fn representation(&self) -> Representation {
        self.encoder.representation()
    }

    /// Plan this environment was built from (local environments only)
    pub fn plan(&self) -> Option<&EnvironmentPlan> {
        self.plan.as_ref()
    }

    pub fn layout(&self) -> SimulatorLayout {
        self.pipeline.layout()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.pipeline.stage_names()
    }

    pub fn observation_spec(&self) -> EnvResult<ObservationSpec> {
        self.pipeline.observation_spec()
    }

    pub fn reward_spec(&self) -> RewardSpec {
        self.pipeline.reward_spec()
    }

    pub fn action_spec(&self) -> ActionSpec {
        self.pipeline.action_spec()
    }

    /// Contract of [`state`](Self::state), when the representation defines one
    pub fn state_spec(&self) -> Option<ObservationSpec> {
        self.encoder.global_state_spec(&self.pipeline.layout())
    }

    /// Global state of the last native frame
    pub fn state(&self) -> EnvResult<Vec<f32>> {
        if self.state_spec().is_none() {
            return Err(EnvError::config(
                "representation",
                self.representation(),
                "representation does not define a global state",
            ));
        }
        self.pipeline
            .last()
            .and_then(|ts| ts.state.clone())
            .ok_or_else(|| EnvError::invariant("state requested before reset"))
    }

    /// Composed observation of the last reset or step
    pub fn last_observation(&self) -> Option<&Observation> {
        self.pipeline.last().map(|ts| &ts.observation)
    }

    /// Simulator snapshot
    pub fn get_state(&self) -> EnvResult<Vec<u8>> {
        Ok(self.pipeline.simulator().get_state()?)
    }

    pub fn set_state(&mut self, state: &[u8]) -> EnvResult<()> {
        Ok(self.pipeline.simulator_mut().set_state(state)?)
    }

    pub fn close(&mut self) {
        self.pipeline.close();
    }
}

impl std::fmt::Debug for FootballEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FootballEnv")
            .field("representation", &self.representation())
            .field("layout", &self.layout())
            .field("stages", &self.stage_names())
            .finish()
    }
}

// =============================================================================
// Construction
// =============================================================================

struct StageContext<'a> {
    rewards: &'a RewardSet,
    encoder: &'a Arc<dyn RepresentationEncoder>,
    layout: SimulatorLayout,
}

fn instantiate(kind: &StageKind, ctx: &StageContext) -> Box<dyn Transform> {
    match kind {
        StageKind::Reward => Box::new(RewardStage::new(ctx.rewards.build())),
        StageKind::Representation => Box::new(RepresentationStage::new(ctx.encoder.clone(), ctx.layout)),
        StageKind::ActionMask { enabled } => Box::new(ActionMaskStage::new(*enabled)),
        StageKind::ScenarioReducer { agents } => {
            Box::new(ScenarioReducer::new(*agents, ctx.layout.controlled_agents))
        }
        StageKind::PeriodicDump { frequency, render } => Box::new(PeriodicDumpWriter::new(*frequency, *render)),
        StageKind::ImmediateRender => Box::new(ImmediateRender),
        StageKind::ObservationSqueeze => Box::new(ObservationSqueeze),
        StageKind::RewardSqueeze => Box::new(RewardSqueeze),
        StageKind::FrameStack { depth } => Box::new(FrameStack::new(*depth)),
        StageKind::StateAccessor => Box::new(StateAccessor::new(ctx.encoder.clone())),
    }
}

fn instantiate_all(kinds: &[StageKind], ctx: &StageContext) -> Vec<Box<dyn Transform>> {
    kinds
        .iter()
        .map(|kind| {
            debug!(stage = kind.name(), "Appending stage");
            instantiate(kind, ctx)
        })
        .collect()
}

/// Build a local environment over the built-in scenarios
pub fn create_environment(factory: &dyn SimulatorFactory, options: CreateOptions) -> EnvResult<FootballEnv> {
    create_environment_with(&ScenarioResolver::default(), factory, options)
}

/// Build a local environment, resolving scenarios with `resolver`
pub fn create_environment_with(
    resolver: &ScenarioResolver,
    factory: &dyn SimulatorFactory,
    options: CreateOptions,
) -> EnvResult<FootballEnv> {
    let plan = EnvironmentPlan::build(&options, resolver)?;
    let encoder = build_encoder(plan.representation, plan.channel_dimensions)?;

    let simulator = factory.create(&plan.config)?;
    let layout = simulator.layout();
    if layout.controlled_agents != plan.controlled.total() {
        return Err(EnvError::invariant(format!(
            "roster grants {} controlled players but the simulator drives {}",
            plan.controlled.total(),
            layout.controlled_agents
        )));
    }

    let ctx = StageContext { rewards: &plan.rewards, encoder: &encoder, layout };
    let pipeline = Pipeline::new(simulator, instantiate_all(&plan.stages, &ctx))?;

    let roster: Vec<String> = plan.roster.players.iter().map(ToString::to_string).collect();
    info!(
        scenario = %plan.scenario.name,
        representation = %plan.representation,
        rewards = %plan.rewards,
        ?roster,
        reduce = plan.roster.reduce,
        single_agent = plan.single_agent,
        "Environment created"
    );
    Ok(FootballEnv { pipeline, encoder, plan: Some(plan) })
}

/// Build an environment around a remote game server
pub fn create_remote_environment(
    connector: &dyn RemoteConnector,
    options: RemoteOptions,
) -> EnvResult<FootballEnv> {
    let representation = Representation::parse(&options.representation)?;
    let rewards = RewardSet::parse(&options.rewards)?;
    check_stacking(options.stacked, representation)?;
    if representation.needs_rendering() && !options.include_rendering {
        return Err(EnvError::config(
            "include_rendering",
            false,
            format!("{representation} needs rendered frames"),
        ));
    }
    let encoder = build_encoder(representation, options.channel_dimensions)?;

    let simulator = connector.connect(&options.request())?;
    let layout = simulator.layout();
    let single_agent = layout.controlled_agents == 1;
    let stages = select_stages(StageSelection {
        representation,
        action_mask: true,
        reduce_to: None,
        dump: None,
        single_agent,
        stacked: options.stacked,
    });

    let ctx = StageContext { rewards: &rewards, encoder: &encoder, layout };
    let pipeline = Pipeline::new(simulator, instantiate_all(&stages, &ctx))?;

    info!(
        username = %options.username,
        track = %options.track,
        representation = %representation,
        rewards = %rewards,
        single_agent,
        "Remote environment created"
    );
    Ok(FootballEnv { pipeline, encoder, plan: None })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvironmentConfig;
    use crate::observation::{BallOwner, ObservationFrame, RenderedFrame};
    use crate::pipeline::Reward;
    use crate::representation::{simple_v1_len, SIMPLE115_LEN};
    use crate::simulator::{DumpOptions, Simulator, SimulatorError, BUILTIN_AI_ACTION};
    use crate::testing::{full_match_frame, multiagent_frame, output, record, ScriptedSimulator, SimLog};
    use std::sync::Mutex;

    /// Factory handing out one prepared simulator, remembering the config it saw
    struct OneShot {
        sim: Mutex<Option<ScriptedSimulator>>,
        seen: Mutex<Option<EnvironmentConfig>>,
    }

    impl OneShot {
        fn new(sim: ScriptedSimulator) -> Self {
            Self { sim: Mutex::new(Some(sim)), seen: Mutex::new(None) }
        }
    }

    impl SimulatorFactory for OneShot {
        fn create(&self, config: &EnvironmentConfig) -> Result<Box<dyn Simulator>, SimulatorError> {
            *self.seen.lock().unwrap() = Some(config.clone());
            let sim = self.sim.lock().unwrap().take().ok_or(SimulatorError::Backend("already used".into()))?;
            Ok(Box::new(sim))
        }
    }

    fn log_of(sim: &ScriptedSimulator) -> Arc<Mutex<SimLog>> {
        sim.log()
    }

    #[test]
    fn test_simple115_with_checkpoints_full_match() {
        let mut advanced = full_match_frame(1).into_records();
        advanced[0].ball = [0.5, 0.0, 0.0];
        advanced[0].ball_owned_team = BallOwner::Left;
        advanced[0].ball_owned_player = Some(0);
        let advanced = ObservationFrame::new(advanced);

        let sim = ScriptedSimulator::new(full_match_frame(1)).with_steps(vec![
            output(advanced.clone(), vec![0.0]),
            output(advanced, vec![0.0]),
            output(full_match_frame(1), vec![1.0]),
        ]);
        let factory = OneShot::new(sim);
        let mut env = create_environment(
            &factory,
            CreateOptions::new("11_vs_11_stochastic").representation("simple115").rewards("scoring,checkpoints"),
        )
        .unwrap();

        assert_eq!(env.observation_spec().unwrap().shape, vec![SIMPLE115_LEN]);
        assert_eq!(env.reward_spec(), RewardSpec::Scalar);
        assert_eq!(env.action_spec(), ActionSpec::Discrete { actions: 19 });

        let ts = env.reset().unwrap();
        assert_eq!(ts.observation.shape(), vec![115]);

        let first = env.step(0usize).unwrap();
        assert_eq!(first.observation.shape(), vec![115]);
        let bonus = first.reward.single().unwrap();
        assert!((bonus - 0.6).abs() < 1e-5);
        assert_eq!(first.info.score_reward, Reward::Single(0.0));

        // same zone again: no bonus
        assert_eq!(env.step(0usize).unwrap().reward, Reward::Single(0.0));

        // goal pays the score plus the remaining four checkpoints
        let goal = env.step(0usize).unwrap().reward.single().unwrap();
        assert!((goal - 1.4).abs() < 1e-5);

        let seen = factory.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.get_str("representation").unwrap(), "simple115");
    }

    #[test]
    fn test_multiagent_scenario_reduces_to_one_agent() {
        let sim = ScriptedSimulator::new(multiagent_frame(1));
        let log = log_of(&sim);
        let factory = OneShot::new(sim);
        let mut env = create_environment(
            &factory,
            CreateOptions::new("tests/multiagent_wrapper").representation("simple115v2"),
        )
        .unwrap();

        let seen = factory.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.players().unwrap()[0].to_string(), "agent:left_players=3,right_players=0");

        let ts = env.reset().unwrap();
        assert_eq!(ts.agents(), 1);
        assert_eq!(ts.observation.shape(), vec![115]);
        assert_eq!(env.observation_spec().unwrap().shape, vec![115]);
        assert_eq!(env.action_spec(), ActionSpec::Discrete { actions: 19 });

        env.step(7usize).unwrap();
        assert_eq!(log.lock().unwrap().steps, vec![vec![BUILTIN_AI_ACTION, 7, BUILTIN_AI_ACTION]]);
    }

    #[test]
    fn test_simplev1_observation_and_state() {
        let sim = ScriptedSimulator::new(full_match_frame(1));
        let mut env = create_environment(
            &OneShot::new(sim),
            CreateOptions::new("11_vs_11_stochastic").representation("simplev1"),
        )
        .unwrap();

        assert!(matches!(env.state(), Err(EnvError::InvariantViolation(_))));
        let ts = env.reset().unwrap();
        assert_eq!(ts.observation.shape(), vec![simple_v1_len(11, 11)]);
        assert_eq!(ts.observation.shape(), vec![161]);
        assert_eq!(env.state().unwrap().len(), 4 * 22 + 16 + 11);
        assert_eq!(env.state_spec().unwrap().shape, vec![115]);
    }

    #[test]
    fn test_state_needs_simplev1() {
        let sim = ScriptedSimulator::new(full_match_frame(1));
        let mut env =
            create_environment(&OneShot::new(sim), CreateOptions::new("11_vs_11_stochastic")).unwrap();
        env.reset().unwrap();
        assert_eq!(env.state().unwrap_err().config_key(), Some("representation"));
    }

    #[test]
    fn test_stacked_extracted_shape() {
        let sim = ScriptedSimulator::new(full_match_frame(1));
        let mut env = create_environment(
            &OneShot::new(sim),
            CreateOptions::new("11_vs_11_stochastic").stacked(true),
        )
        .unwrap();
        assert_eq!(env.observation_spec().unwrap().shape, vec![72, 96, 16]);
        assert_eq!(env.reset().unwrap().observation.shape(), vec![72, 96, 16]);
        assert_eq!(env.step(0usize).unwrap().observation.shape(), vec![72, 96, 16]);
    }

    #[test]
    fn test_two_agents_stay_per_agent() {
        let frame = ObservationFrame::new(vec![record(5, 5), record(5, 5)]);
        let sim = ScriptedSimulator::new(frame);
        let mut env = create_environment(
            &OneShot::new(sim),
            CreateOptions::new("5_vs_5").agents(2, 0).representation("extracted").channel_dimensions(42, 42),
        )
        .unwrap();
        assert_eq!(env.reward_spec(), RewardSpec::PerAgent(2));
        env.reset().unwrap();
        let ts = env.step(vec![0usize, 1]).unwrap();
        assert_eq!(ts.observation.shape(), vec![2, 42, 42, 4]);
        assert_eq!(ts.reward, Reward::PerAgent(vec![0.0, 0.0]));
    }

    #[test]
    fn test_raw_single_agent_keeps_record_list() {
        let sim = ScriptedSimulator::new(ObservationFrame::new(vec![record(2, 1)]));
        let mut env = create_environment(
            &OneShot::new(sim),
            CreateOptions::new("academy_empty_goal").representation("raw"),
        )
        .unwrap();
        let ts = env.reset().unwrap();
        assert_eq!(ts.observation.as_raw().map(|f| f.len()), Some(1));
        assert_eq!(ts.reward, Reward::Single(0.0));
    }

    #[test]
    fn test_pixels_end_to_end() {
        let mut r = record(2, 1);
        r.frame = Some(RenderedFrame::filled(64, 48, [0, 128, 255]));
        let sim = ScriptedSimulator::new(ObservationFrame::new(vec![r]));
        let log = log_of(&sim);
        let mut env = create_environment(
            &OneShot::new(sim),
            CreateOptions::new("academy_empty_goal").representation("pixels_gray").render(true).channel_dimensions(16, 12),
        )
        .unwrap();
        assert_eq!(log.lock().unwrap().renders, 1);
        assert_eq!(env.reset().unwrap().observation.shape(), vec![12, 16, 1]);
    }

    #[test]
    fn test_periodic_dumps_toggle_on_reset() {
        let sim = ScriptedSimulator::new(full_match_frame(1))
            .with_dump_options(DumpOptions { dump_scores: true, dump_full_episodes: false, write_video: false });
        let log = log_of(&sim);
        let mut env = create_environment(
            &OneShot::new(sim),
            CreateOptions::new("11_vs_11_stochastic").dump_frequency(2).write_goal_dumps(true),
        )
        .unwrap();
        env.reset().unwrap();
        env.reset().unwrap();
        env.reset().unwrap();
        let history: Vec<bool> = log.lock().unwrap().dump_history.iter().map(|d| d.dump_scores).collect();
        assert_eq!(history, vec![true, false, true]);
    }

    #[test]
    fn test_roster_size_mismatch_is_invariant_violation() {
        let sim = ScriptedSimulator::new(ObservationFrame::new(vec![record(3, 3)]));
        let err = create_environment(&OneShot::new(sim), CreateOptions::new("tests/multiagent_wrapper"))
            .unwrap_err();
        assert!(matches!(err, EnvError::InvariantViolation(_)));
    }

    #[test]
    fn test_players_override_sets_expected_agents() {
        let sim = ScriptedSimulator::new(full_match_frame(2));
        let log = log_of(&sim);
        let mut env = create_environment(
            &OneShot::new(sim),
            CreateOptions::new("11_vs_11_stochastic")
                .representation("simple115v2")
                .set("players", vec!["agent:left_players=2".to_string()]),
        )
        .unwrap();
        assert_eq!(env.reward_spec(), RewardSpec::PerAgent(2));
        assert_eq!(env.reset().unwrap().observation.shape(), vec![2, SIMPLE115_LEN]);
        env.step(vec![0usize, 1]).unwrap();
        assert_eq!(log.lock().unwrap().steps, vec![vec![0, 1]]);
    }

    #[test]
    fn test_construction_error_leaves_factory_unused() {
        let factory = OneShot::new(ScriptedSimulator::new(full_match_frame(1)));
        let err = create_environment(&factory, CreateOptions::new("11_vs_11_stochastic").rewards("checkpoints"))
            .unwrap_err();
        assert_eq!(err.config_key(), Some("rewards"));
        assert!(factory.seen.lock().unwrap().is_none());
    }

    #[test]
    fn test_closure_factory_and_snapshot() {
        let factory = |_: &EnvironmentConfig| -> Result<Box<dyn Simulator>, SimulatorError> {
            Ok(Box::new(ScriptedSimulator::new(ObservationFrame::new(vec![record(2, 1)]))))
        };
        let mut env = create_environment(&factory, CreateOptions::new("academy_empty_goal")).unwrap();
        env.set_state(&[1, 2, 3]).unwrap();
        assert_eq!(env.get_state().unwrap(), vec![1, 2, 3]);
        assert!(env.last_observation().is_none());
        env.reset().unwrap();
        assert!(env.last_observation().is_some());
    }

    #[test]
    fn test_close_releases_simulator_once() {
        let sim = ScriptedSimulator::new(full_match_frame(1));
        let log = log_of(&sim);
        let mut env = create_environment(&OneShot::new(sim), CreateOptions::new("11_vs_11_stochastic")).unwrap();
        env.close();
        drop(env);
        assert_eq!(log.lock().unwrap().closes, 1);
    }

    // =========================================================================
    // Remote
    // =========================================================================

    #[test]
    fn test_remote_single_agent() {
        let connector = |request: &RemoteRequest| -> Result<Box<dyn Simulator>, SimulatorError> {
            assert_eq!(request.username, "alice");
            assert_eq!(request.track, "league");
            Ok(Box::new(ScriptedSimulator::new(full_match_frame(1))))
        };
        let mut env =
            create_remote_environment(&connector, RemoteOptions::new("alice", "secret").track("league")).unwrap();
        assert!(env.plan().is_none());
        assert_eq!(env.representation(), Representation::Raw);
        assert_eq!(
            env.stage_names(),
            vec!["reward", "representation", "action_mask", "reward_squeeze", "state_accessor"]
        );
        assert_eq!(env.reset().unwrap().reward, Reward::Single(0.0));
    }

    #[test]
    fn test_remote_validation() {
        let connector = |_: &RemoteRequest| -> Result<Box<dyn Simulator>, SimulatorError> {
            Err(SimulatorError::Connection("unreachable".into()))
        };
        let err = create_remote_environment(&connector, RemoteOptions::new("a", "b").rewards("checkpoints"))
            .unwrap_err();
        assert_eq!(err.config_key(), Some("rewards"));

        let err = create_remote_environment(&connector, RemoteOptions::new("a", "b").representation("pixels"))
            .unwrap_err();
        assert_eq!(err.config_key(), Some("include_rendering"));

        let err = create_remote_environment(&connector, RemoteOptions::new("a", "b")).unwrap_err();
        assert!(matches!(err, EnvError::Simulator(SimulatorError::Connection(_))));
    }
}
