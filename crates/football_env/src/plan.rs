//! Environment planning
//!
//! Everything a construction decides before a simulator exists: scenario
//! capabilities, roster, merged configuration, encoder and reward choice,
//! and the ordered stage list. Planning is pure, so identical options always
//! yield identical plans.

use serde::{Deserialize, Serialize};

use crate::config::{keys, ConfigMerger, ConfigOverrides, ConfigValue, EnvironmentConfig, NamedArguments};
use crate::error::{EnvError, EnvResult};
use crate::pipeline::{StageKind, FRAME_STACK_DEPTH};
use crate::representation::{ChannelDimensions, Representation};
use crate::reward::RewardSet;
use crate::roster::{agent_controlled, AgentCounts, PlayerSpec, RosterBuilder, RosterPlan};
use crate::scenario::{ScenarioConfig, ScenarioResolver};

// =============================================================================
// CreateOptions
// =============================================================================

/// Arguments of a local environment construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateOptions {
    pub scenario: String,
    /// Stack the last four spatial observations
    pub stacked: bool,
    pub representation: String,
    /// Comma-separated reward components
    pub rewards: String,
    /// Dump traces around goals
    pub write_goal_dumps: bool,
    pub write_full_episode_dumps: bool,
    pub render: bool,
    pub write_video: bool,
    /// Dump one episode in this many; `<= 1` dumps every episode
    pub dump_frequency: u32,
    pub logdir: String,
    pub extra_players: Option<Vec<String>>,
    pub left_agents: usize,
    pub right_agents: usize,
    pub channel_dimensions: ChannelDimensions,
    pub overrides: ConfigOverrides,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            scenario: String::new(),
            stacked: false,
            representation: Representation::Extracted.key().to_string(),
            rewards: "scoring".to_string(),
            write_goal_dumps: false,
            write_full_episode_dumps: false,
            render: false,
            write_video: false,
            dump_frequency: 1,
            logdir: String::new(),
            extra_players: None,
            left_agents: 1,
            right_agents: 0,
            channel_dimensions: ChannelDimensions::default(),
            overrides: ConfigOverrides::new(),
        }
    }
}

impl CreateOptions {
    pub fn new(scenario: impl Into<String>) -> Self {
        Self { scenario: scenario.into(), ..Self::default() }
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

    pub fn write_goal_dumps(mut self, on: bool) -> Self {
        self.write_goal_dumps = on;
        self
    }

    pub fn write_full_episode_dumps(mut self, on: bool) -> Self {
        self.write_full_episode_dumps = on;
        self
    }

    pub fn render(mut self, on: bool) -> Self {
        self.render = on;
        self
    }

    pub fn write_video(mut self, on: bool) -> Self {
        self.write_video = on;
        self
    }

    pub fn dump_frequency(mut self, frequency: u32) -> Self {
        self.dump_frequency = frequency;
        self
    }

    pub fn logdir(mut self, logdir: impl Into<String>) -> Self {
        self.logdir = logdir.into();
        self
    }

    pub fn extra_players(mut self, players: Vec<String>) -> Self {
        self.extra_players = Some(players);
        self
    }

    pub fn agents(mut self, left: usize, right: usize) -> Self {
        self.left_agents = left;
        self.right_agents = right;
        self
    }

    pub fn channel_dimensions(mut self, width: u32, height: u32) -> Self {
        self.channel_dimensions = ChannelDimensions::new(width, height);
        self
    }

    /// Free-form override, applied after everything else
    pub fn set(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// EnvironmentPlan
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentPlan {
    pub scenario: ScenarioConfig,
    pub roster: RosterPlan,
    /// Final merged configuration handed to the simulator
    pub config: EnvironmentConfig,
    /// Agent-driven players in the merged roster; the simulator must drive exactly these
    pub controlled: AgentCounts,
    pub representation: Representation,
    pub rewards: RewardSet,
    pub channel_dimensions: ChannelDimensions,
    /// Caller drives exactly one player
    pub single_agent: bool,
    pub stages: Vec<StageKind>,
}

impl EnvironmentPlan {
    pub fn build(options: &CreateOptions, resolver: &ScenarioResolver) -> EnvResult<Self> {
        let scenario = resolver.resolve(&options.scenario)?;
        let requested = AgentCounts::new(options.left_agents, options.right_agents);
        check_requested(requested, &scenario)?;

        let roster = RosterBuilder::build(requested, &scenario);
        if roster.reduce {
            for (key, count, granted) in [
                ("left_agents", requested.left, roster.granted.left),
                ("right_agents", requested.right, roster.granted.right),
            ] {
                if count > 0 && granted == 0 {
                    return Err(EnvError::config(key, count, "scenario has no controllable players on this side"));
                }
            }
        }

        let mut players = roster.players.clone();
        for spec in options.extra_players.iter().flatten() {
            let player = spec
                .parse::<PlayerSpec>()
                .map_err(|reason| EnvError::config("extra_players", spec, reason))?;
            players.push(player);
        }

        let named = NamedArguments {
            level: scenario.name.clone(),
            players,
            dump_full_episodes: options.write_full_episode_dumps,
            dump_scores: options.write_goal_dumps,
            traces_dir: options.logdir.clone(),
            write_video: options.write_video,
            representation: options.representation.clone(),
            rewards: options.rewards.clone(),
        };
        let config = ConfigMerger::merge(&EnvironmentConfig::defaults(), &named, &options.overrides);
        let merged_players = config.players()?;
        let controlled = agent_controlled(&merged_players)?;
        if controlled.total() == 0 {
            let listed: Vec<String> = merged_players.iter().map(ToString::to_string).collect();
            return Err(EnvError::config(keys::PLAYERS, listed.join(" "), "roster drives no agent-controlled players"));
        }

        let representation = Representation::parse(config.get_str(keys::REPRESENTATION)?)?;
        let rewards = RewardSet::parse(config.get_str(keys::REWARDS)?)?;
        let action_mask = config.get_bool_or(keys::ACTION_MASK, true)?;
        check_representation(representation, &scenario)?;
        if representation.needs_rendering() && !options.render {
            return Err(EnvError::config("render", false, format!("{representation} needs rendering")));
        }
        check_stacking(options.stacked, representation)?;
        if representation.is_spatial() {
            options.channel_dimensions.check()?;
        }

        // a reduced roster hands back only the requested agents
        let single_agent = if roster.reduce { requested.total() == 1 } else { controlled.total() == 1 };
        let dump = if options.dump_frequency > 1 {
            Some(StageKind::PeriodicDump { frequency: options.dump_frequency, render: options.render })
        } else if options.render {
            Some(StageKind::ImmediateRender)
        } else {
            None
        };
        let stages = select_stages(StageSelection {
            representation,
            action_mask,
            reduce_to: roster.reduce.then(|| requested.total()),
            dump,
            single_agent,
            stacked: options.stacked,
        });

        Ok(Self {
            scenario,
            roster,
            config,
            controlled,
            representation,
            rewards,
            channel_dimensions: options.channel_dimensions,
            single_agent,
            stages,
        })
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(StageKind::name).collect()
    }

    pub fn to_json_pretty(&self) -> EnvResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn check_requested(requested: AgentCounts, scenario: &ScenarioConfig) -> EnvResult<()> {
    for (key, count, limit) in [
        ("left_agents", requested.left, scenario.controllable_left),
        ("right_agents", requested.right, scenario.controllable_right),
    ] {
        if count > limit && !(scenario.control_all_players && count <= 1) {
            return Err(EnvError::config(
                key,
                count,
                format!("scenario {} allows at most {limit} controlled players", scenario.name),
            ));
        }
    }
    Ok(())
}

fn check_representation(representation: Representation, scenario: &ScenarioConfig) -> EnvResult<()> {
    let fits = if representation.requires_full_match() {
        scenario.is_full_match()
    } else if representation == Representation::Simple115V2 {
        scenario.left_team_size <= 11 && scenario.right_team_size <= 11
    } else {
        true
    };
    if !fits {
        return Err(EnvError::config(
            keys::REPRESENTATION,
            representation,
            format!(
                "scenario {} has {}v{} players, which this representation cannot encode",
                scenario.name, scenario.left_team_size, scenario.right_team_size
            ),
        ));
    }
    Ok(())
}

pub(crate) fn check_stacking(stacked: bool, representation: Representation) -> EnvResult<()> {
    if stacked && !representation.is_spatial() {
        return Err(EnvError::config(
            "stacked",
            true,
            format!("frame stacking needs a spatial representation, not {representation}"),
        ));
    }
    Ok(())
}

/// Inputs of the stage order
pub(crate) struct StageSelection {
    pub representation: Representation,
    pub action_mask: bool,
    /// Caller-visible agents when the roster was expanded
    pub reduce_to: Option<usize>,
    pub dump: Option<StageKind>,
    pub single_agent: bool,
    pub stacked: bool,
}

pub(crate) fn select_stages(selection: StageSelection) -> Vec<StageKind> {
    let mut stages = vec![
        StageKind::Reward,
        StageKind::Representation,
        StageKind::ActionMask { enabled: selection.action_mask },
    ];
    if let Some(agents) = selection.reduce_to {
        stages.push(StageKind::ScenarioReducer { agents });
    }
    stages.extend(selection.dump);
    if selection.single_agent {
        if selection.representation != Representation::Raw {
            stages.push(StageKind::ObservationSqueeze);
        }
        stages.push(StageKind::RewardSqueeze);
    }
    if selection.stacked {
        stages.push(StageKind::FrameStack { depth: FRAME_STACK_DEPTH });
    }
    stages.push(StageKind::StateAccessor);
    stages
}

// =============================================================================
// Tests
// =============================================================================
