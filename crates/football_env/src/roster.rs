//! Roster building
//!
//! A roster is the ordered list of player-control directives handed to the
//! simulator. Order matters: the simulator assigns controller indices in
//! roster order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{EnvError, EnvResult};
use crate::scenario::ScenarioConfig;

/// Name of the primary agent controller
pub const AGENT_PLAYER: &str = "agent";

// =============================================================================
// AgentCounts
// =============================================================================

/// Agent-controlled players per side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentCounts {
    pub left: usize,
    pub right: usize,
}

impl AgentCounts {
    pub fn new(left: usize, right: usize) -> Self {
        Self { left, right }
    }

    pub fn total(&self) -> usize {
        self.left + self.right
    }
}

// =============================================================================
// PlayerSpec
// =============================================================================

/// Control directive `name:key1=val1,key2=val2,...`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayerSpec {
    name: String,
    params: Vec<(String, String)>,
}

impl PlayerSpec {
    /// Primary agent directive controlling `counts` players
    pub fn agent(counts: AgentCounts) -> Self {
        Self {
            name: AGENT_PLAYER.to_string(),
            params: vec![
                ("left_players".to_string(), counts.left.to_string()),
                ("right_players".to_string(), counts.right.to_string()),
            ],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn count_param(&self, key: &str) -> EnvResult<usize> {
        let raw = self.param(key).ok_or_else(|| {
            EnvError::config("players", self.to_string(), format!("missing required key {key}"))
        })?;
        raw.parse::<usize>().map_err(|_| {
            EnvError::config("players", self.to_string(), format!("{key} must be a non-negative integer"))
        })
    }

    /// `left_players` / `right_players`, both required
    pub fn agent_counts(&self) -> EnvResult<AgentCounts> {
        Ok(AgentCounts::new(self.count_param("left_players")?, self.count_param("right_players")?))
    }

    fn optional_count_param(&self, key: &str) -> EnvResult<usize> {
        match self.param(key) {
            Some(_) => self.count_param(key),
            None => Ok(0),
        }
    }
}

/// Players driven by every `agent` directive in `players`; an absent side counts as zero
pub fn agent_controlled(players: &[PlayerSpec]) -> EnvResult<AgentCounts> {
    players.iter().filter(|p| p.name() == AGENT_PLAYER).try_fold(AgentCounts::default(), |acc, p| {
        Ok(AgentCounts::new(
            acc.left + p.optional_count_param("left_players")?,
            acc.right + p.optional_count_param("right_players")?,
        ))
    })
}

impl fmt::Display for PlayerSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for (i, (k, v)) in self.params.iter().enumerate() {
            let sep = if i == 0 { ':' } else { ',' };
            write!(f, "{sep}{k}={v}")?;
        }
        Ok(())
    }
}

impl FromStr for PlayerSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, rest) = match s.split_once(':') {
            Some((name, rest)) => (name.trim(), rest),
            None => (s.trim(), ""),
        };
        if name.is_empty() {
            return Err(format!("player spec '{s}' has no controller name"));
        }

        let mut params = Vec::new();
        for pair in rest.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (k, v) = pair
                .split_once('=')
                .ok_or_else(|| format!("player spec '{s}': '{pair}' is not key=value"))?;
            let k = k.trim();
            if k.is_empty() {
                return Err(format!("player spec '{s}': empty key"));
            }
            params.push((k.to_string(), v.trim().to_string()));
        }

        Ok(Self { name: name.to_string(), params })
    }
}

impl TryFrom<String> for PlayerSpec {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PlayerSpec> for String {
    fn from(spec: PlayerSpec) -> String {
        spec.to_string()
    }
}

// =============================================================================
// RosterBuilder
// =============================================================================

/// Roster plus the scenario-level reduction decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterPlan {
    pub players: Vec<PlayerSpec>,
    /// Multi-agent output must be folded back to `requested`
    pub reduce: bool,
    /// Counts the caller asked for
    pub requested: AgentCounts,
    /// Counts written into the primary agent spec
    pub granted: AgentCounts,
}

pub struct RosterBuilder;

impl RosterBuilder {
    /// Build the primary agent roster
    ///
    /// Reduction mode applies when the scenario forces control of all
    /// players and the caller asks for at most one player per side: the
    /// simulator then runs with the scenario's full controllable counts.
    pub fn build(requested: AgentCounts, scenario: &ScenarioConfig) -> RosterPlan {
        let reduce = scenario.control_all_players && requested.left <= 1 && requested.right <= 1;

        let granted = if reduce {
            AgentCounts::new(
                if requested.left > 0 { scenario.controllable_left } else { 0 },
                if requested.right > 0 { scenario.controllable_right } else { 0 },
            )
        } else {
            requested
        };

        RosterPlan { players: vec![PlayerSpec::agent(granted)], reduce, requested, granted }
    }
}

// =============================================================================
// Tests
// =============================================================================
