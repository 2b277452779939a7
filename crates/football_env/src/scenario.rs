//! Scenario resolution
//!
//! Maps a scenario identifier to its static capabilities: team sizes, how
//! many players per side an agent may control, and whether the scenario
//! forces control of every player. Built-in scenarios are held in a table
//! built once per process; callers can register extra definitions from JSON.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{EnvError, EnvResult};

/// Static capabilities of a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    /// Players on the left team
    pub left_team_size: usize,
    /// Players on the right team
    pub right_team_size: usize,
    /// Left players an agent may control
    pub controllable_left: usize,
    /// Right players an agent may control
    pub controllable_right: usize,
    #[serde(default)]
    pub control_all_players: bool,
}

impl ScenarioConfig {
    fn builtin(
        name: &str,
        teams: (usize, usize),
        controllable: (usize, usize),
        control_all_players: bool,
    ) -> Self {
        Self {
            name: name.to_string(),
            left_team_size: teams.0,
            right_team_size: teams.1,
            controllable_left: controllable.0,
            controllable_right: controllable.1,
            control_all_players,
        }
    }

    /// Full 11-a-side match shape
    pub fn is_full_match(&self) -> bool {
        self.left_team_size == 11 && self.right_team_size == 11
    }
}

static BUILTIN_SCENARIOS: Lazy<BTreeMap<String, ScenarioConfig>> = Lazy::new(|| {
    let full = (11, 11);
    [
        ScenarioConfig::builtin("11_vs_11_stochastic", full, full, false),
        ScenarioConfig::builtin("11_vs_11_easy_stochastic", full, full, false),
        ScenarioConfig::builtin("11_vs_11_hard_stochastic", full, full, false),
        ScenarioConfig::builtin("11_vs_11_kaggle", full, full, false),
        ScenarioConfig::builtin("11_vs_11_competition", full, full, false),
        ScenarioConfig::builtin("5_vs_5", (5, 5), (5, 5), false),
        ScenarioConfig::builtin("1_vs_1_easy", (2, 2), (2, 2), false),
        ScenarioConfig::builtin("academy_empty_goal_close", (2, 1), (2, 1), false),
        ScenarioConfig::builtin("academy_empty_goal", (2, 1), (2, 1), false),
        ScenarioConfig::builtin("academy_run_to_score", (2, 6), (2, 6), false),
        ScenarioConfig::builtin("academy_run_to_score_with_keeper", (2, 6), (2, 6), false),
        ScenarioConfig::builtin("academy_pass_and_shoot_with_keeper", (3, 2), (3, 2), false),
        ScenarioConfig::builtin("academy_run_pass_and_shoot_with_keeper", (3, 2), (3, 2), false),
        ScenarioConfig::builtin("academy_3_vs_1_with_keeper", (4, 2), (4, 2), false),
        ScenarioConfig::builtin("academy_corner", full, full, false),
        ScenarioConfig::builtin("academy_counterattack_easy", full, full, false),
        ScenarioConfig::builtin("academy_counterattack_hard", full, full, false),
        ScenarioConfig::builtin("academy_single_goal_versus_lazy", full, full, false),
        ScenarioConfig::builtin("tests/keeper_test", (3, 2), (3, 2), false),
        ScenarioConfig::builtin("tests/multiagent_wrapper", (3, 3), (3, 0), true),
    ]
    .into_iter()
    .map(|s| (s.name.clone(), s))
    .collect()
});

/// Resolves scenario identifiers to [`ScenarioConfig`]
#[derive(Debug, Clone)]
pub struct ScenarioResolver {
    custom: BTreeMap<String, ScenarioConfig>,
}

impl Default for ScenarioResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioResolver {
    /// Resolver over the built-in scenarios
    pub fn new() -> Self {
        Self { custom: BTreeMap::new() }
    }

    /// Register an extra scenario; it shadows a built-in of the same name
    pub fn with_scenario(mut self, scenario: ScenarioConfig) -> EnvResult<Self> {
        if scenario.name.is_empty() {
            return Err(EnvError::config("scenario", "", "scenario name must be non-empty"));
        }
        if scenario.controllable_left > scenario.left_team_size
            || scenario.controllable_right > scenario.right_team_size
        {
            return Err(EnvError::config(
                "scenario",
                &scenario.name,
                format!(
                    "controllable players ({}, {}) exceed team sizes ({}, {})",
                    scenario.controllable_left,
                    scenario.controllable_right,
                    scenario.left_team_size,
                    scenario.right_team_size
                ),
            ));
        }
        self.custom.insert(scenario.name.clone(), scenario);
        Ok(self)
    }

    /// Register scenarios from a JSON array of definitions
    pub fn with_json(self, json: &str) -> EnvResult<Self> {
        let scenarios: Vec<ScenarioConfig> = serde_json::from_str(json)?;
        scenarios.into_iter().try_fold(self, |resolver, s| resolver.with_scenario(s))
    }

    pub fn resolve(&self, name: &str) -> EnvResult<ScenarioConfig> {
        if name.is_empty() {
            return Err(EnvError::config("scenario", name, "scenario name must be non-empty"));
        }
        self.custom
            .get(name)
            .or_else(|| BUILTIN_SCENARIOS.get(name))
            .cloned()
            .ok_or_else(|| EnvError::config("scenario", name, "unrecognized scenario"))
    }

    /// All known scenarios sorted by name; custom definitions win on name clashes
    pub fn scenarios(&self) -> Vec<ScenarioConfig> {
        let mut all = BUILTIN_SCENARIOS.clone();
        all.extend(self.custom.iter().map(|(k, v)| (k.clone(), v.clone())));
        all.into_values().collect()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_builtin() {
        let resolver = ScenarioResolver::new();
        let s = resolver.resolve("11_vs_11_stochastic").unwrap();
        assert!(s.is_full_match());
        assert!(!s.control_all_players);
        assert_eq!((s.controllable_left, s.controllable_right), (11, 11));
    }

    #[test]
    fn test_resolve_is_repeatable() {
        let resolver = ScenarioResolver::new();
        let a = resolver.resolve("academy_3_vs_1_with_keeper").unwrap();
        let b = resolver.resolve("academy_3_vs_1_with_keeper").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_scenario_is_config_error() {
        let err = ScenarioResolver::new().resolve("no_such_scenario").unwrap_err();
        assert_eq!(err.config_key(), Some("scenario"));
        assert!(err.to_string().contains("no_such_scenario"));
    }

    #[test]
    fn test_empty_scenario_is_config_error() {
        assert!(ScenarioResolver::new().resolve("").unwrap_err().is_config());
    }

    #[test]
    fn test_control_all_players_scenario() {
        let s = ScenarioResolver::new().resolve("tests/multiagent_wrapper").unwrap();
        assert!(s.control_all_players);
        assert_eq!((s.controllable_left, s.controllable_right), (3, 0));
    }

    #[test]
    fn test_custom_scenarios_from_json() {
        let json = r#"[{
            "name": "drill_2v2",
            "left_team_size": 2,
            "right_team_size": 2,
            "controllable_left": 2,
            "controllable_right": 0,
            "control_all_players": true
        }]"#;
        let resolver = ScenarioResolver::new().with_json(json).unwrap();
        let s = resolver.resolve("drill_2v2").unwrap();
        assert!(s.control_all_players);
        assert!(resolver.scenarios().iter().any(|s| s.name == "drill_2v2"));
        // built-ins stay available
        assert!(resolver.resolve("5_vs_5").is_ok());
    }

    #[test]
    fn test_custom_scenario_controllable_bounds() {
        let bad = ScenarioConfig {
            name: "broken".to_string(),
            left_team_size: 1,
            right_team_size: 1,
            controllable_left: 2,
            controllable_right: 0,
            control_all_players: false,
        };
        assert!(ScenarioResolver::new().with_scenario(bad).unwrap_err().is_config());
    }
}
