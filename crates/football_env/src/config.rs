//! # Environment configuration
//!
//! The record handed to the simulator constructor is built by a layered,
//! last-write-wins merge:
//!
//! 1. built-in defaults
//! 2. named construction arguments
//! 3. the caller's free-form override map
//!
//! Each layer replaces whole keys; there is no deep merge. The override map
//! is owned by the caller and built fresh per call, so nothing carries over
//! between constructions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{EnvError, EnvResult};
use crate::roster::PlayerSpec;

pub mod keys {
    pub const ACTION_MASK: &str = "action_mask";
    pub const DUMP_FULL_EPISODES: &str = "dump_full_episodes";
    pub const DUMP_SCORES: &str = "dump_scores";
    pub const LEVEL: &str = "level";
    pub const PLAYERS: &str = "players";
    pub const REPRESENTATION: &str = "representation";
    pub const REWARDS: &str = "rewards";
    pub const TRACES_DIR: &str = "tracesdir";
    pub const WRITE_VIDEO: &str = "write_video";
}

/// A single configuration value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<String>),
}

impl ConfigValue {
    fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Bool(_) => "bool",
            ConfigValue::Int(_) => "int",
            ConfigValue::Float(_) => "float",
            ConfigValue::Str(_) => "string",
            ConfigValue::List(_) => "list",
        }
    }
}

impl std::fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigValue::Bool(v) => write!(f, "{v}"),
            ConfigValue::Int(v) => write!(f, "{v}"),
            ConfigValue::Float(v) => write!(f, "{v}"),
            ConfigValue::Str(v) => write!(f, "{v}"),
            ConfigValue::List(v) => write!(f, "[{}]", v.join(", ")),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        ConfigValue::Bool(v)
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        ConfigValue::Int(v)
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        ConfigValue::Float(v)
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::Str(v.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        ConfigValue::Str(v)
    }
}

impl From<Vec<String>> for ConfigValue {
    fn from(v: Vec<String>) -> Self {
        ConfigValue::List(v)
    }
}

/// Caller-supplied free-form overrides, applied last
pub type ConfigOverrides = BTreeMap<String, ConfigValue>;

// =============================================================================
// EnvironmentConfig
// =============================================================================

/// Final merged configuration record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentConfig {
    values: BTreeMap<String, ConfigValue>,
}

impl EnvironmentConfig {
    /// Built-in defaults
    pub fn defaults() -> Self {
        let mut values = BTreeMap::new();
        let mut set = |k: &str, v: ConfigValue| {
            values.insert(k.to_string(), v);
        };
        set("action_set", "default".into());
        set(keys::ACTION_MASK, true.into());
        set("display_game_stats", true.into());
        set(keys::DUMP_FULL_EPISODES, false.into());
        set(keys::DUMP_SCORES, false.into());
        set("game_engine_random_seed", 42i64.into());
        set(keys::LEVEL, "11_vs_11_stochastic".into());
        set("physics_steps_per_frame", 10i64.into());
        set(keys::PLAYERS, vec!["agent:left_players=1".to_string()].into());
        set("real_time", false.into());
        set("render_resolution_x", 1280i64.into());
        set("render_resolution_y", 720i64.into());
        set(keys::TRACES_DIR, "".into());
        set("video_format", "avi".into());
        set("video_quality_level", 0i64.into());
        set(keys::WRITE_VIDEO, false.into());
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConfigValue)> {
        self.values.iter()
    }

    /// Replace every key present in `layer`
    pub fn apply(&mut self, layer: &BTreeMap<String, ConfigValue>) {
        for (k, v) in layer {
            self.values.insert(k.clone(), v.clone());
        }
    }

    fn required(&self, key: &str) -> EnvResult<&ConfigValue> {
        self.values.get(key).ok_or_else(|| EnvError::config(key, "<missing>", "required key not set"))
    }

    fn wrong_type(key: &str, value: &ConfigValue, expected: &str) -> EnvError {
        EnvError::config(key, value, format!("expected {expected}, found {}", value.type_name()))
    }

    pub fn get_bool(&self, key: &str) -> EnvResult<bool> {
        match self.required(key)? {
            ConfigValue::Bool(v) => Ok(*v),
            other => Err(Self::wrong_type(key, other, "bool")),
        }
    }

    /// Boolean with a fallback when the key is absent
    pub fn get_bool_or(&self, key: &str, default: bool) -> EnvResult<bool> {
        if self.contains(key) {
            self.get_bool(key)
        } else {
            Ok(default)
        }
    }

    pub fn get_int(&self, key: &str) -> EnvResult<i64> {
        match self.required(key)? {
            ConfigValue::Int(v) => Ok(*v),
            other => Err(Self::wrong_type(key, other, "int")),
        }
    }

    pub fn get_str(&self, key: &str) -> EnvResult<&str> {
        match self.required(key)? {
            ConfigValue::Str(v) => Ok(v),
            other => Err(Self::wrong_type(key, other, "string")),
        }
    }

    /// Parsed roster
    pub fn players(&self) -> EnvResult<Vec<PlayerSpec>> {
        match self.required(keys::PLAYERS)? {
            ConfigValue::List(items) => items
                .iter()
                .map(|s| s.parse::<PlayerSpec>().map_err(|e| EnvError::config(keys::PLAYERS, s, e)))
                .collect(),
            other => Err(Self::wrong_type(keys::PLAYERS, other, "list")),
        }
    }

    pub fn to_json_pretty(&self) -> EnvResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// =============================================================================
// ConfigMerger
// =============================================================================

/// Named construction arguments (second merge layer)
#[derive(Debug, Clone, PartialEq)]
pub struct NamedArguments {
    pub level: String,
    pub players: Vec<PlayerSpec>,
    pub dump_full_episodes: bool,
    pub dump_scores: bool,
    pub traces_dir: String,
    pub write_video: bool,
    pub representation: String,
    pub rewards: String,
}

impl NamedArguments {
    fn to_layer(&self) -> BTreeMap<String, ConfigValue> {
        let mut layer = BTreeMap::new();
        layer.insert(keys::LEVEL.to_string(), self.level.clone().into());
        layer.insert(
            keys::PLAYERS.to_string(),
            ConfigValue::List(self.players.iter().map(|p| p.to_string()).collect()),
        );
        layer.insert(keys::DUMP_FULL_EPISODES.to_string(), self.dump_full_episodes.into());
        layer.insert(keys::DUMP_SCORES.to_string(), self.dump_scores.into());
        layer.insert(keys::TRACES_DIR.to_string(), self.traces_dir.clone().into());
        layer.insert(keys::WRITE_VIDEO.to_string(), self.write_video.into());
        layer.insert(keys::REPRESENTATION.to_string(), self.representation.clone().into());
        layer.insert(keys::REWARDS.to_string(), self.rewards.clone().into());
        layer
    }
}

pub struct ConfigMerger;

impl ConfigMerger {
    /// defaults < named arguments < overrides
    pub fn merge(
        defaults: &EnvironmentConfig,
        named: &NamedArguments,
        overrides: &ConfigOverrides,
    ) -> EnvironmentConfig {
        let mut config = defaults.clone();
        config.apply(&named.to_layer());
        config.apply(overrides);
        config
    }
}

// =============================================================================
// Tests
// =============================================================================
