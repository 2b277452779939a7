//! Structured per-agent observation records
//!
//! Records are expressed from the controlling team's point of view:
//! `left_team` is always the agent's own team. The serde mapping follows the
//! conventional wire encoding (`-1` for "nobody", integer game modes,
//! ten-slot sticky action arrays).

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::ObservationError;

// =============================================================================
// Enumerations
// =============================================================================

/// Which side owns the ball
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum BallOwner {
    #[default]
    None,
    Left,
    Right,
}

impl BallOwner {
    /// `[1,0,0]` nobody, `[0,1,0]` left, `[0,0,1]` right
    pub fn to_one_hot(self) -> [f32; 3] {
        match self {
            BallOwner::None => [1.0, 0.0, 0.0],
            BallOwner::Left => [0.0, 1.0, 0.0],
            BallOwner::Right => [0.0, 0.0, 1.0],
        }
    }
}

impl TryFrom<i8> for BallOwner {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(BallOwner::None),
            0 => Ok(BallOwner::Left),
            1 => Ok(BallOwner::Right),
            other => Err(format!("invalid ball_owned_team {other}, expected -1, 0 or 1")),
        }
    }
}

impl From<BallOwner> for i8 {
    fn from(owner: BallOwner) -> i8 {
        match owner {
            BallOwner::None => -1,
            BallOwner::Left => 0,
            BallOwner::Right => 1,
        }
    }
}

/// Game mode (7 discrete modes)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum GameMode {
    /// Ball in play
    #[default]
    Normal,
    KickOff,
    GoalKick,
    FreeKick,
    Corner,
    ThrowIn,
    Penalty,
}

impl GameMode {
    /// Number of game modes (for one-hot encoding)
    pub const COUNT: usize = 7;

    pub const ALL: [GameMode; Self::COUNT] = [
        GameMode::Normal,
        GameMode::KickOff,
        GameMode::GoalKick,
        GameMode::FreeKick,
        GameMode::Corner,
        GameMode::ThrowIn,
        GameMode::Penalty,
    ];

    /// Row of the 7x7 identity matrix selected by this mode
    pub fn to_one_hot(self) -> [f32; Self::COUNT] {
        let mut v = [0.0; Self::COUNT];
        v[self as usize] = 1.0;
        v
    }
}

impl TryFrom<u8> for GameMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        GameMode::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| format!("invalid game_mode {value}, expected 0..=6"))
    }
}

impl From<GameMode> for u8 {
    fn from(mode: GameMode) -> u8 {
        mode as u8
    }
}

// =============================================================================
// Sticky actions
// =============================================================================

/// Sticky action flags of the active player
///
/// On the wire this is the ten-slot sticky action array; sprint is slot 8
/// and dribble is slot 9.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct StickyActions {
    pub sprint: bool,
    pub dribble: bool,
}

impl StickyActions {
    pub const WIRE_LEN: usize = 10;
    const SPRINT_SLOT: usize = 8;
    const DRIBBLE_SLOT: usize = 9;

    pub fn new(sprint: bool, dribble: bool) -> Self {
        Self { sprint, dribble }
    }

    pub fn to_f32_array(&self) -> [f32; 2] {
        [
            if self.sprint { 1.0 } else { 0.0 },
            if self.dribble { 1.0 } else { 0.0 },
        ]
    }
}

impl TryFrom<Vec<u8>> for StickyActions {
    type Error = String;

    fn try_from(slots: Vec<u8>) -> Result<Self, Self::Error> {
        if slots.len() != Self::WIRE_LEN {
            return Err(format!(
                "sticky_actions must have {} slots, found {}",
                Self::WIRE_LEN,
                slots.len()
            ));
        }
        Ok(Self {
            sprint: slots[Self::SPRINT_SLOT] != 0,
            dribble: slots[Self::DRIBBLE_SLOT] != 0,
        })
    }
}

impl From<StickyActions> for Vec<u8> {
    fn from(sticky: StickyActions) -> Vec<u8> {
        let mut slots = vec![0u8; StickyActions::WIRE_LEN];
        slots[StickyActions::SPRINT_SLOT] = sticky.sprint as u8;
        slots[StickyActions::DRIBBLE_SLOT] = sticky.dribble as u8;
        slots
    }
}

// =============================================================================
// Rendered frame
// =============================================================================

/// RGB frame rendered by the simulator (row-major, 3 bytes per pixel)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RenderedFrame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ObservationError> {
        let frame = Self { width, height, data };
        frame.check()?;
        Ok(frame)
    }

    /// Solid-colour frame, handy for fixtures
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb.iter().copied().cycle().take((width * height * 3) as usize).collect();
        Self { width, height, data }
    }

    fn check(&self) -> Result<(), ObservationError> {
        let expected = self.width as usize * self.height as usize * 3;
        if self.data.len() != expected || expected == 0 {
            return Err(ObservationError::InvalidFrameBuffer {
                width: self.width,
                height: self.height,
                len: self.data.len(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// PlayerObservation
// =============================================================================

/// One controlled agent's view of the pitch
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerObservation {
    /// Own team positions (x, y)
    pub left_team: Vec<[f32; 2]>,
    /// Own team movement vectors
    pub left_team_direction: Vec<[f32; 2]>,
    /// Opponent positions (x, y)
    pub right_team: Vec<[f32; 2]>,
    /// Opponent movement vectors
    pub right_team_direction: Vec<[f32; 2]>,
    /// Ball position (x, y, z)
    pub ball: [f32; 3],
    /// Ball movement vector (x, y, z)
    pub ball_direction: [f32; 3],
    pub ball_owned_team: BallOwner,
    #[serde(with = "wire_index", default)]
    pub ball_owned_player: Option<usize>,
    pub game_mode: GameMode,
    /// Left-team index of the player this agent drives
    #[serde(with = "wire_index", default)]
    pub active: Option<usize>,
    /// Left-team index of the team's designated player
    #[serde(with = "wire_index", default)]
    pub designated: Option<usize>,
    #[serde(default)]
    pub sticky_actions: StickyActions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<RenderedFrame>,
}

impl PlayerObservation {
    /// Number of own-team slots
    pub fn left_size(&self) -> usize {
        self.left_team.len()
    }

    /// Number of opponent slots
    pub fn right_size(&self) -> usize {
        self.right_team.len()
    }

    /// Position of the active player, if any
    pub fn active_position(&self) -> Option<[f32; 2]> {
        self.active.and_then(|idx| self.left_team.get(idx).copied())
    }

    fn validate(&self, record: usize) -> Result<(), ObservationError> {
        if self.left_team.len() != self.left_team_direction.len() {
            return Err(ObservationError::TeamLength {
                record,
                team: "left",
                positions: self.left_team.len(),
                directions: self.left_team_direction.len(),
            });
        }
        if self.right_team.len() != self.right_team_direction.len() {
            return Err(ObservationError::TeamLength {
                record,
                team: "right",
                positions: self.right_team.len(),
                directions: self.right_team_direction.len(),
            });
        }

        let left = self.left_team.len();
        for (field, index) in [("active", self.active), ("designated", self.designated)] {
            if let Some(index) = index {
                if index >= left {
                    return Err(ObservationError::IndexOutOfRange { record, field, index, len: left });
                }
            }
        }

        if let Some(owner) = self.ball_owned_player {
            let len = match self.ball_owned_team {
                BallOwner::Left => left,
                BallOwner::Right => self.right_team.len(),
                BallOwner::None => 0,
            };
            if owner >= len {
                return Err(ObservationError::IndexOutOfRange {
                    record,
                    field: "ball_owned_player",
                    index: owner,
                    len,
                });
            }
        }

        if let Some(frame) = &self.frame {
            frame.check()?;
        }
        Ok(())
    }
}

/// `Option<usize>` encoded as a signed integer with `-1` for none
mod wire_index {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<usize>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(idx) => serializer.serialize_i64(*idx as i64),
            None => serializer.serialize_i64(-1),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        match raw {
            -1 => Ok(None),
            idx if idx >= 0 => Ok(Some(idx as usize)),
            other => Err(serde::de::Error::custom(format!("invalid player index {other}"))),
        }
    }
}

// =============================================================================
// ObservationFrame
// =============================================================================

/// Ordered per-agent records for one simulator step
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservationFrame {
    records: Vec<PlayerObservation>,
}

impl ObservationFrame {
    pub fn new(records: Vec<PlayerObservation>) -> Self {
        Self { records }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn records(&self) -> &[PlayerObservation] {
        &self.records
    }

    pub fn into_records(self) -> Vec<PlayerObservation> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first(&self) -> Option<&PlayerObservation> {
        self.records.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlayerObservation> {
        self.records.iter()
    }

    /// Keep only the records at `indices`, in that order
    pub fn select(&self, indices: &[usize]) -> Self {
        Self { records: indices.iter().filter_map(|&i| self.records.get(i).cloned()).collect() }
    }

    /// Team sizes `(left, right)` taken from the first record
    pub fn team_sizes(&self) -> Option<(usize, usize)> {
        self.first().map(|r| (r.left_size(), r.right_size()))
    }

    /// Check required fields before the frame reaches any encoder
    pub fn validate(&self, expected_agents: usize) -> Result<(), ObservationError> {
        if self.records.is_empty() {
            return Err(ObservationError::EmptyFrame);
        }
        if self.records.len() != expected_agents {
            return Err(ObservationError::AgentCount {
                expected: expected_agents,
                found: self.records.len(),
            });
        }

        let sizes = (self.records[0].left_size(), self.records[0].right_size());
        for (idx, record) in self.records.iter().enumerate() {
            record.validate(idx)?;
            let found = (record.left_size(), record.right_size());
            if found != sizes {
                return Err(ObservationError::TeamSizeChanged { record: idx, expected: sizes, found });
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ObservationFrame {
    type Item = &'a PlayerObservation;
    type IntoIter = std::slice::Iter<'a, PlayerObservation>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl From<Vec<PlayerObservation>> for ObservationFrame {
    fn from(records: Vec<PlayerObservation>) -> Self {
        Self::new(records)
    }
}

// =============================================================================
// Tests
// =============================================================================
