//! 115-float vector encoder
//!
//! Layout (indices inclusive):
//! - `[0-5]`     ball position (x, y, z) and direction
//! - `[6-8]`     ball ownership one-hot (nobody, left, right)
//! - `[9-19]`    active player one-hot over 11 left slots
//! - `[20-41]`   left positions, `[42-63]` left directions
//! - `[64-85]`   right positions, `[86-107]` right directions
//! - `[108-114]` game mode one-hot
//!
//! The strict variant only accepts 11 players per side. The padded variant
//! keeps fixed slot positions and fills missing players with `-1`.

use super::{Representation, RepresentationEncoder};
use crate::contract::ObservationSpec;
use crate::error::EnvResult;
use crate::observation::{stack_rows, Observation, ObservationError, ObservationFrame, PlayerObservation};
use crate::simulator::SimulatorLayout;

pub const SIMPLE115_LEN: usize = 115;

const TEAM_SLOTS: usize = 11;
const PAD: f32 = -1.0;

#[derive(Debug, Clone, Copy)]
pub struct Simple115Encoder {
    padded: bool,
}

impl Simple115Encoder {
    /// `simple115`
    pub fn strict() -> Self {
        Self { padded: false }
    }

    /// `simple115v2`
    pub fn padded() -> Self {
        Self { padded: true }
    }

    fn check_sizes(&self, left: usize, right: usize) -> Result<(), ObservationError> {
        let ok = if self.padded {
            left <= TEAM_SLOTS && right <= TEAM_SLOTS
        } else {
            left == TEAM_SLOTS && right == TEAM_SLOTS
        };
        if ok {
            Ok(())
        } else {
            Err(ObservationError::TeamSize { expected: TEAM_SLOTS, left, right })
        }
    }

    fn encode_record(&self, r: &PlayerObservation) -> Result<Vec<f32>, ObservationError> {
        self.check_sizes(r.left_size(), r.right_size())?;

        let mut v = Vec::with_capacity(SIMPLE115_LEN);
        v.extend_from_slice(&r.ball);
        v.extend_from_slice(&r.ball_direction);
        v.extend_from_slice(&r.ball_owned_team.to_one_hot());
        v.extend((0..TEAM_SLOTS).map(|i| if r.active == Some(i) { 1.0 } else { 0.0 }));
        push_block(&mut v, &r.left_team);
        push_block(&mut v, &r.left_team_direction);
        push_block(&mut v, &r.right_team);
        push_block(&mut v, &r.right_team_direction);
        v.extend_from_slice(&r.game_mode.to_one_hot());

        debug_assert_eq!(v.len(), SIMPLE115_LEN);
        Ok(v)
    }
}

/// 11 `(x, y)` slots, padded with `-1`
fn push_block(v: &mut Vec<f32>, points: &[[f32; 2]]) {
    for slot in 0..TEAM_SLOTS {
        match points.get(slot) {
            Some(p) => v.extend_from_slice(p),
            None => v.extend_from_slice(&[PAD, PAD]),
        }
    }
}

impl RepresentationEncoder for Simple115Encoder {
    fn representation(&self) -> Representation {
        if self.padded {
            Representation::Simple115V2
        } else {
            Representation::Simple115
        }
    }

    fn encode(&self, frame: &ObservationFrame) -> EnvResult<Observation> {
        let rows = frame.iter().map(|r| self.encode_record(r)).collect::<Result<Vec<_>, _>>()?;
        Ok(Observation::Vector { array: stack_rows(rows, &[SIMPLE115_LEN])? })
    }

    fn observation_spec(&self, layout: &SimulatorLayout) -> EnvResult<ObservationSpec> {
        self.check_sizes(layout.left_team_size, layout.right_team_size)?;
        Ok(ObservationSpec::vector(vec![layout.controlled_agents, SIMPLE115_LEN]))
    }
}

// =============================================================================
// Tests
// =============================================================================
