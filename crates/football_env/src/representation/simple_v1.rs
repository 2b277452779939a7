//! Compact egocentric vector (`simplev1`)
//!
//! Per agent, with `n1` own players and `n2` opponents:
//!
//! | field                                   | size         |
//! |-----------------------------------------|--------------|
//! | active player position, direction       | 4            |
//! | sprint, dribble                         | 2            |
//! | other own players relative to active    | `(n1-1) * 2` |
//! | opponents relative to active            | `n2 * 2`     |
//! | ball relative to active                 | 2            |
//! | other own players position, direction  | `(n1-1) * 4` |
//! | opponents position, direction           | `n2 * 4`     |
//! | ball position, direction                | 6            |
//! | ball ownership one-hot                  | 3            |
//! | game mode one-hot                       | 7            |
//! | active player one-hot                   | `n1`         |
//!
//! for a total of `7*n1 + 6*n2 + 18`.
//!
//! The encoder also defines the global state of a frame, built from the
//! first record only: absolute team blocks, ball, ownership and game mode,
//! followed by one `n1` one-hot per controlled agent marking its active
//! player.

use super::{Representation, RepresentationEncoder};
use crate::contract::ObservationSpec;
use crate::error::EnvResult;
use crate::observation::{stack_rows, Observation, ObservationError, ObservationFrame, PlayerObservation};
use crate::simulator::SimulatorLayout;

/// Observation length for `n1` own and `n2` opposing players
pub fn simple_v1_len(n1: usize, n2: usize) -> usize {
    7 * n1 + 6 * n2 + 18
}

/// Global state length for `agents` controlled players
pub fn global_state_len(n1: usize, n2: usize, agents: usize) -> usize {
    4 * (n1 + n2) + 16 + agents * n1
}

fn one_hot(len: usize, hot: Option<usize>) -> impl Iterator<Item = f32> {
    (0..len).map(move |i| if hot == Some(i) { 1.0 } else { 0.0 })
}

fn flatten(points: &[[f32; 2]]) -> impl Iterator<Item = f32> + '_ {
    points.iter().flat_map(|p| p.iter().copied())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleV1Encoder;

impl SimpleV1Encoder {
    fn encode_record(record: usize, r: &PlayerObservation) -> Result<Vec<f32>, ObservationError> {
        let (n1, n2) = (r.left_size(), r.right_size());
        for (team, positions, directions) in
            [("left", n1, r.left_team_direction.len()), ("right", n2, r.right_team_direction.len())]
        {
            if positions != directions {
                return Err(ObservationError::TeamLength { record, team, positions, directions });
            }
        }
        let active = r.active.ok_or(ObservationError::MissingActive { record })?;
        let me = *r.left_team.get(active).ok_or(ObservationError::IndexOutOfRange {
            record,
            field: "active",
            index: active,
            len: n1,
        })?;
        let others: Vec<usize> = (0..n1).filter(|&i| i != active).collect();

        let mut v = Vec::with_capacity(simple_v1_len(n1, n2));
        v.extend_from_slice(&me);
        v.extend_from_slice(&r.left_team_direction[active]);
        v.extend_from_slice(&r.sticky_actions.to_f32_array());

        for &i in &others {
            v.push(r.left_team[i][0] - me[0]);
            v.push(r.left_team[i][1] - me[1]);
        }
        for p in &r.right_team {
            v.push(p[0] - me[0]);
            v.push(p[1] - me[1]);
        }
        v.push(r.ball[0] - me[0]);
        v.push(r.ball[1] - me[1]);

        for &i in &others {
            v.extend_from_slice(&r.left_team[i]);
        }
        for &i in &others {
            v.extend_from_slice(&r.left_team_direction[i]);
        }
        v.extend(flatten(&r.right_team));
        v.extend(flatten(&r.right_team_direction));

        v.extend_from_slice(&r.ball);
        v.extend_from_slice(&r.ball_direction);
        v.extend_from_slice(&r.ball_owned_team.to_one_hot());
        v.extend_from_slice(&r.game_mode.to_one_hot());
        v.extend(one_hot(n1, Some(active)));

        debug_assert_eq!(v.len(), simple_v1_len(n1, n2));
        Ok(v)
    }

    /// Global state of `frame`
    pub fn state(frame: &ObservationFrame) -> Result<Vec<f32>, ObservationError> {
        let first = frame.first().ok_or(ObservationError::EmptyFrame)?;
        let (n1, n2) = (first.left_size(), first.right_size());

        let mut v = Vec::with_capacity(global_state_len(n1, n2, frame.len()));
        v.extend(flatten(&first.left_team));
        v.extend(flatten(&first.left_team_direction));
        v.extend(flatten(&first.right_team));
        v.extend(flatten(&first.right_team_direction));
        v.extend_from_slice(&first.ball);
        v.extend_from_slice(&first.ball_direction);
        v.extend_from_slice(&first.ball_owned_team.to_one_hot());
        v.extend_from_slice(&first.game_mode.to_one_hot());

        for (record, r) in frame.iter().enumerate() {
            let active = r.active.ok_or(ObservationError::MissingActive { record })?;
            v.extend(one_hot(n1, Some(active)));
        }
        Ok(v)
    }
}

impl RepresentationEncoder for SimpleV1Encoder {
    fn representation(&self) -> Representation {
        Representation::SimpleV1
    }

    fn encode(&self, frame: &ObservationFrame) -> EnvResult<Observation> {
        let rows = frame
            .iter()
            .enumerate()
            .map(|(i, r)| Self::encode_record(i, r))
            .collect::<Result<Vec<_>, _>>()?;
        let (n1, n2) = frame.team_sizes().unwrap_or((0, 0));
        Ok(Observation::Vector { array: stack_rows(rows, &[simple_v1_len(n1, n2)])? })
    }

    fn observation_spec(&self, layout: &SimulatorLayout) -> EnvResult<ObservationSpec> {
        let len = simple_v1_len(layout.left_team_size, layout.right_team_size);
        Ok(ObservationSpec::vector(vec![layout.controlled_agents, len]))
    }

    fn global_state(&self, frame: &ObservationFrame) -> Option<EnvResult<Vec<f32>>> {
        Some(Self::state(frame).map_err(Into::into))
    }

    fn global_state_spec(&self, layout: &SimulatorLayout) -> Option<ObservationSpec> {
        let len = global_state_len(layout.left_team_size, layout.right_team_size, layout.controlled_agents);
        Some(ObservationSpec::vector(vec![len]))
    }
}

// =============================================================================
// Tests
// =============================================================================
