//! CheckpointReward - dense progress bonus
//!
//! The opponent half is split into a ladder of distance bands around the
//! goal at `(1, 0)`. While the agent's own active player holds the ball, every
//! band the ball has entered pays `CHECKPOINT_REWARD` once per episode. Scoring pays
//! out all remaining checkpoints at once.
//!
//! Band `k` (0-based) is entered when the ball's distance to the goal
//! drops to `0.99 - 0.8 / (CHECKPOINT_COUNT - 1) * k` or below.

use tracing::debug;

use super::RewardShaper;
use crate::observation::{BallOwner, PlayerObservation};

pub const CHECKPOINT_COUNT: usize = 10;
pub const CHECKPOINT_REWARD: f32 = 0.1;

const OUTER_RADIUS: f32 = 0.99;
const LADDER_SPAN: f32 = 0.8;

#[derive(Debug, Clone, Default)]
pub struct CheckpointReward {
    /// Checkpoints collected so far, per agent index
    collected: Vec<usize>,
}

impl CheckpointReward {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checkpoints collected by `agent` this episode
    pub fn collected(&self, agent: usize) -> usize {
        self.collected.get(agent).copied().unwrap_or(0)
    }

    fn threshold(collected: usize) -> f32 {
        OUTER_RADIUS - LADDER_SPAN / (CHECKPOINT_COUNT - 1) as f32 * collected as f32
    }

    fn slot(&mut self, agent: usize) -> &mut usize {
        if self.collected.len() <= agent {
            self.collected.resize(agent + 1, 0);
        }
        &mut self.collected[agent]
    }
}

impl RewardShaper for CheckpointReward {
    fn compute(&mut self, agent: usize, record: &PlayerObservation, score: f32) -> f32 {
        let collected = self.slot(agent);

        if score == 1.0 {
            let remaining = CHECKPOINT_COUNT - *collected;
            *collected = CHECKPOINT_COUNT;
            return CHECKPOINT_REWARD * remaining as f32;
        }

        // only the active player carrying the ball collects
        if record.ball_owned_team != BallOwner::Left || record.ball_owned_player != record.active {
            return 0.0;
        }

        let d = ((record.ball[0] - 1.0).powi(2) + record.ball[1].powi(2)).sqrt();
        let mut bonus = 0.0;
        while *collected < CHECKPOINT_COUNT && d <= Self::threshold(*collected) {
            *collected += 1;
            bonus += CHECKPOINT_REWARD;
        }

        if bonus > 0.0 {
            debug!(agent, collected = *collected, distance = d, "Checkpoints collected");
        }
        bonus
    }

    fn name(&self) -> &str {
        "checkpoints"
    }

    fn reset(&mut self) {
        self.collected.clear();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::record;

    fn holding_ball_at(x: f32, y: f32) -> PlayerObservation {
        let mut r = record(3, 2);
        r.ball = [x, y, 0.0];
        r.ball_owned_team = BallOwner::Left;
        r.ball_owned_player = Some(0);
        r
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_thresholds_span_ladder() {
        assert!(approx(CheckpointReward::threshold(0), 0.99));
        assert!(approx(CheckpointReward::threshold(9), 0.19));
    }

    #[test]
    fn test_no_bonus_without_possession() {
        let mut shaper = CheckpointReward::new();
        let mut r = holding_ball_at(0.9, 0.0);
        r.ball_owned_team = BallOwner::Right;
        r.ball_owned_player = Some(0);
        assert_eq!(shaper.compute(0, &r, 0.0), 0.0);
        r.ball_owned_team = BallOwner::None;
        r.ball_owned_player = None;
        assert_eq!(shaper.compute(0, &r, 0.0), 0.0);
    }

    #[test]
    fn test_no_bonus_when_teammate_holds_ball() {
        let mut shaper = CheckpointReward::new();
        let mut r = holding_ball_at(0.9, 0.0);
        r.ball_owned_player = Some(2);
        assert_eq!(shaper.compute(0, &r, 0.0), 0.0);
        assert_eq!(shaper.collected(0), 0);

        r.active = Some(2);
        assert!(shaper.compute(0, &r, 0.0) > 0.0);
    }

    #[test]
    fn test_bonus_awarded_once_per_zone() {
        let mut shaper = CheckpointReward::new();
        // d = 0.95: only the outermost band
        assert!(approx(shaper.compute(0, &holding_ball_at(0.05, 0.0), 0.0), 0.1));
        assert_eq!(shaper.compute(0, &holding_ball_at(0.05, 0.0), 0.0), 0.0);
        assert_eq!(shaper.collected(0), 1);

        // d = 0.5: bands with threshold >= 0.5 -> k <= 5.5, six in total
        assert!(approx(shaper.compute(0, &holding_ball_at(0.5, 0.0), 0.0), 0.5));
        assert_eq!(shaper.collected(0), 6);

        // moving back pays nothing
        assert_eq!(shaper.compute(0, &holding_ball_at(-0.5, 0.0), 0.0), 0.0);
    }

    #[test]
    fn test_goal_pays_remaining() {
        let mut shaper = CheckpointReward::new();
        shaper.compute(0, &holding_ball_at(0.5, 0.0), 0.0);
        assert!(approx(shaper.compute(0, &record(3, 2), 1.0), 0.4));
        assert_eq!(shaper.collected(0), CHECKPOINT_COUNT);
        // nothing left after the goal
        assert_eq!(shaper.compute(0, &holding_ball_at(0.99, 0.0), 0.0), 0.0);
        assert_eq!(shaper.compute(0, &record(3, 2), 1.0), 0.0);
    }

    #[test]
    fn test_agents_tracked_independently() {
        let mut shaper = CheckpointReward::new();
        shaper.compute(1, &holding_ball_at(0.5, 0.0), 0.0);
        assert_eq!(shaper.collected(0), 0);
        assert_eq!(shaper.collected(1), 6);
        assert!(shaper.compute(0, &holding_ball_at(0.5, 0.0), 0.0) > 0.0);
    }

    #[test]
    fn test_reset_clears_progress() {
        let mut shaper = CheckpointReward::new();
        shaper.compute(0, &holding_ball_at(0.9, 0.0), 0.0);
        shaper.reset();
        assert_eq!(shaper.collected(0), 0);
        assert!(shaper.compute(0, &holding_ball_at(0.9, 0.0), 0.0) > 0.0);
    }

    #[test]
    fn test_own_goal_is_not_a_goal_bonus() {
        let mut shaper = CheckpointReward::new();
        assert_eq!(shaper.compute(0, &record(3, 2), -1.0), 0.0);
    }
}
