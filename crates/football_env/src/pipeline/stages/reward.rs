use crate::error::{EnvError, EnvResult};
use crate::pipeline::{Reward, Timestep, Transform};
use crate::reward::CompositeReward;

/// Replaces the scoring signal with the shaped reward
///
/// Runs first, on simulator-native records and rewards.
#[derive(Debug)]
pub struct RewardStage {
    reward: CompositeReward,
}

impl RewardStage {
    pub fn new(reward: CompositeReward) -> Self {
        Self { reward }
    }
}

impl Transform for RewardStage {
    fn name(&self) -> &'static str {
        "reward"
    }

    fn on_reset(&mut self, _ts: &mut Timestep) -> EnvResult<()> {
        self.reward.reset();
        Ok(())
    }

    fn on_step(&mut self, ts: &mut Timestep) -> EnvResult<()> {
        let scores = ts
            .reward
            .per_agent()
            .ok_or_else(|| EnvError::invariant("reward shaping expects per-agent rewards"))?;
        ts.reward = Reward::PerAgent(self.reward.shape(&ts.frame, scores));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::{BallOwner, ObservationFrame};
    use crate::reward::RewardSet;
    use crate::simulator::SimulatorOutput;
    use crate::testing::record;

    fn step(ball_x: f32, score: f32) -> Timestep {
        let mut r = record(3, 2);
        r.ball = [ball_x, 0.0, 0.0];
        r.ball_owned_team = BallOwner::Left;
        r.ball_owned_player = Some(0);
        Timestep::from_output(SimulatorOutput {
            frame: ObservationFrame::new(vec![r]),
            reward: vec![score],
            done: false,
            action_mask: None,
        })
    }

    #[test]
    fn test_shaped_reward_keeps_score_in_info() {
        let mut stage = RewardStage::new(RewardSet::parse("scoring,checkpoints").unwrap().build());
        let mut ts = step(0.5, 0.0);
        stage.on_step(&mut ts).unwrap();

        assert!((ts.reward.total() - 0.6).abs() < 1e-5);
        assert_eq!(ts.info.score_reward, Reward::PerAgent(vec![0.0]));
    }

    #[test]
    fn test_reset_restarts_ladder() {
        let mut stage = RewardStage::new(RewardSet::parse("scoring,checkpoints").unwrap().build());
        let mut ts = step(0.5, 0.0);
        stage.on_step(&mut ts).unwrap();

        let mut again = step(0.5, 0.0);
        stage.on_step(&mut again).unwrap();
        assert_eq!(again.reward.total(), 0.0);

        stage.on_reset(&mut step(0.0, 0.0)).unwrap();
        let mut after_reset = step(0.5, 0.0);
        stage.on_step(&mut after_reset).unwrap();
        assert!(after_reset.reward.total() > 0.0);
    }
}
