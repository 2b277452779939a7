use super::RewardShaper;
use crate::observation::PlayerObservation;

/// Simulator scoring signal (+1 goal for, -1 goal against)
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringReward;

impl RewardShaper for ScoringReward {
    fn compute(&mut self, _agent: usize, _record: &PlayerObservation, score: f32) -> f32 {
        score
    }

    fn name(&self) -> &str {
        "scoring"
    }
}
