//! Test fixtures: synthetic records and a scripted simulator

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::observation::{BallOwner, GameMode, ObservationFrame, PlayerObservation, StickyActions};
use crate::simulator::{Action, DumpOptions, Simulator, SimulatorError, SimulatorLayout, SimulatorOutput};

/// Valid record with `left` own players and `right` opponents, driving player 0
pub fn record(left: usize, right: usize) -> PlayerObservation {
    let has_player = left > 0;
    PlayerObservation {
        left_team: (0..left).map(|i| [-0.5 + 0.05 * i as f32, -0.2 + 0.03 * i as f32]).collect(),
        left_team_direction: vec![[0.01, 0.0]; left],
        right_team: (0..right).map(|i| [0.5 - 0.05 * i as f32, 0.2 - 0.03 * i as f32]).collect(),
        right_team_direction: vec![[-0.01, 0.0]; right],
        ball: [0.0, 0.0, 0.0],
        ball_direction: [0.0, 0.0, 0.0],
        ball_owned_team: BallOwner::None,
        ball_owned_player: None,
        game_mode: GameMode::Normal,
        active: has_player.then_some(0),
        designated: has_player.then_some(0),
        sticky_actions: StickyActions::new(false, false),
        frame: None,
    }
}

/// `agents` records of an 11-a-side match
pub fn full_match_frame(agents: usize) -> ObservationFrame {
    ObservationFrame::new((0..agents).map(|_| record(11, 11)).collect())
}

/// Three records of a 3v3 scenario; only `designated` drives the designated player
pub fn multiagent_frame(designated: usize) -> ObservationFrame {
    let records = (0..3)
        .map(|i| {
            let mut r = record(3, 3);
            r.active = Some(i);
            r.designated = Some(designated);
            r
        })
        .collect();
    ObservationFrame::new(records)
}

pub fn output(frame: ObservationFrame, reward: Vec<f32>) -> SimulatorOutput {
    SimulatorOutput { frame, reward, done: false, action_mask: None }
}

/// Everything a [`ScriptedSimulator`] was asked to do
#[derive(Debug, Default)]
pub struct SimLog {
    pub resets: usize,
    pub steps: Vec<Vec<Action>>,
    pub renders: usize,
    pub disable_renders: usize,
    pub dump_history: Vec<DumpOptions>,
    pub dump_options: DumpOptions,
    pub closes: usize,
    pub state: Vec<u8>,
}

/// Replays prepared outputs; falls back to the initial frame with zero reward
#[derive(Debug)]
pub struct ScriptedSimulator {
    initial: ObservationFrame,
    steps: VecDeque<SimulatorOutput>,
    log: Arc<Mutex<SimLog>>,
}

impl ScriptedSimulator {
    pub fn new(initial: ObservationFrame) -> Self {
        Self { initial, steps: VecDeque::new(), log: Arc::default() }
    }

    pub fn with_steps(mut self, steps: Vec<SimulatorOutput>) -> Self {
        self.steps = steps.into();
        self
    }

    pub fn with_dump_options(self, options: DumpOptions) -> Self {
        self.record(|log| log.dump_options = options);
        self
    }

    pub fn log(&self) -> Arc<Mutex<SimLog>> {
        self.log.clone()
    }

    fn record<T>(&self, f: impl FnOnce(&mut SimLog) -> T) -> T {
        let mut log = self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut log)
    }

    fn idle(&self) -> SimulatorOutput {
        output(self.initial.clone(), vec![0.0; self.initial.len()])
    }
}

impl Simulator for ScriptedSimulator {
    fn layout(&self) -> SimulatorLayout {
        let (left, right) = self.initial.team_sizes().unwrap_or((0, 0));
        SimulatorLayout { controlled_agents: self.initial.len(), left_team_size: left, right_team_size: right }
    }

    fn reset(&mut self) -> Result<SimulatorOutput, SimulatorError> {
        self.record(|log| log.resets += 1);
        Ok(self.idle())
    }

    fn step(&mut self, actions: &[Action]) -> Result<SimulatorOutput, SimulatorError> {
        self.record(|log| log.steps.push(actions.to_vec()));
        Ok(self.steps.pop_front().unwrap_or_else(|| self.idle()))
    }

    fn render(&mut self) -> Result<(), SimulatorError> {
        self.record(|log| log.renders += 1);
        Ok(())
    }

    fn disable_render(&mut self) -> Result<(), SimulatorError> {
        self.record(|log| log.disable_renders += 1);
        Ok(())
    }

    fn dump_options(&self) -> DumpOptions {
        self.record(|log| log.dump_options.clone())
    }

    fn set_dump_options(&mut self, options: DumpOptions) {
        self.record(|log| {
            log.dump_history.push(options.clone());
            log.dump_options = options;
        });
    }

    fn get_state(&self) -> Result<Vec<u8>, SimulatorError> {
        Ok(self.record(|log| log.state.clone()))
    }

    fn set_state(&mut self, state: &[u8]) -> Result<(), SimulatorError> {
        self.record(|log| log.state = state.to_vec());
        Ok(())
    }

    fn close(&mut self) {
        self.record(|log| log.closes += 1);
    }
}
