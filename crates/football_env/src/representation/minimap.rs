//! Super minimap ("extracted") encoder
//!
//! Four binary planes per agent, stored HWC:
//! - 0: own team players
//! - 1: opponent players
//! - 2: ball
//! - 3: active player
//!
//! Pitch coordinates span x in `[-1, 1]` and y in `[-1/2.25, 1/2.25]`.
//! Cells are found by truncating the scaled coordinate and clamping it onto
//! the plane, so off-pitch objects land on the border.

use super::{ChannelDimensions, Representation, RepresentationEncoder};
use crate::contract::ObservationSpec;
use crate::error::EnvResult;
use crate::observation::{stack_rows, Observation, ObservationFrame, PlayerObservation};
use crate::simulator::SimulatorLayout;

pub const MINIMAP_PLANES: usize = 4;

const PLANE_LEFT: usize = 0;
const PLANE_RIGHT: usize = 1;
const PLANE_BALL: usize = 2;
const PLANE_ACTIVE: usize = 3;

const MARKER: u8 = 255;

const X_MIN: f32 = -1.0;
const X_MAX: f32 = 1.0;
const Y_MIN: f32 = -1.0 / 2.25;
const Y_MAX: f32 = 1.0 / 2.25;

#[derive(Debug, Clone, Copy)]
pub struct MinimapEncoder {
    dims: ChannelDimensions,
}

impl MinimapEncoder {
    pub fn new(dims: ChannelDimensions) -> Self {
        Self { dims }
    }

    fn width(&self) -> usize {
        self.dims.width as usize
    }

    fn height(&self) -> usize {
        self.dims.height as usize
    }

    /// Plane cell `(x, y)` of a pitch position
    fn cell(&self, point: [f32; 2]) -> (usize, usize) {
        let (w, h) = (self.width() as i64, self.height() as i64);
        let x = ((point[0] - X_MIN) / (X_MAX - X_MIN) * w as f32) as i64;
        let y = ((point[1] - Y_MIN) / (Y_MAX - Y_MIN) * h as f32) as i64;
        (x.clamp(0, w - 1) as usize, y.clamp(0, h - 1) as usize)
    }

    fn mark(&self, planes: &mut [u8], plane: usize, point: [f32; 2]) {
        let (x, y) = self.cell(point);
        planes[(y * self.width() + x) * MINIMAP_PLANES + plane] = MARKER;
    }

    fn encode_record(&self, record: &PlayerObservation) -> Vec<u8> {
        let mut planes = vec![0u8; self.width() * self.height() * MINIMAP_PLANES];

        for &p in &record.left_team {
            self.mark(&mut planes, PLANE_LEFT, p);
        }
        for &p in &record.right_team {
            self.mark(&mut planes, PLANE_RIGHT, p);
        }
        self.mark(&mut planes, PLANE_BALL, [record.ball[0], record.ball[1]]);
        if let Some(p) = record.active_position() {
            self.mark(&mut planes, PLANE_ACTIVE, p);
        }
        planes
    }

    fn row_shape(&self) -> [usize; 3] {
        [self.height(), self.width(), MINIMAP_PLANES]
    }
}

impl RepresentationEncoder for MinimapEncoder {
    fn representation(&self) -> Representation {
        Representation::Extracted
    }

    fn encode(&self, frame: &ObservationFrame) -> EnvResult<Observation> {
        let rows = frame.iter().map(|r| self.encode_record(r)).collect();
        Ok(Observation::Spatial { array: stack_rows(rows, &self.row_shape())? })
    }

    fn observation_spec(&self, layout: &SimulatorLayout) -> EnvResult<ObservationSpec> {
        let mut shape = vec![layout.controlled_agents];
        shape.extend_from_slice(&self.row_shape());
        Ok(ObservationSpec::spatial(shape))
    }
}

// =============================================================================
// Tests
// =============================================================================
