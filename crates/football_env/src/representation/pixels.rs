//! Downsampled rendered frames
//!
//! The simulator renders one frame per step; it is shared by all agents, so
//! the first record's frame is converted once and replicated per agent.

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};

use super::{ChannelDimensions, Representation, RepresentationEncoder};
use crate::contract::ObservationSpec;
use crate::error::EnvResult;
use crate::observation::{stack_rows, Observation, ObservationError, ObservationFrame, RenderedFrame};
use crate::simulator::SimulatorLayout;

#[derive(Debug, Clone, Copy)]
pub struct PixelsEncoder {
    dims: ChannelDimensions,
    gray: bool,
}

impl PixelsEncoder {
    pub fn rgb(dims: ChannelDimensions) -> Self {
        Self { dims, gray: false }
    }

    pub fn gray(dims: ChannelDimensions) -> Self {
        Self { dims, gray: true }
    }

    fn channels(&self) -> usize {
        if self.gray {
            1
        } else {
            3
        }
    }

    fn row_shape(&self) -> [usize; 3] {
        [self.dims.height as usize, self.dims.width as usize, self.channels()]
    }

    fn downsample(&self, rendered: &RenderedFrame) -> Result<Vec<u8>, ObservationError> {
        let invalid = || ObservationError::InvalidFrameBuffer {
            width: rendered.width,
            height: rendered.height,
            len: rendered.data.len(),
        };
        let rgb = RgbImage::from_raw(rendered.width, rendered.height, rendered.data.clone()).ok_or_else(invalid)?;

        let (w, h) = (self.dims.width, self.dims.height);
        Ok(if self.gray {
            let luma: GrayImage = imageops::grayscale(&rgb);
            imageops::resize(&luma, w, h, FilterType::Triangle).into_raw()
        } else {
            imageops::resize(&rgb, w, h, FilterType::Triangle).into_raw()
        })
    }
}

impl RepresentationEncoder for PixelsEncoder {
    fn representation(&self) -> Representation {
        if self.gray {
            Representation::PixelsGray
        } else {
            Representation::Pixels
        }
    }

    fn encode(&self, frame: &ObservationFrame) -> EnvResult<Observation> {
        let rendered = frame
            .first()
            .and_then(|r| r.frame.as_ref())
            .ok_or(ObservationError::MissingFrame)?;
        let pixels = self.downsample(rendered)?;
        let rows = vec![pixels; frame.len()];
        Ok(Observation::Spatial { array: stack_rows(rows, &self.row_shape())? })
    }

    fn observation_spec(&self, layout: &SimulatorLayout) -> EnvResult<ObservationSpec> {
        let mut shape = vec![layout.controlled_agents];
        shape.extend_from_slice(&self.row_shape());
        Ok(ObservationSpec::spatial(shape))
    }
}
