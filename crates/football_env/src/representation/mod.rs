//! Representation encoders
//!
//! One encoder per representation key, chosen once at construction. Each
//! turns a validated [`ObservationFrame`] into the artifact the caller sees
//! and reports the contract of that artifact up front.
//!
//! | key           | artifact                         |
//! |---------------|----------------------------------|
//! | `raw`         | the records themselves           |
//! | `pixels`      | `(n, H, W, 3)` u8                |
//! | `pixels_gray` | `(n, H, W, 1)` u8                |
//! | `extracted`   | `(n, H, W, 4)` u8 minimap planes |
//! | `simple115`   | `(n, 115)` f32                   |
//! | `simple115v2` | `(n, 115)` f32, padded teams     |
//! | `simplev1`    | `(n, 7*n1 + 6*n2 + 18)` f32      |

mod minimap;
mod pixels;
mod raw;
mod simple115;
mod simple_v1;

pub use minimap::{MinimapEncoder, MINIMAP_PLANES};
pub use pixels::PixelsEncoder;
pub use raw::RawEncoder;
pub use simple115::{Simple115Encoder, SIMPLE115_LEN};
pub use simple_v1::{global_state_len, simple_v1_len, SimpleV1Encoder};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::contract::ObservationSpec;
use crate::error::{EnvError, EnvResult};
use crate::observation::{Observation, ObservationFrame};
use crate::simulator::SimulatorLayout;

// =============================================================================
// Representation key
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Representation {
    #[serde(rename = "raw")]
    Raw,
    #[serde(rename = "pixels")]
    Pixels,
    #[serde(rename = "pixels_gray")]
    PixelsGray,
    #[serde(rename = "extracted")]
    Extracted,
    #[serde(rename = "simple115")]
    Simple115,
    #[serde(rename = "simple115v2")]
    Simple115V2,
    #[serde(rename = "simplev1")]
    SimpleV1,
}

impl Representation {
    pub const ALL: [Representation; 7] = [
        Representation::Raw,
        Representation::Pixels,
        Representation::PixelsGray,
        Representation::Extracted,
        Representation::Simple115,
        Representation::Simple115V2,
        Representation::SimpleV1,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Representation::Raw => "raw",
            Representation::Pixels => "pixels",
            Representation::PixelsGray => "pixels_gray",
            Representation::Extracted => "extracted",
            Representation::Simple115 => "simple115",
            Representation::Simple115V2 => "simple115v2",
            Representation::SimpleV1 => "simplev1",
        }
    }

    /// Exact, case-sensitive key lookup
    pub fn parse(key: &str) -> EnvResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.key() == key)
            .ok_or_else(|| EnvError::config("representation", key, "unsupported representation"))
    }

    /// Artifact has a trailing channel axis and can be frame-stacked
    pub fn is_spatial(&self) -> bool {
        matches!(self, Representation::Pixels | Representation::PixelsGray | Representation::Extracted)
    }

    /// Only valid for 11-a-side scenarios
    pub fn requires_full_match(&self) -> bool {
        matches!(self, Representation::Simple115)
    }

    pub fn needs_rendering(&self) -> bool {
        matches!(self, Representation::Pixels | Representation::PixelsGray)
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Output `(width, height)` of spatial representations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDimensions {
    pub width: u32,
    pub height: u32,
}

impl ChannelDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub(crate) fn check(&self) -> EnvResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(EnvError::config(
                "channel_dimensions",
                format!("{}x{}", self.width, self.height),
                "dimensions must be positive",
            ));
        }
        Ok(())
    }
}

impl Default for ChannelDimensions {
    fn default() -> Self {
        Self { width: 96, height: 72 }
    }
}

// =============================================================================
// RepresentationEncoder
// =============================================================================

pub trait RepresentationEncoder: Send + Sync + fmt::Debug {
    fn representation(&self) -> Representation;

    fn encode(&self, frame: &ObservationFrame) -> EnvResult<Observation>;

    /// Contract of [`encode`](Self::encode) for frames of this layout
    fn observation_spec(&self, layout: &SimulatorLayout) -> EnvResult<ObservationSpec>;

    /// Flat global state of the frame, for encoders that define one
    fn global_state(&self, _frame: &ObservationFrame) -> Option<EnvResult<Vec<f32>>> {
        None
    }

    fn global_state_spec(&self, _layout: &SimulatorLayout) -> Option<ObservationSpec> {
        None
    }
}

/// Encoder for `representation`
pub fn build_encoder(
    representation: Representation,
    dims: ChannelDimensions,
) -> EnvResult<Arc<dyn RepresentationEncoder>> {
    if representation.is_spatial() {
        dims.check()?;
    }
    Ok(match representation {
        Representation::Raw => Arc::new(RawEncoder),
        Representation::Pixels => Arc::new(PixelsEncoder::rgb(dims)),
        Representation::PixelsGray => Arc::new(PixelsEncoder::gray(dims)),
        Representation::Extracted => Arc::new(MinimapEncoder::new(dims)),
        Representation::Simple115 => Arc::new(Simple115Encoder::strict()),
        Representation::Simple115V2 => Arc::new(Simple115Encoder::padded()),
        Representation::SimpleV1 => Arc::new(SimpleV1Encoder),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::full_match_frame;

    #[test]
    fn test_parse_all_keys() {
        for r in Representation::ALL {
            assert_eq!(Representation::parse(r.key()).unwrap(), r);
            assert_eq!(serde_json::to_string(&r).unwrap(), format!("\"{}\"", r.key()));
        }
    }

    #[test]
    fn test_unsupported_key_is_named() {
        let err = Representation::parse("unsupported_repr").unwrap_err();
        assert_eq!(err.config_key(), Some("representation"));
        assert!(err.to_string().contains("unsupported_repr"));

        // case-sensitive
        assert!(Representation::parse("Simple115").is_err());
    }

    #[test]
    fn test_spatial_keys() {
        let spatial: Vec<_> = Representation::ALL.iter().filter(|r| r.is_spatial()).map(|r| r.key()).collect();
        assert_eq!(spatial, vec!["pixels", "pixels_gray", "extracted"]);
    }

    #[test]
    fn test_only_simple115_requires_full_match() {
        let strict: Vec<_> = Representation::ALL.iter().filter(|r| r.requires_full_match()).map(|r| r.key()).collect();
        assert_eq!(strict, vec!["simple115"]);
    }

    #[test]
    fn test_zero_dimensions_rejected_for_spatial() {
        let err = build_encoder(Representation::Extracted, ChannelDimensions::new(0, 72)).unwrap_err();
        assert_eq!(err.config_key(), Some("channel_dimensions"));
        assert!(build_encoder(Representation::Simple115, ChannelDimensions::new(0, 0)).is_ok());
    }

    #[test]
    fn test_encoders_match_their_spec() {
        let frame = full_match_frame(1);
        let layout = SimulatorLayout { controlled_agents: 1, left_team_size: 11, right_team_size: 11 };
        for r in Representation::ALL.iter().filter(|r| !r.needs_rendering()) {
            let encoder = build_encoder(*r, ChannelDimensions::default()).unwrap();
            assert_eq!(encoder.representation(), *r);
            let obs = encoder.encode(&frame).unwrap();
            assert_eq!(obs.shape(), encoder.observation_spec(&layout).unwrap().shape, "{r}");
        }
    }
}
