mod action_mask;
mod dump;
mod frame_stack;
mod reducer;
mod representation;
mod reward;
mod squeeze;
mod state;

pub use action_mask::ActionMaskStage;
pub use dump::{ImmediateRender, PeriodicDumpWriter};
pub use frame_stack::{FrameStack, FRAME_STACK_DEPTH};
pub use reducer::ScenarioReducer;
pub use representation::RepresentationStage;
pub use reward::RewardStage;
pub use squeeze::{ObservationSqueeze, RewardSqueeze};
pub use state::StateAccessor;
