//! Task plugins.
mod common;
mod go_through_positions;
mod go_to_position;
pub use go_through_positions::{GoThroughPositions, GoThroughPositionsConfig};
pub use go_to_position::{GoToPosition, GoToPositionConfig};
