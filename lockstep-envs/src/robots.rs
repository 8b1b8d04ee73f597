//! Robot plugins.
mod jetbot;
pub use jetbot::{Jetbot, JetbotConfig};
