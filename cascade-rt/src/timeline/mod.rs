//! Simulation timeline: tick arithmetic and the global time controller.

mod controller;
mod info;

pub use controller::TimelineController;
pub use info::{Moment, TimelineInfo, Timestamp};
