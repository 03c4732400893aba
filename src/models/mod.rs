//! Core data models for the stats service.

mod map;
mod matches;
mod season;
mod telemetry;
mod tier;

pub use map::*;
pub use matches::*;
pub use season::*;
pub use telemetry::*;
pub use tier::*;
