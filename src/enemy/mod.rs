pub mod laser;
pub mod path;
mod plugin;
mod state;

pub use laser::{Laser, advance_lasers, closest_point_on_segment};
pub use path::FlightPath;
pub use plugin::*;
pub use state::*;
