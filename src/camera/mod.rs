mod plugin;
mod rig;
mod smoothing;

pub use plugin::*;
pub use rig::*;
pub use smoothing::*;
