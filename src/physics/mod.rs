pub mod motion;
mod plugin;
pub mod probe;

pub use motion::*;
pub use plugin::*;
pub use probe::*;
