mod director;
mod level;
mod plugin;

pub use director::*;
pub use level::*;
pub use plugin::*;
