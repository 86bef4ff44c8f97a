mod audio;
mod lifecycle;
mod particles;
mod plugin;
pub mod visual;

pub use audio::{OrbMelody, proximity_volume};
pub use lifecycle::*;
pub use particles::{LayerEmitter, OrbParticle};
pub use plugin::*;
pub use visual::OrbVisualConfig;
