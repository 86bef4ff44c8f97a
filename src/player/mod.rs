mod animation;
mod audio;
pub mod input;
mod movement;
mod plugin;
mod state;

pub use animation::{PlayerAnimationLink, PlayerModel};
pub use audio::FootstepLoop;
pub use input::{DragHeld, EditorToggled, JumpPressed, LookInput, MoveInput};
pub use movement::*;
pub use plugin::{PlayerBody, PlayerPlugin, PlayerVisual, spawn_player};
pub use state::*;
