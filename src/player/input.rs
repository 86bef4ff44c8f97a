use bevy::ecs::observer::On;
use bevy::prelude::{Component, Deref, DerefMut, EntityEvent, Query, Vec2};
use bevy_enhanced_input::prelude::*;

/// Turn and advance (WASD), x turns right, y moves forward
#[derive(Debug, InputAction)]
#[action_output(Vec2)]
pub struct MoveAction;

/// Pointer motion, only used while dragging
#[derive(Debug, InputAction)]
#[action_output(Vec2)]
pub struct LookAction;

#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct JumpAction;

/// Orbit the camera (hold)
#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct DragAction;

/// Toggle the orb editor override
#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct EditorAction;

/// Select the next parked orb
#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct EditorSelectAction;

/// Move the selected orb across the ground plane (IJKL)
#[derive(Debug, InputAction)]
#[action_output(Vec2)]
pub struct EditorNudgeAction;

/// Raise or lower the selected orb (O/U)
#[derive(Debug, InputAction)]
#[action_output(f32)]
pub struct EditorLiftAction;

/// Stores the current movement input vector
#[derive(Component, Default, Deref, DerefMut)]
pub struct MoveInput(pub Vec2);

/// Pointer delta accumulated this frame
#[derive(Component, Default, Deref, DerefMut)]
pub struct LookInput(pub Vec2);

/// Stores whether jump was pressed this frame
#[derive(Component, Default)]
pub struct JumpPressed(pub bool);

/// Stores whether the drag button is held
#[derive(Component, Default, Deref, DerefMut)]
pub struct DragHeld(pub bool);

/// Set for one frame when the editor toggle is pressed
#[derive(Component, Default)]
pub struct EditorToggled(pub bool);

/// Set for one frame when the next orb is selected
#[derive(Component, Default)]
pub struct EditorSelect(pub bool);

#[derive(Component, Default, Deref, DerefMut)]
pub struct EditorNudge(pub Vec2);

#[derive(Component, Default, Deref, DerefMut)]
pub struct EditorLift(pub f32);

pub fn handle_move_input(trigger: On<Fire<MoveAction>>, mut query: Query<&mut MoveInput>) {
    if let Ok(mut move_input) = query.get_mut(trigger.event_target()) {
        move_input.0 = trigger.value;
    }
}

/// Clear move input when all movement keys are released
pub fn handle_move_end(trigger: On<Complete<MoveAction>>, mut query: Query<&mut MoveInput>) {
    if let Ok(mut move_input) = query.get_mut(trigger.event_target()) {
        move_input.0 = Vec2::ZERO;
    }
}

pub fn handle_look_input(trigger: On<Fire<LookAction>>, mut query: Query<&mut LookInput>) {
    if let Ok(mut look_input) = query.get_mut(trigger.event_target()) {
        look_input.0 += trigger.value;
    }
}

pub fn handle_jump_start(trigger: On<Start<JumpAction>>, mut query: Query<&mut JumpPressed>) {
    if let Ok(mut jump) = query.get_mut(trigger.event_target()) {
        jump.0 = true;
    }
}

pub fn handle_drag_start(trigger: On<Start<DragAction>>, mut query: Query<&mut DragHeld>) {
    if let Ok(mut drag) = query.get_mut(trigger.event_target()) {
        drag.0 = true;
    }
}

pub fn handle_drag_end(trigger: On<Complete<DragAction>>, mut query: Query<&mut DragHeld>) {
    if let Ok(mut drag) = query.get_mut(trigger.event_target()) {
        drag.0 = false;
    }
}

pub fn handle_editor_toggle(trigger: On<Start<EditorAction>>, mut query: Query<&mut EditorToggled>) {
    if let Ok(mut toggled) = query.get_mut(trigger.event_target()) {
        toggled.0 = true;
    }
}

pub fn handle_editor_select(trigger: On<Start<EditorSelectAction>>, mut query: Query<&mut EditorSelect>) {
    if let Ok(mut select) = query.get_mut(trigger.event_target()) {
        select.0 = true;
    }
}

pub fn handle_editor_nudge(trigger: On<Fire<EditorNudgeAction>>, mut query: Query<&mut EditorNudge>) {
    if let Ok(mut nudge) = query.get_mut(trigger.event_target()) {
        nudge.0 = trigger.value;
    }
}

pub fn handle_editor_nudge_end(trigger: On<Complete<EditorNudgeAction>>, mut query: Query<&mut EditorNudge>) {
    if let Ok(mut nudge) = query.get_mut(trigger.event_target()) {
        nudge.0 = Vec2::ZERO;
    }
}

pub fn handle_editor_lift(trigger: On<Fire<EditorLiftAction>>, mut query: Query<&mut EditorLift>) {
    if let Ok(mut lift) = query.get_mut(trigger.event_target()) {
        lift.0 = trigger.value;
    }
}

pub fn handle_editor_lift_end(trigger: On<Complete<EditorLiftAction>>, mut query: Query<&mut EditorLift>) {
    if let Ok(mut lift) = query.get_mut(trigger.event_target()) {
        lift.0 = 0.0;
    }
}

/// Clears the one-frame inputs (runs at the end of the frame)
pub fn clear_frame_input(
    mut query: Query<(&mut JumpPressed, &mut LookInput, &mut EditorToggled, &mut EditorSelect)>,
) {
    for (mut jump, mut look, mut editor, mut select) in &mut query {
        jump.0 = false;
        look.0 = Vec2::ZERO;
        editor.0 = false;
        select.0 = false;
    }
}
