//! The game state owner. One [`GameWorld::tick`] per frame advances every
//! component in a fixed order.

use bevy::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::camera::{CameraConfig, CameraRig, CinematicShot, FollowTarget};
use crate::enemy::{Enemy, EnemyConfig, StompOutcome};
use crate::orb::{ORB_COUNT, Orb, OrbConfig, OrbContext, OrbState, proximity_volume};
use crate::physics::{SpatialProbe, SurfaceKind};
use crate::player::{PlayerConfig, PlayerController, PlayerInput, RideTarget};
use crate::quest::{LevelLayout, QuestCommand, QuestConfig, QuestDirector, QuestObservation, QuestState};

/// Ray length below the player used for the altar check
const ALTAR_PROBE_RANGE: f32 = 2.0;
/// Laser ids of each enemy start this far apart
const LASER_ID_STRIDE: u64 = 1 << 32;

/// Feel parameters for every component
#[derive(Debug, Clone, Copy)]
pub struct WorldConfig {
    pub player: PlayerConfig,
    pub enemy: EnemyConfig,
    pub camera: CameraConfig,
    pub orb: OrbConfig,
    pub quest: QuestConfig,
    /// Longest step a single tick may take
    pub max_dt: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            player: PlayerConfig::default(),
            enemy: EnemyConfig::default(),
            camera: CameraConfig::default(),
            orb: OrbConfig::default(),
            quest: QuestConfig::default(),
            max_dt: 0.1,
        }
    }
}

/// Input for one tick
#[derive(Debug, Clone, Copy, Default)]
pub struct WorldInput {
    pub player: PlayerInput,
    /// Pointer drag in pixels since the last tick
    pub drag: Vec2,
    pub dragging: bool,
}

/// Something the presentation layer should react to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorldEvent {
    QuestAdvanced { from: QuestState, to: QuestState },
    OrbsAppeared,
    MelodiesStarted,
    DoorsOpened,
    PhaseAdvanced { phase: usize },
    PlayerHit,
    OrbsScattered,
    PlayerJumped,
    PlayerLanded,
    LaserFired { enemy: usize },
    EnemyStomped { enemy: usize, hp: i32 },
    EnemyDefeated { enemy: usize },
    LevelSwitchRequested(u32),
}

#[derive(Resource, Debug, Clone)]
pub struct GameWorld {
    pub config: WorldConfig,
    pub layout: LevelLayout,
    pub player: PlayerController,
    pub enemies: Vec<Enemy>,
    pub camera: CameraRig,
    pub orbs: Vec<Orb>,
    pub quest: QuestDirector,
    /// Seconds since the world was created
    pub elapsed: f32,
    pub audio_unlocked: bool,
    pub melodies_started: bool,
    editor_override: bool,
    rng: StdRng,
}

impl GameWorld {
    pub fn new(layout: LevelLayout, config: WorldConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let orbs = (0..ORB_COUNT).map(|id| Orb::new(id, &mut rng)).collect();
        let start = layout.start();

        let mut world = Self {
            config,
            player: PlayerController::new(start, config.player),
            enemies: Vec::new(),
            camera: CameraRig::new(start, start, config.camera),
            orbs,
            quest: QuestDirector::new(config.quest, layout.has_orbs),
            elapsed: 0.0,
            audio_unlocked: false,
            melodies_started: false,
            editor_override: false,
            rng,
            layout,
        };
        world.reset_level();
        world
    }

    /// Replaces the current level. This is the load-complete callback of a
    /// level switch.
    pub fn load_level(&mut self, layout: LevelLayout) {
        self.layout = layout;
        self.reset_level();
    }

    fn reset_level(&mut self) {
        let layout = &self.layout;

        self.player.respawn(layout.start());
        self.player.yaw = layout.start_yaw;
        self.player.visual_yaw = 0.0;

        self.enemies = layout
            .enemies
            .iter()
            .enumerate()
            .map(|(index, enemy)| {
                Enemy::new(
                    enemy.anchor(),
                    enemy.rotation(),
                    enemy.flight_path(),
                    enemy.intro_duration,
                    self.config.enemy,
                )
                .with_laser_ids_from(index as u64 * LASER_ID_STRIDE)
            })
            .collect();

        for orb in &mut self.orbs {
            orb.hide();
            orb.collected = false;
        }
        self.melodies_started = false;
        self.editor_override = false;

        self.quest.on_level_loaded(layout.has_orbs);
        // Without a quest to wake them, enemies take off right away
        if !layout.has_orbs {
            for enemy in &mut self.enemies {
                enemy.start_intro();
            }
        }

        let target = self.follow_target();
        self.camera.snap_behind(&target);
    }

    pub fn collected_orbs(&self) -> usize {
        self.orbs.iter().filter(|orb| orb.collected).count()
    }

    /// Melody volume for orb `id`, silent until the melodies start
    pub fn orb_volume(&self, id: usize) -> f32 {
        let Some(orb) = self.orbs.get(id) else {
            return 0.0;
        };
        if !self.melodies_started || !orb.is_visible() {
            return 0.0;
        }
        proximity_volume(
            orb.position.distance(self.player.position()),
            self.config.orb.audio_radius,
        )
    }

    pub fn is_editor_override(&self) -> bool {
        self.editor_override
    }

    /// Parks the visible orbs for the level editor, or releases them.
    pub fn toggle_editor_override(&mut self) -> bool {
        self.editor_override = !self.editor_override;
        let bounds = self.layout.wander_bounds();

        for orb in self.orbs.iter_mut().filter(|orb| orb.is_visible()) {
            if self.editor_override {
                orb.begin_editor_override(orb.position);
            } else {
                orb.end_editor_override(&bounds, &self.config.orb, &mut self.rng);
            }
        }
        self.editor_override
    }

    /// Moves a parked orb. Ignored unless the editor override is active.
    pub fn place_orb(&mut self, id: usize, position: Vec3) {
        if !self.editor_override {
            return;
        }
        if let Some(orb) = self.orbs.get_mut(id) {
            orb.begin_editor_override(position);
        }
    }

    /// Moves a parked orb by `delta`. Returns its new position, or `None`
    /// when the editor override is off or the orb is not parked.
    pub fn nudge_orb(&mut self, id: usize, delta: Vec3) -> Option<Vec3> {
        let orb = self.orbs.get(id)?;
        if !self.editor_override || orb.state != OrbState::EditorOverride {
            return None;
        }
        let position = orb.position + delta;
        self.place_orb(id, position);
        Some(position)
    }

    /// The parked orb after `current`, wrapping around
    pub fn next_parked_orb(&self, current: Option<usize>) -> Option<usize> {
        let start = current.map_or(0, |id| id + 1);
        (0..self.orbs.len())
            .map(|offset| (start + offset) % self.orbs.len())
            .find(|&id| self.orbs[id].state == OrbState::EditorOverride)
    }

    /// Whether the player stands on the altar
    pub fn player_on_altar(&self, probe: &dyn SpatialProbe) -> bool {
        probe
            .cast_ray(self.player.position() + Vec3::Y, Dir3::NEG_Y, ALTAR_PROBE_RANGE)
            .is_some_and(|hit| hit.surface == SurfaceKind::Altar)
    }

    /// Advances everything by `dt`: quest, orbs, enemies, player, camera.
    pub fn tick(&mut self, dt: f32, input: &WorldInput, probe: &dyn SpatialProbe) -> Vec<WorldEvent> {
        let dt = dt.clamp(0.0, self.config.max_dt);
        self.elapsed += dt;
        let mut events = Vec::new();

        self.update_quest(probe, &mut events);
        self.update_orbs(dt, &mut events);
        self.update_enemies(dt, &mut events);
        self.update_player(dt, &input.player, probe, &mut events);

        self.camera.dragging = input.dragging;
        if input.dragging {
            self.camera.drag(input.drag);
        }
        let target = self.follow_target();
        self.camera.update(dt, self.elapsed, &target, probe);

        events
    }

    fn follow_target(&self) -> FollowTarget {
        FollowTarget {
            position: self.player.position(),
            yaw: self.player.yaw,
            moving: self.player.moving,
        }
    }

    fn update_quest(&mut self, probe: &dyn SpatialProbe, events: &mut Vec<WorldEvent>) {
        let player = self.player.position();
        let hint_radius = self.quest.config.hint_radius;
        let observation = QuestObservation {
            elapsed: self.elapsed,
            audio_unlocked: self.audio_unlocked,
            on_altar: self.player_on_altar(probe),
            player_position: player,
            player_speed: self.player.speed,
            door: self.layout.door(),
            collected: self.collected_orbs(),
            enemy_nearby: self
                .enemies
                .iter()
                .any(|enemy| enemy.is_alive() && enemy.position.distance(player) < hint_radius),
            next_level: self.layout.next_level,
        };

        let from = self.quest.state();
        let commands = self.quest.update(&observation);
        let to = self.quest.state();
        if from.ordinal() != to.ordinal() {
            events.push(WorldEvent::QuestAdvanced { from, to });
        }

        for command in commands {
            self.apply(command, events);
        }
    }

    fn apply(&mut self, command: QuestCommand, events: &mut Vec<WorldEvent>) {
        let player = self.player.position();
        let door = self.layout.door();

        match command {
            QuestCommand::SpawnOrbs => {
                for orb in &mut self.orbs {
                    orb.spawn_stacked(door, player, &self.config.orb);
                }
                events.push(WorldEvent::OrbsAppeared);
            }
            QuestCommand::StartCinematic => {
                self.camera
                    .start_cinematic(self.elapsed, CinematicShot::door_reveal(player, door));
            }
            QuestCommand::LaunchOrbs => {
                for orb in &mut self.orbs {
                    orb.launch(self.camera.position, self.elapsed, &self.config.orb);
                }
            }
            QuestCommand::StartEnemyIntros => {
                for enemy in &mut self.enemies {
                    enemy.start_intro();
                }
            }
            QuestCommand::ReturnCamera => self.camera.start_return(self.elapsed, player),
            QuestCommand::StartMelodies => {
                self.melodies_started = true;
                events.push(WorldEvent::MelodiesStarted);
            }
            QuestCommand::HideOrbs => {
                for orb in &mut self.orbs {
                    orb.hide();
                }
            }
            QuestCommand::OpenDoors => events.push(WorldEvent::DoorsOpened),
            QuestCommand::SwitchLevel(next) => events.push(WorldEvent::LevelSwitchRequested(next)),
        }
    }

    fn update_orbs(&mut self, dt: f32, events: &mut Vec<WorldEvent>) {
        if !self.quest.orbs_active() {
            return;
        }
        let context = OrbContext {
            elapsed: self.elapsed,
            cinematic_time: self.quest.cinematic_time(self.elapsed),
            player: self.player.position(),
            player_forward: self.player.forward(),
            camera: self.camera.position,
            // Nothing is collectable outside the collecting phase
            current_phase: self.quest.collectable_phase().unwrap_or(usize::MAX),
            bounds: self.layout.wander_bounds(),
        };

        for orb in &mut self.orbs {
            if orb.update(dt, &context, &self.config.orb, &mut self.rng)
                && let Some(phase) = self.quest.on_phase_advance()
            {
                events.push(WorldEvent::PhaseAdvanced { phase });
            }
        }
    }

    fn update_enemies(&mut self, dt: f32, events: &mut Vec<WorldEvent>) {
        let target = Some(self.player.position());
        let mut hits = 0;

        for (index, enemy) in self.enemies.iter_mut().enumerate() {
            let tick = enemy.update(dt, target);
            if tick.fired {
                events.push(WorldEvent::LaserFired { enemy: index });
            }
            hits += tick.player_hits;
        }

        for _ in 0..hits {
            self.player.take_hit();
            events.push(WorldEvent::PlayerHit);
            if self.quest.on_player_hit() {
                self.scatter_orbs();
                events.push(WorldEvent::OrbsScattered);
            }
        }
    }

    /// Hit penalty: every orb flies off again. Orbs parked by the editor
    /// only lose their collected flag and resume flying once released.
    fn scatter_orbs(&mut self) {
        let bounds = self.layout.wander_bounds();
        for orb in &mut self.orbs {
            if orb.state == OrbState::EditorOverride {
                orb.collected = false;
            } else {
                orb.reset_to_flying(&bounds, &self.config.orb, &mut self.rng);
            }
        }
    }

    fn update_player(
        &mut self,
        dt: f32,
        input: &PlayerInput,
        probe: &dyn SpatialProbe,
        events: &mut Vec<WorldEvent>,
    ) {
        let rides: Vec<RideTarget> = self
            .enemies
            .iter()
            .enumerate()
            .map(|(index, enemy)| enemy.ride_target(index))
            .collect();

        let tick = self
            .player
            .update(dt, input, probe, &rides, self.quest.is_cinematic());

        if tick.jumped {
            events.push(WorldEvent::PlayerJumped);
        }
        if tick.landed {
            events.push(WorldEvent::PlayerLanded);
        }
        let Some(index) = tick.stomped else {
            return;
        };
        let Some(enemy) = self.enemies.get_mut(index) else {
            return;
        };
        match enemy.take_damage() {
            StompOutcome::Damaged { hp } => events.push(WorldEvent::EnemyStomped { enemy: index, hp }),
            StompOutcome::Killed => events.push(WorldEvent::EnemyDefeated { enemy: index }),
            StompOutcome::Ignored => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::LevelCatalog;

    const DT: f32 = 1.0 / 60.0;

    fn meadow() -> LevelLayout {
        LevelCatalog::builtin().unwrap().get(1).unwrap().clone()
    }

    #[test]
    fn new_world_starts_at_the_level_start() {
        let world = GameWorld::new(meadow(), WorldConfig::default(), 1);

        assert_eq!(world.player.position(), Vec3::new(-6.0, 4.0, 0.0));
        assert_eq!(world.enemies.len(), 2);
        assert_eq!(world.quest.state(), QuestState::AwaitingTrigger);
        assert!(world.orbs.iter().all(|orb| !orb.is_visible()));
        assert_eq!(world.orb_volume(0), 0.0);
    }

    #[test]
    fn oversized_steps_are_clamped() {
        let layout = meadow();
        let probe = layout.box_probe();
        let mut world = GameWorld::new(layout, WorldConfig::default(), 1);

        world.tick(5.0, &WorldInput::default(), &probe);
        assert!((world.elapsed - 0.1).abs() < 1e-6);
        world.tick(-1.0, &WorldInput::default(), &probe);
        assert!((world.elapsed - 0.1).abs() < 1e-6);
    }

    #[test]
    fn editor_override_parks_visible_orbs() {
        let layout = meadow();
        let probe = layout.box_probe();
        let mut world = GameWorld::new(layout, WorldConfig::default(), 1);
        world.player.body.reset_to(Vec3::ZERO);

        world.tick(DT, &WorldInput::default(), &probe);
        assert!(world.orbs.iter().all(Orb::is_visible));

        assert_eq!(world.nudge_orb(1, Vec3::X), None);
        assert!(world.toggle_editor_override());
        world.place_orb(1, Vec3::new(5.0, 2.0, 5.0));
        assert_eq!(world.nudge_orb(1, Vec3::new(0.5, 0.0, -1.0)), Some(Vec3::new(5.5, 2.0, 4.0)));
        for _ in 0..10 {
            world.tick(DT, &WorldInput::default(), &probe);
        }
        assert_eq!(world.orbs[1].position, Vec3::new(5.5, 2.0, 4.0));

        assert_eq!(world.next_parked_orb(None), Some(0));
        assert_eq!(world.next_parked_orb(Some(2)), Some(0));
        assert_eq!(world.next_parked_orb(Some(0)), Some(1));

        assert!(!world.toggle_editor_override());
        assert!(matches!(world.orbs[1].state, crate::orb::OrbState::Flying { .. }));
    }

    #[test]
    fn hits_leave_parked_orbs_in_place() {
        let layout = meadow();
        let mut world = GameWorld::new(layout, WorldConfig::default(), 1);
        let bounds = world.layout.wander_bounds();
        for orb in &mut world.orbs {
            orb.reset_to_flying(&bounds, &OrbConfig::default(), &mut StdRng::seed_from_u64(3));
            orb.collected = true;
        }
        assert!(world.toggle_editor_override());
        world.place_orb(0, Vec3::new(1.0, 2.0, 3.0));

        world.scatter_orbs();

        assert!(world.is_editor_override());
        assert_eq!(world.orbs[0].state, OrbState::EditorOverride);
        assert_eq!(world.orbs[0].position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(world.collected_orbs(), 0);

        // Released after the hit, the parked orb flies instead of following
        assert!(!world.toggle_editor_override());
        assert!(matches!(world.orbs[0].state, OrbState::Flying { .. }));
    }

    #[test]
    fn level_without_orbs_wakes_its_enemies() {
        let catalog = LevelCatalog::builtin().unwrap();
        let mut world = GameWorld::new(catalog.get(1).unwrap().clone(), WorldConfig::default(), 1);
        assert!(world.enemies.iter().all(|enemy| enemy.state == crate::enemy::EnemyState::Waiting));

        world.load_level(catalog.get(2).unwrap().clone());
        assert_eq!(world.quest.state(), QuestState::NextLevel);
        assert_eq!(world.player.position(), Vec3::new(0.0, 1.0, 0.0));
        assert!(world.enemies.iter().all(|enemy| enemy.state.is_active()));
    }
}
