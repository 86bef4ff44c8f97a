//! Level progression: altar trigger, orb cinematic, ordered collection, door.

use bevy::prelude::*;

use crate::orb::ORB_COUNT;

/// Quest pacing
#[derive(Debug, Clone, Copy)]
pub struct QuestConfig {
    /// Cinematic seconds before the orbs launch and enemies wake
    pub launch_delay: f32,
    /// Cinematic seconds before the camera hands control back
    pub return_delay: f32,
    /// Player speed under which they count as standing still
    pub stationary_speed: f32,
    /// Distance past the door plane that finishes the level
    pub exit_offset: f32,
    /// Enemies closer than this show the jump hint
    pub hint_radius: f32,
    pub wait_message_duration: f32,
    pub frequency_hint_duration: f32,
}

impl Default for QuestConfig {
    fn default() -> Self {
        Self {
            launch_delay: 5.0,
            return_delay: 9.5,
            stationary_speed: 0.1,
            exit_offset: 2.0,
            hint_radius: 5.0,
            wait_message_duration: 5.0,
            frequency_hint_duration: 4.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuestState {
    AwaitingTrigger,
    Cinematic { started_at: f32, orbs_launched: bool },
    Collecting,
    DoorOpen,
    /// Nothing left to do on this level
    NextLevel,
}

impl QuestState {
    /// Position in the progression, used to check it only moves forward
    pub fn ordinal(self) -> u8 {
        match self {
            Self::AwaitingTrigger => 0,
            Self::Cinematic { .. } => 1,
            Self::Collecting => 2,
            Self::DoorOpen => 3,
            Self::NextLevel => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::AwaitingTrigger => "awaiting trigger",
            Self::Cinematic { .. } => "cinematic",
            Self::Collecting => "collecting",
            Self::DoorOpen => "door open",
            Self::NextLevel => "next level",
        }
    }
}

/// Banner text shown to the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestMessage {
    UnlockAudio,
    Wait,
    StandStill,
    ReturnToAltar,
    DoorOpen,
}

impl QuestMessage {
    pub fn text(self) -> &'static str {
        match self {
            Self::UnlockAudio => "Click to start audio",
            Self::Wait => "WAIT...",
            Self::StandStill => "STAND STILL ON THE ALTAR",
            Self::ReturnToAltar => "RETURN TO THE ALTAR",
            Self::DoorOpen => "DOOR OPEN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Banner {
    pub message: QuestMessage,
    /// Elapsed time at which the banner hides itself
    pub until: Option<f32>,
}

/// Work the director hands to the world
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestCommand {
    SpawnOrbs,
    StartCinematic,
    LaunchOrbs,
    StartEnemyIntros,
    ReturnCamera,
    StartMelodies,
    HideOrbs,
    OpenDoors,
    SwitchLevel(u32),
}

/// What the director needs to know about the world this tick
#[derive(Debug, Clone, Copy)]
pub struct QuestObservation {
    pub elapsed: f32,
    pub audio_unlocked: bool,
    pub on_altar: bool,
    pub player_position: Vec3,
    pub player_speed: f32,
    pub door: Vec3,
    pub collected: usize,
    pub enemy_nearby: bool,
    pub next_level: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct QuestDirector {
    pub config: QuestConfig,
    state: QuestState,
    current_phase: usize,
    banner: Option<Banner>,
    jump_hint: bool,
    frequency_hint_until: Option<f32>,
}

impl QuestDirector {
    pub fn new(config: QuestConfig, has_quest: bool) -> Self {
        let mut director = Self {
            config,
            state: QuestState::AwaitingTrigger,
            current_phase: 0,
            banner: None,
            jump_hint: false,
            frequency_hint_until: None,
        };
        director.on_level_loaded(has_quest);
        director
    }

    pub fn state(&self) -> QuestState {
        self.state
    }

    /// Id of the orb that must be collected next
    pub fn current_phase(&self) -> usize {
        self.current_phase
    }

    /// Phase an orb may be picked up for, only while collecting
    pub fn collectable_phase(&self) -> Option<usize> {
        (self.state == QuestState::Collecting).then_some(self.current_phase)
    }

    pub fn is_cinematic(&self) -> bool {
        matches!(self.state, QuestState::Cinematic { .. })
    }

    /// Seconds into the cinematic, zero outside of it
    pub fn cinematic_time(&self, elapsed: f32) -> f32 {
        match self.state {
            QuestState::Cinematic { started_at, .. } => elapsed - started_at,
            _ => 0.0,
        }
    }

    /// Orbs freeze once the door opens
    pub fn orbs_active(&self) -> bool {
        !matches!(self.state, QuestState::DoorOpen | QuestState::NextLevel)
    }

    pub fn banner(&self, elapsed: f32) -> Option<QuestMessage> {
        self.banner
            .filter(|banner| banner.until.is_none_or(|until| elapsed < until))
            .map(|banner| banner.message)
    }

    pub fn jump_hint(&self) -> bool {
        self.jump_hint
    }

    pub fn frequency_hint(&self, elapsed: f32) -> bool {
        self.frequency_hint_until.is_some_and(|until| elapsed < until)
    }

    pub fn update(&mut self, observation: &QuestObservation) -> Vec<QuestCommand> {
        let mut commands = Vec::new();
        let elapsed = observation.elapsed;

        match self.state {
            QuestState::AwaitingTrigger => {
                if !observation.audio_unlocked {
                    self.show(QuestMessage::UnlockAudio, None);
                } else if self.banner.is_some_and(|banner| banner.message == QuestMessage::UnlockAudio) {
                    self.banner = None;
                }

                if observation.on_altar {
                    self.state = QuestState::Cinematic {
                        started_at: elapsed,
                        orbs_launched: false,
                    };
                    self.show(
                        QuestMessage::Wait,
                        Some(elapsed + self.config.wait_message_duration),
                    );
                    commands.extend([QuestCommand::SpawnOrbs, QuestCommand::StartCinematic]);
                }
            }
            QuestState::Cinematic {
                started_at,
                orbs_launched,
            } => {
                let cinematic_time = elapsed - started_at;
                if cinematic_time > self.config.launch_delay && !orbs_launched {
                    self.state = QuestState::Cinematic {
                        started_at,
                        orbs_launched: true,
                    };
                    commands.extend([QuestCommand::LaunchOrbs, QuestCommand::StartEnemyIntros]);
                }
                if cinematic_time > self.config.return_delay {
                    self.state = QuestState::Collecting;
                    self.frequency_hint_until = Some(elapsed + self.config.frequency_hint_duration);
                    commands.extend([QuestCommand::ReturnCamera, QuestCommand::StartMelodies]);
                }
            }
            QuestState::Collecting => {
                if observation.collected >= ORB_COUNT {
                    if !observation.on_altar {
                        self.show(QuestMessage::ReturnToAltar, None);
                    } else if observation.player_speed.abs() >= self.config.stationary_speed {
                        self.show(QuestMessage::StandStill, None);
                    } else {
                        self.state = QuestState::DoorOpen;
                        self.show(QuestMessage::DoorOpen, None);
                        commands.extend([QuestCommand::HideOrbs, QuestCommand::OpenDoors]);
                    }
                } else if self.banner.is_some_and(|banner| banner.message != QuestMessage::UnlockAudio) {
                    self.banner = None;
                }
            }
            QuestState::DoorOpen => {
                if observation.player_position.z > observation.door.z + self.config.exit_offset {
                    self.state = QuestState::NextLevel;
                    self.banner = None;
                    if let Some(next) = observation.next_level {
                        commands.push(QuestCommand::SwitchLevel(next));
                    }
                }
            }
            QuestState::NextLevel => {}
        }

        self.jump_hint = observation.enemy_nearby && self.state == QuestState::Collecting;
        commands
    }

    /// An orb was collected. Only counts while collecting; returns the new
    /// phase.
    pub fn on_phase_advance(&mut self) -> Option<usize> {
        if self.state != QuestState::Collecting {
            return None;
        }
        self.current_phase = (self.current_phase + 1).min(ORB_COUNT);
        Some(self.current_phase)
    }

    /// The player took a laser. Returns `true` when the orbs must be
    /// scattered again.
    pub fn on_player_hit(&mut self) -> bool {
        if self.state != QuestState::Collecting {
            return false;
        }
        self.current_phase = 0;
        true
    }

    /// Fresh quest for a newly loaded level. Levels without orbs sit idle.
    pub fn on_level_loaded(&mut self, has_quest: bool) {
        self.state = if has_quest {
            QuestState::AwaitingTrigger
        } else {
            QuestState::NextLevel
        };
        self.current_phase = 0;
        self.banner = None;
        self.jump_hint = false;
        self.frequency_hint_until = None;
    }

    fn show(&mut self, message: QuestMessage, until: Option<f32>) {
        self.banner = Some(Banner { message, until });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(elapsed: f32) -> QuestObservation {
        QuestObservation {
            elapsed,
            audio_unlocked: true,
            on_altar: false,
            player_position: Vec3::ZERO,
            player_speed: 0.0,
            door: Vec3::new(0.0, 0.0, 25.0),
            collected: 0,
            enemy_nearby: false,
            next_level: Some(2),
        }
    }

    fn collecting_director() -> QuestDirector {
        let mut director = QuestDirector::new(QuestConfig::default(), true);
        director.update(&QuestObservation {
            on_altar: true,
            ..observation(1.0)
        });
        director.update(&observation(11.0));
        assert_eq!(director.state(), QuestState::Collecting);
        director
    }

    #[test]
    fn cinematic_timeline() {
        let mut director = QuestDirector::new(QuestConfig::default(), true);

        assert!(director.update(&observation(0.5)).is_empty());
        let commands = director.update(&QuestObservation {
            on_altar: true,
            ..observation(1.0)
        });
        assert_eq!(commands, [QuestCommand::SpawnOrbs, QuestCommand::StartCinematic]);
        assert!(director.is_cinematic());
        assert_eq!(director.banner(2.0), Some(QuestMessage::Wait));
        assert_eq!(director.banner(6.5), None);

        assert!(director.update(&observation(5.5)).is_empty());
        let commands = director.update(&observation(6.1));
        assert_eq!(commands, [QuestCommand::LaunchOrbs, QuestCommand::StartEnemyIntros]);
        assert!(director.update(&observation(7.0)).is_empty(), "launch fires once");

        let commands = director.update(&observation(10.6));
        assert_eq!(commands, [QuestCommand::ReturnCamera, QuestCommand::StartMelodies]);
        assert_eq!(director.state(), QuestState::Collecting);
        assert!(director.frequency_hint(11.0));
        assert!(!director.frequency_hint(15.0));
    }

    #[test]
    fn audio_prompt_until_unlocked() {
        let mut director = QuestDirector::new(QuestConfig::default(), true);
        director.update(&QuestObservation {
            audio_unlocked: false,
            ..observation(0.0)
        });
        assert_eq!(director.banner(0.0), Some(QuestMessage::UnlockAudio));

        director.update(&observation(0.1));
        assert_eq!(director.banner(0.1), None);
    }

    #[test]
    fn phase_only_advances_while_collecting() {
        let mut director = QuestDirector::new(QuestConfig::default(), true);
        assert_eq!(director.on_phase_advance(), None);
        assert_eq!(director.collectable_phase(), None);

        let mut director = collecting_director();
        assert_eq!(director.collectable_phase(), Some(0));
        assert_eq!(director.on_phase_advance(), Some(1));
        assert_eq!(director.on_phase_advance(), Some(2));

        assert!(director.on_player_hit());
        assert_eq!(director.current_phase(), 0);
        assert_eq!(director.state(), QuestState::Collecting);
    }

    #[test]
    fn door_needs_all_orbs_and_a_still_player_on_the_altar() {
        let mut director = collecting_director();
        let done = |elapsed| QuestObservation {
            collected: 3,
            ..observation(elapsed)
        };

        assert!(director.update(&done(12.0)).is_empty());
        assert_eq!(director.banner(12.0), Some(QuestMessage::ReturnToAltar));

        let moving = QuestObservation {
            on_altar: true,
            player_speed: 7.5,
            ..done(12.5)
        };
        assert!(director.update(&moving).is_empty());
        assert_eq!(director.banner(12.5), Some(QuestMessage::StandStill));

        let still = QuestObservation {
            on_altar: true,
            ..done(13.0)
        };
        assert_eq!(
            director.update(&still),
            [QuestCommand::HideOrbs, QuestCommand::OpenDoors]
        );
        assert_eq!(director.state(), QuestState::DoorOpen);
        assert!(!director.orbs_active());
    }

    #[test]
    fn progression_never_moves_backwards() {
        let mut director = collecting_director();
        director.update(&QuestObservation {
            collected: 3,
            on_altar: true,
            ..observation(12.0)
        });
        assert_eq!(director.state(), QuestState::DoorOpen);

        // Hits after the door opens change nothing
        assert!(!director.on_player_hit());
        let mut last = director.state().ordinal();
        for step in 0..20 {
            let z = step as f32 * 2.0;
            let commands = director.update(&QuestObservation {
                player_position: Vec3::new(0.0, 0.0, z),
                ..observation(13.0 + step as f32)
            });
            let ordinal = director.state().ordinal();
            assert!(ordinal >= last);
            last = ordinal;
            if z > 27.0 && !commands.is_empty() {
                assert_eq!(commands, [QuestCommand::SwitchLevel(2)]);
            }
        }
        assert_eq!(director.state(), QuestState::NextLevel);
    }

    #[test]
    fn jump_hint_only_while_collecting() {
        let mut director = QuestDirector::new(QuestConfig::default(), true);
        director.update(&QuestObservation {
            enemy_nearby: true,
            ..observation(0.0)
        });
        assert!(!director.jump_hint());

        let mut director = collecting_director();
        director.update(&QuestObservation {
            enemy_nearby: true,
            ..observation(12.0)
        });
        assert!(director.jump_hint());
    }

    #[test]
    fn levels_without_orbs_idle() {
        let mut director = QuestDirector::new(QuestConfig::default(), false);
        assert_eq!(director.state(), QuestState::NextLevel);
        assert!(director.update(&QuestObservation {
            on_altar: true,
            ..observation(1.0)
        })
        .is_empty());

        director.on_level_loaded(true);
        assert_eq!(director.state(), QuestState::AwaitingTrigger);
    }
}
