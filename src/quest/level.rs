use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::enemy::FlightPath;
use crate::orb::WanderBounds;
use crate::physics::{BoxProbe, ProbeBox, SurfaceKind};

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("invalid level layout: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read level {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no level with id {0}")]
    UnknownLevel(u32),
}

/// Axis-aligned box given by centre and half extents
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxLayout {
    pub center: [f32; 3],
    pub half_extents: [f32; 3],
}

impl BoxLayout {
    pub fn center(&self) -> Vec3 {
        Vec3::from_array(self.center)
    }

    pub fn half_extents(&self) -> Vec3 {
        Vec3::from_array(self.half_extents).abs()
    }

    pub fn min(&self) -> Vec3 {
        self.center() - self.half_extents()
    }

    pub fn max(&self) -> Vec3 {
        self.center() + self.half_extents()
    }
}

/// Solid level geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockLayout {
    #[serde(flatten)]
    pub shape: BoxLayout,
    /// Surface name, e.g. "grass" or "stone"
    #[serde(default)]
    pub surface: String,
}

impl BlockLayout {
    pub fn surface(&self) -> SurfaceKind {
        SurfaceKind::from_name(&self.surface)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyLayout {
    pub anchor: [f32; 3],
    /// Facing around +Y, radians
    #[serde(default)]
    pub yaw: f32,
    /// Raw flight samples, simplified on load
    #[serde(default)]
    pub path: Vec<[f32; 3]>,
    #[serde(default)]
    pub intro_duration: Option<f32>,
}

impl EnemyLayout {
    pub fn anchor(&self) -> Vec3 {
        Vec3::from_array(self.anchor)
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw)
    }

    pub fn flight_path(&self) -> Option<FlightPath> {
        let samples: Vec<Vec3> = self.path.iter().copied().map(Vec3::from_array).collect();
        FlightPath::from_samples(&samples)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelLayout {
    pub id: u32,
    pub name: String,
    pub start: [f32; 3],
    /// Initial facing around +Y, radians
    #[serde(default)]
    pub start_yaw: f32,
    pub door_center: [f32; 3],
    pub altar: BoxLayout,
    /// Region the orbs wander in
    pub bounds: BoxLayout,
    #[serde(default)]
    pub blocks: Vec<BlockLayout>,
    #[serde(default)]
    pub enemies: Vec<EnemyLayout>,
    #[serde(default)]
    pub has_orbs: bool,
    #[serde(default)]
    pub next_level: Option<u32>,
}

impl LevelLayout {
    pub fn from_json(text: &str) -> Result<Self, LevelError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn start(&self) -> Vec3 {
        Vec3::from_array(self.start)
    }

    pub fn door(&self) -> Vec3 {
        Vec3::from_array(self.door_center)
    }

    pub fn wander_bounds(&self) -> WanderBounds {
        WanderBounds {
            min: self.bounds.min(),
            max: self.bounds.max(),
        }
    }

    /// Solid boxes including the altar, for headless worlds
    pub fn probe_boxes(&self) -> impl Iterator<Item = ProbeBox> + '_ {
        let altar = ProbeBox::from_center(
            self.altar.center(),
            self.altar.half_extents(),
            SurfaceKind::Altar,
        );
        self.blocks
            .iter()
            .map(|block| {
                ProbeBox::from_center(
                    block.shape.center(),
                    block.shape.half_extents(),
                    block.surface(),
                )
            })
            .chain(std::iter::once(altar))
    }

    pub fn box_probe(&self) -> BoxProbe {
        BoxProbe::new(self.probe_boxes())
    }
}

/// Levels shipped with the game
#[derive(Resource, Debug, Clone)]
pub struct LevelCatalog {
    levels: Vec<LevelLayout>,
}

impl LevelCatalog {
    pub fn new(levels: Vec<LevelLayout>) -> Self {
        Self { levels }
    }

    pub fn builtin() -> Result<Self, LevelError> {
        let levels = [
            include_str!("../../assets/levels/meadow.json"),
            include_str!("../../assets/levels/courtyard.json"),
        ]
        .into_iter()
        .map(LevelLayout::from_json)
        .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(levels))
    }

    pub fn get(&self, id: u32) -> Result<&LevelLayout, LevelError> {
        self.levels
            .iter()
            .find(|level| level.id == id)
            .ok_or(LevelError::UnknownLevel(id))
    }

    pub fn first(&self) -> Option<&LevelLayout> {
        self.levels.first()
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.levels.iter().map(|level| level.id)
    }
}
