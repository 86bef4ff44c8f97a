//! Orb look: particle layer schema shared with the level authoring tools.

use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisualConfigError {
    #[error("invalid orb visual config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read orb visual config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Procedural sprite shapes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GeneratorKind {
    #[default]
    Glow,
    HardCircle,
    Smoke,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlendMode {
    #[default]
    Add,
    Normal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    Image,
    #[default]
    Generator,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LifeRange {
    pub min: f32,
    pub max: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedRange {
    pub value: f32,
    pub random: f32,
}

/// Start and end value over a particle's life
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ramp {
    pub start: f32,
    pub end: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Gravity2 {
    pub x: f32,
    pub y: f32,
}

/// One emitter layer. Any field missing from the JSON takes its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParticleLayer {
    pub id: Option<f64>,
    pub enabled: bool,
    pub gen_type: GeneratorKind,
    pub gen_color: String,
    pub blend_mode: BlendMode,
    pub source_type: SourceKind,
    pub image_src: Option<String>,
    /// Particles per second
    pub emission_rate: f32,
    pub life: LifeRange,
    pub speed: SpeedRange,
    pub scale: Ramp,
    pub alpha: Ramp,
    pub gravity: Gravity2,
    pub global_opacity: f32,
    pub spawn_radius: f32,
}

impl Default for ParticleLayer {
    fn default() -> Self {
        Self {
            id: None,
            enabled: true,
            gen_type: GeneratorKind::Glow,
            gen_color: "#ffffff".into(),
            blend_mode: BlendMode::Add,
            source_type: SourceKind::Generator,
            image_src: None,
            emission_rate: 20.0,
            life: LifeRange { min: 0.5, max: 1.0 },
            speed: SpeedRange {
                value: 1.0,
                random: 0.5,
            },
            scale: Ramp {
                start: 0.5,
                end: 0.0,
            },
            alpha: Ramp {
                start: 1.0,
                end: 0.0,
            },
            gravity: Gravity2::default(),
            global_opacity: 1.0,
            spawn_radius: 0.3,
        }
    }
}

/// Sprite source a layer ends up drawing with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticleSource {
    Image(String),
    Generator(GeneratorKind),
}

impl ParticleLayer {
    /// An image layer whose texture failed to load falls back to its
    /// generator.
    pub fn resolve_source(&self, image_loaded: bool) -> ParticleSource {
        match (&self.source_type, &self.image_src) {
            (SourceKind::Image, Some(src)) if image_loaded => ParticleSource::Image(src.clone()),
            _ => ParticleSource::Generator(self.gen_type),
        }
    }

    pub fn color(&self) -> Color {
        parse_color(&self.gen_color).unwrap_or(Color::WHITE)
    }

    fn clamp(&mut self) {
        self.emission_rate = self.emission_rate.clamp(0.0, 1000.0);
        self.life.min = self.life.min.max(0.0);
        self.life.max = self.life.max.max(self.life.min);
        self.speed.value = self.speed.value.max(0.0);
        self.speed.random = self.speed.random.max(0.0);
        self.scale.start = self.scale.start.max(0.0);
        self.scale.end = self.scale.end.max(0.0);
        self.alpha.start = self.alpha.start.clamp(0.0, 1.0);
        self.alpha.end = self.alpha.end.clamp(0.0, 1.0);
        self.global_opacity = self.global_opacity.clamp(0.0, 1.0);
        self.spawn_radius = self.spawn_radius.max(0.0);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbLook {
    pub radius: f32,
    pub color: Option<String>,
    /// "Normal" or "Additive"
    pub blend: String,
}

impl Default for OrbLook {
    fn default() -> Self {
        Self {
            radius: 0.2,
            color: None,
            blend: "Normal".into(),
        }
    }
}

impl OrbLook {
    pub fn is_additive(&self) -> bool {
        self.blend.eq_ignore_ascii_case("additive")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbLight {
    pub color: Option<String>,
    pub intensity: f32,
}

impl Default for OrbLight {
    fn default() -> Self {
        Self {
            color: None,
            intensity: 20.0,
        }
    }
}

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbVisualConfig {
    pub layers: Vec<ParticleLayer>,
    pub orb: OrbLook,
    pub light: OrbLight,
}

impl Default for OrbVisualConfig {
    fn default() -> Self {
        Self {
            layers: vec![
                ParticleLayer {
                    id: Some(1.0),
                    gen_type: GeneratorKind::Glow,
                    gen_color: "#ffffff".into(),
                    source_type: SourceKind::Image,
                    image_src: Some("textures/particle.png".into()),
                    emission_rate: 230.0,
                    life: LifeRange { min: 0.7, max: 4.1 },
                    speed: SpeedRange {
                        value: 0.5,
                        random: 0.0,
                    },
                    scale: Ramp {
                        start: 0.2,
                        end: 0.0,
                    },
                    alpha: Ramp {
                        start: 1.0,
                        end: 0.35,
                    },
                    spawn_radius: 0.2,
                    ..default()
                },
                ParticleLayer {
                    id: Some(2.0),
                    gen_type: GeneratorKind::Glow,
                    gen_color: "#00ccdd".into(),
                    emission_rate: 167.0,
                    life: LifeRange { min: 0.2, max: 1.0 },
                    speed: SpeedRange {
                        value: 0.9,
                        random: 0.3,
                    },
                    scale: Ramp {
                        start: 1.0,
                        end: 0.0,
                    },
                    alpha: Ramp {
                        start: 1.0,
                        end: 0.1,
                    },
                    spawn_radius: 0.0,
                    ..default()
                },
            ],
            orb: OrbLook::default(),
            light: OrbLight::default(),
        }
    }
}

impl OrbVisualConfig {
    /// Parses a config. A bare layer object (no `layers` key) is accepted as
    /// a single-layer config. Out-of-range values are clamped.
    pub fn from_json(text: &str) -> Result<Self, VisualConfigError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let mut config = if value.get("layers").is_some() {
            serde_json::from_value::<Self>(value)?
        } else {
            Self {
                layers: vec![serde_json::from_value(value)?],
                ..default()
            }
        };
        config.clamp();
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, VisualConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| VisualConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// The first enabled layer, which tints the orb halo
    pub fn primary_layer(&self) -> Option<&ParticleLayer> {
        self.layers.iter().find(|layer| layer.enabled)
    }

    fn clamp(&mut self) {
        for layer in &mut self.layers {
            layer.clamp();
        }
        self.orb.radius = self.orb.radius.clamp(0.01, 10.0);
        self.light.intensity = self.light.intensity.max(0.0);
    }
}

/// Parses `#rrggbb` / `rrggbb` colours
pub fn parse_color(text: &str) -> Option<Color> {
    Srgba::hex(text.trim()).ok().map(Color::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = OrbVisualConfig::from_json(
            r##"{ "layers": [ { "genColor": "#ff0000", "emissionRate": 50 } ], "light": { "intensity": 5 } }"##,
        )
        .unwrap();

        assert_eq!(config.layers.len(), 1);
        let layer = &config.layers[0];
        assert_eq!(layer.emission_rate, 50.0);
        assert_eq!(layer.life, LifeRange { min: 0.5, max: 1.0 });
        assert_eq!(layer.blend_mode, BlendMode::Add);
        assert_eq!(config.orb.radius, 0.2);
        assert_eq!(config.light.intensity, 5.0);
    }

    #[test]
    fn bare_layer_is_a_single_layer_config() {
        let config = OrbVisualConfig::from_json(r#"{ "genType": "smoke", "spawnRadius": 1.5 }"#).unwrap();

        assert_eq!(config.layers.len(), 1);
        assert_eq!(config.layers[0].gen_type, GeneratorKind::Smoke);
        assert_eq!(config.layers[0].spawn_radius, 1.5);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = OrbVisualConfig::from_json(
            r#"{ "layers": [ { "life": { "min": 2, "max": 1 }, "alpha": { "start": 4, "end": -1 }, "emissionRate": -3 } ], "orb": { "radius": 0 } }"#,
        )
        .unwrap();

        let layer = &config.layers[0];
        assert_eq!(layer.life, LifeRange { min: 2.0, max: 2.0 });
        assert_eq!(layer.alpha, Ramp { start: 1.0, end: 0.0 });
        assert_eq!(layer.emission_rate, 0.0);
        assert_eq!(config.orb.radius, 0.01);
    }

    #[test]
    fn failed_image_falls_back_to_its_generator() {
        let config = OrbVisualConfig::default();
        let image_layer = &config.layers[0];

        assert_eq!(
            image_layer.resolve_source(true),
            ParticleSource::Image("textures/particle.png".into())
        );
        assert_eq!(
            image_layer.resolve_source(false),
            ParticleSource::Generator(GeneratorKind::Glow)
        );
        assert_eq!(
            config.layers[1].resolve_source(true),
            ParticleSource::Generator(GeneratorKind::Glow)
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            OrbVisualConfig::from_json("{ layers: "),
            Err(VisualConfigError::Parse(_))
        ));
        assert!(matches!(
            OrbVisualConfig::load("does/not/exist.json"),
            Err(VisualConfigError::Io { .. })
        ));
    }

    #[test]
    fn colours_parse_with_fallback() {
        let layer = ParticleLayer {
            gen_color: "not a colour".into(),
            ..default()
        };
        assert_eq!(layer.color(), Color::WHITE);
        assert!(parse_color("#00ccdd").is_some());
    }
}
