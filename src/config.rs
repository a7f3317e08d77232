use std::path::Path;

use config::{Config, File, FileFormat};
use log::error;
use serde::{Deserialize, Serialize};

use crate::config_io::{get_conf_d_path, CONFIG_ROOT_PATH};
use crate::controls::button::PushBehavior;
use crate::error::{check_non_negative, check_range, ConfigError};
use crate::interactions::manipulation::{
    AxisFlags, ManipulationModes, OneHandRotationMode, ReleaseBehavior, TransformModes,
};

// Distances are in meters, speeds in meters per second.

fn def_proximity_radius() -> f32 {
    0.11
}

fn def_poke_radius() -> f32 {
    0.0075
}

fn def_grab_radius() -> f32 {
    0.035
}

fn def_poke_depth() -> f32 {
    0.2
}

fn def_ray_length() -> f32 {
    5.0
}

fn def_grasp_start() -> f32 {
    0.02
}

fn def_grasp_end() -> f32 {
    0.045
}

fn def_max_push_distance() -> f32 {
    0.01
}

pub fn def_half() -> f32 {
    0.5
}

fn def_point2() -> f32 {
    0.2
}

fn def_zero() -> f32 {
    0.0
}

fn def_slider_start() -> f32 {
    -0.05
}

fn def_slider_end() -> f32 {
    0.05
}

fn def_tick_marks() -> u32 {
    5
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearPointerConfig {
    #[serde(default = "def_proximity_radius")]
    pub proximity_radius: f32,

    /// Used when the tracker reports no radius for the index tip.
    #[serde(default = "def_poke_radius")]
    pub poke_radius: f32,

    #[serde(default = "def_grab_radius")]
    pub grab_radius: f32,

    /// How far behind a front face a poke may travel before it ends.
    #[serde(default = "def_poke_depth")]
    pub poke_depth: f32,
}

impl Default for NearPointerConfig {
    fn default() -> Self {
        Self {
            proximity_radius: def_proximity_radius(),
            poke_radius: def_poke_radius(),
            grab_radius: def_grab_radius(),
            poke_depth: def_poke_depth(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FarPointerConfig {
    #[serde(default = "def_ray_length")]
    pub ray_length: f32,
}

impl Default for FarPointerConfig {
    fn default() -> Self {
        Self {
            ray_length: def_ray_length(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraspConfig {
    #[serde(default = "def_grasp_start")]
    pub start_distance: f32,

    #[serde(default = "def_grasp_end")]
    pub end_distance: f32,
}

impl Default for GraspConfig {
    fn default() -> Self {
        Self {
            start_distance: def_grasp_start(),
            end_distance: def_grasp_end(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ButtonConfig {
    /// Ignored in compress mode, where the travel comes from the visuals' bounds.
    #[serde(default = "def_max_push_distance")]
    pub max_push_distance: f32,

    #[serde(default = "def_half")]
    pub pressed_fraction: f32,

    #[serde(default = "def_point2")]
    pub released_fraction: f32,

    #[serde(default = "def_half")]
    pub recovery_speed: f32,

    /// Extra collision depth in front of the visuals.
    #[serde(default = "def_zero")]
    pub front_face_margin: f32,

    #[serde(default)]
    pub push_behavior: PushBehavior,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            max_push_distance: def_max_push_distance(),
            pressed_fraction: def_half(),
            released_fraction: def_point2(),
            recovery_speed: def_half(),
            front_face_margin: def_zero(),
            push_behavior: PushBehavior::default(),
        }
    }
}

impl ButtonConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_non_negative("max_push_distance", self.max_push_distance)?;
        check_range("pressed_fraction", self.pressed_fraction, 0.0, 1.0)?;
        check_range("released_fraction", self.released_fraction, 0.0, 1.0)?;
        if self.released_fraction >= self.pressed_fraction {
            return Err(ConfigError::Hysteresis {
                pressed: self.pressed_fraction,
                released: self.released_fraction,
            });
        }
        check_non_negative("recovery_speed", self.recovery_speed)?;
        check_non_negative("front_face_margin", self.front_face_margin)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliderConfig {
    #[serde(default = "def_slider_start")]
    pub start_distance: f32,

    #[serde(default = "def_slider_end")]
    pub end_distance: f32,

    #[serde(default = "def_half")]
    pub initial_value: f32,

    #[serde(default = "def_tick_marks")]
    pub num_tick_marks: u32,
}

impl Default for SliderConfig {
    fn default() -> Self {
        Self {
            start_distance: def_slider_start(),
            end_distance: def_slider_end(),
            initial_value: def_half(),
            num_tick_marks: def_tick_marks(),
        }
    }
}

impl SliderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("initial_value", self.initial_value, 0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManipulatorConfig {
    #[serde(default)]
    pub manipulation_modes: ManipulationModes,

    #[serde(default)]
    pub one_hand_rotation_mode: OneHandRotationMode,

    #[serde(default)]
    pub two_hand_transform_modes: TransformModes,

    #[serde(default)]
    pub scale_axes: AxisFlags,

    #[serde(default)]
    pub release_behavior: ReleaseBehavior,

    /// Zero disables smoothing.
    #[serde(default = "def_zero")]
    pub smoothing_factor: f32,
}

impl Default for ManipulatorConfig {
    fn default() -> Self {
        Self {
            manipulation_modes: ManipulationModes::default(),
            one_hand_rotation_mode: OneHandRotationMode::default(),
            two_hand_transform_modes: TransformModes::default(),
            scale_axes: AxisFlags::default(),
            release_behavior: ReleaseBehavior::default(),
            smoothing_factor: def_zero(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionConfig {
    #[serde(default)]
    pub near_pointer: NearPointerConfig,

    #[serde(default)]
    pub far_pointer: FarPointerConfig,

    #[serde(default)]
    pub grasp: GraspConfig,

    #[serde(default)]
    pub button: ButtonConfig,

    #[serde(default)]
    pub slider: SliderConfig,

    #[serde(default)]
    pub manipulator: ManipulatorConfig,
}

impl InteractionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let near = &self.near_pointer;
        check_non_negative("proximity_radius", near.proximity_radius)?;
        check_non_negative("poke_radius", near.poke_radius)?;
        check_non_negative("grab_radius", near.grab_radius)?;
        check_non_negative("poke_depth", near.poke_depth)?;
        check_non_negative("ray_length", self.far_pointer.ray_length)?;

        check_non_negative("grasp.start_distance", self.grasp.start_distance)?;
        if self.grasp.end_distance < self.grasp.start_distance {
            return Err(ConfigError::OutOfRange {
                name: "grasp.end_distance",
                value: self.grasp.end_distance,
                min: self.grasp.start_distance,
                max: f32::INFINITY,
            });
        }

        self.button.validate()?;
        self.slider.validate()?;
        check_non_negative("smoothing_factor", self.manipulator.smoothing_factor)?;
        Ok(())
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: InteractionConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }
}

const FALLBACK: &str = include_str!("res/interaction.yaml");

/// Layers the built-in defaults, `config.yaml` in the config root and in
/// `conf.d`, every other `conf.d` file in name order, then `extra`.
pub fn load_config(extra: Option<&Path>) -> Result<InteractionConfig, ConfigError> {
    let mut settings_builder =
        Config::builder().add_source(File::from_str(FALLBACK, FileFormat::Yaml));

    let path_conf_d = get_conf_d_path();

    for mut base_conf in [CONFIG_ROOT_PATH.clone(), path_conf_d.clone()] {
        base_conf.push("config.yaml");
        if base_conf.exists() {
            log::info!("Loading config file: {}", base_conf.to_string_lossy());
            settings_builder = settings_builder.add_source(File::from(base_conf));
        }
    }

    if let Ok(paths_unsorted) = std::fs::read_dir(&path_conf_d) {
        let mut paths: Vec<_> = paths_unsorted
            .filter_map(|r| match r {
                Ok(entry) => Some(entry.path()),
                Err(e) => {
                    error!("Failed to read conf.d directory: {}", e);
                    None
                }
            })
            .filter(|p| p.file_name().is_some_and(|n| n != "config.yaml"))
            .collect();
        paths.sort();
        for path in paths {
            log::info!("Loading config file: {}", path.to_string_lossy());
            settings_builder = settings_builder.add_source(File::from(path));
        }
    }

    if let Some(path) = extra {
        log::info!("Loading config file: {}", path.to_string_lossy());
        settings_builder = settings_builder.add_source(File::from(path).required(true));
    }

    let config = settings_builder
        .build()?
        .try_deserialize::<InteractionConfig>()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_matches_defaults() {
        let config = InteractionConfig::from_yaml(FALLBACK).unwrap();
        assert_eq!(config, InteractionConfig::default());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = InteractionConfig::from_yaml(
            "button:\n  pressed_fraction: 0.7\nmanipulator:\n  manipulation_modes: ONE_HANDED\n",
        )
        .unwrap();
        assert_eq!(config.button.pressed_fraction, 0.7);
        assert_eq!(config.button.released_fraction, 0.2);
        assert_eq!(
            config.manipulator.manipulation_modes,
            ManipulationModes::ONE_HANDED
        );
        assert_eq!(config.near_pointer, NearPointerConfig::default());
    }

    #[test]
    fn hysteresis_is_enforced() {
        let mut config = InteractionConfig::default();
        config.button.released_fraction = 0.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Hysteresis { .. })
        ));

        config.button.released_fraction = 0.2;
        config.button.pressed_fraction = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                name: "pressed_fraction",
                ..
            })
        ));
    }

    #[test]
    fn negative_radius_rejected() {
        let mut config = InteractionConfig::default();
        config.near_pointer.grab_radius = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Negative {
                name: "grab_radius",
                ..
            })
        ));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(matches!(
            InteractionConfig::from_yaml("button: [1, 2"),
            Err(ConfigError::Yaml(_))
        ));
    }
}
