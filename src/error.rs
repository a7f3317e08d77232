use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} needs to be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("released_fraction ({released}) must be lower than pressed_fraction ({pressed})")]
    Hysteresis { pressed: f32, released: f32 },
    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f32 },
    #[error("Failed to build settings: {0}")]
    Source(#[from] config::ConfigError),
    #[error("Failed to parse yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub(crate) fn check_range(
    name: &'static str,
    value: f32,
    min: f32,
    max: f32,
) -> Result<(), ConfigError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(())
}

pub(crate) fn check_non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::Negative { name, value });
    }
    Ok(())
}
