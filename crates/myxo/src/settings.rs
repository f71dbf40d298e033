//! Optional TOML settings file. Everything has a default; the file only
//! needs the values it wants to change. CLI flags override the file.

use std::path::Path;

use serde::Deserialize;
use simulation::Controls;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings")]
    Parse(#[from] toml::de::Error),
    #[error("invalid setting: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub window: WindowSettings,
    pub simulation: SimulationSettings,
    pub controls: ControlSettings,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    pub fps: Option<f32>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationSettings {
    pub grid_width: u32,
    pub grid_height: u32,
    /// Fraction of grid cells seeded with a live agent.
    pub density: f32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlSettings {
    pub step_size: f32,
    pub sensor_distance: f32,
    /// Degrees in the file; converted to radians on the way out.
    pub sensor_angle_degrees: f32,
    pub rotation_angle_degrees: f32,
    pub disturb_radius: f32,
    pub color: [f32; 3],
    pub attract: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window: WindowSettings::default(),
            simulation: SimulationSettings::default(),
            controls: ControlSettings::default(),
        }
    }
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "myxo".into(),
            width: 1280,
            height: 720,
            vsync: true,
            fps: None,
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            grid_width: 256,
            grid_height: 256,
            density: 0.25,
        }
    }
}

impl Default for ControlSettings {
    fn default() -> Self {
        let base = Controls::default();
        Self {
            step_size: base.step_size,
            sensor_distance: base.sensor_distance,
            sensor_angle_degrees: base.sensor_angle.to_degrees(),
            rotation_angle_degrees: base.rotation_angle.to_degrees(),
            disturb_radius: base.disturb_radius,
            color: base.color,
            attract: base.attract,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(SettingsError::Invalid(
                "window dimensions must be greater than zero".into(),
            ));
        }
        if self.simulation.grid_width == 0 || self.simulation.grid_height == 0 {
            return Err(SettingsError::Invalid(
                "grid dimensions must be greater than zero".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.simulation.density) || self.simulation.density == 0.0 {
            return Err(SettingsError::Invalid(format!(
                "density must be in (0, 1], got {}",
                self.simulation.density
            )));
        }
        if self
            .controls
            .color
            .iter()
            .any(|component| !(0.0..=1.0).contains(component))
        {
            return Err(SettingsError::Invalid(
                "color components must be in [0, 1]".into(),
            ));
        }
        Ok(())
    }

    pub fn initial_controls(&self) -> Controls {
        Controls {
            step_size: self.controls.step_size,
            sensor_distance: self.controls.sensor_distance,
            sensor_angle: self.controls.sensor_angle_degrees.to_radians(),
            rotation_angle: self.controls.rotation_angle_degrees.to_radians(),
            disturb_radius: self.controls.disturb_radius,
            color: self.controls.color,
            attract: self.controls.attract,
            ..Controls::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings.window.width, 1280);
        assert_eq!(settings.simulation.density, 0.25);
        assert!(settings.window.vsync);
    }

    #[test]
    fn partial_document_overrides_only_named_values() {
        let settings = Settings::from_toml_str(
            r#"
            [simulation]
            grid_width = 512
            density = 0.1

            [controls]
            sensor_angle_degrees = 30.0
            "#,
        )
        .unwrap();
        assert_eq!(settings.simulation.grid_width, 512);
        assert_eq!(settings.simulation.grid_height, 256);
        let controls = settings.initial_controls();
        assert!((controls.sensor_angle - 30f32.to_radians()).abs() < 1e-6);
        assert_eq!(controls.step_size, Controls::default().step_size);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            Settings::from_toml_str("[window]\nwidht = 640\n"),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn out_of_range_density_is_rejected() {
        let err = Settings::from_toml_str("[simulation]\ndensity = 1.5\n").unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[window]\ntitle = \"trails\"\nwidth = 640\nheight = 480").unwrap();
        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.window.title, "trails");
        assert_eq!(settings.window.width, 640);
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = Settings::load(Path::new("/nonexistent/myxo.toml")).unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/myxo.toml"));
    }
}
