//! # Generation Settings
//!
//! Engine-wide knobs, loaded from TOML.
//!
//! ```toml
//! enable_landform_scaling = true
//! node_grid_size = 250
//! preview_workers = 2
//!
//! [coast]
//! threshold_shallow = 0.1
//! threshold_beach = 0.45
//! ```
//!
//! Missing keys take their defaults.

use std::fs;
use std::path::Path;

use landforge_core::{LandformError, LandformResult};
use landforge_procedural::CoastConfig;
use serde::{Deserialize, Serialize};

/// Settings shared by every landform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Scale node space to the map instead of authoring in map cells.
    pub enable_landform_scaling: bool,
    /// Size of node space along the map's shorter side.
    pub node_grid_size: u32,
    /// Threads in the preview worker pool.
    pub preview_workers: usize,
    /// Coast painting thresholds.
    pub coast: CoastConfig,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            enable_landform_scaling: true,
            node_grid_size: 250,
            preview_workers: 2,
            coast: CoastConfig::default(),
        }
    }
}

impl GenerationSettings {
    /// Parses settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the text is not valid TOML, has wrongly
    /// typed keys, or holds out-of-range values.
    pub fn from_toml_str(text: &str) -> LandformResult<Self> {
        let settings: Self = toml::from_str(text).map_err(|e| LandformError::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn from_file(path: impl AsRef<Path>) -> LandformResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| LandformError::io(path, &e))?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first offending key.
    pub fn validate(&self) -> LandformResult<()> {
        if self.node_grid_size == 0 {
            return Err(LandformError::InvalidConfig("node_grid_size must be positive".to_string()));
        }
        if self.preview_workers == 0 {
            return Err(LandformError::InvalidConfig("preview_workers must be positive".to_string()));
        }
        if self.coast.threshold_shallow > self.coast.threshold_beach {
            return Err(LandformError::InvalidConfig(
                "coast.threshold_shallow must not exceed coast.threshold_beach".to_string(),
            ));
        }
        Ok(())
    }

    /// Node-space cells per map cell for a map of the given size.
    #[must_use]
    pub fn node_space_factor(&self, map_width: u32, map_height: u32) -> f64 {
        let side = map_width.min(map_height);
        if !self.enable_landform_scaling || side == 0 {
            return 1.0;
        }
        f64::from(self.node_grid_size) / f64::from(side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let settings = GenerationSettings::from_toml_str("").unwrap();
        assert_eq!(settings, GenerationSettings::default());
    }

    #[test]
    fn test_partial_toml() {
        let settings = GenerationSettings::from_toml_str(
            "node_grid_size = 500\n[coast]\nthreshold_beach = 0.6\n",
        )
        .unwrap();
        assert_eq!(settings.node_grid_size, 500);
        assert_eq!(settings.preview_workers, 2);
        assert_eq!(settings.coast.threshold_beach, 0.6);
        assert_eq!(settings.coast.threshold_shallow, 0.1);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            GenerationSettings::from_toml_str("preview_workers = 0"),
            Err(LandformError::InvalidConfig(_))
        ));
        assert!(matches!(
            GenerationSettings::from_toml_str("node_grid_size = \"big\""),
            Err(LandformError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_node_space_factor() {
        let mut settings = GenerationSettings::default();
        assert_eq!(settings.node_space_factor(500, 500), 0.5);
        assert_eq!(settings.node_space_factor(125, 300), 2.0);

        settings.enable_landform_scaling = false;
        assert_eq!(settings.node_space_factor(500, 500), 1.0);
    }

    #[test]
    fn test_missing_file() {
        let result = GenerationSettings::from_file("/nonexistent/landforge/settings.toml");
        assert!(matches!(result, Err(LandformError::Io { .. })));
    }
}
