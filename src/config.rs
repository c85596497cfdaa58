//! System configuration
//!
//! One serializable struct per subsystem, aggregated by `LodSystemConfig`.
//! Files are TOML or JSON, picked by extension.

use crate::camera::CameraConfig;
use crate::draw::{validate_draw_config, DrawConfig};
use crate::error::{invalid_config, EngineResult};
use crate::lod::{validate_lod_build_config, LodBuildConfig};
use crate::meshlet::{validate_meshlet_config, validate_packing_config, MeshletConfig, PackingConfig};
use crate::thread_pool::{validate_scheduler_config, SchedulerConfig};
use crate::traversal::{validate_selection_config, SelectionConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodSystemConfig {
    pub meshlet: MeshletConfig,
    pub packing: PackingConfig,
    pub lod: LodBuildConfig,
    pub selection: SelectionConfig,
    pub scheduler: SchedulerConfig,
    pub draw: DrawConfig,
    pub camera: CameraConfig,
}

impl LodSystemConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> EngineResult<()> {
        validate_meshlet_config(&self.meshlet)?;
        validate_packing_config(&self.packing)?;
        validate_lod_build_config(&self.lod)?;
        validate_selection_config(&self.selection)?;
        validate_scheduler_config(&self.scheduler)?;
        validate_draw_config(&self.draw)?;

        if self.selection.locked_lod > self.lod.max_lod as i32 {
            return Err(invalid_config(
                "selection.locked_lod",
                self.selection.locked_lod,
                "exceeds lod.max_lod",
            ));
        }

        if !(self.camera.near_plane > 0.0 && self.camera.far_plane > self.camera.near_plane) {
            return Err(invalid_config(
                "camera.far_plane",
                self.camera.far_plane,
                "needs 0 < near_plane < far_plane",
            ));
        }

        log::info!(
            "[LodSystemConfig] Validation: meshlet {}v/{}p, max_lod={}, policy={:?}, worker_cap={}, batch slots={}",
            self.meshlet.max_vertices,
            self.meshlet.max_primitives,
            self.lod.max_lod,
            self.selection.policy,
            self.scheduler.worker_cap,
            self.draw.batch_pool_capacity
        );
        log::info!("[LodSystemConfig] Configuration validated successfully");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Toml,
    Json,
}

fn config_format(path: &Path) -> ConfigFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
        _ => ConfigFormat::Toml,
    }
}

/// Parse config text in the given format and validate it
pub fn parse_config(text: &str, json: bool) -> Result<LodSystemConfig> {
    let config: LodSystemConfig = if json {
        serde_json::from_str(text).context("invalid JSON config")?
    } else {
        toml::from_str(text).context("invalid TOML config")?
    };
    config.validate()?;
    Ok(config)
}

/// Load and validate a config file (`.json` as JSON, anything else as TOML)
pub fn load_config(path: impl AsRef<Path>) -> Result<LodSystemConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = parse_config(&text, config_format(path) == ConfigFormat::Json)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    log::info!("[load_config] Loaded {}", path.display());
    Ok(config)
}

/// Write a config file in the format its extension names
pub fn save_config(config: &LodSystemConfig, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let text = match config_format(path) {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
    };
    std::fs::write(path, text).with_context(|| format!("failed to write config {}", path.display()))?;
    log::info!("[save_config] Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traversal::SelectionPolicy;

    #[test]
    fn test_default_config_is_valid() {
        let config = LodSystemConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.meshlet.max_vertices, 64);
        assert_eq!(config.meshlet.max_primitives, 126);
        assert_eq!(config.selection.locked_lod, -1);
        assert_eq!(config.scheduler.worker_cap, 12);
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lod.toml");

        let mut config = LodSystemConfig::default();
        config.selection.policy = SelectionPolicy::ScreenSpaceError;
        config.selection.thresholds = vec![1.0, 2.0, 4.0];
        config.draw.batch_pool_capacity = 64;
        save_config(&config, &path).unwrap();

        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lod.json");

        let mut config = LodSystemConfig::default();
        config.lod.max_lod = 4;
        config.selection.locked_lod = 2;
        save_config(&config, &path).unwrap();

        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = parse_config("[meshlet]\nmax_vertices = 32\n", false).unwrap();
        assert_eq!(config.meshlet.max_vertices, 32);
        assert_eq!(config.meshlet.max_primitives, 126);
        assert_eq!(config.selection, SelectionConfig::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(parse_config("[meshlet]\nmax_vertices = 2\n", false).is_err());
        assert!(parse_config("[selection]\nthresholds = [3.0, 1.0]\n", false).is_err());
        assert!(parse_config("{\"scheduler\": {\"worker_cap\": 0}}", true).is_err());
        assert!(parse_config("[lod]\nmax_lod = 2\n[selection]\nlocked_lod = 5\n", false).is_err());
        assert!(load_config("/nonexistent/lod.toml").is_err());
    }
}
