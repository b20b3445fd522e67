// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Renderer configuration loaded from RON.

use crate::renderer::path::RenderPath;
use crate::renderer::shadow::ShadowSettings;
use crate::renderer::tiled::TiledConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "TESSERA_CONFIG";
/// File looked up in the working directory when the variable is unset.
pub const DEFAULT_CONFIG_FILE: &str = "tessera.ron";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Tessera - Render Preview".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Every tunable of the renderer. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub window: WindowConfig,
    pub tiled: TiledConfig,
    pub shadows: ShadowSettings,
    /// Directory searched first for shader files.
    pub shader_root: Option<PathBuf>,
    /// Caps the detected render path.
    pub force_path: Option<RenderPath>,
}

impl RendererConfig {
    /// Parses a configuration from RON text.
    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str::<Self>(text).map(Self::sanitized)
    }

    /// Loads and sanitizes the configuration at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolves the configuration the way the binary does.
    ///
    /// `$TESSERA_CONFIG` wins over `./tessera.ron`. A missing file yields the
    /// defaults; an unreadable or malformed one is logged and also yields the
    /// defaults.
    pub fn load_default() -> Self {
        let path = std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        if !path.exists() {
            log::info!(
                "RendererConfig: No config at '{}', using defaults",
                path.display()
            );
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => {
                log::info!("RendererConfig: Loaded '{}'", path.display());
                config
            }
            Err(e) => {
                log::error!("RendererConfig: {e}. Using defaults.");
                Self::default()
            }
        }
    }

    /// Clamps every section into its supported range.
    pub fn sanitized(mut self) -> Self {
        self.shadows = self.shadows.sanitized();
        self.tiled.max_lights_per_tile = self.tiled.max_lights_per_tile.max(1);
        self.window.width = self.window.width.max(1);
        self.window.height = self.window.height.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::tiled::TileSize;

    #[test]
    fn test_defaults() {
        let config = RendererConfig::default();
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.tiled.tile_size, TileSize::X16);
        assert_eq!(config.tiled.max_lights_per_tile, 128);
        assert_eq!(config.shadows.cascade_count, 3);
        assert_eq!(config.shadows.cascade_resolution, 2048);
        assert!(config.force_path.is_none());
    }

    #[test]
    fn test_partial_ron_keeps_other_defaults() {
        let config = RendererConfig::from_ron(
            "(tiled: (tile_size: X32), shadows: (cascade_count: 7, point_update_every: 0), force_path: Some(Deferred41))",
        )
        .unwrap();
        assert_eq!(config.tiled.tile_size, TileSize::X32);
        assert_eq!(config.tiled.max_lights_per_tile, 128);
        assert_eq!(config.shadows.cascade_count, 4);
        assert_eq!(config.shadows.point_update_every, 1);
        assert_eq!(config.shadows.spot_resolution, 1024);
        assert_eq!(config.force_path, Some(RenderPath::Deferred41));
    }

    #[test]
    fn test_malformed_ron_is_an_error() {
        assert!(RendererConfig::from_ron("(window: (width: \"wide\"))").is_err());
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let err = RendererConfig::load("/definitely/not/here.ron").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/definitely/not/here.ron"));
    }
}
