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

//! WGSL sources of every pass and the library that resolves them.
//!
//! Each shader ships embedded in the binary. A shader root directory can
//! override any file (including the shared preludes) for iteration without
//! rebuilding; a file missing from every root falls back to the embedded
//! copy.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tessera_core::renderer::{
    GraphicsDevice, ResourceError, ShaderModuleDescriptor, ShaderModuleId, ShaderSourceData,
};

/// Structs and lighting helpers shared by the scene shaders.
pub const COMMON_WGSL: &str = include_str!("common.wgsl");
/// Shadow uniforms, map bindings (group 3) and PCF lookups.
pub const SHADOW_SAMPLING_WGSL: &str = include_str!("shadow_sampling.wgsl");
/// Uniform and metadata layouts of the tile compute passes.
pub const TILE_CULL_COMMON_WGSL: &str = include_str!("tile_cull_common.wgsl");

pub const FORWARD_WGSL: &str = include_str!("forward.wgsl");
pub const DEPTH_PREPASS_WGSL: &str = include_str!("depth_prepass.wgsl");
pub const SHADOW_DEPTH_WGSL: &str = include_str!("shadow_depth.wgsl");
pub const GBUFFER_WGSL: &str = include_str!("gbuffer.wgsl");
pub const DEFERRED_DIRECTIONAL_WGSL: &str = include_str!("deferred_directional.wgsl");
pub const LIGHT_VOLUME_WGSL: &str = include_str!("light_volume.wgsl");
pub const TILE_DEPTH_REDUCE_WGSL: &str = include_str!("tile_depth_reduce.wgsl");
pub const TILE_LIGHT_CULL_WGSL: &str = include_str!("tile_light_cull.wgsl");
pub const TILED_SHADING_WGSL: &str = include_str!("tiled_shading.wgsl");
pub const COMPOSITE_WGSL: &str = include_str!("composite.wgsl");

/// A shared source concatenated in front of a shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prelude {
    Common,
    ShadowSampling,
    TileCull,
}

impl Prelude {
    pub const fn file_name(self) -> &'static str {
        match self {
            Prelude::Common => "common.wgsl",
            Prelude::ShadowSampling => "shadow_sampling.wgsl",
            Prelude::TileCull => "tile_cull_common.wgsl",
        }
    }

    pub const fn embedded(self) -> &'static str {
        match self {
            Prelude::Common => COMMON_WGSL,
            Prelude::ShadowSampling => SHADOW_SAMPLING_WGSL,
            Prelude::TileCull => TILE_CULL_COMMON_WGSL,
        }
    }
}

/// Every shader the renderer builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderId {
    Forward,
    DepthPrepass,
    ShadowDepth,
    GBuffer,
    DeferredDirectional,
    LightVolume,
    TileDepthReduce,
    TileLightCull,
    TiledShading,
    Composite,
}

impl ShaderId {
    pub const ALL: [ShaderId; 10] = [
        ShaderId::Forward,
        ShaderId::DepthPrepass,
        ShaderId::ShadowDepth,
        ShaderId::GBuffer,
        ShaderId::DeferredDirectional,
        ShaderId::LightVolume,
        ShaderId::TileDepthReduce,
        ShaderId::TileLightCull,
        ShaderId::TiledShading,
        ShaderId::Composite,
    ];

    /// Used as the module label and to build the file name.
    pub const fn name(self) -> &'static str {
        match self {
            ShaderId::Forward => "forward",
            ShaderId::DepthPrepass => "depth_prepass",
            ShaderId::ShadowDepth => "shadow_depth",
            ShaderId::GBuffer => "gbuffer",
            ShaderId::DeferredDirectional => "deferred_directional",
            ShaderId::LightVolume => "light_volume",
            ShaderId::TileDepthReduce => "tile_depth_reduce",
            ShaderId::TileLightCull => "tile_light_cull",
            ShaderId::TiledShading => "tiled_shading",
            ShaderId::Composite => "composite",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.wgsl", self.name())
    }

    pub const fn embedded(self) -> &'static str {
        match self {
            ShaderId::Forward => FORWARD_WGSL,
            ShaderId::DepthPrepass => DEPTH_PREPASS_WGSL,
            ShaderId::ShadowDepth => SHADOW_DEPTH_WGSL,
            ShaderId::GBuffer => GBUFFER_WGSL,
            ShaderId::DeferredDirectional => DEFERRED_DIRECTIONAL_WGSL,
            ShaderId::LightVolume => LIGHT_VOLUME_WGSL,
            ShaderId::TileDepthReduce => TILE_DEPTH_REDUCE_WGSL,
            ShaderId::TileLightCull => TILE_LIGHT_CULL_WGSL,
            ShaderId::TiledShading => TILED_SHADING_WGSL,
            ShaderId::Composite => COMPOSITE_WGSL,
        }
    }

    pub const fn preludes(self) -> &'static [Prelude] {
        match self {
            ShaderId::ShadowDepth => &[],
            ShaderId::TileDepthReduce => &[Prelude::TileCull],
            ShaderId::TileLightCull => &[Prelude::Common, Prelude::TileCull],
            ShaderId::DeferredDirectional | ShaderId::LightVolume | ShaderId::TiledShading => {
                &[Prelude::Common, Prelude::ShadowSampling]
            }
            ShaderId::Forward
            | ShaderId::DepthPrepass
            | ShaderId::GBuffer
            | ShaderId::Composite => &[Prelude::Common],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ShaderLibraryError {
    #[error("Failed to read shader '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to build shader '{name}': {source}")]
    Build {
        name: &'static str,
        #[source]
        source: ResourceError,
    },
}

/// Resolves shader sources and builds modules from them.
#[derive(Debug, Clone, Default)]
pub struct ShaderLibrary {
    roots: Vec<PathBuf>,
}

impl ShaderLibrary {
    /// A library that only uses the embedded sources.
    pub fn embedded() -> Self {
        Self::default()
    }

    /// Searches `override_root`, then `<exe dir>/shaders`, then `./shaders`.
    pub fn new(override_root: Option<&Path>) -> Self {
        let mut roots: Vec<PathBuf> = override_root.map(Path::to_path_buf).into_iter().collect();
        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            roots.push(exe_dir.join("shaders"));
        }
        roots.push(PathBuf::from("shaders"));
        log::debug!("ShaderLibrary: Search roots {:?}", roots);
        Self { roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn read(&self, file_name: &str, embedded: &'static str) -> Result<Cow<'static, str>, ShaderLibraryError> {
        for root in &self.roots {
            let path = root.join(file_name);
            if path.is_file() {
                log::debug!("ShaderLibrary: Loading '{}'", path.display());
                return std::fs::read_to_string(&path)
                    .map(Cow::Owned)
                    .map_err(|source| ShaderLibraryError::Io { path, source });
            }
        }
        Ok(Cow::Borrowed(embedded))
    }

    /// Full WGSL text of `id`, preludes included.
    pub fn source(&self, id: ShaderId) -> Result<String, ShaderLibraryError> {
        let mut text = String::new();
        for prelude in id.preludes() {
            text.push_str(&self.read(prelude.file_name(), prelude.embedded())?);
            text.push('\n');
        }
        text.push_str(&self.read(&id.file_name(), id.embedded())?);
        Ok(text)
    }

    /// Compiles `id` on `device`. The caller owns the returned module.
    pub fn module(
        &self,
        device: &dyn GraphicsDevice,
        id: ShaderId,
    ) -> Result<ShaderModuleId, ShaderLibraryError> {
        let source = self.source(id)?;
        device
            .create_shader_module(&ShaderModuleDescriptor {
                label: Some(id.name()),
                source: ShaderSourceData::Wgsl(Cow::Owned(source)),
            })
            .map_err(|source| {
                log::error!("ShaderLibrary: Failed to build '{}': {}", id.name(), source);
                ShaderLibraryError::Build {
                    name: id.name(),
                    source,
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::renderer::testing::RecordingDevice;

    #[test]
    fn test_entry_points_present() {
        for id in [ShaderId::Forward, ShaderId::GBuffer, ShaderId::TiledShading] {
            assert!(id.embedded().contains("@vertex"), "{} lacks @vertex", id.name());
            assert!(id.embedded().contains("@fragment"), "{} lacks @fragment", id.name());
        }
        for id in [ShaderId::DepthPrepass, ShaderId::ShadowDepth] {
            assert!(id.embedded().contains("@vertex"));
            assert!(!id.embedded().contains("@fragment"));
        }
        for id in [ShaderId::TileDepthReduce, ShaderId::TileLightCull] {
            assert!(id.embedded().contains("@compute"));
        }
    }

    #[test]
    fn test_source_prepends_preludes() {
        let library = ShaderLibrary::embedded();
        let source = library.source(ShaderId::TiledShading).unwrap();
        let common = source.find("struct FrameUniforms").unwrap();
        let shadow = source.find("struct ShadowUniforms").unwrap();
        let body = source.find("fn fs_main").unwrap();
        assert!(common < shadow && shadow < body);

        let source = library.source(ShaderId::ShadowDepth).unwrap();
        assert!(!source.contains("struct FrameUniforms"));
    }

    #[test]
    fn test_background_epsilon_matches_core() {
        assert!(TILE_CULL_COMMON_WGSL.contains("BACKGROUND_DEPTH_EPSILON: f32 = 1e-6"));
        assert_eq!(tessera_core::renderer::tiled::BACKGROUND_DEPTH_EPSILON, 1e-6);
    }

    #[test]
    fn test_override_root_wins_over_embedded() {
        let root = std::env::temp_dir().join(format!("tessera-shaders-{}", std::process::id()));
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("composite.wgsl"), "// overridden").unwrap();

        let library = ShaderLibrary::new(Some(&root));
        let source = library.source(ShaderId::Composite).unwrap();
        assert!(source.ends_with("// overridden"));
        assert!(source.contains("struct FrameUniforms"));

        let source = library.source(ShaderId::Forward).unwrap();
        assert!(source.contains("fn vs_main"));
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_build_failure_is_reported() {
        let device = RecordingDevice::default();
        device.fail_shader("light_volume");
        let library = ShaderLibrary::embedded();
        assert!(library.module(&device, ShaderId::Forward).is_ok());
        let err = library.module(&device, ShaderId::LightVolume).unwrap_err();
        assert!(matches!(err, ShaderLibraryError::Build { name: "light_volume", .. }));
    }
}
