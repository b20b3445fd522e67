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

//! The fixed scene: a ground quad between two walls.

use tessera_core::renderer::mesh::MeshData;
use tessera_core::renderer::{GraphicsDevice, RenderPass, ResourceError};

use super::geometry;
use super::gpu_mesh::GpuMesh;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("Failed to upload mesh '{mesh}': {source}")]
    Upload {
        mesh: &'static str,
        #[source]
        source: ResourceError,
    },
    #[error("Mesh '{0}' is empty after upload")]
    Empty(&'static str),
}

/// GPU copies of the scene geometry.
///
/// The ground is kept apart from the walls because it never writes depth
/// in the forward and G-buffer passes.
#[derive(Debug, Default)]
pub struct SceneMeshes {
    ground: GpuMesh,
    walls: [GpuMesh; 2],
}

fn upload(
    device: &dyn GraphicsDevice,
    label: &'static str,
    data: &MeshData,
) -> Result<GpuMesh, SceneError> {
    let mut mesh = GpuMesh::new(label);
    mesh.upload(device, data)
        .map_err(|source| SceneError::Upload { mesh: label, source })?;
    if !mesh.is_valid() {
        return Err(SceneError::Empty(label));
    }
    Ok(mesh)
}

impl SceneMeshes {
    pub fn upload(device: &dyn GraphicsDevice) -> Result<Self, SceneError> {
        let mut scene = Self::default();
        let result = (|| -> Result<(), SceneError> {
            scene.ground = upload(device, "ground", &geometry::ground())?;
            scene.walls[0] = upload(device, "wall a", &geometry::wall_a())?;
            scene.walls[1] = upload(device, "wall b", &geometry::wall_b())?;
            Ok(())
        })();
        match result {
            Ok(()) => {
                log::debug!("SceneMeshes: uploaded ground and walls");
                Ok(scene)
            }
            Err(err) => {
                scene.release(device);
                Err(err)
            }
        }
    }

    pub fn draw_ground(&self, pass: &mut dyn RenderPass) {
        self.ground.draw(pass);
    }

    /// Everything that writes depth in the main passes.
    pub fn draw_opaque(&self, pass: &mut dyn RenderPass) {
        for wall in &self.walls {
            wall.draw(pass);
        }
    }

    /// Every shadow caster, ground included.
    pub fn draw_casters(&self, pass: &mut dyn RenderPass) {
        self.draw_ground(pass);
        self.draw_opaque(pass);
    }

    pub fn is_valid(&self) -> bool {
        self.ground.is_valid() && self.walls.iter().all(GpuMesh::is_valid)
    }

    pub fn release(&mut self, device: &dyn GraphicsDevice) {
        self.ground.release(device);
        for wall in &mut self.walls {
            wall.release(device);
        }
    }
}
