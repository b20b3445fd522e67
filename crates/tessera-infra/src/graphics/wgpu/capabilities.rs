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


//! Derives the capability report used for render path selection from what
//! the `wgpu` adapter exposes.

use tessera_core::renderer::{AdapterInfo, ApiVersion, GpuCapabilities, GraphicsBackendType};

pub(crate) fn backend_type(backend: wgpu::Backend) -> GraphicsBackendType {
    match backend {
        wgpu::Backend::Vulkan => GraphicsBackendType::Vulkan,
        wgpu::Backend::Metal => GraphicsBackendType::Metal,
        wgpu::Backend::Dx12 => GraphicsBackendType::Dx12,
        wgpu::Backend::Gl => GraphicsBackendType::OpenGL,
        wgpu::Backend::BrowserWebGpu => GraphicsBackendType::WebGpu,
        _ => GraphicsBackendType::Unknown,
    }
}

pub(crate) fn adapter_info(info: &wgpu::AdapterInfo) -> AdapterInfo {
    AdapterInfo {
        name: info.name.clone(),
        backend: backend_type(info.backend),
        driver_info: info.driver_info.clone(),
    }
}

/// Maps the adapter onto a GL-style `major.minor` capability level.
///
/// The GL backend reports its context version in the driver string, which is
/// trusted when it parses. Every other backend is ranked by shader model:
/// SM5 lines up with 4.3 (compute plus storage buffers), SM4 with 4.1 and
/// anything older with 3.3.
pub(crate) fn derive_capabilities(
    backend: wgpu::Backend,
    driver_info: &str,
    downlevel: &wgpu::DownlevelCapabilities,
) -> GpuCapabilities {
    let from_driver = match backend {
        wgpu::Backend::Gl => ApiVersion::parse_gl(driver_info),
        _ => None,
    };
    let version = from_driver.unwrap_or(match downlevel.shader_model {
        wgpu::ShaderModel::Sm5 => ApiVersion::new(4, 3),
        wgpu::ShaderModel::Sm4 => ApiVersion::new(4, 1),
        _ => ApiVersion::new(3, 3),
    });
    let compute = downlevel
        .flags
        .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS);

    GpuCapabilities {
        version,
        compute_dispatch: compute,
        memory_barrier: compute,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn downlevel(shader_model: wgpu::ShaderModel, compute: bool) -> wgpu::DownlevelCapabilities {
        let mut caps = wgpu::DownlevelCapabilities {
            shader_model,
            ..Default::default()
        };
        if !compute {
            caps.flags.remove(wgpu::DownlevelFlags::COMPUTE_SHADERS);
        }
        caps
    }

    #[test]
    fn test_vulkan_sm5_is_compute_capable() {
        let caps = derive_capabilities(
            wgpu::Backend::Vulkan,
            "Mesa 24.0",
            &downlevel(wgpu::ShaderModel::Sm5, true),
        );
        assert_eq!(caps.version, ApiVersion::new(4, 3));
        assert!(caps.compute_dispatch);
        assert!(caps.memory_barrier);
    }

    #[test]
    fn test_gl_trusts_driver_string() {
        let caps = derive_capabilities(
            wgpu::Backend::Gl,
            "OpenGL ES 3.0 Mesa 23.2",
            &downlevel(wgpu::ShaderModel::Sm5, false),
        );
        assert_eq!(caps.version, ApiVersion::new(3, 0));
        assert!(!caps.compute_dispatch);
    }

    #[test]
    fn test_gl_unparseable_driver_falls_back_to_shader_model() {
        let caps = derive_capabilities(
            wgpu::Backend::Gl,
            "unknown",
            &downlevel(wgpu::ShaderModel::Sm4, false),
        );
        assert_eq!(caps.version, ApiVersion::new(4, 1));
    }

    #[test]
    fn test_backend_mapping() {
        assert_eq!(backend_type(wgpu::Backend::Gl), GraphicsBackendType::OpenGL);
        assert_eq!(
            backend_type(wgpu::Backend::Vulkan),
            GraphicsBackendType::Vulkan
        );
    }
}
