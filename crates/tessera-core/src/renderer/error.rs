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


//! Error types shared by the device, the lanes and the render system.
//!
//! Shader and pipeline failures nest inside [`ResourceError`], which nests
//! inside [`RenderError`], so `source()` walks back to the backend message.

use crate::renderer::api::{ComputePipelineId, RenderPipelineId, ShaderModuleId};
use std::fmt;

/// A shader module the backend refused or cannot find.
#[derive(Debug)]
pub enum ShaderError {
    /// The WGSL did not compile.
    CompilationError {
        /// Label of the module, usually the shader file stem.
        label: String,
        details: String,
    },
    NotFound {
        id: ShaderModuleId,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::CompilationError { label, details } => {
                write!(f, "Shader '{label}' did not compile: {details}")
            }
            ShaderError::NotFound { id } => write!(f, "No shader module {id:?}"),
        }
    }
}

impl std::error::Error for ShaderError {}

/// A render or compute pipeline, or one of its layouts, could not be built.
#[derive(Debug)]
pub enum PipelineError {
    /// Bind group layout, pipeline layout or bind group creation failed.
    LayoutCreationFailed(String),
    CompilationFailed {
        label: Option<String>,
        details: String,
    },
    InvalidRenderPipeline {
        id: RenderPipelineId,
    },
    InvalidComputePipeline {
        id: ComputePipelineId,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::LayoutCreationFailed(msg) => write!(f, "Layout rejected: {msg}"),
            PipelineError::CompilationFailed { label, details } => write!(
                f,
                "Pipeline '{}' rejected: {details}",
                label.as_deref().unwrap_or("unlabelled")
            ),
            PipelineError::InvalidRenderPipeline { id } => write!(f, "No render pipeline {id:?}"),
            PipelineError::InvalidComputePipeline { id } => {
                write!(f, "No compute pipeline {id:?}")
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// A GPU resource could not be created, found or written.
#[derive(Debug)]
pub enum ResourceError {
    Shader(ShaderError),
    Pipeline(PipelineError),
    /// The id does not name a live resource.
    NotFound,
    /// Any other backend failure, including a poisoned resource table lock.
    BackendError(String),
    /// A write past the end of a buffer.
    OutOfBounds,
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Shader(err) => write!(f, "Shader error: {err}"),
            ResourceError::Pipeline(err) => write!(f, "Pipeline error: {err}"),
            ResourceError::NotFound => write!(f, "Resource id is not live"),
            ResourceError::BackendError(msg) => write!(f, "Backend error: {msg}"),
            ResourceError::OutOfBounds => write!(f, "Write past the end of the resource"),
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Shader(err) => Some(err),
            ResourceError::Pipeline(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShaderError> for ResourceError {
    fn from(err: ShaderError) -> Self {
        ResourceError::Shader(err)
    }
}

impl From<PipelineError> for ResourceError {
    fn from(err: PipelineError) -> Self {
        ResourceError::Pipeline(err)
    }
}

/// Failures of the render system: surface setup, frame acquisition and
/// target validation.
#[derive(Debug)]
pub enum RenderError {
    NotInitialized,
    InitializationFailed(String),
    SurfaceAcquisitionFailed(String),
    /// Attachments that do not form a usable target set. Logged, never fatal.
    IncompleteAttachments(String),
    ResourceError(ResourceError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::NotInitialized => write!(f, "Render system is not initialized"),
            RenderError::InitializationFailed(msg) => {
                write!(f, "Render system initialization failed: {msg}")
            }
            RenderError::SurfaceAcquisitionFailed(msg) => {
                write!(f, "Could not acquire the backbuffer: {msg}")
            }
            RenderError::IncompleteAttachments(msg) => {
                write!(f, "Incomplete attachments: {msg}")
            }
            RenderError::ResourceError(err) => write!(f, "GPU resource failure: {err}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::ResourceError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::ResourceError(err)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn shader_compilation_names_the_module() {
        let err = ShaderError::CompilationError {
            label: "shadow_depth".to_string(),
            details: "unknown identifier".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Shader 'shadow_depth' did not compile: unknown identifier"
        );
    }

    #[test]
    fn pipeline_error_is_the_resource_error_source() {
        let err: ResourceError = PipelineError::InvalidComputePipeline {
            id: ComputePipelineId(3),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Pipeline error: No compute pipeline ComputePipelineId(3)"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn render_error_chain_reaches_the_shader() {
        let render_err: RenderError = ResourceError::from(ShaderError::NotFound {
            id: ShaderModuleId(101),
        })
        .into();
        assert!(render_err.to_string().starts_with("GPU resource failure: Shader error"));
        let shader = render_err.source().and_then(Error::source);
        assert!(shader.is_some());
    }
}
