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

//! What the graphics driver can do, as seen by render path selection.

use std::fmt;

/// A `major.minor` capability level, ordered lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parses the leading `major.minor` of a GL driver string such as
    /// `"4.6 (Core Profile) Mesa 24.0.5"` or `"OpenGL ES 3.1 Mesa ..."`.
    ///
    /// Returns `None` when no version number is found.
    pub fn parse_gl(driver_info: &str) -> Option<Self> {
        let start = driver_info.find(|c: char| c.is_ascii_digit())?;
        let mut parts = driver_info[start..].split(|c: char| !c.is_ascii_digit());
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().and_then(|m| m.parse().ok()).unwrap_or(0);
        Some(Self { major, minor })
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Capability report consumed by [`select_render_path`](super::path::select_render_path).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GpuCapabilities {
    /// Reported capability version.
    pub version: ApiVersion,
    /// Compute shaders can be dispatched.
    pub compute_dispatch: bool,
    /// Memory barriers between dependent passes are available.
    pub memory_barrier: bool,
}

impl GpuCapabilities {
    /// A fully featured device, as used by the mock backend.
    pub const fn full() -> Self {
        Self {
            version: ApiVersion::new(4, 6),
            compute_dispatch: true,
            memory_barrier: true,
        }
    }
}

/// A backend-agnostic representation of a graphics API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GraphicsBackendType {
    Vulkan,
    Metal,
    Dx12,
    OpenGL,
    WebGpu,
    #[default]
    Unknown,
}

/// Identification of the adapter a device runs on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterInfo {
    pub name: String,
    pub backend: GraphicsBackendType,
    pub driver_info: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gl_core_profile() {
        assert_eq!(
            ApiVersion::parse_gl("4.6 (Core Profile) Mesa 24.0.5"),
            Some(ApiVersion::new(4, 6))
        );
    }

    #[test]
    fn test_parse_gl_es() {
        assert_eq!(
            ApiVersion::parse_gl("OpenGL ES 3.1 Mesa 23.2"),
            Some(ApiVersion::new(3, 1))
        );
        assert_eq!(ApiVersion::parse_gl("no digits"), None);
        assert_eq!(ApiVersion::parse_gl("4"), Some(ApiVersion::new(4, 0)));
    }

    #[test]
    fn test_version_ordering() {
        assert!(ApiVersion::new(4, 3) > ApiVersion::new(4, 1));
        assert!(ApiVersion::new(4, 0) < ApiVersion::new(4, 1));
        assert!(ApiVersion::new(3, 9) < ApiVersion::new(4, 1));
        assert_eq!(ApiVersion::new(4, 3).to_string(), "4.3");
    }
}
