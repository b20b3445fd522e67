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

//! Render path selection.
//!
//! The path is decided once from the device capabilities and never changes
//! for the rest of the process. Lower paths are strict functional subsets
//! of higher ones, so a missing capability only ever degrades quality.

use super::capabilities::{ApiVersion, GpuCapabilities};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Minimum version for the compute tile-culling path.
pub const TILED_COMPUTE_MIN_VERSION: ApiVersion = ApiVersion::new(4, 3);
/// Minimum version for the deferred light-volume path.
pub const DEFERRED_MIN_VERSION: ApiVersion = ApiVersion::new(4, 1);

/// The rendering technique driving every frame, ordered from the most
/// basic to the most capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RenderPath {
    /// Forward shading with a single directional light, no point or spot lights.
    SimpleForward,
    /// G-buffer plus additive light-volume accumulation.
    Deferred41,
    /// Depth prepass, compute tile culling and tiled forward shading.
    TiledCompute,
}

impl RenderPath {
    /// Whether dynamic point and spot lights are shaded on this path.
    pub const fn has_dynamic_lights(&self) -> bool {
        !matches!(self, RenderPath::SimpleForward)
    }
}

impl fmt::Display for RenderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderPath::SimpleForward => write!(f, "SimpleForward"),
            RenderPath::Deferred41 => write!(f, "Deferred41"),
            RenderPath::TiledCompute => write!(f, "TiledCompute"),
        }
    }
}

/// The outcome of path selection and why the higher paths were refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathDecision {
    pub path: RenderPath,
    /// One entry per rejected higher path, best first.
    pub rejections: Vec<(RenderPath, String)>,
}

/// Applies the decision table to `caps`.
///
/// `cap` limits the result to at most that path, which lets a debug build
/// force a cheaper technique. It can never raise the result above what the
/// device supports.
pub fn select_render_path(caps: &GpuCapabilities, cap: Option<RenderPath>) -> PathDecision {
    let mut rejections = Vec::new();
    let allowed = |p: RenderPath| cap.is_none_or(|c| p <= c);

    let mut tiled_reasons = Vec::new();
    if !caps.compute_dispatch {
        tiled_reasons.push("compute dispatch unavailable".to_string());
    }
    if !caps.memory_barrier {
        tiled_reasons.push("memory barrier unavailable".to_string());
    }
    if caps.version < TILED_COMPUTE_MIN_VERSION {
        tiled_reasons.push(format!(
            "version {} below {}",
            caps.version, TILED_COMPUTE_MIN_VERSION
        ));
    }
    if !allowed(RenderPath::TiledCompute) {
        tiled_reasons.push("disabled by configuration".to_string());
    }
    if tiled_reasons.is_empty() {
        return PathDecision {
            path: RenderPath::TiledCompute,
            rejections,
        };
    }
    rejections.push((RenderPath::TiledCompute, tiled_reasons.join(", ")));

    let mut deferred_reasons = Vec::new();
    if caps.version < DEFERRED_MIN_VERSION {
        deferred_reasons.push(format!(
            "version {} below {}",
            caps.version, DEFERRED_MIN_VERSION
        ));
    }
    if !allowed(RenderPath::Deferred41) {
        deferred_reasons.push("disabled by configuration".to_string());
    }
    if deferred_reasons.is_empty() {
        return PathDecision {
            path: RenderPath::Deferred41,
            rejections,
        };
    }
    rejections.push((RenderPath::Deferred41, deferred_reasons.join(", ")));

    PathDecision {
        path: RenderPath::SimpleForward,
        rejections,
    }
}

/// Holds the single, process-wide path decision.
#[derive(Debug, Default)]
pub struct RenderPathSelector {
    decision: OnceLock<PathDecision>,
}

impl RenderPathSelector {
    pub const fn new() -> Self {
        Self {
            decision: OnceLock::new(),
        }
    }

    /// Decides the path on first call and logs the outcome. Later calls
    /// return the first decision whatever capabilities they pass.
    pub fn select(&self, caps: &GpuCapabilities, cap: Option<RenderPath>) -> RenderPath {
        self.decision
            .get_or_init(|| {
                let decision = select_render_path(caps, cap);
                for (path, reason) in &decision.rejections {
                    log::warn!("RenderPathSelector: {path} rejected: {reason}");
                }
                log::info!(
                    "RenderPathSelector: using {} (capability {}, compute {}, barrier {})",
                    decision.path,
                    caps.version,
                    caps.compute_dispatch,
                    caps.memory_barrier
                );
                decision
            })
            .path
    }

    /// The decision, once made.
    pub fn decision(&self) -> Option<&PathDecision> {
        self.decision.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(major: u32, minor: u32, compute: bool, barrier: bool) -> GpuCapabilities {
        GpuCapabilities {
            version: ApiVersion::new(major, minor),
            compute_dispatch: compute,
            memory_barrier: barrier,
        }
    }

    #[test]
    fn test_full_capabilities_pick_tiled() {
        let d = select_render_path(&caps(4, 6, true, true), None);
        assert_eq!(d.path, RenderPath::TiledCompute);
        assert!(d.rejections.is_empty());
    }

    #[test]
    fn test_missing_barrier_falls_back_to_deferred() {
        let d = select_render_path(&caps(4, 6, true, false), None);
        assert_eq!(d.path, RenderPath::Deferred41);
        assert_eq!(d.rejections.len(), 1);
        assert!(d.rejections[0].1.contains("memory barrier"));
    }

    #[test]
    fn test_version_boundaries() {
        assert_eq!(
            select_render_path(&caps(4, 3, true, true), None).path,
            RenderPath::TiledCompute
        );
        assert_eq!(
            select_render_path(&caps(4, 2, true, true), None).path,
            RenderPath::Deferred41
        );
        assert_eq!(
            select_render_path(&caps(4, 1, false, false), None).path,
            RenderPath::Deferred41
        );
        let d = select_render_path(&caps(3, 3, false, false), None);
        assert_eq!(d.path, RenderPath::SimpleForward);
        assert_eq!(d.rejections.len(), 2);
    }

    #[test]
    fn test_cap_can_only_lower_the_path() {
        let full = caps(4, 6, true, true);
        assert_eq!(
            select_render_path(&full, Some(RenderPath::Deferred41)).path,
            RenderPath::Deferred41
        );
        let weak = caps(3, 0, false, false);
        assert_eq!(
            select_render_path(&weak, Some(RenderPath::TiledCompute)).path,
            RenderPath::SimpleForward
        );
    }

    #[test]
    fn test_selector_is_immutable_after_first_decision() {
        let selector = RenderPathSelector::new();
        assert!(selector.decision().is_none());
        assert_eq!(
            selector.select(&caps(4, 6, true, true), None),
            RenderPath::TiledCompute
        );
        assert_eq!(
            selector.select(&caps(2, 0, false, false), None),
            RenderPath::TiledCompute
        );
    }
}
