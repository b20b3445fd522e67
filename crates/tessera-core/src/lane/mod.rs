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

//! # Lane Abstraction
//!
//! A **Lane** is one GPU-owning stage of a render path: the shadow system,
//! the tile culler, the light-volume renderer and so on. The path strategies
//! in `tessera-agents` compose lanes and drive their lifecycle through this
//! trait; the per-frame work itself goes through each lane's typed
//! `encode` method.
//!
//! Lanes receive what they need at initialisation through a [`LaneContext`],
//! a small type map the strategy fills with shared collaborators (the
//! graphics device, the shader library, configuration sections).

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

/// Error type for lane operations.
#[derive(Debug)]
pub enum LaneError {
    /// The lane has not been initialized yet.
    NotInitialized,
    /// A collaborator the lane needs is not in the context.
    MissingContext {
        /// Type name of the missing entry.
        expected: &'static str,
    },
    /// A domain-specific error occurred during initialization.
    InitializationFailed(Box<dyn std::error::Error + Send + Sync>),
    /// A domain-specific error occurred while recording work.
    ExecutionFailed(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for LaneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneError::NotInitialized => write!(f, "Lane not initialized"),
            LaneError::MissingContext { expected } => {
                write!(f, "Lane context is missing {expected}")
            }
            LaneError::InitializationFailed(e) => write!(f, "Lane initialization failed: {e}"),
            LaneError::ExecutionFailed(e) => write!(f, "Lane execution failed: {e}"),
        }
    }
}

impl std::error::Error for LaneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LaneError::ExecutionFailed(e) | LaneError::InitializationFailed(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl LaneError {
    /// Convenience constructor for a missing context entry.
    pub fn missing<T: ?Sized>() -> Self {
        LaneError::MissingContext {
            expected: std::any::type_name::<T>(),
        }
    }

    /// Wraps a domain error raised during initialization.
    pub fn init<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        LaneError::InitializationFailed(Box::new(error))
    }

    /// Wraps a domain error raised while recording.
    pub fn execution<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        LaneError::ExecutionFailed(Box::new(error))
    }
}

/// Classification of lanes, used for logging and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneKind {
    /// Rasterises the scene into depth or G-buffer targets.
    Geometry,
    /// Accumulates dynamic or directional light.
    Lighting,
    /// Renders shadow maps.
    Shadow,
    /// Compute work between the geometry and lighting stages.
    Compute,
    /// Resolves to the backbuffer.
    Composite,
}

impl fmt::Display for LaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneKind::Geometry => write!(f, "Geometry"),
            LaneKind::Lighting => write!(f, "Lighting"),
            LaneKind::Shadow => write!(f, "Shadow"),
            LaneKind::Compute => write!(f, "Compute"),
            LaneKind::Composite => write!(f, "Composite"),
        }
    }
}

/// A type map of shared collaborators handed to lanes.
///
/// ```rust,ignore
/// let mut ctx = LaneContext::new();
/// ctx.insert(device.clone());
/// let device = ctx.require::<Arc<dyn GraphicsDevice>>()?;
/// ```
#[derive(Default)]
pub struct LaneContext {
    data: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl LaneContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value keyed by its concrete type, replacing any previous one.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.data.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn get<T: Any>(&self) -> Option<&T> {
        self.data.get(&TypeId::of::<T>())?.downcast_ref()
    }

    /// Like [`get`](Self::get) but reports a [`LaneError`] when absent.
    pub fn require<T: Any>(&self) -> Result<&T, LaneError> {
        self.get::<T>().ok_or_else(LaneError::missing::<T>)
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.data.contains_key(&TypeId::of::<T>())
    }
}

impl fmt::Debug for LaneContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaneContext")
            .field("entries", &self.data.len())
            .finish()
    }
}

/// Lifecycle shared by every lane.
pub trait Lane: Send + Sync {
    /// Human-readable name used in logs.
    fn strategy_name(&self) -> &'static str;

    fn lane_kind(&self) -> LaneKind;

    /// Creates the lane's pipelines and fixed resources.
    fn on_initialize(&mut self, ctx: &LaneContext) -> Result<(), LaneError>;

    /// Releases every GPU resource the lane owns. Must be idempotent.
    fn on_shutdown(&mut self, ctx: &LaneContext);

    /// Whether `on_initialize` completed.
    fn is_initialized(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct CountingLane {
        init_calls: u32,
        ready: bool,
    }

    impl Lane for CountingLane {
        fn strategy_name(&self) -> &'static str {
            "Counting"
        }

        fn lane_kind(&self) -> LaneKind {
            LaneKind::Compute
        }

        fn on_initialize(&mut self, ctx: &LaneContext) -> Result<(), LaneError> {
            self.init_calls += 1;
            let budget = ctx.require::<Arc<u32>>()?;
            self.ready = **budget > 0;
            Ok(())
        }

        fn on_shutdown(&mut self, _ctx: &LaneContext) {
            self.ready = false;
        }

        fn is_initialized(&self) -> bool {
            self.ready
        }
    }

    #[test]
    fn test_context_lookup_by_type() {
        let mut ctx = LaneContext::new();
        ctx.insert(42u32);
        ctx.insert(String::from("hello"));
        assert_eq!(ctx.get::<u32>(), Some(&42));
        assert!(ctx.contains::<String>());
        assert!(ctx.get::<u64>().is_none());
    }

    #[test]
    fn test_missing_context_is_reported() {
        let mut lane = CountingLane {
            init_calls: 0,
            ready: false,
        };
        let ctx = LaneContext::new();
        let err = lane.on_initialize(&ctx).unwrap_err();
        assert!(matches!(err, LaneError::MissingContext { .. }));
        assert!(err.to_string().contains("u32"));
        assert!(!lane.is_initialized());
    }

    #[test]
    fn test_lifecycle() {
        let mut lane = CountingLane {
            init_calls: 0,
            ready: false,
        };
        let mut ctx = LaneContext::new();
        ctx.insert(Arc::new(3u32));
        lane.on_initialize(&ctx).unwrap();
        assert!(lane.is_initialized());
        lane.on_shutdown(&ctx);
        lane.on_shutdown(&ctx);
        assert!(!lane.is_initialized());
        assert_eq!(lane.lane_kind().to_string(), "Compute");
    }
}
