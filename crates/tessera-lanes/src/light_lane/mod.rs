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

//! Dynamic lights: the authored population, per-frame packing and the
//! deferred lighting passes.

pub mod buffer;
pub mod directional_light_lane;
pub mod light_volume_lane;
pub mod packer;
pub mod registry;

pub use buffer::LightBuffer;
pub use directional_light_lane::{DirectionalLightLane, DIRECTIONAL_LIGHT_PASS};
pub use light_volume_lane::{LightVolumeRenderer, LIGHT_VOLUMES_PASS};
pub use packer::{LightPacker, PackedLights};
pub use registry::{AnimatedLight, LightRegistry};
