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


//! Tile-based light culling and the shading pass that consumes it.

pub mod culler;
pub mod reference;
pub mod tiled_shading_lane;

pub use culler::{cull_dispatch, TileCuller, TILE_DEPTH_REDUCE_PASS, TILE_LIGHT_CULL_PASS};
pub use reference::cull_tile_cpu;
pub use tiled_shading_lane::{TiledShadingLane, TILED_SHADING_PASS, TILED_SHADING_TARGETS};
