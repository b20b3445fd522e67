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

//! Screen tiling shared by the tile culler and the tiled shading pass.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use serde::{Deserialize, Serialize};

/// Depth values within this distance of the cleared far depth (1.0) count
/// as background. Matches the `Depth32Float` zero-to-one convention.
pub const BACKGROUND_DEPTH_EPSILON: f32 = 1e-6;

/// Returns `true` when a depth sample belongs to no opaque fragment.
#[inline]
pub fn is_background_depth(depth: f32) -> bool {
    depth >= 1.0 - BACKGROUND_DEPTH_EPSILON
}

/// Edge length of a screen tile, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileSize {
    #[default]
    X16,
    X32,
}

impl TileSize {
    pub const fn pixels(self) -> u32 {
        match self {
            TileSize::X16 => 16,
            TileSize::X32 => 32,
        }
    }
}

/// Tunables of the tiled path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TiledConfig {
    pub tile_size: TileSize,
    /// Capacity of one tile's light index slot. Excess lights are dropped.
    pub max_lights_per_tile: u32,
}

impl Default for TiledConfig {
    fn default() -> Self {
        Self {
            tile_size: TileSize::X16,
            max_lights_per_tile: 128,
        }
    }
}

/// The tile partition of a framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
    pub tiles_x: u32,
    pub tiles_y: u32,
}

impl TileGrid {
    pub fn new(width: u32, height: u32, tile_size: TileSize) -> Self {
        let size = tile_size.pixels();
        Self {
            width,
            height,
            tile_size: size,
            tiles_x: width.div_ceil(size),
            tiles_y: height.div_ceil(size),
        }
    }

    pub const fn tile_count(&self) -> u32 {
        self.tiles_x * self.tiles_y
    }

    /// Linear index of tile (`x`, `y`), row major.
    pub const fn tile_index(&self, x: u32, y: u32) -> u32 {
        y * self.tiles_x + x
    }

    /// Pixel rectangle `[min, max)` of a tile, clipped to the framebuffer.
    pub fn pixel_bounds(&self, x: u32, y: u32) -> ([u32; 2], [u32; 2]) {
        let min = [x * self.tile_size, y * self.tile_size];
        let max = [
            ((x + 1) * self.tile_size).min(self.width),
            ((y + 1) * self.tile_size).min(self.height),
        ];
        (min, max)
    }

    /// Metadata with the fixed per-tile offsets and zero counts.
    pub fn initial_meta(&self, max_lights_per_tile: u32) -> Vec<TileMeta> {
        (0..self.tile_count())
            .map(|index| TileMeta {
                offset: index * max_lights_per_tile,
                count: 0,
            })
            .collect()
    }
}

/// One entry of the tile metadata buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct TileMeta {
    /// First slot in the shared index list. Fixed at allocation.
    pub offset: u32,
    /// Number of lights written by the culling pass.
    pub count: u32,
}

/// Min/max depth of one tile. `min > max` marks a tile with no geometry.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TileDepthRange {
    pub min: f32,
    pub max: f32,
}

impl TileDepthRange {
    /// The reduction identity: no valid sample seen yet.
    pub const EMPTY: Self = Self {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// Folds one depth sample in, ignoring background samples.
    pub fn include(self, depth: f32) -> Self {
        if is_background_depth(depth) {
            return self;
        }
        Self {
            min: self.min.min(depth),
            max: self.max.max(depth),
        }
    }

    /// Reduces a tile's samples the way the reduction shader does.
    pub fn from_samples(samples: impl IntoIterator<Item = f32>) -> Self {
        samples.into_iter().fold(Self::EMPTY, Self::include)
    }
}

/// Uniform block of both tile compute passes and the tiled shading pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TileCullUniforms {
    pub inverse_projection: [[f32; 4]; 4],
    pub screen_size: [u32; 2],
    pub tile_count: [u32; 2],
    pub tile_size: u32,
    pub max_lights_per_tile: u32,
    pub light_count: u32,
    pub _padding: u32,
}

impl TileCullUniforms {
    pub fn new(grid: &TileGrid, projection: Mat4, max_lights_per_tile: u32, light_count: u32) -> Self {
        Self {
            inverse_projection: projection.inverse().to_cols_array_2d(),
            screen_size: [grid.width, grid.height],
            tile_count: [grid.tiles_x, grid.tiles_y],
            tile_size: grid.tile_size,
            max_lights_per_tile,
            light_count,
            _padding: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_dimensions_round_up() {
        let grid = TileGrid::new(1280, 720, TileSize::X16);
        assert_eq!((grid.tiles_x, grid.tiles_y), (80, 45));
        assert_eq!(grid.tile_count(), 3600);

        let grid = TileGrid::new(1281, 721, TileSize::X16);
        assert_eq!((grid.tiles_x, grid.tiles_y), (81, 46));

        let grid = TileGrid::new(1280, 720, TileSize::X32);
        assert_eq!((grid.tiles_x, grid.tiles_y), (40, 23));
    }

    #[test]
    fn test_edge_tile_bounds_are_clipped() {
        let grid = TileGrid::new(100, 50, TileSize::X32);
        assert_eq!(grid.pixel_bounds(3, 1), ([96, 32], [100, 50]));
    }

    #[test]
    fn test_initial_meta_offsets() {
        let grid = TileGrid::new(64, 32, TileSize::X16);
        let meta = grid.initial_meta(128);
        assert_eq!(meta.len(), 8);
        assert_eq!(meta[5], TileMeta { offset: 640, count: 0 });
    }

    #[test]
    fn test_background_samples_give_empty_range() {
        let range = TileDepthRange::from_samples([1.0, 1.0, 1.0 - 1e-7]);
        assert!(range.is_empty());

        let range = TileDepthRange::from_samples([1.0, 0.25, 0.75]);
        assert!(!range.is_empty());
        assert_eq!(range, TileDepthRange { min: 0.25, max: 0.75 });
    }

    #[test]
    fn test_uniform_layout_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<TileCullUniforms>(), 96);
    }
}
