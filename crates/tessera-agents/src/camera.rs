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


//! The isometric orthographic camera.

use tessera_core::math::{degrees_to_radians, Mat4, Vec2, Vec3};

pub const MIN_ZOOM: f32 = 0.2;
pub const MAX_ZOOM: f32 = 5.0;
/// Zoom factor applied per wheel notch towards the viewer.
pub const ZOOM_IN_STEP: f32 = 0.9;
/// Zoom factor applied per wheel notch away from the viewer.
pub const ZOOM_OUT_STEP: f32 = 1.1;
/// World units panned per pixel of drag at zoom 1.
pub const PAN_SPEED: f32 = 0.01;
pub const NEAR_PLANE: f32 = 1.0;
pub const FAR_PLANE: f32 = 100.0;

/// Half the vertical extent of the view at zoom 1.
const HALF_EXTENT: f32 = 10.0;
const EYE_DISTANCE: f32 = 15.0;
/// `atan(1 / sqrt(2))`, the tilt of a true isometric projection.
const TILT_DEGREES: f32 = 35.264;
const YAW_DEGREES: f32 = 45.0;

/// Orthographic camera with fixed isometric angles, a zoom and a pan offset.
///
/// The matrices are cached; mutators only mark them stale when they actually
/// change a parameter and [`refresh`](Self::refresh) rebuilds them.
#[derive(Debug, Clone)]
pub struct IsoCamera {
    zoom: f32,
    pan: Vec2,
    width: u32,
    height: u32,
    view: Mat4,
    projection: Mat4,
    dirty: bool,
}

impl IsoCamera {
    pub fn new(width: u32, height: u32) -> Self {
        let mut camera = Self {
            zoom: 1.0,
            pan: Vec2::ZERO,
            width,
            height,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            dirty: true,
        };
        camera.refresh();
        camera
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan(&self) -> Vec2 {
        self.pan
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn near(&self) -> f32 {
        NEAR_PLANE
    }

    pub fn far(&self) -> f32 {
        FAR_PLANE
    }

    /// Multiplies the zoom by `factor`, clamped to `[MIN_ZOOM, MAX_ZOOM]`.
    ///
    /// Returns `true` when the zoom changed.
    pub fn apply_zoom(&mut self, factor: f32) -> bool {
        let zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.set_if_changed(|camera| &mut camera.zoom, zoom)
    }

    pub fn zoom_in(&mut self) -> bool {
        self.apply_zoom(ZOOM_IN_STEP)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.apply_zoom(ZOOM_OUT_STEP)
    }

    /// Pans by a drag of `dx` x `dy` pixels. Dragging right moves the scene
    /// right, so the camera moves left.
    pub fn drag(&mut self, dx: f32, dy: f32) -> bool {
        if dx == 0.0 && dy == 0.0 {
            return false;
        }
        let scale = PAN_SPEED / self.zoom;
        self.pan.x -= dx * scale;
        self.pan.y += dy * scale;
        self.dirty = true;
        true
    }

    /// Returns `true` when the size changed.
    pub fn set_viewport(&mut self, width: u32, height: u32) -> bool {
        if (self.width, self.height) == (width, height) {
            return false;
        }
        self.width = width;
        self.height = height;
        self.dirty = true;
        true
    }

    /// Rebuilds the matrices if a parameter changed since the last call.
    pub fn refresh(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        let half = HALF_EXTENT / self.zoom;
        let aspect = self.aspect();
        self.projection = Mat4::orthographic_rh(
            -half * aspect,
            half * aspect,
            -half,
            half,
            NEAR_PLANE,
            FAR_PLANE,
        );
        self.view = Mat4::from_translation(Vec3::new(-self.pan.x, -self.pan.y, -EYE_DISTANCE))
            * Mat4::from_rotation_x(degrees_to_radians(TILT_DEGREES))
            * Mat4::from_rotation_y(degrees_to_radians(YAW_DEGREES));
        self.dirty = false;
        true
    }

    fn set_if_changed(&mut self, field: impl FnOnce(&mut Self) -> &mut f32, value: f32) -> bool {
        let slot = field(self);
        if *slot == value {
            return false;
        }
        *slot = value;
        self.dirty = true;
        true
    }
}
