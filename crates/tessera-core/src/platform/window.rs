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

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

/// Combines the windowing handle traits required by graphics backends so
/// they can live behind a single trait object.
pub trait WindowHandle: HasWindowHandle + HasDisplayHandle {}

impl<T: HasWindowHandle + HasDisplayHandle> WindowHandle for T {}

/// Shared, thread-safe handle used by the backend to create its surface.
pub type TesseraWindowHandle = Arc<dyn WindowHandle + Send + Sync>;

/// The behaviour the renderer needs from a window.
///
/// The renderer only ever drives one window.
pub trait TesseraWindow: HasWindowHandle + HasDisplayHandle + Send + Sync {
    /// Returns the physical dimensions (width, height) of the window's inner area.
    fn inner_size(&self) -> (u32, u32);

    /// Returns the scale factor of the window.
    fn scale_factor(&self) -> f64;

    /// Requests that the window be redrawn.
    fn request_redraw(&self);

    /// Clones an Arc'd, thread-safe handle to the window.
    fn clone_handle_arc(&self) -> TesseraWindowHandle;
}
