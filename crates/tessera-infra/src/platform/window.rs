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


//! A `winit`-based implementation of the `TesseraWindow` trait.

use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
use std::sync::Arc;
use tessera_core::config::WindowConfig;
use tessera_core::platform::{TesseraWindow, TesseraWindowHandle};
use winit::{dpi::LogicalSize, error::OsError, event_loop::ActiveEventLoop, window::Window};

/// A shared handle to a `winit` window.
#[derive(Debug, Clone)]
pub struct WinitWindow {
    inner: Arc<Window>,
}

/// Builds a [`WinitWindow`] from a [`WindowConfig`].
pub struct WinitWindowBuilder {
    title: String,
    width: u32,
    height: u32,
}

impl WinitWindowBuilder {
    pub fn new() -> Self {
        Self::from_config(&WindowConfig::default())
    }

    pub fn from_config(config: &WindowConfig) -> Self {
        Self {
            title: config.title.clone(),
            width: config.width,
            height: config.height,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Creates the window on the running event loop.
    ///
    /// # Errors
    /// Returns an `OsError` if `winit` fails to create the window.
    pub fn build(self, event_loop: &ActiveEventLoop) -> Result<WinitWindow, OsError> {
        log::info!(
            "Building window with title: '{}' and size: {}x{}",
            self.title,
            self.width,
            self.height
        );

        let attributes = Window::default_attributes()
            .with_title(self.title)
            .with_inner_size(LogicalSize::new(self.width, self.height))
            .with_visible(true);
        let window = event_loop.create_window(attributes)?;

        log::info!("Winit window created (id: {:?}).", window.id());
        Ok(WinitWindow {
            inner: Arc::new(window),
        })
    }
}

impl Default for WinitWindowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WinitWindow {
    pub fn id(&self) -> winit::window::WindowId {
        self.inner.id()
    }

    pub fn set_title(&self, title: &str) {
        self.inner.set_title(title);
    }
}

impl HasWindowHandle for WinitWindow {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        self.inner.window_handle()
    }
}

impl HasDisplayHandle for WinitWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        self.inner.display_handle()
    }
}

impl TesseraWindow for WinitWindow {
    fn inner_size(&self) -> (u32, u32) {
        let size = self.inner.inner_size();
        (size.width, size.height)
    }

    fn scale_factor(&self) -> f64 {
        self.inner.scale_factor()
    }

    fn request_redraw(&self) {
        self.inner.request_redraw();
    }

    fn clone_handle_arc(&self) -> TesseraWindowHandle {
        self.inner.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_follows_config() {
        let config = WindowConfig {
            title: "Preview".into(),
            width: 640,
            height: 480,
        };
        let builder = WinitWindowBuilder::from_config(&config).with_dimensions(800, 600);
        assert_eq!(builder.title, "Preview");
        assert_eq!((builder.width, builder.height), (800, 600));
    }
}
