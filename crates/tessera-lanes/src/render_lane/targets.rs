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

//! Screen-sized G-buffer, depth and light accumulation targets.

use tessera_core::lane::LaneError;
use tessera_core::renderer::{
    BindGroupDescriptor, BindGroupEntry, BindGroupId, BindGroupLayoutId, Extent3D,
    GraphicsDevice, RenderError, ResourceError, TextureDescriptor, TextureFormat, TextureId,
    TextureViewDescriptor, TextureViewId,
};

/// One of the screen-sized targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// Albedo in rgb, metallic in a.
    Albedo,
    /// View-space normal in rgb, roughness in a.
    Normal,
    /// Positive view-space depth, 0 where nothing was drawn.
    LinearDepth,
    /// Hardware depth buffer.
    Depth,
    /// Additive light accumulation.
    Light,
}

impl Target {
    pub const ALL: [Target; 5] = [
        Target::Albedo,
        Target::Normal,
        Target::LinearDepth,
        Target::Depth,
        Target::Light,
    ];

    /// The only target a forward pass straight to the backbuffer needs.
    pub const DEPTH_ONLY: [Target; 1] = [Target::Depth];

    pub const fn format(self) -> TextureFormat {
        match self {
            Target::Albedo => TextureFormat::Rgba8Unorm,
            Target::Normal | Target::Light => TextureFormat::Rgba16Float,
            Target::LinearDepth => TextureFormat::R32Float,
            Target::Depth => TextureFormat::Depth32Float,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Target::Albedo => "gbuffer albedo",
            Target::Normal => "gbuffer normal",
            Target::LinearDepth => "gbuffer linear depth",
            Target::Depth => "scene depth",
            Target::Light => "light accumulation",
        }
    }

    const fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy)]
struct Allocated {
    texture: TextureId,
    view: TextureViewId,
}

/// Owns the screen-sized targets and reallocates them on resize.
#[derive(Debug)]
pub struct RenderTargets {
    set: &'static [Target],
    width: u32,
    height: u32,
    generation: u64,
    allocated: Option<[Option<Allocated>; 5]>,
}

impl Default for RenderTargets {
    fn default() -> Self {
        Self::with_targets(&Target::ALL)
    }
}

impl RenderTargets {
    /// Every target, as the deferred and tiled paths use them.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only `set` is allocated; the other targets have no view.
    pub fn with_targets(set: &'static [Target]) -> Self {
        Self {
            set,
            width: 0,
            height: 0,
            generation: 0,
            allocated: None,
        }
    }

    /// Makes sure every allocated target matches `width` x `height`.
    ///
    /// Returns `true` when the targets were (re)allocated. Zero sizes are
    /// ignored and a call with the current size does nothing, so handles stay
    /// valid across repeated calls.
    pub fn ensure(
        &mut self,
        device: &dyn GraphicsDevice,
        width: u32,
        height: u32,
    ) -> Result<bool, ResourceError> {
        if width == 0 || height == 0 {
            log::debug!("RenderTargets: ignoring zero-sized request {width}x{height}");
            return Ok(false);
        }
        if self.allocated.is_some() && self.width == width && self.height == height {
            return Ok(false);
        }

        self.release(device);
        let mut created: [Option<Allocated>; 5] = [None; 5];
        for &target in self.set {
            match Self::create_target(device, target, width, height) {
                Ok(allocated) => created[target.slot()] = Some(allocated),
                Err(err) => {
                    for allocated in created.into_iter().flatten() {
                        Self::destroy(device, allocated);
                    }
                    return Err(err);
                }
            }
        }

        self.allocated = Some(created);
        self.width = width;
        self.height = height;
        self.generation += 1;
        log::debug!(
            "RenderTargets: allocated {width}x{height} (generation {})",
            self.generation
        );
        Ok(true)
    }

    fn create_target(
        device: &dyn GraphicsDevice,
        target: Target,
        width: u32,
        height: u32,
    ) -> Result<Allocated, ResourceError> {
        let texture = device.create_texture(&TextureDescriptor::render_target(
            target.label(),
            Extent3D::flat(width, height),
            target.format(),
        ))?;
        match device.create_texture_view(texture, &TextureViewDescriptor::default()) {
            Ok(view) => Ok(Allocated { texture, view }),
            Err(err) => {
                let _ = device.destroy_texture(texture);
                Err(err)
            }
        }
    }

    fn destroy(device: &dyn GraphicsDevice, allocated: Allocated) {
        let _ = device.destroy_texture_view(allocated.view);
        let _ = device.destroy_texture(allocated.texture);
    }

    pub fn view(&self, target: Target) -> Option<TextureViewId> {
        self.allocated
            .and_then(|all| all[target.slot()])
            .map(|allocated| allocated.view)
    }

    pub fn texture(&self, target: Target) -> Option<TextureId> {
        self.allocated
            .and_then(|all| all[target.slot()])
            .map(|allocated| allocated.texture)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Bumped on every reallocation; bind groups over the targets are
    /// rebuilt when it changes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_allocated(&self) -> bool {
        self.allocated.is_some()
    }

    /// Checks that `attachments` are allocated and that each has the format
    /// the pass's pipeline writes.
    pub fn validate(
        &self,
        pass: &str,
        attachments: &[(Target, TextureFormat)],
    ) -> Result<(), RenderError> {
        if self.allocated.is_none() {
            return Err(RenderError::IncompleteAttachments(format!(
                "'{pass}': targets not allocated"
            )));
        }
        if let Some((target, _)) = attachments
            .iter()
            .find(|(target, _)| self.view(*target).is_none())
        {
            return Err(RenderError::IncompleteAttachments(format!(
                "'{pass}': {} is not part of this target set",
                target.label()
            )));
        }
        if let Some((target, format)) = attachments
            .iter()
            .find(|(target, format)| target.format() != *format)
        {
            return Err(RenderError::IncompleteAttachments(format!(
                "'{pass}': {} is {:?}, pipeline writes {format:?}",
                target.label(),
                target.format()
            )));
        }
        Ok(())
    }

    /// Logs an invalid attachment set as an error and carries on.
    pub fn log_if_incomplete(&self, pass: &str, attachments: &[(Target, TextureFormat)]) {
        if let Err(err) = self.validate(pass, attachments) {
            log::error!("RenderTargets: {err}");
        }
    }

    pub fn release(&mut self, device: &dyn GraphicsDevice) {
        if let Some(all) = self.allocated.take() {
            for allocated in all.into_iter().flatten() {
                Self::destroy(device, allocated);
            }
        }
    }
}

/// A bind group over some of the targets, rebuilt whenever the targets
/// are reallocated.
#[derive(Debug, Default)]
pub struct TargetBinding {
    group: Option<BindGroupId>,
    generation: u64,
}

impl TargetBinding {
    /// Returns the bind group of `inputs` (bound in order from binding 0),
    /// creating it again if `targets` changed since the last call.
    pub fn refresh(
        &mut self,
        device: &dyn GraphicsDevice,
        layout: BindGroupLayoutId,
        label: &str,
        targets: &RenderTargets,
        inputs: &[Target],
    ) -> Result<BindGroupId, LaneError> {
        if let Some(group) = self.group {
            if self.generation == targets.generation() {
                return Ok(group);
            }
        }
        let entries = inputs
            .iter()
            .enumerate()
            .map(|(binding, target)| {
                targets
                    .view(*target)
                    .map(|view| BindGroupEntry::texture(binding as u32, view))
                    .ok_or(LaneError::NotInitialized)
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.release(device);
        let group = device
            .create_bind_group(&BindGroupDescriptor {
                label: Some(label),
                layout,
                entries: &entries,
            })
            .map_err(LaneError::execution)?;
        self.group = Some(group);
        self.generation = targets.generation();
        Ok(group)
    }

    pub fn get(&self) -> Option<BindGroupId> {
        self.group
    }

    pub fn release(&mut self, device: &dyn GraphicsDevice) {
        if let Some(group) = self.group.take() {
            let _ = device.destroy_bind_group(group);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::renderer::testing::RecordingDevice;

    #[test]
    fn test_same_size_keeps_handles() {
        let device = RecordingDevice::default();
        let mut targets = RenderTargets::new();
        assert!(targets.ensure(&device, 1280, 720).unwrap());
        let views: Vec<_> = Target::ALL.iter().map(|t| targets.view(*t)).collect();
        let allocations = device.texture_allocations();

        assert!(!targets.ensure(&device, 1280, 720).unwrap());
        let again: Vec<_> = Target::ALL.iter().map(|t| targets.view(*t)).collect();
        assert_eq!(views, again);
        assert_eq!(device.texture_allocations(), allocations);
        assert_eq!(targets.generation(), 1);
    }

    #[test]
    fn test_resize_recreates_every_target() {
        let device = RecordingDevice::default();
        let mut targets = RenderTargets::new();
        targets.ensure(&device, 1280, 720).unwrap();
        let old = targets.texture(Target::Light).unwrap();

        assert!(targets.ensure(&device, 800, 600).unwrap());
        assert!(device.texture(old).is_none());
        for target in Target::ALL {
            let record = device.texture(targets.texture(target).unwrap()).unwrap();
            assert_eq!(record.size, Extent3D::flat(800, 600));
            assert_eq!(record.format, target.format());
        }
        assert_eq!(device.live_texture_count(), 5);
        assert_eq!(targets.generation(), 2);
    }

    #[test]
    fn test_zero_size_is_ignored() {
        let device = RecordingDevice::default();
        let mut targets = RenderTargets::new();
        targets.ensure(&device, 640, 480).unwrap();
        assert!(!targets.ensure(&device, 0, 480).unwrap());
        assert_eq!(targets.size(), (640, 480));
    }

    #[test]
    fn test_validate_reports_format_mismatch() {
        let device = RecordingDevice::default();
        let mut targets = RenderTargets::new();
        assert!(targets.validate("gbuffer", &[]).is_err());
        targets.ensure(&device, 64, 64).unwrap();
        assert!(targets
            .validate("gbuffer", &[(Target::Albedo, TextureFormat::Rgba8Unorm)])
            .is_ok());
        assert!(matches!(
            targets.validate("gbuffer", &[(Target::Normal, TextureFormat::Rgba8Unorm)]),
            Err(RenderError::IncompleteAttachments(_))
        ));
    }

    #[test]
    fn test_release_frees_everything() {
        let device = RecordingDevice::default();
        let mut targets = RenderTargets::new();
        targets.ensure(&device, 64, 64).unwrap();
        targets.release(&device);
        assert_eq!(device.live_resource_count(), 0);
        assert!(targets.view(Target::Depth).is_none());
    }

    #[test]
    fn test_depth_only_set_allocates_depth() {
        let device = RecordingDevice::default();
        let mut targets = RenderTargets::with_targets(&Target::DEPTH_ONLY);
        assert!(targets.ensure(&device, 320, 200).unwrap());
        assert_eq!(device.live_texture_count(), 1);
        let depth = device.texture(targets.texture(Target::Depth).unwrap()).unwrap();
        assert_eq!(depth.format, TextureFormat::Depth32Float);
        assert!(targets.view(Target::Albedo).is_none());
        assert!(targets.view(Target::Light).is_none());
        assert!(targets
            .validate("forward", &[(Target::Depth, TextureFormat::Depth32Float)])
            .is_ok());
        assert!(matches!(
            targets.validate("gbuffer", &[(Target::Albedo, TextureFormat::Rgba8Unorm)]),
            Err(RenderError::IncompleteAttachments(_))
        ));

        assert!(targets.ensure(&device, 640, 400).unwrap());
        assert_eq!(device.live_texture_count(), 1);
        targets.release(&device);
        assert_eq!(device.live_resource_count(), 0);
    }
}
