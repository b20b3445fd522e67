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

//! Descriptors and types for render and compute passes.

use super::resource::TextureViewId;
use crate::math::LinearRgba;

/// Describes the operation to perform on an attachment at the start of a render pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LoadOp<V> {
    /// The existing contents of the attachment will be loaded into the pass.
    Load,
    /// The attachment will be cleared to the specified value before the pass begins.
    Clear(V),
}

/// Describes the operation to perform on an attachment at the end of a render pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreOp {
    Store,
    Discard,
}

/// Defines the load and store operations for a single render pass attachment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Operations<V> {
    pub load: LoadOp<V>,
    pub store: StoreOp,
}

impl<V> Operations<V> {
    pub const fn clear(value: V) -> Self {
        Self {
            load: LoadOp::Clear(value),
            store: StoreOp::Store,
        }
    }

    pub const fn load() -> Self {
        Self {
            load: LoadOp::Load,
            store: StoreOp::Store,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RenderPassColorAttachment {
    pub view: TextureViewId,
    pub ops: Operations<LinearRgba>,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderPassDepthStencilAttachment {
    pub view: TextureViewId,
    pub depth_ops: Option<Operations<f32>>,
}

/// A descriptor for a render pass.
#[derive(Debug, Default)]
pub struct RenderPassDescriptor<'a> {
    pub label: Option<&'a str>,
    pub color_attachments: &'a [RenderPassColorAttachment],
    pub depth_stencil_attachment: Option<RenderPassDepthStencilAttachment>,
}

/// A descriptor for a compute pass.
#[derive(Debug, Default)]
pub struct ComputePassDescriptor<'a> {
    pub label: Option<&'a str>,
}

/// What a memory barrier has to make visible to later passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarrierScope {
    /// Storage-buffer writes from compute shaders.
    StorageBuffers,
    /// Storage-buffer and image writes.
    All,
}
