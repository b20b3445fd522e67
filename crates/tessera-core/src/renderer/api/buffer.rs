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

use super::flags::BufferUsage;
use std::borrow::Cow;

/// Describes a GPU buffer.
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    /// A debug label for the buffer.
    pub label: Option<Cow<'a, str>>,
    /// Size in bytes.
    pub size: u64,
    pub usage: BufferUsage,
    pub mapped_at_creation: bool,
}

impl<'a> BufferDescriptor<'a> {
    /// A buffer that is written from the CPU with `write_buffer`.
    pub fn writable(label: &'a str, size: u64, usage: BufferUsage) -> Self {
        Self {
            label: Some(Cow::Borrowed(label)),
            size,
            usage: usage | BufferUsage::COPY_DST,
            mapped_at_creation: false,
        }
    }
}

/// Specifies the data type of indices in an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}
