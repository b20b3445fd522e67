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

//! GPU storage of the packed light array.

use tessera_core::renderer::{
    BufferDescriptor, BufferId, BufferUsage, GpuLight, GraphicsDevice, ResourceError,
};

/// The storage buffer the lighting passes read lights from.
///
/// The buffer is reallocated only when the packed byte size changes;
/// otherwise the contents are rewritten in place. An empty light list still
/// keeps one element so the buffer can always be bound.
#[derive(Debug, Default)]
pub struct LightBuffer {
    buffer: Option<BufferId>,
    size: u64,
    generation: u64,
}

impl LightBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload(
        &mut self,
        device: &dyn GraphicsDevice,
        lights: &[GpuLight],
    ) -> Result<(), ResourceError> {
        let placeholder = [GpuLight::default()];
        let lights = if lights.is_empty() { &placeholder[..] } else { lights };
        let bytes: &[u8] = bytemuck::cast_slice(lights);
        let size = bytes.len() as u64;

        let buffer = match self.buffer {
            Some(buffer) if self.size == size => buffer,
            previous => {
                if let Some(old) = previous {
                    device.destroy_buffer(old)?;
                }
                self.buffer = None;
                let buffer = device.create_buffer(&BufferDescriptor::writable(
                    "packed lights",
                    size,
                    BufferUsage::STORAGE,
                ))?;
                log::debug!(
                    "LightBuffer: allocated {} bytes for {} lights",
                    size,
                    lights.len()
                );
                self.buffer = Some(buffer);
                self.size = size;
                self.generation += 1;
                buffer
            }
        };
        device.write_buffer(buffer, 0, bytes)
    }

    pub fn buffer(&self) -> Option<BufferId> {
        self.buffer
    }

    /// Bumped on every reallocation; bind groups built against an older
    /// generation must be rebuilt.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn release(&mut self, device: &dyn GraphicsDevice) {
        if let Some(buffer) = self.buffer.take() {
            let _ = device.destroy_buffer(buffer);
        }
        self.size = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::renderer::testing::RecordingDevice;

    #[test]
    fn test_same_size_rewrites_in_place() {
        let device = RecordingDevice::default();
        let mut buffer = LightBuffer::new();
        let mut lights = vec![GpuLight::default(); 40];

        buffer.upload(&device, &lights).unwrap();
        let first = buffer.buffer();
        assert_eq!(buffer.size(), 40 * 80);

        lights[3].position_radius = [1.0, 2.0, 3.0, 4.0];
        buffer.upload(&device, &lights).unwrap();
        assert_eq!(buffer.buffer(), first);
        assert_eq!(buffer.generation(), 1);
        assert_eq!(device.buffer_allocations(), 1);

        let record = device.buffer(first.unwrap()).unwrap();
        let stride = std::mem::size_of::<GpuLight>();
        let stored: GpuLight = bytemuck::pod_read_unaligned(&record.data[3 * stride..4 * stride]);
        assert_eq!(stored.position_radius, [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_size_change_reallocates() {
        let device = RecordingDevice::default();
        let mut buffer = LightBuffer::new();
        buffer.upload(&device, &vec![GpuLight::default(); 40]).unwrap();
        let first = buffer.buffer();

        buffer.upload(&device, &vec![GpuLight::default(); 8]).unwrap();
        assert_ne!(buffer.buffer(), first);
        assert_eq!(buffer.generation(), 2);
        assert_eq!(device.live_buffer_count(), 1);
    }

    #[test]
    fn test_empty_list_keeps_one_element() {
        let device = RecordingDevice::default();
        let mut buffer = LightBuffer::new();
        buffer.upload(&device, &[]).unwrap();
        assert_eq!(buffer.size(), 80);

        buffer.release(&device);
        assert_eq!(device.live_buffer_count(), 0);
        assert!(buffer.buffer().is_none());
    }
}
