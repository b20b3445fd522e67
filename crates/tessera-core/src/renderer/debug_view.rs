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

//! Selectable visualisations of the intermediate buffers.

/// What the composite pass shows. Selected with the digit keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum DebugView {
    /// Tonemapped and gamma corrected lighting.
    #[default]
    Final = 0,
    Albedo = 1,
    Normal = 2,
    RoughnessMetallic = 3,
    LinearDepth = 4,
    /// Raw accumulated light without tonemapping.
    Light = 5,
    LightOverlap = 6,
    CascadeIndex = 7,
    ShadowFactor = 8,
}

impl DebugView {
    pub const ALL: [DebugView; 9] = [
        DebugView::Final,
        DebugView::Albedo,
        DebugView::Normal,
        DebugView::RoughnessMetallic,
        DebugView::LinearDepth,
        DebugView::Light,
        DebugView::LightOverlap,
        DebugView::CascadeIndex,
        DebugView::ShadowFactor,
    ];

    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub const fn index(self) -> u32 {
        self as u32
    }

    /// Views written by the lighting passes rather than read from the G-buffer.
    pub const fn is_lighting_output(self) -> bool {
        matches!(
            self,
            DebugView::LightOverlap | DebugView::CascadeIndex | DebugView::ShadowFactor
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        for view in DebugView::ALL {
            assert_eq!(DebugView::from_index(view.index()), Some(view));
        }
        assert_eq!(DebugView::from_index(9), None);
    }
}
