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


//! Pass declarations of each render path and the recorder that turns a
//! declared list into encoder calls with barriers in between.

use tessera_core::lane::LaneError;
use tessera_core::renderer::{
    BarrierScope, CommandEncoder, FrameHazard, FrameSlot, PassList, PassNode, PlannedStep,
};
use tessera_lanes::light_lane::{DIRECTIONAL_LIGHT_PASS, LIGHT_VOLUMES_PASS};
use tessera_lanes::render_lane::{COMPOSITE_PASS, DEPTH_PREPASS_PASS, FORWARD_PASS, GBUFFER_PASS};
use tessera_lanes::shadow_lane::{
    ShadowPasses, SHADOW_DIRECTIONAL_PASS, SHADOW_POINT_PASS, SHADOW_SPOT_PASS,
};
use tessera_lanes::tiled_lane::{TILED_SHADING_PASS, TILE_DEPTH_REDUCE_PASS, TILE_LIGHT_CULL_PASS};

use super::error::AgentError;
use FrameSlot::*;

const GBUFFER: [FrameSlot; 3] = [GBufferAlbedo, GBufferNormal, GBufferLinearDepth];
const SHADOW_MAPS: [FrameSlot; 3] = [ShadowCascades, ShadowSpot, ShadowPoint];

/// Shadow passes of the classes that render this frame, in class order.
fn push_shadow_passes(list: &mut PassList, shadows: ShadowPasses) {
    if shadows.directional {
        list.push(PassNode::render(SHADOW_DIRECTIONAL_PASS).writes(&[ShadowCascades]));
    }
    if shadows.spot {
        list.push(PassNode::render(SHADOW_SPOT_PASS).writes(&[ShadowSpot]));
    }
    if shadows.point {
        list.push(PassNode::render(SHADOW_POINT_PASS).writes(&[ShadowPoint]));
    }
}

fn composite_pass() -> PassNode {
    PassNode::render(COMPOSITE_PASS)
        .reads(&[LightAccumulation])
        .reads(&GBUFFER)
        .writes(&[Backbuffer])
}

pub fn simple_forward_passes() -> PassList {
    let mut list = PassList::new();
    list.push(PassNode::render(FORWARD_PASS).writes(&[SceneDepth, Backbuffer]));
    list
}

pub fn deferred_passes(shadows: ShadowPasses) -> PassList {
    let mut list = PassList::new();
    list.push(PassNode::render(GBUFFER_PASS).writes(&GBUFFER).writes(&[SceneDepth]));
    push_shadow_passes(&mut list, shadows);
    list.push(
        PassNode::render(DIRECTIONAL_LIGHT_PASS)
            .reads(&GBUFFER)
            .reads(&[ShadowCascades])
            .writes(&[LightAccumulation]),
    )
    .push(
        PassNode::render(LIGHT_VOLUMES_PASS)
            .reads(&GBUFFER)
            .reads(&[SceneDepth, LightBuffer])
            .reads(&SHADOW_MAPS)
            .writes(&[LightAccumulation]),
    )
    .push(composite_pass());
    list
}

pub fn tiled_passes(shadows: ShadowPasses) -> PassList {
    let mut list = PassList::new();
    list.push(PassNode::render(DEPTH_PREPASS_PASS).writes(&[SceneDepth]));
    push_shadow_passes(&mut list, shadows);
    list.push(
        PassNode::compute(TILE_DEPTH_REDUCE_PASS)
            .reads(&[SceneDepth])
            .writes(&[TileDepthRange]),
    )
    .push(
        PassNode::compute(TILE_LIGHT_CULL_PASS)
            .reads(&[TileDepthRange, LightBuffer])
            .writes(&[TileMeta, TileLightIndices]),
    )
    .push(
        PassNode::render(TILED_SHADING_PASS)
            .reads(&[TileMeta, TileLightIndices, LightBuffer, SceneDepth])
            .reads(&SHADOW_MAPS)
            .writes(&[LightAccumulation])
            .writes(&GBUFFER),
    )
    .push(composite_pass());
    list
}

/// Records `list` in order, issuing a memory barrier wherever the plan
/// places one.
pub fn record_passes(
    list: &PassList,
    encoder: &mut dyn CommandEncoder,
    mut encode: impl FnMut(&'static str, &mut dyn CommandEncoder) -> Result<(), LaneError>,
) -> Result<(), AgentError> {
    for step in list.plan() {
        match step {
            PlannedStep::Barrier => encoder.memory_barrier(BarrierScope::StorageBuffers),
            PlannedStep::Pass(node) => {
                encode(node.name, &mut *encoder).map_err(|source| AgentError::Pass {
                    pass: node.name,
                    source,
                })?
            }
        }
    }
    Ok(())
}

/// The error a strategy reports for a pass name it does not encode.
pub fn unknown_pass(pass: &str) -> LaneError {
    LaneError::execution(FrameHazard::UnknownPass(pass.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_SHADOWS: ShadowPasses = ShadowPasses {
        directional: true,
        spot: true,
        point: true,
    };

    fn plan_names(list: &PassList) -> Vec<&'static str> {
        list.plan()
            .into_iter()
            .map(|step| match step {
                PlannedStep::Barrier => "|",
                PlannedStep::Pass(node) => node.name,
            })
            .collect()
    }

    #[test]
    fn test_tiled_plan_places_both_barriers() {
        assert_eq!(
            plan_names(&tiled_passes(ALL_SHADOWS)),
            [
                DEPTH_PREPASS_PASS,
                SHADOW_DIRECTIONAL_PASS,
                SHADOW_SPOT_PASS,
                SHADOW_POINT_PASS,
                TILE_DEPTH_REDUCE_PASS,
                "|",
                TILE_LIGHT_CULL_PASS,
                "|",
                TILED_SHADING_PASS,
                COMPOSITE_PASS,
            ]
        );
    }

    #[test]
    fn test_deferred_plan_has_no_barrier() {
        assert_eq!(
            plan_names(&deferred_passes(ALL_SHADOWS)),
            [
                GBUFFER_PASS,
                SHADOW_DIRECTIONAL_PASS,
                SHADOW_SPOT_PASS,
                SHADOW_POINT_PASS,
                DIRECTIONAL_LIGHT_PASS,
                LIGHT_VOLUMES_PASS,
                COMPOSITE_PASS,
            ]
        );
    }

    #[test]
    fn test_idle_shadow_classes_are_omitted() {
        let only_spot = ShadowPasses {
            spot: true,
            ..ShadowPasses::default()
        };
        let list = tiled_passes(only_spot);
        assert!(list.find(SHADOW_SPOT_PASS).is_some());
        assert!(list.find(SHADOW_DIRECTIONAL_PASS).is_none());
        assert!(list.find(SHADOW_POINT_PASS).is_none());
        assert_eq!(simple_forward_passes().len(), 1);
    }

    #[test]
    fn test_recorder_stops_at_first_failing_pass() {
        use tessera_core::renderer::testing::RecordingDevice;
        use tessera_core::renderer::GraphicsDevice;

        let device = RecordingDevice::default();
        let mut encoder = device.create_command_encoder(None);
        let mut visited = Vec::new();
        let err = record_passes(&tiled_passes(ShadowPasses::default()), encoder.as_mut(), |name, _| {
            visited.push(name);
            if name == TILE_LIGHT_CULL_PASS {
                Err(LaneError::NotInitialized)
            } else {
                Ok(())
            }
        })
        .unwrap_err();
        assert!(matches!(err, AgentError::Pass { pass: TILE_LIGHT_CULL_PASS, .. }));
        assert_eq!(visited, [DEPTH_PREPASS_PASS, TILE_DEPTH_REDUCE_PASS, TILE_LIGHT_CULL_PASS]);
        // The barrier before the failing pass was still issued.
        assert_eq!(
            device.pass_stream(),
            vec![tessera_core::renderer::frame_graph::RecordedStep::Barrier]
        );
    }
}
