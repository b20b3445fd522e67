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

//! Per-frame pass list with declared resource access.
//!
//! Compute passes write through storage bindings whose results are only
//! visible to later passes after a memory barrier. The list records which
//! frame resources each pass reads and writes so the barriers can be placed
//! from data instead of by hand, and so a recorded command stream can be
//! checked against the declaration.

use std::fmt;

/// A GPU resource that crosses a pass boundary within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FrameSlot {
    SceneDepth,
    GBufferAlbedo,
    GBufferNormal,
    GBufferLinearDepth,
    LightAccumulation,
    LightBuffer,
    TileDepthRange,
    TileMeta,
    TileLightIndices,
    ShadowCascades,
    ShadowSpot,
    ShadowPoint,
    Backbuffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Render,
    Compute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassNode {
    pub name: &'static str,
    pub kind: PassKind,
    pub reads: Vec<FrameSlot>,
    pub writes: Vec<FrameSlot>,
}

impl PassNode {
    pub fn render(name: &'static str) -> Self {
        Self::new(name, PassKind::Render)
    }

    pub fn compute(name: &'static str) -> Self {
        Self::new(name, PassKind::Compute)
    }

    fn new(name: &'static str, kind: PassKind) -> Self {
        Self {
            name,
            kind,
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }

    pub fn reads(mut self, slots: &[FrameSlot]) -> Self {
        self.reads.extend_from_slice(slots);
        self
    }

    pub fn writes(mut self, slots: &[FrameSlot]) -> Self {
        self.writes.extend_from_slice(slots);
        self
    }

    fn touches(&self, slot: FrameSlot) -> bool {
        self.reads.contains(&slot) || self.writes.contains(&slot)
    }
}

/// One step of a planned frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedStep<'a> {
    Barrier,
    Pass(&'a PassNode),
}

/// One step of a recorded command stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedStep {
    Barrier,
    Pass(String),
}

/// A violation found by [`PassList::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameHazard {
    /// `pass` touched `slot` while the compute write of `writer` was not yet
    /// made visible by a barrier.
    MissingBarrier {
        pass: String,
        slot: FrameSlot,
        writer: &'static str,
    },
    /// The stream contains a pass the list does not declare.
    UnknownPass(String),
}

impl fmt::Display for FrameHazard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameHazard::MissingBarrier { pass, slot, writer } => write!(
                f,
                "Pass '{pass}' accesses {slot:?} written by compute pass '{writer}' without a barrier"
            ),
            FrameHazard::UnknownPass(name) => write!(f, "Undeclared pass '{name}' in stream"),
        }
    }
}

impl std::error::Error for FrameHazard {}

/// Ordered passes of one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassList {
    nodes: Vec<PassNode>,
}

/// Tracks compute writes not yet covered by a barrier.
#[derive(Default)]
struct PendingWrites(Vec<(FrameSlot, &'static str)>);

impl PendingWrites {
    fn conflict(&self, node: &PassNode) -> Option<(FrameSlot, &'static str)> {
        self.0.iter().copied().find(|(slot, _)| node.touches(*slot))
    }

    fn record(&mut self, node: &PassNode) {
        if node.kind == PassKind::Compute {
            self.0.extend(node.writes.iter().map(|slot| (*slot, node.name)));
        }
    }

    fn flush(&mut self) {
        self.0.clear();
    }
}

impl PassList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: PassNode) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn nodes(&self) -> &[PassNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&PassNode> {
        self.nodes.iter().find(|node| node.name == name)
    }

    /// Interleaves the passes with the barriers they need.
    ///
    /// A barrier is placed before the first pass touching a slot that a
    /// compute pass wrote since the last barrier.
    pub fn plan(&self) -> Vec<PlannedStep<'_>> {
        let mut steps = Vec::with_capacity(self.nodes.len() + 2);
        let mut pending = PendingWrites::default();
        for node in &self.nodes {
            if pending.conflict(node).is_some() {
                steps.push(PlannedStep::Barrier);
                pending.flush();
            }
            steps.push(PlannedStep::Pass(node));
            pending.record(node);
        }
        steps
    }

    /// Checks a recorded stream against the declared access sets.
    pub fn validate(&self, stream: &[RecordedStep]) -> Result<(), FrameHazard> {
        let mut pending = PendingWrites::default();
        for step in stream {
            match step {
                RecordedStep::Barrier => pending.flush(),
                RecordedStep::Pass(name) => {
                    let node = self
                        .find(name)
                        .ok_or_else(|| FrameHazard::UnknownPass(name.clone()))?;
                    if let Some((slot, writer)) = pending.conflict(node) {
                        return Err(FrameHazard::MissingBarrier {
                            pass: name.clone(),
                            slot,
                            writer,
                        });
                    }
                    pending.record(node);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use FrameSlot::*;

    fn tiled_list() -> PassList {
        let mut list = PassList::new();
        list.push(PassNode::render("depth_prepass").writes(&[SceneDepth]))
            .push(PassNode::compute("reduce").reads(&[SceneDepth]).writes(&[TileDepthRange]))
            .push(
                PassNode::compute("cull")
                    .reads(&[TileDepthRange, LightBuffer])
                    .writes(&[TileMeta, TileLightIndices]),
            )
            .push(
                PassNode::render("shade")
                    .reads(&[TileMeta, TileLightIndices, LightBuffer])
                    .writes(&[LightAccumulation]),
            );
        list
    }

    fn names(steps: &[PlannedStep<'_>]) -> Vec<&'static str> {
        steps
            .iter()
            .map(|step| match step {
                PlannedStep::Barrier => "|",
                PlannedStep::Pass(node) => node.name,
            })
            .collect()
    }

    #[test]
    fn test_plan_places_barriers_after_compute_writes() {
        let list = tiled_list();
        assert_eq!(
            names(&list.plan()),
            vec!["depth_prepass", "reduce", "|", "cull", "|", "shade"]
        );
    }

    #[test]
    fn test_render_only_list_needs_no_barrier() {
        let mut list = PassList::new();
        list.push(PassNode::render("gbuffer").writes(&[GBufferAlbedo]))
            .push(PassNode::render("composite").reads(&[GBufferAlbedo]));
        assert!(!list.plan().contains(&PlannedStep::Barrier));
    }

    #[test]
    fn test_validate_reports_missing_barrier() {
        let list = tiled_list();
        let stream = vec![
            RecordedStep::Pass("depth_prepass".into()),
            RecordedStep::Pass("reduce".into()),
            RecordedStep::Barrier,
            RecordedStep::Pass("cull".into()),
            RecordedStep::Pass("shade".into()),
        ];
        assert_eq!(
            list.validate(&stream),
            Err(FrameHazard::MissingBarrier {
                pass: "shade".into(),
                slot: TileMeta,
                writer: "cull",
            })
        );
    }

    #[test]
    fn test_validate_accepts_planned_stream() {
        let list = tiled_list();
        let stream: Vec<RecordedStep> = list
            .plan()
            .iter()
            .map(|step| match step {
                PlannedStep::Barrier => RecordedStep::Barrier,
                PlannedStep::Pass(node) => RecordedStep::Pass(node.name.to_string()),
            })
            .collect();
        assert_eq!(list.validate(&stream), Ok(()));
    }

    #[test]
    fn test_validate_rejects_unknown_pass() {
        let list = tiled_list();
        let stream = vec![RecordedStep::Pass("mystery".into())];
        assert_eq!(
            list.validate(&stream),
            Err(FrameHazard::UnknownPass("mystery".into()))
        );
    }
}
