// Geometry output types — the contract between the interpreter and a
// renderer.
//
// The interpreter emits `CylinderSegment`s in drawing order through a
// `CylinderSink` (a renderer turns each into a tapered mesh) and returns
// the accumulated `LeafRecord`s as a collection the caller owns. Both are
// plain value types; nothing here touches a graphics API.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// One tapered branch segment, in drawing order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CylinderSegment {
    pub start: Vec3,
    pub end: Vec3,
    pub base_radius: f32,
    pub top_radius: f32,
}

/// One leaf placement: jittered position, orientation frame, and a scale
/// factor derived from the local branch thickness.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeafRecord {
    pub position: Vec3,
    pub up: Vec3,
    pub right: Vec3,
    pub scale: f32,
}

/// A complete generated tree — the immutable result of one generation run,
/// handed off to a renderer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeModel {
    pub segments: Vec<CylinderSegment>,
    pub leaves: Vec<LeafRecord>,
}

/// Receiver for cylinder draw requests. Renderers implement this to
/// consume segments as they are emitted; `Vec<CylinderSegment>` is the
/// buffering implementation used by `generate_tree`.
pub trait CylinderSink {
    fn draw_cylinder(&mut self, segment: CylinderSegment);
}

impl CylinderSink for Vec<CylinderSegment> {
    fn draw_cylinder(&mut self, segment: CylinderSegment) {
        self.push(segment);
    }
}
