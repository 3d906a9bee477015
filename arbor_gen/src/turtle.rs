// Turtle interpreter — walks a generated L-system string and emits
// geometry.
//
// The turtle carries an orthonormal frame (position, heading, up, right),
// a stack of saved frames for branching, and a lockstep stack of branch
// radii for tapering. Each `F` emits one tapered cylinder through the
// caller's `CylinderSink`, thins the current radius, records a leaf at the
// new tip, and bends the heading toward the configured tropism vector.
// `[` either pushes state or — with a probability that steps up as the
// scan cursor advances into the string — deletes the whole bracketed
// sub-branch. The frame is re-orthonormalized after every command so
// accumulated rotation error cannot skew the axes.
//
// All randomness is drawn from a generator seeded from the quantized tip
// position (`seed.rs`), so interpreting the same string with the same
// configuration always yields the same tree.
//
// Malformed input degrades, never panics: an unmatched `]` is a logged
// no-op, a zero-length segment emits nothing, a degenerate rotation axis
// falls back to an arbitrary perpendicular, and unknown characters are
// skipped.
//
// See also: `grammar.rs` for the producer of the interpreted string,
// `config.rs` for `TurtleConfig`, `types.rs` for the output records.

use arbor_prng::ArborRng;
use glam::{Quat, Vec3};
use smallvec::SmallVec;
use tracing::warn;

use crate::config::TurtleConfig;
use crate::error::ArborError;
use crate::seed;
use crate::token::{Command, Token, TokenKind, tokenize};
use crate::types::{CylinderSegment, CylinderSink, LeafRecord};

/// Axis cross products smaller than this are treated as degenerate.
const DEGENERATE_AXIS_SQ: f32 = 1.0e-12;

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// The turtle's orientation frame: a position plus three mutually
/// orthogonal unit axes. Copied wholesale onto the branch stack — frames
/// are values, never shared.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TurtleFrame {
    pub position: Vec3,
    /// Growth direction.
    pub heading: Vec3,
    pub up: Vec3,
    pub right: Vec3,
}

impl TurtleFrame {
    /// The root frame: origin, heading along world up, right-handed.
    pub fn root() -> Self {
        Self {
            position: Vec3::ZERO,
            heading: Vec3::Y,
            up: Vec3::Z,
            right: Vec3::X,
        }
    }

    /// Re-derive an exactly orthonormal frame from the current axes:
    /// `right = heading × up`, `up = right × heading`. A degenerate
    /// heading/up pair falls back to an arbitrary perpendicular.
    fn orthonormalize(&mut self) {
        self.heading = self.heading.normalize();
        let right = self.heading.cross(self.up);
        self.right = if right.length_squared() > DEGENERATE_AXIS_SQ {
            right.normalize()
        } else {
            self.heading.any_orthonormal_vector()
        };
        self.up = self.right.cross(self.heading).normalize();
    }
}

/// Rotate two frame axes about the third.
fn rotate_pair(a: &mut Vec3, b: &mut Vec3, axis: Vec3, radians: f32) {
    let rot = Quat::from_axis_angle(axis, radians);
    *a = rot * *a;
    *b = rot * *b;
}

// ---------------------------------------------------------------------------
// Turtle
// ---------------------------------------------------------------------------

/// Stack-based interpreter for generated command strings.
pub struct Turtle {
    config: TurtleConfig,
    frame: TurtleFrame,
    frame_stack: SmallVec<[TurtleFrame; 8]>,
    /// Branch radii, in lockstep with `frame_stack` plus one root entry —
    /// never empty.
    radius_stack: SmallVec<[f32; 8]>,
    /// Generator for the current tip, re-seeded whenever the quantized
    /// tip position changes.
    tip_rng: ArborRng,
    tip_key: (i32, i32, i32),
}

impl Turtle {
    pub fn new(config: TurtleConfig) -> Self {
        let frame = TurtleFrame::root();
        let tip_key = seed::quantized_key(frame.position);
        let initial_radius = config.initial_radius;
        Self {
            config,
            frame,
            frame_stack: SmallVec::new(),
            radius_stack: SmallVec::from_slice(&[initial_radius]),
            tip_rng: ArborRng::new(seed::seed_from_key(tip_key)),
            tip_key,
        }
    }

    /// Interpret a command string, emitting cylinders into `sink` and
    /// returning the recorded leaves.
    ///
    /// State is reset at entry, so a `Turtle` may be reused across
    /// strings. The only error source is a malformed parenthesized
    /// argument; structural problems in the string are survivable and
    /// handled inline.
    pub fn interpret<S: CylinderSink>(
        &mut self,
        input: &str,
        sink: &mut S,
    ) -> Result<Vec<LeafRecord>, ArborError> {
        self.reset();
        let tokens = tokenize(input)?;
        let mut leaves = Vec::new();

        let increment = self.config.angle_increment_deg.to_radians();
        let mut i = 0;
        while i < tokens.len() {
            let token = tokens[i];
            let mut next = i + 1;
            match Command::from_kind(&token.kind) {
                Command::Forward(param) => {
                    let distance = param.unwrap_or(self.config.step_length);
                    self.forward(distance, sink, &mut leaves);
                }
                Command::SetWidth(param) => {
                    let scale = param.unwrap_or(1.0);
                    if let Some(top) = self.radius_stack.last_mut() {
                        *top *= scale;
                    }
                }
                Command::Roll(param) => {
                    self.refresh_tip_rng();
                    let jitter = self.tip_rng.jitter_f32(self.config.roll_jitter_deg);
                    self.roll((param.unwrap_or(0.0) + jitter).to_radians());
                }
                Command::Pitch(param) => {
                    self.refresh_tip_rng();
                    let jitter = self.tip_rng.jitter_f32(self.config.pitch_jitter_deg);
                    self.pitch((param.unwrap_or(0.0) + jitter).to_radians());
                }
                Command::YawLeft => self.yaw(increment),
                Command::YawRight => self.yaw(-increment),
                Command::RollLeft => self.roll(increment),
                Command::RollRight => self.roll(-increment),
                Command::PitchDown => self.pitch(increment),
                Command::PitchUp => self.pitch(-increment),
                Command::Leaf => self.emit_leaf(&mut leaves),
                Command::BranchOpen => {
                    self.refresh_tip_rng();
                    let draw = self.tip_rng.next_f32();
                    if draw < self.config.prune.removal_threshold(token.pos) {
                        // Delete the whole sub-branch: no state push, no
                        // geometry.
                        next = skip_branch(&tokens, i);
                    } else {
                        self.frame_stack.push(self.frame);
                        let tapered = self.current_radius() * self.config.taper_factor;
                        self.radius_stack.push(tapered);
                    }
                }
                Command::BranchClose => {
                    if let Some(frame) = self.frame_stack.pop() {
                        self.frame = frame;
                    } else {
                        warn!(pos = token.pos, "ignoring unmatched `]`");
                    }
                    if self.radius_stack.len() > 1 {
                        self.radius_stack.pop();
                    }
                }
                Command::Unknown(_) => {}
            }
            self.frame.orthonormalize();
            i = next;
        }
        Ok(leaves)
    }

    fn reset(&mut self) {
        self.frame = TurtleFrame::root();
        self.frame_stack.clear();
        self.radius_stack.clear();
        self.radius_stack.push(self.config.initial_radius);
        self.tip_key = seed::quantized_key(self.frame.position);
        self.tip_rng = ArborRng::new(seed::seed_from_key(self.tip_key));
    }

    fn current_radius(&self) -> f32 {
        self.radius_stack
            .last()
            .copied()
            .unwrap_or(self.config.initial_radius)
    }

    /// Re-seed the tip generator if the quantized tip has moved since the
    /// last draw. Consecutive draws at one tip continue the same stream.
    fn refresh_tip_rng(&mut self) {
        let key = seed::quantized_key(self.frame.position);
        if key != self.tip_key {
            self.tip_key = key;
            self.tip_rng = ArborRng::new(seed::seed_from_key(key));
        }
    }

    // -- rotations ---------------------------------------------------------

    fn yaw(&mut self, radians: f32) {
        let axis = self.frame.up;
        rotate_pair(&mut self.frame.heading, &mut self.frame.right, axis, radians);
    }

    fn roll(&mut self, radians: f32) {
        let axis = self.frame.heading;
        rotate_pair(&mut self.frame.up, &mut self.frame.right, axis, radians);
    }

    fn pitch(&mut self, radians: f32) {
        let axis = self.frame.right;
        rotate_pair(&mut self.frame.heading, &mut self.frame.up, axis, radians);
    }

    // -- forward move ------------------------------------------------------

    fn forward<S: CylinderSink>(
        &mut self,
        distance: f32,
        sink: &mut S,
        leaves: &mut Vec<LeafRecord>,
    ) {
        let start = self.frame.position;
        let end = start + self.frame.heading * distance;
        let base_radius = self.current_radius();
        let top_radius = base_radius * self.config.taper_factor;

        // Degenerate (zero-length) segments emit nothing.
        if (end - start).length_squared() > DEGENERATE_AXIS_SQ {
            sink.draw_cylinder(CylinderSegment {
                start,
                end,
                base_radius,
                top_radius,
            });
        }

        if let Some(top) = self.radius_stack.last_mut() {
            *top = top_radius;
        }
        self.frame.position = end;
        self.emit_leaf(leaves);
        self.apply_tropism();
    }

    /// Bend the heading toward the tropism vector by
    /// `coefficient × |heading × tropism|` about their cross product.
    /// Skipped when disabled or when heading is (anti)parallel to the
    /// tropism vector.
    fn apply_tropism(&mut self) {
        let coefficient = self.config.tropism_coefficient;
        if coefficient <= 0.0 {
            return;
        }
        let tropism = self.config.tropism;
        if tropism.length_squared() <= DEGENERATE_AXIS_SQ {
            return;
        }
        let axis = self.frame.heading.cross(tropism);
        let len = axis.length();
        if len <= 1.0e-6 {
            return;
        }
        let rot = Quat::from_axis_angle(axis / len, coefficient * len);
        self.frame.heading = rot * self.frame.heading;
        self.frame.orthonormalize();
    }

    // -- leaves ------------------------------------------------------------

    /// Record one leaf at the current tip: jittered sideways within the
    /// plane perpendicular to the branch, normal blended between world-up
    /// and the heading with a random tilt, scale tracking the local
    /// radius ratio.
    fn emit_leaf(&mut self, leaves: &mut Vec<LeafRecord>) {
        self.refresh_tip_rng();
        let frame = self.frame;
        let leaf = self.config.leaf;

        let offset = frame.right * self.tip_rng.jitter_f32(leaf.offset_range)
            + frame.up * self.tip_rng.jitter_f32(leaf.offset_range);
        let position = frame.position + offset;

        let normal = (Vec3::Y * leaf.normal_blend + frame.heading * (1.0 - leaf.normal_blend))
            .normalize_or(frame.up);
        let tilt_axis = {
            let axis = normal.cross(frame.heading);
            if axis.length_squared() > DEGENERATE_AXIS_SQ {
                axis.normalize()
            } else {
                normal.any_orthonormal_vector()
            }
        };
        let tilt = self.tip_rng.jitter_f32(leaf.tilt_deg).to_radians();
        let up = (Quat::from_axis_angle(tilt_axis, tilt) * normal).normalize();
        let right = {
            let r = up.cross(frame.heading);
            if r.length_squared() > DEGENERATE_AXIS_SQ {
                r.normalize()
            } else {
                up.any_orthonormal_vector()
            }
        };

        let scale =
            leaf.base_scale * (self.current_radius() / self.config.initial_radius).sqrt();
        leaves.push(LeafRecord {
            position,
            up,
            right,
            scale,
        });
    }
}

/// Index just past the `]` matching the `[` at `open_index`, tracking
/// nesting. An unclosed bracket skips to the end of the string.
fn skip_branch(tokens: &[Token], open_index: usize) -> usize {
    let mut depth = 0usize;
    let mut i = open_index;
    while i < tokens.len() {
        match tokens[i].kind {
            TokenKind::Open => depth += 1,
            TokenKind::Close => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    tokens.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PruneParams;

    const EPS: f32 = 1.0e-4;

    fn quiet_config() -> TurtleConfig {
        // Pruning off so segment counts are exact.
        TurtleConfig {
            prune: PruneParams { intensity: 0.0 },
            ..TurtleConfig::default()
        }
    }

    fn interpret(config: TurtleConfig, input: &str) -> (Vec<CylinderSegment>, Vec<LeafRecord>) {
        let mut turtle = Turtle::new(config);
        let mut segments = Vec::new();
        let leaves = turtle.interpret(input, &mut segments).unwrap();
        (segments, leaves)
    }

    fn assert_orthonormal(frame: &TurtleFrame) {
        assert!((frame.heading.length() - 1.0).abs() < EPS);
        assert!((frame.up.length() - 1.0).abs() < EPS);
        assert!((frame.right.length() - 1.0).abs() < EPS);
        assert!(frame.heading.dot(frame.up).abs() < EPS);
        assert!(frame.heading.dot(frame.right).abs() < EPS);
        assert!(frame.up.dot(frame.right).abs() < EPS);
    }

    #[test]
    fn three_segment_example() {
        let (segments, leaves) = interpret(quiet_config(), "F[+F][-F]");
        assert_eq!(segments.len(), 3);
        assert_eq!(leaves.len(), 3);

        // Trunk: one unit up, radius 0.5 tapering to 0.35.
        let trunk = &segments[0];
        assert!(trunk.start.abs_diff_eq(Vec3::ZERO, EPS));
        assert!(trunk.end.abs_diff_eq(Vec3::Y, EPS));
        assert!((trunk.base_radius - 0.5).abs() < EPS);
        assert!((trunk.top_radius - 0.35).abs() < EPS);

        // Both children sprout from the trunk tip at ±25° off the trunk
        // heading, with the pushed (tapered) radius.
        let expected = 25.0_f32.to_radians().cos();
        for child in &segments[1..] {
            assert!(child.start.abs_diff_eq(Vec3::Y, EPS));
            let dir = (child.end - child.start).normalize();
            assert!((dir.dot(Vec3::Y) - expected).abs() < EPS);
            assert!((child.base_radius - 0.245).abs() < EPS);
        }
        // Mirrored about the trunk axis.
        assert!((segments[1].end.x + segments[2].end.x).abs() < EPS);
    }

    #[test]
    fn forward_parameter_overrides_step() {
        let (segments, _) = interpret(quiet_config(), "F(2.5)");
        assert!(segments[0].end.abs_diff_eq(Vec3::new(0.0, 2.5, 0.0), EPS));
    }

    #[test]
    fn width_command_scales_radius() {
        let (segments, _) = interpret(quiet_config(), "!(0.5)F");
        assert!((segments[0].base_radius - 0.25).abs() < EPS);
        assert!((segments[0].top_radius - 0.175).abs() < EPS);

        // Bare `!` defaults to a scale of 1.
        let (segments, _) = interpret(quiet_config(), "!F");
        assert!((segments[0].base_radius - 0.5).abs() < EPS);
    }

    #[test]
    fn zero_length_forward_emits_no_cylinder() {
        let (segments, leaves) = interpret(quiet_config(), "F(0)");
        assert!(segments.is_empty());
        // The tip leaf is still recorded.
        assert_eq!(leaves.len(), 1);
    }

    #[test]
    fn unmatched_close_is_a_noop() {
        let (segments, _) = interpret(quiet_config(), "F]]F");
        assert_eq!(segments.len(), 2);
        // The second segment continues from the first — nothing was
        // restored because nothing was pushed.
        assert!(segments[1].start.abs_diff_eq(segments[0].end, EPS));
    }

    #[test]
    fn unknown_characters_are_skipped() {
        let (segments, _) = interpret(quiet_config(), "F?*F");
        assert_eq!(segments.len(), 2);
        assert!(segments[1].end.abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), EPS));
    }

    #[test]
    fn balanced_string_empties_the_stacks() {
        let mut turtle = Turtle::new(quiet_config());
        let mut segments = Vec::new();
        turtle
            .interpret("F[+F[&F]<F]F[-F]", &mut segments)
            .unwrap();
        assert!(turtle.frame_stack.is_empty());
        assert_eq!(turtle.radius_stack.len(), 1);
        assert_orthonormal(&turtle.frame);
    }

    #[test]
    fn stacked_frames_stay_orthonormal() {
        // Unbalanced on purpose: two frames remain on the stack.
        let mut turtle = Turtle::new(quiet_config());
        let mut segments = Vec::new();
        turtle
            .interpret("F/(33)[+F&(12)[vF<F", &mut segments)
            .unwrap();
        assert_eq!(turtle.frame_stack.len(), 2);
        for frame in &turtle.frame_stack {
            assert_orthonormal(frame);
        }
        assert_orthonormal(&turtle.frame);
    }

    #[test]
    fn frame_survives_long_rotation_chains() {
        let input = "/(10)&(5)+v<F".repeat(200);
        let mut turtle = Turtle::new(quiet_config());
        let mut segments = Vec::new();
        turtle.interpret(&input, &mut segments).unwrap();
        assert_orthonormal(&turtle.frame);
    }

    #[test]
    fn interpretation_is_deterministic() {
        let config = TurtleConfig::default(); // pruning and jitter active
        let input = "F/(30)[+F&F[vFL]]F[-F/(60)FL]F[+FL][-F]";
        let (seg_a, leaf_a) = interpret(config.clone(), input);
        let (seg_b, leaf_b) = interpret(config, input);
        assert_eq!(seg_a, seg_b);
        assert_eq!(leaf_a, leaf_b);
    }

    #[test]
    fn reuse_resets_state() {
        let mut turtle = Turtle::new(quiet_config());
        let mut first = Vec::new();
        let leaves_first = turtle.interpret("FF[+F]", &mut first).unwrap();
        let mut second = Vec::new();
        let leaves_second = turtle.interpret("FF[+F]", &mut second).unwrap();
        assert_eq!(first, second);
        assert_eq!(leaves_first, leaves_second);
    }

    #[test]
    fn prune_removes_deep_branches_at_full_threshold() {
        // intensity 2.0 pushes the deepest tier to 1.0 — every draw in
        // [0, 1) prunes, so the bracket at byte 12 always disappears.
        let config = TurtleConfig {
            prune: PruneParams { intensity: 2.0 },
            ..TurtleConfig::default()
        };
        let (segments, _) = interpret(config, "FFFFFFFFFFFF[+F]");
        assert_eq!(segments.len(), 12);

        let config = TurtleConfig {
            prune: PruneParams { intensity: 0.0 },
            ..TurtleConfig::default()
        };
        let (segments, _) = interpret(config, "FFFFFFFFFFFF[+F]");
        assert_eq!(segments.len(), 13);
    }

    #[test]
    fn pruned_subtree_leaves_stacks_balanced() {
        let config = TurtleConfig {
            prune: PruneParams { intensity: 2.0 },
            ..TurtleConfig::default()
        };
        let mut turtle = Turtle::new(config);
        let mut segments = Vec::new();
        turtle
            .interpret("FFFFFFFFFFFF[+F[&F]]F", &mut segments)
            .unwrap();
        assert!(turtle.frame_stack.is_empty());
        assert_eq!(turtle.radius_stack.len(), 1);
        // The trailing F still executes after the skipped subtree.
        assert_eq!(segments.len(), 13);
    }

    #[test]
    fn early_brackets_are_never_pruned() {
        // Below byte 6 the threshold is 0 and a draw in [0, 1) can never
        // fall below it.
        let (segments, _) = interpret(TurtleConfig::default(), "F[+F]");
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn tropism_bends_toward_vector() {
        let config = TurtleConfig {
            tropism: Vec3::X,
            tropism_coefficient: 0.3,
            ..quiet_config()
        };
        let mut turtle = Turtle::new(config);
        let mut segments = Vec::new();
        turtle.interpret("F", &mut segments).unwrap();
        assert!(turtle.frame.heading.dot(Vec3::X) > 0.0);
        assert_orthonormal(&turtle.frame);
    }

    #[test]
    fn tropism_accumulates_over_steps() {
        let config = TurtleConfig {
            tropism: Vec3::X,
            tropism_coefficient: 0.2,
            ..quiet_config()
        };
        let mut one = Turtle::new(config.clone());
        let mut seg = Vec::new();
        one.interpret("F", &mut seg).unwrap();
        let after_one = one.frame.heading.dot(Vec3::X);

        let mut four = Turtle::new(config);
        let mut seg = Vec::new();
        four.interpret("FFFF", &mut seg).unwrap();
        let after_four = four.frame.heading.dot(Vec3::X);
        assert!(after_four > after_one);
    }

    #[test]
    fn tropism_parallel_heading_is_skipped() {
        let config = TurtleConfig {
            tropism: Vec3::Y, // aligned with the initial heading
            tropism_coefficient: 0.5,
            ..quiet_config()
        };
        let mut turtle = Turtle::new(config);
        let mut segments = Vec::new();
        turtle.interpret("F", &mut segments).unwrap();
        assert!(turtle.frame.heading.abs_diff_eq(Vec3::Y, EPS));
    }

    #[test]
    fn zero_coefficient_disables_tropism() {
        let (segments, _) = interpret(quiet_config(), "FF");
        assert!(segments[1].end.abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), EPS));
    }

    #[test]
    fn explicit_leaf_command_records_a_leaf() {
        let (segments, leaves) = interpret(quiet_config(), "L");
        assert!(segments.is_empty());
        assert_eq!(leaves.len(), 1);
        let leaf = &leaves[0];
        // Offset stays within the configured sideways range of the tip.
        assert!(leaf.position.length() <= 0.5 * 2.0_f32.sqrt() + EPS);
        assert!((leaf.up.length() - 1.0).abs() < EPS);
        assert!((leaf.right.length() - 1.0).abs() < EPS);
    }

    #[test]
    fn leaf_scale_shrinks_with_radius() {
        let (_, leaves) = interpret(quiet_config(), "FLFL");
        assert_eq!(leaves.len(), 4);
        // Later tips sit on thinner wood.
        assert!(leaves[2].scale < leaves[0].scale);
    }

    #[test]
    fn returning_to_a_tip_replays_its_randomness() {
        // `]` restores the trunk tip, whose quantized position re-seeds
        // the generator — so the explicit leaf replays the exact draws of
        // the tip leaf emitted by `F`.
        let (_, leaves) = interpret(quiet_config(), "F[+F]L");
        assert_eq!(leaves.len(), 3);
        assert_eq!(leaves[0], leaves[2]);
    }

    #[test]
    fn skip_branch_handles_nesting() {
        let tokens = tokenize("[F[+F][-F]]F").unwrap();
        assert_eq!(skip_branch(&tokens, 0), tokens.len() - 1);
    }

    #[test]
    fn skip_branch_unclosed_runs_to_end() {
        let tokens = tokenize("[F[+F]").unwrap();
        assert_eq!(skip_branch(&tokens, 0), tokens.len());
    }
}
