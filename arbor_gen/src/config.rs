// Data-driven generation configuration.
//
// All tunable parameters live here, serde-serializable so hosts can load
// them from JSON and iterate on tree shape without recompiling. The
// grammar and the turtle never read magic numbers — everything comes
// through `GrammarConfig` and `TurtleConfig`.
//
// Named preset constructors produce different tree archetypes from the
// same parameter set: the three classic maple rule cycles plus a
// parametric preset that exercises `F(x)` / `!(x)` argument rewriting.
//
// See also: `grammar.rs` which consumes `GrammarConfig`, `turtle.rs`
// which consumes `TurtleConfig`, `token.rs` for the named constants
// usable inside rule strings.
//
// **Critical constraint: determinism.** Config values feed directly into
// generation. Identical configs plus identical axioms give identical
// geometry; the rule table is a `BTreeMap` so serialized configs have a
// stable key order.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Grammar
// ---------------------------------------------------------------------------

/// L-system definition: axiom, rewrite rules, and per-generation growth
/// ratios for parametrized symbols.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrammarConfig {
    /// Initial string.
    pub axiom: String,
    /// Symbol → replacement. Symbols absent from the table rewrite to
    /// themselves.
    pub rules: BTreeMap<char, String>,
    /// Number of rewrite passes.
    pub iterations: u32,
    /// Ratio applied to an `F(x)` length argument on every pass.
    pub length_growth: f32,
    /// Ratio applied to a `!(x)` width argument on every pass.
    pub width_growth: f32,
}

impl GrammarConfig {
    /// The classic maple: five-way branching with a twist, leaves at every
    /// branch tip.
    pub fn maple() -> Self {
        Self {
            axiom: "A".to_string(),
            rules: BTreeMap::from([('A', "F[>A][<A][+A][-AvA][^A]L".to_string())]),
            iterations: 5,
            length_growth: 1.109,
            width_growth: 0.707,
        }
    }

    /// Six symmetric child branches per node — a dense, rounded crown.
    pub fn dense_crown() -> Self {
        Self {
            axiom: "A".to_string(),
            rules: BTreeMap::from([('A', "F[>A][<A][+A][-A][vA][^A]L".to_string())]),
            iterations: 5,
            length_growth: 1.109,
            width_growth: 0.707,
        }
    }

    /// Two bracketed children plus unbracketed rotations — a sparse,
    /// corkscrewing habit.
    pub fn corkscrew() -> Self {
        Self {
            axiom: "A".to_string(),
            rules: BTreeMap::from([('A', "F[+A][-A]<A>AvA^AL".to_string())]),
            iterations: 5,
            length_growth: 1.109,
            width_growth: 0.707,
        }
    }

    /// Parametric monopodial tree: explicit lengths and widths that grow
    /// with every pass, divergence and branching angles from the named
    /// constant table.
    pub fn parametric() -> Self {
        Self {
            axiom: "!(1)F(10)/(45)A".to_string(),
            rules: BTreeMap::from([(
                'A',
                "!(wr)F(5)[&(a0)F(5)AL]/(d)[&(a2)F(5)AL]".to_string(),
            )]),
            iterations: 6,
            length_growth: 1.109,
            width_growth: 0.707,
        }
    }
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self::maple()
    }
}

// ---------------------------------------------------------------------------
// Turtle
// ---------------------------------------------------------------------------

/// Leaf placement parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeafParams {
    /// Half-range of the uniform positional offset along the local
    /// right/up axes (the plane perpendicular to the branch).
    pub offset_range: f32,
    /// Weight of world-up versus local heading in the leaf normal
    /// (1.0 = leaves face straight up, 0.0 = leaves follow the branch).
    pub normal_blend: f32,
    /// Half-range in degrees of the random tilt applied to the normal.
    pub tilt_deg: f32,
    /// Leaf scale at full trunk thickness. Actual scale shrinks with the
    /// local radius ratio.
    pub base_scale: f32,
}

impl Default for LeafParams {
    fn default() -> Self {
        Self {
            offset_range: 0.5,
            normal_blend: 0.5,
            tilt_deg: 30.0,
            base_scale: 1.0,
        }
    }
}

/// Stochastic branch-removal parameters.
///
/// The removal threshold steps up in four tiers as the scan cursor
/// advances into the generated string (0 / 0.1 / 0.3 / 0.5 at byte
/// positions 6 / 8 / 12), so later sub-branches are culled more
/// aggressively. `intensity` scales every tier: 1.0 is the reference
/// schedule, 0.0 disables pruning entirely.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PruneParams {
    pub intensity: f32,
}

impl PruneParams {
    /// Removal threshold for a `[` encountered at byte position `cursor`.
    pub fn removal_threshold(&self, cursor: usize) -> f32 {
        let base = if cursor < 6 {
            0.0
        } else if cursor < 8 {
            0.1
        } else if cursor < 12 {
            0.3
        } else {
            0.5
        };
        base * self.intensity
    }
}

impl Default for PruneParams {
    fn default() -> Self {
        Self { intensity: 1.0 }
    }
}

/// Turtle interpretation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurtleConfig {
    /// Fixed rotation per `+ - < > v ^` command, degrees.
    pub angle_increment_deg: f32,
    /// Distance per `F` when no argument is given.
    pub step_length: f32,
    /// Trunk radius at the root.
    pub initial_radius: f32,
    /// Radius ratio applied along each segment and at each branch push.
    pub taper_factor: f32,
    /// Preferred growth direction for tropism bending (gravity by
    /// default). Ignored while `tropism_coefficient` is zero.
    pub tropism: Vec3,
    /// Bending strength per forward step. 0.0 disables tropism.
    pub tropism_coefficient: f32,
    /// Half-range in degrees of the random perturbation added to `/`.
    pub roll_jitter_deg: f32,
    /// Half-range in degrees of the random perturbation added to `&`.
    /// Kept narrower than the roll jitter.
    pub pitch_jitter_deg: f32,
    pub leaf: LeafParams,
    pub prune: PruneParams,
}

impl Default for TurtleConfig {
    fn default() -> Self {
        Self {
            angle_increment_deg: 25.0,
            step_length: 1.0,
            initial_radius: 0.5,
            taper_factor: 0.7,
            tropism: Vec3::new(0.0, -1.0, 0.0),
            tropism_coefficient: 0.0,
            roll_jitter_deg: 30.0,
            pitch_jitter_deg: 15.0,
            leaf: LeafParams::default(),
            prune: PruneParams::default(),
        }
    }
}

impl TurtleConfig {
    /// The demo-scene turtle: wide 35° branching, long 10-unit steps, a
    /// thick 5-unit trunk that halves at every branch.
    pub fn maple_demo() -> Self {
        Self {
            angle_increment_deg: 35.0,
            step_length: 10.0,
            initial_radius: 5.0,
            taper_factor: 0.5,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Combined
// ---------------------------------------------------------------------------

/// Everything needed to generate one tree.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    pub grammar: GrammarConfig,
    pub turtle: TurtleConfig,
}

impl TreeConfig {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::named_constant;

    #[test]
    fn json_roundtrip() {
        let config = TreeConfig {
            grammar: GrammarConfig::parametric(),
            turtle: TurtleConfig::maple_demo(),
        };
        let json = config.to_json().unwrap();
        let restored = TreeConfig::from_json(&json).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn presets_share_the_axiom() {
        for preset in [
            GrammarConfig::maple(),
            GrammarConfig::dense_crown(),
            GrammarConfig::corkscrew(),
        ] {
            assert_eq!(preset.axiom, "A");
            assert!(preset.rules.contains_key(&'A'));
            assert_eq!(preset.iterations, 5);
        }
    }

    #[test]
    fn parametric_preset_constants_resolve() {
        // Every named constant referenced by the parametric rules must be
        // in the lookup table, or generation would fail.
        for name in ["wr", "a0", "a2", "d"] {
            assert!(named_constant(name).is_some(), "missing constant {name}");
        }
    }

    #[test]
    fn prune_thresholds_follow_the_tier_schedule() {
        let prune = PruneParams::default();
        assert_eq!(prune.removal_threshold(0), 0.0);
        assert_eq!(prune.removal_threshold(5), 0.0);
        assert_eq!(prune.removal_threshold(6), 0.1);
        assert_eq!(prune.removal_threshold(7), 0.1);
        assert_eq!(prune.removal_threshold(8), 0.3);
        assert_eq!(prune.removal_threshold(11), 0.3);
        assert_eq!(prune.removal_threshold(12), 0.5);
        assert_eq!(prune.removal_threshold(10_000), 0.5);
    }

    #[test]
    fn prune_threshold_is_monotonic_in_cursor() {
        let prune = PruneParams::default();
        let mut prev = 0.0;
        for cursor in 0..64 {
            let t = prune.removal_threshold(cursor);
            assert!(t >= prev, "threshold decreased at cursor {cursor}");
            prev = t;
        }
    }

    #[test]
    fn prune_intensity_zero_disables() {
        let prune = PruneParams { intensity: 0.0 };
        for cursor in 0..64 {
            assert_eq!(prune.removal_threshold(cursor), 0.0);
        }
    }
}
