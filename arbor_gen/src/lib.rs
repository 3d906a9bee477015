// arbor_gen — procedural tree generation library.
//
// Generates a 3D tree model from a parametric L-system: the grammar
// engine expands an axiom through iterated symbol substitution, and the
// turtle interpreter walks the resulting command string into tapered
// branch cylinders and leaf placements. The library is headless — output
// is plain geometry records for an external renderer to consume.
//
// Module overview:
// - `grammar.rs`: Parametric L-system rewriter (axiom, rules, growth ratios).
// - `turtle.rs`:  Stack-based interpreter — frames, tapering, pruning, tropism, leaves.
// - `token.rs`:   Shared tokenizer + parameter parser + command dispatch.
// - `seed.rs`:    Quantized-position seeding for reproducible randomness.
// - `config.rs`:  GrammarConfig / TurtleConfig / TreeConfig + presets.
// - `types.rs`:   CylinderSegment, LeafRecord, TreeModel, CylinderSink.
// - `error.rs`:   ArborError — parameter parsing failures.
// - `prng`:       Re-exported from `arbor_prng` — xoshiro256++ with SplitMix64 seeding.
//
// **Critical constraint: determinism.** Generation is a pure function:
// `(config) -> tree`. Grammar rewriting uses no randomness at all; every
// stochastic effect in the interpreter draws from a PRNG seeded purely
// from the quantized tip position. No system time, no OS entropy, no
// iteration-order dependence (`BTreeMap` for the rule table).

pub mod config;
pub mod error;
pub mod grammar;
pub mod seed;
pub mod token;
pub mod turtle;
pub mod types;
pub use arbor_prng as prng;

use tracing::debug;

use crate::config::TreeConfig;
use crate::error::ArborError;
use crate::grammar::LSystem;
use crate::turtle::Turtle;
use crate::types::TreeModel;

/// Generate one complete tree: expand the grammar, interpret the result,
/// and return the geometry as an immutable model.
///
/// A failed generation yields an error, never partial geometry.
pub fn generate_tree(config: &TreeConfig) -> Result<TreeModel, ArborError> {
    let lsystem = LSystem::from_config(&config.grammar);
    let generated = lsystem.generate()?;

    let mut turtle = Turtle::new(config.turtle.clone());
    let mut segments = Vec::new();
    let leaves = turtle.interpret(&generated, &mut segments)?;
    debug!(
        segments = segments.len(),
        leaves = leaves.len(),
        "interpreted tree"
    );
    Ok(TreeModel { segments, leaves })
}
