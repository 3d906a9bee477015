// Deterministic per-position seeding.
//
// Every stochastic effect in the interpreter — branch pruning, roll/pitch
// jitter, leaf placement — draws from an `ArborRng` seeded purely from the
// turtle's current tip position. Identical strings and configuration
// therefore produce identical trees, and a regenerated tree places every
// leaf exactly where it was.
//
// Positions are quantized to centimeter-scale integers before hashing so
// that sub-quantum floating-point drift (accumulated rotation error, for
// example) cannot change the seed. The three quantized components are
// folded together with the usual golden-ratio combiner.
//
// See also: `turtle.rs` which re-seeds whenever the quantized tip moves,
// `arbor_prng` for the generator itself.

use arbor_prng::ArborRng;
use glam::Vec3;

/// Positions are quantized to 1/QUANTIZE_SCALE units before seeding.
const QUANTIZE_SCALE: f32 = 100.0;

/// Quantize one coordinate to the seeding grid.
fn quantize(value: f32) -> i32 {
    (value * QUANTIZE_SCALE).round() as i32
}

/// The quantized form of a position — the identity of a tip as far as
/// randomness is concerned.
pub fn quantized_key(position: Vec3) -> (i32, i32, i32) {
    (
        quantize(position.x),
        quantize(position.y),
        quantize(position.z),
    )
}

/// Golden-ratio hash combiner (the `hash_combine` recipe).
fn combine(seed: u64, value: u64) -> u64 {
    seed ^ (value
        .wrapping_add(0x9e37_79b9)
        .wrapping_add(seed << 6)
        .wrapping_add(seed >> 2))
}

/// Fold a quantized key into a single 64-bit seed.
pub fn seed_from_key(key: (i32, i32, i32)) -> u64 {
    let seed = key.0 as i64 as u64;
    let seed = combine(seed, key.1 as i64 as u64);
    combine(seed, key.2 as i64 as u64)
}

/// Derive the deterministic seed for a tip position.
pub fn position_seed(position: Vec3) -> u64 {
    seed_from_key(quantized_key(position))
}

/// Construct the generator for all random draws at `position`.
pub fn rng_at(position: Vec3) -> ArborRng {
    ArborRng::new(position_seed(position))
}
