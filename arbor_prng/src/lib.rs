// Deterministic, portable pseudo-random number generator.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding.
// This is a hand-rolled implementation with zero external dependencies, chosen
// for portability and to guarantee identical output across all platforms.
//
// Arbor constructs one short-lived `ArborRng` per branch-tip position (seeded
// from the quantized tip coordinates — see `arbor_gen::seed`), so that every
// stochastic effect of the interpreter — branch pruning, roll/pitch jitter,
// leaf placement — is reproducible for identical geometry. By hand-rolling the
// generator we avoid depending on external RNG crates and guarantee the same
// tree for the same seed on every platform.
//
// **Critical constraint: determinism.** Every method on `ArborRng` must
// produce identical output given the same prior state, regardless of platform,
// compiler version, or optimization level. Do not use floating-point
// arithmetic in the core generator, stdlib PRNG, or any source of
// non-determinism in this module.

use serde::{Deserialize, Serialize};

/// Xoshiro256++ PRNG — the project's sole source of randomness.
///
/// Cheap to construct: the interpreter makes a fresh instance for each tip
/// position rather than threading one generator through the whole walk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArborRng {
    s: [u64; 4],
}

impl ArborRng {
    /// Create a new PRNG seeded from a `u64`.
    ///
    /// Uses SplitMix64 to expand the seed into the 256-bit internal state.
    /// Two `ArborRng` instances created with the same seed will produce
    /// identical output sequences.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Generate a uniform `f32` in [0, 1).
    ///
    /// Uses the upper 24 bits of a `u64` to fill the mantissa of an f32.
    /// This is the standard technique — 24 bits gives full f32 precision.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Generate a uniform random value in `[low, high)`.
    ///
    /// Panics if `low >= high`.
    pub fn range_f32(&mut self, low: f32, high: f32) -> f32 {
        assert!(low < high, "range_f32: low must be less than high");
        low + self.next_f32() * (high - low)
    }

    /// Generate a uniform random value in the symmetric range
    /// `[-half_range, half_range)`.
    ///
    /// The interpreter's angular perturbations and leaf offsets are all
    /// symmetric around zero; `half_range == 0.0` returns 0.0 without
    /// consuming a draw, so a zero-jitter configuration stays bit-identical
    /// to one with jitter disabled.
    pub fn jitter_f32(&mut self, half_range: f32) -> f32 {
        if half_range == 0.0 {
            return 0.0;
        }
        self.range_f32(-half_range, half_range)
    }
}

/// SplitMix64 — used only for seeding xoshiro256++ from a single `u64`.
///
/// This is the standard recommendation from the xoshiro authors for
/// expanding a small seed into a larger state.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
