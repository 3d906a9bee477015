// Parametric L-system rewriter.
//
// `generate()` expands the axiom through `iterations` left-to-right
// rewrite passes. Per pass, each symbol token either:
//   - carries a parenthesized argument → its argument is rewritten by the
//     symbol's growth rule (`F` scales by `length_growth`, `!` by
//     `width_growth`, everything else passes through) and the symbol is
//     re-emitted with the new argument;
//   - is bare → it is replaced by its rule-table entry, or emitted
//     unchanged when no rule exists (the identity rule).
// Brackets and unrecognized characters are copied verbatim.
//
// Generation is fully deterministic: no randomness enters until the
// turtle interprets the finished string.
//
// See also: `token.rs` for the shared tokenizer and the named-constant
// table, `config.rs` for `GrammarConfig` and its presets, `turtle.rs`
// for the consumer of the generated string.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::GrammarConfig;
use crate::error::ArborError;
use crate::token::{TokenKind, Tokenizer};

/// A parametric L-system: axiom, rule table, and pass count.
///
/// Constructed from a `GrammarConfig`, consumed by `generate()`.
#[derive(Clone, Debug)]
pub struct LSystem {
    axiom: String,
    rules: BTreeMap<char, String>,
    iterations: u32,
    length_growth: f32,
    width_growth: f32,
}

impl LSystem {
    pub fn from_config(config: &GrammarConfig) -> Self {
        Self {
            axiom: config.axiom.clone(),
            rules: config.rules.clone(),
            iterations: config.iterations,
            length_growth: config.length_growth,
            width_growth: config.width_growth,
        }
    }

    /// Run all rewrite passes and return the final command string.
    ///
    /// A malformed argument anywhere aborts the whole generation — a
    /// grammar typo should never silently produce half a tree.
    pub fn generate(&self) -> Result<String, ArborError> {
        let mut current = self.axiom.clone();
        for _ in 0..self.iterations {
            current = self.rewrite_pass(&current)?;
        }
        debug!(
            len = current.len(),
            iterations = self.iterations,
            "generated L-system string"
        );
        Ok(current)
    }

    /// One left-to-right substitution pass.
    fn rewrite_pass(&self, input: &str) -> Result<String, ArborError> {
        let mut next = String::with_capacity(input.len() * 2);
        for token in Tokenizer::new(input) {
            match token?.kind {
                TokenKind::Symbol {
                    ch,
                    param: Some(value),
                } => {
                    let rewritten = match ch {
                        'F' => value * self.length_growth,
                        '!' => value * self.width_growth,
                        _ => value,
                    };
                    next.push(ch);
                    next.push('(');
                    next.push_str(&rewritten.to_string());
                    next.push(')');
                }
                TokenKind::Symbol { ch, param: None } => match self.rules.get(&ch) {
                    Some(replacement) => next.push_str(replacement),
                    None => next.push(ch),
                },
                TokenKind::Open => next.push('['),
                TokenKind::Close => next.push(']'),
                TokenKind::Other(c) => next.push(c),
            }
        }
        Ok(next)
    }
}
