// Tokenizer for L-system strings — the single front end shared by the
// grammar rewriter and the turtle interpreter.
//
// A token is one symbol with an optional parenthesized numeric argument,
// or a bracket, or a verbatim passthrough character. Both consumers walk
// the same token stream, so parameter parsing and cursor bookkeeping live
// here exactly once.
//
// An argument is either a numeric literal (`F(2.5)`) or one of a fixed
// table of named constants (`&(a0)`), mostly branching angles and growth
// ratios. Unknown names are a hard error — see `error.rs` for why we do
// not default them.
//
// See also: `grammar.rs` which rewrites token streams back into strings,
// `turtle.rs` which dispatches tokens as drawing commands.

use std::iter::Peekable;
use std::str::CharIndices;
use std::sync::LazyLock;

use rustc_hash::FxHashMap;

use crate::error::ArborError;

/// Named symbolic constants usable as parenthesized arguments.
///
/// Growth ratios and branching angles in the usual parametric-grammar
/// notation: contraction ratios (`r1`, `r2`), branching angles in degrees
/// (`a0`, `a2`, `a`), divergence angles (`d`, `d1`, `d2`), width decay
/// (`wr`), and elongation/width growth rates (`lr`, `vr`).
static CONSTANTS: LazyLock<FxHashMap<&'static str, f32>> = LazyLock::new(|| {
    FxHashMap::from_iter([
        ("r1", 0.9),
        ("r2", 0.6),
        ("a0", 45.0),
        ("a2", 45.0),
        ("a", 18.95),
        ("d", 137.5),
        ("d1", 94.74),
        ("d2", 132.63),
        ("wr", 0.707),
        ("lr", 1.109),
        ("vr", 1.732),
    ])
});

/// Look up a named constant. Returns `None` for unrecognized names.
pub fn named_constant(name: &str) -> Option<f32> {
    CONSTANTS.get(name).copied()
}

/// Parse one parenthesized argument body: numeric literal first, then the
/// named-constant table. `at` is the byte position of the owning symbol,
/// used only for error reporting.
pub fn parse_parameter(raw: &str, at: usize) -> Result<f32, ArborError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ArborError::EmptyParameter { at });
    }
    if let Ok(value) = raw.parse::<f32>() {
        return Ok(value);
    }
    named_constant(raw).ok_or_else(|| ArborError::UnknownParameter(raw.to_string()))
}

/// True for characters the rewriter treats as rule symbols: letters plus
/// the parametrizable command punctuation.
fn is_symbol(ch: char) -> bool {
    ch.is_ascii_alphabetic() || matches!(ch, '!' | '/' | '&' | '+' | '-')
}

// ---------------------------------------------------------------------------
// Token stream
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TokenKind {
    /// A rule symbol, optionally carrying a parsed argument.
    Symbol { ch: char, param: Option<f32> },
    /// `[` — branch open.
    Open,
    /// `]` — branch close.
    Close,
    /// Any other character, copied through verbatim by the rewriter.
    Other(char),
}

/// One token plus the byte position of its first character in the source
/// string. The interpreter's pruning schedule keys off this position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Token {
    pub pos: usize,
    pub kind: TokenKind,
}

/// Streaming tokenizer over an L-system string.
pub struct Tokenizer<'a> {
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
        }
    }

    /// Consume an argument body after the already-consumed `(`.
    fn take_argument(&mut self, at: usize) -> Result<f32, ArborError> {
        let mut raw = String::new();
        loop {
            match self.chars.next() {
                Some((_, ')')) => break,
                Some((_, c)) => raw.push(c),
                None => return Err(ArborError::UnterminatedParameter { at }),
            }
        }
        parse_parameter(&raw, at)
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Token, ArborError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (pos, ch) = self.chars.next()?;
        let kind = match ch {
            '[' => TokenKind::Open,
            ']' => TokenKind::Close,
            c if is_symbol(c) => {
                if matches!(self.chars.peek(), Some(&(_, '('))) {
                    self.chars.next();
                    match self.take_argument(pos) {
                        Ok(value) => TokenKind::Symbol {
                            ch: c,
                            param: Some(value),
                        },
                        Err(e) => return Some(Err(e)),
                    }
                } else {
                    TokenKind::Symbol { ch: c, param: None }
                }
            }
            c => TokenKind::Other(c),
        };
        Some(Ok(Token { pos, kind }))
    }
}

/// Tokenize a whole string, failing on the first malformed argument.
pub fn tokenize(input: &str) -> Result<Vec<Token>, ArborError> {
    Tokenizer::new(input).collect()
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// The closed set of drawing commands the turtle understands.
///
/// `Forward`, `SetWidth`, `Roll`, and `Pitch` carry the optional
/// parenthesized argument; the fixed rotations never take one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// `F` — move forward and draw a tapered cylinder.
    Forward(Option<f32>),
    /// `!` — scale the current branch radius.
    SetWidth(Option<f32>),
    /// `/` — roll about the heading, with random jitter.
    Roll(Option<f32>),
    /// `&` — pitch about the right axis, with random jitter.
    Pitch(Option<f32>),
    /// `+` / `-` — fixed yaw about the up axis.
    YawLeft,
    YawRight,
    /// `<` / `>` — fixed roll about the heading.
    RollLeft,
    RollRight,
    /// `v` / `^` — fixed pitch about the right axis.
    PitchDown,
    PitchUp,
    /// `L` — record a leaf at the current position.
    Leaf,
    BranchOpen,
    BranchClose,
    /// Anything else — skipped by the interpreter.
    Unknown(char),
}

impl Command {
    pub fn from_kind(kind: &TokenKind) -> Self {
        match *kind {
            TokenKind::Open => Command::BranchOpen,
            TokenKind::Close => Command::BranchClose,
            TokenKind::Symbol { ch, param } => match ch {
                'F' => Command::Forward(param),
                '!' => Command::SetWidth(param),
                '/' => Command::Roll(param),
                '&' => Command::Pitch(param),
                '+' => Command::YawLeft,
                '-' => Command::YawRight,
                'v' => Command::PitchDown,
                'L' => Command::Leaf,
                other => Command::Unknown(other),
            },
            TokenKind::Other(ch) => match ch {
                '<' => Command::RollLeft,
                '>' => Command::RollRight,
                '^' => Command::PitchUp,
                other => Command::Unknown(other),
            },
        }
    }
}
