use crate::error::{IfResult, ImmuForgeError};
use fastrand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitXor, Not};

/// Number of symbols in a detector threshold.
pub const THRESHOLD_BITS: usize = 8;

/// Largest integer representable by a threshold.
pub const THRESHOLD_MAX: f64 = 255.0;

/// A two-valued symbol. Used for feature values, patterns, masks and
/// Gray-coded thresholds alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Symbol {
    Zero,
    One,
}

impl Symbol {
    #[inline(always)]
    pub fn from_bool(b: bool) -> Self {
        if b {
            Symbol::One
        } else {
            Symbol::Zero
        }
    }

    #[inline(always)]
    pub fn is_one(self) -> bool {
        self == Symbol::One
    }

    pub fn random(rng: &mut Rng) -> Self {
        Symbol::from_bool(rng.bool())
    }

    /// `One` with probability `p`.
    pub fn biased(rng: &mut Rng, p: f64) -> Self {
        Symbol::from_bool(rng.f64() < p)
    }
}

impl BitXor for Symbol {
    type Output = Symbol;

    #[inline(always)]
    fn bitxor(self, rhs: Symbol) -> Symbol {
        Symbol::from_bool(self != rhs)
    }
}

impl Not for Symbol {
    type Output = Symbol;

    #[inline(always)]
    fn not(self) -> Symbol {
        match self {
            Symbol::Zero => Symbol::One,
            Symbol::One => Symbol::Zero,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Zero => write!(f, "0"),
            Symbol::One => write!(f, "1"),
        }
    }
}

/// Parses a string of `0`/`1` characters. Whitespace is ignored so vectors
/// can be written in groups (`"0101 1100"`).
pub fn parse_symbols(s: &str) -> IfResult<Vec<Symbol>> {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '0' => Ok(Symbol::Zero),
            '1' => Ok(Symbol::One),
            other => Err(ImmuForgeError::Validation(format!(
                "Invalid symbol '{}' in '{}'",
                other, s
            ))),
        })
        .collect()
}

pub fn symbols_from_bools(bits: &[bool]) -> Vec<Symbol> {
    bits.iter().map(|&b| Symbol::from_bool(b)).collect()
}

/// Encodes `n` as an 8-symbol Gray code, most significant symbol first.
pub fn gray_encode(n: u8) -> [Symbol; THRESHOLD_BITS] {
    let gray = n ^ (n >> 1);
    let mut out = [Symbol::Zero; THRESHOLD_BITS];
    for (i, s) in out.iter_mut().enumerate() {
        *s = Symbol::from_bool((gray >> (THRESHOLD_BITS - 1 - i)) & 1 == 1);
    }
    out
}

/// Decodes an 8-symbol Gray code by cumulative XOR, most significant first.
pub fn gray_decode(gray: &[Symbol; THRESHOLD_BITS]) -> u8 {
    let mut value = 0u8;
    let mut prev = Symbol::Zero;
    for &g in gray {
        let bit = g ^ prev;
        value = (value << 1) | bit.is_one() as u8;
        prev = bit;
    }
    value
}

/// Threshold in `[0, 1]` represented by a Gray-coded vector.
pub fn decode_threshold(gray: &[Symbol; THRESHOLD_BITS]) -> f64 {
    gray_decode(gray) as f64 / THRESHOLD_MAX
}

pub fn format_symbols(symbols: &[Symbol]) -> String {
    symbols.iter().map(|s| s.to_string()).collect()
}
