//! # ScoreCode — order-preserving score encoding
//!
//! Maps a non-negative score to an 8-hex-character string whose plain byte
//! ordering follows the numeric ordering of the score, so composite index
//! keys can be range-scanned by score.
//!
//! ```text
//! score (f64) → clamp ≥ 0 → f32 → IEEE-754 big-endian bytes
//!             → [complement each byte]   (Descending polarity only)
//!             → lowercase hex, two digits per byte
//! ```
//!
//! For non-negative floats the raw big-endian bit pattern already sorts
//! ascending. The historical key format complements every byte
//! (`255 - b`), storing "distance from max": ascending key order then walks
//! scores from best to worst. That polarity is the default and the one used
//! by every persisted composite key; mixing polarities in one index breaks
//! range scans.
//!
//! | Polarity | `a < b` implies | Use |
//! |----------|-----------------|-----|
//! | `Descending` | `code(a) > code(b)` | persisted keys, best-first scans |
//! | `Ascending` | `code(a) < code(b)` | raw ordered encodings |
//!
//! Decoding is exact to single precision: `decode(encode(x)) == x as f32`.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Length in characters of a rendered ScoreCode.
pub const SCORE_CODE_LEN: usize = 8;

// ============================================================================
// Polarity
// ============================================================================

/// Direction in which codes sort relative to scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Polarity {
    /// Complemented bytes: higher score, smaller code.
    #[default]
    Descending,
    /// Raw bytes: higher score, larger code.
    Ascending,
}

impl Polarity {
    #[inline(always)]
    fn apply(self, bytes: [u8; 4]) -> [u8; 4] {
        match self {
            Polarity::Descending => bytes.map(|b| 255 - b),
            Polarity::Ascending => bytes,
        }
    }
}

// ============================================================================
// ScoreCode
// ============================================================================

/// Four encoded bytes. `Ord` on the bytes equals `Ord` on the hex text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScoreCode([u8; 4]);

impl ScoreCode {
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> [u8; 4] {
        self.0
    }

    /// Parse the 8-hex-character text form.
    pub fn parse(text: &str) -> Result<Self> {
        if text.len() != SCORE_CODE_LEN || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::Codec(format!(
                "score code must be {SCORE_CODE_LEN} hex characters, got {text:?}"
            )));
        }
        let mut bytes = [0u8; 4];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = &text[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16)
                .map_err(|_| Error::Codec(format!("invalid hex pair {pair:?} in {text:?}")))?;
        }
        Ok(Self(bytes))
    }
}

impl std::fmt::Display for ScoreCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for ScoreCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ScoreCode::parse(s)
    }
}

impl Serialize for ScoreCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ScoreCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        ScoreCode::parse(&text).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// ScoreCodec
// ============================================================================

/// Encoder/decoder for one polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreCodec {
    polarity: Polarity,
}

impl ScoreCodec {
    pub const fn new(polarity: Polarity) -> Self {
        Self { polarity }
    }

    /// The historical, complemented codec used for persisted keys.
    pub const fn descending() -> Self {
        Self::new(Polarity::Descending)
    }

    pub const fn ascending() -> Self {
        Self::new(Polarity::Ascending)
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Encode a score. Never fails: negatives clamp to 0, NaN and
    /// infinities keep their IEEE-754 special encodings.
    pub fn encode(&self, score: f64) -> ScoreCode {
        let bytes = clamp_to_f32(score).to_bits().to_be_bytes();
        ScoreCode(self.polarity.apply(bytes))
    }

    pub fn decode(&self, code: ScoreCode) -> f32 {
        let bytes = self.polarity.apply(code.0);
        f32::from_bits(u32::from_be_bytes(bytes))
    }

    pub fn encode_str(&self, score: f64) -> String {
        self.encode(score).to_string()
    }

    pub fn decode_str(&self, text: &str) -> Result<f32> {
        Ok(self.decode(ScoreCode::parse(text)?))
    }
}

/// Clamp to the encodable domain and narrow to single precision.
///
/// `f64::max` would swallow NaN, so it is checked first. Negative zero
/// becomes positive zero so its sign bit never leaks into the code.
fn clamp_to_f32(score: f64) -> f32 {
    if score.is_nan() {
        f32::NAN
    } else if score > 0.0 {
        score as f32
    } else {
        0.0
    }
}

/// Encode with the persisted (descending) polarity.
///
/// ```
/// assert_eq!(justify_graph::codec::encode(1.0), "c07fffff");
/// assert_eq!(justify_graph::codec::encode(0.0), "ffffffff");
/// ```
pub fn encode(score: f64) -> String {
    ScoreCodec::descending().encode_str(score)
}

/// Inverse of [`encode`].
pub fn decode(code: &str) -> Result<f32> {
    ScoreCodec::descending().decode_str(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_codes() {
        // 1.0f32 = 0x3f800000, complemented = 0xc07fffff
        assert_eq!(encode(1.0), "c07fffff");
        assert_eq!(encode(0.0), "ffffffff");
        assert_eq!(ScoreCodec::ascending().encode_str(1.0), "3f800000");
        assert_eq!(ScoreCodec::ascending().encode_str(0.0), "00000000");
    }

    #[test]
    fn negative_input_clamps_to_zero() {
        assert_eq!(encode(-3.5), encode(0.0));
        assert_eq!(encode(-0.0), encode(0.0));
        assert_eq!(encode(f64::NEG_INFINITY), encode(0.0));
    }

    #[test]
    fn special_values_keep_their_class() {
        let inf = decode(&encode(f64::INFINITY)).unwrap();
        assert!(inf.is_infinite() && inf > 0.0);
        let nan = decode(&encode(f64::NAN)).unwrap();
        assert!(nan.is_nan());

        // Exponent all ones in both; mantissa zero only for infinity.
        let inf_bits = ScoreCodec::ascending().encode(f64::INFINITY).as_bytes();
        let nan_bits = ScoreCodec::ascending().encode(f64::NAN).as_bytes();
        assert_eq!(u32::from_be_bytes(inf_bits), 0x7f80_0000);
        assert_eq!(u32::from_be_bytes(nan_bits) & 0x7f80_0000, 0x7f80_0000);
        assert_ne!(u32::from_be_bytes(nan_bits) & 0x007f_ffff, 0);
    }

    #[test]
    fn round_trip_is_single_precision() {
        for x in [0.0, 0.1, 0.2667, 1.0, 1e-40, f32::MIN_POSITIVE as f64, 3.0e38, f32::MAX as f64] {
            assert_eq!(decode(&encode(x)).unwrap(), x as f32, "x = {x}");
        }
    }

    #[test]
    fn subnormal_round_trip() {
        let tiny = f32::from_bits(1) as f64;
        assert_eq!(decode(&encode(tiny)).unwrap(), f32::from_bits(1));
        assert!(encode(tiny) < encode(0.0));
    }

    #[test]
    fn malformed_codes_are_rejected() {
        assert!(decode("abc").is_err());
        assert!(decode("zzzzzzzz").is_err());
        assert!(decode("c07fffff00").is_err());
        assert!(decode("c07fffé").is_err());
    }

    #[test]
    fn byte_order_matches_text_order() {
        let codec = ScoreCodec::descending();
        let a = codec.encode(0.3);
        let b = codec.encode(0.7);
        assert_eq!(a.cmp(&b), a.to_string().cmp(&b.to_string()));
    }

    proptest! {
        #[test]
        fn ascending_codes_follow_score_order(a in 0.0f32..f32::MAX, b in 0.0f32..f32::MAX) {
            prop_assume!(a < b);
            let codec = ScoreCodec::ascending();
            prop_assert!(codec.encode_str(a as f64) < codec.encode_str(b as f64));
        }

        #[test]
        fn descending_codes_reverse_score_order(a in 0.0f32..f32::MAX, b in 0.0f32..f32::MAX) {
            prop_assume!(a < b);
            prop_assert!(encode(a as f64) > encode(b as f64));
        }

        #[test]
        fn decode_inverts_encode(x in 0.0f64..1.0e30) {
            prop_assert_eq!(decode(&encode(x)).unwrap(), x as f32);
            let codec = ScoreCodec::ascending();
            prop_assert_eq!(codec.decode(codec.encode(x)), x as f32);
        }
    }
}
