//! Weight-request protocol framing.
//!
//! The host sends [`REQUEST_WEIGHT`]; the scale answers with at most
//! [`REPLY_WINDOW`] bytes shaped `<lead><weight><trail>`. A reply counts as
//! well-formed when its trimmed text has at least [`MIN_REPLY_CHARS`]
//! characters. No checksum or strict framing is applied.
use std::fmt;

/// Single-byte weight request (ENQ).
pub const REQUEST_WEIGHT: u8 = 0x05;
/// Maximum number of reply bytes read per request.
pub const REPLY_WINDOW: usize = 7;
/// Minimum trimmed reply length: one lead char, one digit, one trail char.
pub const MIN_REPLY_CHARS: usize = 3;
/// Text shown when a reply cannot be read as a weight.
pub const UNAVAILABLE: &str = "---";

/// Weight field extracted from one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightText {
    Value(String),
    Unavailable,
}

impl WeightText {
    pub fn as_str(&self) -> &str {
        match self {
            WeightText::Value(v) => v,
            WeightText::Unavailable => UNAVAILABLE,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, WeightText::Value(_))
    }
}

impl fmt::Display for WeightText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whitespace for trimming: Unicode white space plus the ASCII information
/// separators FS/GS/RS/US (0x1C..=0x1F), which scales may use as padding.
fn is_padding(c: char) -> bool {
    c.is_whitespace() || ('\x1c'..='\x1f').contains(&c)
}

/// Decode reply bytes as UTF-8, dropping invalid sequences, and trim padding.
pub fn decode_reply(payload: &[u8]) -> String {
    let mut text = String::with_capacity(payload.len());
    for chunk in payload.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text.trim_matches(is_padding).to_string()
}

/// Whether `payload` is long enough to count as a live scale answering.
pub fn is_confirmation(payload: &[u8]) -> bool {
    decode_reply(payload).chars().count() >= MIN_REPLY_CHARS
}

/// Extract the weight: the trimmed text minus its first and last characters.
pub fn parse_weight(payload: &[u8]) -> WeightText {
    let text = decode_reply(payload);
    if text.chars().count() < MIN_REPLY_CHARS {
        return WeightText::Unavailable;
    }
    let mut chars = text.chars();
    chars.next();
    chars.next_back();
    WeightText::Value(chars.as_str().to_string())
}
