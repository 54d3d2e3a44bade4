//! Conversion between human text and the contract's word representation.
//!
//! A word is the `0x`-prefixed hexadecimal rendering of a byte string. Text
//! arguments are passed to the contract as words and text results come back
//! as words. Numeric arguments never go through this module: they are handed
//! to the CLI as decimal tokens.

/// Prefix marking a hexadecimal word.
pub const WORD_PREFIX: &str = "0x";

/// Reasons a word cannot be turned back into text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("word has an odd number of hex digits ({0})")]
    OddLength(usize),
    #[error("word contains a non-hex character {character:?} at offset {index}")]
    InvalidHex { character: char, index: usize },
    #[error("word bytes are not valid UTF-8: {0}")]
    InvalidUtf8(String),
}

impl From<hex::FromHexError> for DecodeError {
    fn from(err: hex::FromHexError) -> Self {
        match err {
            hex::FromHexError::InvalidHexCharacter { c, index } => Self::InvalidHex {
                character: c,
                index,
            },
            // Length is checked before decoding, so only the odd case can remain.
            _ => Self::OddLength(0),
        }
    }
}

/// Encode text as a word: its UTF-8 bytes in lowercase hex behind `0x`.
pub fn encode_text(text: &str) -> String {
    format!("{WORD_PREFIX}{}", hex::encode(text.as_bytes()))
}

/// Decode a word back into text.
///
/// The `0x` prefix is optional. Callers are expected to fall back to showing
/// the raw word when this fails.
pub fn decode_word(word: &str) -> Result<String, DecodeError> {
    let digits = strip_prefix(word);

    if digits.len() % 2 != 0 {
        return Err(DecodeError::OddLength(digits.len()));
    }

    let bytes = hex::decode(digits)?;

    String::from_utf8(bytes).map_err(|e| DecodeError::InvalidUtf8(e.to_string()))
}

/// Render a numeric word in decimal, if it is a hexadecimal integer that fits.
///
/// Decimal tokens are returned unchanged.
pub fn decode_amount(word: &str) -> Option<String> {
    let word = word.trim();
    match word.strip_prefix(WORD_PREFIX) {
        Some(digits) if !digits.is_empty() => u128::from_str_radix(digits, 16)
            .ok()
            .map(|value| value.to_string()),
        Some(_) => None,
        None => word.parse::<u128>().ok().map(|value| value.to_string()),
    }
}

fn strip_prefix(word: &str) -> &str {
    let word = word.trim();
    word.strip_prefix(WORD_PREFIX)
        .or_else(|| word.strip_prefix("0X"))
        .unwrap_or(word)
}
