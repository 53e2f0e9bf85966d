//! Hex transport encoding of payloads.
//!
//! Hosts hand binary payloads over as hex text. Decoding is
//! case-insensitive and ignores surrounding ASCII whitespace.

use crate::error::InputError;

/// Decode hex text into bytes.
///
/// # Errors
/// - `InvalidDigit` for the first character that is not a hex digit; `index`
///   counts characters of `text` as given, leading whitespace included
/// - `OddLength` if the digit count is odd
pub fn decode_hex(text: &str) -> Result<Vec<u8>, InputError> {
    let is_space = |c: char| c.is_ascii_whitespace();
    let leading = text.len() - text.trim_start_matches(is_space).len();
    let digits = text.trim_matches(is_space);

    if let Some((index, character)) = digits
        .chars()
        .enumerate()
        .find(|(_, c)| !c.is_ascii_hexdigit())
    {
        return Err(InputError::InvalidDigit {
            character,
            index: leading + index,
        });
    }

    if digits.len() % 2 != 0 {
        return Err(InputError::OddLength {
            length: digits.len(),
        });
    }

    hex::decode(digits).map_err(|err| match err {
        hex::FromHexError::InvalidHexCharacter { c, index } => InputError::InvalidDigit {
            character: c,
            index: leading + index,
        },
        _ => InputError::OddLength {
            length: digits.len(),
        },
    })
}

/// Encode bytes as lowercase hex text.
pub fn encode_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}
