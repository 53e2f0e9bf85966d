//! Shared varint encoding and decoding utilities.
//!
//! This module provides functions for encoding and decoding variable-length integers
//! as used in the Avro binary format. Avro uses the same varint encoding as Protocol Buffers:
//! - Each byte has 7 bits of data and 1 continuation bit (MSB)
//! - The continuation bit indicates if more bytes follow
//! - Bytes are in little-endian order
//!
//! For signed integers, Avro uses zigzag encoding to map signed values to unsigned:
//! - 0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, 2 -> 4, ...
//! - Encoding formula: (n << 1) ^ (n >> 63)
//! - Decoding formula: (n >> 1) ^ -(n & 1)

use crate::error::DecodeError;
use crate::reader::cursor::Cursor;

/// Longest encoding of a 64-bit value.
pub const MAX_VARINT_LEN: usize = 10;

// ============================================================================
// Decoding Functions
// ============================================================================

/// Decode an unsigned variable-length integer.
///
/// # Errors
/// - `Truncated` at the varint's first byte if the input ends mid-varint
/// - `InvalidEncoding` if the varint runs past 10 bytes or its 10th byte
///   sets bits above bit 63
#[inline]
pub fn decode_varint(cursor: &mut Cursor<'_>) -> Result<u64, DecodeError> {
    let start = cursor.position();
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    loop {
        let byte = cursor.read_u8().map_err(|_| {
            let read = cursor.position() - start;
            DecodeError::truncated(start, read + 1, read)
        })?;

        // The 10th byte holds only bit 63; anything above 0x01 would be
        // dropped or continue past 64 bits
        if shift == 63 && byte > 0x01 {
            return Err(DecodeError::invalid(
                start,
                format!("varint longer than {} bytes or above u64::MAX", MAX_VARINT_LEN),
            ));
        }

        // Add the 7 data bits to the result
        result |= ((byte & 0x7F) as u64) << shift;

        // Check if this is the last byte (MSB is 0)
        if byte & 0x80 == 0 {
            return Ok(result);
        }

        shift += 7;
    }
}

/// Decode a signed variable-length integer (zigzag encoded).
#[inline]
pub fn decode_zigzag(cursor: &mut Cursor<'_>) -> Result<i64, DecodeError> {
    let unsigned = decode_varint(cursor)?;
    // Zigzag decode: (n >> 1) ^ -(n & 1)
    Ok(((unsigned >> 1) as i64) ^ (-((unsigned & 1) as i64)))
}

// ============================================================================
// Encoding Functions
// ============================================================================

/// Append an unsigned variable-length integer to `out`.
#[inline]
pub fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80; // Set continuation bit
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Append a zigzag-encoded signed integer to `out`.
#[inline]
pub fn write_zigzag(out: &mut Vec<u8>, value: i64) {
    // Zigzag encode: (n << 1) ^ (n >> 63)
    write_varint(out, ((value << 1) ^ (value >> 63)) as u64);
}

/// Encode an unsigned integer as a variable-length integer.
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_VARINT_LEN);
    write_varint(&mut out, value);
    out
}

/// Encode a signed integer as a zigzag-encoded variable-length integer.
pub fn encode_zigzag(value: i64) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_VARINT_LEN);
    write_zigzag(&mut out, value);
    out
}
