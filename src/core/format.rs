//! Purpose: Byte-order handling and primitive field decoding for VPF files.
//! Exports: `ByteOrder`, `decode_number`, `decode_i16`, `decode_i32`, `decode_f32`, `decode_f64`, `decode_text`.
//! Role: Stateless leaf of the codec; every multi-byte numeric read funnels through here.
//! Invariants: Raw bytes are normalized to most-significant-first before interpretation.
//! Invariants: Text is Latin-1; the literal `-` decodes to null.

use crate::core::error::{Error, ErrorKind};

/// Text value VPF uses to spell "no value" in character columns.
pub const STRING_NULL_VALUE: &str = "-";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize)]
pub enum ByteOrder {
    #[default]
    LittleEndianFirst,
    MostSignificantFirst,
}

impl ByteOrder {
    /// Parses the header marker; both cases are accepted.
    pub fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            b'L' | b'l' => Some(ByteOrder::LittleEndianFirst),
            b'M' | b'm' => Some(ByteOrder::MostSignificantFirst),
            _ => None,
        }
    }

    pub fn marker(self) -> char {
        match self {
            ByteOrder::LittleEndianFirst => 'L',
            ByteOrder::MostSignificantFirst => 'M',
        }
    }

    /// Returns `bytes` in most-significant-first order.
    pub fn normalize<const N: usize>(self, mut bytes: [u8; N]) -> [u8; N] {
        if self == ByteOrder::LittleEndianFirst {
            bytes.reverse();
        }
        bytes
    }
}

/// Decodes a signed integer of `bytes.len()` (1, 2 or 4) bytes.
pub fn decode_number(order: ByteOrder, bytes: &[u8]) -> Result<i64, Error> {
    match bytes.len() {
        1 => Ok(i64::from(bytes[0] as i8)),
        2 => Ok(i64::from(decode_i16(order, bytes)?)),
        4 => Ok(i64::from(decode_i32(order, bytes)?)),
        width => Err(Error::new(ErrorKind::Internal)
            .with_message(format!("unsupported integer width {width}"))),
    }
}

pub fn decode_i16(order: ByteOrder, bytes: &[u8]) -> Result<i16, Error> {
    Ok(i16::from_be_bytes(order.normalize(take::<2>(bytes)?)))
}

pub fn decode_i32(order: ByteOrder, bytes: &[u8]) -> Result<i32, Error> {
    Ok(i32::from_be_bytes(order.normalize(take::<4>(bytes)?)))
}

pub fn decode_f32(order: ByteOrder, bytes: &[u8]) -> Result<f32, Error> {
    Ok(f32::from_be_bytes(order.normalize(take::<4>(bytes)?)))
}

pub fn decode_f64(order: ByteOrder, bytes: &[u8]) -> Result<f64, Error> {
    Ok(f64::from_be_bytes(order.normalize(take::<8>(bytes)?)))
}

/// Latin-1 text with trailing padding removed; `None` for the null spelling.
pub fn decode_text(bytes: &[u8]) -> Option<String> {
    let text: String = bytes.iter().map(|&byte| byte as char).collect();
    let trimmed = text.trim_end_matches([' ', '\0']);
    if trimmed.trim() == STRING_NULL_VALUE {
        return None;
    }
    Some(trimmed.to_string())
}

fn take<const N: usize>(bytes: &[u8]) -> Result<[u8; N], Error> {
    if bytes.len() < N {
        return Err(Error::new(ErrorKind::Corrupt)
            .with_message(format!("expected {N} bytes, found {}", bytes.len())));
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    Ok(out)
}
