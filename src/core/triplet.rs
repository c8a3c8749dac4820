// Triplet identifier codec: a definition byte followed by up to three little-endian ids.
use std::fmt;

use crate::core::error::Error;
use crate::core::notice::{DecodeNotice, NoticeKind};

/// Largest triplet on disk: definition byte plus three 4-byte ids.
pub const MAX_TRIPLET_LEN: usize = 13;

const WIDTHS: [usize; 4] = [0, 1, 2, 4];
const NAMES: [&str; 3] = ["id", "tile id", "next id"];

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TripletParts {
    pub id: Option<u32>,
    pub tile_id: Option<u32>,
    pub next_id: Option<u32>,
}

/// Byte widths of (id, tile id, next id) declared by a definition byte.
pub fn sub_field_widths(definition: u8) -> [usize; 3] {
    [
        WIDTHS[((definition >> 6) & 3) as usize],
        WIDTHS[((definition >> 4) & 3) as usize],
        WIDTHS[((definition >> 2) & 3) as usize],
    ]
}

/// Number of bytes that follow the definition byte.
pub fn calculate_data_size(definition: u8) -> usize {
    sub_field_widths(definition).iter().sum()
}

/// Lenient decode: missing bytes degrade the affected sub-field to 0 and are logged.
pub fn decode_triplet(bytes: &[u8]) -> TripletParts {
    let (parts, notices) = decode_triplet_with_notices(bytes);
    for notice in &notices {
        tracing::warn!(message = %notice.message, "degraded triplet id");
    }
    parts
}

/// Strict decode: the first missing byte is a `Corrupt` error.
pub fn try_decode_triplet(bytes: &[u8]) -> Result<TripletParts, Error> {
    let (parts, notices) = decode_triplet_with_notices(bytes);
    match notices.into_iter().next() {
        Some(notice) => Err(notice.into_error()),
        None => Ok(parts),
    }
}

pub fn decode_triplet_with_notices(bytes: &[u8]) -> (TripletParts, Vec<DecodeNotice>) {
    let mut notices = Vec::new();
    let Some((&definition, data)) = bytes.split_first() else {
        notices.push(DecodeNotice::new(
            NoticeKind::TruncatedTriplet,
            "triplet id has no definition byte",
        ));
        return (TripletParts::default(), notices);
    };

    let mut values = [None; 3];
    let mut cursor = 0usize;
    for (slot, width) in sub_field_widths(definition).into_iter().enumerate() {
        if width == 0 {
            continue;
        }
        let value = match data.get(cursor..cursor + width) {
            Some(chunk) => chunk
                .iter()
                .enumerate()
                .fold(0u32, |acc, (i, &byte)| acc | (u32::from(byte) << (8 * i))),
            None => {
                notices.push(DecodeNotice::new(
                    NoticeKind::TruncatedTriplet,
                    format!(
                        "triplet {} needs {width} bytes at offset {}, only {} available",
                        NAMES[slot],
                        cursor + 1,
                        data.len().saturating_sub(cursor)
                    ),
                ));
                0
            }
        };
        values[slot] = Some(value);
        cursor += width;
    }

    let parts = TripletParts {
        id: values[0],
        tile_id: values[1],
        next_id: values[2],
    };
    (parts, notices)
}

/// Raw triplet bytes as read from a `K` column; decoded on demand.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TripletId {
    raw: Vec<u8>,
}

impl TripletId {
    pub fn from_bytes(raw: Vec<u8>) -> Self {
        Self { raw }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn definition(&self) -> Option<u8> {
        self.raw.first().copied()
    }

    pub fn parts(&self) -> TripletParts {
        decode_triplet(&self.raw)
    }

    pub fn try_parts(&self) -> Result<TripletParts, Error> {
        try_decode_triplet(&self.raw)
    }

    pub fn notices(&self) -> Vec<DecodeNotice> {
        decode_triplet_with_notices(&self.raw).1
    }

    pub fn id(&self) -> Option<u32> {
        self.parts().id
    }

    pub fn tile_id(&self) -> Option<u32> {
        self.parts().tile_id
    }

    pub fn next_id(&self) -> Option<u32> {
        self.parts().next_id
    }
}

impl fmt::Display for TripletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self.parts();
        let rendered = [parts.id, parts.tile_id, parts.next_id]
            .into_iter()
            .flatten()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join("%");
        f.write_str(rendered.trim())
    }
}
