//! Purpose: Decode the three VPF header shapes (table, variable index, spatial index).
//! Exports: `VpfHeader`, `TableHeader`, `VariableIndexHeader`, `SpatialIndexHeader`, `BoundingBox`.
//! Role: Read once at stream open; immutable afterwards.
//! Invariants: `length()` is the full on-disk header size, so data starts at `length()`.
//! Invariants: `record_size()` is `Some` only when every record has the same width.
//! Invariants: Table header text is Latin-1; `-` spells an absent table name.

use std::io::Read;

use crate::core::column::{ColumnDef, ElementCount, FieldType, KeyType};
use crate::core::error::{Error, ErrorKind, io_error};
use crate::core::format::{self, ByteOrder, STRING_NULL_VALUE};

const RECORD_SEPARATOR: u8 = b';';
const COLUMN_SEPARATOR: u8 = b':';
const ELEMENT_SEPARATOR: u8 = b',';
const NAME_SEPARATOR: u8 = b'=';

pub const VARIABLE_INDEX_HEADER_LEN: usize = 8;
pub const VARIABLE_INDEX_RECORD_LEN: usize = 8;
pub const SPATIAL_INDEX_HEADER_LEN: usize = 24;

/// Shape shared by every header: its own on-disk length and the width of one record.
pub trait VpfHeader {
    fn length(&self) -> u64;
    fn record_size(&self) -> Option<u64>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableHeader {
    stored_length: u32,
    pub byte_order: ByteOrder,
    pub description: String,
    pub narrative_table: Option<String>,
    pub columns: Vec<ColumnDef>,
}

impl TableHeader {
    /// Reads the length prefix and header text from the start of a table file.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let mut prefix = [0u8; 5];
        reader.read_exact(&mut prefix).map_err(io_error)?;
        // The marker follows the length, yet the length is written in the marked order.
        let order = ByteOrder::from_marker(prefix[4]).unwrap_or_default();
        let stored = format::decode_i32(order, &prefix[..4])?;
        if stored < 1 {
            return Err(Error::new(ErrorKind::Corrupt)
                .with_message(format!("invalid table header length {stored}")));
        }

        let mut body = Vec::with_capacity(stored.min(64 * 1024) as usize);
        body.push(prefix[4]);
        reader
            .take(stored as u64 - 1)
            .read_to_end(&mut body)
            .map_err(io_error)?;
        if body.len() != stored as usize {
            return Err(Error::new(ErrorKind::Corrupt).with_message(format!(
                "table header declares {stored} bytes, file holds {}",
                body.len()
            )));
        }
        Self::parse(&body)
    }

    /// Parses header text that follows the 4-byte length field.
    pub fn parse(body: &[u8]) -> Result<Self, Error> {
        let mut parser = HeaderParser::new(body);

        let byte_order = match body.first().and_then(|&marker| ByteOrder::from_marker(marker)) {
            Some(order) => {
                parser.pos = 1;
                order
            }
            None => ByteOrder::default(),
        };
        parser.expect(RECORD_SEPARATOR)?;

        let description = parser.read_until(&[RECORD_SEPARATOR])?.trim().to_string();
        parser.expect(RECORD_SEPARATOR)?;
        let narrative_table = optional_name(&parser.read_until(&[RECORD_SEPARATOR])?);
        parser.expect(RECORD_SEPARATOR)?;

        let mut columns = Vec::new();
        loop {
            parser.skip_whitespace();
            match parser.peek() {
                Some(RECORD_SEPARATOR) => break,
                Some(_) => columns.push(parser.read_column()?),
                None => {
                    return Err(Error::new(ErrorKind::Corrupt)
                        .with_message("table header ended before the column list terminator"));
                }
            }
        }

        Ok(Self {
            stored_length: body.len() as u32,
            byte_order,
            description,
            narrative_table,
            columns,
        })
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn has_variable_records(&self) -> bool {
        self.record_size().is_none()
    }
}

impl VpfHeader for TableHeader {
    fn length(&self) -> u64 {
        u64::from(self.stored_length) + 4
    }

    fn record_size(&self) -> Option<u64> {
        self.columns.iter().try_fold(0u64, |total, column| {
            column.column_size().map(|size| total + size as u64)
        })
    }
}

fn optional_name(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value == STRING_NULL_VALUE {
        return None;
    }
    Some(value.to_string())
}

struct HeaderParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> HeaderParser<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn expect(&mut self, separator: u8) -> Result<(), Error> {
        match self.peek() {
            Some(byte) if byte == separator => {
                self.pos += 1;
                Ok(())
            }
            found => Err(Error::new(ErrorKind::Corrupt)
                .with_message(format!(
                    "expected '{}' in table header, found {}",
                    separator as char,
                    found.map_or_else(|| "end of header".to_string(), |b| format!("'{}'", b as char))
                ))
                .with_offset(self.pos as u64 + 4)),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    /// Text up to (not including) the first of `stops`; the stop byte is left unread.
    fn read_until(&mut self, stops: &[u8]) -> Result<String, Error> {
        let rest = &self.bytes[self.pos..];
        let Some(len) = rest.iter().position(|byte| stops.contains(byte)) else {
            return Err(Error::new(ErrorKind::Corrupt)
                .with_message("unterminated text in table header")
                .with_offset(self.pos as u64 + 4));
        };
        self.pos += len;
        Ok(rest[..len].iter().map(|&byte| byte as char).collect())
    }

    fn read_column(&mut self) -> Result<ColumnDef, Error> {
        let start = self.pos as u64 + 4;
        let name = self.read_until(&[NAME_SEPARATOR, COLUMN_SEPARATOR, RECORD_SEPARATOR])?;
        self.expect(NAME_SEPARATOR)?;
        let attributes = self.read_until(&[COLUMN_SEPARATOR, RECORD_SEPARATOR])?;
        if self.peek() == Some(COLUMN_SEPARATOR) {
            self.pos += 1;
        }

        let corrupt = |message: String| {
            Error::new(ErrorKind::Corrupt)
                .with_message(message)
                .with_offset(start)
        };
        let name = name.trim().to_string();
        let mut parts = attributes.split(ELEMENT_SEPARATOR as char).map(str::trim);

        let field_type = parts
            .next()
            .and_then(|code| code.chars().next())
            .map(FieldType::from_code)
            .ok_or_else(|| corrupt(format!("column {name} has no type code")))?;
        let count = match parts.next() {
            Some("*") => ElementCount::Variable,
            Some(raw) => raw
                .parse::<u32>()
                .map(ElementCount::Fixed)
                .map_err(|_| corrupt(format!("column {name} has invalid element count {raw:?}")))?,
            None => return Err(corrupt(format!("column {name} has no element count"))),
        };
        let key_type = parts
            .next()
            .and_then(|code| code.chars().next())
            .map(KeyType::from_code)
            .unwrap_or_default();
        let description = parts.next().unwrap_or_default().to_string();
        let value_description_table = parts.next().and_then(optional_name);
        let thematic_index = parts.next().and_then(optional_name);
        let narrative_table = parts.next().and_then(optional_name);

        Ok(ColumnDef {
            name,
            field_type,
            count,
            key_type,
            description,
            value_description_table,
            thematic_index,
            narrative_table,
        })
    }
}

/// Header of a variable-length index file: entry count plus the indexed table's header size.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize)]
pub struct VariableIndexHeader {
    pub entries: i32,
    pub header_length: i32,
}

impl VariableIndexHeader {
    pub fn decode(order: ByteOrder, buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < VARIABLE_INDEX_HEADER_LEN {
            return Err(Error::new(ErrorKind::Corrupt).with_message("variable index header too small"));
        }
        Ok(Self {
            entries: format::decode_i32(order, &buf[0..4])?,
            header_length: format::decode_i32(order, &buf[4..8])?,
        })
    }
}

impl VpfHeader for VariableIndexHeader {
    fn length(&self) -> u64 {
        VARIABLE_INDEX_HEADER_LEN as u64
    }

    fn record_size(&self) -> Option<u64> {
        Some(VARIABLE_INDEX_RECORD_LEN as u64)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct BoundingBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl BoundingBox {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct SpatialIndexHeader {
    pub primitive_count: i32,
    pub bounds: BoundingBox,
    pub node_count: i32,
}

impl SpatialIndexHeader {
    pub fn decode(order: ByteOrder, buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < SPATIAL_INDEX_HEADER_LEN {
            return Err(Error::new(ErrorKind::Corrupt).with_message("spatial index header too small"));
        }
        Ok(Self {
            primitive_count: format::decode_i32(order, &buf[0..4])?,
            bounds: BoundingBox {
                xmin: format::decode_f32(order, &buf[4..8])?,
                ymin: format::decode_f32(order, &buf[8..12])?,
                xmax: format::decode_f32(order, &buf[12..16])?,
                ymax: format::decode_f32(order, &buf[16..20])?,
            },
            node_count: format::decode_i32(order, &buf[20..24])?,
        })
    }
}

impl VpfHeader for SpatialIndexHeader {
    fn length(&self) -> u64 {
        SPATIAL_INDEX_HEADER_LEN as u64
    }

    fn record_size(&self) -> Option<u64> {
        None
    }
}
