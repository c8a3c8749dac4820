//! Purpose: Decode one logical row of a VPF table into typed fields.
//! Exports: `Field`, `FieldValue`, `Row`, `RowIndex`, `decode_row`.
//! Role: Called by table streams at the current file position; owns no file state.
//! Invariants: Fields appear in header column order; unknown type codes are omitted.
//! Invariants: Variable-count columns read an i32 element count in the table byte order.
//! Invariants: Lenient decoding records notices on the row instead of failing.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;

use time::{OffsetDateTime, PrimitiveDateTime};

use crate::core::column::{ColumnDef, ElementCount, FieldType};
use crate::core::error::{Error, ErrorKind, io_error};
use crate::core::format::{self, ByteOrder};
use crate::core::header::TableHeader;
use crate::core::notice::{DecodeMode, DecodeNotice, NoticeKind};
use crate::core::triplet::{self, TripletId};

#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    ShortFloat(f32),
    LongFloat(f64),
    ShortInt(i16),
    LongInt(i32),
    Null,
    TripletId(TripletId),
    Coord2F(Vec<[f32; 2]>),
    Coord2D(Vec<[f64; 2]>),
    Coord3F(Vec<[f32; 3]>),
    Coord3D(Vec<[f64; 3]>),
    Date(String),
    /// Several scalar elements from a column whose count is not 1.
    Array(Vec<FieldValue>),
}

/// One decoded value together with the type code it was read as.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub field_type: FieldType,
    pub value: FieldValue,
}

impl Field {
    pub fn new(field_type: FieldType, value: FieldValue) -> Self {
        Self { field_type, value }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, FieldValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.value {
            FieldValue::ShortInt(value) => Some(i64::from(value)),
            FieldValue::LongInt(value) => Some(i64::from(value)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            FieldValue::ShortFloat(value) => Some(f64::from(value)),
            FieldValue::LongFloat(value) => Some(value),
            FieldValue::ShortInt(value) => Some(f64::from(value)),
            FieldValue::LongInt(value) => Some(f64::from(value)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            FieldValue::Text(text) | FieldValue::Date(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_triplet(&self) -> Option<&TripletId> {
        match &self.value {
            FieldValue::TripletId(triplet) => Some(triplet),
            _ => None,
        }
    }

    /// Coordinates widened to f64 with z = 0 for 2D values.
    pub fn as_coordinates(&self) -> Option<Vec<[f64; 3]>> {
        let points = match &self.value {
            FieldValue::Coord2F(points) => points
                .iter()
                .map(|[x, y]| [f64::from(*x), f64::from(*y), 0.0])
                .collect(),
            FieldValue::Coord2D(points) => points.iter().map(|[x, y]| [*x, *y, 0.0]).collect(),
            FieldValue::Coord3F(points) => points
                .iter()
                .map(|[x, y, z]| [f64::from(*x), f64::from(*y), f64::from(*z)])
                .collect(),
            FieldValue::Coord3D(points) => points.clone(),
            _ => return None,
        };
        Some(points)
    }

    /// Parses a `D` field; accepts dates with or without time and UTC offset.
    pub fn as_datetime(&self) -> Option<OffsetDateTime> {
        let FieldValue::Date(text) = &self.value else {
            return None;
        };
        parse_vpf_date(text.trim())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) | FieldValue::Date(text) => f.write_str(text),
            FieldValue::ShortFloat(value) => write!(f, "{value}"),
            FieldValue::LongFloat(value) => write!(f, "{value}"),
            FieldValue::ShortInt(value) => write!(f, "{value}"),
            FieldValue::LongInt(value) => write!(f, "{value}"),
            FieldValue::Null => f.write_str("-"),
            FieldValue::TripletId(triplet) => write!(f, "{triplet}"),
            FieldValue::Coord2F(points) => write_points(f, points),
            FieldValue::Coord2D(points) => write_points(f, points),
            FieldValue::Coord3F(points) => write_points(f, points),
            FieldValue::Coord3D(points) => write_points(f, points),
            FieldValue::Array(values) => {
                let rendered = values.iter().map(ToString::to_string).collect::<Vec<_>>();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}

fn write_points<T: fmt::Display, const N: usize>(
    f: &mut fmt::Formatter<'_>,
    points: &[[T; N]],
) -> fmt::Result {
    let rendered = points
        .iter()
        .map(|point| {
            let parts = point.iter().map(ToString::to_string).collect::<Vec<_>>();
            format!("({})", parts.join(" "))
        })
        .collect::<Vec<_>>();
    write!(f, "[{}]", rendered.join(", "))
}

fn parse_vpf_date(text: &str) -> Option<OffsetDateTime> {
    let with_offset = "[year][month][day][hour][minute][second][offset_hour sign:mandatory][offset_minute]";
    let local = "[year][month][day][hour][minute][second]";
    let date_only = "[year][month][day]";

    if let Ok(items) = time::format_description::parse(with_offset) {
        if let Ok(value) = OffsetDateTime::parse(text, &items) {
            return Some(value);
        }
    }
    if let Ok(items) = time::format_description::parse(local) {
        if let Ok(value) = PrimitiveDateTime::parse(text, &items) {
            return Some(value.assume_utc());
        }
    }
    let items = time::format_description::parse(date_only).ok()?;
    let date = time::Date::parse(text, &items).ok()?;
    Some(date.midnight().assume_utc())
}

/// One decoded table record: fields in column order plus a by-name lookup.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    fields: Vec<Field>,
    names: Vec<String>,
    lookup: HashMap<String, usize>,
    notices: Vec<DecodeNotice>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, field: Field) {
        let name = name.into();
        self.lookup.entry(name.clone()).or_insert(self.fields.len());
        self.names.push(name);
        self.fields.push(field);
    }

    /// Looks a field up by column name (`&str`) or position (`usize`).
    pub fn get<I: RowIndex>(&self, index: I) -> Option<&Field> {
        index.index_into(self)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.fields.iter())
    }

    pub fn notices(&self) -> &[DecodeNotice] {
        &self.notices
    }
}

impl<I: RowIndex> std::ops::Index<I> for Row {
    type Output = Field;

    fn index(&self, index: I) -> &Field {
        match index.index_into(self) {
            Some(field) => field,
            None => panic!("no field {} in row", index.describe()),
        }
    }
}

mod private {
    pub trait Sealed {}
    impl Sealed for usize {}
    impl Sealed for str {}
    impl Sealed for String {}
    impl<T: ?Sized + Sealed> Sealed for &T {}
}

/// Types usable as a row lookup key, in the manner of `serde_json::value::Index`.
pub trait RowIndex: private::Sealed {
    #[doc(hidden)]
    fn index_into<'r>(&self, row: &'r Row) -> Option<&'r Field>;
    #[doc(hidden)]
    fn describe(&self) -> String;
}

impl RowIndex for usize {
    fn index_into<'r>(&self, row: &'r Row) -> Option<&'r Field> {
        row.fields.get(*self)
    }

    fn describe(&self) -> String {
        format!("at index {self}")
    }
}

impl RowIndex for str {
    fn index_into<'r>(&self, row: &'r Row) -> Option<&'r Field> {
        row.lookup.get(self).map(|&position| &row.fields[position])
    }

    fn describe(&self) -> String {
        format!("named {self:?}")
    }
}

impl RowIndex for String {
    fn index_into<'r>(&self, row: &'r Row) -> Option<&'r Field> {
        self.as_str().index_into(row)
    }

    fn describe(&self) -> String {
        self.as_str().describe()
    }
}

impl<T: ?Sized + RowIndex> RowIndex for &T {
    fn index_into<'r>(&self, row: &'r Row) -> Option<&'r Field> {
        (**self).index_into(row)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Decodes the row starting at the reader's current position.
pub fn decode_row<R: Read>(
    reader: &mut R,
    header: &TableHeader,
    mode: DecodeMode,
) -> Result<Row, Error> {
    let order = header.byte_order;
    let mut row = Row::new();
    for column in &header.columns {
        match decode_field(reader, order, column)? {
            Some(field) => row.push(column.name.clone(), field),
            None => {
                let notice = DecodeNotice::new(
                    NoticeKind::UnknownFieldType,
                    format!("unknown field type '{}'", column.field_type.code()),
                )
                .with_column(column.name.clone());
                if mode == DecodeMode::Strict {
                    return Err(notice.into_error());
                }
                tracing::warn!(column = %column.name, code = %column.field_type, "skipping column with unknown field type");
                row.notices.push(notice);
            }
        }
    }

    for field in &row.fields {
        for notice in triplet_notices(&field.value) {
            if mode == DecodeMode::Strict {
                return Err(notice.into_error());
            }
            row.notices.push(notice);
        }
    }
    Ok(row)
}

fn triplet_notices(value: &FieldValue) -> Vec<DecodeNotice> {
    match value {
        FieldValue::TripletId(triplet) => triplet.notices(),
        FieldValue::Array(values) => values.iter().flat_map(triplet_notices).collect(),
        _ => Vec::new(),
    }
}

/// `None` when the column's type code is not recognized; nothing is consumed then.
fn decode_field<R: Read>(
    reader: &mut R,
    order: ByteOrder,
    column: &ColumnDef,
) -> Result<Option<Field>, Error> {
    let field_type = column.field_type;
    if let FieldType::Unknown(_) = field_type {
        return Ok(None);
    }

    let count = match column.count {
        ElementCount::Fixed(count) => count as usize,
        ElementCount::Variable => read_variable_count(reader, order, column)?,
    };

    let value = match field_type {
        FieldType::Text | FieldType::TextLevel1 | FieldType::TextLevel2 | FieldType::TextLevel3 => {
            let bytes = read_bytes(reader, count)?;
            match format::decode_text(&bytes) {
                Some(text) => FieldValue::Text(text),
                None => FieldValue::Null,
            }
        }
        FieldType::Null => FieldValue::Null,
        FieldType::Coord2DFloat => {
            let mut points = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                points.push([read_f32(reader, order)?, read_f32(reader, order)?]);
            }
            FieldValue::Coord2F(points)
        }
        FieldType::Coord2DDouble => {
            let mut points = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                points.push([read_f64(reader, order)?, read_f64(reader, order)?]);
            }
            FieldValue::Coord2D(points)
        }
        FieldType::Coord3DFloat => {
            let mut points = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                points.push([
                    read_f32(reader, order)?,
                    read_f32(reader, order)?,
                    read_f32(reader, order)?,
                ]);
            }
            FieldValue::Coord3F(points)
        }
        FieldType::Coord3DDouble => {
            let mut points = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                points.push([
                    read_f64(reader, order)?,
                    read_f64(reader, order)?,
                    read_f64(reader, order)?,
                ]);
            }
            FieldValue::Coord3D(points)
        }
        scalar => {
            let mut values = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                values.push(read_scalar(reader, order, scalar)?);
            }
            if count == 1 {
                values.pop().unwrap_or(FieldValue::Null)
            } else {
                FieldValue::Array(values)
            }
        }
    };
    Ok(Some(Field::new(field_type, value)))
}

fn read_variable_count<R: Read>(
    reader: &mut R,
    order: ByteOrder,
    column: &ColumnDef,
) -> Result<usize, Error> {
    let count = format::decode_i32(order, &read_array::<R, 4>(reader)?)?;
    usize::try_from(count).map_err(|_| {
        Error::new(ErrorKind::Corrupt).with_message(format!(
            "negative element count {count} in column {}",
            column.name
        ))
    })
}

fn read_scalar<R: Read>(
    reader: &mut R,
    order: ByteOrder,
    field_type: FieldType,
) -> Result<FieldValue, Error> {
    let value = match field_type {
        FieldType::ShortFloat => FieldValue::ShortFloat(read_f32(reader, order)?),
        FieldType::LongFloat => FieldValue::LongFloat(read_f64(reader, order)?),
        FieldType::ShortInteger => {
            FieldValue::ShortInt(format::decode_i16(order, &read_array::<R, 2>(reader)?)?)
        }
        FieldType::LongInteger => {
            FieldValue::LongInt(format::decode_i32(order, &read_array::<R, 4>(reader)?)?)
        }
        FieldType::TripletId => {
            let [definition] = read_array::<R, 1>(reader)?;
            let mut raw = vec![definition];
            // Missing sub-field bytes are left for the triplet decoder to report.
            let len = triplet::calculate_data_size(definition) as u64;
            reader.by_ref().take(len).read_to_end(&mut raw).map_err(io_error)?;
            FieldValue::TripletId(TripletId::from_bytes(raw))
        }
        FieldType::Date => {
            let bytes = read_array::<R, 20>(reader)?;
            match format::decode_text(&bytes) {
                Some(text) if !text.trim().is_empty() => FieldValue::Date(text),
                _ => FieldValue::Null,
            }
        }
        other => {
            return Err(Error::new(ErrorKind::Internal)
                .with_message(format!("field type '{other}' is not a scalar")));
        }
    };
    Ok(value)
}

fn read_f32<R: Read>(reader: &mut R, order: ByteOrder) -> Result<f32, Error> {
    format::decode_f32(order, &read_array::<R, 4>(reader)?)
}

fn read_f64<R: Read>(reader: &mut R, order: ByteOrder) -> Result<f64, Error> {
    format::decode_f64(order, &read_array::<R, 8>(reader)?)
}

fn read_array<R: Read, const N: usize>(reader: &mut R) -> Result<[u8; N], Error> {
    let mut out = [0u8; N];
    reader.read_exact(&mut out).map_err(io_error)?;
    Ok(out)
}

fn read_bytes<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>, Error> {
    let mut out = Vec::with_capacity(len.min(64 * 1024));
    reader.take(len as u64).read_to_end(&mut out).map_err(io_error)?;
    if out.len() != len {
        return Err(Error::new(ErrorKind::Corrupt)
            .with_message(format!("record ends after {} of {len} bytes", out.len())));
    }
    Ok(out)
}
