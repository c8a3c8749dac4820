//! Purpose: Column schema types for VPF table headers.
//! Exports: `FieldType`, `ElementCount`, `KeyType`, `ColumnDef`.
//! Role: Immutable description of one on-disk field, shared by header parsing and row decoding.
//! Invariants: A column's byte width is known only for fixed counts of fixed-size types.
//! Invariants: Unknown type codes are preserved rather than rejected.

use std::fmt;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FieldType {
    Text,
    TextLevel1,
    TextLevel2,
    TextLevel3,
    ShortFloat,
    LongFloat,
    ShortInteger,
    LongInteger,
    Null,
    TripletId,
    Coord2DFloat,
    Coord2DDouble,
    Coord3DFloat,
    Coord3DDouble,
    Date,
    Unknown(char),
}

impl FieldType {
    pub fn from_code(code: char) -> Self {
        match code {
            'T' => FieldType::Text,
            'L' => FieldType::TextLevel1,
            'N' => FieldType::TextLevel2,
            'M' => FieldType::TextLevel3,
            'F' => FieldType::ShortFloat,
            'R' => FieldType::LongFloat,
            'S' => FieldType::ShortInteger,
            'I' => FieldType::LongInteger,
            'X' => FieldType::Null,
            'K' => FieldType::TripletId,
            'C' => FieldType::Coord2DFloat,
            'B' => FieldType::Coord2DDouble,
            'Z' => FieldType::Coord3DFloat,
            'Y' => FieldType::Coord3DDouble,
            'D' => FieldType::Date,
            other => FieldType::Unknown(other),
        }
    }

    pub fn code(self) -> char {
        match self {
            FieldType::Text => 'T',
            FieldType::TextLevel1 => 'L',
            FieldType::TextLevel2 => 'N',
            FieldType::TextLevel3 => 'M',
            FieldType::ShortFloat => 'F',
            FieldType::LongFloat => 'R',
            FieldType::ShortInteger => 'S',
            FieldType::LongInteger => 'I',
            FieldType::Null => 'X',
            FieldType::TripletId => 'K',
            FieldType::Coord2DFloat => 'C',
            FieldType::Coord2DDouble => 'B',
            FieldType::Coord3DFloat => 'Z',
            FieldType::Coord3DDouble => 'Y',
            FieldType::Date => 'D',
            FieldType::Unknown(code) => code,
        }
    }

    /// Bytes per element; `None` for self-describing or unknown types.
    pub fn size(self) -> Option<usize> {
        match self {
            FieldType::Text
            | FieldType::TextLevel1
            | FieldType::TextLevel2
            | FieldType::TextLevel3 => Some(1),
            FieldType::ShortFloat => Some(4),
            FieldType::LongFloat => Some(8),
            FieldType::ShortInteger => Some(2),
            FieldType::LongInteger => Some(4),
            FieldType::Null => Some(0),
            FieldType::Coord2DFloat => Some(8),
            FieldType::Coord2DDouble => Some(16),
            FieldType::Coord3DFloat => Some(12),
            FieldType::Coord3DDouble => Some(24),
            FieldType::Date => Some(20),
            FieldType::TripletId | FieldType::Unknown(_) => None,
        }
    }

    pub fn is_text(self) -> bool {
        matches!(
            self,
            FieldType::Text | FieldType::TextLevel1 | FieldType::TextLevel2 | FieldType::TextLevel3
        )
    }

    pub fn is_coordinate(self) -> bool {
        matches!(
            self,
            FieldType::Coord2DFloat
                | FieldType::Coord2DDouble
                | FieldType::Coord3DFloat
                | FieldType::Coord3DDouble
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ElementCount {
    Fixed(u32),
    /// `*` on disk: each value is prefixed by its element count.
    Variable,
}

impl ElementCount {
    pub fn fixed(self) -> Option<u32> {
        match self {
            ElementCount::Fixed(count) => Some(count),
            ElementCount::Variable => None,
        }
    }
}

impl fmt::Display for ElementCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementCount::Fixed(count) => write!(f, "{count}"),
            ElementCount::Variable => f.write_str("*"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum KeyType {
    Primary,
    Unique,
    NonUnique,
    Foreign,
    #[default]
    None,
}

impl KeyType {
    pub fn from_code(code: char) -> Self {
        match code.to_ascii_uppercase() {
            'P' => KeyType::Primary,
            'U' => KeyType::Unique,
            'N' => KeyType::NonUnique,
            'F' => KeyType::Foreign,
            _ => KeyType::None,
        }
    }

    pub fn code(self) -> char {
        match self {
            KeyType::Primary => 'P',
            KeyType::Unique => 'U',
            KeyType::NonUnique => 'N',
            KeyType::Foreign => 'F',
            KeyType::None => '-',
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub field_type: FieldType,
    pub count: ElementCount,
    pub key_type: KeyType,
    pub description: String,
    pub value_description_table: Option<String>,
    pub thematic_index: Option<String>,
    pub narrative_table: Option<String>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, field_type: FieldType, count: ElementCount) -> Self {
        Self {
            name: name.into(),
            field_type,
            count,
            key_type: KeyType::None,
            description: String::new(),
            value_description_table: None,
            thematic_index: None,
            narrative_table: None,
        }
    }

    /// On-disk width of one value, when it does not vary per row.
    pub fn column_size(&self) -> Option<usize> {
        let count = self.count.fixed()? as usize;
        Some(self.field_type.size()? * count)
    }

    pub fn is_variable(&self) -> bool {
        self.column_size().is_none()
    }
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "{:<16} {} {:>5} {} {:<55} {} {} {}",
            self.name,
            self.field_type,
            self.count.to_string(),
            self.key_type.code(),
            self.description,
            dash(&self.value_description_table),
            dash(&self.thematic_index),
            dash(&self.narrative_table),
        )
    }
}
