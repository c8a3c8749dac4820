//! Purpose: Variable-length index files that locate records of variable-width tables.
//! Exports: `VariableIndexStream`, `VariableIndexEntry`, `IndexOptions`, `variable_index_name`, `variable_index_path`.
//! Role: Companion stream opened by `TableStream`; also usable on its own.
//! Invariants: Entries are fixed 8-byte `(offset, size)` pairs after an 8-byte header.
//! Invariants: Entries are read one at a time on demand; the index is never loaded whole.

use std::path::{Path, PathBuf};

use crate::core::error::Error;
use crate::core::format::{self, ByteOrder};
use crate::core::header::{VARIABLE_INDEX_HEADER_LEN, VariableIndexHeader};
use crate::core::stream::{TableFile, VpfStream};

/// Location of one variable-length record in its table file.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize)]
pub struct VariableIndexEntry {
    pub offset: i32,
    /// Record length in bytes; kept for callers, positioning only uses `offset`.
    pub size: i32,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct IndexOptions {
    pub byte_order: ByteOrder,
}

impl IndexOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }
}

#[derive(Debug)]
pub struct VariableIndexStream {
    file: TableFile,
    header: VariableIndexHeader,
    byte_order: ByteOrder,
}

impl VariableIndexStream {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::open_with(path, IndexOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: IndexOptions) -> Result<Self, Error> {
        let mut file = TableFile::open(path)?;
        let buf = file.read_array::<VARIABLE_INDEX_HEADER_LEN>()?;
        let header = VariableIndexHeader::decode(options.byte_order, &buf)
            .map_err(|err| file.annotate(err))?;
        tracing::debug!(
            path = %file.path().display(),
            entries = header.entries,
            "open variable index"
        );
        Ok(Self {
            file,
            header,
            byte_order: options.byte_order,
        })
    }

    pub fn close(self) -> Result<(), Error> {
        self.file.close()
    }
}

impl VpfStream for VariableIndexStream {
    type Header = VariableIndexHeader;
    type Row = VariableIndexEntry;

    fn header(&self) -> &VariableIndexHeader {
        &self.header
    }

    fn file(&self) -> &TableFile {
        &self.file
    }

    fn file_mut(&mut self) -> &mut TableFile {
        &mut self.file
    }

    fn read_row(&mut self) -> Result<Option<VariableIndexEntry>, Error> {
        if self.file.at_end() {
            return Ok(None);
        }
        let buf = self.file.read_array::<8>()?;
        let decode = |bytes: &[u8]| format::decode_i32(self.byte_order, bytes);
        let entry = VariableIndexEntry {
            offset: decode(&buf[0..4]).map_err(|err| self.file.annotate(err))?,
            size: decode(&buf[4..8]).map_err(|err| self.file.annotate(err))?,
        };
        Ok(Some(entry))
    }

    fn table_size(&self) -> Result<u32, Error> {
        Ok(u32::try_from(self.header.entries).unwrap_or(0))
    }
}

/// Index file name for a table: last character becomes `x`, except `fcs` becomes `fcz`.
/// The replacement keeps the case of the character it replaces.
pub fn variable_index_name(table_name: &str) -> String {
    let Some((last_pos, last)) = table_name.char_indices().last() else {
        return String::new();
    };
    let replacement = if table_name.eq_ignore_ascii_case("fcs") {
        'z'
    } else {
        'x'
    };
    let replacement = if last.is_ascii_lowercase() {
        replacement
    } else {
        replacement.to_ascii_uppercase()
    };
    format!("{}{replacement}", &table_name[..last_pos])
}

pub fn variable_index_path(table_path: &Path) -> Option<PathBuf> {
    let name = table_path.file_name()?.to_str()?;
    Some(table_path.with_file_name(variable_index_name(name)))
}
