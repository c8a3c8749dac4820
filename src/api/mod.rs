//! Purpose: Define the stable public Rust API boundary for vpfio.
//! Exports: Core types plus the `open`/`read_all_rows`/`read_row`/`close` operations.
//! Role: Public, additive-only surface used by the CLI and by feature-model layers.
//! Invariants: Operations here are thin wrappers; behavior lives in `core`.
//! Invariants: `read_all_rows` treats an unpositionable table as empty; `read_row` does not.

use std::path::Path;

pub use crate::core::column::{ColumnDef, ElementCount, FieldType, KeyType};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::format::ByteOrder;
pub use crate::core::header::{
    BoundingBox, SpatialIndexHeader, TableHeader, VariableIndexHeader, VpfHeader,
};
pub use crate::core::index::{
    IndexOptions, VariableIndexEntry, VariableIndexStream, variable_index_name,
    variable_index_path,
};
pub use crate::core::notice::{DecodeMode, DecodeNotice, NoticeKind};
pub use crate::core::row::{Field, FieldValue, Row, RowIndex};
pub use crate::core::spatial::SpatialIndexStream;
pub use crate::core::stream::{TableOptions, TableStream, VpfStream};
pub use crate::core::triplet::{TripletId, TripletParts, decode_triplet};

pub fn open(path: impl AsRef<Path>) -> Result<TableStream, Error> {
    TableStream::open(path)
}

pub fn read_all_rows(stream: &mut TableStream) -> Result<Vec<Row>, Error> {
    stream.read_all_rows()
}

/// Reads record `n` (1-based); `Ok(None)` only when the record starts at end of file.
pub fn read_row(stream: &mut TableStream, n: u32) -> Result<Option<Row>, Error> {
    stream.read_row_at(n)
}

pub fn close(stream: TableStream) -> Result<(), Error> {
    stream.close()
}
