//! Purpose: Random-access streams over VPF files and the main table stream.
//! Exports: `VpfStream`, `TableFile`, `TableStream`, `TableOptions`.
//! Role: Owns file handles and the read cursor; delegates decoding to `header`/`row`.
//! Invariants: Records are numbered from 1; positions at or past end of file are errors.
//! Invariants: Fixed tables seek to `length() + (n-1) * record_size`, variable tables via the index.
//! Invariants: Every positioned read re-seeks; nothing is cached beyond the OS.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::core::error::{Error, ErrorKind, io_error};
use crate::core::header::{TableHeader, VpfHeader};
use crate::core::index::{IndexOptions, VariableIndexStream, variable_index_path};
use crate::core::notice::DecodeMode;
use crate::core::row::{self, Row};

/// Buffered file handle with an explicit cursor, shared by every stream kind.
#[derive(Debug)]
pub struct TableFile {
    path: PathBuf,
    reader: BufReader<File>,
    len: u64,
    pos: u64,
}

impl TableFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to open file")
                .with_path(&path)
                .with_source(err)
        })?;
        let len = file
            .metadata()
            .map(|meta| meta.len())
            .map_err(|err| Error::new(ErrorKind::Io).with_path(&path).with_source(err))?;
        Ok(Self {
            path,
            reader: BufReader::new(file),
            len,
            pos: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.len
    }

    pub fn seek(&mut self, offset: u64) -> Result<(), Error> {
        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|err| self.annotate(io_error(err)))?;
        self.pos = offset;
        Ok(())
    }

    /// Seeks to record `n` of a table whose records all have `record_size` bytes.
    pub fn seek_record(&mut self, n: u32, header_len: u64, record_size: u64) -> Result<(), Error> {
        if n == 0 {
            return Err(self.annotate(
                Error::new(ErrorKind::NotFound)
                    .with_message("records are numbered from 1")
                    .with_record(n),
            ));
        }
        let offset = u64::from(n - 1)
            .checked_mul(record_size)
            .and_then(|data| data.checked_add(header_len))
            .unwrap_or(u64::MAX);
        if offset >= self.len {
            return Err(self.annotate(
                Error::new(ErrorKind::NotFound)
                    .with_message("record beyond end of table")
                    .with_record(n)
                    .with_offset(offset),
            ));
        }
        tracing::trace!(path = %self.path.display(), record = n, offset, "seek record");
        self.seek(offset)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut out = [0u8; N];
        self.read_exact(&mut out)
            .map_err(|err| self.annotate(io_error(err)))?;
        Ok(out)
    }

    /// Adds this file's path, and the cursor when no offset is set, to an error.
    pub fn annotate(&self, err: Error) -> Error {
        let err = if err.path().is_none() {
            err.with_path(&self.path)
        } else {
            err
        };
        if err.offset().is_none() {
            err.with_offset(self.pos)
        } else {
            err
        }
    }

    pub fn close(self) -> Result<(), Error> {
        tracing::debug!(path = %self.path.display(), "close");
        drop(self.reader);
        Ok(())
    }
}

impl Read for TableFile {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let read = self.reader.read(buf)?;
        self.pos += read as u64;
        Ok(read)
    }
}

/// Common shape of the three VPF stream kinds.
pub trait VpfStream {
    type Header: VpfHeader;
    type Row;

    fn header(&self) -> &Self::Header;

    fn file(&self) -> &TableFile;

    fn file_mut(&mut self) -> &mut TableFile;

    /// Decodes the record at the cursor; `Ok(None)` at end of file.
    fn read_row(&mut self) -> Result<Option<Self::Row>, Error>;

    /// Number of records the file holds.
    fn table_size(&self) -> Result<u32, Error>;

    fn path(&self) -> &Path {
        self.file().path()
    }

    fn position(&self) -> u64 {
        self.file().position()
    }

    /// Moves the cursor to record `n` (1-based) using the fixed record width.
    fn set_position(&mut self, n: u32) -> Result<(), Error> {
        let header_len = self.header().length();
        let Some(record_size) = self.header().record_size() else {
            return Err(self.file().annotate(
                Error::new(ErrorKind::Unsupported)
                    .with_message("records have no fixed width")
                    .with_record(n),
            ));
        };
        self.file_mut().seek_record(n, header_len, record_size)
    }

    fn read_row_at(&mut self, n: u32) -> Result<Option<Self::Row>, Error> {
        self.set_position(n)?;
        self.read_row()
    }

    /// Reads every record from the first; a table that cannot be positioned at
    /// record 1 is empty.
    fn read_all_rows(&mut self) -> Result<Vec<Self::Row>, Error> {
        if let Err(err) = self.set_position(1) {
            tracing::debug!(path = %self.path().display(), error = %err, "no rows");
            return Ok(Vec::new());
        }
        let mut rows = Vec::new();
        while let Some(row) = self.read_row()? {
            rows.push(row);
        }
        Ok(rows)
    }
}

#[derive(Clone, Debug, Default)]
pub struct TableOptions {
    pub decode_mode: DecodeMode,
    /// Overrides the companion index path derived from the table name.
    pub index_path: Option<PathBuf>,
}

impl TableOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decode_mode(mut self, decode_mode: DecodeMode) -> Self {
        self.decode_mode = decode_mode;
        self
    }

    pub fn with_index_path(mut self, index_path: impl Into<PathBuf>) -> Self {
        self.index_path = Some(index_path.into());
        self
    }
}

/// Random-access reader for one VPF table, plus its variable-length index when needed.
#[derive(Debug)]
pub struct TableStream {
    file: TableFile,
    header: TableHeader,
    options: TableOptions,
    companion: Option<VariableIndexStream>,
}

impl TableStream {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::open_with(path, TableOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: TableOptions) -> Result<Self, Error> {
        let path = path.as_ref();
        let mut file = TableFile::open(path)?;
        let header = TableHeader::read(&mut file).map_err(|err| file.annotate(err))?;

        let companion = if header.has_variable_records() {
            let index_path = match options.index_path.clone() {
                Some(index_path) => index_path,
                None => variable_index_path(path).ok_or_else(|| {
                    Error::new(ErrorKind::Usage)
                        .with_message("table path has no file name to derive an index from")
                        .with_path(path)
                })?,
            };
            let index_options = IndexOptions::new().with_byte_order(header.byte_order);
            let index = VariableIndexStream::open_with(&index_path, index_options).map_err(|err| {
                err.with_hint(format!(
                    "Table {} has variable-length records and needs its index file.",
                    path.display()
                ))
            })?;
            Some(index)
        } else {
            None
        };

        tracing::debug!(
            path = %path.display(),
            columns = header.columns.len(),
            header_len = header.length(),
            record_size = ?header.record_size(),
            indexed = companion.is_some(),
            "open table"
        );

        Ok(Self {
            file,
            header,
            options,
            companion,
        })
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    pub fn index(&self) -> Option<&VariableIndexStream> {
        self.companion.as_ref()
    }

    /// Releases the index handle first, then the table handle.
    pub fn close(self) -> Result<(), Error> {
        let Self {
            file, companion, ..
        } = self;
        let index_result = match companion {
            Some(index) => index.close(),
            None => Ok(()),
        };
        let table_result = file.close();
        index_result.and(table_result)
    }
}

impl VpfStream for TableStream {
    type Header = TableHeader;
    type Row = Row;

    fn header(&self) -> &TableHeader {
        &self.header
    }

    fn file(&self) -> &TableFile {
        &self.file
    }

    fn file_mut(&mut self) -> &mut TableFile {
        &mut self.file
    }

    fn read_row(&mut self) -> Result<Option<Row>, Error> {
        if self.file.at_end() {
            return Ok(None);
        }
        let start = self.file.position();
        let row = row::decode_row(&mut self.file, &self.header, self.options.decode_mode)
            .map_err(|err| self.file.annotate(err.with_offset(start)))?;
        // Zero-width records never reach end of file.
        if self.file.position() == start {
            tracing::debug!(path = %self.file.path().display(), offset = start, "row consumed no bytes");
            return Ok(None);
        }
        Ok(Some(row))
    }

    fn table_size(&self) -> Result<u32, Error> {
        if let Some(index) = &self.companion {
            return index.table_size();
        }
        let data_len = self.file.len().saturating_sub(self.header.length());
        let count = match self.header.record_size() {
            Some(0) | None => 0,
            Some(record_size) => data_len / record_size,
        };
        u32::try_from(count).map_err(|_| {
            self.file.annotate(
                Error::new(ErrorKind::Corrupt).with_message("table holds more than u32::MAX records"),
            )
        })
    }

    fn set_position(&mut self, n: u32) -> Result<(), Error> {
        let Some(index) = self.companion.as_mut() else {
            let header_len = self.header.length();
            let record_size = self.header.record_size().unwrap_or_default();
            return self.file.seek_record(n, header_len, record_size);
        };

        let entry = index.read_row_at(n)?.ok_or_else(|| {
            Error::new(ErrorKind::NotFound)
                .with_message("index has no entry for record")
                .with_record(n)
                .with_path(index.path())
        })?;
        let offset = u64::try_from(entry.offset).unwrap_or(u64::MAX);
        if offset < self.header.length() || offset >= self.file.len() {
            return Err(self.file.annotate(
                Error::new(ErrorKind::Corrupt)
                    .with_message(format!(
                        "index entry points outside the table data ({})",
                        entry.offset
                    ))
                    .with_record(n)
                    .with_offset(offset),
            ));
        }
        tracing::trace!(record = n, offset, size = entry.size, "seek indexed record");
        self.file.seek(offset)
    }
}
