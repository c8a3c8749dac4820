// Spatial-index files: only the 24-byte header (bounds and counts) is decoded.
use std::convert::Infallible;
use std::path::Path;

use crate::core::error::Error;
use crate::core::header::{SPATIAL_INDEX_HEADER_LEN, SpatialIndexHeader};
use crate::core::index::IndexOptions;
use crate::core::stream::{TableFile, VpfStream};

#[derive(Debug)]
pub struct SpatialIndexStream {
    file: TableFile,
    header: SpatialIndexHeader,
}

impl SpatialIndexStream {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::open_with(path, IndexOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: IndexOptions) -> Result<Self, Error> {
        let mut file = TableFile::open(path)?;
        let buf = file.read_array::<SPATIAL_INDEX_HEADER_LEN>()?;
        let header = SpatialIndexHeader::decode(options.byte_order, &buf)
            .map_err(|err| file.annotate(err))?;
        tracing::debug!(
            path = %file.path().display(),
            primitives = header.primitive_count,
            nodes = header.node_count,
            "open spatial index"
        );
        Ok(Self { file, header })
    }

    pub fn close(self) -> Result<(), Error> {
        self.file.close()
    }
}

impl VpfStream for SpatialIndexStream {
    type Header = SpatialIndexHeader;
    /// No entry layout is defined for the cells after the header, so no row is ever produced.
    type Row = Infallible;

    fn header(&self) -> &SpatialIndexHeader {
        &self.header
    }

    fn file(&self) -> &TableFile {
        &self.file
    }

    fn file_mut(&mut self) -> &mut TableFile {
        &mut self.file
    }

    fn read_row(&mut self) -> Result<Option<Infallible>, Error> {
        Ok(None)
    }

    fn table_size(&self) -> Result<u32, Error> {
        Ok(u32::try_from(self.header.primitive_count).unwrap_or(0))
    }
}
