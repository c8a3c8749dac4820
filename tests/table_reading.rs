// End-to-end table reads through the public API.
use std::fs;
use std::path::Path;

use vpfio::api::{
    self, ByteOrder, DecodeMode, ErrorKind, Field, FieldType, FieldValue, TableOptions,
    TableStream, VpfHeader, VpfStream,
};

fn header_bytes(order: ByteOrder, body: &str) -> Vec<u8> {
    let len = body.len() as i32;
    let mut out = match order {
        ByteOrder::LittleEndianFirst => len.to_le_bytes().to_vec(),
        ByteOrder::MostSignificantFirst => len.to_be_bytes().to_vec(),
    };
    out.extend_from_slice(body.as_bytes());
    out
}

fn write_index(path: &Path, order: ByteOrder, header_len: usize, entries: &[(i32, i32)]) {
    let encode = |value: i32| match order {
        ByteOrder::LittleEndianFirst => value.to_le_bytes(),
        ByteOrder::MostSignificantFirst => value.to_be_bytes(),
    };
    let mut out = encode(entries.len() as i32).to_vec();
    out.extend_from_slice(&encode(header_len as i32));
    for (offset, size) in entries {
        out.extend_from_slice(&encode(*offset));
        out.extend_from_slice(&encode(*size));
    }
    fs::write(path, out).expect("write index");
}

#[test]
fn fixed_table_reads_all_rows_in_column_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("small.tab");
    let mut bytes = header_bytes(
        ByteOrder::LittleEndianFirst,
        "L;Two column table;-;col1=I,1,P,First:col2=F,1,N,Second:;",
    );
    let values = [(10i32, 1.5f32), (-20, 2.25), (30, -0.5)];
    for (int, float) in values {
        bytes.extend_from_slice(&int.to_le_bytes());
        bytes.extend_from_slice(&float.to_le_bytes());
    }
    fs::write(&path, bytes).expect("write");

    let mut stream = api::open(&path).expect("open");
    assert_eq!(stream.header().record_size(), Some(8));
    let rows = api::read_all_rows(&mut stream).expect("rows");
    assert_eq!(rows.len(), 3);
    for (row, (int, float)) in rows.iter().zip(values) {
        assert_eq!(row.len(), 2);
        assert_eq!(row[0].value, FieldValue::LongInt(int));
        assert_eq!(row[0].field_type, FieldType::LongInteger);
        assert_eq!(row[1].value, FieldValue::ShortFloat(float));
        assert_eq!(row.get("col1"), row.get(0));
        assert_eq!(row.get("col2"), row.get(1));
    }

    let second = api::read_row(&mut stream, 2).expect("read").expect("row");
    assert_eq!(second.get("col1").and_then(Field::as_i64), Some(-20));
    api::close(stream).expect("close");
}

#[test]
fn big_endian_variable_table_uses_index_entries() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("EDG");
    let order = ByteOrder::MostSignificantFirst;
    let mut bytes = header_bytes(
        order,
        "M;Edge table;-;ID=I,1,P,Row Identifier,-,-,-,:\
RIGHT_FACE=K,1,N,Right face,-,-,-,:\
COORDINATES=B,*,N,Coordinates,-,-,-,:;",
    );
    let header_len = bytes.len();

    let mut offsets = Vec::new();
    for (id, points) in [(1i32, 2usize), (2, 3)] {
        let start = bytes.len();
        bytes.extend_from_slice(&id.to_be_bytes());
        // id (1 byte) and tile id (1 byte).
        bytes.extend_from_slice(&[0b0101_0000, id as u8 * 10, 1]);
        bytes.extend_from_slice(&(points as i32).to_be_bytes());
        for point in 0..points {
            bytes.extend_from_slice(&(point as f64).to_be_bytes());
            bytes.extend_from_slice(&(point as f64 * 2.0).to_be_bytes());
        }
        offsets.push((start as i32, (bytes.len() - start) as i32));
    }
    fs::write(&path, bytes).expect("write");
    write_index(&dir.path().join("EDX"), order, header_len, &offsets);

    let mut stream = TableStream::open(&path).expect("open");
    assert_eq!(stream.header().byte_order, order);
    assert_eq!(stream.table_size().expect("size"), 2);

    let row = stream.read_row_at(2).expect("read").expect("row");
    assert_eq!(row.get("ID").and_then(Field::as_i64), Some(2));
    let face = row["RIGHT_FACE"].as_triplet().expect("triplet");
    assert_eq!(face.to_string(), "20%1");
    assert_eq!(
        row["COORDINATES"].value,
        FieldValue::Coord2D(vec![[0.0, 0.0], [1.0, 2.0], [2.0, 4.0]])
    );

    let rows = stream.read_all_rows().expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["RIGHT_FACE"].to_string(), "10%1");
    stream.close().expect("close");
}

#[test]
fn index_entry_two_drives_seek_to_its_offset() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("txt");
    let order = ByteOrder::LittleEndianFirst;
    let mut bytes = header_bytes(order, "L;Text table;-;ID=I,1,P,Id:TEXT=T,*,N,Text:;");
    let header_len = bytes.len();
    bytes.extend_from_slice(&1i32.to_le_bytes());
    bytes.extend_from_slice(&1i32.to_le_bytes());
    bytes.push(b'a');
    bytes.resize(512, b' ');
    bytes.extend_from_slice(&2i32.to_le_bytes());
    bytes.extend_from_slice(&40i32.to_le_bytes());
    bytes.extend_from_slice(&[b'b'; 40]);
    fs::write(&path, bytes).expect("write");
    write_index(
        &dir.path().join("txx"),
        order,
        header_len,
        &[(header_len as i32, 9), (512, 48)],
    );

    let mut stream = TableStream::open(&path).expect("open");
    stream.set_position(2).expect("position");
    assert_eq!(stream.position(), 512);
    let row = stream.read_row().expect("read").expect("row");
    assert_eq!(row.get("ID").and_then(Field::as_i64), Some(2));
    assert_eq!(stream.position(), 512 + 48);
    assert_eq!(stream.index().map(|index| index.position()), Some(24));
}

#[test]
fn empty_table_reads_as_no_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("empty.tab");
    fs::write(
        &path,
        header_bytes(ByteOrder::LittleEndianFirst, "L;Empty;-;ID=I,1,P,Id:;"),
    )
    .expect("write");

    let mut stream = api::open(&path).expect("open");
    assert!(api::read_all_rows(&mut stream).expect("rows").is_empty());
    let err = api::read_row(&mut stream, 1).expect_err("no record 1");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.record(), Some(1));
}

#[test]
fn strict_mode_rejects_unknown_types_lenient_mode_skips_them() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("odd.tab");
    let mut bytes = header_bytes(
        ByteOrder::LittleEndianFirst,
        "L;Odd;-;ID=I,1,P,Id:ODD=Q,1,N,Odd:NAME=T,2,N,Name:;",
    );
    let index_offset = bytes.len() as i32;
    bytes.extend_from_slice(&7i32.to_le_bytes());
    bytes.extend_from_slice(b"ok");
    fs::write(&path, bytes).expect("write");
    // Unknown types make the record width unknown, so an index is required.
    write_index(
        &dir.path().join("odd.tax"),
        ByteOrder::LittleEndianFirst,
        index_offset as usize,
        &[(index_offset, 6)],
    );

    let mut lenient = TableStream::open(&path).expect("open");
    let rows = lenient.read_all_rows().expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].len(), 2);
    assert_eq!(rows[0]["NAME"].as_str(), Some("ok"));
    assert_eq!(rows[0].notices().len(), 1);

    let options = TableOptions::new().with_decode_mode(DecodeMode::Strict);
    let mut strict = TableStream::open_with(&path, options).expect("open");
    let err = strict.read_row_at(1).expect_err("strict");
    assert_eq!(err.kind(), ErrorKind::Corrupt);
}
