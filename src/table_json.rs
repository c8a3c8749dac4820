//! Purpose: JSON renderers for table headers, rows, and index files.
//! Exports: `table_header_json`, `row_json`, `field_value_json`, `variable_index_json`, `spatial_header_json`.
//! Role: Keep CLI output shapes in one place.
//! Invariants: Key names are stable; absent optional names render as null.
//! Invariants: Row fields render as an array in column order.
//! Invariants: Non-finite floats render as null (JSON has no NaN).

use serde_json::{Map, Value, json};
use vpfio::api::{
    ColumnDef, Error, ErrorKind, FieldValue, Row, SpatialIndexStream, TableStream,
    VariableIndexEntry, VariableIndexStream, VpfHeader, VpfStream,
};

pub(crate) fn table_header_json(stream: &TableStream) -> Result<Value, Error> {
    let header = stream.header();
    let mut map = Map::new();
    map.insert("path".to_string(), json!(stream.path().display().to_string()));
    map.insert("byte_order".to_string(), json!(header.byte_order.marker().to_string()));
    map.insert("length".to_string(), json!(header.length()));
    map.insert("record_size".to_string(), json!(header.record_size()));
    map.insert("records".to_string(), json!(stream.table_size()?));
    map.insert("description".to_string(), json!(header.description));
    map.insert("narrative_table".to_string(), json!(header.narrative_table));
    map.insert(
        "columns".to_string(),
        Value::Array(header.columns.iter().map(column_json).collect()),
    );
    if let Some(index) = stream.index() {
        map.insert(
            "index".to_string(),
            json!({
                "path": index.path().display().to_string(),
                "entries": index.header().entries,
            }),
        );
    }
    Ok(Value::Object(map))
}

fn column_json(column: &ColumnDef) -> Value {
    json!({
        "name": column.name,
        "type": column.field_type.code().to_string(),
        "count": column.count.to_string(),
        "key": column.key_type.code().to_string(),
        "description": column.description,
        "value_description_table": column.value_description_table,
        "thematic_index": column.thematic_index,
        "narrative_table": column.narrative_table,
    })
}

pub(crate) fn row_json(record: u32, row: &Row) -> Value {
    let fields = row
        .iter()
        .map(|(name, field)| {
            json!({
                "name": name,
                "value": field_value_json(&field.value),
            })
        })
        .collect();
    let mut map = Map::new();
    map.insert("record".to_string(), json!(record));
    map.insert("fields".to_string(), Value::Array(fields));
    if !row.notices().is_empty() {
        map.insert("notices".to_string(), json!(row.notices()));
    }
    Value::Object(map)
}

pub(crate) fn field_value_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(text) | FieldValue::Date(text) => json!(text),
        FieldValue::ShortFloat(value) => json!(f64::from(*value)),
        FieldValue::LongFloat(value) => json!(value),
        FieldValue::ShortInt(value) => json!(value),
        FieldValue::LongInt(value) => json!(value),
        FieldValue::Null => Value::Null,
        FieldValue::TripletId(triplet) => {
            let parts = triplet.parts();
            json!({
                "id": parts.id,
                "tile_id": parts.tile_id,
                "next_id": parts.next_id,
            })
        }
        FieldValue::Coord2F(points) => json!(points),
        FieldValue::Coord2D(points) => json!(points),
        FieldValue::Coord3F(points) => json!(points),
        FieldValue::Coord3D(points) => json!(points),
        FieldValue::Array(values) => Value::Array(values.iter().map(field_value_json).collect()),
    }
}

pub(crate) fn variable_index_json(
    stream: &VariableIndexStream,
    entries: &[VariableIndexEntry],
) -> Value {
    json!({
        "path": stream.path().display().to_string(),
        "header": stream.header(),
        "entries": entries,
    })
}

pub(crate) fn spatial_header_json(stream: &SpatialIndexStream) -> Result<Value, Error> {
    let header = serde_json::to_value(stream.header()).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode spatial index header")
            .with_source(err)
    })?;
    Ok(json!({
        "path": stream.path().display().to_string(),
        "header": header,
    }))
}

#[cfg(test)]
mod tests {
    use super::{field_value_json, row_json};
    use serde_json::json;
    use vpfio::api::{Field, FieldType, FieldValue, Row, TripletId};

    #[test]
    fn row_json_keeps_column_order_and_values() {
        let mut row = Row::new();
        row.push("ZETA", Field::new(FieldType::LongInteger, FieldValue::LongInt(3)));
        row.push("ALPHA", Field::new(FieldType::Text, FieldValue::Null));
        row.push(
            "FACE",
            Field::new(
                FieldType::TripletId,
                FieldValue::TripletId(TripletId::from_bytes(vec![0b0101_0000, 42, 7])),
            ),
        );
        row.push("ZETA", Field::new(FieldType::LongInteger, FieldValue::LongInt(4)));
        let value = row_json(3, &row);
        assert_eq!(value["record"], 3);
        let names: Vec<&str> = value["fields"]
            .as_array()
            .expect("fields")
            .iter()
            .map(|field| field["name"].as_str().expect("name"))
            .collect();
        assert_eq!(names, ["ZETA", "ALPHA", "FACE", "ZETA"]);
        assert_eq!(value["fields"][0]["value"], 3);
        assert!(value["fields"][1]["value"].is_null());
        assert_eq!(
            value["fields"][2]["value"],
            json!({"id": 42, "tile_id": 7, "next_id": null})
        );
        assert_eq!(value["fields"][3]["value"], 4);
        assert!(value.get("notices").is_none());
    }

    #[test]
    fn coordinates_render_as_nested_arrays() {
        let value = field_value_json(&FieldValue::Coord2F(vec![[1.5, 2.0]]));
        assert_eq!(value, json!([[1.5, 2.0]]));
        assert!(field_value_json(&FieldValue::ShortFloat(f32::NAN)).is_null());
    }
}
