// CLI integration tests for header/rows/index/spatial flows.
use std::fs;
use std::path::Path;
use std::process::Command;

use serde_json::Value;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_vpfio");
    Command::new(exe)
}

fn parse_json(value: &str) -> Value {
    serde_json::from_str(value).expect("valid json")
}

fn json_lines(output: &[u8]) -> Vec<Value> {
    let text = String::from_utf8_lossy(output);
    text.lines().map(parse_json).collect()
}

fn field<'a>(row: &'a Value, name: &str) -> &'a Value {
    row["fields"]
        .as_array()
        .expect("fields")
        .iter()
        .find(|field| field["name"] == name)
        .map(|field| &field["value"])
        .expect("field")
}

fn write_fixed_table(path: &Path) {
    let body = "L;Road Lines;-;ID=I,1,P,Row Identifier,-,-,-,:\
F_CODE=T,5,N,Feature Code,char.vdt,-,-,:\
LENGTH=R,1,N,Length,-,-,-,:;";
    let mut bytes = (body.len() as i32).to_le_bytes().to_vec();
    bytes.extend_from_slice(body.as_bytes());
    for (id, code, length) in [(1i32, b"AP030", 12.5f64), (2, b"AQ040", 3.0), (3, b"-    ", 0.25)] {
        bytes.extend_from_slice(&id.to_le_bytes());
        bytes.extend_from_slice(code);
        bytes.extend_from_slice(&length.to_le_bytes());
    }
    fs::write(path, bytes).expect("write table");
}

#[test]
fn header_command_describes_columns() {
    let temp = tempfile::tempdir().expect("tempdir");
    let table = temp.path().join("roadl.lft");
    write_fixed_table(&table);

    let output = cmd()
        .args(["header", table.to_str().unwrap()])
        .output()
        .expect("header");
    assert!(output.status.success());
    let value = parse_json(std::str::from_utf8(&output.stdout).expect("utf8"));
    assert_eq!(value["byte_order"], "L");
    assert_eq!(value["record_size"], 17);
    assert_eq!(value["records"], 3);
    assert_eq!(value["description"], "Road Lines");
    assert!(value["narrative_table"].is_null());
    let columns = value["columns"].as_array().expect("columns");
    assert_eq!(columns.len(), 3);
    assert_eq!(columns[1]["name"], "F_CODE");
    assert_eq!(columns[1]["type"], "T");
    assert_eq!(columns[1]["count"], "5");
    assert_eq!(columns[1]["value_description_table"], "char.vdt");
    assert!(value.get("index").is_none());
}

#[test]
fn rows_command_emits_json_lines() {
    let temp = tempfile::tempdir().expect("tempdir");
    let table = temp.path().join("roadl.lft");
    write_fixed_table(&table);

    let output = cmd()
        .args(["rows", table.to_str().unwrap()])
        .output()
        .expect("rows");
    assert!(output.status.success());
    let rows = json_lines(&output.stdout);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["record"], 1);
    let names: Vec<&str> = rows[0]["fields"]
        .as_array()
        .expect("fields")
        .iter()
        .map(|field| field["name"].as_str().expect("name"))
        .collect();
    assert_eq!(names, ["ID", "F_CODE", "LENGTH"]);
    assert_eq!(field(&rows[0], "F_CODE"), "AP030");
    assert_eq!(field(&rows[1], "LENGTH"), 3.0);
    assert!(field(&rows[2], "F_CODE").is_null());

    let output = cmd()
        .args(["rows", table.to_str().unwrap(), "--limit", "2"])
        .output()
        .expect("rows limit");
    assert!(output.status.success());
    assert_eq!(json_lines(&output.stdout).len(), 2);

    let output = cmd()
        .args(["rows", table.to_str().unwrap(), "--row", "2"])
        .output()
        .expect("row");
    assert!(output.status.success());
    let rows = json_lines(&output.stdout);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["record"], 2);
    assert_eq!(field(&rows[0], "ID"), 2);
}

#[test]
fn missing_record_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let table = temp.path().join("roadl.lft");
    write_fixed_table(&table);

    let output = cmd()
        .args(["rows", table.to_str().unwrap(), "--row", "9"])
        .output()
        .expect("row");
    assert_eq!(output.status.code(), Some(3));
    let err = parse_json(std::str::from_utf8(&output.stderr).expect("utf8").trim());
    assert_eq!(err["error"]["kind"], "NotFound");
    assert_eq!(err["error"]["record"], 9);
}

#[test]
fn missing_table_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = cmd()
        .args(["header", temp.path().join("nope").to_str().unwrap()])
        .output()
        .expect("header");
    assert_eq!(output.status.code(), Some(6));
    let err = parse_json(std::str::from_utf8(&output.stderr).expect("utf8").trim());
    assert_eq!(err["error"]["kind"], "Io");
    assert!(err["error"]["hint"].is_string());
}

#[test]
fn index_and_spatial_commands_decode_headers() {
    let temp = tempfile::tempdir().expect("tempdir");
    let index = temp.path().join("edx");
    let mut bytes = 2i32.to_be_bytes().to_vec();
    bytes.extend_from_slice(&100i32.to_be_bytes());
    for (offset, size) in [(104i32, 20i32), (124, 36)] {
        bytes.extend_from_slice(&offset.to_be_bytes());
        bytes.extend_from_slice(&size.to_be_bytes());
    }
    fs::write(&index, bytes).expect("write index");

    let output = cmd()
        .args(["index", index.to_str().unwrap(), "--byte-order", "M"])
        .output()
        .expect("index");
    assert!(output.status.success());
    let value = parse_json(std::str::from_utf8(&output.stdout).expect("utf8"));
    assert_eq!(value["header"]["entries"], 2);
    assert_eq!(value["header"]["header_length"], 100);
    assert_eq!(value["entries"][1]["offset"], 124);
    assert_eq!(value["entries"][1]["size"], 36);

    let spatial = temp.path().join("esi");
    let mut bytes = 9i32.to_le_bytes().to_vec();
    for bound in [-1.0f32, -2.0, 3.0, 4.0] {
        bytes.extend_from_slice(&bound.to_le_bytes());
    }
    bytes.extend_from_slice(&4i32.to_le_bytes());
    fs::write(&spatial, bytes).expect("write spatial");

    let output = cmd()
        .args(["spatial", spatial.to_str().unwrap()])
        .output()
        .expect("spatial");
    assert!(output.status.success());
    let value = parse_json(std::str::from_utf8(&output.stdout).expect("utf8"));
    assert_eq!(value["header"]["primitive_count"], 9);
    assert_eq!(value["header"]["node_count"], 4);
    assert_eq!(value["header"]["bounds"]["xmax"], 3.0);
}

#[test]
fn unknown_flag_is_usage_error() {
    let output = cmd().args(["rows", "--bogus"]).output().expect("run");
    assert_eq!(output.status.code(), Some(2));
}
