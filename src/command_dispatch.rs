//! Purpose: Hold top-level CLI command dispatch for `vpfio`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Streams are closed explicitly once a command finishes with them.
//! Invariants: JSON shapes come from `table_json` so every command renders alike.

use super::*;

use vpfio::api::{
    DecodeMode, IndexOptions, SpatialIndexStream, TableOptions, TableStream, VariableIndexStream,
    VpfStream,
};

use crate::table_json::{
    row_json, spatial_header_json, table_header_json, variable_index_json,
};

pub(super) fn dispatch_command(command: Command) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::aot::generate(shell, &mut cmd, "vpfio", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Header { table, index } => {
            let stream = TableStream::open_with(&table, table_options(index, false))?;
            let value = table_header_json(&stream)?;
            stream.close()?;
            emit_json(value);
            Ok(RunOutcome::ok())
        }
        Command::Rows {
            table,
            row,
            limit,
            strict,
            index,
        } => {
            let mut stream = TableStream::open_with(&table, table_options(index, strict))?;
            match row {
                Some(record) => {
                    let Some(decoded) = stream.read_row_at(record)? else {
                        return Err(Error::new(ErrorKind::NotFound)
                            .with_message("record starts at end of file")
                            .with_path(&table)
                            .with_record(record));
                    };
                    emit_json_line(&row_json(record, &decoded));
                }
                None => {
                    let limit = limit.unwrap_or(usize::MAX);
                    if limit > 0 && stream.set_position(1).is_ok() {
                        let mut record = 1u32;
                        while let Some(decoded) = stream.read_row()? {
                            emit_json_line(&row_json(record, &decoded));
                            if record as usize >= limit {
                                break;
                            }
                            record += 1;
                        }
                    }
                }
            }
            stream.close()?;
            Ok(RunOutcome::ok())
        }
        Command::Index { file, byte_order } => {
            let options = IndexOptions::new().with_byte_order(byte_order.into());
            let mut stream = VariableIndexStream::open_with(&file, options)?;
            let entries = stream.read_all_rows()?;
            let value = variable_index_json(&stream, &entries);
            stream.close()?;
            emit_json(value);
            Ok(RunOutcome::ok())
        }
        Command::Spatial { file, byte_order } => {
            let options = IndexOptions::new().with_byte_order(byte_order.into());
            let stream = SpatialIndexStream::open_with(&file, options)?;
            let value = spatial_header_json(&stream)?;
            stream.close()?;
            emit_json(value);
            Ok(RunOutcome::ok())
        }
    }
}

fn table_options(index: Option<PathBuf>, strict: bool) -> TableOptions {
    let mode = if strict {
        DecodeMode::Strict
    } else {
        DecodeMode::Lenient
    };
    let options = TableOptions::new().with_decode_mode(mode);
    match index {
        Some(index) => options.with_index_path(index),
        None => options,
    }
}
