//! Purpose: `vpfio` CLI entry point for inspecting VPF tables and index files.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Rows are emitted as one JSON object per line; other commands emit one object.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod table_json;

use vpfio::api::{ByteOrder, Error, ErrorKind, to_exit_code};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome { exit_code });
            }
            _ => {
                let message = err.to_string();
                let summary = message.lines().next().unwrap_or("invalid arguments");
                let summary = summary.trim_start_matches("error: ").to_string();
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(summary)
                        .with_hint("Run `vpfio --help` for usage."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing();
    let color_mode = cli.color;

    command_dispatch::dispatch_command(cli.command)
        .map_err(add_corrupt_hint)
        .map_err(add_io_hint)
        .map_err(add_internal_hint)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "vpfio",
    version,
    about = "Inspect Vector Product Format (VPF) tables",
    long_about = None,
    after_help = r#"EXAMPLES
  $ vpfio header edg
  $ vpfio rows edg --limit 10
  $ vpfio rows fac --row 3
  $ vpfio index edx
  $ vpfio spatial esi

NOTES
  - Variable-length tables need their index next to them (edg -> edx, fcs -> fcz)
  - Set RUST_LOG=debug to trace file access on stderr"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ByteOrderArg {
    #[value(name = "L", alias = "l")]
    Little,
    #[value(name = "M", alias = "m")]
    Big,
}

impl From<ByteOrderArg> for ByteOrder {
    fn from(value: ByteOrderArg) -> Self {
        match value {
            ByteOrderArg::Little => ByteOrder::LittleEndianFirst,
            ByteOrderArg::Big => ByteOrder::MostSignificantFirst,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Print a table header and its column definitions")]
    Header {
        #[arg(help = "Table file path", value_hint = ValueHint::FilePath)]
        table: PathBuf,
        #[arg(long, help = "Variable-length index path (default: derived from table name)", value_hint = ValueHint::FilePath)]
        index: Option<PathBuf>,
    },
    #[command(
        about = "Print table rows as JSON lines",
        after_help = r#"EXAMPLES
  $ vpfio rows edg
  $ vpfio rows edg --row 12
  $ vpfio rows edg --limit 5 --strict"#
    )]
    Rows {
        #[arg(help = "Table file path", value_hint = ValueHint::FilePath)]
        table: PathBuf,
        #[arg(long, help = "Print only this record (1-based)", conflicts_with = "limit")]
        row: Option<u32>,
        #[arg(long, help = "Stop after this many rows")]
        limit: Option<usize>,
        #[arg(long, help = "Fail on malformed triplets and unknown field types")]
        strict: bool,
        #[arg(long, help = "Variable-length index path (default: derived from table name)", value_hint = ValueHint::FilePath)]
        index: Option<PathBuf>,
    },
    #[command(about = "Print a variable-length index header and its entries")]
    Index {
        #[arg(help = "Index file path", value_hint = ValueHint::FilePath)]
        file: PathBuf,
        #[arg(long, value_enum, default_value = "L", help = "Byte order of the index: L|M")]
        byte_order: ByteOrderArg,
    },
    #[command(about = "Print a spatial-index header")]
    Spatial {
        #[arg(help = "Spatial index file path", value_hint = ValueHint::FilePath)]
        file: PathBuf,
        #[arg(long, value_enum, default_value = "L", help = "Byte order of the index: L|M")]
        byte_order: ByteOrderArg,
    },
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn emit_json(value: Value) {
    let encoded = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    };
    let json = encoded.unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_json_line(value: &Value) {
    let json = serde_json::to_string(value)
        .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn add_io_hint(err: Error) -> Error {
    if err.hint().is_some() || err.kind() != ErrorKind::Io {
        return err;
    }
    err.with_hint("I/O error. Check that the path exists and is readable.")
}

fn add_corrupt_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Corrupt || err.hint().is_some() {
        return err;
    }
    err.with_hint("File does not decode as a VPF table. Check the file type and byte order.")
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Internal || err.hint().is_some() {
        return err;
    }
    err.with_hint("Unexpected internal failure. Retry with RUST_LOG=debug and share the file if it persists.")
}

fn colorize_label(label: &str, enabled: bool, code: &str) -> String {
    if !enabled {
        return label.to_string();
    }
    format!("\x1b[{code}m{label}\x1b[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Corrupt => "corrupt data".to_string(),
        ErrorKind::Unsupported => "unsupported operation".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(record) = err.record() {
        inner.insert("record".to_string(), json!(record));
    }
    if let Some(offset) = err.offset() {
        inner.insert("offset".to_string(), json!(offset));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = vec![format!(
        "{} {}",
        colorize_label("error:", use_color, "31"),
        error_message(err)
    )];
    if let Some(hint) = err.hint() {
        lines.push(format!("{} {hint}", colorize_label("hint:", use_color, "33")));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, "33"),
            path.display()
        ));
    }
    if let Some(record) = err.record() {
        lines.push(format!("{} {record}", colorize_label("record:", use_color, "33")));
    }
    if let Some(offset) = err.offset() {
        lines.push(format!("{} {offset}", colorize_label("offset:", use_color, "33")));
    }
    for cause in error_causes(err) {
        lines.push(format!("{} {cause}", colorize_label("caused by:", use_color, "33")));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{
        ColorMode, add_corrupt_hint, add_io_hint, colorize_label, error_json, error_text,
    };
    use std::io;
    use vpfio::api::{Error, ErrorKind};

    #[test]
    fn error_text_respects_color_flag() {
        let err = Error::new(ErrorKind::Corrupt).with_message("bad header");
        let colored = error_text(&err, true);
        let plain = error_text(&err, false);
        assert!(colored.contains("\u{1b}[31merror:\u{1b}[0m"));
        assert!(plain.starts_with("error: bad header"));
        assert!(!plain.contains("\u{1b}["));
        assert_eq!(colorize_label("hint:", false, "33"), "hint:");
    }

    #[test]
    fn error_text_lists_location_and_causes() {
        let err = Error::new(ErrorKind::Io)
            .with_path("/data/edg")
            .with_record(4)
            .with_offset(120)
            .with_source(io::Error::other("disk gone"));
        let text = error_text(&err, false);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "error: i/o error",
                "path: /data/edg",
                "record: 4",
                "offset: 120",
                "caused by: disk gone",
            ]
        );
    }

    #[test]
    fn error_json_carries_record_and_hint() {
        let err = add_io_hint(
            Error::new(ErrorKind::Io)
                .with_message("open failed")
                .with_path("/data/edx")
                .with_source(io::Error::other("denied")),
        );
        let value = error_json(&err);
        assert_eq!(value["error"]["kind"], "Io");
        assert_eq!(value["error"]["message"], "open failed");
        assert_eq!(value["error"]["path"], "/data/edx");
        assert!(value["error"]["hint"].is_string());
        assert_eq!(value["error"]["causes"][0], "denied");
        assert!(value["error"].get("record").is_none());

        let value = error_json(&Error::new(ErrorKind::NotFound).with_record(9));
        assert_eq!(value["error"]["message"], "not found");
        assert_eq!(value["error"]["record"], 9);
        assert!(value["error"].get("hint").is_none());
    }

    #[test]
    fn hints_only_fill_matching_kinds() {
        let corrupt = add_corrupt_hint(Error::new(ErrorKind::Corrupt));
        assert!(corrupt.hint().is_some());
        let io = add_corrupt_hint(Error::new(ErrorKind::Io));
        assert!(io.hint().is_none());
        let kept = add_io_hint(Error::new(ErrorKind::Io).with_hint("custom"));
        assert_eq!(kept.hint(), Some("custom"));
    }

    #[test]
    fn color_mode_follows_terminal_only_on_auto() {
        assert!(ColorMode::Auto.use_color(true));
        assert!(!ColorMode::Auto.use_color(false));
        assert!(ColorMode::Always.use_color(false));
        assert!(!ColorMode::Never.use_color(true));
    }
}
