//! Purpose: Non-fatal diagnostics raised while decoding rows leniently.
//! Exports: `DecodeNotice`, `NoticeKind`, `DecodeMode`.
//! Role: Side channel attached to rows so degraded values are visible to callers.
//! Invariants: Notices never change the decoded value; they only describe it.
//! Invariants: Strict mode turns every notice into a `Corrupt` error instead.

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DecodeMode {
    /// Degrade malformed triplets to 0 and skip unknown type codes.
    #[default]
    Lenient,
    Strict,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    TruncatedTriplet,
    UnknownFieldType,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct DecodeNotice {
    pub kind: NoticeKind,
    pub column: Option<String>,
    pub message: String,
}

impl DecodeNotice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            column: None,
            message: message.into(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn into_error(self) -> Error {
        let mut message = self.message;
        if let Some(column) = &self.column {
            message = format!("{message} (column: {column})");
        }
        Error::new(ErrorKind::Corrupt).with_message(message)
    }
}

#[cfg(test)]
mod tests {
    use super::{DecodeNotice, NoticeKind};
    use crate::core::error::ErrorKind;

    #[test]
    fn notice_converts_to_corrupt_error() {
        let notice = DecodeNotice::new(NoticeKind::UnknownFieldType, "unknown field type 'Q'")
            .with_column("F_CODE");
        let err = notice.into_error();
        assert_eq!(err.kind(), ErrorKind::Corrupt);
        assert_eq!(
            err.message(),
            Some("unknown field type 'Q' (column: F_CODE)")
        );
    }

    #[test]
    fn notice_serializes_with_snake_case_kind() {
        let notice = DecodeNotice::new(NoticeKind::TruncatedTriplet, "tile id missing");
        let value = serde_json::to_value(&notice).expect("json");
        assert_eq!(value["kind"], "truncated_triplet");
        assert!(value["column"].is_null());
    }
}
