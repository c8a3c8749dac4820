// Core modules implementing VPF headers, field decoding, streams, and error modeling.
pub mod column;
pub mod error;
pub mod format;
pub mod header;
pub mod index;
pub mod notice;
pub mod row;
pub mod spatial;
pub mod stream;
pub mod triplet;
