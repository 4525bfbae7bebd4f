//! Document codec for ledger records.
//!
//! A record document is a YAML metadata block between two `---` lines,
//! followed by the Markdown body:
//!
//! ```text
//! ---
//! id: TASK-001
//! title: Wire the parser
//! kind: task
//! status: 🟡 To Do
//! created_date: 2026-10-16
//! updated_date: 2026-10-16
//! tags: [parser]
//! ---
//! ## Description
//! ```
//!
//! Everything after the closing delimiter line is the body and is kept
//! byte-for-byte. Metadata keys the ledger does not interpret are carried in
//! the record's side-map and written back on encode.

mod error;
mod front_matter;

pub use error::CodecError;

use crate::record::domain::Record;

/// Line delimiting the metadata block.
pub const DELIMITER: &str = "---";

/// Metadata keys every document must carry.
pub const REQUIRED_KEYS: [&str; 7] = [
    "id",
    "title",
    "status",
    "kind",
    "created_date",
    "updated_date",
    "tags",
];

/// Decodes a record document from raw bytes.
///
/// # Errors
///
/// Returns [`CodecError::MalformedDocument`] when the input is not UTF-8 or
/// the metadata block is missing, unterminated or not a YAML mapping, and
/// [`CodecError::SchemaViolation`] or [`CodecError::InvalidValue`] when the
/// metadata does not describe a valid record.
pub fn decode(bytes: &[u8]) -> Result<Record, CodecError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|err| CodecError::malformed(format!("document is not UTF-8: {err}")))?;
    decode_str(text)
}

/// Decodes a record document from text.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_str(text: &str) -> Result<Record, CodecError> {
    let (metadata, body) = split_document(text)?;
    front_matter::parse(metadata, body)
}

/// Encodes a record as a document.
///
/// # Errors
///
/// Returns [`CodecError::Serialize`] if the metadata cannot be rendered as
/// YAML, which only happens for side-map values YAML cannot express.
pub fn encode(record: &Record) -> Result<String, CodecError> {
    let metadata = front_matter::render(record)?;
    let mut document =
        String::with_capacity(metadata.len() + record.body().len() + 2 * DELIMITER.len() + 2);
    document.push_str(DELIMITER);
    document.push('\n');
    document.push_str(&metadata);
    if !metadata.ends_with('\n') {
        document.push('\n');
    }
    document.push_str(DELIMITER);
    document.push('\n');
    document.push_str(record.body());
    Ok(document)
}

/// Splits a document into its metadata block and body.
fn split_document(text: &str) -> Result<(&str, &str), CodecError> {
    let mut lines = text.split_inclusive('\n');
    let opening = lines
        .next()
        .ok_or_else(|| CodecError::malformed("document is empty"))?;
    if opening.trim_end_matches(['\n', '\r']) != DELIMITER {
        return Err(CodecError::malformed(
            "document must start with a '---' metadata delimiter",
        ));
    }

    let metadata_start = opening.len();
    let mut offset = metadata_start;
    for line in lines {
        if line.trim_end_matches(['\n', '\r']) == DELIMITER {
            let metadata = text.get(metadata_start..offset).unwrap_or_default();
            let body = text.get(offset + line.len()..).unwrap_or_default();
            return Ok((metadata, body));
        }
        offset += line.len();
    }

    Err(CodecError::malformed(
        "metadata block is not terminated by a '---' line",
    ))
}
