//! Tests for decoding and encoding record documents.

use crate::clock::ManualClock;
use crate::record::codec::{self, CodecError};
use crate::record::domain::{Priority, Record, RecordId, RecordKind, RecordStatus};
use chrono::{TimeZone, Utc};
use rstest::rstest;

const DOCUMENT: &str = "---
id: TASK-7
title: Wire the parser
status: 🔵 In Progress
kind: task
priority: high
created_date: 2026-10-01
updated_date: 2026-10-02
tags: [parser, core]
depends_on: TASK-1, TASK-2
parent: FEAT-1
assigned_to: ada
estimate: 3
---
## Description

Body text with trailing spaces   
and no final newline";

#[rstest]
fn decodes_documented_keys() {
    let record = codec::decode(DOCUMENT.as_bytes()).expect("document should decode");

    assert_eq!(record.id().as_str(), "TASK-7");
    assert_eq!(record.status(), RecordStatus::InProgress);
    assert_eq!(record.kind(), &RecordKind::Task);
    assert_eq!(record.priority(), Priority::High);
    assert_eq!(
        record.created_at(),
        Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).single().expect("valid date")
    );
    assert_eq!(record.depends_on().len(), 2);
    assert!(record.tags().contains("core"));
    assert_eq!(record.parent().map(RecordId::as_str), Some("FEAT-1"));
    assert_eq!(record.assigned_to(), Some("ada"));
    assert_eq!(record.revision(), 0);
    assert!(record.extra().contains_key("estimate"));
}

#[rstest]
fn body_is_preserved_byte_for_byte() {
    let record = codec::decode(DOCUMENT.as_bytes()).expect("document should decode");

    assert_eq!(
        record.body(),
        "## Description\n\nBody text with trailing spaces   \nand no final newline"
    );
}

#[rstest]
fn encoded_documents_decode_to_the_same_record() {
    let decoded = codec::decode(DOCUMENT.as_bytes()).expect("document should decode");
    let encoded = codec::encode(&decoded).expect("record should encode");

    let again = codec::decode_str(&encoded).expect("encoded document should decode");

    assert_eq!(again, decoded);
    assert!(encoded.contains("In Progress"));
    assert!(encoded.contains("estimate: 3"));
}

#[rstest]
fn precise_timestamps_survive_round_trip() {
    let clock = ManualClock::new(
        Utc.timestamp_opt(1_790_000_000, 123_456_000)
            .single()
            .expect("valid timestamp"),
    );
    let record = Record::builder(RecordId::new("T1").expect("valid id"), "Precise", RecordKind::Bug)
        .with_body("text\n")
        .build(&clock)
        .expect("valid record");

    let encoded = codec::encode(&record).expect("record should encode");

    assert_eq!(codec::decode_str(&encoded), Ok(record));
}

#[rstest]
#[case("")]
#[case("id: T1\n")]
#[case("---\nid: T1\ntitle: unterminated\n")]
#[case("---\n- just\n- a list\n---\n")]
#[case("---\nid: [unclosed\n---\n")]
fn malformed_documents_are_rejected(#[case] input: &str) {
    let result = codec::decode_str(input);

    assert!(
        matches!(result, Err(CodecError::MalformedDocument { .. })),
        "{input:?} gave {result:?}"
    );
}

#[rstest]
fn non_utf8_input_is_malformed() {
    let result = codec::decode(&[0x2d, 0x2d, 0x2d, 0x0a, 0xff, 0xfe]);

    assert!(matches!(result, Err(CodecError::MalformedDocument { .. })));
}

#[rstest]
fn missing_required_keys_are_all_named() {
    let result = codec::decode_str("---\nid: T1\ntitle: Only two\n---\n");

    let Err(CodecError::SchemaViolation { missing }) = result else {
        panic!("expected a schema violation, got {result:?}");
    };
    assert_eq!(
        missing,
        vec!["status", "kind", "created_date", "updated_date", "tags"]
    );
}

#[rstest]
#[case("status: 🟠 Pending", "status")]
#[case("created_date: yesterday", "created_date")]
#[case("id: has space", "id")]
fn invalid_values_name_their_key(#[case] line: &str, #[case] key: &str) {
    let base = [
        "id: T1",
        "title: Example",
        "status: todo",
        "kind: task",
        "created_date: 2026-10-01",
        "updated_date: 2026-10-01",
        "tags: []",
    ];
    let field = line.split(':').next().unwrap_or_default();
    let metadata: Vec<&str> = base
        .iter()
        .map(|entry| {
            if entry.starts_with(&format!("{field}:")) {
                line
            } else {
                *entry
            }
        })
        .collect();
    let document = format!("---\n{}\n---\n", metadata.join("\n"));

    let result = codec::decode_str(&document);

    assert!(
        matches!(&result, Err(CodecError::InvalidValue { key: found, .. }) if found == key),
        "got {result:?}"
    );
}

#[rstest]
fn crlf_delimiters_are_accepted() {
    let document = "---\r\nid: T1\r\ntitle: Windows\r\nstatus: done\r\nkind: chore\r\ncreated_date: 2026-10-01\r\nupdated_date: 2026-10-01\r\ntags: []\r\n---\r\nbody\r\n";

    let record = codec::decode_str(document).expect("document should decode");

    assert_eq!(record.status(), RecordStatus::Done);
    assert_eq!(record.body(), "body\r\n");
}

#[rstest]
fn custom_kinds_and_side_keys_survive_encoding() {
    let kind = RecordKind::try_from("Research-Note").expect("usable kind name");
    let record = Record::builder(RecordId::new("NOTE-1").expect("valid id"), "Notes", kind)
        .build(&ManualClock::default())
        .expect("valid record")
        .with_extra("sprint", serde_yaml::Value::from(12))
        .expect("free side-map key");

    let encoded = codec::encode(&record).expect("record should encode");
    assert!(encoded.contains("kind: research-note"));
    assert_eq!(codec::decode_str(&encoded), Ok(record));
}
