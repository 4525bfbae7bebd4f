//! Metadata block parsing and rendering.

use super::{CodecError, REQUIRED_KEYS};
use crate::record::domain::{
    PersistedRecordData, Priority, Record, RecordId, RecordKind, RecordStatus,
};
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, BTreeSet};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Builds a record from a metadata block and the body that followed it.
pub(super) fn parse(metadata: &str, body: &str) -> Result<Record, CodecError> {
    let value: Value = serde_yaml::from_str(metadata)
        .map_err(|err| CodecError::malformed(format!("metadata is not valid YAML: {err}")))?;
    let mut mapping = match value {
        Value::Mapping(mapping) => mapping,
        Value::Null => Mapping::new(),
        _ => return Err(CodecError::malformed("metadata block must be a mapping")),
    };

    let missing: Vec<String> = REQUIRED_KEYS
        .iter()
        .filter(|key| mapping.get(*key).is_none_or(Value::is_null))
        .map(|key| (*key).to_owned())
        .collect();
    if !missing.is_empty() {
        return Err(CodecError::SchemaViolation { missing });
    }

    let id = parse_record_id("id", &take_string(&mut mapping, "id")?.unwrap_or_default())?;
    let title = take_string(&mut mapping, "title")?.unwrap_or_default();
    if title.trim().is_empty() {
        return Err(CodecError::invalid_value("title", "title must not be blank"));
    }
    let kind_text = take_string(&mut mapping, "kind")?.unwrap_or_default();
    let kind = RecordKind::try_from(kind_text.as_str())
        .map_err(|err| CodecError::invalid_value("kind", err.to_string()))?;
    let status_text = take_string(&mut mapping, "status")?.unwrap_or_default();
    let status = RecordStatus::try_from(status_text.as_str())
        .map_err(|err| CodecError::invalid_value("status", err.to_string()))?;
    let priority = match take_string(&mut mapping, "priority")? {
        Some(text) => Priority::try_from(text.as_str())
            .map_err(|err| CodecError::invalid_value("priority", err.to_string()))?,
        None => Priority::default(),
    };

    let created_date = take_date(&mut mapping, "created_date")?;
    let updated_date = take_date(&mut mapping, "updated_date")?;
    let created_at = take_timestamp(&mut mapping, "created_at")?.unwrap_or(created_date);
    let updated_at = take_timestamp(&mut mapping, "updated_at")?.unwrap_or(updated_date);

    let revision = match take(&mut mapping, "revision") {
        Some(value) => value
            .as_u64()
            .ok_or_else(|| CodecError::invalid_value("revision", "expected a non-negative integer"))?,
        None => 0,
    };

    let parent = take_string(&mut mapping, "parent")?
        .map(|text| parse_record_id("parent", &text))
        .transpose()?;
    let depends_on = take_list(&mut mapping, "depends_on")?
        .iter()
        .map(|text| parse_record_id("depends_on", text))
        .collect::<Result<BTreeSet<_>, _>>()?;
    let tags = take_list(&mut mapping, "tags")?.into_iter().collect();

    let assigned_to = take_string(&mut mapping, "assigned_to")?;
    let reporter = take_string(&mut mapping, "reporter")?;
    let owner = take_string(&mut mapping, "owner")?;
    let schema_ref = take_string(&mut mapping, "schema_ref")?;

    let extra = collect_extra(mapping)?;

    Ok(Record::from_persisted(PersistedRecordData {
        id,
        title,
        kind,
        status,
        priority,
        created_at,
        updated_at,
        revision,
        parent,
        depends_on,
        tags,
        assigned_to,
        reporter,
        owner,
        schema_ref,
        extra,
        body: body.to_owned(),
    }))
}

/// Renders a record's metadata block, without delimiters.
pub(super) fn render(record: &Record) -> Result<String, CodecError> {
    let mut mapping = Mapping::new();
    insert(&mut mapping, "id", Value::from(record.id().as_str()));
    insert(&mut mapping, "title", Value::from(record.title()));
    insert(&mut mapping, "kind", Value::from(record.kind().as_str()));
    insert(&mut mapping, "status", Value::from(record.status().label()));
    insert(&mut mapping, "priority", Value::from(record.priority().as_str()));
    insert(&mut mapping, "created_date", render_date(record.created_at()));
    insert(&mut mapping, "updated_date", render_date(record.updated_at()));
    insert(&mut mapping, "created_at", render_timestamp(record.created_at()));
    insert(&mut mapping, "updated_at", render_timestamp(record.updated_at()));
    insert(&mut mapping, "revision", Value::from(record.revision()));
    if let Some(parent) = record.parent() {
        insert(&mut mapping, "parent", Value::from(parent.as_str()));
    }
    if !record.depends_on().is_empty() {
        let dependencies = record
            .depends_on()
            .iter()
            .map(|id| Value::from(id.as_str()))
            .collect();
        insert(&mut mapping, "depends_on", Value::Sequence(dependencies));
    }
    let tags = record.tags().iter().map(|tag| Value::from(tag.as_str())).collect();
    insert(&mut mapping, "tags", Value::Sequence(tags));
    for (key, value) in [
        ("assigned_to", record.assigned_to()),
        ("reporter", record.reporter()),
        ("owner", record.owner()),
        ("schema_ref", record.schema_ref()),
    ] {
        if let Some(text) = value {
            insert(&mut mapping, key, Value::from(text));
        }
    }
    for (key, value) in record.extra() {
        mapping.insert(Value::from(key.as_str()), value.clone());
    }

    serde_yaml::to_string(&Value::Mapping(mapping))
        .map_err(|err| CodecError::Serialize(err.to_string()))
}

fn insert(mapping: &mut Mapping, key: &str, value: Value) {
    mapping.insert(Value::from(key), value);
}

fn render_date(timestamp: DateTime<Utc>) -> Value {
    Value::from(timestamp.format(DATE_FORMAT).to_string())
}

fn render_timestamp(timestamp: DateTime<Utc>) -> Value {
    Value::from(timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Removes `key`, treating an explicit null like an absent key.
fn take(mapping: &mut Mapping, key: &str) -> Option<Value> {
    mapping.remove(key).filter(|value| !value.is_null())
}

fn take_string(mapping: &mut Mapping, key: &str) -> Result<Option<String>, CodecError> {
    take(mapping, key)
        .map(|value| scalar_to_string(key, &value))
        .transpose()
}

fn scalar_to_string(key: &str, value: &Value) -> Result<String, CodecError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        _ => Err(CodecError::invalid_value(key, "expected a scalar value")),
    }
}

/// Reads a list key, accepting a YAML sequence or a comma-separated string.
fn take_list(mapping: &mut Mapping, key: &str) -> Result<Vec<String>, CodecError> {
    let Some(value) = take(mapping, key) else {
        return Ok(Vec::new());
    };
    let items = match value {
        Value::Sequence(items) => items
            .iter()
            .map(|item| scalar_to_string(key, item))
            .collect::<Result<Vec<_>, _>>()?,
        Value::String(text) => text
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => return Err(CodecError::invalid_value(key, "expected a list")),
    };
    Ok(items)
}

/// Reads a date key as midnight UTC. Full RFC 3339 timestamps are accepted
/// as well.
fn take_date(mapping: &mut Mapping, key: &str) -> Result<DateTime<Utc>, CodecError> {
    let text = take_string(mapping, key)?.unwrap_or_default();
    let trimmed = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| CodecError::invalid_value(key, format!("expected YYYY-MM-DD, got '{text}'")))
}

fn take_timestamp(mapping: &mut Mapping, key: &str) -> Result<Option<DateTime<Utc>>, CodecError> {
    take_string(mapping, key)?
        .map(|text| {
            DateTime::parse_from_rfc3339(text.trim())
                .map(|timestamp| timestamp.with_timezone(&Utc))
                .map_err(|err| CodecError::invalid_value(key, err.to_string()))
        })
        .transpose()
}

fn parse_record_id(key: &str, text: &str) -> Result<RecordId, CodecError> {
    RecordId::new(text).map_err(|err| CodecError::invalid_value(key, err.to_string()))
}

fn collect_extra(mapping: Mapping) -> Result<BTreeMap<String, Value>, CodecError> {
    mapping
        .into_iter()
        .map(|(key, value)| match key {
            Value::String(name) => Ok((name, value)),
            _ => Err(CodecError::malformed("metadata keys must be strings")),
        })
        .collect()
}
