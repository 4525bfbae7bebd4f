//! Properties over generated documents and dependency graphs.

use super::helpers::{clock, id};
use chrono::{DateTime, TimeDelta, Utc};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::runtime::Runtime;
use workledger::clock::ManualClock;
use workledger::record::codec;
use workledger::record::domain::{
    PersistedRecordData, Priority, RESERVED_METADATA_KEYS, Record, RecordId, RecordKind,
    RecordStatus,
};
use workledger::store::adapters::InMemoryRecordRepository;
use workledger::store::services::{RecordStoreError, TaskStore};

type ChainStore = TaskStore<InMemoryRecordRepository, ManualClock>;

fn priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Highest),
        Just(Priority::High),
        Just(Priority::Medium),
        Just(Priority::Low),
        Just(Priority::Lowest),
    ]
}

fn kind() -> impl Strategy<Value = RecordKind> {
    prop_oneof![
        proptest::sample::select(RecordKind::KNOWN.to_vec()),
        "[A-Za-z]{2,10}".prop_filter_map("unusable kind name", |name| {
            RecordKind::try_from(name.as_str()).ok()
        }),
        "[a-z][a-z0-9_-]{0,10}".prop_filter_map("known kind name", |name| {
            RecordKind::custom(&name).ok()
        }),
    ]
}

fn status() -> impl Strategy<Value = RecordStatus> {
    proptest::sample::select(RecordStatus::ALL.to_vec())
}

fn record_id() -> impl Strategy<Value = RecordId> {
    "[A-Za-z0-9][A-Za-z0-9_.-]{0,11}".prop_filter_map("invalid id", |text| RecordId::new(text).ok())
}

fn timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (0_i64..4_000_000_000, 0_i64..1_000).prop_map(|(secs, millis)| {
        DateTime::UNIX_EPOCH + TimeDelta::seconds(secs) + TimeDelta::milliseconds(millis)
    })
}

fn person() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[A-Za-z0-9][A-Za-z0-9 @._:-]{0,15}")
}

fn side_value() -> impl Strategy<Value = serde_yaml::Value> {
    let leaf = prop_oneof![
        Just(serde_yaml::Value::Null),
        any::<bool>().prop_map(serde_yaml::Value::from),
        any::<i64>().prop_map(serde_yaml::Value::from),
        "[A-Za-z0-9 :#,'-]{0,12}".prop_map(serde_yaml::Value::from),
    ];
    leaf.prop_recursive(2, 8, 3, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..3).prop_map(serde_yaml::Value::Sequence),
            proptest::collection::btree_map("[a-z]{1,6}", inner, 0..3).prop_map(|entries| {
                serde_yaml::Value::Mapping(
                    entries
                        .into_iter()
                        .map(|(key, value)| (serde_yaml::Value::from(key), value))
                        .collect(),
                )
            }),
        ]
    })
}

fn side_map() -> impl Strategy<Value = BTreeMap<String, serde_yaml::Value>> {
    proptest::collection::btree_map(
        "[a-z][a-z0-9_]{0,10}".prop_filter("reserved key", |key| {
            !RESERVED_METADATA_KEYS.contains(&key.as_str())
        }),
        side_value(),
        0..4,
    )
}

fn timing() -> impl Strategy<Value = (DateTime<Utc>, DateTime<Utc>, u64)> {
    (timestamp(), 0_i64..10_000_000, any::<u64>()).prop_map(|(created_at, age, revision)| {
        (created_at, created_at + TimeDelta::seconds(age), revision)
    })
}

type People = (Option<String>, Option<String>, Option<String>, Option<String>);

fn people() -> impl Strategy<Value = People> {
    (
        person(),
        person(),
        person(),
        proptest::option::of("[a-z]{1,8}(/[a-z0-9.]{1,8}){0,2}"),
    )
}

prop_compose! {
    fn stored_record()(
        id in record_id(),
        title in "[A-Za-z0-9]([A-Za-z0-9 ,.:!?'#é-]{0,38}[A-Za-z0-9])?",
        kind in kind(),
        status in status(),
        priority in priority(),
        (created_at, updated_at, revision) in timing(),
        parent in proptest::option::of(record_id()),
        depends_on in proptest::collection::btree_set(record_id(), 0..4),
        tags in proptest::collection::btree_set("[a-z][a-z0-9-]{0,11}", 0..4),
        (assigned_to, reporter, owner, schema_ref) in people(),
        (extra, body) in (side_map(), "[A-Za-z0-9 #*\\[\\]\n-]{0,80}"),
    ) -> Record {
        Record::from_persisted(PersistedRecordData {
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
            body,
        })
    }
}

fn runtime() -> Result<Runtime, TestCaseError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| TestCaseError::fail(err.to_string()))
}

fn fail(err: impl ToString) -> TestCaseError {
    TestCaseError::fail(err.to_string())
}

/// Stores `R0 <- R1 <- ... <- R{len-1}`, each depending on its predecessor.
async fn chain(len: usize) -> eyre::Result<ChainStore> {
    let clock = clock();
    let store = TaskStore::new(
        Arc::new(InMemoryRecordRepository::new()),
        Arc::new(clock.clone()),
    );
    for index in 0..len {
        let mut builder = Record::builder(
            id(&format!("R{index}"))?,
            format!("Step {index}"),
            RecordKind::Task,
        );
        if let Some(previous) = index.checked_sub(1) {
            builder = builder.with_dependency(id(&format!("R{previous}"))?);
        }
        store.create(builder.build(&clock)?).await?;
    }
    Ok(store)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn documents_round_trip(record in stored_record()) {
        let encoded = codec::encode(&record).map_err(fail)?;
        let decoded = codec::decode_str(&encoded).map_err(fail)?;

        prop_assert_eq!(decoded, record);
    }

    #[test]
    fn fresh_records_round_trip(
        title in "[A-Za-z0-9]([A-Za-z0-9 ,.!?]{0,38}[A-Za-z0-9])?",
        tags in proptest::collection::vec("[a-z][a-z0-9-]{0,11}", 0..4),
        priority in priority(),
        kind in kind(),
    ) {
        let record = Record::builder(id("P-1").map_err(fail)?, title, kind)
            .with_priority(priority)
            .with_tags(tags)
            .build(&clock())
            .map_err(fail)?;

        let encoded = codec::encode(&record).map_err(fail)?;
        let decoded = codec::decode_str(&encoded).map_err(fail)?;

        prop_assert_eq!(decoded, record);
    }

    #[test]
    fn backward_edges_never_close_a_cycle(
        (len, from, to) in (2_usize..8).prop_flat_map(|len| (Just(len), 1..len))
            .prop_flat_map(|(len, from)| (Just(len), Just(from), 0..from)),
    ) {
        let outcome = runtime()?.block_on(async {
            let store = chain(len).await?;
            let target = id(&format!("R{to}"))?;
            store
                .update(&id(&format!("R{from}"))?, move |record| record.with_dependency(target))
                .await
                .map_err(eyre::Report::from)
        });
        prop_assert!(outcome.is_ok(), "unexpected failure: {:?}", outcome.err());
    }

    #[test]
    fn forward_edges_always_close_a_cycle(
        (len, from, to) in (2_usize..8).prop_flat_map(|len| (Just(len), 0..len - 1))
            .prop_flat_map(|(len, from)| (Just(len), Just(from), from + 1..len)),
    ) {
        let runtime = runtime()?;
        let store = runtime.block_on(chain(len)).map_err(fail)?;
        let target = id(&format!("R{to}")).map_err(fail)?;
        let outcome = runtime.block_on(
            store.update(&id(&format!("R{from}")).map_err(fail)?, move |record| {
                record.with_dependency(target)
            }),
        );

        prop_assert!(
            matches!(outcome, Err(RecordStoreError::CycleDetected(_))),
            "expected a cycle, got {:?}",
            outcome
        );
        let untouched = runtime
            .block_on(store.get(&id(&format!("R{from}")).map_err(fail)?))
            .map_err(fail)?;
        prop_assert_eq!(untouched.revision(), 1);
    }
}
