//! Record storage and search through a DataContext on a temporary root.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use uuid::Uuid;

use tabsearch_index::{CompactionPolicy, DataContext, IndexError, PageRequest, WriteReport};
use tabsearch_types::{
    FieldDescriptor, FieldType, FieldValue, FilterExpression, Record, RecordSchema, TypesError,
};

struct Harness {
    _temp_dir: TempDir,
    context: DataContext,
}

impl Harness {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let context = DataContext::with_policy(
            temp_dir.path(),
            CompactionPolicy::new(100, Duration::MAX),
        );
        Self {
            _temp_dir: temp_dir,
            context,
        }
    }
}

fn contacts() -> Arc<RecordSchema> {
    Arc::new(
        RecordSchema::new("contacts", "account")
            .with_field(FieldDescriptor::new("account", FieldType::ShortText))
            .with_field(FieldDescriptor::new("k", FieldType::Int64).primary_key())
            .with_field(FieldDescriptor::new("v", FieldType::ShortText))
            .with_field(FieldDescriptor::new("bio", FieldType::LongText)),
    )
}

fn contact(k: i64, v: &str, bio: &str) -> Record {
    Record::new(contacts())
        .with("account", "acct-1")
        .unwrap()
        .with("k", k)
        .unwrap()
        .with("v", v)
        .unwrap()
        .with("bio", bio)
        .unwrap()
}

fn by_key(k: i64) -> Record {
    Record::new(contacts())
        .with("account", "acct-1")
        .unwrap()
        .with("k", k)
        .unwrap()
}

fn partition_template() -> Record {
    Record::new(contacts()).with("account", "acct-1").unwrap()
}

fn text_of(record: &Record, field: &str) -> String {
    record
        .get(field)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

#[test]
fn test_insert_is_visible_to_next_search() {
    let h = Harness::new();
    let none = FilterExpression::new();

    h.context.insert(&[contact(1, "a", "first")]).unwrap();
    let page = h
        .context
        .select(&by_key(1), &none, PageRequest::unbounded(), None)
        .unwrap();
    assert_eq!(page.total, 1);
    assert!(page.records[0].score().unwrap() >= 0.0);

    // The searcher is cached now; the next write must invalidate it.
    h.context.insert(&[contact(2, "b", "second")]).unwrap();
    let page = h
        .context
        .select(&by_key(2), &none, PageRequest::unbounded(), None)
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(text_of(&page.records[0], "v"), "b");
}

#[test]
fn test_update_replaces_previous_version() {
    let h = Harness::new();
    h.context.insert(&[contact(1, "a", "")]).unwrap();
    assert_eq!(h.context.update(&[contact(1, "b", "")]).unwrap(), 1);

    let page = h
        .context
        .select(&by_key(1), &FilterExpression::new(), PageRequest::unbounded(), None)
        .unwrap();
    let values: Vec<String> = page.records.iter().map(|r| text_of(r, "v")).collect();
    assert_eq!(values, vec!["b".to_string()]);
}

#[test]
fn test_delete_removes_all_matches() {
    let h = Harness::new();
    h.context
        .insert(&[contact(1, "a", ""), contact(1, "b", ""), contact(2, "c", "")])
        .unwrap();

    let report = h.context.delete_counted(&[by_key(1)]).unwrap();
    assert_eq!(
        report,
        WriteReport {
            attempted: 1,
            added: 0,
            deleted: 2
        }
    );

    let none = FilterExpression::new();
    let page = h
        .context
        .select(&by_key(1), &none, PageRequest::unbounded(), None)
        .unwrap();
    assert_eq!(page.total, 0);

    let rest = h
        .context
        .select(&partition_template(), &none, PageRequest::unbounded(), None)
        .unwrap();
    assert_eq!(rest.total, 1);
}

#[test]
fn test_counts_report_attempts_not_matches() {
    let h = Harness::new();
    h.context.insert(&[contact(1, "a", "")]).unwrap();

    // Neither key exists, yet both records count as processed.
    assert_eq!(h.context.delete(&[by_key(7), by_key(8)]).unwrap(), 2);
    let report = h.context.delete_counted(&[by_key(7)]).unwrap();
    assert_eq!(report.deleted, 0);
}

#[test]
fn test_paging_and_total_semantics() {
    let h = Harness::new();
    let batch: Vec<Record> = (1..=5).map(|k| contact(k, "same", "row")).collect();
    h.context.insert(&batch).unwrap();

    let none = FilterExpression::new();
    let template = partition_template();

    let second = h
        .context
        .select(&template, &none, PageRequest::new(2, 2), None)
        .unwrap();
    assert_eq!(second.records.len(), 2);
    assert_eq!(second.total, 2);
    assert_eq!(second.matched, 5);

    let last = h
        .context
        .select(&template, &none, PageRequest::new(3, 2), None)
        .unwrap();
    assert_eq!(last.total, 1);

    let past_end = h
        .context
        .select(&template, &none, PageRequest::new(4, 2), None)
        .unwrap();
    assert_eq!(past_end.total, 0);
    assert_eq!(past_end.matched, 5);

    let everything = h
        .context
        .select(&template, &none, PageRequest::new(0, 2), Some("k"))
        .unwrap();
    assert_eq!(everything.total, 5);
}

#[test]
fn test_filter_words_and_phrases() {
    let h = Harness::new();
    h.context
        .insert(&[
            contact(1, "x", "likes red blue skies"),
            contact(2, "y", "likes blue red skies"),
            contact(3, "z", "likes green"),
        ])
        .unwrap();
    let template = partition_template();

    let any_word = FilterExpression::new().condition("bio", "=", "red green");
    let page = h
        .context
        .select(&template, &any_word, PageRequest::unbounded(), None)
        .unwrap();
    assert_eq!(page.total, 3);

    let phrase = FilterExpression::new().condition("bio", "=", "\"red blue\"");
    let page = h
        .context
        .select(&template, &phrase, PageRequest::unbounded(), None)
        .unwrap();
    let keys: Vec<i64> = page
        .records
        .iter()
        .filter_map(|r| r.get("k").and_then(|v| v.as_i64()))
        .collect();
    assert_eq!(keys, vec![1]);
}

#[test]
fn test_key_and_filter_must_both_match() {
    let h = Harness::new();
    h.context
        .insert(&[contact(1, "x", "alpha"), contact(2, "y", "alpha")])
        .unwrap();

    let filter = FilterExpression::new().condition("bio", "=", "alpha");
    let page = h
        .context
        .select(&by_key(2), &filter, PageRequest::unbounded(), None)
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(text_of(&page.records[0], "v"), "y");
}

#[test]
fn test_partitions_are_isolated() {
    let h = Harness::new();
    h.context.insert(&[contact(1, "a", "")]).unwrap();

    let other = Record::new(contacts()).with("account", "acct-2").unwrap();
    let page = h
        .context
        .select(&other, &FilterExpression::new(), PageRequest::unbounded(), None)
        .unwrap();
    assert_eq!(page.total, 0);
    assert!(!h
        .context
        .directories()
        .base_dir()
        .join("acct-2")
        .join("contacts")
        .join("meta.json")
        .exists());
}

#[test]
fn test_every_type_survives_storage() {
    let schema = Arc::new(
        RecordSchema::new("samples", "bucket")
            .with_field(FieldDescriptor::new("bucket", FieldType::ShortText))
            .with_field(FieldDescriptor::new("id", FieldType::Identifier).primary_key())
            .with_field(FieldDescriptor::new("i32", FieldType::Int32))
            .with_field(FieldDescriptor::new("i64", FieldType::Int64))
            .with_field(FieldDescriptor::new("f64", FieldType::Float64))
            .with_field(FieldDescriptor::new("flag", FieldType::Bool))
            .with_field(FieldDescriptor::new("body", FieldType::LongText))
            .with_field(FieldDescriptor::new("at", FieldType::Timestamp)),
    );
    let h = Harness::new();
    let id = Uuid::new_v4();
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();

    let stored = Record::new(schema.clone())
        .with("bucket", "b")
        .unwrap()
        .with("id", id)
        .unwrap()
        .with("i32", i32::MIN)
        .unwrap()
        .with("i64", i64::MIN)
        .unwrap()
        .with("f64", f64::MIN)
        .unwrap()
        .with("flag", true)
        .unwrap()
        .with("body", "Mixed Case Body")
        .unwrap()
        .with("at", at)
        .unwrap();
    h.context.insert(&[stored.clone()]).unwrap();

    let template = Record::new(schema).with("bucket", "b").unwrap().with("id", id).unwrap();
    let page = h
        .context
        .select(&template, &FilterExpression::new(), PageRequest::unbounded(), None)
        .unwrap();
    assert_eq!(page.total, 1);

    let found = &page.records[0];
    for name in ["bucket", "id", "i32", "i64", "f64", "flag", "body", "at"] {
        assert_eq!(found.get(name), stored.get(name), "field {}", name);
    }
    assert_eq!(found.get("i32"), Some(&FieldValue::Int32(i32::MIN)));
}

#[test]
fn test_missing_storage_key_is_rejected() {
    let h = Harness::new();
    let keyless = Record::new(contacts()).with("k", 1i64).unwrap();
    assert!(matches!(
        h.context.select(&keyless, &FilterExpression::new(), PageRequest::unbounded(), None),
        Err(IndexError::MissingStorageKey { .. })
    ));
}

#[test]
fn test_malformed_filter_is_an_error() {
    let h = Harness::new();
    h.context.insert(&[contact(1, "a", "")]).unwrap();

    let filter = FilterExpression::new().condition("nickname", "=", "x");
    assert!(matches!(
        h.context
            .select(&partition_template(), &filter, PageRequest::unbounded(), None),
        Err(IndexError::QueryParse(_))
    ));
}

#[test]
fn test_duplicate_field_schema_is_an_error() {
    let h = Harness::new();
    let duplicated = Arc::new(
        RecordSchema::new("ledger", "acct")
            .with_field(FieldDescriptor::new("acct", FieldType::ShortText))
            .with_field(FieldDescriptor::new("x", FieldType::Int64))
            .with_field(FieldDescriptor::new("x", FieldType::ShortText)),
    );
    let record = Record::new(duplicated).with("acct", "a").unwrap();

    for result in [
        h.context.insert(std::slice::from_ref(&record)),
        h.context.update(std::slice::from_ref(&record)),
        h.context.delete(std::slice::from_ref(&record)),
    ] {
        assert!(matches!(
            result,
            Err(IndexError::Types(TypesError::InvalidInput(_)))
        ));
    }
    assert_eq!(h.context.write_count().unwrap(), 0);
    assert!(!h
        .context
        .directories()
        .base_dir()
        .join("a")
        .join("ledger")
        .join("meta.json")
        .exists());
}
