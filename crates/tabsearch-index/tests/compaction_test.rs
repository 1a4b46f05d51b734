//! Deferred compaction driven through a DataContext.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use tabsearch_index::{CompactionPolicy, DataContext, PageRequest};
use tabsearch_types::{
    FieldDescriptor, FieldType, FieldValue, FilterExpression, Record, RecordSchema,
};

fn events() -> Arc<RecordSchema> {
    Arc::new(
        RecordSchema::new("events", "source")
            .with_field(FieldDescriptor::new("source", FieldType::ShortText))
            .with_field(FieldDescriptor::new("seq", FieldType::Int64).primary_key()),
    )
}

fn event(seq: i64) -> Record {
    event_from("sensor", seq)
}

fn event_from(source: &str, seq: i64) -> Record {
    Record::new(events())
        .with("source", source)
        .unwrap()
        .with("seq", seq)
        .unwrap()
}

fn all_events(context: &DataContext, source: &str) -> Vec<Record> {
    let template = Record::new(events()).with("source", source).unwrap();
    context
        .select(&template, &FilterExpression::new(), PageRequest::unbounded(), None)
        .unwrap()
        .records
}

fn context(temp_dir: &TempDir) -> DataContext {
    DataContext::with_policy(temp_dir.path(), CompactionPolicy::new(100, Duration::MAX))
}

#[test]
fn test_hundred_writes_trigger_compaction() {
    let temp_dir = TempDir::new().unwrap();
    let context = context(&temp_dir);

    for seq in 0..99 {
        context.insert(&[event(seq)]).unwrap();
    }
    assert_eq!(context.write_count().unwrap(), 99);
    assert_eq!(context.compactions().unwrap(), 0);

    context.insert(&[event(99)]).unwrap();
    assert_eq!(context.write_count().unwrap(), 100);
    assert!(context.compactions().unwrap() >= 1);

    let template = Record::new(events()).with("source", "sensor").unwrap();
    let page = context
        .select(&template, &FilterExpression::new(), PageRequest::unbounded(), None)
        .unwrap();
    assert_eq!(page.total, 100);
}

#[test]
fn test_counter_is_shared_across_operations_and_partitions() {
    let temp_dir = TempDir::new().unwrap();
    let context = DataContext::with_policy(temp_dir.path(), CompactionPolicy::new(3, Duration::MAX));

    let elsewhere = Record::new(events())
        .with("source", "gateway")
        .unwrap()
        .with("seq", 1i64)
        .unwrap();

    context.insert(&[event(1)]).unwrap();
    context.update(&[elsewhere]).unwrap();
    assert_eq!(context.compactions().unwrap(), 0);

    context.delete(&[event(1)]).unwrap();
    assert_eq!(context.write_count().unwrap(), 3);
    assert_eq!(context.compactions().unwrap(), 1);
}

#[test]
fn test_elapsed_interval_triggers_compaction() {
    let temp_dir = TempDir::new().unwrap();
    let context = DataContext::with_policy(temp_dir.path(), CompactionPolicy::new(0, Duration::ZERO));

    std::thread::sleep(Duration::from_millis(5));
    context.insert(&[event(1)]).unwrap();
    assert_eq!(context.compactions().unwrap(), 1);
}

#[test]
fn test_disabled_policy_never_compacts() {
    let temp_dir = TempDir::new().unwrap();
    let context = DataContext::with_policy(temp_dir.path(), CompactionPolicy::disabled());

    let batch: Vec<Record> = (0..10).map(event).collect();
    assert_eq!(context.insert(&batch).unwrap(), 10);
    assert_eq!(context.compactions().unwrap(), 0);
}

#[test]
fn test_forced_compaction_keeps_documents() {
    let temp_dir = TempDir::new().unwrap();
    let context = context(&temp_dir);

    for seq in 0..4 {
        context.insert(&[event(seq)]).unwrap();
    }
    assert!(context.compact(&event(0)).unwrap());

    let template = Record::new(events()).with("source", "sensor").unwrap();
    let page = context
        .select(&template, &FilterExpression::new(), PageRequest::new(1, 10), None)
        .unwrap();
    assert_eq!(page.matched, 4);
}

#[test]
fn test_concurrent_writers_share_one_compaction_counter() {
    const WRITERS: usize = 4;
    const PER_WRITER: i64 = 25;
    const THRESHOLD: u64 = 10;

    let temp_dir = TempDir::new().unwrap();
    let context = Arc::new(DataContext::with_policy(
        temp_dir.path(),
        CompactionPolicy::new(THRESHOLD, Duration::MAX),
    ));
    let writing = Arc::new(AtomicBool::new(true));

    let reader = {
        let context = Arc::clone(&context);
        let writing = Arc::clone(&writing);
        thread::spawn(move || {
            let mut last_seen = 0usize;
            loop {
                let done = !writing.load(Ordering::Acquire);
                let seen = all_events(&context, "t0").len();
                assert!(seen <= PER_WRITER as usize);
                assert!(seen >= last_seen, "read went back from {} to {}", last_seen, seen);
                last_seen = seen;
                if done {
                    return last_seen;
                }
            }
        })
    };

    let writers: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let context = Arc::clone(&context);
            thread::spawn(move || {
                let source = format!("t{}", writer);
                for seq in 0..PER_WRITER {
                    context.insert(&[event_from(&source, seq)]).unwrap();
                }
            })
        })
        .collect();

    for handle in writers {
        handle.join().unwrap();
    }
    writing.store(false, Ordering::Release);
    assert_eq!(reader.join().unwrap(), PER_WRITER as usize);

    let total = WRITERS as u64 * PER_WRITER as u64;
    assert_eq!(context.write_count().unwrap(), total);
    assert_eq!(context.compactions().unwrap(), total / THRESHOLD);

    let seqs: BTreeSet<i64> = all_events(&context, "t0")
        .iter()
        .map(|record| match record.get("seq") {
            Some(FieldValue::Int64(seq)) => *seq,
            other => panic!("unexpected seq value {:?}", other),
        })
        .collect();
    assert_eq!(seqs, (0..PER_WRITER).collect::<BTreeSet<_>>());

    for writer in 1..WRITERS {
        assert_eq!(all_events(&context, &format!("t{}", writer)).len(), PER_WRITER as usize);
    }
}
