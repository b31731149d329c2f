//! Segment lifecycle and concurrency tests.
//!
//! These run against real shared-memory objects, so every test uses a
//! process-qualified unique name and unlinks it on the way out.

use std::{
    sync::atomic::{AtomicU32, Ordering},
    thread,
};

use membridge_sbs::{DecodeError, Value};
use membridge_shm::{
    SegmentError, create_memory, read_memory, remove_memory, write_memory,
};
use num_bigint::BigInt;

static NEXT: AtomicU32 = AtomicU32::new(0);

fn unique_name(label: &str) -> String {
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    format!("/membridge-test-{}-{label}-{n}", std::process::id())
}

#[test]
fn create_is_first_writer_wins() {
    let name = unique_name("create");
    assert!(create_memory(&name, 16, false).unwrap());
    // Second creation finds the segment in place.
    assert!(!create_memory(&name, 16, false).unwrap());
    assert!(matches!(
        create_memory(&name, 16, true).unwrap_err(),
        SegmentError::AlreadyExists { .. }
    ));
    assert!(remove_memory(&name, false).unwrap());
}

#[test]
fn remove_is_idempotent_unless_asked_to_throw() {
    let name = unique_name("remove");
    assert!(create_memory(&name, 0, false).unwrap());
    assert!(remove_memory(&name, false).unwrap());
    assert!(!remove_memory(&name, false).unwrap());
    assert!(matches!(
        remove_memory(&name, true).unwrap_err(),
        SegmentError::NotFound { .. }
    ));
}

#[test]
fn write_then_read_round_trips() {
    let _ = tracing_subscriber::fmt().try_init();

    let name = unique_name("roundtrip");
    let value = Value::Dict(vec![
        (Value::Str("answer".into()), Value::Int(BigInt::from(42))),
        (Value::Str("flag".into()), Value::Bool(true)),
    ]);
    write_memory(&name, &value, true).unwrap();
    assert_eq!(read_memory(&name).unwrap(), value);
    assert!(remove_memory(&name, false).unwrap());
}

#[test]
fn reading_a_missing_segment_is_not_found() {
    let name = unique_name("missing");
    assert!(matches!(
        read_memory(&name).unwrap_err(),
        SegmentError::NotFound { .. }
    ));
}

#[test]
fn writing_without_create_requires_the_segment() {
    let name = unique_name("nocreate");
    assert!(matches!(
        write_memory(&name, &Value::None, false).unwrap_err(),
        SegmentError::NotFound { .. }
    ));
}

#[test]
fn an_empty_segment_reads_as_none() {
    let name = unique_name("empty");
    assert!(create_memory(&name, 0, false).unwrap());
    assert_eq!(read_memory(&name).unwrap(), Value::None);
    assert!(remove_memory(&name, false).unwrap());
}

#[test]
fn an_unwritten_payload_is_not_a_value() {
    let name = unique_name("zeros");
    assert!(create_memory(&name, 64, false).unwrap());
    // The preallocated payload is zero-filled, and zero is not a protocol.
    assert!(matches!(
        read_memory(&name).unwrap_err(),
        SegmentError::Decode(DecodeError::UnknownProtocol { byte: 0 })
    ));
    assert!(remove_memory(&name, false).unwrap());
}

#[test]
fn writes_grow_the_segment_in_place() {
    let name = unique_name("grow");
    write_memory(&name, &Value::Str("tiny".into()), true).unwrap();

    let big = Value::Str("y".repeat(100_000));
    write_memory(&name, &big, false).unwrap();
    assert_eq!(read_memory(&name).unwrap(), big);

    // Shrinking is never performed; the smaller value still reads back
    // because one value is decoded and trailing capacity is ignored.
    let small = Value::Str("small again".into());
    write_memory(&name, &small, false).unwrap();
    assert_eq!(read_memory(&name).unwrap(), small);

    assert!(remove_memory(&name, false).unwrap());
}

#[test]
fn concurrent_writers_and_readers_never_observe_a_torn_payload() {
    const WRITERS: usize = 4;
    const ROUNDS: usize = 40;

    let name = unique_name("contention");

    let candidate = |i: usize| {
        Value::Tuple(vec![
            Value::Int(BigInt::from(i)),
            Value::Str("x".repeat(64 * (i + 1))),
        ])
    };
    let initial = Value::Str("initial".into());
    write_memory(&name, &initial, true).unwrap();

    let mut candidates: Vec<Value> = (0..WRITERS).map(candidate).collect();
    candidates.push(initial);

    thread::scope(|scope| {
        for i in 0..WRITERS {
            let name = &name;
            scope.spawn(move || {
                let value = candidate(i);
                for _ in 0..ROUNDS {
                    write_memory(name, &value, false).unwrap();
                }
            });
        }

        let name = &name;
        let candidates = &candidates;
        scope.spawn(move || {
            for _ in 0..ROUNDS {
                let seen = read_memory(name).unwrap();
                assert!(
                    candidates.contains(&seen),
                    "reader observed a value no writer produced"
                );
            }
        });
    });

    // After the dust settles the payload is exactly one writer's value.
    let settled = read_memory(&name).unwrap();
    assert!(candidates.contains(&settled));
    assert!(remove_memory(&name, false).unwrap());
}
