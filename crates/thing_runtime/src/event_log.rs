//! Event Log
//!
//! Bounded per-event-name history. Each declared event has its own FIFO ring
//! buffer behind its own lock; appending to a full buffer evicts the oldest
//! record and never fails or blocks on anything but that buffer.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use serde_json::{json, Value as JsonValue};

use crate::error::{ThingError, ThingResult};

/// Default number of records kept per event name
pub const DEFAULT_EVENT_CAPACITY: usize = 10;

/// Render a timestamp the way every message on the wire carries it
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// One occurrence of an event; immutable once created
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// Position in the thing's overall event order
    pub seq: u64,
    pub name: String,
    pub data: JsonValue,
    pub timestamp: DateTime<Utc>,
}

impl EventRecord {
    /// `{"<name>": {"data": ..., "timestamp": ...}}`
    pub fn to_json(&self) -> JsonValue {
        json!({
            &self.name: {
                "data": self.data,
                "timestamp": format_timestamp(&self.timestamp),
            }
        })
    }
}

/// Ring buffers for every declared event of one thing
pub struct EventLog {
    capacity: usize,
    buffers: HashMap<String, Mutex<VecDeque<Arc<EventRecord>>>>,
    next_seq: AtomicU64,
}

impl EventLog {
    /// Create a log for the given event names. A capacity of zero is raised to one.
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let buffers = names
            .into_iter()
            .map(|name| (name.to_string(), Mutex::new(VecDeque::with_capacity(capacity))))
            .collect();
        Self {
            capacity,
            buffers,
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, name: &str) -> bool {
        self.buffers.contains_key(name)
    }

    /// Append a record stamped now
    pub fn append(&self, name: &str, data: JsonValue) -> ThingResult<Arc<EventRecord>> {
        self.append_at(name, data, Utc::now())
    }

    /// Append a record with an explicit timestamp
    pub fn append_at(
        &self,
        name: &str,
        data: JsonValue,
        timestamp: DateTime<Utc>,
    ) -> ThingResult<Arc<EventRecord>> {
        let buffer = self
            .buffers
            .get(name)
            .ok_or_else(|| ThingError::not_found("event", name))?;

        let mut buffer = buffer.lock();
        // Sequence is taken under the buffer lock so each buffer stays sorted by seq
        let record = Arc::new(EventRecord {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            name: name.to_string(),
            data,
            timestamp,
        });
        if buffer.len() == self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(Arc::clone(&record));
        Ok(record)
    }

    /// Point-in-time copy of one event's history, oldest first
    pub fn snapshot(&self, name: &str) -> ThingResult<Vec<Arc<EventRecord>>> {
        let buffer = self
            .buffers
            .get(name)
            .ok_or_else(|| ThingError::not_found("event", name))?;
        let records = buffer.lock().iter().cloned().collect();
        Ok(records)
    }

    /// All retained records across event names, in append order
    pub fn snapshot_all(&self) -> Vec<Arc<EventRecord>> {
        let mut records: Vec<_> = self
            .buffers
            .values()
            .flat_map(|buffer| buffer.lock().iter().cloned().collect::<Vec<_>>())
            .collect();
        records.sort_by_key(|r| r.seq);
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_eviction_keeps_most_recent() {
        let log = EventLog::new(["tick"], 3);
        for i in 0..5 {
            log.append("tick", json!(i)).unwrap();
        }
        let data: Vec<_> = log
            .snapshot("tick")
            .unwrap()
            .iter()
            .map(|r| r.data.clone())
            .collect();
        assert_eq!(data, vec![json!(2), json!(3), json!(4)]);
    }

    #[test]
    fn test_unknown_event() {
        let log = EventLog::new(["tick"], 3);
        assert!(matches!(
            log.append("tock", JsonValue::Null),
            Err(ThingError::NotFound { kind: "event", .. })
        ));
        assert!(log.snapshot("tock").is_err());
    }

    #[test]
    fn test_zero_capacity_is_one() {
        let log = EventLog::new(["tick"], 0);
        log.append("tick", json!(1)).unwrap();
        log.append("tick", json!(2)).unwrap();
        assert_eq!(log.capacity(), 1);
        assert_eq!(log.snapshot("tick").unwrap()[0].data, json!(2));
    }

    #[test]
    fn test_snapshot_all_is_ordered() {
        let log = EventLog::new(["a", "b"], 10);
        log.append("a", json!(1)).unwrap();
        log.append("b", json!(2)).unwrap();
        log.append("a", json!(3)).unwrap();
        let names: Vec<_> = log.snapshot_all().iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_appends() {
        let log = EventLog::new(["tick"], 4);
        log.append("tick", json!(0)).unwrap();
        let before = log.snapshot("tick").unwrap();
        log.append("tick", json!(1)).unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(log.snapshot("tick").unwrap().len(), 2);
    }

    #[test]
    fn test_concurrent_appends() {
        let log = Arc::new(EventLog::new(["tick"], 16));
        let workers: Vec<_> = (0..4)
            .map(|w| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for i in 0..100 {
                        log.append("tick", json!(w * 100 + i)).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let records = log.snapshot("tick").unwrap();
        assert_eq!(records.len(), 16);
        assert!(records.windows(2).all(|w| w[0].seq < w[1].seq));
        assert_eq!(records.last().unwrap().seq, 399);
    }

    #[test]
    fn test_record_wire_shape() {
        let log = EventLog::new(["overheated"], 2);
        let record = log.append("overheated", json!(102)).unwrap();
        let value = record.to_json();
        assert_eq!(value["overheated"]["data"], json!(102));
        assert!(value["overheated"]["timestamp"].as_str().unwrap().ends_with('Z'));
    }
}
