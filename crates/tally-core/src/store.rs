use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::task::TaskItem;

pub const TASKS_KEY: &str = "tasks";

/// The durable slot: a text key/value store with finite capacity that
/// may reject writes.
pub trait Slot {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// One file per key under a data directory. Writes go through a temp
/// file rename so a rejected or interrupted write never truncates the
/// previous payload.
#[derive(Debug)]
pub struct FileSlot {
    dir: PathBuf,
}

impl FileSlot {
    #[tracing::instrument(skip(dir))]
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        info!(dir = %dir.display(), "opened file slot");
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl Slot for FileSlot {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(raw) => Some(raw),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!(file = %path.display(), error = %err, "failed reading slot; treating as absent");
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        debug!(file = %path.display(), bytes = value.len(), "writing slot");

        let mut temp = NamedTempFile::new_in(&self.dir)?;
        temp.write_all(value.as_bytes())?;
        temp.flush()?;
        temp.persist(&path)
            .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
        Ok(())
    }
}

/// In-process slot for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySlot {
    map: HashMap<String, String>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Slot for MemorySlot {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Write-through binding between an in-memory value and one slot key.
///
/// Loading falls back to the default on an absent or malformed payload;
/// a rejected write leaves the in-memory value authoritative for the
/// session. Neither path surfaces an error to the caller.
#[derive(Debug)]
pub struct PersistedStore<T, S: Slot> {
    key: String,
    slot: S,
    value: T,
}

impl<T, S> PersistedStore<T, S>
where
    T: Serialize + DeserializeOwned,
    S: Slot,
{
    pub fn open(slot: S, key: &str, default: T) -> Self {
        let value = match slot.get(key) {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(err) => {
                    warn!(key, error = %err, "malformed slot payload; using default");
                    default
                }
            },
            None => {
                debug!(key, "slot empty; using default");
                default
            }
        };

        Self {
            key: key.to_string(),
            slot,
            value,
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
        self.persist();
    }

    fn persist(&mut self) {
        let raw = match serde_json::to_string(&self.value) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key = %self.key, error = %err, "failed to serialize value; skipping write");
                return;
            }
        };

        if let Err(err) = self.slot.set(&self.key, &raw) {
            warn!(key = %self.key, error = %err, "slot rejected write; continuing in memory");
        }
    }
}

/// The canonical task collection, persisted under [`TASKS_KEY`] as a
/// JSON array. Every mutation replaces the whole collection and writes
/// it back.
#[derive(Debug)]
pub struct TaskBook<S: Slot> {
    store: PersistedStore<Vec<TaskItem>, S>,
}

impl<S: Slot> TaskBook<S> {
    pub fn open(slot: S) -> Self {
        let store = PersistedStore::open(slot, TASKS_KEY, Vec::new());
        debug!(count = store.get().len(), "opened task book");
        Self { store }
    }

    pub fn items(&self) -> &[TaskItem] {
        self.store.get()
    }

    pub fn find(&self, id: &str) -> Option<&TaskItem> {
        self.items().iter().find(|item| item.id == id)
    }

    /// Upsert by id: replace in place when the id exists (insertion
    /// position preserved), append otherwise.
    #[tracing::instrument(skip(self, item), fields(id = %item.id))]
    pub fn save(&mut self, item: TaskItem) {
        let mut items = self.store.get().clone();
        match items.iter().position(|existing| existing.id == item.id) {
            Some(pos) => {
                items[pos] = item;
                debug!("replaced existing task");
            }
            None => {
                items.push(item);
                debug!("appended new task");
            }
        }
        self.store.set(items);
    }

    /// Flips `completed` on the matching item. Returns false (no-op)
    /// when the id is not present.
    #[tracing::instrument(skip(self))]
    pub fn toggle(&mut self, id: &str) -> bool {
        let mut items = self.store.get().clone();
        let Some(found) = items.iter_mut().find(|item| item.id == id) else {
            debug!("toggle on unknown id ignored");
            return false;
        };
        found.completed = !found.completed;
        self.store.set(items);
        true
    }

    /// Removes the matching item. Returns false (no-op) when the id is
    /// not present.
    #[tracing::instrument(skip(self))]
    pub fn delete(&mut self, id: &str) -> bool {
        let mut items = self.store.get().clone();
        let before = items.len();
        items.retain(|item| item.id != id);
        if items.len() == before {
            debug!("delete on unknown id ignored");
            return false;
        }
        self.store.set(items);
        true
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::{FileSlot, MemorySlot, PersistedStore, Slot, TASKS_KEY, TaskBook};
    use crate::task::{Priority, TaskItem};

    struct RejectingSlot;

    impl Slot for RejectingSlot {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&mut self, _key: &str, _value: &str) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("quota exceeded"))
        }
    }

    fn item(id: &str, title: &str) -> TaskItem {
        TaskItem {
            id: id.to_string(),
            title: title.to_string(),
            due_date: NaiveDate::from_ymd_opt(2024, 1, 5),
            priority: Priority::Low,
            category: "Shopping".to_string(),
            completed: false,
        }
    }

    #[test]
    fn open_uses_default_when_slot_is_empty() {
        let store: PersistedStore<Vec<u32>, _> =
            PersistedStore::open(MemorySlot::new(), "numbers", vec![7]);
        assert_eq!(store.get(), &vec![7]);
    }

    #[test]
    fn open_uses_default_on_malformed_payload() {
        let mut slot = MemorySlot::new();
        slot.set(TASKS_KEY, "not json at all").expect("set");

        let book = TaskBook::open(slot);
        assert!(book.items().is_empty());
    }

    #[test]
    fn set_writes_through_immediately() {
        let mut store = PersistedStore::open(MemorySlot::new(), "numbers", Vec::<u32>::new());
        store.set(vec![1, 2, 3]);
        assert_eq!(store.slot.get("numbers").as_deref(), Some("[1,2,3]"));
    }

    #[test]
    fn persisting_twice_is_idempotent() {
        let mut store = PersistedStore::open(MemorySlot::new(), "numbers", Vec::<u32>::new());
        store.set(vec![1, 2]);
        let first = store.slot.get("numbers");
        store.set(vec![1, 2]);
        assert_eq!(store.slot.get("numbers"), first);
    }

    #[test]
    fn rejected_write_keeps_in_memory_value() {
        let mut book = TaskBook::open(RejectingSlot);
        book.save(item("1", "Buy milk"));
        assert_eq!(book.items().len(), 1);

        assert!(book.toggle("1"));
        assert!(book.items()[0].completed);
    }

    #[test]
    fn save_appends_new_ids_in_order() {
        let mut book = TaskBook::open(MemorySlot::new());
        book.save(item("1", "Buy milk"));
        book.save(item("2", "Write report"));

        let ids: Vec<&str> = book.items().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn save_replaces_existing_id_in_place() {
        let mut book = TaskBook::open(MemorySlot::new());
        book.save(item("1", "Buy milk"));
        book.save(item("2", "Write report"));
        book.save(item("1", "Buy oat milk"));

        assert_eq!(book.items().len(), 2);
        assert_eq!(book.items()[0].id, "1");
        assert_eq!(book.items()[0].title, "Buy oat milk");
        assert_eq!(book.items()[1].title, "Write report");
    }

    #[test]
    fn toggle_is_self_inverse() {
        let mut book = TaskBook::open(MemorySlot::new());
        book.save(item("2", "Write report"));

        assert!(book.toggle("2"));
        assert!(book.items()[0].completed);
        assert!(book.toggle("2"));
        assert!(!book.items()[0].completed);
    }

    #[test]
    fn toggle_and_delete_are_no_ops_for_unknown_ids() {
        let mut book = TaskBook::open(MemorySlot::new());
        book.save(item("1", "Buy milk"));

        assert!(!book.toggle("3"));
        assert!(!book.delete("3"));
        assert_eq!(book.items().len(), 1);
        assert!(!book.items()[0].completed);
    }

    #[test]
    fn delete_removes_matching_id() {
        let mut book = TaskBook::open(MemorySlot::new());
        book.save(item("1", "Buy milk"));
        book.save(item("2", "Write report"));

        assert!(book.delete("1"));
        let ids: Vec<&str> = book.items().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["2"]);
    }

    #[test]
    fn unreadable_slot_entry_is_treated_as_absent() {
        let temp = tempdir().expect("tempdir");
        // A directory at the key path makes the read fail with
        // something other than NotFound.
        std::fs::create_dir(temp.path().join("tasks")).expect("mkdir");

        let slot = FileSlot::open(temp.path()).expect("open slot");
        assert_eq!(slot.get("tasks"), None);

        let book = TaskBook::open(slot);
        assert!(book.items().is_empty());
    }

    #[test]
    fn file_slot_round_trips_across_opens() {
        let temp = tempdir().expect("tempdir");

        let mut slot = FileSlot::open(temp.path()).expect("open slot");
        assert_eq!(slot.get("tasks"), None);
        slot.set("tasks", "[]").expect("set");

        let reopened = FileSlot::open(temp.path()).expect("reopen slot");
        assert_eq!(reopened.get("tasks").as_deref(), Some("[]"));
    }
}
