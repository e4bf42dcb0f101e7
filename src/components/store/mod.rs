mod backend;
pub mod models;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use models::Schedule;

use crate::components::calendar::CalendarEvent;
use crate::error::{storage_error, AppResult, Error, ValidationErrors};
use chrono::{SecondsFormat, Utc};
use tracing::{debug, info};
use uuid::Uuid;

/// Prefix of the key holding a profile's schedules
pub const STORAGE_KEY_PREFIX: &str = "scheduleai:schedules:";

/// Storage key for a profile
pub fn storage_key(profile: &str) -> String {
    format!("{}{}", STORAGE_KEY_PREFIX, profile)
}

/// The saved schedules of one profile.
///
/// The whole collection is one JSON record; it is read once when the store is
/// opened and written back in full after every mutation.
pub struct ScheduleStore {
    backend: Box<dyn StorageBackend>,
    key: String,
    schedules: Vec<Schedule>,
}

impl ScheduleStore {
    /// Open the store for a profile, reading the saved collection
    pub fn open(backend: Box<dyn StorageBackend>, profile: &str) -> AppResult<Self> {
        let key = storage_key(profile);

        let schedules = match backend.get(&key)? {
            Some(content) if !content.trim().is_empty() => serde_json::from_str(&content)
                .map_err(|e| storage_error(&format!("Stored schedules under {} are corrupt: {}", key, e)))?,
            _ => Vec::new(),
        };

        info!("Opened schedule store {} with {} schedules", key, schedules.len());

        Ok(Self {
            backend,
            key,
            schedules,
        })
    }

    /// All saved schedules, oldest first
    pub fn list(&self) -> &[Schedule] {
        &self.schedules
    }

    /// A saved schedule with its name
    pub fn get(&self, id: &str) -> AppResult<&Schedule> {
        self.schedules
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Save events under a name and return the new schedule's id
    pub fn save(&mut self, name: &str, events: Vec<CalendarEvent>) -> AppResult<String> {
        let name = name.trim();
        if name.is_empty() {
            let mut errors = ValidationErrors::new();
            errors.push("name", "must not be empty");
            return Err(errors.into());
        }

        let schedule = Schedule {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            events,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        };
        let id = schedule.id.clone();

        self.schedules.push(schedule);
        if let Err(e) = self.persist() {
            // Keep memory in line with what is stored
            self.schedules.pop();
            return Err(e);
        }

        info!("Saved schedule '{}' as {}", name, id);
        Ok(id)
    }

    /// Events of a saved schedule
    pub fn load(&self, id: &str) -> AppResult<Vec<CalendarEvent>> {
        let schedule = self.get(id)?;
        debug!("Loaded schedule '{}' with {} events", schedule.name, schedule.events.len());
        Ok(schedule.events.clone())
    }

    /// Remove a saved schedule, returning it
    pub fn delete(&mut self, id: &str) -> AppResult<Schedule> {
        let position = self
            .schedules
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        let removed = self.schedules.remove(position);
        if let Err(e) = self.persist() {
            self.schedules.insert(position, removed);
            return Err(e);
        }

        info!("Deleted schedule '{}' ({})", removed.name, removed.id);
        Ok(removed)
    }

    fn persist(&self) -> AppResult<()> {
        let json = serde_json::to_string_pretty(&self.schedules)?;
        self.backend.set(&self.key, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Backend that shares its records so tests can reopen a store
    #[derive(Clone, Default)]
    struct SharedBackend(Arc<MemoryBackend>);

    impl StorageBackend for SharedBackend {
        fn get(&self, key: &str) -> AppResult<Option<String>> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> AppResult<()> {
            self.0.set(key, value)
        }
    }

    /// Backend whose writes always fail
    struct ReadOnlyBackend;

    impl StorageBackend for ReadOnlyBackend {
        fn get(&self, _key: &str) -> AppResult<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> AppResult<()> {
            Err(storage_error("read-only"))
        }
    }

    fn gym() -> Vec<CalendarEvent> {
        vec![CalendarEvent::new(
            "Gym",
            "2024-03-18T18:00:00+00:00",
            "2024-03-18T19:00:00+00:00",
        )]
    }

    #[test]
    fn test_save_then_load_returns_same_events() {
        let mut store = ScheduleStore::open(Box::new(MemoryBackend::new()), "default").unwrap();
        let id = store.save("Week 12", gym()).unwrap();

        assert_eq!(store.load(&id).unwrap(), gym());
        assert_eq!(store.get(&id).unwrap().name, "Week 12");
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_blank_name_is_rejected_and_nothing_stored() {
        let backend = SharedBackend::default();
        let mut store = ScheduleStore::open(Box::new(backend.clone()), "default").unwrap();

        for name in ["", "   ", "\t\n"] {
            match store.save(name, gym()) {
                Err(Error::Validation(errors)) => assert!(errors.field("name").is_some()),
                other => panic!("expected validation error, got {:?}", other.map(|_| ())),
            }
        }

        assert!(store.list().is_empty());
        assert_eq!(backend.get(&storage_key("default")).unwrap(), None);
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let backend = SharedBackend::default();
        let mut store = ScheduleStore::open(Box::new(backend.clone()), "alice").unwrap();
        let first = store.save("  Week 12 ", gym()).unwrap();
        let second = store.save("Week 13", gym()).unwrap();
        store.delete(&first).unwrap();

        let reopened = ScheduleStore::open(Box::new(backend.clone()), "alice").unwrap();
        assert_eq!(reopened.list().len(), 1);
        assert_eq!(reopened.list()[0].id, second);

        // Profiles do not see each other's schedules
        let other = ScheduleStore::open(Box::new(backend), "bob").unwrap();
        assert!(other.list().is_empty());
    }

    #[test]
    fn test_name_is_trimmed() {
        let mut store = ScheduleStore::open(Box::new(MemoryBackend::new()), "default").unwrap();
        let id = store.save("  Week 12 ", gym()).unwrap();
        assert_eq!(store.get(&id).unwrap().name, "Week 12");
    }

    #[test]
    fn test_unknown_ids() {
        let mut store = ScheduleStore::open(Box::new(MemoryBackend::new()), "default").unwrap();
        assert!(matches!(store.load("nope"), Err(Error::NotFound(_))));
        assert!(matches!(store.delete("nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_corrupt_record_is_reported() {
        let backend = MemoryBackend::new();
        backend.set(&storage_key("default"), "{not json").unwrap();
        assert!(matches!(
            ScheduleStore::open(Box::new(backend), "default"),
            Err(Error::Storage(_))
        ));
    }

    #[test]
    fn test_failed_write_leaves_memory_unchanged() {
        let mut store = ScheduleStore::open(Box::new(ReadOnlyBackend), "default").unwrap();
        assert!(store.save("Week 12", gym()).is_err());
        assert!(store.list().is_empty());
    }
}
