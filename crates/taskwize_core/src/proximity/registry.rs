//! In-memory registry of tracked locations.
//!
//! # Responsibility
//! - Hold the set of task locations currently under monitoring.
//! - Report empty/non-empty transitions so the monitor can start or stop.
//!
//! # Invariants
//! - At most one record per id; `add` replaces in place.
//! - Records are validated before insertion.
//! - `list()` returns an owned snapshot in insertion order.
//! - The registry is a rebuildable cache and is never persisted.

use crate::model::tracked_location::{TrackedLocation, TrackedLocationError};

/// Empty/non-empty transition caused by one registry mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryEvent {
    BecameNonEmpty,
    BecameEmpty,
}

/// Insertion-ordered set of tracked locations keyed by id.
#[derive(Debug, Default, Clone)]
pub struct TrackedLocationRegistry {
    entries: Vec<TrackedLocation>,
}

impl TrackedLocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `record`, replacing any record with the same id.
    ///
    /// # Errors
    /// - Returns validation errors; the registry is unchanged on failure.
    pub fn add(
        &mut self,
        record: TrackedLocation,
    ) -> Result<Option<RegistryEvent>, TrackedLocationError> {
        record.validate()?;
        let was_empty = self.entries.is_empty();

        match self.position_of(&record.id) {
            Some(index) => self.entries[index] = record,
            None => self.entries.push(record),
        }

        Ok(was_empty.then_some(RegistryEvent::BecameNonEmpty))
    }

    /// Removes one record by id. Absent ids are a no-op.
    pub fn remove(&mut self, id: &str) -> Option<RegistryEvent> {
        let index = self.position_of(id)?;
        self.entries.remove(index);
        self.entries.is_empty().then_some(RegistryEvent::BecameEmpty)
    }

    /// Removes every record.
    pub fn clear(&mut self) -> Option<RegistryEvent> {
        if self.entries.is_empty() {
            return None;
        }
        self.entries.clear();
        Some(RegistryEvent::BecameEmpty)
    }

    /// Replaces the whole registry content.
    ///
    /// Later duplicates of an id win, keeping the slot of the first one.
    ///
    /// # Errors
    /// - Returns the first validation error; the registry is unchanged on failure.
    pub fn replace_all(
        &mut self,
        records: Vec<TrackedLocation>,
    ) -> Result<Option<RegistryEvent>, TrackedLocationError> {
        let mut next = TrackedLocationRegistry::new();
        for record in records {
            next.add(record)?;
        }

        let was_empty = self.entries.is_empty();
        self.entries = next.entries;

        Ok(match (was_empty, self.entries.is_empty()) {
            (true, false) => Some(RegistryEvent::BecameNonEmpty),
            (false, true) => Some(RegistryEvent::BecameEmpty),
            _ => None,
        })
    }

    /// Returns an owned snapshot of all records.
    pub fn list(&self) -> Vec<TrackedLocation> {
        self.entries.clone()
    }

    pub fn get(&self, id: &str) -> Option<&TrackedLocation> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position_of(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position_of(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }
}
