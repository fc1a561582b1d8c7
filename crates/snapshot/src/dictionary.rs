//! Reference-counted interning of distribution arrays.
//!
//! Snapshots of neighbouring lattice nodes tend to contain many identical
//! distributions. Each distinct array is stored once and referenced by a small
//! id; the owner of the snapshots (the history cache) releases ids when it
//! drops a snapshot, and an array is reclaimed when its last reference goes.

use crate::{Snapshot, SnapshotLayout};
use alloc::format;
use alloc::sync::Arc;
use alloc::vec::Vec;
use hashbrown::HashMap;
use tessera_core::{Error, Result};

#[derive(Debug)]
struct Slot {
    values: Arc<[u32]>,
    refs: u32,
}

/// Interns `u32` arrays, mapping each distinct array to a compact id.
#[derive(Debug, Default)]
pub struct IntArrayDictionary {
    /// Array contents → id.
    ids: HashMap<Arc<[u32]>, u32>,
    /// id → array and reference count. `None` marks a recyclable id.
    slots: Vec<Option<Slot>>,
    /// Ids whose slot was reclaimed.
    free: Vec<u32>,
}

impl IntArrayDictionary {
    /// Creates an empty dictionary.
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Interns `values` and takes one reference to it.
    pub fn probe(&mut self, values: &[u32]) -> u32 {
        if let Some(&id) = self.ids.get(values) {
            if let Some(slot) = self.slots[id as usize].as_mut() {
                slot.refs += 1;
            }
            return id;
        }

        let values: Arc<[u32]> = Arc::from(values);
        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                self.slots.push(None);
                (self.slots.len() - 1) as u32
            }
        };
        self.slots[id as usize] = Some(Slot {
            values: values.clone(),
            refs: 1,
        });
        self.ids.insert(values, id);
        id
    }

    /// Returns the array behind `id`.
    #[inline]
    pub fn get(&self, id: u32) -> Option<&[u32]> {
        self.slots
            .get(id as usize)
            .and_then(|s| s.as_ref())
            .map(|s| &*s.values)
    }

    /// Drops one reference. Returns true if the array was reclaimed.
    pub fn release(&mut self, id: u32) -> bool {
        let Some(slot) = self.slots.get_mut(id as usize).and_then(|s| s.as_mut()) else {
            return false;
        };
        slot.refs -= 1;
        if slot.refs > 0 {
            return false;
        }
        if let Some(slot) = self.slots[id as usize].take() {
            self.ids.remove(&*slot.values);
        }
        self.free.push(id);
        true
    }

    /// Number of live references to `id`.
    pub fn refs(&self, id: u32) -> u32 {
        self.slots
            .get(id as usize)
            .and_then(|s| s.as_ref())
            .map(|s| s.refs)
            .unwrap_or(0)
    }

    /// Number of distinct arrays currently interned.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if nothing is interned.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Drops every array regardless of references.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.slots.clear();
        self.free.clear();
    }
}

/// The pair of dictionaries snapshot distributions are interned into.
#[derive(Debug, Default)]
pub struct SnapshotDictionary {
    values: IntArrayDictionary,
    frequencies: IntArrayDictionary,
}

impl SnapshotDictionary {
    /// Creates an empty dictionary pair.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns one packed distribution, returning `(values_id, freqs_id)`.
    pub fn intern(&mut self, values: &[u32], frequencies: &[u32]) -> (u32, u32) {
        (self.values.probe(values), self.frequencies.probe(frequencies))
    }

    /// Resolves a `(values_id, freqs_id)` pair.
    #[inline]
    pub fn resolve(&self, values_id: u32, freqs_id: u32) -> Option<(&[u32], &[u32])> {
        Some((self.values.get(values_id)?, self.frequencies.get(freqs_id)?))
    }

    /// Returns the value dictionary.
    pub fn values(&self) -> &IntArrayDictionary {
        &self.values
    }

    /// Returns the frequency dictionary.
    pub fn frequencies(&self) -> &IntArrayDictionary {
        &self.frequencies
    }

    /// Checks that every distribution referenced by `snapshot` resolves to
    /// arrays of matching length.
    pub fn validate(&self, snapshot: &Snapshot) -> Result<()> {
        let layout = snapshot.layout();
        for (index, record) in snapshot.records().enumerate() {
            for attribute in 0..layout.sensitive() {
                let (values_id, freqs_id) = record.distribution_ids(attribute);
                match self.resolve(values_id, freqs_id) {
                    Some((values, freqs)) if values.len() == freqs.len() => {}
                    Some(_) => {
                        return Err(Error::invalid_snapshot(format!(
                            "record {} attribute {}: value and frequency arrays differ in length",
                            index, attribute
                        )))
                    }
                    None => {
                        return Err(Error::invalid_snapshot(format!(
                            "record {} attribute {} references unknown ids ({}, {})",
                            index, attribute, values_id, freqs_id
                        )))
                    }
                }
            }
        }
        Ok(())
    }

    /// Releases every id referenced by `snapshot`.
    pub fn release_snapshot(&mut self, snapshot: &Snapshot) {
        let layout: SnapshotLayout = snapshot.layout();
        for record in snapshot.records() {
            for attribute in 0..layout.sensitive() {
                let (values_id, freqs_id) = record.distribution_ids(attribute);
                self.values.release(values_id);
                self.frequencies.release(freqs_id);
            }
        }
    }

    /// Drops everything.
    pub fn clear(&mut self) {
        self.values.clear();
        self.frequencies.clear();
    }
}
