//! Record store module
//!
//! An ordered, identity-indexed collection of [`PatientRecord`]s.
//!
//! Records live in an arena of slots linked by index in both directions, so
//! appending and removing are O(1) and iteration works from either end. An id
//! index maps every live id to its slot. Removing a record bumps its slot's
//! generation, which invalidates every [`RecordHandle`] that pointed at it even
//! after the slot is reused.
//!
//! # Example
//!
//! ```
//! use patient_records::store::{PatientStore, SearchField};
//!
//! let mut store = PatientStore::new();
//! store.insert("12345678901", "Ana Silva", 34, "2023-01-10").unwrap();
//! store.insert("98765432100", "Bruno", 41, "2023-02-11").unwrap();
//!
//! let names: Vec<_> = store
//!     .search("An", SearchField::Name)
//!     .map(|r| r.name.as_str())
//!     .collect();
//! assert_eq!(names, ["Ana Silva"]);
//! ```

use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::csv_handler::{
    self, truncate_field, CsvReader, LoadStats, PatientRecord, WriteStats, NAME_MAX_LEN,
    NATIONAL_ID_MAX_LEN, REGISTRATION_DATE_MAX_LEN,
};
use crate::error::PatientStoreError;

/// Id given to the first record inserted into an empty store.
pub const DEFAULT_FIRST_ID: i64 = 1;

/// Input value meaning "keep the current value" in an update.
pub const KEEP_SENTINEL: &str = "-";

/// Which field a prefix search compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    /// Match on [`PatientRecord::national_id`].
    NationalId,
    /// Match on [`PatientRecord::name`].
    Name,
}

impl SearchField {
    fn select(self, record: &PatientRecord) -> &str {
        match self {
            SearchField::NationalId => &record.national_id,
            SearchField::Name => &record.name,
        }
    }
}

/// A non-owning reference to a record in a [`PatientStore`].
///
/// Handles stay valid across inserts and updates. Once the record is removed,
/// every handle to it is rejected, even if its slot is reused later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordHandle {
    slot: usize,
    generation: u64,
}

/// Field changes applied by [`PatientStore::update`].
///
/// `None` leaves a field untouched.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordPatch {
    pub name: Option<String>,
    pub national_id: Option<String>,
    pub age: Option<u8>,
    pub registration_date: Option<String>,
}

impl RecordPatch {
    /// Builds a patch from raw text input.
    ///
    /// Missing input, empty input and [`KEEP_SENTINEL`] all leave the field
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`PatientStoreError::Validation`] if the age is not an integer
    /// in `0..=255`.
    pub fn from_inputs(
        name: Option<&str>,
        national_id: Option<&str>,
        age: Option<&str>,
        registration_date: Option<&str>,
    ) -> Result<Self, PatientStoreError> {
        let age = match supplied(age) {
            Some(raw) => Some(parse_age(raw)?),
            None => None,
        };

        Ok(Self {
            name: supplied(name).map(str::to_string),
            national_id: supplied(national_id).map(str::to_string),
            age,
            registration_date: supplied(registration_date).map(str::to_string),
        })
    }

    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.national_id.is_none()
            && self.age.is_none()
            && self.registration_date.is_none()
    }

    fn apply(&self, record: &mut PatientRecord) {
        if let Some(name) = &self.name {
            record.name.clone_from(name);
            truncate_field(&mut record.name, NAME_MAX_LEN);
        }
        if let Some(national_id) = &self.national_id {
            record.national_id.clone_from(national_id);
            truncate_field(&mut record.national_id, NATIONAL_ID_MAX_LEN);
        }
        if let Some(age) = self.age {
            record.age = age;
        }
        if let Some(date) = &self.registration_date {
            record.registration_date.clone_from(date);
            truncate_field(&mut record.registration_date, REGISTRATION_DATE_MAX_LEN);
        }
    }
}

/// Returns the input unless it asks to keep the current value.
fn supplied(input: Option<&str>) -> Option<&str> {
    input.filter(|value| !value.is_empty() && *value != KEEP_SENTINEL)
}

/// Parses an age in years.
pub fn parse_age(raw: &str) -> Result<u8, PatientStoreError> {
    raw.trim().parse().map_err(|_| {
        PatientStoreError::Validation(format!("age '{}' is not an integer in 0-255", raw))
    })
}

#[derive(Debug)]
struct Node {
    record: PatientRecord,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
struct Slot {
    generation: u64,
    node: Option<Node>,
}

/// An ordered, identity-indexed set of patient records.
#[derive(Debug)]
pub struct PatientStore {
    slots: Vec<Slot>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    index: HashMap<i64, usize>,
    len: usize,
    first_id: i64,
}

impl Default for PatientStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PatientStore {
    /// Creates an empty store whose first inserted record gets id 1.
    pub fn new() -> Self {
        Self::with_first_id(DEFAULT_FIRST_ID)
    }

    /// Creates an empty store whose first inserted record gets `first_id`.
    pub fn with_first_id(first_id: i64) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            index: HashMap::new(),
            len: 0,
            first_id,
        }
    }

    /// Loads a store from a CSV file.
    ///
    /// Ids are taken from the file. Loading stops at the first malformed row,
    /// or at the first row whose id repeats an earlier one; the rest of the
    /// file is counted in the returned [`LoadStats`].
    pub fn load(path: &Path) -> Result<(Self, LoadStats), PatientStoreError> {
        Self::load_with_first_id(path, DEFAULT_FIRST_ID)
    }

    /// Like [`PatientStore::load`], with a custom id for inserts into an empty store.
    pub fn load_with_first_id(
        path: &Path,
        first_id: i64,
    ) -> Result<(Self, LoadStats), PatientStoreError> {
        let mut reader = CsvReader::open(path)?;
        let mut store = Self::with_first_id(first_id);

        while let Some(record) = reader.read_next() {
            let id = record.id;
            match store.append(record) {
                Ok(_) => {}
                Err(PatientStoreError::DuplicateId(_)) => {
                    reader.reject_last(&format!("duplicate id {}", id));
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        let stats = reader.finish();
        info!(
            path = %path.display(),
            loaded = stats.loaded_rows,
            skipped = stats.skipped_rows,
            "Loaded patient records"
        );
        Ok((store, stats))
    }

    /// Rewrites the CSV file at `path` with the current records, in order.
    pub fn save(&self, path: &Path) -> Result<WriteStats, PatientStoreError> {
        let stats = csv_handler::persist(path, self.iter())?;
        info!(
            path = %path.display(),
            records = stats.total_records,
            "Saved patient records"
        );
        Ok(stats)
    }

    /// Serializes the current records to CSV bytes.
    pub fn to_csv(&self) -> Result<Vec<u8>, PatientStoreError> {
        csv_handler::serialize(self.iter()).map(|(bytes, _)| bytes)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Id given to the first insert into an empty store.
    pub fn first_id(&self) -> i64 {
        self.first_id
    }

    /// Returns true if a live record has this id.
    pub fn contains_id(&self, id: i64) -> bool {
        self.index.contains_key(&id)
    }

    /// First record in iteration order.
    pub fn first(&self) -> Option<&PatientRecord> {
        self.head.map(|slot| &self.node(slot).record)
    }

    /// Last record in iteration order.
    pub fn last(&self) -> Option<&PatientRecord> {
        self.tail.map(|slot| &self.node(slot).record)
    }

    /// Appends a record after the current tail.
    ///
    /// String fields are truncated to their limits.
    ///
    /// # Errors
    ///
    /// - [`PatientStoreError::DuplicateId`] if the id is already taken
    /// - [`PatientStoreError::Allocation`] if capacity cannot be reserved
    ///
    /// The store is unchanged when an error is returned.
    pub fn append(&mut self, mut record: PatientRecord) -> Result<RecordHandle, PatientStoreError> {
        if self.index.contains_key(&record.id) {
            return Err(PatientStoreError::DuplicateId(record.id));
        }
        self.reserve_one()?;
        record.truncate_fields();

        let id = record.id;
        let node = Node {
            record,
            prev: self.tail,
            next: None,
        };

        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot].node = Some(node);
                slot
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        };

        match self.tail {
            Some(tail) => self.node_mut(tail).next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.index.insert(id, slot);
        self.len += 1;

        Ok(RecordHandle {
            slot,
            generation: self.slots[slot].generation,
        })
    }

    /// Inserts a new record with the next id and appends it.
    ///
    /// The id is one past the tail's id, or the store's first id when the store
    /// is empty. If that id is already taken, the next free one above it is
    /// used.
    pub fn insert(
        &mut self,
        national_id: &str,
        name: &str,
        age: u8,
        registration_date: &str,
    ) -> Result<RecordHandle, PatientStoreError> {
        let id = self.next_id()?;
        let handle = self.append(PatientRecord::new(
            id,
            national_id,
            name,
            age,
            registration_date,
        ))?;
        debug!(id, "Inserted patient record");
        Ok(handle)
    }

    /// Returns the id the next [`PatientStore::insert`] will assign.
    pub fn next_id(&self) -> Result<i64, PatientStoreError> {
        let mut id = match self.last() {
            Some(tail) => tail.id.checked_add(1).ok_or_else(id_exhausted)?,
            None => self.first_id,
        };
        while self.index.contains_key(&id) {
            id = id.checked_add(1).ok_or_else(id_exhausted)?;
        }
        Ok(id)
    }

    /// Looks up a record by id.
    pub fn find_by_id(&self, id: i64) -> Option<RecordHandle> {
        self.index.get(&id).map(|&slot| RecordHandle {
            slot,
            generation: self.slots[slot].generation,
        })
    }

    /// Returns the record behind a handle, or `None` if it was removed.
    pub fn get(&self, handle: RecordHandle) -> Option<&PatientRecord> {
        self.live_node(handle).map(|node| &node.record)
    }

    /// Applies a patch to the record behind a handle.
    ///
    /// Updating the record does not invalidate the handle.
    pub fn update(
        &mut self,
        handle: RecordHandle,
        patch: &RecordPatch,
    ) -> Result<&PatientRecord, PatientStoreError> {
        if self.live_node(handle).is_none() {
            return Err(PatientStoreError::StaleHandle);
        }
        let record = &mut self.node_mut(handle.slot).record;
        patch.apply(record);
        debug!(id = record.id, "Updated patient record");
        Ok(&*record)
    }

    /// Detaches the record behind a handle and returns it.
    pub fn remove(&mut self, handle: RecordHandle) -> Result<PatientRecord, PatientStoreError> {
        if self.live_node(handle).is_none() {
            return Err(PatientStoreError::StaleHandle);
        }

        let slot = &mut self.slots[handle.slot];
        let node = slot.node.take().ok_or(PatientStoreError::StaleHandle)?;
        slot.generation += 1;

        match node.prev {
            Some(prev) => self.node_mut(prev).next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.node_mut(next).prev = node.prev,
            None => self.tail = node.prev,
        }

        self.index.remove(&node.record.id);
        self.free.push(handle.slot);
        self.len -= 1;

        debug!(id = node.record.id, "Removed patient record");
        Ok(node.record)
    }

    /// Iterates over records in insertion order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            store: self,
            front: self.head,
            back: self.tail,
            remaining: self.len,
        }
    }

    /// Iterates over records whose selected field starts with `query`.
    ///
    /// Matching is a case-sensitive byte prefix test. An empty query matches
    /// every record.
    pub fn search<'a>(
        &'a self,
        query: &'a str,
        field: SearchField,
    ) -> impl Iterator<Item = &'a PatientRecord> + 'a {
        self.iter()
            .filter(move |record| field.select(record).as_bytes().starts_with(query.as_bytes()))
    }

    fn reserve_one(&mut self) -> Result<(), PatientStoreError> {
        if self.free.is_empty() {
            self.slots
                .try_reserve(1)
                .map_err(|e| PatientStoreError::Allocation(e.to_string()))?;
        }
        self.index
            .try_reserve(1)
            .map_err(|e| PatientStoreError::Allocation(e.to_string()))
    }

    fn live_node(&self, handle: RecordHandle) -> Option<&Node> {
        self.slots
            .get(handle.slot)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    // Linked slots are always occupied; an empty one here is a broken link.
    fn node(&self, slot: usize) -> &Node {
        match self.slots[slot].node.as_ref() {
            Some(node) => node,
            None => unreachable!("linked slot {} is empty", slot),
        }
    }

    fn node_mut(&mut self, slot: usize) -> &mut Node {
        match self.slots[slot].node.as_mut() {
            Some(node) => node,
            None => unreachable!("linked slot {} is empty", slot),
        }
    }
}

fn id_exhausted() -> PatientStoreError {
    PatientStoreError::Allocation("patient id space exhausted".to_string())
}

impl<'a> IntoIterator for &'a PatientStore {
    type Item = &'a PatientRecord;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Double-ended iterator over a [`PatientStore`] in insertion order.
pub struct Iter<'a> {
    store: &'a PatientStore,
    front: Option<usize>,
    back: Option<usize>,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a PatientRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.store.node(self.front?);
        self.front = node.next;
        self.remaining -= 1;
        Some(&node.record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.store.node(self.back?);
        self.back = node.prev;
        self.remaining -= 1;
        Some(&node.record)
    }
}

impl ExactSizeIterator for Iter<'_> {}
