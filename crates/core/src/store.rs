//! The annotation store: id allocation, insertion-ordered history, CRUD.
//!
//! Records live in a `Vec` kept in insertion order, so undo is a pop from the
//! back regardless of id values. Every mutation is persist-then-swap: the new
//! record list is written to the backing file first and only then becomes the
//! in-memory state, so a failed write leaves both sides as they were.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::annotation::{Annotation, AnnotationPatch, NewAnnotation, Shape};
use crate::error::CoreError;
use crate::types::AnnotationId;

#[derive(Debug, Default)]
pub struct AnnotationStore {
    records: Vec<Annotation>,
    backing: Option<PathBuf>,
}

impl AnnotationStore {
    /// A store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a store backed by a JSON file.
    ///
    /// A missing or unreadable file, or one that does not parse as a list of
    /// records, yields an empty store. Those cases are logged, never returned.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = load_records(&path);
        Self {
            records,
            backing: Some(path),
        }
    }

    pub fn backing_path(&self) -> Option<&Path> {
        self.backing.as_deref()
    }

    /// Records in insertion order.
    pub fn list(&self) -> &[Annotation] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.records.iter().find(|a| a.id == id)
    }

    /// `max(id) + 1`, or 1 for an empty store.
    pub fn next_id(&self) -> Result<AnnotationId, CoreError> {
        match self.records.iter().map(|a| a.id).max() {
            None => Ok(1),
            Some(max) => successor(max),
        }
    }

    /// Create a record from a draft, assigning the next id.
    pub fn add(&mut self, draft: NewAnnotation) -> Result<Annotation, CoreError> {
        let created = self.build(draft, self.next_id()?, self.records.len() + 1)?;

        let mut next = self.records.clone();
        next.push(created.clone());
        self.commit(next)?;

        tracing::info!(
            annotation_id = created.id,
            kind = %created.kind(),
            "Annotation created"
        );
        if let Shape::Route(route) = &created.shape {
            tracing::debug!(
                annotation_id = created.id,
                vertices = route.points.len(),
                length_km = route.length_km(),
                "Route added"
            );
        }
        Ok(created)
    }

    /// Create several records with a single write. Either all drafts are
    /// valid and stored, or nothing changes.
    pub fn extend(
        &mut self,
        drafts: impl IntoIterator<Item = NewAnnotation>,
    ) -> Result<Vec<Annotation>, CoreError> {
        let mut next = self.records.clone();
        let mut id = self.next_id()?;
        let mut created: Vec<Annotation> = Vec::new();

        for draft in drafts {
            if let Some(last) = created.last() {
                id = successor(last.id)?;
            }
            let record = self.build(draft, id, next.len() + 1)?;
            next.push(record.clone());
            created.push(record);
        }

        self.commit(next)?;
        tracing::info!(count = created.len(), "Annotations created in bulk");
        Ok(created)
    }

    /// Apply a partial update to the record with `id`.
    ///
    /// Fields the record's kind does not declare are ignored (logged at
    /// debug level). Id and kind never change.
    pub fn update(
        &mut self,
        id: AnnotationId,
        patch: &AnnotationPatch,
    ) -> Result<Annotation, CoreError> {
        let index = self.index_of(id)?;
        if patch.is_empty() {
            tracing::debug!(annotation_id = id, "Update carries no recognized fields");
        }

        let mut next = self.records.clone();
        let ignored = next[index].shape.apply(patch)?;
        if !ignored.is_empty() {
            tracing::debug!(
                annotation_id = id,
                kind = %next[index].kind(),
                ignored = ?ignored,
                "Ignoring fields not declared for this kind"
            );
        }
        let updated = next[index].clone();
        self.commit(next)?;

        tracing::info!(annotation_id = id, "Annotation updated");
        Ok(updated)
    }

    /// Delete the record with `id` and return it.
    pub fn remove(&mut self, id: AnnotationId) -> Result<Annotation, CoreError> {
        let index = self.index_of(id)?;

        let mut next = self.records.clone();
        let removed = next.remove(index);
        self.commit(next)?;

        tracing::info!(annotation_id = id, "Annotation removed");
        Ok(removed)
    }

    /// Remove the most recently added record. `Ok(None)` when empty.
    pub fn undo(&mut self) -> Result<Option<Annotation>, CoreError> {
        let mut next = self.records.clone();
        let Some(popped) = next.pop() else {
            return Ok(None);
        };
        self.commit(next)?;

        tracing::info!(annotation_id = popped.id, "Undid last annotation");
        Ok(Some(popped))
    }

    pub fn clear(&mut self) -> Result<(), CoreError> {
        let count = self.records.len();
        self.commit(Vec::new())?;
        tracing::info!(count, "Annotations cleared");
        Ok(())
    }

    /// Replace the whole record list, e.g. with the block extracted from a
    /// document. Records with a non-positive or repeated id are dropped.
    /// Persisted like any other mutation.
    pub fn replace_all(&mut self, records: Vec<Annotation>) -> Result<(), CoreError> {
        self.commit(retain_valid_ids(records))
    }

    /// Delete the backing file, if any. The in-memory records are kept.
    pub fn discard_backing(&self) -> Result<(), CoreError> {
        let Some(path) = &self.backing else {
            return Ok(());
        };
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::io(path, e)),
        }
    }

    fn build(
        &self,
        draft: NewAnnotation,
        id: AnnotationId,
        ordinal: usize,
    ) -> Result<Annotation, CoreError> {
        Ok(Annotation {
            id,
            shape: draft.into_shape(ordinal)?,
            created_at: Some(chrono::Utc::now()),
        })
    }

    fn index_of(&self, id: AnnotationId) -> Result<usize, CoreError> {
        self.records
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| CoreError::annotation_not_found(id))
    }

    fn commit(&mut self, next: Vec<Annotation>) -> Result<(), CoreError> {
        if let Some(path) = &self.backing {
            write_records(path, &next)?;
        }
        self.records = next;
        Ok(())
    }
}

/// Read the backing file, degrading to an empty list on any failure.
fn load_records(path: &Path) -> Vec<Annotation> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not read annotation store, starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(records) => retain_valid_ids(records),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Annotation store is not valid JSON, starting empty");
            Vec::new()
        }
    }
}

/// Drop records whose id is below 1 or already taken by an earlier record.
fn retain_valid_ids(records: Vec<Annotation>) -> Vec<Annotation> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| {
            if record.id < 1 {
                tracing::warn!(annotation_id = record.id, "Dropping record with non-positive id");
                return false;
            }
            if !seen.insert(record.id) {
                tracing::warn!(annotation_id = record.id, "Dropping record with duplicate id");
                return false;
            }
            true
        })
        .collect()
}

fn successor(id: AnnotationId) -> Result<AnnotationId, CoreError> {
    id.checked_add(1).ok_or_else(|| {
        CoreError::Validation(format!("No annotation id is available after {id}"))
    })
}

/// Whole-file overwrite through a sibling temp file and a rename.
fn write_records(path: &Path, records: &[Annotation]) -> Result<(), CoreError> {
    let json = serde_json::to_vec_pretty(records)
        .map_err(|e| CoreError::Internal(format!("Failed to serialize annotations: {e}")))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, json).map_err(|e| CoreError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| CoreError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{NewCircle, NewLabel, NewRoute, NewTower, Shape};
    use assert_matches::assert_matches;

    fn route() -> NewAnnotation {
        NewAnnotation::Route(NewRoute::default())
    }

    fn tower(lat: f64) -> NewAnnotation {
        NewAnnotation::Tower(NewTower {
            lat: Some(lat),
            lon: Some(0.0),
            ..Default::default()
        })
    }

    fn ids(store: &AnnotationStore) -> Vec<AnnotationId> {
        store.list().iter().map(|a| a.id).collect()
    }

    // -- Id allocation -----------------------------------------------------

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut store = AnnotationStore::in_memory();
        assert_eq!(store.add(route()).unwrap().id, 1);
        assert_eq!(store.add(route()).unwrap().id, 2);
        assert_eq!(store.add(tower(1.0)).unwrap().id, 3);
    }

    #[test]
    fn next_id_follows_max_not_length() {
        let mut store = AnnotationStore::in_memory();
        for _ in 0..3 {
            store.add(route()).unwrap();
        }
        store.remove(1).unwrap();
        store.remove(2).unwrap();
        assert_eq!(store.add(route()).unwrap().id, 4);
    }

    #[test]
    fn clear_resets_ids() {
        let mut store = AnnotationStore::in_memory();
        store.add(route()).unwrap();
        store.add(route()).unwrap();
        store.clear().unwrap();
        assert!(store.is_empty());
        assert_eq!(store.add(route()).unwrap().id, 1);
    }

    #[test]
    fn add_stamps_creation_time() {
        let mut store = AnnotationStore::in_memory();
        assert!(store.add(route()).unwrap().created_at.is_some());
    }

    // -- Undo --------------------------------------------------------------

    #[test]
    fn undo_follows_insertion_order_not_ids() {
        let mut store = AnnotationStore::in_memory();
        store.add(route()).unwrap();
        store.add(route()).unwrap();
        store.remove(1).unwrap();
        let undone = store.undo().unwrap().unwrap();
        assert_eq!(undone.id, 2);
        assert!(store.is_empty());
    }

    #[test]
    fn undo_after_id_reuse_pops_latest_insert() {
        let mut store = AnnotationStore::in_memory();
        store.add(route()).unwrap(); // 1
        store.add(route()).unwrap(); // 2
        store.add(route()).unwrap(); // 3
        store.remove(3).unwrap();
        store.remove(1).unwrap();
        store.add(tower(2.0)).unwrap(); // 3 again, inserted last
        assert_eq!(ids(&store), vec![2, 3]);
        assert_eq!(store.undo().unwrap().unwrap().id, 3);
        assert_eq!(store.undo().unwrap().unwrap().id, 2);
    }

    #[test]
    fn undo_on_empty_store_is_none() {
        let mut store = AnnotationStore::in_memory();
        assert!(store.undo().unwrap().is_none());
    }

    // -- Update / remove ---------------------------------------------------

    #[test]
    fn update_missing_id_is_not_found_and_store_unchanged() {
        let mut store = AnnotationStore::in_memory();
        store.add(tower(1.0)).unwrap();
        let before = store.list().to_vec();

        let patch = AnnotationPatch {
            name: Some("x".into()),
            ..Default::default()
        };
        let err = store.update(99, &patch).unwrap_err();
        assert_matches!(err, CoreError::NotFound { id: 99, .. });
        assert_eq!(store.list(), before.as_slice());
    }

    #[test]
    fn update_keeps_id_and_kind() {
        let mut store = AnnotationStore::in_memory();
        let created = store
            .add(NewAnnotation::Circle(NewCircle {
                lat: Some(1.0),
                lon: Some(2.0),
                ..Default::default()
            }))
            .unwrap();

        let patch = AnnotationPatch {
            radius_m: Some(250.0),
            thickness: Some(9.0),
            ..Default::default()
        };
        let updated = store.update(created.id, &patch).unwrap();
        assert_eq!(updated.id, created.id);
        assert_matches!(&updated.shape, Shape::Circle(c) if c.radius_m == 250.0);
        assert_eq!(store.get(created.id).unwrap(), &updated);
    }

    #[test]
    fn failed_update_is_not_applied() {
        let mut store = AnnotationStore::in_memory();
        let created = store.add(tower(1.0)).unwrap();
        let patch = AnnotationPatch {
            color: Some("blue".into()),
            ..Default::default()
        };
        assert_matches!(store.update(created.id, &patch), Err(CoreError::Validation(_)));
        assert_eq!(store.get(created.id).unwrap(), &created);
    }

    #[test]
    fn remove_missing_id_is_not_found() {
        let mut store = AnnotationStore::in_memory();
        assert_matches!(store.remove(5), Err(CoreError::NotFound { id: 5, .. }));
    }

    #[test]
    fn extend_is_all_or_nothing() {
        let mut store = AnnotationStore::in_memory();
        store.add(route()).unwrap();
        let drafts = vec![
            tower(1.0),
            NewAnnotation::Label(NewLabel::default()), // missing position
        ];
        assert!(store.extend(drafts).is_err());
        assert_eq!(ids(&store), vec![1]);

        let created = store.extend(vec![tower(1.0), tower(2.0)]).unwrap();
        assert_eq!(created.iter().map(|a| a.id).collect::<Vec<_>>(), vec![2, 3]);
    }

    // -- Id invariant ------------------------------------------------------

    fn record_with_id(id: AnnotationId) -> Annotation {
        serde_json::from_value(serde_json::json!({
            "id": id, "tipo": "torre", "lat": 1.0, "lon": 2.0
        }))
        .unwrap()
    }

    #[test]
    fn replace_all_drops_duplicate_and_non_positive_ids() {
        let mut store = AnnotationStore::in_memory();
        let records = [1, 1, -5, 0, 7].map(record_with_id).to_vec();
        store.replace_all(records).unwrap();
        assert_eq!(ids(&store), vec![1, 7]);

        store.remove(1).unwrap();
        assert_eq!(ids(&store), vec![7]);
        assert!(store.get(1).is_none());
    }

    #[test]
    fn load_drops_duplicate_and_non_positive_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotations.json");
        let records = [3, 3, -1, 4].map(record_with_id).to_vec();
        std::fs::write(&path, serde_json::to_vec(&records).unwrap()).unwrap();

        let store = AnnotationStore::open(&path);
        assert_eq!(ids(&store), vec![3, 4]);
    }

    #[test]
    fn id_overflow_is_an_error_not_a_panic() {
        let mut store = AnnotationStore::in_memory();
        store.replace_all(vec![record_with_id(AnnotationId::MAX)]).unwrap();

        assert_matches!(store.next_id(), Err(CoreError::Validation(_)));
        assert_matches!(store.add(route()), Err(CoreError::Validation(_)));
        assert_matches!(store.extend(vec![route()]), Err(CoreError::Validation(_)));
        assert_eq!(ids(&store), vec![AnnotationId::MAX]);
    }

    #[test]
    fn extend_stops_at_overflow_without_writing() {
        let mut store = AnnotationStore::in_memory();
        store.replace_all(vec![record_with_id(AnnotationId::MAX - 1)]).unwrap();

        assert_matches!(store.extend(vec![route(), route()]), Err(CoreError::Validation(_)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.add(route()).unwrap().id, AnnotationId::MAX);
    }

    // -- Persistence -------------------------------------------------------

    #[test]
    fn mutations_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotations.json");

        let mut store = AnnotationStore::open(&path);
        store.add(route()).unwrap();
        store.add(tower(3.0)).unwrap();
        store.remove(1).unwrap();

        let reopened = AnnotationStore::open(&path);
        assert_eq!(reopened.list(), store.list());
        assert_eq!(ids(&reopened), vec![2]);
        assert!(!dir.path().join("annotations.json.tmp").exists());
    }

    #[test]
    fn corrupt_backing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotations.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = AnnotationStore::open(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn missing_backing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = AnnotationStore::open(dir.path().join("absent.json"));
        assert!(store.is_empty());
        assert_eq!(store.next_id().unwrap(), 1);
    }

    #[test]
    fn failed_write_leaves_memory_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("annotations.json");

        let mut store = AnnotationStore::open(&path);
        assert_matches!(store.add(route()), Err(CoreError::Io { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn discard_backing_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotations.json");
        let mut store = AnnotationStore::open(&path);
        store.add(route()).unwrap();
        assert!(path.exists());

        store.discard_backing().unwrap();
        assert!(!path.exists());
        store.discard_backing().unwrap();
    }
}
