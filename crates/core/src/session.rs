//! The editor session: one map document plus the annotation store edited
//! against it.
//!
//! Opening a session reconciles the document with the backing store: a
//! document that carries a non-empty state block is authoritative and
//! overwrites the backing file; otherwise whatever the backing file holds is
//! kept. Closing the session deletes the backing file.

use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::geodesy::LatLon;
use crate::html;
use crate::kml;
use crate::store::AnnotationStore;

/// Input document types a session can start from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Html,
    Kml,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Result<Self, CoreError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "html" | "htm" => Ok(Self::Html),
            "kml" | "kmz" => Ok(Self::Kml),
            _ => Err(CoreError::UnsupportedInput(format!(
                "Cannot open '{}'. Expected .html, .htm, .kml or .kmz",
                path.display()
            ))),
        }
    }
}

#[derive(Debug)]
pub struct EditorSession {
    document: String,
    source: Option<PathBuf>,
    store: AnnotationStore,
}

impl EditorSession {
    /// Start from an in-memory document and store.
    pub fn new(document: impl Into<String>, store: AnnotationStore) -> Self {
        Self {
            document: document.into(),
            source: None,
            store,
        }
    }

    /// Start from a map file, dispatching on its extension.
    pub fn open(path: &Path, backing: impl Into<PathBuf>) -> Result<Self, CoreError> {
        match SourceKind::from_path(path)? {
            SourceKind::Html => Self::open_document(path, backing),
            SourceKind::Kml => Self::import_kml(path, backing),
        }
    }

    /// Start from an existing HTML map document.
    pub fn open_document(path: &Path, backing: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let document = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        let mut store = AnnotationStore::open(backing);

        let embedded = html::extract(&document);
        if !embedded.is_empty() {
            tracing::info!(
                count = embedded.len(),
                discarded = store.len(),
                "Document state replaces backing store"
            );
            store.replace_all(embedded)?;
        }

        tracing::info!(
            path = %path.display(),
            annotations = store.len(),
            "Session opened from document"
        );
        Ok(Self {
            document,
            source: Some(path.to_path_buf()),
            store,
        })
    }

    /// Start from a KML/KMZ file. The imported shapes replace the backing
    /// store and the document is a blank map centered on them.
    pub fn import_kml(path: &Path, backing: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let import = kml::ingest(path)?;
        let center = import.center().unwrap_or(LatLon::new(0.0, 0.0));

        // Validate every draft before the backing file is touched.
        let mut staged = AnnotationStore::in_memory();
        staged.extend(import.into_drafts())?;

        let mut store = AnnotationStore::open(backing);
        store.replace_all(staged.list().to_vec())?;

        tracing::info!(
            path = %path.display(),
            annotations = store.len(),
            center_lat = center.lat(),
            center_lon = center.lon(),
            "Session opened from KML"
        );
        Ok(Self {
            document: html::blank_document(center),
            source: Some(path.to_path_buf()),
            store,
        })
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut AnnotationStore {
        &mut self.store
    }

    /// The document as opened, before any state is re-embedded.
    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// The document with its state block replaced by the current records.
    pub fn render(&self) -> Result<String, CoreError> {
        html::inject(&self.document, self.store.list())
    }

    /// Write the rendered document to `path`.
    pub fn save_as(&self, path: &Path) -> Result<(), CoreError> {
        let rendered = self.render()?;
        std::fs::write(path, rendered).map_err(|e| CoreError::io(path, e))?;
        tracing::info!(
            path = %path.display(),
            annotations = self.store.len(),
            "Map document saved"
        );
        Ok(())
    }

    /// End the session and delete the backing file.
    pub fn close(self) -> Result<(), CoreError> {
        self.store.discard_backing()?;
        tracing::info!("Session closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{NewAnnotation, NewCircle};
    use assert_matches::assert_matches;

    const PAGE: &str = "<html><body><script>var m = L.map('x');</script></body></html>";

    #[test]
    fn source_kind_dispatch() {
        assert_eq!(SourceKind::from_path(Path::new("a.HTM")).unwrap(), SourceKind::Html);
        assert_eq!(SourceKind::from_path(Path::new("a.kmz")).unwrap(), SourceKind::Kml);
        assert_matches!(
            SourceKind::from_path(Path::new("a.xlsx")),
            Err(CoreError::UnsupportedInput(_))
        );
    }

    #[test]
    fn render_embeds_current_records() {
        let mut session = EditorSession::new(PAGE, AnnotationStore::in_memory());
        session
            .store_mut()
            .add(NewAnnotation::Circle(NewCircle {
                lat: Some(1.0),
                lon: Some(1.0),
                ..Default::default()
            }))
            .unwrap();

        let rendered = session.render().unwrap();
        assert!(rendered.contains("var mapHandle = \"m\";"));
        assert_eq!(html::extract(&rendered).len(), 1);
        assert_eq!(session.document(), PAGE);
    }

    #[test]
    fn render_of_empty_store_is_original_document() {
        let session = EditorSession::new(PAGE, AnnotationStore::in_memory());
        assert_eq!(session.render().unwrap(), PAGE);
    }

    #[test]
    fn missing_document_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.html");
        let err = EditorSession::open(&missing, dir.path().join("a.json")).unwrap_err();
        assert_matches!(err, CoreError::Io { path, .. } if path == missing);
    }
}
