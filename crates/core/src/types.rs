/// Annotation ids are positive integers, unique within a store.
pub type AnnotationId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
