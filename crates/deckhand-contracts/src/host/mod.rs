use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod memory;

/// Failure inside the host document interface.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("deferred value read before sync")]
    NotSynced,
    #[error("slide index {0} is out of range")]
    SlideOutOfRange(usize),
    #[error("selected shape index {0} is out of range")]
    SelectionOutOfRange(usize),
    #[error("shape no longer exists on the slide")]
    ShapeMissing,
    #[error("selected shape carries no image data")]
    NoImageData,
    #[error("host rejected image source: {0}")]
    InvalidImage(String),
    #[error("host call failed: {0}")]
    Backend(String),
}

/// Shape identifier assigned by the host. Snapshots expose ids in string
/// form; the raw uuid never crosses a serialization boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeId(Uuid);

impl ShapeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ShapeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Shape frame in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Where one insertion lands. Resolved per call inside the inserting
/// batch; never cached across operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideTarget {
    pub slide_index: usize,
    pub frame: Frame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Picture,
    TextBox,
    GeometricShape,
    Line,
    Group,
}

/// Metadata of one selected shape, read through a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeSnapshot {
    pub id: ShapeId,
    pub slide_index: usize,
    pub kind: ShapeKind,
    pub frame: Frame,
}

/// Fresh capture of the single selected picture: its metadata plus the
/// image bytes as unprefixed base64. Never reused across operations.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionSnapshot {
    pub shape: ShapeSnapshot,
    pub image_b64: String,
}

/// Read handle for a value the host resolves at the next `sync`.
#[derive(Debug, Clone)]
pub struct Deferred<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> Deferred<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }
}

impl<T> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Deferred<T> {
    /// Host adapters call this while applying a sync.
    pub fn fill(&self, value: T) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(value);
        }
    }

    pub fn get(&self) -> Result<T, HostError> {
        match self.slot.lock() {
            Ok(slot) => slot.clone().ok_or(HostError::NotSynced),
            Err(_) => Err(HostError::Backend("deferred slot lock poisoned".to_string())),
        }
    }
}

/// One open batch against the host document.
///
/// Reads and mutations queue in call order and take effect only at
/// `sync`; a deferred read is readable only after the sync that resolved
/// it. Dropping a batch discards whatever is still queued.
pub trait DocumentBatch {
    fn load_slide_count(&mut self) -> Deferred<usize>;

    fn add_slide(&mut self);

    /// Queues a picture shape. The host accepts canonical data uris only.
    fn add_image(&mut self, slide_index: usize, source_uri: &str, frame: Frame);

    fn load_selection_count(&mut self) -> Deferred<usize>;

    fn load_selected_shape(&mut self, index: usize) -> Deferred<ShapeSnapshot>;

    /// Image bytes of the selected picture as unprefixed base64.
    fn load_selected_image(&mut self, index: usize) -> Deferred<String>;

    fn delete_shape(&mut self, slide_index: usize, shape_id: ShapeId);

    /// Applies the queue in order and fills read handles. The first
    /// failing operation aborts the sync with its error; the rest of the
    /// queue is dropped.
    fn sync(&mut self) -> Result<(), HostError>;
}

/// Handle to a host document able to open batches. Injected wherever
/// document access is needed; there is no ambient document.
pub trait DocumentSession: Send + Sync {
    fn open_batch(&self) -> Result<Box<dyn DocumentBatch + '_>, HostError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deferred_read_before_fill_reports_not_synced() {
        let deferred: Deferred<usize> = Deferred::new();
        assert!(matches!(deferred.get(), Err(HostError::NotSynced)));
    }

    #[test]
    fn deferred_clones_share_the_slot() -> anyhow::Result<()> {
        let deferred: Deferred<usize> = Deferred::new();
        let handle = deferred.clone();
        handle.fill(3);
        assert_eq!(deferred.get()?, 3);
        Ok(())
    }
}
