use std::sync::{Mutex, MutexGuard};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Serialize;

use crate::payload::{split_canonical_uri, ImageMime};

use super::{
    Deferred, DocumentBatch, DocumentSession, Frame, HostError, ShapeId, ShapeKind, ShapeSnapshot,
};

/// In-memory host document.
///
/// Batches queue operations and apply them in order at `sync`, the same
/// deferred-execution model a live host uses. Image sources are validated
/// when the queue is applied: non-canonical uris, undecodable base64, and
/// broken PNG payloads all fail the sync, so a strategy that smuggled
/// malformed bytes through the pipeline fails at the host boundary.
#[derive(Default)]
pub struct MemorySession {
    state: Mutex<DeckState>,
}

#[derive(Default)]
struct DeckState {
    slides: Vec<Slide>,
    selection: Vec<ShapeId>,
    syncs: u64,
}

struct Slide {
    shapes: Vec<Shape>,
}

struct Shape {
    id: ShapeId,
    kind: ShapeKind,
    frame: Frame,
    image: Option<StoredImage>,
}

struct StoredImage {
    mime: ImageMime,
    b64: String,
}

/// Serializable view of the deck, for demos and assertions.
#[derive(Debug, Clone, Serialize)]
pub struct DeckSnapshot {
    pub slides: Vec<SlideSnapshot>,
    pub selection: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlideSnapshot {
    pub shapes: Vec<ShapeView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShapeView {
    pub id: String,
    pub kind: ShapeKind,
    pub frame: Frame,
    pub mime: Option<ImageMime>,
    pub uri: Option<String>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a picture shape and returns its id, creating slide 0 on an
    /// empty deck. For embedders and tests; bypasses batching.
    pub fn insert_picture(&self, frame: Frame, source_uri: &str) -> Result<ShapeId, HostError> {
        let stored = decode_source(source_uri)?;
        let mut state = self.lock_state();
        if state.slides.is_empty() {
            state.slides.push(Slide { shapes: Vec::new() });
        }
        let id = ShapeId::new();
        state.slides[0].shapes.push(Shape {
            id,
            kind: ShapeKind::Picture,
            frame,
            image: Some(stored),
        });
        Ok(id)
    }

    /// Seeds an imageless shape of the given kind, creating slide 0 on an
    /// empty deck.
    pub fn insert_shape(&self, kind: ShapeKind, frame: Frame) -> ShapeId {
        let mut state = self.lock_state();
        if state.slides.is_empty() {
            state.slides.push(Slide { shapes: Vec::new() });
        }
        let id = ShapeId::new();
        state.slides[0].shapes.push(Shape {
            id,
            kind,
            frame,
            image: None,
        });
        id
    }

    pub fn select(&self, ids: &[ShapeId]) {
        self.lock_state().selection = ids.to_vec();
    }

    pub fn clear_selection(&self) {
        self.lock_state().selection.clear();
    }

    pub fn slide_count(&self) -> usize {
        self.lock_state().slides.len()
    }

    /// Number of syncs applied so far, across all batches.
    pub fn sync_count(&self) -> u64 {
        self.lock_state().syncs
    }

    pub fn snapshot(&self) -> DeckSnapshot {
        let state = self.lock_state();
        DeckSnapshot {
            slides: state
                .slides
                .iter()
                .map(|slide| SlideSnapshot {
                    shapes: slide.shapes.iter().map(shape_view).collect(),
                })
                .collect(),
            selection: state.selection.iter().map(ShapeId::to_string).collect(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, DeckState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl DocumentSession for MemorySession {
    fn open_batch(&self) -> Result<Box<dyn DocumentBatch + '_>, HostError> {
        Ok(Box::new(MemoryBatch {
            session: self,
            queue: Vec::new(),
        }))
    }
}

fn shape_view(shape: &Shape) -> ShapeView {
    ShapeView {
        id: shape.id.to_string(),
        kind: shape.kind,
        frame: shape.frame,
        mime: shape.image.as_ref().map(|image| image.mime),
        uri: shape
            .image
            .as_ref()
            .map(|image| format!("{}{}", image.mime.uri_prefix(), image.b64)),
    }
}

enum QueuedOp {
    ReadSlideCount(Deferred<usize>),
    AddSlide,
    AddImage {
        slide_index: usize,
        source_uri: String,
        frame: Frame,
    },
    ReadSelectionCount(Deferred<usize>),
    ReadSelectedShape {
        index: usize,
        out: Deferred<ShapeSnapshot>,
    },
    ReadSelectedImage {
        index: usize,
        out: Deferred<String>,
    },
    DeleteShape {
        slide_index: usize,
        shape_id: ShapeId,
    },
}

struct MemoryBatch<'a> {
    session: &'a MemorySession,
    queue: Vec<QueuedOp>,
}

impl DocumentBatch for MemoryBatch<'_> {
    fn load_slide_count(&mut self) -> Deferred<usize> {
        let out = Deferred::new();
        self.queue.push(QueuedOp::ReadSlideCount(out.clone()));
        out
    }

    fn add_slide(&mut self) {
        self.queue.push(QueuedOp::AddSlide);
    }

    fn add_image(&mut self, slide_index: usize, source_uri: &str, frame: Frame) {
        self.queue.push(QueuedOp::AddImage {
            slide_index,
            source_uri: source_uri.to_string(),
            frame,
        });
    }

    fn load_selection_count(&mut self) -> Deferred<usize> {
        let out = Deferred::new();
        self.queue.push(QueuedOp::ReadSelectionCount(out.clone()));
        out
    }

    fn load_selected_shape(&mut self, index: usize) -> Deferred<ShapeSnapshot> {
        let out = Deferred::new();
        self.queue.push(QueuedOp::ReadSelectedShape {
            index,
            out: out.clone(),
        });
        out
    }

    fn load_selected_image(&mut self, index: usize) -> Deferred<String> {
        let out = Deferred::new();
        self.queue.push(QueuedOp::ReadSelectedImage {
            index,
            out: out.clone(),
        });
        out
    }

    fn delete_shape(&mut self, slide_index: usize, shape_id: ShapeId) {
        self.queue.push(QueuedOp::DeleteShape {
            slide_index,
            shape_id,
        });
    }

    fn sync(&mut self) -> Result<(), HostError> {
        let queue = std::mem::take(&mut self.queue);
        let mut state = self.session.lock_state();
        state.syncs += 1;
        for op in queue {
            apply(&mut state, op)?;
        }
        Ok(())
    }
}

fn apply(state: &mut DeckState, op: QueuedOp) -> Result<(), HostError> {
    match op {
        QueuedOp::ReadSlideCount(out) => out.fill(state.slides.len()),
        QueuedOp::AddSlide => state.slides.push(Slide { shapes: Vec::new() }),
        QueuedOp::AddImage {
            slide_index,
            source_uri,
            frame,
        } => {
            let stored = decode_source(&source_uri)?;
            let slide = state
                .slides
                .get_mut(slide_index)
                .ok_or(HostError::SlideOutOfRange(slide_index))?;
            slide.shapes.push(Shape {
                id: ShapeId::new(),
                kind: ShapeKind::Picture,
                frame,
                image: Some(stored),
            });
        }
        QueuedOp::ReadSelectionCount(out) => out.fill(state.selection.len()),
        QueuedOp::ReadSelectedShape { index, out } => {
            let (slide_index, shape) = locate_selected(state, index)?;
            out.fill(ShapeSnapshot {
                id: shape.id,
                slide_index,
                kind: shape.kind,
                frame: shape.frame,
            });
        }
        QueuedOp::ReadSelectedImage { index, out } => {
            let (_, shape) = locate_selected(state, index)?;
            if shape.kind != ShapeKind::Picture {
                return Err(HostError::NoImageData);
            }
            let image = shape.image.as_ref().ok_or(HostError::NoImageData)?;
            out.fill(image.b64.clone());
        }
        QueuedOp::DeleteShape {
            slide_index,
            shape_id,
        } => {
            let slide = state
                .slides
                .get_mut(slide_index)
                .ok_or(HostError::SlideOutOfRange(slide_index))?;
            let before = slide.shapes.len();
            slide.shapes.retain(|shape| shape.id != shape_id);
            if slide.shapes.len() == before {
                return Err(HostError::ShapeMissing);
            }
            state.selection.retain(|id| *id != shape_id);
        }
    }
    Ok(())
}

fn locate_selected(state: &DeckState, index: usize) -> Result<(usize, &Shape), HostError> {
    let id = state
        .selection
        .get(index)
        .copied()
        .ok_or(HostError::SelectionOutOfRange(index))?;
    for (slide_index, slide) in state.slides.iter().enumerate() {
        if let Some(shape) = slide.shapes.iter().find(|shape| shape.id == id) {
            return Ok((slide_index, shape));
        }
    }
    Err(HostError::ShapeMissing)
}

fn decode_source(source_uri: &str) -> Result<StoredImage, HostError> {
    let (mime, b64) = split_canonical_uri(source_uri).ok_or_else(|| {
        HostError::InvalidImage("source is not a canonical data uri".to_string())
    })?;
    let bytes = BASE64
        .decode(b64)
        .map_err(|err| HostError::InvalidImage(format!("base64 payload: {err}")))?;
    match mime {
        ImageMime::Png => {
            image::load_from_memory(&bytes)
                .map_err(|err| HostError::InvalidImage(format!("png payload: {err}")))?;
        }
        ImageMime::Svg => {
            let text = String::from_utf8(bytes)
                .map_err(|_| HostError::InvalidImage("svg payload is not utf-8".to_string()))?;
            if !text.contains("<svg") {
                return Err(HostError::InvalidImage(
                    "svg payload has no <svg> tag".to_string(),
                ));
            }
        }
    }
    Ok(StoredImage {
        mime,
        b64: b64.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::payload::{PNG_URI_PREFIX, SVG_URI_PREFIX};

    use super::*;

    fn tiny_png() -> anyhow::Result<Vec<u8>> {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 255, 255]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)?;
        Ok(out)
    }

    fn png_uri() -> anyhow::Result<String> {
        Ok(format!("{PNG_URI_PREFIX}{}", BASE64.encode(tiny_png()?)))
    }

    fn svg_uri(markup: &str) -> String {
        format!("{SVG_URI_PREFIX}{}", BASE64.encode(markup.as_bytes()))
    }

    #[test]
    fn queued_ops_take_effect_only_at_sync() -> anyhow::Result<()> {
        let session = MemorySession::new();
        let mut batch = session.open_batch()?;
        batch.add_slide();
        batch.add_image(0, &svg_uri("<svg></svg>"), frame());

        assert_eq!(session.slide_count(), 0);
        batch.sync()?;
        drop(batch);

        let deck = session.snapshot();
        assert_eq!(deck.slides.len(), 1);
        assert_eq!(deck.slides[0].shapes.len(), 1);
        assert_eq!(deck.slides[0].shapes[0].kind, ShapeKind::Picture);
        assert_eq!(deck.slides[0].shapes[0].mime, Some(ImageMime::Svg));
        Ok(())
    }

    #[test]
    fn dropping_a_batch_discards_its_queue() -> anyhow::Result<()> {
        let session = MemorySession::new();
        let mut batch = session.open_batch()?;
        batch.add_slide();
        drop(batch);

        assert_eq!(session.slide_count(), 0);
        assert_eq!(session.sync_count(), 0);
        Ok(())
    }

    #[test]
    fn invalid_image_source_fails_the_sync_and_drops_the_rest() -> anyhow::Result<()> {
        let session = MemorySession::new();
        let mut batch = session.open_batch()?;
        batch.add_slide();
        batch.add_image(0, "data:image/png;base64,not-base64!", frame());
        batch.add_slide();

        let err = batch.sync().unwrap_err();
        assert!(matches!(err, HostError::InvalidImage(_)));
        drop(batch);

        // The first add_slide applied, the op after the failure did not.
        assert_eq!(session.slide_count(), 1);
        Ok(())
    }

    #[test]
    fn broken_png_payload_is_rejected() -> anyhow::Result<()> {
        let session = MemorySession::new();
        let mut batch = session.open_batch()?;
        batch.add_slide();
        batch.sync()?;

        let uri = format!("{PNG_URI_PREFIX}{}", BASE64.encode(b"not a png"));
        batch.add_image(0, &uri, frame());
        assert!(matches!(
            batch.sync().unwrap_err(),
            HostError::InvalidImage(_)
        ));
        Ok(())
    }

    #[test]
    fn selection_reads_resolve_metadata_and_bytes() -> anyhow::Result<()> {
        let session = MemorySession::new();
        let png = tiny_png()?;
        let id = session.insert_picture(frame(), &png_uri()?)?;
        session.select(&[id]);

        let mut batch = session.open_batch()?;
        let count = batch.load_selection_count();
        batch.sync()?;
        assert_eq!(count.get()?, 1);

        let shape = batch.load_selected_shape(0);
        batch.sync()?;
        let shape = shape.get()?;
        assert_eq!(shape.id, id);
        assert_eq!(shape.slide_index, 0);
        assert_eq!(shape.kind, ShapeKind::Picture);

        let image = batch.load_selected_image(0);
        batch.sync()?;
        assert_eq!(BASE64.decode(image.get()?)?, png);
        Ok(())
    }

    #[test]
    fn selected_non_picture_has_no_image_data() -> anyhow::Result<()> {
        let session = MemorySession::new();
        let id = session.insert_shape(ShapeKind::TextBox, frame());
        session.select(&[id]);

        let mut batch = session.open_batch()?;
        let _image = batch.load_selected_image(0);
        assert!(matches!(
            batch.sync().unwrap_err(),
            HostError::NoImageData
        ));
        Ok(())
    }

    #[test]
    fn deleting_a_shape_drops_it_from_the_selection() -> anyhow::Result<()> {
        let session = MemorySession::new();
        let id = session.insert_picture(frame(), &png_uri()?)?;
        session.select(&[id]);

        let mut batch = session.open_batch()?;
        batch.delete_shape(0, id);
        batch.sync()?;

        let deck = session.snapshot();
        assert!(deck.slides[0].shapes.is_empty());
        assert!(deck.selection.is_empty());
        Ok(())
    }

    #[test]
    fn deleting_an_unknown_shape_reports_shape_missing() -> anyhow::Result<()> {
        let session = MemorySession::new();
        session.insert_picture(frame(), &png_uri()?)?;

        let mut batch = session.open_batch()?;
        batch.delete_shape(0, ShapeId::new());
        assert!(matches!(
            batch.sync().unwrap_err(),
            HostError::ShapeMissing
        ));
        Ok(())
    }

    #[test]
    fn interleaved_batches_each_apply_at_their_own_sync() -> anyhow::Result<()> {
        let session = MemorySession::new();
        let mut first = session.open_batch()?;
        let mut second = session.open_batch()?;

        first.add_slide();
        second.add_slide();
        first.sync()?;
        assert_eq!(session.slide_count(), 1);
        second.sync()?;
        assert_eq!(session.slide_count(), 2);
        assert_eq!(session.sync_count(), 2);
        Ok(())
    }

    fn frame() -> Frame {
        Frame {
            x: 10.0,
            y: 20.0,
            width: 100.0,
            height: 80.0,
        }
    }
}
