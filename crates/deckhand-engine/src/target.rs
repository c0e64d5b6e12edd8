use deckhand_contracts::host::{DocumentBatch, Frame, SlideTarget};
use deckhand_contracts::outcome::AssistError;

/// Fixed centered frame for inserted shapes, in points.
pub const INSERT_FRAME: Frame = Frame {
    x: 250.0,
    y: 150.0,
    width: 200.0,
    height: 200.0,
};

/// Picks the slide an insertion lands on, inside the caller's batch so the
/// observed slide count and the insertion see one consistent document.
///
/// An empty deck gets exactly one new slide (queued on the same batch);
/// otherwise the first slide is targeted. Deliberately does not track a
/// "current" slide across the host UI.
pub fn resolve_target(batch: &mut dyn DocumentBatch) -> Result<SlideTarget, AssistError> {
    let count = batch.load_slide_count();
    batch.sync()?;
    if count.get()? == 0 {
        batch.add_slide();
    }
    Ok(SlideTarget {
        slide_index: 0,
        frame: INSERT_FRAME,
    })
}
