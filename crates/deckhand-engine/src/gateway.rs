use std::sync::Arc;

use deckhand_contracts::host::{DocumentBatch, DocumentSession};
use deckhand_contracts::outcome::AssistError;

/// Sole entry point to host document state.
///
/// Each call opens one batch, runs the operation closure against it, and
/// commits with a final sync on success so queued mutations are never left
/// uncommitted. The closure may sync as often as it needs in between; a
/// deferred read is only usable after the sync that resolved it. On error
/// the batch drops with whatever was still queued. Single attempt, no
/// retry; host failures surface as transient errors with the host's text.
#[derive(Clone)]
pub struct DocumentGateway {
    session: Arc<dyn DocumentSession>,
}

impl DocumentGateway {
    pub fn new(session: Arc<dyn DocumentSession>) -> Self {
        Self { session }
    }

    pub fn with_document<T>(
        &self,
        op: impl FnOnce(&mut dyn DocumentBatch) -> Result<T, AssistError>,
    ) -> Result<T, AssistError> {
        let mut batch = self.session.open_batch()?;
        let value = op(batch.as_mut())?;
        batch.sync()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use deckhand_contracts::host::memory::MemorySession;
    use deckhand_contracts::host::Frame;
    use deckhand_contracts::payload::SVG_URI_PREFIX;

    use super::*;

    fn frame() -> Frame {
        Frame {
            x: 0.0,
            y: 0.0,
            width: 50.0,
            height: 50.0,
        }
    }

    #[test]
    fn success_commits_queued_mutations_with_a_final_sync() -> anyhow::Result<()> {
        let session = Arc::new(MemorySession::new());
        let gateway = DocumentGateway::new(session.clone());

        gateway.with_document(|batch| {
            batch.add_slide();
            Ok(())
        })?;

        assert_eq!(session.slide_count(), 1);
        Ok(())
    }

    #[test]
    fn callback_error_discards_queued_mutations() {
        let session = Arc::new(MemorySession::new());
        let gateway = DocumentGateway::new(session.clone());

        let result: Result<(), AssistError> = gateway.with_document(|batch| {
            batch.add_slide();
            Err(AssistError::user("changed my mind"))
        });

        assert!(matches!(result, Err(AssistError::User(_))));
        assert_eq!(session.slide_count(), 0);
    }

    #[test]
    fn intermediate_syncs_resolve_reads_inside_the_callback() -> anyhow::Result<()> {
        let session = Arc::new(MemorySession::new());
        let gateway = DocumentGateway::new(session.clone());

        let observed = gateway.with_document(|batch| {
            let count = batch.load_slide_count();
            batch.sync()?;
            let count = count.get()?;
            batch.add_slide();
            Ok(count)
        })?;

        assert_eq!(observed, 0);
        assert_eq!(session.slide_count(), 1);
        Ok(())
    }

    #[test]
    fn host_failure_at_the_final_sync_surfaces_as_transient() -> anyhow::Result<()> {
        let session = Arc::new(MemorySession::new());
        let gateway = DocumentGateway::new(session.clone());
        gateway.with_document(|batch| {
            batch.add_slide();
            Ok(())
        })?;

        let result = gateway.with_document(|batch| {
            // Valid base64, but not a canonical data uri.
            batch.add_image(0, &BASE64.encode(b"raw"), frame());
            Ok(())
        });

        match result {
            Err(AssistError::Transient(message)) => {
                assert!(message.contains("host rejected image source"), "{message}");
            }
            other => panic!("expected transient failure, got {other:?}"),
        }
        assert!(session.snapshot().slides[0].shapes.is_empty());
        Ok(())
    }

    #[test]
    fn committed_uri_survives_the_round_trip() -> anyhow::Result<()> {
        let session = Arc::new(MemorySession::new());
        let gateway = DocumentGateway::new(session.clone());
        let uri = format!("{SVG_URI_PREFIX}{}", BASE64.encode(b"<svg/>"));

        gateway.with_document(|batch| {
            batch.add_slide();
            batch.add_image(0, &uri, frame());
            Ok(())
        })?;

        let deck = session.snapshot();
        assert_eq!(deck.slides[0].shapes[0].uri.as_deref(), Some(uri.as_str()));
        Ok(())
    }
}
