//! Engine for the slide image assistant.
//!
//! Wires the three acquisition strategies to a host document session and a
//! status sink, and runs each named action through one fixed lifecycle:
//! validate input, mark busy, acquire, normalize, insert, report the
//! outcome, unmark busy. The busy flag clears on every path out.

pub mod acquire;
pub mod config;
pub mod gateway;
pub mod target;

use std::sync::Arc;

use deckhand_contracts::actions::Action;
use deckhand_contracts::host::{DocumentSession, Frame, ShapeId};
use deckhand_contracts::outcome::{AssistError, OperationOutcome};
use deckhand_contracts::payload::{self, EmbeddableImage};
use deckhand_contracts::status::{StatusLevel, StatusSink, STATUS_REVERT_DELAY};

use crate::acquire::cutout::CutoutStrategy;
use crate::acquire::icon::IconStrategy;
use crate::acquire::logo::LogoStrategy;
use crate::acquire::{AcquireStrategy, Placement};
use crate::config::ServiceConfig;
use crate::gateway::DocumentGateway;
use crate::target::resolve_target;

/// Facade over the whole pipeline. One instance serves any number of
/// operations, one at a time; it holds no per-operation state.
pub struct SlideAssistant {
    gateway: DocumentGateway,
    status: Arc<dyn StatusSink>,
    icon: IconStrategy,
    logo: LogoStrategy,
    cutout: CutoutStrategy,
}

impl SlideAssistant {
    pub fn new(
        session: Arc<dyn DocumentSession>,
        status: Arc<dyn StatusSink>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            gateway: DocumentGateway::new(session),
            status,
            icon: IconStrategy::new(config.generation),
            logo: LogoStrategy::new(config.logo),
            cutout: CutoutStrategy::new(config.cutout),
        }
    }

    /// Runs one action end to end and reports its outcome through the
    /// status sink.
    ///
    /// Blank input for an input-requiring action short-circuits before the
    /// busy flag is touched and before any network or document access.
    /// Otherwise the operation runs between a busy on/off pair, the pair
    /// closing on success and failure alike, and the action's input field
    /// is cleared only after success.
    pub fn run(&self, action: Action, input: &str) -> OperationOutcome {
        let spec = action.spec();
        if spec.input_required && input.trim().is_empty() {
            let outcome = OperationOutcome::from(AssistError::user(spec.blank_message));
            self.signal(action, &outcome);
            return outcome;
        }

        self.status.set_busy(action, true);
        let outcome = match self.execute(action, input) {
            Ok(()) => OperationOutcome::success(spec.success_message),
            Err(err) => OperationOutcome::from(err),
        };
        self.signal(action, &outcome);
        if outcome.is_success() && spec.input_required {
            self.status.clear_input(action);
        }
        self.status.set_busy(action, false);
        outcome
    }

    fn execute(&self, action: Action, input: &str) -> Result<(), AssistError> {
        let acquired = self.strategy(action).acquire(&self.gateway, input)?;
        let image = payload::normalize(acquired.payload)?;
        match acquired.placement {
            Placement::NewShape => self.add_to_slide(&image),
            Placement::ReplaceShape {
                slide_index,
                shape_id,
                frame,
            } => self.replace_in_place(&image, slide_index, shape_id, frame),
        }
    }

    fn strategy(&self, action: Action) -> &dyn AcquireStrategy {
        match action {
            Action::GenerateIcon => &self.icon,
            Action::FetchLogo => &self.logo,
            Action::RemoveBackground => &self.cutout,
        }
    }

    fn add_to_slide(&self, image: &EmbeddableImage) -> Result<(), AssistError> {
        self.gateway.with_document(|batch| {
            let target = resolve_target(batch)?;
            batch.add_image(target.slide_index, image.uri(), target.frame);
            Ok(())
        })
    }

    // The processed picture queues before the delete of the source shape.
    // A replacement the host rejects aborts the sync with the original
    // still on the slide; the source goes only once the add has applied.
    fn replace_in_place(
        &self,
        image: &EmbeddableImage,
        slide_index: usize,
        shape_id: ShapeId,
        frame: Frame,
    ) -> Result<(), AssistError> {
        self.gateway.with_document(|batch| {
            batch.add_image(slide_index, image.uri(), frame);
            batch.delete_shape(slide_index, shape_id);
            Ok(())
        })
    }

    fn signal(&self, action: Action, outcome: &OperationOutcome) {
        let level = outcome.level();
        let revert_after = match level {
            StatusLevel::Success | StatusLevel::Error => Some(STATUS_REVERT_DELAY),
            StatusLevel::Info => None,
        };
        self.status
            .show(action, level, &outcome.message, revert_after);
    }
}
