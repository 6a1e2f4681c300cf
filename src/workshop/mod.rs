//! The Digital Workshop core.
//!
//! [`Workshop`] bundles the aggregate with the pieces that live beside it:
//! the pair-programmer chat log and the preview resolver. Async operations
//! over it are in [`pipeline`].

pub mod blueprint;
pub mod chat;
pub mod console;
pub mod files;
pub mod pipeline;
pub mod plan;
pub mod preview;
pub mod stage;
pub mod state;

use crate::context::ServiceContext;
use crate::error::WorkshopError;

pub use blueprint::{Blueprint, BlueprintFile};
pub use chat::{ChatLog, ChatMessage, PlanStatus};
pub use console::{ConsoleLevel, ConsoleMessage, ConsoleSink};
pub use files::{FileOutcome, FileStore, FileTreeNode, ProjectFile};
pub use plan::{ActionKind, ActionOperation, ActionPlan, ChatReply};
pub use preview::{Preview, PreviewResolver, ReferenceScheme};
pub use stage::{BuildStage, OutputTab, SideTab};
pub use state::{PlanReport, Slot, Ticket, WorkshopState};

/// One workshop session: aggregate, conversation and preview.
#[derive(Debug, Default)]
pub struct Workshop {
    /// The aggregate root.
    pub state: WorkshopState,
    /// Conversation with the pair programmer.
    pub chat: ChatLog,
    /// Preview resolver owning the live reference pool.
    pub preview: PreviewResolver,
}

impl Workshop {
    /// A fresh workshop.
    #[must_use]
    pub fn new(ctx: &ServiceContext) -> Self {
        Self::from_parts(WorkshopState::new(ctx), ChatLog::default())
    }

    /// Reassembles a workshop from persisted parts.
    #[must_use]
    pub fn from_parts(state: WorkshopState, chat: ChatLog) -> Self {
        Self { state, chat, preview: PreviewResolver::default() }
    }

    /// Starts over: fresh aggregate (goal kept), empty chat, released preview.
    pub fn reset(&mut self, ctx: &ServiceContext) {
        self.state.reset(ctx);
        self.chat.clear();
        self.preview.release();
    }

    /// Regenerates the preview from the current file store.
    pub fn render_preview(&mut self, ctx: &ServiceContext, scheme: ReferenceScheme) -> Preview {
        self.preview.render(ctx.id_gen.as_ref(), self.state.files(), scheme)
    }

    /// Re-renders the preview after the file store changed, with the scheme
    /// of the previous render.
    ///
    /// Outstanding references of the previous generation are released. Does
    /// nothing (and returns `None`) while no reference is live and the
    /// preview tab is not showing.
    pub fn refresh_preview(&mut self, ctx: &ServiceContext) -> Option<Preview> {
        if self.preview.pool().is_empty() && self.state.active_output_tab() != OutputTab::Preview {
            return None;
        }
        let scheme = self.preview.scheme();
        Some(self.render_preview(ctx, scheme))
    }

    /// Applies or discards the pending plan on message `index` (the latest
    /// pending one when `None`).
    ///
    /// # Errors
    ///
    /// Returns [`WorkshopError::NotFound`] when there is no
    /// such pending plan, or a stage error when applying outside the build.
    pub fn resolve_plan(
        &mut self,
        ctx: &ServiceContext,
        index: Option<usize>,
        status: PlanStatus,
    ) -> Result<Option<PlanReport>, WorkshopError> {
        let index = index.or_else(|| self.chat.pending_plan_index()).ok_or_else(|| {
            WorkshopError::NotFound("no action plan awaiting approval".into())
        })?;
        if status == PlanStatus::Applied {
            self.state.require_stage(BuildStage::Build)?;
        }
        let plan = self.chat.take_plan(index, status)?;
        match status {
            PlanStatus::Applied => {
                let report = self.state.apply_action_plan(ctx, &plan)?;
                self.refresh_preview(ctx);
                Ok(Some(report))
            }
            PlanStatus::Discarded => {
                self.state.log(ctx, ConsoleLevel::Info, "Action plan discarded.");
                Ok(None)
            }
        }
    }
}
