use std::sync::Arc;

use serde::Serialize;

use super::chart::{calculate_svg_bars, SvgBars};
use super::context::RequestContext;
use super::domain::{Decision, DecisionId, DecisionStatus, Username};
use super::export::{self, ExportError};
use super::feedback::{aggregate, FeedbackItem, FeedbackStats};
use super::forms::{
    apply_concern_changes, apply_feedback_changes, DecisionEditForm, DecisionForm, FormData,
    InlineDecisionForm,
};
use super::listing::{ListingPage, SortForm};
use super::repository::{
    ChangeNotifier, DecisionChange, DecisionRepository, RepositoryError,
};
use crate::config::ChartConfig;

/// Which record an add/edit submission targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    New { status: DecisionStatus },
    Existing(DecisionId),
}

/// Result of an add/edit submission.
#[derive(Debug)]
pub enum SubmitOutcome {
    Saved(Decision),
    /// The user pressed cancel; carries the status whose listing to return to.
    Cancelled(DecisionStatus),
    Invalid(Box<DecisionEditForm>),
}

/// Result of an inline edit submission.
#[derive(Debug)]
pub enum InlineOutcome {
    Saved(Decision),
    Cancelled(DecisionId),
    Invalid(Box<InlineEditPage>),
}

/// A decision plus its derived columns, as shown on the detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionView {
    #[serde(flatten)]
    pub decision: Decision,
    pub status_label: &'static str,
    pub excerpt: String,
    pub feedback_count: usize,
}

impl From<Decision> for DecisionView {
    fn from(decision: Decision) -> Self {
        Self {
            status_label: decision.status.label(),
            excerpt: decision.excerpt(),
            feedback_count: decision.feedback_count(),
            decision,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionDetail {
    pub decision: DecisionView,
    pub feedback_stats: FeedbackStats,
    pub bars: SvgBars,
    pub feedback_list: Vec<FeedbackItem>,
}

/// Detail page with the inline editor open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineEditPage {
    #[serde(flatten)]
    pub detail: DecisionDetail,
    #[serde(flatten)]
    pub form: InlineDecisionForm,
}

/// Service composing the decision repository, the change notifier, and the page builders.
pub struct DecisionService<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    chart: ChartConfig,
}

impl<R, N> DecisionService<R, N>
where
    R: DecisionRepository + 'static,
    N: ChangeNotifier + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>) -> Self {
        Self {
            repository,
            notifier,
            chart: ChartConfig::default(),
        }
    }

    pub fn with_chart(mut self, chart: ChartConfig) -> Self {
        self.chart = chart;
        self
    }

    /// Decisions with `status`, sorted as the query asks.
    pub fn listing(
        &self,
        status: DecisionStatus,
        sort: &SortForm,
    ) -> Result<ListingPage, DecisionServiceError> {
        let decisions = self.repository.all()?;
        Ok(ListingPage::build(decisions, status, sort))
    }

    pub fn detail(&self, id: DecisionId) -> Result<DecisionDetail, DecisionServiceError> {
        let decision = self.load(id)?;
        Ok(self.build_detail(decision))
    }

    /// Empty add form, optionally preset to a status.
    pub fn blank_form(&self, ctx: &RequestContext, status: DecisionStatus) -> DecisionEditForm {
        DecisionEditForm::for_decision(&Decision::new(status), &ctx.user)
    }

    pub fn edit_form(
        &self,
        ctx: &RequestContext,
        id: DecisionId,
    ) -> Result<DecisionEditForm, DecisionServiceError> {
        let decision = self.load(id)?;
        Ok(DecisionEditForm::for_decision(&decision, &ctx.user))
    }

    pub fn inline_form(
        &self,
        ctx: &RequestContext,
        id: DecisionId,
    ) -> Result<InlineEditPage, DecisionServiceError> {
        let decision = self.load(id)?;
        let form = InlineDecisionForm::new(
            DecisionForm::for_decision(&decision, &ctx.user),
            Default::default(),
        );
        Ok(InlineEditPage {
            detail: self.build_detail(decision),
            form,
        })
    }

    /// Validate and save an add/edit submission.
    ///
    /// The main form is cleaned first; only when it is valid are the concern and feedback
    /// formsets validated against the updated, still unsaved, decision. Any error returns
    /// the bound form without touching the repository.
    pub fn submit(
        &self,
        ctx: &RequestContext,
        target: EditTarget,
        data: &FormData,
    ) -> Result<SubmitOutcome, DecisionServiceError> {
        let decision = match target {
            EditTarget::New { status } => Decision::new(status),
            EditTarget::Existing(id) => self.load(id)?,
        };

        if data.is_cancel() {
            return Ok(SubmitOutcome::Cancelled(decision.status));
        }

        let previous = decision.id.map(|_| decision.status);
        let mut form = DecisionEditForm::bind(&decision, data);

        let changes = match form.decision_form.clean(decision.status) {
            Ok(changes) => changes,
            Err(errors) => {
                form.decision_errors = errors;
                return Ok(SubmitOutcome::Invalid(Box::new(form)));
            }
        };

        let mut working = decision;
        changes.apply_to(&mut working);

        let concern_changes = form
            .concern_formset
            .as_mut()
            .map(|formset| formset.validate(&working.concern_ids()));
        let feedback_changes = form
            .feedback_formset
            .as_mut()
            .map(|formset| formset.validate(&working.feedback_ids()));

        if matches!(concern_changes, Some(None)) || matches!(feedback_changes, Some(None)) {
            return Ok(SubmitOutcome::Invalid(Box::new(form)));
        }

        if let Some(Some(rows)) = concern_changes {
            apply_concern_changes(&mut working, rows);
        }
        if let Some(Some(rows)) = feedback_changes {
            apply_feedback_changes(&mut working, rows);
        }

        self.update_watch(&mut working, &ctx.user, changes.watch);
        working.stamp_lifecycle(previous, ctx.today);

        let saved = self.save(ctx, working)?;
        Ok(SubmitOutcome::Saved(saved))
    }

    /// Validate and save the main form from the detail page. Watching is not editable here.
    pub fn inline_submit(
        &self,
        ctx: &RequestContext,
        id: DecisionId,
        data: &FormData,
    ) -> Result<InlineOutcome, DecisionServiceError> {
        let decision = self.load(id)?;
        if data.is_cancel() {
            return Ok(InlineOutcome::Cancelled(id));
        }

        let form = DecisionForm::from_data(data);
        let changes = match form.clean(decision.status) {
            Ok(changes) => changes,
            Err(errors) => {
                let page = InlineEditPage {
                    detail: self.build_detail(decision),
                    form: InlineDecisionForm::new(form, errors),
                };
                return Ok(InlineOutcome::Invalid(Box::new(page)));
            }
        };

        let previous = decision.status;
        let mut working = decision;
        changes.apply_to(&mut working);
        working.stamp_lifecycle(Some(previous), ctx.today);

        let saved = self.save(ctx, working)?;
        Ok(InlineOutcome::Saved(saved))
    }

    /// Every stored decision as CSV.
    pub fn export_csv(&self) -> Result<Vec<u8>, DecisionServiceError> {
        let decisions = self.repository.all()?;
        let bytes = export::export_csv(&decisions)?;
        tracing::info!(decisions = decisions.len(), "exported decisions as csv");
        Ok(bytes)
    }

    fn load(&self, id: DecisionId) -> Result<Decision, DecisionServiceError> {
        self.repository
            .fetch(id)?
            .ok_or(DecisionServiceError::NotFound(id))
    }

    fn build_detail(&self, decision: Decision) -> DecisionDetail {
        let summary = aggregate(&decision.feedback);
        let bars = calculate_svg_bars(&summary.stats, self.chart.max_height);
        DecisionDetail {
            decision: DecisionView::from(decision),
            feedback_stats: summary.stats,
            bars,
            feedback_list: summary.items,
        }
    }

    fn update_watch(&self, decision: &mut Decision, user: &Username, watch: bool) {
        let changed = if watch {
            decision.add_watcher(user.clone())
        } else {
            decision.remove_watcher(user)
        };
        if changed {
            tracing::debug!(user = %user, watching = watch, "watcher list changed");
        }
    }

    fn save(&self, ctx: &RequestContext, decision: Decision) -> Result<Decision, DecisionServiceError> {
        let saved = match decision.id {
            Some(_) => self.repository.update(decision)?,
            None => self.repository.insert(decision)?,
        };
        let id = saved
            .id
            .ok_or_else(|| RepositoryError::Unavailable("repository returned no id".to_string()))?;

        tracing::info!(
            decision_id = %id,
            status = %saved.status,
            editor = %ctx.user,
            "decision saved"
        );

        // Already committed; notification is best effort.
        if let Err(error) = self
            .notifier
            .notify(DecisionChange::for_saved(&saved, id, &ctx.user))
        {
            tracing::warn!(decision_id = %id, error = %error, "watcher notification failed");
        }
        Ok(saved)
    }
}

/// Error raised by the decision service.
#[derive(Debug, thiserror::Error)]
pub enum DecisionServiceError {
    #[error("decision {0} not found")]
    NotFound(DecisionId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Export(#[from] ExportError),
}
