//! Consensus decision tracking: proposals, their concerns and feedback, and the pages that
//! list, show, edit and export them.

pub mod chart;
pub mod context;
pub mod domain;
pub mod export;
pub mod feedback;
pub mod forms;
pub mod listing;
pub mod repository;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use chart::{calculate_svg_bars, Bar, SvgBars, DEFAULT_MAX_HEIGHT, MIN_BAR_HEIGHT};
pub use context::{RequestContext, REMOTE_USER_HEADER};
pub use domain::{
    Concern, ConcernId, Decision, DecisionId, DecisionStatus, Feedback, FeedbackId,
    FeedbackRating, Username,
};
pub use export::{export_csv, write_csv, ExportError, CSV_COLUMNS, EXPORT_FILENAME};
pub use feedback::{aggregate, FeedbackItem, FeedbackKind, FeedbackStats, FeedbackSummary};
pub use forms::{DecisionEditForm, FieldErrors, FormData, InlineDecisionForm};
pub use listing::{filter_and_sort, ListingContext, ListingPage, SortField, SortForm, SortOrder};
pub use repository::{
    ChangeNotifier, DecisionChange, DecisionRepository, NotifyError, RepositoryError,
};
pub use router::decision_router;
pub use service::{
    DecisionDetail, DecisionService, DecisionServiceError, DecisionView, EditTarget,
    InlineEditPage, InlineOutcome, SubmitOutcome,
};
pub use store::{InMemoryChangeNotifier, InMemoryDecisionRepository, JsonFileDecisionRepository};
