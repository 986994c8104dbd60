use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{Decision, DecisionStatus};
use super::forms::Choice;

/// Fields a listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    ShortName,
    FeedbackCount,
    CreatedDate,
    DecidedDate,
    EffectiveDate,
    ReviewDate,
    ExpiryDate,
    ArchivedDate,
}

impl SortField {
    pub const fn ordered() -> [Self; 9] {
        [
            Self::Id,
            Self::ShortName,
            Self::FeedbackCount,
            Self::CreatedDate,
            Self::DecidedDate,
            Self::EffectiveDate,
            Self::ReviewDate,
            Self::ExpiryDate,
            Self::ArchivedDate,
        ]
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::ShortName => "short_name",
            Self::FeedbackCount => "feedback_count",
            Self::CreatedDate => "created_date",
            Self::DecidedDate => "decided_date",
            Self::EffectiveDate => "effective_date",
            Self::ReviewDate => "review_date",
            Self::ExpiryDate => "expiry_date",
            Self::ArchivedDate => "archived_date",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::ShortName => "Name",
            Self::FeedbackCount => "Feedback",
            Self::CreatedDate => "Created",
            Self::DecidedDate => "Decided",
            Self::EffectiveDate => "Effective",
            Self::ReviewDate => "Review",
            Self::ExpiryDate => "Expiry",
            Self::ArchivedDate => "Archived",
        }
    }

    fn date(self, decision: &Decision) -> Option<NaiveDate> {
        match self {
            Self::CreatedDate => decision.created_date,
            Self::DecidedDate => decision.decided_date,
            Self::EffectiveDate => decision.effective_date,
            Self::ReviewDate => decision.review_date,
            Self::ExpiryDate => decision.expiry_date,
            Self::ArchivedDate => decision.archived_date,
            Self::Id | Self::ShortName | Self::FeedbackCount => None,
        }
    }

    fn compare(self, a: &Decision, b: &Decision) -> Ordering {
        match self {
            Self::Id => a.id.cmp(&b.id),
            Self::ShortName => a
                .short_name
                .to_lowercase()
                .cmp(&b.short_name.to_lowercase()),
            Self::FeedbackCount => a.feedback_count().cmp(&b.feedback_count()),
            // `None` orders before any date.
            _ => self.date(a).cmp(&self.date(b)),
        }
    }
}

/// A sort field plus direction, written `field` or `-field` in forms and URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub field: SortField,
    pub descending: bool,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self {
            field: SortField::Id,
            descending: true,
        }
    }
}

impl SortOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (descending, name) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        SortField::ordered()
            .into_iter()
            .find(|field| field.name() == name)
            .map(|field| Self { field, descending })
    }

    pub fn as_param(&self) -> String {
        if self.descending {
            format!("-{}", self.field.name())
        } else {
            self.field.name().to_string()
        }
    }

    /// Every accepted `sort` value, ascending then descending per field.
    pub fn choices() -> Vec<Choice> {
        SortField::ordered()
            .into_iter()
            .flat_map(|field| {
                [
                    Choice {
                        value: field.name().to_string(),
                        label: field.label(),
                    },
                    Choice {
                        value: format!("-{}", field.name()),
                        label: field.label(),
                    },
                ]
            })
            .collect()
    }

    /// Ordering with newest-first id as the tie breaker.
    pub fn compare(&self, a: &Decision, b: &Decision) -> Ordering {
        let primary = self.field.compare(a, b);
        let primary = if self.descending {
            primary.reverse()
        } else {
            primary
        };
        primary.then_with(|| b.id.cmp(&a.id))
    }
}

/// Query string of a listing page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SortForm {
    #[serde(default)]
    pub sort: Option<String>,
}

impl SortForm {
    /// Requested order, or the default when nothing or something unknown was asked for.
    pub fn order(&self) -> SortOrder {
        self.sort
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .and_then(SortOrder::parse)
            .unwrap_or_default()
    }
}

/// Decisions with `status`, ordered by `order`.
pub fn filter_and_sort(decisions: Vec<Decision>, status: DecisionStatus, order: SortOrder) -> Vec<Decision> {
    let mut selected: Vec<Decision> = decisions
        .into_iter()
        .filter(|decision| decision.status == status)
        .collect();
    selected.sort_by(|a, b| order.compare(a, b));
    selected
}

/// Title, CSS class and visible columns of the listing for one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListingContext {
    pub page_title: &'static str,
    pub class: &'static str,
    pub columns: [&'static str; 4],
}

impl ListingContext {
    pub const fn for_status(status: DecisionStatus) -> Self {
        match status {
            DecisionStatus::Proposal => Self {
                page_title: "Current Active Proposals",
                class: "proposal",
                columns: ["id", "excerpt", "feedback_count", "expiry_date"],
            },
            DecisionStatus::Decision => Self {
                page_title: "Decisions Made",
                class: "decision",
                columns: ["id", "excerpt", "decided_date", "review_date"],
            },
            DecisionStatus::Archived => Self {
                page_title: "Archived Decisions",
                class: "archived",
                columns: ["id", "excerpt", "created_date", "archived_date"],
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingRow {
    pub id: Option<u64>,
    pub short_name: String,
    pub excerpt: String,
    pub status: &'static str,
    pub feedback_count: usize,
    pub created_date: Option<NaiveDate>,
    pub decided_date: Option<NaiveDate>,
    pub effective_date: Option<NaiveDate>,
    pub review_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub archived_date: Option<NaiveDate>,
}

impl From<&Decision> for ListingRow {
    fn from(decision: &Decision) -> Self {
        Self {
            id: decision.id.map(|id| id.0),
            short_name: decision.short_name.clone(),
            excerpt: decision.excerpt(),
            status: decision.status.label(),
            feedback_count: decision.feedback_count(),
            created_date: decision.created_date,
            decided_date: decision.decided_date,
            effective_date: decision.effective_date,
            review_date: decision.review_date,
            expiry_date: decision.expiry_date,
            archived_date: decision.archived_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortFormView {
    pub sort: String,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingPage {
    #[serde(flatten)]
    pub context: ListingContext,
    pub status: DecisionStatus,
    pub sort_form: SortFormView,
    pub decisions: Vec<ListingRow>,
}

impl ListingPage {
    pub fn build(decisions: Vec<Decision>, status: DecisionStatus, sort: &SortForm) -> Self {
        let order = sort.order();
        let rows = filter_and_sort(decisions, status, order)
            .iter()
            .map(ListingRow::from)
            .collect();

        Self {
            context: ListingContext::for_status(status),
            status,
            sort_form: SortFormView {
                sort: order.as_param(),
                choices: SortOrder::choices(),
            },
            decisions: rows,
        }
    }
}
