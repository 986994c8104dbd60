use serde::Serialize;

use super::domain::{Feedback, FeedbackRating};

/// Display bucket a piece of feedback is counted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Question,
    Danger,
    Concern,
    Consensus,
}

impl FeedbackKind {
    pub const fn ordered() -> [Self; 4] {
        [Self::Question, Self::Danger, Self::Concern, Self::Consensus]
    }

    /// Question, danger and significant concerns get their own bucket; anything else is
    /// counted as consensus.
    pub const fn for_rating(rating: FeedbackRating) -> Self {
        match rating {
            FeedbackRating::Question => Self::Question,
            FeedbackRating::Danger => Self::Danger,
            FeedbackRating::SignificantConcerns => Self::Concern,
            _ => Self::Consensus,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::Danger => "danger",
            Self::Concern => "concern",
            Self::Consensus => "consensus",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedbackStats {
    pub all: usize,
    pub question: usize,
    pub danger: usize,
    pub concern: usize,
    pub consensus: usize,
}

impl FeedbackStats {
    pub fn count(&self, kind: FeedbackKind) -> usize {
        match kind {
            FeedbackKind::Question => self.question,
            FeedbackKind::Danger => self.danger,
            FeedbackKind::Concern => self.concern,
            FeedbackKind::Consensus => self.consensus,
        }
    }

    /// Largest per-category count; `all` is not a category.
    pub fn max_category(&self) -> usize {
        FeedbackKind::ordered()
            .into_iter()
            .map(|kind| self.count(kind))
            .max()
            .unwrap_or(0)
    }

    fn record(&mut self, kind: FeedbackKind) {
        match kind {
            FeedbackKind::Question => self.question += 1,
            FeedbackKind::Danger => self.danger += 1,
            FeedbackKind::Concern => self.concern += 1,
            FeedbackKind::Consensus => self.consensus += 1,
        }
        self.all += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackItem {
    pub description: String,
    #[serde(rename = "type")]
    pub kind: FeedbackKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedbackSummary {
    pub stats: FeedbackStats,
    pub items: Vec<FeedbackItem>,
}

/// Count feedback per bucket and list it in the order given.
pub fn aggregate<'a, I>(feedback: I) -> FeedbackSummary
where
    I: IntoIterator<Item = &'a Feedback>,
{
    let mut summary = FeedbackSummary::default();

    for entry in feedback {
        let kind = FeedbackKind::for_rating(entry.rating);
        summary.stats.record(kind);
        summary.items.push(FeedbackItem {
            description: entry.description.clone(),
            kind,
        });
    }

    summary
}
