use std::collections::HashMap;

use serde::Serialize;

use super::formset::{InlineForm, RowChange};
use super::{invalid_choice, FieldErrors, REQUIRED};
use crate::decisions::domain::{Concern, Decision, Feedback, FeedbackRating};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConcernForm {
    pub short_name: String,
}

impl From<&Concern> for ConcernForm {
    fn from(concern: &Concern) -> Self {
        Self {
            short_name: concern.short_name.clone(),
        }
    }
}

impl InlineForm for ConcernForm {
    type Cleaned = Concern;

    fn from_row<F>(field: F) -> Self
    where
        F: Fn(&str) -> String,
    {
        Self {
            short_name: field("short_name"),
        }
    }

    fn is_blank(&self) -> bool {
        self.short_name.trim().is_empty()
    }

    fn clean(&self) -> Result<Concern, FieldErrors> {
        let short_name = self.short_name.trim();
        if short_name.is_empty() {
            let mut errors = FieldErrors::default();
            errors.add("short_name", REQUIRED);
            return Err(errors);
        }
        Ok(Concern::new(short_name))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedbackForm {
    pub description: String,
    pub rating: String,
}

impl From<&Feedback> for FeedbackForm {
    fn from(feedback: &Feedback) -> Self {
        Self {
            description: feedback.description.clone(),
            rating: feedback.rating.ordinal().to_string(),
        }
    }
}

impl InlineForm for FeedbackForm {
    type Cleaned = Feedback;

    fn from_row<F>(field: F) -> Self
    where
        F: Fn(&str) -> String,
    {
        Self {
            description: field("description"),
            rating: field("rating"),
        }
    }

    fn is_blank(&self) -> bool {
        self.description.trim().is_empty() && self.rating.trim().is_empty()
    }

    fn clean(&self) -> Result<Feedback, FieldErrors> {
        let mut errors = FieldErrors::default();

        let description = self.description.trim();
        if description.is_empty() {
            errors.add("description", REQUIRED);
        }

        let rating = match self.rating.trim() {
            "" => {
                errors.add("rating", REQUIRED);
                None
            }
            raw => {
                let rating = raw.parse::<u8>().ok().and_then(FeedbackRating::from_ordinal);
                if rating.is_none() {
                    errors.add("rating", invalid_choice(raw));
                }
                rating
            }
        };

        match rating {
            Some(rating) if errors.is_empty() => Ok(Feedback::new(description, rating)),
            _ => Err(errors),
        }
    }
}

/// Replace the decision's concerns with the cleaned rows, in row order. Rows that name an
/// existing concern update it in place; concerns no row names are dropped.
pub fn apply_concern_changes(decision: &mut Decision, changes: Vec<RowChange<Concern>>) {
    let mut existing: HashMap<u64, Concern> = decision
        .concerns
        .drain(..)
        .filter_map(|concern| concern.id.map(|id| (id.0, concern)))
        .collect();

    decision.concerns = changes
        .into_iter()
        .map(
            |RowChange { id, value }| match id.and_then(|id| existing.remove(&id)) {
                Some(mut concern) => {
                    concern.short_name = value.short_name;
                    concern
                }
                None => value,
            },
        )
        .collect();
}

/// Same replacement rule as [`apply_concern_changes`], for feedback.
pub fn apply_feedback_changes(decision: &mut Decision, changes: Vec<RowChange<Feedback>>) {
    let mut existing: HashMap<u64, Feedback> = decision
        .feedback
        .drain(..)
        .filter_map(|feedback| feedback.id.map(|id| (id.0, feedback)))
        .collect();

    decision.feedback = changes
        .into_iter()
        .map(
            |RowChange { id, value }| match id.and_then(|id| existing.remove(&id)) {
                Some(mut feedback) => {
                    feedback.description = value.description;
                    feedback.rating = value.rating;
                    feedback
                }
                None => value,
            },
        )
        .collect();
}
