//! Form handling for the decision edit pages.
//!
//! A submission is validated in two stages: the main [`DecisionForm`] is cleaned first, then
//! each [`InlineFormset`] is re-bound against the (possibly unsaved) decision and validated.
//! Nothing is persisted unless every stage is clean.

mod children;
mod decision;
mod formset;

use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::{Decision, DecisionStatus, FeedbackRating, Username};

pub use children::{apply_concern_changes, apply_feedback_changes, ConcernForm, FeedbackForm};
pub use decision::{DecisionChanges, DecisionForm, SHORT_NAME_MAX_LENGTH};
pub use formset::{
    FormsetRow, InlineForm, InlineFormset, ManagementForm, RowChange, DEFAULT_EXTRA_FORMS,
    MAX_FORMSET_FORMS,
};

pub const CONCERN_PREFIX: &str = "concern_set";
pub const FEEDBACK_PREFIX: &str = "feedback_set";

pub(crate) const REQUIRED: &str = "This field is required.";
pub(crate) const INVALID_DATE: &str = "Enter a valid date.";
pub(crate) const TAMPERED_MANAGEMENT: &str =
    "ManagementForm data is missing or has been tampered with.";

pub(crate) fn invalid_choice(value: &str) -> String {
    format!("Select a valid choice. {value} is not one of the available choices.")
}

/// Submitted `application/x-www-form-urlencoded` fields in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

impl FormData {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// Last value submitted for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn value(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Checkbox semantics: unchecked boxes are not submitted at all.
    pub fn checkbox(&self, key: &str) -> bool {
        match self.get(key) {
            Some(value) => !matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "" | "false" | "0" | "off"
            ),
            None => false,
        }
    }

    pub fn is_cancel(&self) -> bool {
        self.get("submit")
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("cancel"))
    }
}

impl<K, V> FromIterator<(K, V)> for FormData
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn extend(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One `<option>` of a select widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub value: String,
    pub label: &'static str,
}

pub fn status_choices() -> Vec<Choice> {
    DecisionStatus::ordered()
        .into_iter()
        .map(|status| Choice {
            value: status.ordinal().to_string(),
            label: status.label(),
        })
        .collect()
}

pub fn rating_choices() -> Vec<Choice> {
    FeedbackRating::ordered()
        .into_iter()
        .map(|rating| Choice {
            value: rating.ordinal().to_string(),
            label: rating.label(),
        })
        .collect()
}

/// Everything the add/edit page shows: the main form plus the concern and feedback
/// formsets. A formset is `None` when a submission carried no management data for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionEditForm {
    pub decision_id: Option<u64>,
    pub decision_form: DecisionForm,
    #[serde(skip_serializing_if = "FieldErrors::is_empty")]
    pub decision_errors: FieldErrors,
    pub concern_formset: Option<InlineFormset<ConcernForm>>,
    pub feedback_formset: Option<InlineFormset<FeedbackForm>>,
    pub status_choices: Vec<Choice>,
    pub rating_choices: Vec<Choice>,
}

impl DecisionEditForm {
    /// Unbound form showing the stored values of `decision`.
    pub fn for_decision(decision: &Decision, user: &Username) -> Self {
        let concerns = decision
            .concerns
            .iter()
            .filter_map(|concern| concern.id.map(|id| (id.0, ConcernForm::from(concern))))
            .collect();
        let feedback = decision
            .feedback
            .iter()
            .filter_map(|entry| entry.id.map(|id| (id.0, FeedbackForm::from(entry))))
            .collect();

        Self {
            decision_id: decision.id.map(|id| id.0),
            decision_form: DecisionForm::for_decision(decision, user),
            decision_errors: FieldErrors::default(),
            concern_formset: Some(InlineFormset::unbound(CONCERN_PREFIX, concerns)),
            feedback_formset: Some(InlineFormset::unbound(FEEDBACK_PREFIX, feedback)),
            status_choices: status_choices(),
            rating_choices: rating_choices(),
        }
    }

    /// Form bound to submitted data; nothing is validated yet.
    pub fn bind(decision: &Decision, data: &FormData) -> Self {
        Self {
            decision_id: decision.id.map(|id| id.0),
            decision_form: DecisionForm::from_data(data),
            decision_errors: FieldErrors::default(),
            concern_formset: InlineFormset::bind(CONCERN_PREFIX, data),
            feedback_formset: InlineFormset::bind(FEEDBACK_PREFIX, data),
            status_choices: status_choices(),
            rating_choices: rating_choices(),
        }
    }
}

/// The main form alone, as shown by the inline editor on the detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineDecisionForm {
    pub decision_form: DecisionForm,
    #[serde(skip_serializing_if = "FieldErrors::is_empty")]
    pub decision_errors: FieldErrors,
    pub status_choices: Vec<Choice>,
    pub show_form: bool,
}

impl InlineDecisionForm {
    pub fn new(decision_form: DecisionForm, decision_errors: FieldErrors) -> Self {
        Self {
            decision_form,
            decision_errors,
            status_choices: status_choices(),
            show_form: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_last_submitted_value() {
        let data: FormData = [("short_name", "first"), ("short_name", "second")]
            .into_iter()
            .collect();
        assert_eq!(data.get("short_name"), Some("second"));
        assert_eq!(data.get("missing"), None);
        assert_eq!(data.value("missing"), "");
    }

    #[test]
    fn checkbox_follows_browser_semantics() {
        let data: FormData = [("a", "on"), ("b", "false"), ("c", "True"), ("d", "")]
            .into_iter()
            .collect();
        assert!(data.checkbox("a"));
        assert!(!data.checkbox("b"));
        assert!(data.checkbox("c"));
        assert!(!data.checkbox("d"));
        assert!(!data.checkbox("absent"));
    }

    #[test]
    fn cancel_button_is_detected() {
        let data: FormData = [("submit", "Cancel")].into_iter().collect();
        assert!(data.is_cancel());
        let data: FormData = [("submit", "Save")].into_iter().collect();
        assert!(!data.is_cancel());
    }

    #[test]
    fn field_errors_merge_per_field() {
        let mut errors = FieldErrors::default();
        errors.add("short_name", REQUIRED);
        let mut more = FieldErrors::default();
        more.add("short_name", "too long");
        more.add("status", invalid_choice("9"));
        errors.extend(more);
        assert_eq!(errors.get("short_name").len(), 2);
        assert!(errors.has("status"));
        assert!(errors.get("review_date").is_empty());
    }

    #[test]
    fn status_choices_use_ordinals() {
        let choices = status_choices();
        assert_eq!(choices[0].value, "1");
        assert_eq!(choices[0].label, "proposal");
        assert_eq!(choices.len(), 3);
        assert_eq!(rating_choices().len(), 4);
    }
}
