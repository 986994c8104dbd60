use chrono::NaiveDate;
use serde::Serialize;

use super::{invalid_choice, FieldErrors, FormData, INVALID_DATE, REQUIRED};
use crate::decisions::domain::{Decision, DecisionStatus, Username};

pub const SHORT_NAME_MAX_LENGTH: usize = 255;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

/// Raw values of the main decision form, exactly as shown or submitted.
///
/// `created_date` and `archived_date` are not editable; the lifecycle stamps them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecisionForm {
    pub short_name: String,
    pub description: String,
    pub status: String,
    pub decided_date: String,
    pub effective_date: String,
    pub review_date: String,
    pub expiry_date: String,
    pub watch: bool,
}

/// Cleaned main-form values ready to be applied to a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionChanges {
    pub short_name: String,
    pub description: String,
    pub status: DecisionStatus,
    pub decided_date: Option<NaiveDate>,
    pub effective_date: Option<NaiveDate>,
    pub review_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub watch: bool,
}

impl DecisionChanges {
    /// Copy the edited fields onto `decision`. Watchers are left to the caller.
    pub fn apply_to(&self, decision: &mut Decision) {
        decision.short_name = self.short_name.clone();
        decision.description = self.description.clone();
        decision.status = self.status;
        decision.decided_date = self.decided_date;
        decision.effective_date = self.effective_date;
        decision.review_date = self.review_date;
        decision.expiry_date = self.expiry_date;
    }
}

impl DecisionForm {
    pub fn for_decision(decision: &Decision, user: &Username) -> Self {
        Self {
            short_name: decision.short_name.clone(),
            description: decision.description.clone(),
            status: decision.status.ordinal().to_string(),
            decided_date: format_date(decision.decided_date),
            effective_date: format_date(decision.effective_date),
            review_date: format_date(decision.review_date),
            expiry_date: format_date(decision.expiry_date),
            watch: decision.is_watched_by(user),
        }
    }

    pub fn from_data(data: &FormData) -> Self {
        Self {
            short_name: data.value("short_name"),
            description: data.value("description"),
            status: data.value("status"),
            decided_date: data.value("decided_date"),
            effective_date: data.value("effective_date"),
            review_date: data.value("review_date"),
            expiry_date: data.value("expiry_date"),
            watch: data.checkbox("watch"),
        }
    }

    /// Validate the raw values. A blank status keeps `current_status`.
    pub fn clean(&self, current_status: DecisionStatus) -> Result<DecisionChanges, FieldErrors> {
        let mut errors = FieldErrors::default();

        let short_name = self.short_name.trim().to_string();
        if short_name.is_empty() {
            errors.add("short_name", REQUIRED);
        } else {
            let length = short_name.chars().count();
            if length > SHORT_NAME_MAX_LENGTH {
                errors.add(
                    "short_name",
                    format!(
                        "Ensure this value has at most {SHORT_NAME_MAX_LENGTH} characters (it has {length})."
                    ),
                );
            }
        }

        let status = match self.status.trim() {
            "" => current_status,
            raw => match raw.parse::<u8>().ok().and_then(DecisionStatus::from_ordinal) {
                Some(status) => status,
                None => {
                    errors.add("status", invalid_choice(raw));
                    current_status
                }
            },
        };

        let decided_date = clean_date("decided_date", &self.decided_date, &mut errors);
        let effective_date = clean_date("effective_date", &self.effective_date, &mut errors);
        let review_date = clean_date("review_date", &self.review_date, &mut errors);
        let expiry_date = clean_date("expiry_date", &self.expiry_date, &mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(DecisionChanges {
            short_name,
            description: self.description.trim().to_string(),
            status,
            decided_date,
            effective_date,
            review_date,
            expiry_date,
            watch: self.watch,
        })
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|value| value.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn clean_date(field: &str, raw: &str, errors: &mut FieldErrors) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok());
    if parsed.is_none() {
        errors.add(field, INVALID_DATE);
    }
    parsed
}
