use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Repository-assigned identifier for a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionId(pub u64);

impl fmt::Display for DecisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConcernId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedbackId(pub u64);

/// Login name of the person acting on a decision.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(pub String);

impl Username {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a decision sits in the consent process.
///
/// The ordinals match the values stored by earlier deployments and submitted by the edit
/// form, so they must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    Decision,
    #[default]
    Proposal,
    Archived,
}

impl DecisionStatus {
    /// Order used for form choices and navigation.
    pub const fn ordered() -> [Self; 3] {
        [Self::Proposal, Self::Decision, Self::Archived]
    }

    pub const fn ordinal(self) -> u8 {
        match self {
            Self::Decision => 0,
            Self::Proposal => 1,
            Self::Archived => 2,
        }
    }

    pub const fn from_ordinal(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Decision),
            1 => Some(Self::Proposal),
            2 => Some(Self::Archived),
            _ => None,
        }
    }

    /// Human readable label; doubles as the listing URL slug.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Decision => "decision",
            Self::Proposal => "proposal",
            Self::Archived => "archived",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A stakeholder's reading of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackRating {
    Question,
    Danger,
    SignificantConcerns,
    Consent,
}

impl FeedbackRating {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Question,
            Self::Danger,
            Self::SignificantConcerns,
            Self::Consent,
        ]
    }

    pub const fn ordinal(self) -> u8 {
        match self {
            Self::Question => 0,
            Self::Danger => 1,
            Self::SignificantConcerns => 2,
            Self::Consent => 3,
        }
    }

    pub const fn from_ordinal(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Question),
            1 => Some(Self::Danger),
            2 => Some(Self::SignificantConcerns),
            3 => Some(Self::Consent),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::Danger => "danger",
            Self::SignificantConcerns => "significant concerns",
            Self::Consent => "consent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concern {
    pub id: Option<ConcernId>,
    pub short_name: String,
}

impl Concern {
    pub fn new(short_name: impl Into<String>) -> Self {
        Self {
            id: None,
            short_name: short_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Option<FeedbackId>,
    pub description: String,
    pub rating: FeedbackRating,
}

impl Feedback {
    pub fn new(description: impl Into<String>, rating: FeedbackRating) -> Self {
        Self {
            id: None,
            description: description.into(),
            rating,
        }
    }
}

const EXCERPT_LIMIT: usize = 140;

/// A proposal or ratified choice together with its concerns and feedback.
///
/// `id` stays `None` until the repository stores the record for the first time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Decision {
    pub id: Option<DecisionId>,
    pub short_name: String,
    pub description: String,
    pub status: DecisionStatus,
    pub created_date: Option<NaiveDate>,
    pub decided_date: Option<NaiveDate>,
    pub effective_date: Option<NaiveDate>,
    pub review_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub archived_date: Option<NaiveDate>,
    #[serde(default)]
    pub watchers: BTreeSet<Username>,
    #[serde(default)]
    pub concerns: Vec<Concern>,
    #[serde(default)]
    pub feedback: Vec<Feedback>,
}

impl Decision {
    pub fn new(status: DecisionStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn feedback_count(&self) -> usize {
        self.feedback.len()
    }

    /// Plain-text teaser of the description, falling back to the short name.
    pub fn excerpt(&self) -> String {
        let text = strip_markup(&self.description);
        let source = if text.is_empty() {
            self.short_name.trim()
        } else {
            text.as_str()
        };

        if source.chars().count() <= EXCERPT_LIMIT {
            return source.to_string();
        }

        let mut excerpt: String = source.chars().take(EXCERPT_LIMIT).collect();
        if let Some(cut) = excerpt.rfind(char::is_whitespace) {
            excerpt.truncate(cut);
        }
        excerpt.push_str("...");
        excerpt
    }

    pub fn is_watched_by(&self, user: &Username) -> bool {
        self.watchers.contains(user)
    }

    pub fn add_watcher(&mut self, user: Username) -> bool {
        self.watchers.insert(user)
    }

    pub fn remove_watcher(&mut self, user: &Username) -> bool {
        self.watchers.remove(user)
    }

    pub fn concern_ids(&self) -> Vec<u64> {
        self.concerns
            .iter()
            .filter_map(|concern| concern.id.map(|id| id.0))
            .collect()
    }

    pub fn feedback_ids(&self) -> Vec<u64> {
        self.feedback
            .iter()
            .filter_map(|feedback| feedback.id.map(|id| id.0))
            .collect()
    }

    /// Fill in the dates implied by the current status. `previous` is the status the
    /// record had before this save (`None` for a record that was never stored). Dates that
    /// are already set are kept.
    pub fn stamp_lifecycle(&mut self, previous: Option<DecisionStatus>, today: NaiveDate) {
        if self.created_date.is_none() {
            self.created_date = Some(today);
        }

        let current = self.status;
        let entered = |status: DecisionStatus| current == status && previous != Some(status);

        if entered(DecisionStatus::Decision) && self.decided_date.is_none() {
            self.decided_date = Some(today);
        }
        if entered(DecisionStatus::Archived) && self.archived_date.is_none() {
            self.archived_date = Some(today);
        }
    }
}

fn strip_markup(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;

    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                text.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2011, 3, d).expect("valid date")
    }

    #[test]
    fn status_ordinals_round_trip_through_form_values() {
        for status in DecisionStatus::ordered() {
            assert_eq!(DecisionStatus::from_ordinal(status.ordinal()), Some(status));
        }
        assert_eq!(DecisionStatus::from_ordinal(3), None);
        assert_eq!(DecisionStatus::default(), DecisionStatus::Proposal);
        assert_eq!(DecisionStatus::Decision.ordinal(), 0);
    }

    #[test]
    fn status_labels_resolve_listing_slugs() {
        assert_eq!(
            DecisionStatus::from_label("Archived"),
            Some(DecisionStatus::Archived)
        );
        assert_eq!(DecisionStatus::from_label("pending"), None);
    }

    #[test]
    fn excerpt_strips_markup_and_truncates_on_word_boundary() {
        let mut decision = Decision::new(DecisionStatus::Proposal);
        decision.short_name = "Feed the dog".to_string();
        assert_eq!(decision.excerpt(), "Feed the dog");

        decision.description = "<p>Feed the <strong>dog</strong> twice</p>".to_string();
        assert_eq!(decision.excerpt(), "Feed the dog twice");

        decision.description = "word ".repeat(60);
        let excerpt = decision.excerpt();
        assert!(excerpt.ends_with("..."));
        assert!(excerpt.chars().count() <= EXCERPT_LIMIT + 3);
        assert!(!excerpt.contains("wor..."));
    }

    #[test]
    fn watchers_are_a_set() {
        let mut decision = Decision::default();
        let alice = Username::new("alice");
        assert!(decision.add_watcher(alice.clone()));
        assert!(!decision.add_watcher(alice.clone()));
        assert!(decision.is_watched_by(&alice));
        assert!(decision.remove_watcher(&alice));
        assert!(!decision.is_watched_by(&alice));
    }

    #[test]
    fn lifecycle_stamps_created_date_once() {
        let mut decision = Decision::new(DecisionStatus::Proposal);
        decision.stamp_lifecycle(None, day(1));
        decision.stamp_lifecycle(Some(DecisionStatus::Proposal), day(2));
        assert_eq!(decision.created_date, Some(day(1)));
        assert_eq!(decision.decided_date, None);
        assert_eq!(decision.archived_date, None);
    }

    #[test]
    fn lifecycle_stamps_decided_and_archived_dates_on_transition() {
        let mut decision = Decision::new(DecisionStatus::Proposal);
        decision.stamp_lifecycle(None, day(1));

        decision.status = DecisionStatus::Decision;
        decision.stamp_lifecycle(Some(DecisionStatus::Proposal), day(5));
        assert_eq!(decision.decided_date, Some(day(5)));

        decision.status = DecisionStatus::Archived;
        decision.stamp_lifecycle(Some(DecisionStatus::Decision), day(9));
        assert_eq!(decision.decided_date, Some(day(5)));
        assert_eq!(decision.archived_date, Some(day(9)));
    }

    #[test]
    fn lifecycle_keeps_submitted_dates() {
        let mut decision = Decision::new(DecisionStatus::Decision);
        decision.decided_date = Some(day(3));
        decision.stamp_lifecycle(None, day(7));
        assert_eq!(decision.decided_date, Some(day(3)));
        assert_eq!(decision.created_date, Some(day(7)));
    }

    #[test]
    fn lifecycle_does_not_restamp_cleared_date_without_transition() {
        let mut decision = Decision::new(DecisionStatus::Decision);
        decision.stamp_lifecycle(Some(DecisionStatus::Decision), day(7));
        assert_eq!(decision.decided_date, None);
    }
}
