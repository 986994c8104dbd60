use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::{Decision, DecisionId, DecisionStatus, Username};

/// Storage abstraction so the service can run against memory, a file, or a test double.
///
/// Implementations assign ids: `insert` gives the decision and every child without an id a
/// fresh one, and `update` does the same for children added during an edit.
pub trait DecisionRepository: Send + Sync {
    fn insert(&self, decision: Decision) -> Result<Decision, RepositoryError>;
    fn update(&self, decision: Decision) -> Result<Decision, RepositoryError>;
    fn fetch(&self, id: DecisionId) -> Result<Option<Decision>, RepositoryError>;
    fn all(&self) -> Result<Vec<Decision>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook told about every saved change so watchers can be emailed.
pub trait ChangeNotifier: Send + Sync {
    fn notify(&self, change: DecisionChange) -> Result<(), NotifyError>;
}

/// One saved edit and who should hear about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionChange {
    pub decision_id: DecisionId,
    pub short_name: String,
    pub status: DecisionStatus,
    pub editor: Username,
    pub recipients: BTreeSet<Username>,
}

impl DecisionChange {
    /// Change record for `decision` as saved by `editor`. The editor is never a recipient.
    pub fn for_saved(decision: &Decision, id: DecisionId, editor: &Username) -> Self {
        let recipients = decision
            .watchers
            .iter()
            .filter(|watcher| *watcher != editor)
            .cloned()
            .collect();

        Self {
            decision_id: id,
            short_name: decision.short_name.clone(),
            status: decision.status,
            editor: editor.clone(),
            recipients,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
