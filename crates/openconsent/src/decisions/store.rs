//! Concrete [`DecisionRepository`] and [`ChangeNotifier`] adapters.
//!
//! Both repositories keep the whole data set in one [`Snapshot`]; the file-backed one
//! rewrites it as JSON after every mutation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use super::domain::{ConcernId, Decision, DecisionId, FeedbackId};
use super::repository::{
    ChangeNotifier, DecisionChange, DecisionRepository, NotifyError, RepositoryError,
};

/// Every stored decision plus the id sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    next_decision_id: u64,
    next_concern_id: u64,
    next_feedback_id: u64,
    decisions: BTreeMap<u64, Decision>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            next_decision_id: 1,
            next_concern_id: 1,
            next_feedback_id: 1,
            decisions: BTreeMap::new(),
        }
    }
}

impl Snapshot {
    fn assign_child_ids(&mut self, decision: &mut Decision) {
        for concern in decision.concerns.iter_mut().filter(|c| c.id.is_none()) {
            concern.id = Some(ConcernId(self.next_concern_id));
            self.next_concern_id += 1;
        }
        for feedback in decision.feedback.iter_mut().filter(|f| f.id.is_none()) {
            feedback.id = Some(FeedbackId(self.next_feedback_id));
            self.next_feedback_id += 1;
        }
    }

    fn insert(&mut self, mut decision: Decision) -> Decision {
        let id = self.next_decision_id;
        self.next_decision_id += 1;

        decision.id = Some(DecisionId(id));
        self.assign_child_ids(&mut decision);
        self.decisions.insert(id, decision.clone());
        decision
    }

    fn update(&mut self, mut decision: Decision) -> Result<Decision, RepositoryError> {
        let id = match decision.id {
            Some(id) if self.decisions.contains_key(&id.0) => id,
            _ => return Err(RepositoryError::NotFound),
        };

        self.assign_child_ids(&mut decision);
        self.decisions.insert(id.0, decision.clone());
        Ok(decision)
    }

    fn fetch(&self, id: DecisionId) -> Option<Decision> {
        self.decisions.get(&id.0).cloned()
    }

    fn all(&self) -> Vec<Decision> {
        self.decisions.values().cloned().collect()
    }
}

fn lock(snapshot: &Mutex<Snapshot>) -> Result<MutexGuard<'_, Snapshot>, RepositoryError> {
    snapshot
        .lock()
        .map_err(|_| RepositoryError::Unavailable("decision store lock poisoned".to_string()))
}

/// Process-local repository; contents vanish on restart.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDecisionRepository {
    snapshot: Arc<Mutex<Snapshot>>,
}

impl InMemoryDecisionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DecisionRepository for InMemoryDecisionRepository {
    fn insert(&self, decision: Decision) -> Result<Decision, RepositoryError> {
        Ok(lock(&self.snapshot)?.insert(decision))
    }

    fn update(&self, decision: Decision) -> Result<Decision, RepositoryError> {
        lock(&self.snapshot)?.update(decision)
    }

    fn fetch(&self, id: DecisionId) -> Result<Option<Decision>, RepositoryError> {
        Ok(lock(&self.snapshot)?.fetch(id))
    }

    fn all(&self) -> Result<Vec<Decision>, RepositoryError> {
        Ok(lock(&self.snapshot)?.all())
    }
}

/// Repository persisted as a single JSON document.
#[derive(Debug)]
pub struct JsonFileDecisionRepository {
    path: PathBuf,
    snapshot: Mutex<Snapshot>,
}

impl JsonFileDecisionRepository {
    /// Open the store at `path`, starting empty when the file does not exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let path = path.as_ref().to_path_buf();
        let snapshot = if path.exists() {
            let raw = fs::read(&path).map_err(|error| unavailable(&path, error))?;
            serde_json::from_slice(&raw).map_err(|error| unavailable(&path, error))?
        } else {
            Snapshot::default()
        };

        tracing::debug!(path = %path.display(), "opened decision store");
        Ok(Self {
            path,
            snapshot: Mutex::new(snapshot),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, snapshot: &Snapshot) -> Result<(), RepositoryError> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|error| unavailable(parent, error))?;
        }

        let json = serde_json::to_vec_pretty(snapshot)
            .map_err(|error| unavailable(&self.path, error))?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json).map_err(|error| unavailable(&staging, error))?;
        fs::rename(&staging, &self.path).map_err(|error| unavailable(&self.path, error))
    }
}

fn unavailable(path: &Path, error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Unavailable(format!("{}: {error}", path.display()))
}

impl DecisionRepository for JsonFileDecisionRepository {
    fn insert(&self, decision: Decision) -> Result<Decision, RepositoryError> {
        let mut snapshot = lock(&self.snapshot)?;
        let mut staged = snapshot.clone();
        let stored = staged.insert(decision);
        self.persist(&staged)?;
        *snapshot = staged;
        Ok(stored)
    }

    fn update(&self, decision: Decision) -> Result<Decision, RepositoryError> {
        let mut snapshot = lock(&self.snapshot)?;
        let mut staged = snapshot.clone();
        let stored = staged.update(decision)?;
        self.persist(&staged)?;
        *snapshot = staged;
        Ok(stored)
    }

    fn fetch(&self, id: DecisionId) -> Result<Option<Decision>, RepositoryError> {
        Ok(lock(&self.snapshot)?.fetch(id))
    }

    fn all(&self) -> Result<Vec<Decision>, RepositoryError> {
        Ok(lock(&self.snapshot)?.all())
    }
}

/// Notifier that keeps every change in memory, for tests and the demo.
#[derive(Debug, Default, Clone)]
pub struct InMemoryChangeNotifier {
    events: Arc<Mutex<Vec<DecisionChange>>>,
}

impl InMemoryChangeNotifier {
    pub fn events(&self) -> Vec<DecisionChange> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ChangeNotifier for InMemoryChangeNotifier {
    fn notify(&self, change: DecisionChange) -> Result<(), NotifyError> {
        self.events
            .lock()
            .map_err(|_| NotifyError::Transport("event log lock poisoned".to_string()))?
            .push(change);
        Ok(())
    }
}
