use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::decisions::context::{RequestContext, REMOTE_USER_HEADER};
use crate::decisions::domain::{Decision, DecisionId, DecisionStatus, Username};
use crate::decisions::forms::FormData;
use crate::decisions::repository::{
    ChangeNotifier, DecisionChange, DecisionRepository, NotifyError, RepositoryError,
};
use crate::decisions::store::{InMemoryChangeNotifier, InMemoryDecisionRepository};
use crate::decisions::{decision_router, DecisionService};

pub(super) type MemoryService = DecisionService<InMemoryDecisionRepository, InMemoryChangeNotifier>;

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2011, 3, 14).expect("valid date")
}

pub(super) fn ctx(user: &str) -> RequestContext {
    RequestContext::new(Username::new(user), today())
}

pub(super) fn build_service() -> (
    MemoryService,
    Arc<InMemoryDecisionRepository>,
    Arc<InMemoryChangeNotifier>,
) {
    let repository = Arc::new(InMemoryDecisionRepository::new());
    let notifier = Arc::new(InMemoryChangeNotifier::default());
    let service = DecisionService::new(repository.clone(), notifier.clone());
    (service, repository, notifier)
}

pub(super) fn form(pairs: &[(&str, &str)]) -> FormData {
    pairs.iter().copied().collect()
}

/// Management fields for a formset with `total` rows, `initial` of them pre-existing.
pub(super) fn management(prefix: &str, total: usize, initial: usize) -> Vec<(String, String)> {
    vec![
        (format!("{prefix}-TOTAL_FORMS"), total.to_string()),
        (format!("{prefix}-INITIAL_FORMS"), initial.to_string()),
        (format!("{prefix}-MAX_NUM_FORMS"), String::new()),
    ]
}

pub(super) fn row(prefix: &str, index: usize, field: &str, value: &str) -> (String, String) {
    (format!("{prefix}-{index}-{field}"), value.to_string())
}

pub(super) fn seed(repository: &InMemoryDecisionRepository, name: &str, status: DecisionStatus) -> Decision {
    let mut decision = Decision::new(status);
    decision.short_name = name.to_string();
    decision.created_date = Some(today());
    repository.insert(decision).expect("seed decision")
}

pub(super) fn stored(repository: &InMemoryDecisionRepository, id: DecisionId) -> Decision {
    repository
        .fetch(id)
        .expect("fetch succeeds")
        .expect("decision present")
}

pub(super) struct UnavailableRepository;

impl DecisionRepository for UnavailableRepository {
    fn insert(&self, _decision: Decision) -> Result<Decision, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _decision: Decision) -> Result<Decision, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: DecisionId) -> Result<Option<Decision>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn all(&self) -> Result<Vec<Decision>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) struct OfflineNotifier;

impl ChangeNotifier for OfflineNotifier {
    fn notify(&self, _change: DecisionChange) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp offline".to_string()))
    }
}

pub(super) fn router_with_service(service: MemoryService) -> axum::Router {
    decision_router(Arc::new(service))
}

pub(super) fn get(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(user) = user {
        builder = builder.header(REMOTE_USER_HEADER, user);
    }
    builder.body(Body::empty()).expect("request")
}

pub(super) fn post_form(uri: &str, user: &str, pairs: &[(String, String)]) -> Request<Body> {
    let body = serde_urlencoded::to_string(pairs).expect("encode form");

    Request::post(uri)
        .header(REMOTE_USER_HEADER, user)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .expect("request")
}

pub(super) fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
    raw.iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

pub(super) fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

pub(super) async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body")
        .to_vec()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    serde_json::from_slice(&read_body(response).await).expect("json payload")
}
