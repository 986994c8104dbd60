use super::common::*;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;

use crate::decisions::domain::{DecisionId, DecisionStatus, Username};
use crate::decisions::forms::{CONCERN_PREFIX, REQUIRED};
use crate::decisions::listing::SortForm;
use crate::decisions::repository::DecisionRepository;
use crate::decisions::store::InMemoryChangeNotifier;
use crate::decisions::{DecisionService, CSV_COLUMNS};

#[tokio::test]
async fn add_route_redirects_to_the_listing() {
    let (service, repository, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(post_form(
            "/decision",
            "alice",
            &pairs(&[("short_name", "Feed the dog")]),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/decisions/proposal");
    assert_eq!(stored(&repository, DecisionId(1)).short_name, "Feed the dog");
}

#[tokio::test]
async fn add_route_honours_initial_status() {
    let (service, repository, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(post_form(
            "/decision?status=0",
            "alice",
            &pairs(&[("short_name", "Feed the dog")]),
        ))
        .await
        .expect("route executes");
    assert_eq!(location(&response), "/decisions/decision");
    assert_eq!(
        stored(&repository, DecisionId(1)).decided_date,
        stored(&repository, DecisionId(1)).created_date
    );

    let response = router
        .oneshot(get("/decision?status=9", Some("alice")))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn add_route_saves_concerns_in_order() {
    let (service, repository, _) = build_service();
    let router = router_with_service(service);

    let mut form = pairs(&[("short_name", "Buy eggs")]);
    form.extend(management(CONCERN_PREFIX, 3, 0));
    form.push(row(CONCERN_PREFIX, 0, "short_name", "The eggs are bad"));
    form.push(row(CONCERN_PREFIX, 1, "short_name", "No one wants them"));

    let response = router
        .oneshot(post_form("/decision", "alice", &form))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let concerns = stored(&repository, DecisionId(1)).concerns;
    assert_eq!(concerns.len(), 2);
    assert_eq!(concerns[0].short_name, "The eggs are bad");
    assert_eq!(concerns[1].short_name, "No one wants them");
}

#[tokio::test]
async fn invalid_submission_is_unprocessable_with_errors() {
    let (service, repository, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(post_form(
            "/decision",
            "alice",
            &pairs(&[("description", "no name given")]),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["decision_errors"]["short_name"][0], REQUIRED);
    assert_eq!(payload["decision_form"]["description"], "no name given");
    assert!(repository.all().expect("all").is_empty());
}

#[tokio::test]
async fn edit_route_toggles_watch_and_cancel_skips_save() {
    let (service, repository, _) = build_service();
    let id = seed(&repository, "Feed the dog", DecisionStatus::Decision)
        .id
        .expect("id");
    let router = router_with_service(service);
    let uri = format!("/decision/{id}/edit");

    let response = router
        .clone()
        .oneshot(post_form(
            &uri,
            "alice",
            &pairs(&[("short_name", "Feed the dog"), ("watch", "true")]),
        ))
        .await
        .expect("route executes");
    assert_eq!(location(&response), "/decisions/decision");
    assert!(stored(&repository, id).is_watched_by(&Username::new("alice")));

    let response = router
        .oneshot(post_form(
            &uri,
            "alice",
            &pairs(&[("short_name", "Renamed"), ("submit", "Cancel")]),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/decisions/decision");
    assert_eq!(stored(&repository, id).short_name, "Feed the dog");
}

#[tokio::test]
async fn inline_route_redirects_to_detail() {
    let (service, repository, _) = build_service();
    let id = seed(&repository, "Feed the dog", DecisionStatus::Proposal)
        .id
        .expect("id");
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(post_form(
            &format!("/decision/{id}/inline"),
            "alice",
            &pairs(&[("short_name", "Feed the dog at noon")]),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/decision/{id}"));

    let response = router
        .oneshot(get(&format!("/decision/{id}/inline"), Some("alice")))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["show_form"], true);
    assert_eq!(payload["decision_form"]["short_name"], "Feed the dog at noon");
    assert_eq!(payload["bars"]["max_height"], 36);
}

#[tokio::test]
async fn decision_routes_require_a_user() {
    let (service, repository, _) = build_service();
    seed(&repository, "Feed the dog", DecisionStatus::Proposal);
    let router = router_with_service(service);

    for uri in ["/decisions/proposal", "/decision/1", "/decision", "/decision/1/edit"] {
        let response = router
            .clone()
            .oneshot(get(uri, None))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn unknown_decisions_and_statuses_are_not_found() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    for uri in ["/decision/999", "/decision/999/edit", "/decisions/pending"] {
        let response = router
            .clone()
            .oneshot(get(uri, Some("alice")))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }

    let response = router
        .oneshot(post_form(
            "/decision/999/edit",
            "alice",
            &pairs(&[("short_name", "x")]),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn detail_route_returns_feedback_summary() {
    let (service, repository, _) = build_service();
    seed(&repository, "Feed the dog", DecisionStatus::Proposal);
    let router = router_with_service(service);

    let response = router
        .oneshot(get("/decision/1", Some("alice")))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["decision"]["short_name"], "Feed the dog");
    assert_eq!(payload["decision"]["status_label"], "proposal");
    assert_eq!(payload["feedback_stats"]["all"], 0);
    assert_eq!(payload["bars"]["consensus"]["height"], 2);
    assert_eq!(payload["feedback_list"], serde_json::json!([]));
}

#[tokio::test]
async fn export_route_serves_csv_attachment() {
    let (service, repository, _) = build_service();
    seed(&repository, "Feed the dog", DecisionStatus::Decision);
    let router = router_with_service(service);

    let response = router
        .oneshot(get("/export/decisions.csv", None))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).expect("content type"),
        "text/csv"
    );
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .expect("disposition"),
        "attachment; filename=openconsent_decision.csv"
    );

    let body = String::from_utf8(read_body(response).await).expect("utf8");
    let mut lines = body.lines();
    assert_eq!(lines.next(), Some(CSV_COLUMNS.join(",").as_str()));
    let record: Vec<_> = lines.next().expect("one row").split(',').collect();
    assert_eq!(record[3], "decision");
}

#[tokio::test]
async fn listing_handler_returns_internal_error_on_repository_failure() {
    let service = Arc::new(DecisionService::new(
        Arc::new(UnavailableRepository),
        Arc::new(InMemoryChangeNotifier::default()),
    ));

    let response = crate::decisions::router::listing_handler::<
        UnavailableRepository,
        InMemoryChangeNotifier,
    >(
        State(service),
        ctx("alice"),
        Path("proposal".to_string()),
        Query(SortForm::default()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .contains("database offline"));
}

#[tokio::test]
async fn listing_route_applies_sort() {
    let (service, repository, _) = build_service();
    seed(&repository, "Walk the dog", DecisionStatus::Proposal);
    seed(&repository, "Feed the cat", DecisionStatus::Proposal);
    let router = router_with_service(service);

    let response = router
        .oneshot(get("/decisions/proposal?sort=-short_name", Some("alice")))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["sort_form"]["sort"], "-short_name");
    assert_eq!(payload["decisions"][0]["short_name"], "Walk the dog");
    assert_eq!(payload["decisions"][1]["short_name"], "Feed the cat");
    assert_eq!(payload["page_title"], "Current Active Proposals");
}

#[tokio::test]
async fn add_route_redirects_even_when_notification_fails() {
    let repository = Arc::new(crate::decisions::store::InMemoryDecisionRepository::new());
    let service = Arc::new(DecisionService::new(repository.clone(), Arc::new(OfflineNotifier)));
    let router = crate::decisions::decision_router(service);

    let response = router
        .oneshot(post_form(
            "/decision",
            "alice",
            &pairs(&[("short_name", "Feed the dog")]),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/decisions/proposal");
    let stored = repository.all().expect("all");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].short_name, "Feed the dog");
}
