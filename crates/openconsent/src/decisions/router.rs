use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::context::RequestContext;
use super::domain::{Decision, DecisionId, DecisionStatus};
use super::export::EXPORT_FILENAME;
use super::forms::FormData;
use super::listing::SortForm;
use super::repository::{ChangeNotifier, DecisionRepository};
use super::service::{
    DecisionService, DecisionServiceError, EditTarget, InlineOutcome, SubmitOutcome,
};
use crate::error::AppError;

type SharedService<R, N> = Arc<DecisionService<R, N>>;

/// Router builder exposing the listing, detail, edit and export pages.
pub fn decision_router<R, N>(service: SharedService<R, N>) -> Router
where
    R: DecisionRepository + 'static,
    N: ChangeNotifier + 'static,
{
    Router::new()
        .route("/decisions/:status", get(listing_handler::<R, N>))
        .route("/export/decisions.csv", get(export_handler::<R, N>))
        .route(
            "/decision",
            get(add_form_handler::<R, N>).post(add_handler::<R, N>),
        )
        .route("/decision/:id", get(detail_handler::<R, N>))
        .route(
            "/decision/:id/edit",
            get(edit_form_handler::<R, N>).post(edit_handler::<R, N>),
        )
        .route(
            "/decision/:id/inline",
            get(inline_form_handler::<R, N>).post(inline_handler::<R, N>),
        )
        .with_state(service)
}

/// Query of the add page; `status` is the ordinal the new decision starts in.
#[derive(Debug, Default, Deserialize)]
pub struct AddQuery {
    #[serde(default)]
    pub status: Option<String>,
}

impl AddQuery {
    fn initial_status(&self) -> Option<DecisionStatus> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Some(DecisionStatus::default()),
            Some(raw) => raw.parse::<u8>().ok().and_then(DecisionStatus::from_ordinal),
        }
    }
}

pub fn listing_path(status: DecisionStatus) -> String {
    format!("/decisions/{}", status.label())
}

pub fn detail_path(id: DecisionId) -> String {
    format!("/decision/{id}")
}

pub(crate) async fn listing_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    _ctx: RequestContext,
    Path(slug): Path<String>,
    Query(sort): Query<SortForm>,
) -> Response
where
    R: DecisionRepository + 'static,
    N: ChangeNotifier + 'static,
{
    let Some(status) = DecisionStatus::from_label(&slug) else {
        return not_found(format!("unknown decision status '{slug}'"));
    };

    match service.listing(status, &sort) {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn export_handler<R, N>(State(service): State<SharedService<R, N>>) -> Response
where
    R: DecisionRepository + 'static,
    N: ChangeNotifier + 'static,
{
    match service.export_csv() {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, mime::TEXT_CSV.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename={EXPORT_FILENAME}"),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn detail_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    _ctx: RequestContext,
    Path(id): Path<u64>,
) -> Response
where
    R: DecisionRepository + 'static,
    N: ChangeNotifier + 'static,
{
    match service.detail(DecisionId(id)) {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn add_form_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    ctx: RequestContext,
    Query(query): Query<AddQuery>,
) -> Response
where
    R: DecisionRepository + 'static,
    N: ChangeNotifier + 'static,
{
    match query.initial_status() {
        Some(status) => (StatusCode::OK, Json(service.blank_form(&ctx, status))).into_response(),
        None => unknown_initial_status(&query),
    }
}

pub(crate) async fn add_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    ctx: RequestContext,
    Query(query): Query<AddQuery>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response
where
    R: DecisionRepository + 'static,
    N: ChangeNotifier + 'static,
{
    let Some(status) = query.initial_status() else {
        return unknown_initial_status(&query);
    };

    let data = FormData::new(pairs);
    submit_response(service.submit(&ctx, EditTarget::New { status }, &data))
}

pub(crate) async fn edit_form_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    ctx: RequestContext,
    Path(id): Path<u64>,
) -> Response
where
    R: DecisionRepository + 'static,
    N: ChangeNotifier + 'static,
{
    match service.edit_form(&ctx, DecisionId(id)) {
        Ok(form) => (StatusCode::OK, Json(form)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn edit_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    ctx: RequestContext,
    Path(id): Path<u64>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response
where
    R: DecisionRepository + 'static,
    N: ChangeNotifier + 'static,
{
    let data = FormData::new(pairs);
    submit_response(service.submit(&ctx, EditTarget::Existing(DecisionId(id)), &data))
}

pub(crate) async fn inline_form_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    ctx: RequestContext,
    Path(id): Path<u64>,
) -> Response
where
    R: DecisionRepository + 'static,
    N: ChangeNotifier + 'static,
{
    match service.inline_form(&ctx, DecisionId(id)) {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn inline_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    ctx: RequestContext,
    Path(id): Path<u64>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response
where
    R: DecisionRepository + 'static,
    N: ChangeNotifier + 'static,
{
    let data = FormData::new(pairs);
    match service.inline_submit(&ctx, DecisionId(id), &data) {
        Ok(InlineOutcome::Saved(decision)) => redirect_to_detail(&decision, DecisionId(id)),
        Ok(InlineOutcome::Cancelled(id)) => Redirect::to(&detail_path(id)).into_response(),
        Ok(InlineOutcome::Invalid(page)) => {
            (StatusCode::UNPROCESSABLE_ENTITY, Json(page)).into_response()
        }
        Err(error) => error_response(error),
    }
}

fn submit_response(outcome: Result<SubmitOutcome, DecisionServiceError>) -> Response {
    match outcome {
        Ok(SubmitOutcome::Saved(decision)) => {
            Redirect::to(&listing_path(decision.status)).into_response()
        }
        Ok(SubmitOutcome::Cancelled(status)) => Redirect::to(&listing_path(status)).into_response(),
        Ok(SubmitOutcome::Invalid(form)) => {
            (StatusCode::UNPROCESSABLE_ENTITY, Json(form)).into_response()
        }
        Err(error) => error_response(error),
    }
}

fn redirect_to_detail(decision: &Decision, fallback: DecisionId) -> Response {
    Redirect::to(&detail_path(decision.id.unwrap_or(fallback))).into_response()
}

fn unknown_initial_status(query: &AddQuery) -> Response {
    not_found(format!(
        "unknown decision status '{}'",
        query.status.as_deref().unwrap_or_default()
    ))
}

fn not_found(message: String) -> Response {
    let payload = json!({
        "error": message,
    });
    (StatusCode::NOT_FOUND, Json(payload)).into_response()
}

fn error_response(error: DecisionServiceError) -> Response {
    let error = AppError::from(error);
    if !error.is_not_found() {
        tracing::error!(error = %error, "decision request failed");
    }
    error.into_response()
}
