use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Local, NaiveDate};
use serde_json::json;

use super::domain::Username;

/// Header carrying the authenticated user, set by the fronting proxy.
pub const REMOTE_USER_HEADER: &str = "x-remote-user";

/// Who is acting and on which day, passed explicitly into every service operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub user: Username,
    pub today: NaiveDate,
}

impl RequestContext {
    pub fn new(user: Username, today: NaiveDate) -> Self {
        Self { user, today }
    }

    /// Context for `user` dated with the local calendar day.
    pub fn today(user: Username) -> Self {
        Self::new(user, Local::now().date_naive())
    }
}

/// Rejection for requests without an acting user.
#[derive(Debug)]
pub struct MissingUser;

impl IntoResponse for MissingUser {
    fn into_response(self) -> Response {
        let payload = json!({
            "error": "unauthorized",
            "message": format!("missing {REMOTE_USER_HEADER} header"),
        });
        (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = MissingUser;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(REMOTE_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(MissingUser)?;

        Ok(Self::today(Username::new(user)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<RequestContext, MissingUser> {
        let (mut parts, _) = request.into_parts();
        RequestContext::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn extracts_user_from_header() {
        let request = Request::builder()
            .header(REMOTE_USER_HEADER, " alice ")
            .body(())
            .expect("request");
        let context = extract(request).await.expect("user present");
        assert_eq!(context.user, Username::new("alice"));
    }

    #[tokio::test]
    async fn missing_or_blank_header_is_unauthorized() {
        let request = Request::builder().body(()).expect("request");
        let rejection = extract(request).await.expect_err("no user");
        assert_eq!(rejection.into_response().status(), StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .header(REMOTE_USER_HEADER, "  ")
            .body(())
            .expect("request");
        assert!(extract(request).await.is_err());
    }
}
