//! Axum handlers for the local view API.
//!
//! Each route renders one of the session's derived views as JSON. Data
//! routes answer `503` while the session is in its load-error state.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::ScholarshipApi;
use crate::drafts::{self, ApplicationDraft};
use crate::errors::{PortalError, Result};
use crate::filters::{display_weeks_until, is_best_match, FilterState};
use crate::models::Scholarship;
use crate::session::{BookmarkOutcome, Notice, Session};
use crate::sort::SortKey;
use crate::store::{self, KeyValueStore};

pub fn router<A, S>(session: Arc<Session<A, S>>) -> Router
where
    A: ScholarshipApi + 'static,
    S: KeyValueStore + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/scholarships", get(browse::<A, S>))
        .route("/scholarships/matched", get(matched::<A, S>))
        .route("/scholarships/saved", get(saved::<A, S>))
        .route("/scholarships/:id/bookmark", post(toggle_bookmark::<A, S>))
        .route("/filters", get(filter_options::<A, S>))
        .route("/refresh", post(refresh::<A, S>))
        .route("/notices", get(notices::<A, S>))
        .route("/sign-out", post(sign_out::<A, S>))
        .route("/drafts", get(list_drafts::<A, S>))
        .route(
            "/drafts/:scholarship_id",
            axum::routing::put(save_draft::<A, S>).delete(delete_draft::<A, S>),
        )
        .with_state(session)
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

/// Selector values exactly as the UI sends them (`"all"`, `"$5000+"`, …).
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub search: Option<String>,
    pub amount: Option<String>,
    pub major: Option<String>,
    pub gpa: Option<String>,
    pub deadline: Option<String>,
    pub sort: Option<String>,
}

impl FilterQuery {
    pub fn parse(&self) -> Result<(FilterState, SortKey)> {
        let filter = FilterState {
            search: self.search.clone().unwrap_or_default(),
            amount: self.amount.as_deref().unwrap_or("all").parse()?,
            major: self.major.as_deref().unwrap_or("all").parse()?,
            gpa: self.gpa.as_deref().unwrap_or("all").parse()?,
            deadline: self.deadline.as_deref().unwrap_or("all").parse()?,
        };
        let sort = self.sort.as_deref().unwrap_or("deadline").parse()?;
        Ok((filter, sort))
    }
}

#[derive(Serialize)]
pub struct ScholarshipView {
    #[serde(flatten)]
    pub scholarship: Scholarship,
    pub weeks_until_deadline: Option<i64>,
    pub best_match: bool,
}

#[derive(Serialize)]
pub struct ScholarshipsResponse {
    pub count: usize,
    pub scholarships: Vec<ScholarshipView>,
}

impl ScholarshipsResponse {
    fn render(list: Vec<Scholarship>, filter: &FilterState, now: DateTime<Utc>) -> Self {
        let scholarships: Vec<ScholarshipView> = list
            .into_iter()
            .map(|s| ScholarshipView {
                weeks_until_deadline: display_weeks_until(s.deadline, now),
                best_match: is_best_match(&s, filter),
                scholarship: s,
            })
            .collect();
        ScholarshipsResponse {
            count: scholarships.len(),
            scholarships,
        }
    }
}

#[derive(Serialize)]
pub struct NoticesResponse {
    pub count: usize,
    pub notices: Vec<Notice>,
}

#[derive(Serialize)]
pub struct DraftsResponse {
    pub count: usize,
    pub drafts: Vec<ApplicationDraft>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(e: PortalError) -> Response {
    let status = match &e {
        PortalError::NotLoaded(_) => StatusCode::SERVICE_UNAVAILABLE,
        PortalError::UnknownTier { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

fn ok<T: Serialize>(body: T) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /scholarships`
///
/// Every loaded scholarship passing the query's filters.
pub async fn browse<A: ScholarshipApi, S: KeyValueStore>(
    State(session): State<Arc<Session<A, S>>>,
    Query(query): Query<FilterQuery>,
) -> Response {
    let now = Utc::now();
    let (filter, sort) = match query.parse() {
        Ok(parsed) => parsed,
        Err(e) => return error_response(e),
    };
    match session.browse(&filter, sort, now).await {
        Ok(list) => ok(ScholarshipsResponse::render(list, &filter, now)),
        Err(e) => error_response(e),
    }
}

/// `GET /scholarships/matched`
///
/// Eligible scholarships not yet applied to, then filtered.
pub async fn matched<A: ScholarshipApi, S: KeyValueStore>(
    State(session): State<Arc<Session<A, S>>>,
    Query(query): Query<FilterQuery>,
) -> Response {
    let now = Utc::now();
    let (filter, sort) = match query.parse() {
        Ok(parsed) => parsed,
        Err(e) => return error_response(e),
    };
    match session.matched(&filter, sort, now).await {
        Ok(list) => ok(ScholarshipsResponse::render(list, &filter, now)),
        Err(e) => error_response(e),
    }
}

/// `GET /scholarships/saved`
pub async fn saved<A: ScholarshipApi, S: KeyValueStore>(
    State(session): State<Arc<Session<A, S>>>,
) -> Response {
    match session.saved().await {
        Ok(list) => ok(ScholarshipsResponse::render(
            list,
            &FilterState::default(),
            Utc::now(),
        )),
        Err(e) => error_response(e),
    }
}

/// `POST /scholarships/:id/bookmark`
///
/// Runs one optimistic toggle and reports how it settled.
pub async fn toggle_bookmark<A: ScholarshipApi, S: KeyValueStore>(
    State(session): State<Arc<Session<A, S>>>,
    Path(id): Path<i64>,
) -> Response {
    let outcome = session.toggle_bookmark(id).await;
    let status = match &outcome {
        BookmarkOutcome::Committed { .. } => StatusCode::OK,
        BookmarkOutcome::RolledBack { .. } => StatusCode::BAD_GATEWAY,
        BookmarkOutcome::Superseded { .. } => StatusCode::CONFLICT,
        BookmarkOutcome::UnknownScholarship { .. } => StatusCode::NOT_FOUND,
    };
    (status, Json(outcome)).into_response()
}

/// `GET /filters`
pub async fn filter_options<A: ScholarshipApi, S: KeyValueStore>(
    State(session): State<Arc<Session<A, S>>>,
) -> Response {
    match session.filter_options().await {
        Ok(options) => ok(options),
        Err(e) => error_response(e),
    }
}

/// `POST /refresh`
pub async fn refresh<A: ScholarshipApi, S: KeyValueStore>(
    State(session): State<Arc<Session<A, S>>>,
) -> Response {
    match session.load().await {
        Ok(()) => ok(serde_json::json!({ "status": "ok" })),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// `GET /notices`
///
/// Drains the queue; each notice is delivered once.
pub async fn notices<A: ScholarshipApi, S: KeyValueStore>(
    State(session): State<Arc<Session<A, S>>>,
) -> Response {
    let notices = session.take_notices().await;
    ok(NoticesResponse {
        count: notices.len(),
        notices,
    })
}

/// `POST /sign-out`
pub async fn sign_out<A: ScholarshipApi, S: KeyValueStore>(
    State(session): State<Arc<Session<A, S>>>,
) -> Response {
    match store::sign_out(session.store()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /drafts`
pub async fn list_drafts<A: ScholarshipApi, S: KeyValueStore>(
    State(session): State<Arc<Session<A, S>>>,
) -> Response {
    match drafts::load_drafts(session.store()).await {
        Ok(drafts) => ok(DraftsResponse {
            count: drafts.len(),
            drafts,
        }),
        Err(e) => error_response(e),
    }
}

/// `PUT /drafts/:scholarship_id` with the draft's fields as a JSON object.
pub async fn save_draft<A: ScholarshipApi, S: KeyValueStore>(
    State(session): State<Arc<Session<A, S>>>,
    Path(scholarship_id): Path<i64>,
    Json(fields): Json<Map<String, Value>>,
) -> Response {
    let mut draft = ApplicationDraft::new(scholarship_id);
    draft.fields = fields;
    draft.fields.remove("scholarshipId");
    match drafts::save_draft(session.store(), draft.clone()).await {
        Ok(()) => ok(draft),
        Err(e) => error_response(e),
    }
}

/// `DELETE /drafts/:scholarship_id`
pub async fn delete_draft<A: ScholarshipApi, S: KeyValueStore>(
    State(session): State<Arc<Session<A, S>>>,
    Path(scholarship_id): Path<i64>,
) -> Response {
    match drafts::delete_draft(session.store(), scholarship_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}
