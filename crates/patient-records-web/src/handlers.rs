//! Request handlers: extract fields, make one repository call, render.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use patient_records_core::{Database, DbError, DbResult, PatientForm, SearchQuery};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::views::{self, FormKind};
use crate::AppState;

/// Query parameters of the patient list.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthRes {
    pub status: &'static str,
    pub patients: Option<u64>,
}

/// Run a blocking repository call off the async workers.
async fn with_db<T, F>(db: &Database, op: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&Database) -> DbResult<T> + Send + 'static,
{
    let db = db.clone();
    let result = tokio::task::spawn_blocking(move || op(&db)).await?;
    Ok(result?)
}

/// Missing, non-numeric or zero page numbers fall back to the first page.
/// Oversized numbers saturate so they still clamp to the last page.
pub fn parse_page(raw: Option<&str>) -> u32 {
    raw.and_then(|p| p.trim().parse::<u64>().ok())
        .filter(|p| *p >= 1)
        .map(|p| u32::try_from(p).unwrap_or(u32::MAX))
        .unwrap_or(1)
}

pub async fn home(State(state): State<AppState>) -> Html<String> {
    Html(views::home(&state.consultants))
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthRes>) {
    match with_db(&state.db, |db| db.count_patients()).await {
        Ok(count) => (
            StatusCode::OK,
            Json(HealthRes {
                status: "ok",
                patients: Some(count),
            }),
        ),
        Err(e) => {
            tracing::error!("health check failed: {:?}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthRes {
                    status: "unavailable",
                    patients: None,
                }),
            )
        }
    }
}

pub async fn new_form() -> Html<String> {
    Html(views::patient_form(FormKind::New, None))
}

pub async fn create(
    State(state): State<AppState>,
    Form(form): Form<PatientForm>,
) -> Result<Redirect, AppError> {
    let (uhid, details) = form.validate()?;
    with_db(&state.db, move |db| db.create_patient(&uhid, &details)).await?;
    Ok(Redirect::to("/"))
}

pub async fn follow_up_form() -> Html<String> {
    Html(views::patient_form(FormKind::FollowUp, None))
}

pub async fn follow_up(
    State(state): State<AppState>,
    Form(form): Form<PatientForm>,
) -> Result<Redirect, AppError> {
    let (uhid, details) = form.validate_follow_up()?;
    with_db(&state.db, move |db| db.upsert_follow_up(&uhid, &details)).await?;
    Ok(Redirect::to("/"))
}

/// Patient list with search and paging.
///
/// A page past the end of a non-empty result redirects to the last page,
/// keeping the search text.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Response, AppError> {
    let query = SearchQuery::new(
        params.search,
        parse_page(params.page.as_deref()),
        state.page_size,
    );
    let page = with_db(&state.db, move |db| db.search_patients(&query)).await?;

    if let Some(last) = page.clamp_target() {
        tracing::debug!(requested = page.page, last, "clamping patient list page");
        return Ok(Redirect::to(&views::list_href(page.text.as_deref(), last)).into_response());
    }
    Ok(Html(views::patient_list(&page)).into_response())
}

pub async fn edit_form(
    State(state): State<AppState>,
    Path(uhid): Path<String>,
) -> Result<Html<String>, AppError> {
    let lookup = uhid.clone();
    let patient = with_db(&state.db, move |db| db.get_patient(&lookup))
        .await?
        .ok_or(DbError::NotFound(uhid))?;
    Ok(Html(views::patient_form(FormKind::Edit, Some(&patient))))
}

pub async fn update(
    State(state): State<AppState>,
    Path(uhid): Path<String>,
    Form(form): Form<PatientForm>,
) -> Result<Redirect, AppError> {
    let details = form.validate_details()?;
    with_db(&state.db, move |db| db.update_patient(&uhid, &details)).await?;
    Ok(Redirect::to("/patients"))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(uhid): Path<String>,
) -> Result<Redirect, AppError> {
    with_db(&state.db, move |db| db.delete_patient(&uhid)).await?;
    Ok(Redirect::to("/patients"))
}
